//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur in the cryptographic primitives layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key or secret was not the expected length.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// MAC verification failed.
    #[error("mac verification failed")]
    VerificationFailed,
}
