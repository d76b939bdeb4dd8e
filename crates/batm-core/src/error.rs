//! Error types produced by the token manager.

use thiserror::Error;

/// Errors produced by minting, verifying, rotating, or exchanging keys.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum BatmError {
    /// Mint was attempted before a current key exists.
    #[error("no current key: manager not initialized")]
    NotInitialized,

    /// The token identifier bytes did not parse.
    #[error("malformed token identifier")]
    Malformed,

    /// `expected_user` did not match the token's `user_id`.
    #[error("token user does not match expected user")]
    UserMismatch,

    /// The pool id or block id did not match the requested block.
    #[error("token does not match requested block")]
    BlockMismatch,

    /// The token's `expiry_ms` has passed.
    #[error("token has expired")]
    Expired,

    /// The requested access mode is absent from the token.
    #[error("requested access mode denied")]
    AccessModeDenied,

    /// The token's `key_id` is not present in the registry.
    #[error("key id unknown: evicted or minted by another authority")]
    UnknownKey,

    /// The recomputed MAC did not match the token's password.
    #[error("mac verification failed")]
    BadMac,

    /// A master-only operation was invoked on a slave, or vice versa.
    #[error("operation not permitted for this role")]
    RoleViolation,

    /// Mint or verify was attempted while block tokens are disabled.
    #[error("block access tokens are disabled")]
    Disabled,
}

impl From<batm_crypto::CryptoError> for BatmError {
    fn from(_: batm_crypto::CryptoError) -> Self {
        BatmError::BadMac
    }
}
