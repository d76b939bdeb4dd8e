//! # BATM Crypto
//!
//! Low-level primitives used by the block access token manager:
//!
//! - [`mac`] — HMAC-SHA1 computation and constant-time verification.
//! - [`keys`] — a zeroizing secret type sized to the MAC algorithm's key.
//! - [`random`] — OS-CSPRNG-backed secret generation.
//! - [`clock`] — an injectable monotonic wall-clock source.
//!
//! ## Security
//!
//! All secret material is zeroized on drop and redacted from `Debug` output.
//! MAC comparison is always constant-time; see [`mac::verify`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod keys;
pub mod mac;
pub mod random;

pub use clock::Clock;
pub use error::CryptoError;
pub use keys::MacSecret;
