//! # Block Access Token Manager
//!
//! The security core that gates client access to data blocks in a
//! distributed file system. A master mints short-lived, HMAC-authenticated
//! capability tokens binding a user, a block identifier, and an access-mode
//! set; slaves verify them against a locally held, periodically refreshed
//! key set, without contacting the master per request.
//!
//! ## Layout
//!
//! - [`manager`] — [`BlockTokenManager`], the public entry point: mint,
//!   verify, rotate, export, import.
//! - [`registry`] — the key arena and rotation bookkeeping.
//! - [`key`] — the immutable `BlockKey` value.
//! - [`token`] — `TokenIdentifier`, `AccessMode`/`AccessModes`, `BlockRef`.
//! - [`envelope`] — the `Token` and `ExportedBlockKeys` wire envelopes.
//! - [`wire`] — the deterministic varint/string codec shared by the above.
//! - [`roles`] — the master/slave role split.
//! - [`error`] — [`BatmError`], the unified error enum.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use batm_core::manager::BlockTokenManager;
//! use batm_core::token::{AccessMode, AccessModes, BlockRef};
//! use batm_crypto::clock::SystemClock;
//!
//! let master = BlockTokenManager::master(0, 3_600_000, 3_600_000, Arc::new(SystemClock));
//! let block = BlockRef::new("BP-1", 42);
//! let token = master
//!     .generate_token(Some("alice"), &block, AccessModes::from_modes([AccessMode::Read]))
//!     .unwrap();
//!
//! assert!(master
//!     .check_access(&token, Some("alice"), &block, AccessMode::Read)
//!     .is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod envelope;
pub mod error;
pub mod key;
pub mod manager;
pub mod registry;
pub mod roles;
pub mod token;
pub mod wire;

pub use envelope::{ExportedBlockKeys, Token};
pub use error::BatmError;
pub use key::BlockKey;
pub use manager::BlockTokenManager;
pub use roles::Role;
pub use token::{AccessMode, AccessModes, BlockRef, TokenIdentifier};
