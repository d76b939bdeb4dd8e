//! Secret key material with automatic memory zeroization.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::mac::MAC_KEY_SIZE;
use crate::random::generate_secret;

/// A MAC-sized secret with automatic zeroization.
///
/// Used as a block key's secret material by the token manager built on top
/// of this crate. Stored as an owned `Vec<u8>` rather than a fixed-size
/// array so the type stays agnostic to the exact MAC chosen (see
/// [`crate::mac`]).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MacSecret {
    bytes: Vec<u8>,
}

impl MacSecret {
    /// Generates a new random secret sized for the configured MAC algorithm.
    pub fn generate() -> Self {
        Self {
            bytes: generate_secret(MAC_KEY_SIZE),
        }
    }

    /// Builds a secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not exactly [`MAC_KEY_SIZE`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != MAC_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                MAC_KEY_SIZE,
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Returns the raw secret bytes.
    ///
    /// Use with caution — the returned slice is not zeroized automatically.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MacSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for MacSecret {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for MacSecret {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_has_mac_key_size() {
        let secret = MacSecret::generate();
        assert_eq!(secret.as_bytes().len(), MAC_KEY_SIZE);
    }

    #[test]
    fn from_bytes_roundtrips() {
        let bytes = [0x7au8; MAC_KEY_SIZE];
        let secret = MacSecret::from_bytes(&bytes).unwrap();
        assert_eq!(secret.as_bytes(), &bytes);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let bytes = [0u8; MAC_KEY_SIZE - 1];
        assert!(matches!(
            MacSecret::from_bytes(&bytes),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_is_redacted() {
        let secret = MacSecret::generate();
        let rendered = format!("{:?}", secret);
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn generated_secrets_are_unique() {
        let a = MacSecret::generate();
        let b = MacSecret::generate();
        assert_ne!(a, b);
    }
}
