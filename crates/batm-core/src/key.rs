//! The immutable key value held by the registry.

use batm_crypto::keys::MacSecret;

use crate::error::BatmError;
use crate::wire;

/// An immutable `(key_id, expiry, secret)` triple.
///
/// Keys are never mutated in place; rotation and import always produce a new
/// `BlockKey` and swap references in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockKey {
    key_id: i32,
    expiry_ms: i64,
    secret: MacSecret,
}

impl BlockKey {
    /// Builds a key from its parts.
    pub fn new(key_id: i32, expiry_ms: i64, secret: MacSecret) -> Self {
        Self {
            key_id,
            expiry_ms,
            secret,
        }
    }

    /// The key's unique identifier.
    pub fn key_id(&self) -> i32 {
        self.key_id
    }

    /// The absolute instant, in ms since epoch, after which this key must no
    /// longer be trusted.
    pub fn expiry_ms(&self) -> i64 {
        self.expiry_ms
    }

    /// The MAC secret this key carries.
    pub fn secret(&self) -> &MacSecret {
        &self.secret
    }

    /// Returns a copy of this key with a new expiry.
    pub fn with_expiry(&self, expiry_ms: i64) -> Self {
        Self {
            key_id: self.key_id,
            expiry_ms,
            secret: self.secret.clone(),
        }
    }

    /// Encodes this key per the `BlockKey` wire layout: `(key_id: varint32,
    /// expiry_ms: varint64, secret: length-prefixed bytes)`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        wire::write_zigzag_i32(out, self.key_id);
        wire::write_zigzag_i64(out, self.expiry_ms);
        wire::write_bytes(out, self.secret.as_bytes());
    }

    /// Decodes a `BlockKey` previously written by [`BlockKey::encode`].
    pub fn decode(input: &[u8], pos: &mut usize) -> Result<Self, BatmError> {
        let key_id = wire::read_zigzag_i32(input, pos)?;
        let expiry_ms = wire::read_zigzag_i64(input, pos)?;
        let secret_bytes = wire::read_bytes(input, pos)?;
        let secret = MacSecret::from_bytes(&secret_bytes).map_err(|_| BatmError::Malformed)?;
        Ok(Self {
            key_id,
            expiry_ms,
            secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_key(key_id: i32) -> BlockKey {
        BlockKey::new(key_id, 1_000, MacSecret::generate())
    }

    #[test]
    fn encode_decode_roundtrips() {
        let key = sample_key(-7);
        let mut out = Vec::new();
        key.encode(&mut out);
        let mut pos = 0;
        let decoded = BlockKey::decode(&out, &mut pos).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(pos, out.len());
    }

    #[test]
    fn with_expiry_preserves_id_and_secret() {
        let key = sample_key(5);
        let renewed = key.with_expiry(9_999);
        assert_eq!(renewed.key_id(), key.key_id());
        assert_eq!(renewed.secret(), key.secret());
        assert_eq!(renewed.expiry_ms(), 9_999);
    }
}
