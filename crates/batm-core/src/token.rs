//! The token identifier: the plaintext claim bound by the MAC.

use crate::error::BatmError;
use crate::wire;

/// An operation a token permits on a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Permission to read block data.
    Read,
    /// Permission to write block data.
    Write,
    /// Permission to copy a block between storage nodes.
    Copy,
    /// Permission to replace a block's contents.
    Replace,
}

impl AccessMode {
    const ALL: [AccessMode; 4] = [
        AccessMode::Read,
        AccessMode::Write,
        AccessMode::Copy,
        AccessMode::Replace,
    ];

    fn bit(self) -> u8 {
        match self {
            AccessMode::Read => 0b0001,
            AccessMode::Write => 0b0010,
            AccessMode::Copy => 0b0100,
            AccessMode::Replace => 0b1000,
        }
    }

    fn name(self) -> &'static str {
        match self {
            AccessMode::Read => "READ",
            AccessMode::Write => "WRITE",
            AccessMode::Copy => "COPY",
            AccessMode::Replace => "REPLACE",
        }
    }

    fn from_name(name: &str) -> Result<Self, BatmError> {
        match name {
            "READ" => Ok(AccessMode::Read),
            "WRITE" => Ok(AccessMode::Write),
            "COPY" => Ok(AccessMode::Copy),
            "REPLACE" => Ok(AccessMode::Replace),
            _ => Err(BatmError::Malformed),
        }
    }
}

/// A non-empty-by-convention subset of [`AccessMode`].
///
/// Backed by a 4-bit set rather than a `HashSet<AccessMode>`: the domain is
/// a fixed, small, closed enum, so a bitset is both cheaper and a more
/// direct expression of "subset of four flags" than a hash set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessModes(u8);

impl AccessModes {
    /// The empty set.
    pub const EMPTY: AccessModes = AccessModes(0);

    /// Builds a set from an iterator of modes.
    pub fn from_modes(modes: impl IntoIterator<Item = AccessMode>) -> Self {
        let mut set = AccessModes::EMPTY;
        for mode in modes {
            set.insert(mode);
        }
        set
    }

    /// Adds `mode` to the set.
    pub fn insert(&mut self, mode: AccessMode) {
        self.0 |= mode.bit();
    }

    /// True if `mode` is a member of the set.
    pub fn contains(&self, mode: AccessMode) -> bool {
        self.0 & mode.bit() != 0
    }

    /// True if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the set's members in a fixed, deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = AccessMode> + '_ {
        AccessMode::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

/// Identifies a block within a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    /// The namespace the block belongs to.
    pub pool_id: String,
    /// The block's identifier within `pool_id`.
    pub block_id: i64,
}

impl BlockRef {
    /// Builds a block reference.
    pub fn new(pool_id: impl Into<String>, block_id: i64) -> Self {
        Self {
            pool_id: pool_id.into(),
            block_id,
        }
    }
}

/// The signed payload bound by a token's MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentifier {
    /// Absolute wall-clock ms after which the token is invalid.
    pub expiry_ms: i64,
    /// The `key_id` of the [`crate::key::BlockKey`] used to mint the MAC.
    pub key_id: i32,
    /// The user the token was minted for; may be empty.
    pub user_id: String,
    /// The pool the referenced block belongs to.
    pub block_pool_id: String,
    /// The block's identifier within `block_pool_id`.
    pub block_id: i64,
    /// The access modes this token permits.
    pub access_modes: AccessModes,
}

impl TokenIdentifier {
    /// Encodes this identifier per the wire layout documented for
    /// `TokenIdentifier`:
    /// `expiry_ms, key_id, user_id, block_pool_id, block_id, access_modes`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        wire::write_zigzag_i64(&mut out, self.expiry_ms);
        wire::write_zigzag_i32(&mut out, self.key_id);
        wire::write_string(&mut out, &self.user_id);
        wire::write_string(&mut out, &self.block_pool_id);
        wire::write_zigzag_i64(&mut out, self.block_id);
        let modes: Vec<AccessMode> = self.access_modes.iter().collect();
        wire::write_varint_u64(&mut out, modes.len() as u64);
        for mode in modes {
            wire::write_string(&mut out, mode.name());
        }
        out
    }

    /// Decodes an identifier previously written by [`TokenIdentifier::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, BatmError> {
        let mut pos = 0;
        let expiry_ms = wire::read_zigzag_i64(bytes, &mut pos)?;
        let key_id = wire::read_zigzag_i32(bytes, &mut pos)?;
        let user_id = wire::read_string(bytes, &mut pos)?;
        let block_pool_id = wire::read_string(bytes, &mut pos)?;
        let block_id = wire::read_zigzag_i64(bytes, &mut pos)?;
        let mode_count = wire::read_varint_u64(bytes, &mut pos)?;
        let mut access_modes = AccessModes::EMPTY;
        for _ in 0..mode_count {
            let name = wire::read_string(bytes, &mut pos)?;
            access_modes.insert(AccessMode::from_name(&name)?);
        }
        if pos != bytes.len() {
            return Err(BatmError::Malformed);
        }
        Ok(Self {
            expiry_ms,
            key_id,
            user_id,
            block_pool_id,
            block_id,
            access_modes,
        })
    }

    /// Parses only field 1 (`expiry_ms`) of an encoded identifier, without
    /// decoding the rest — a cheap early rejection for callers that only
    /// care whether a token is definitely expired.
    pub fn peek_expiry(bytes: &[u8]) -> Result<i64, BatmError> {
        let mut pos = 0;
        wire::read_zigzag_i64(bytes, &mut pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TokenIdentifier {
        TokenIdentifier {
            expiry_ms: 123_456,
            key_id: -42,
            user_id: "alice".into(),
            block_pool_id: "BP-1".into(),
            block_id: 99,
            access_modes: AccessModes::from_modes([AccessMode::Read, AccessMode::Write]),
        }
    }

    #[test]
    fn encode_decode_roundtrips() {
        let id = sample();
        let bytes = id.encode();
        let decoded = TokenIdentifier::decode(&bytes).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn peek_expiry_matches_full_decode() {
        let id = sample();
        let bytes = id.encode();
        assert_eq!(TokenIdentifier::peek_expiry(&bytes).unwrap(), id.expiry_ms);
    }

    #[test]
    fn decode_rejects_empty_bytes() {
        assert!(matches!(
            TokenIdentifier::decode(&[]),
            Err(BatmError::Malformed)
        ));
    }

    #[test]
    fn decode_rejects_trailing_garbage() {
        let id = sample();
        let mut bytes = id.encode();
        bytes.push(0xff);
        assert!(matches!(
            TokenIdentifier::decode(&bytes),
            Err(BatmError::Malformed)
        ));
    }

    #[test]
    fn decode_rejects_unknown_access_mode_name() {
        let mut out = Vec::new();
        wire::write_zigzag_i64(&mut out, 1);
        wire::write_zigzag_i32(&mut out, 1);
        wire::write_string(&mut out, "alice");
        wire::write_string(&mut out, "BP-1");
        wire::write_zigzag_i64(&mut out, 1);
        wire::write_varint_u64(&mut out, 1);
        wire::write_string(&mut out, "DELETE");
        assert!(matches!(
            TokenIdentifier::decode(&out),
            Err(BatmError::Malformed)
        ));
    }

    #[test]
    fn access_modes_contains_and_iterates_in_fixed_order() {
        let modes = AccessModes::from_modes([AccessMode::Replace, AccessMode::Read]);
        assert!(modes.contains(AccessMode::Read));
        assert!(!modes.contains(AccessMode::Copy));
        let ordered: Vec<_> = modes.iter().collect();
        assert_eq!(ordered, vec![AccessMode::Read, AccessMode::Replace]);
    }
}
