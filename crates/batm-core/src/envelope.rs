//! Wire envelopes exchanged with the transport layer: tokens and key-set
//! snapshots.

use crate::error::BatmError;
use crate::key::BlockKey;
use crate::wire;

/// The routing-hint kind string carried by every token, matching the
/// reference system's constant so wire bytes stay binary-compatible.
pub const TOKEN_KIND: &str = "HDFS_BLOCK_TOKEN";

/// A minted capability: a signed identifier plus its MAC.
///
/// `kind` and `service` are opaque routing hints consumed by the transport;
/// they never participate in verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The encoded [`crate::token::TokenIdentifier`].
    pub identifier_bytes: Vec<u8>,
    /// `mac(key.secret, identifier_bytes)`.
    pub password_bytes: Vec<u8>,
    /// Always [`TOKEN_KIND`] for tokens minted by this crate.
    pub kind: String,
    /// Opaque transport routing hint; empty unless the caller sets one.
    pub service: String,
}

impl Token {
    /// The singleton empty token: empty identifier and password bytes, used
    /// by unauthenticated paths that must still carry a typed placeholder.
    /// It never validates.
    pub fn empty() -> Self {
        Self {
            identifier_bytes: Vec::new(),
            password_bytes: Vec::new(),
            kind: TOKEN_KIND.to_string(),
            service: String::new(),
        }
    }

    /// Encodes this token per its wire envelope: four length-prefixed
    /// fields, identifier and password as raw bytes, kind and service as
    /// UTF-8 strings.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        wire::write_bytes(&mut out, &self.identifier_bytes);
        wire::write_bytes(&mut out, &self.password_bytes);
        wire::write_string(&mut out, &self.kind);
        wire::write_string(&mut out, &self.service);
        out
    }

    /// Decodes a token previously written by [`Token::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, BatmError> {
        let mut pos = 0;
        let identifier_bytes = wire::read_bytes(bytes, &mut pos)?;
        let password_bytes = wire::read_bytes(bytes, &mut pos)?;
        let kind = wire::read_string(bytes, &mut pos)?;
        let service = wire::read_string(bytes, &mut pos)?;
        if pos != bytes.len() {
            return Err(BatmError::Malformed);
        }
        Ok(Self {
            identifier_bytes,
            password_bytes,
            kind,
            service,
        })
    }
}

/// The value-copy snapshot a master publishes for slaves to import.
///
/// Secrets travel in the clear in this envelope; confidentiality is the
/// transport's responsibility, matching the reference system's contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBlockKeys {
    /// Whether block access tokens are enabled at all.
    pub is_enabled: bool,
    /// The exporting master's key-rotation period, in ms.
    pub key_update_interval_ms: i64,
    /// The exporting master's token lifetime, in ms.
    pub token_lifetime_ms: i64,
    /// The key currently used to mint tokens.
    pub current_key: BlockKey,
    /// Every key the exporting master still considers live.
    pub all_keys: Vec<BlockKey>,
}

impl ExportedBlockKeys {
    /// Encodes this snapshot: `is_enabled` as a single byte, the two
    /// interval fields as zig-zag varints, `current_key` inline, then
    /// `all_keys` as a varint count followed by each encoded key.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(u8::from(self.is_enabled));
        wire::write_zigzag_i64(&mut out, self.key_update_interval_ms);
        wire::write_zigzag_i64(&mut out, self.token_lifetime_ms);
        self.current_key.encode(&mut out);
        wire::write_varint_u64(&mut out, self.all_keys.len() as u64);
        for key in &self.all_keys {
            key.encode(&mut out);
        }
        out
    }

    /// Decodes a snapshot previously written by [`ExportedBlockKeys::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, BatmError> {
        let mut pos = 0;
        let is_enabled = match bytes.first() {
            Some(0) => false,
            Some(1) => true,
            _ => return Err(BatmError::Malformed),
        };
        pos += 1;
        let key_update_interval_ms = wire::read_zigzag_i64(bytes, &mut pos)?;
        let token_lifetime_ms = wire::read_zigzag_i64(bytes, &mut pos)?;
        let current_key = BlockKey::decode(bytes, &mut pos)?;
        let count = wire::read_varint_u64(bytes, &mut pos)?;
        let mut all_keys = Vec::with_capacity(count as usize);
        for _ in 0..count {
            all_keys.push(BlockKey::decode(bytes, &mut pos)?);
        }
        if pos != bytes.len() {
            return Err(BatmError::Malformed);
        }
        Ok(Self {
            is_enabled,
            key_update_interval_ms,
            token_lifetime_ms,
            current_key,
            all_keys,
        })
    }
}
