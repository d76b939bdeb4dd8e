//! HMAC-SHA1 message authentication.
//!
//! HMAC-SHA1 is the reference MAC algorithm for block access tokens, chosen
//! for binary compatibility with already-deployed clients rather than for
//! its cryptographic margin. Callers that control both ends of the wire are
//! free to substitute an equivalently-sized HMAC; this module only needs to
//! agree with itself.

use hmac::{Hmac, Mac as _};
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

/// Size in bytes of both the HMAC-SHA1 key and its output tag.
pub const MAC_KEY_SIZE: usize = 20;

type HmacSha1 = Hmac<Sha1>;

/// Computes the HMAC-SHA1 tag of `message` under `key`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] only if `key` is empty; HMAC accepts
/// keys of any non-zero length, but an empty key is never intentional here.
pub fn compute(key: &[u8], message: &[u8]) -> Result<[u8; MAC_KEY_SIZE], CryptoError> {
    if key.is_empty() {
        return Err(CryptoError::InvalidKey("mac key must not be empty".into()));
    }
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    mac.update(message);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; MAC_KEY_SIZE];
    out.copy_from_slice(&tag);
    Ok(out)
}

/// Verifies `tag` against the HMAC-SHA1 of `message` under `key`, in
/// constant time.
///
/// # Errors
///
/// Returns [`CryptoError::VerificationFailed`] if the tag does not match.
pub fn verify(key: &[u8], message: &[u8], tag: &[u8]) -> Result<(), CryptoError> {
    if tag.len() != MAC_KEY_SIZE {
        return Err(CryptoError::VerificationFailed);
    }
    let computed = compute(key, message)?;
    if bool::from(computed.ct_eq(tag)) {
        Ok(())
    } else {
        Err(CryptoError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let key = [0x11u8; MAC_KEY_SIZE];
        let a = compute(&key, b"hello").unwrap();
        let b = compute(&key, b"hello").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn compute_differs_by_message() {
        let key = [0x11u8; MAC_KEY_SIZE];
        let a = compute(&key, b"hello").unwrap();
        let b = compute(&key, b"goodbye").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_accepts_matching_tag() {
        let key = [0x22u8; MAC_KEY_SIZE];
        let tag = compute(&key, b"payload").unwrap();
        assert!(verify(&key, b"payload", &tag).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let key = [0x22u8; MAC_KEY_SIZE];
        let tag = compute(&key, b"payload").unwrap();
        assert!(verify(&key, b"payloae", &tag).is_err());
    }

    #[test]
    fn verify_rejects_tampered_tag() {
        let key = [0x22u8; MAC_KEY_SIZE];
        let mut tag = compute(&key, b"payload").unwrap();
        tag[0] ^= 0xff;
        assert!(verify(&key, b"payload", &tag).is_err());
    }

    #[test]
    fn verify_rejects_wrong_length_tag() {
        let key = [0x22u8; MAC_KEY_SIZE];
        assert!(verify(&key, b"payload", &[0u8; 4]).is_err());
    }

    #[test]
    fn compute_rejects_empty_key() {
        assert!(matches!(
            compute(&[], b"payload"),
            Err(CryptoError::InvalidKey(_))
        ));
    }
}
