//! Cryptographically secure random generation.
//!
//! Uses the operating system's CSPRNG for all random number generation.

use rand::{rngs::OsRng, RngCore};

/// Generates `len` cryptographically secure random bytes.
pub fn generate_secret(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generates a random 32-bit seed for the key-id allocation counter.
pub fn generate_seed() -> u32 {
    OsRng.next_u32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_secret_has_requested_length() {
        for len in [0, 1, 16, 20, 32] {
            assert_eq!(generate_secret(len).len(), len);
        }
    }

    #[test]
    fn generate_secret_is_not_constant() {
        let a = generate_secret(20);
        let b = generate_secret(20);
        assert_ne!(a, b);
    }

    #[test]
    fn generate_seed_is_not_always_zero() {
        let seeds: Vec<u32> = (0..8).map(|_| generate_seed()).collect();
        assert!(seeds.iter().any(|&s| s != 0));
    }
}
