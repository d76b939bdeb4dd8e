//! The key registry: a flat arena of live keys plus two handles into it.
//!
//! Modeled as one owning table keyed by `key_id` plus `current`/`next`
//! handles, rather than a small object graph of references — the natural
//! shape in a language without a tracing garbage collector. Rotation and
//! import mutate only the table and the handles; [`BlockKey`] values
//! themselves are never mutated in place.

use std::collections::HashMap;

use crate::key::BlockKey;

/// Two's-complement, wrapping-`u32` contract for `key_id` allocation.
///
/// The high bit of every allocated `key_id` is set from `nn_index`; the low
/// 31 bits advance from a random seed with 32-bit wraparound. Working in
/// `u32` internally (converting to `i32` only at the `BlockKey` boundary)
/// sidesteps relying on signed-overflow semantics for the counter itself.
pub struct KeyRegistry {
    all_keys: HashMap<i32, BlockKey>,
    current_key_id: Option<i32>,
    next_key_id: Option<i32>,
    counter: u32,
    nn_index: u8,
}

impl KeyRegistry {
    /// Builds an empty registry. `seed` should come from a CSPRNG; `nn_index`
    /// identifies this authority's half of an HA pair (ignored on a slave,
    /// which never allocates ids).
    pub fn new(seed: u32, nn_index: u8) -> Self {
        Self {
            all_keys: HashMap::new(),
            current_key_id: None,
            next_key_id: None,
            counter: seed,
            nn_index,
        }
    }

    /// Allocates a fresh `key_id`: increments the counter with 32-bit
    /// wraparound, masks off the high bit, then ORs in `nn_index << 31`.
    pub fn allocate_key_id(&mut self) -> i32 {
        self.counter = self.counter.wrapping_add(1);
        let low = self.counter & 0x7fff_ffff;
        let high = u32::from(self.nn_index) << 31;
        (low | high) as i32
    }

    /// The key used to mint new tokens, if any.
    pub fn current_key(&self) -> Option<&BlockKey> {
        self.current_key_id.and_then(|id| self.all_keys.get(&id))
    }

    /// The pre-rotated successor to the current key, if any.
    pub fn next_key(&self) -> Option<&BlockKey> {
        self.next_key_id.and_then(|id| self.all_keys.get(&id))
    }

    /// Looks up a key by id, regardless of current/next status.
    pub fn get(&self, key_id: i32) -> Option<&BlockKey> {
        self.all_keys.get(&key_id)
    }

    /// The number of keys held, for diagnostics.
    pub fn key_count(&self) -> usize {
        self.all_keys.len()
    }

    /// The ids of every key held, for diagnostics.
    pub fn key_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.all_keys.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Inserts or overwrites a key by its id.
    pub fn insert(&mut self, key: BlockKey) {
        self.all_keys.insert(key.key_id(), key);
    }

    /// Sets the current-key handle. The key must already be in the table.
    pub fn set_current(&mut self, key_id: i32) {
        self.current_key_id = Some(key_id);
    }

    /// Sets the next-key handle. The key must already be in the table.
    pub fn set_next(&mut self, key_id: i32) {
        self.next_key_id = Some(key_id);
    }

    /// Evicts every entry whose `expiry_ms < now_ms`, except the current and
    /// next handles (which are re-pointed by rotation/import before this
    /// runs and so are never themselves stale at the moment of eviction).
    pub fn evict_expired(&mut self, now_ms: i64) {
        self.all_keys
            .retain(|_, key| key.expiry_ms() >= now_ms);
        if self.current_key_id.is_some_and(|id| !self.all_keys.contains_key(&id)) {
            self.current_key_id = None;
        }
        if self.next_key_id.is_some_and(|id| !self.all_keys.contains_key(&id)) {
            self.next_key_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batm_crypto::keys::MacSecret;

    #[test]
    fn allocate_key_id_sets_high_bit_from_nn_index() {
        let mut a = KeyRegistry::new(0, 0);
        let mut b = KeyRegistry::new(0, 1);
        for _ in 0..10 {
            assert!(a.allocate_key_id() >= 0);
            assert!(b.allocate_key_id() < 0);
        }
    }

    #[test]
    fn allocate_key_id_advances_and_does_not_repeat_within_one_authority() {
        let mut registry = KeyRegistry::new(1, 0);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(registry.allocate_key_id()));
        }
    }

    #[test]
    fn allocate_key_id_wraps_without_panicking() {
        let mut registry = KeyRegistry::new(u32::MAX - 1, 0);
        for _ in 0..5 {
            registry.allocate_key_id();
        }
    }

    #[test]
    fn evict_expired_removes_stale_entries_and_clears_dangling_handles() {
        let mut registry = KeyRegistry::new(0, 0);
        let id = registry.allocate_key_id();
        registry.insert(BlockKey::new(id, 100, MacSecret::generate()));
        registry.set_current(id);
        registry.evict_expired(200);
        assert!(registry.current_key().is_none());
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn evict_expired_keeps_live_entries() {
        let mut registry = KeyRegistry::new(0, 0);
        let id = registry.allocate_key_id();
        registry.insert(BlockKey::new(id, 1_000, MacSecret::generate()));
        registry.set_current(id);
        registry.evict_expired(500);
        assert!(registry.current_key().is_some());
    }
}
