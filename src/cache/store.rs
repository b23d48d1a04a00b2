//! Cache Store Module
//!
//! Mutex-guarded key/item map with insertion-order eviction and sweep-based
//! expiry. Every structural mutation of the cache goes through here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{AuditStats, Counters, InsertionOrder, Item};
use crate::error::{CacheError, Result};

// == Store State ==
/// Everything guarded by the store's single lock.
#[derive(Debug)]
struct StoreState<V> {
    /// Key-item storage
    items: HashMap<String, Item<V>>,
    /// Mortal keys by insertion sequence
    order: InsertionOrder,
    /// Last sequence handed out; never reset
    last_sequence: u64,
    /// Audit counters
    counters: Counters,
}

impl<V> StoreState<V> {
    /// Inserts a key known to be absent, evicting first if the map is full.
    fn insert_new(&mut self, key: String, mut item: Item<V>, capacity: usize) -> Result<()> {
        while self.items.len() >= capacity {
            let evicted = self
                .order
                .evict_oldest()
                .ok_or(CacheError::CapacityExceeded(capacity))?;
            self.items.remove(&evicted);
            self.counters.record_eviction();
            tracing::debug!(key = %evicted, "evicted oldest mortal item");
        }

        self.last_sequence += 1;
        item.assign_sequence(self.last_sequence);
        if !item.is_immortal() {
            self.order.track(self.last_sequence, &key);
        }
        self.items.insert(key, item);
        self.counters.record_put();
        Ok(())
    }

    fn remove_entry(&mut self, key: &str) -> Option<Item<V>> {
        let item = self.items.remove(key)?;
        if !item.is_immortal() {
            self.order.forget(item.sequence());
        }
        Some(item)
    }

    fn item_mut(&mut self, key: &str) -> Result<&mut Item<V>> {
        self.items
            .get_mut(key)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }
}

// == Store ==
/// Thread-safe item storage with a hard capacity bound.
///
/// One mutex covers the map, the insertion counter and the audit counters,
/// so eviction and expiry decisions always see a consistent view of the
/// whole collection. Reads hand out owned copies.
#[derive(Debug)]
pub struct Store<V> {
    state: Mutex<StoreState<V>>,
    /// Maximum number of resident items
    capacity: usize,
    /// Lifetime applied to items whose own lifetime is zero
    default_lifetime: Duration,
}

impl<V: Clone> Store<V> {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of items the store can hold
    /// * `default_lifetime` - Lifetime for items that do not carry one
    pub fn new(capacity: usize, default_lifetime: Duration) -> Self {
        Self {
            state: Mutex::new(StoreState {
                items: HashMap::new(),
                order: InsertionOrder::new(),
                last_sequence: 0,
                counters: Counters::new(),
            }),
            capacity,
            default_lifetime,
        }
    }

    /// Only store code runs under the lock and none of it can panic while
    /// the map is half mutated, so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, StoreState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Insert ==
    /// Stores a new item under `key`.
    ///
    /// If the store is full the oldest mortal item is evicted first.
    ///
    /// # Errors
    /// - `KeyExists` if `key` is already present
    /// - `CapacityExceeded` if the store is full of immortal items
    pub fn insert(&self, key: String, item: Item<V>) -> Result<()> {
        let mut state = self.lock();
        if state.items.contains_key(&key) {
            return Err(CacheError::KeyExists(key));
        }
        state.insert_new(key, item, self.capacity)
    }

    // == Replace ==
    /// Applies `mutate` to an existing item and restarts its lifetime clock.
    ///
    /// `mutate` runs under the lock, so callers pass plain field updates.
    pub(crate) fn replace(&self, key: &str, mutate: impl FnOnce(&mut Item<V>)) -> Result<()> {
        let mut state = self.lock();
        let item = state.item_mut(key)?;
        mutate(&mut *item);
        item.touch();
        Ok(())
    }

    // == Upsert ==
    /// Replaces value and tags of an existing item, or inserts a new one with
    /// the default lifetime.
    ///
    /// An existing item keeps its lifetime, immortality and sequence.
    /// Returns false when the insert branch could not make room, in which
    /// case nothing is stored.
    pub fn upsert(&self, key: &str, value: V, tags: &[u16]) -> bool {
        let mut state = self.lock();
        if let Some(item) = state.items.get_mut(key) {
            item.value = value;
            item.tags = tags.iter().copied().collect();
            item.touch();
            return true;
        }

        let item = Item::new(value, tags.iter().copied(), self.default_lifetime);
        state
            .insert_new(key.to_string(), item, self.capacity)
            .is_ok()
    }

    // == Remove ==
    /// Deletes `key` if present. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove_entry(key).is_some()
    }

    // == Clear ==
    /// Removes every item. The insertion counter keeps counting.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.items.clear();
        state.order.clear();
    }

    // == Reads ==
    /// Returns a copy of the item stored under `key`.
    pub fn get(&self, key: &str) -> Result<Item<V>> {
        self.lock()
            .items
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get_value(&self, key: &str) -> Result<V> {
        self.lock()
            .items
            .get(key)
            .map(|item| item.value.clone())
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().items.contains_key(key)
    }

    /// Point-in-time copy of every key and item.
    pub fn snapshot(&self) -> Vec<(String, Item<V>)> {
        self.lock()
            .items
            .iter()
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().items.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.lock()
            .items
            .values()
            .map(|item| item.value.clone())
            .collect()
    }

    // == Sweep Expired ==
    /// Removes every mortal item whose deadline is at or before `now`.
    ///
    /// Returns the number of items removed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut state = self.lock();
        let expired: Vec<String> = state
            .items
            .iter()
            .filter(|(_, item)| item.is_expired(now, self.default_lifetime))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove_entry(key);
        }

        state.counters.record_expirations(expired.len());
        expired.len()
    }

    // == Lifetime Control ==
    /// Pushes the item's deadline back by `extra`.
    pub fn extend_lifetime(&self, key: &str, extra: Duration) -> Result<()> {
        let mut state = self.lock();
        state.item_mut(key)?.extend(extra, self.default_lifetime);
        Ok(())
    }

    /// Exempts the item from expiry and eviction.
    pub fn immortalize(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        let item = state.item_mut(key)?;
        if item.is_immortal() {
            return Ok(());
        }
        item.immortalize();
        let sequence = item.sequence();
        state.order.forget(sequence);
        Ok(())
    }

    // == Stats ==
    /// Returns the current audit statistics.
    pub fn stats(&self) -> AuditStats {
        let state = self.lock();
        state.counters.snapshot(state.items.len())
    }

    // == Length ==
    /// Returns the current number of items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_secs(10);

    fn item(value: i32) -> Item<i32> {
        Item::new(value, [], DEFAULT)
    }

    fn store(capacity: usize) -> Store<i32> {
        Store::new(capacity, DEFAULT)
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_insert_and_get() {
        let store = store(100);

        store.insert("key1".to_string(), item(1)).unwrap();

        assert_eq!(store.get_value("key1").unwrap(), 1);
        assert_eq!(store.get("key1").unwrap().sequence(), 1);
        assert!(store.contains("key1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_insert_existing_key_fails() {
        let store = store(100);

        store.insert("key1".to_string(), item(1)).unwrap();
        let result = store.insert("key1".to_string(), item(2));

        assert_eq!(result, Err(CacheError::KeyExists("key1".to_string())));
        assert_eq!(store.get_value("key1").unwrap(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = store(100);
        assert!(matches!(
            store.get("nonexistent"),
            Err(CacheError::KeyNotFound(_))
        ));
        assert!(matches!(
            store.get_value("nonexistent"),
            Err(CacheError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_store_sequences_are_monotonic() {
        let store = store(100);
        store.insert("a".to_string(), item(1)).unwrap();
        store.insert("b".to_string(), item(2)).unwrap();
        store.remove("a");
        store.clear();
        store.insert("c".to_string(), item(3)).unwrap();

        assert_eq!(store.get("c").unwrap().sequence(), 3);
    }

    #[test]
    fn test_store_evicts_oldest_insertion() {
        let store = store(3);

        store.insert("key1".to_string(), item(1)).unwrap();
        store.insert("key2".to_string(), item(2)).unwrap();
        store.insert("key3".to_string(), item(3)).unwrap();
        // Reads do not refresh insertion order
        store.get("key1").unwrap();
        store.insert("key4".to_string(), item(4)).unwrap();

        assert_eq!(store.len(), 3);
        assert!(!store.contains("key1"));
        assert!(store.contains("key4"));
        assert_eq!(store.stats().total_evictions, 1);
    }

    #[test]
    fn test_store_eviction_skips_immortal() {
        let store = store(2);

        store.insert("a".to_string(), item(1)).unwrap();
        store.insert("b".to_string(), item(2)).unwrap();
        store.immortalize("a").unwrap();
        store.insert("c".to_string(), item(3)).unwrap();

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_store_capacity_exceeded_when_all_immortal() {
        let store = store(2);

        store.insert("a".to_string(), item(1)).unwrap();
        store.insert("b".to_string(), item(2)).unwrap();
        store.immortalize("a").unwrap();
        store.immortalize("b").unwrap();

        let result = store.insert("c".to_string(), item(3));
        assert_eq!(result, Err(CacheError::CapacityExceeded(2)));
        assert_eq!(store.len(), 2);
        assert!(!store.contains("c"));
    }

    #[test]
    fn test_store_replace_resets_clock_and_keeps_metadata() {
        let store = store(10);
        store
            .insert("k".to_string(), Item::new(1, [3], Duration::from_secs(2)))
            .unwrap();
        store.immortalize("k").unwrap();
        let before = store.get("k").unwrap();

        store.replace("k", |item| item.value = 9).unwrap();

        let after = store.get("k").unwrap();
        assert_eq!(after.value, 9);
        assert!(after.created_at() >= before.created_at());
        assert!(after.has_tag(3));
        assert!(after.is_immortal());
        assert_eq!(after.lifetime(), Duration::from_secs(2));
        assert_eq!(after.sequence(), before.sequence());
    }

    #[test]
    fn test_store_replace_missing_key() {
        let store = store(10);
        assert!(matches!(
            store.replace("missing", |item| item.value = 1),
            Err(CacheError::KeyNotFound(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_upsert_inserts_and_replaces() {
        let store = store(10);

        assert!(store.upsert("k", 1, &[1]));
        let created = store.get("k").unwrap();
        assert_eq!(created.lifetime(), DEFAULT);

        store.extend_lifetime("k", Duration::from_secs(5)).unwrap();
        assert!(store.upsert("k", 2, &[2, 3]));

        let patched = store.get("k").unwrap();
        assert_eq!(patched.value, 2);
        assert!(!patched.has_tag(1));
        assert!(patched.has_tag(2) && patched.has_tag(3));
        assert_eq!(patched.lifetime(), Duration::from_secs(15));
        assert_eq!(store.stats().total_puts, 1);
    }

    #[test]
    fn test_store_upsert_noop_when_full_of_immortals() {
        let store = store(1);
        store.insert("a".to_string(), item(1)).unwrap();
        store.immortalize("a").unwrap();

        assert!(!store.upsert("b", 2, &[]));
        assert!(!store.contains("b"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_remove_is_idempotent() {
        let store = store(10);
        store.insert("a".to_string(), item(1)).unwrap();

        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_removed_key_is_not_evicted_later() {
        let store = store(2);
        store.insert("a".to_string(), item(1)).unwrap();
        store.insert("b".to_string(), item(2)).unwrap();
        store.remove("a");
        store.insert("c".to_string(), item(3)).unwrap();
        store.insert("d".to_string(), item(4)).unwrap();

        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        assert!(store.contains("d"));
    }

    #[test]
    fn test_store_clear() {
        let store = store(10);
        store.insert("a".to_string(), item(1)).unwrap();
        store.insert("b".to_string(), item(2)).unwrap();

        store.clear();

        assert!(store.is_empty());
        assert!(store.keys().is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.stats().total_puts, 2);
    }

    #[test]
    fn test_store_sweep_expired() {
        let store = store(10);
        store
            .insert("short".to_string(), Item::new(1, [], Duration::from_secs(1)))
            .unwrap();
        store
            .insert("long".to_string(), Item::new(2, [], Duration::from_secs(60)))
            .unwrap();
        store
            .insert("pinned".to_string(), Item::new(3, [], Duration::from_secs(1)))
            .unwrap();
        store.immortalize("pinned").unwrap();

        let later = Instant::now() + Duration::from_secs(2);
        assert_eq!(store.sweep_expired(later), 1);
        assert_eq!(store.sweep_expired(later), 0);

        assert!(!store.contains("short"));
        assert!(store.contains("long"));
        assert!(store.contains("pinned"));
        assert_eq!(store.stats().total_expirations, 1);
    }

    #[test]
    fn test_store_sweep_uses_default_for_zero_lifetime() {
        let store = store(10);
        store
            .insert("k".to_string(), Item::new(1, [], Duration::ZERO))
            .unwrap();

        assert_eq!(store.sweep_expired(Instant::now() + Duration::from_secs(5)), 0);
        assert_eq!(store.sweep_expired(Instant::now() + DEFAULT), 1);
    }

    #[test]
    fn test_store_extend_lifetime() {
        let store = store(10);
        store.insert("k".to_string(), item(1)).unwrap();
        let before = store.get("k").unwrap().expires_at(DEFAULT).unwrap();

        store.extend_lifetime("k", Duration::from_secs(3)).unwrap();

        let after = store.get("k").unwrap().expires_at(DEFAULT).unwrap();
        assert_eq!(after - before, Duration::from_secs(3));
        assert!(matches!(
            store.extend_lifetime("missing", Duration::from_secs(1)),
            Err(CacheError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_store_sweep_survives_unrepresentable_deadline() {
        let store = store(10);
        store
            .insert(
                "forever".to_string(),
                Item::new(1, [], Duration::from_secs(u64::MAX)),
            )
            .unwrap();
        store
            .insert("short".to_string(), Item::new(2, [], Duration::from_secs(1)))
            .unwrap();

        let removed = store.sweep_expired(Instant::now() + Duration::from_secs(5));

        assert_eq!(removed, 1);
        assert!(store.contains("forever"));
        assert!(!store.contains("short"));
    }

    #[test]
    fn test_store_extend_lifetime_saturates() {
        let store = store(10);
        store.insert("k".to_string(), item(1)).unwrap();

        store.extend_lifetime("k", Duration::MAX).unwrap();
        store.extend_lifetime("k", Duration::MAX).unwrap();

        let item = store.get("k").unwrap();
        assert_eq!(item.lifetime(), Duration::MAX);
        assert!(item.expires_at(DEFAULT).is_none());
        assert_eq!(
            store.sweep_expired(Instant::now() + Duration::from_secs(86_400)),
            0
        );
        assert!(store.contains("k"));
    }

    #[test]
    fn test_store_immortalize_missing_key() {
        let store = store(10);
        assert!(matches!(
            store.immortalize("missing"),
            Err(CacheError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_store_snapshot_is_detached() {
        let store = store(10);
        store.insert("a".to_string(), item(1)).unwrap();

        let mut snapshot = store.snapshot();
        snapshot[0].1.value = 100;

        assert_eq!(store.get_value("a").unwrap(), 1);
        assert_eq!(store.values(), vec![1]);
    }
}
