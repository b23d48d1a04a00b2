//! Cache Engine Module
//!
//! The public cache object: a shared item store plus the sweeper and audit
//! loops that live exactly as long as it does.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audit::Auditor;
use crate::cache::{AuditStats, Item, Store};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_auditor, spawn_sweeper};

// == Cache ==
/// Thread-safe, self-cleaning key-value cache.
///
/// Every operation is synchronous and holds the store lock only for
/// in-memory work. Expired items are removed by the sweeper, not on read,
/// so an item may stay visible for up to one sweep interval past its
/// deadline.
///
/// The background loops stop on [`shutdown`](Cache::shutdown),
/// [`close`](Cache::close) or when the cache is dropped.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use memcache::{Cache, CacheConfig, NoopAuditor};
///
/// # async fn demo() -> memcache::Result<()> {
/// let config = CacheConfig::new(
///     2,
///     Duration::from_secs(10),
///     Duration::from_secs(60),
///     Duration::from_millis(500),
/// );
/// let cache = Cache::new(config, NoopAuditor)?;
///
/// cache.put("a", 1, &[])?;
/// cache.put("b", 2, &[])?;
/// cache.put("c", 3, &[])?; // evicts "a"
/// assert!(cache.get("a").is_err());
///
/// cache.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Cache<V> {
    store: Arc<Store<V>>,
    config: CacheConfig,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Option<JoinHandle<()>>,
    auditor: Option<JoinHandle<()>>,
}

impl<V> Cache<V>
where
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Builds the cache and starts its sweeper and audit loops.
    ///
    /// # Errors
    /// - `InvalidConfig` if any of the four parameters is zero
    /// - `NoRuntime` if called outside a Tokio runtime
    pub fn new(config: CacheConfig, auditor: impl Auditor) -> Result<Self> {
        config.validate()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CacheError::NoRuntime);
        }

        let store = Arc::new(Store::new(config.capacity, config.default_lifetime));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = spawn_sweeper(
            Arc::clone(&store),
            config.sweep_interval,
            shutdown_rx.clone(),
        );
        let auditor = spawn_auditor(
            Arc::clone(&store),
            Arc::new(auditor),
            config.audit_interval,
            shutdown_rx,
        );

        info!(
            capacity = config.capacity,
            default_lifetime_ms = config.default_lifetime.as_millis() as u64,
            "cache started"
        );

        Ok(Self {
            store,
            config,
            shutdown_tx,
            sweeper: Some(sweeper),
            auditor: Some(auditor),
        })
    }

    /// The configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Put ==
    /// Stores a new item with the default lifetime.
    ///
    /// # Errors
    /// - `KeyExists` if `key` is present; the stored value is left untouched
    /// - `CapacityExceeded` if the cache is full of immortal items
    pub fn put(&self, key: impl Into<String>, value: V, tags: &[u16]) -> Result<()> {
        self.put_with_lifetime(key, value, Duration::ZERO, tags)
    }

    /// Like [`put`](Cache::put) with an explicit lifetime. Zero means the
    /// default lifetime.
    pub fn put_with_lifetime(
        &self,
        key: impl Into<String>,
        value: V,
        lifetime: Duration,
        tags: &[u16],
    ) -> Result<()> {
        let lifetime = if lifetime.is_zero() {
            self.config.default_lifetime
        } else {
            lifetime
        };
        let key = key.into();
        let item = Item::new(value, tags.iter().copied(), lifetime);
        self.store.insert(key.clone(), item)?;
        debug!(key = %key, "put");
        Ok(())
    }

    // == Get ==
    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<V> {
        self.store.get_value(key)
    }

    /// Returns a snapshot of the full item stored under `key`.
    pub fn get_item(&self, key: &str) -> Result<Item<V>> {
        self.store.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    // == Update ==
    /// Replaces the value of an existing item and restarts its lifetime.
    ///
    /// Tags, lifetime and immortality are untouched.
    pub fn update(&self, key: &str, value: V) -> Result<()> {
        self.store.replace(key, |item| item.value = value)
    }

    // == Patch ==
    /// Upsert: creates the item with the default lifetime if absent,
    /// otherwise replaces its value and tags.
    ///
    /// Never fails. When the key is absent and the cache is full of immortal
    /// items nothing is stored.
    pub fn patch(&self, key: &str, value: V, tags: &[u16]) {
        if !self.store.upsert(key, value, tags) {
            warn!(key = %key, "patch dropped: cache is full of immortal items");
        }
    }

    // == Delete ==
    /// Removes `key` if present. Deleting a missing key is not an error.
    pub fn delete(&self, key: &str) {
        if self.store.remove(key) {
            debug!(key = %key, "deleted");
        }
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.store.clear();
    }

    // == Listing ==
    /// Snapshot of every item, in no particular order.
    pub fn list(&self) -> Vec<Item<V>> {
        self.store
            .snapshot()
            .into_iter()
            .map(|(_, item)| item)
            .collect()
    }

    /// Snapshot of every key together with its item.
    pub fn entries(&self) -> Vec<(String, Item<V>)> {
        self.store.snapshot()
    }

    /// Snapshot of the items matching `predicate`.
    ///
    /// The predicate runs after the lock is released.
    pub fn filter<F>(&self, predicate: F) -> Vec<Item<V>>
    where
        F: Fn(&Item<V>) -> bool,
    {
        self.list().into_iter().filter(|item| predicate(item)).collect()
    }

    /// Calls `visitor` once per item of a snapshot, in no particular order.
    ///
    /// The visitor may call back into the cache.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Item<V>),
    {
        for item in self.list() {
            visitor(&item);
        }
    }

    pub fn list_values(&self) -> Vec<V> {
        self.store.values()
    }

    pub fn list_keys(&self) -> Vec<String> {
        self.store.keys()
    }

    // == Lifetime Control ==
    /// Pushes the item's expiry deadline back by exactly `extra`.
    pub fn extend_lifetime(&self, key: &str, extra: Duration) -> Result<()> {
        self.store.extend_lifetime(key, extra)
    }

    /// Exempts the item from expiry and eviction for the rest of its life.
    pub fn immortalize(&self, key: &str) -> Result<()> {
        self.store.immortalize(key)
    }

    // == Stats ==
    /// Current audit statistics, captured on demand.
    pub fn stats(&self) -> AuditStats {
        self.store.stats()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<V> Cache<V> {
    // == Lifecycle ==
    /// Signals both background loops to stop. Idempotent.
    pub fn shutdown(&self) {
        // Err only means both loops are already gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Signals shutdown and waits for both background loops to exit.
    pub async fn close(mut self) {
        self.shutdown();
        for handle in [self.sweeper.take(), self.auditor.take()]
            .into_iter()
            .flatten()
        {
            if let Err(err) = handle.await {
                warn!(error = %err, "background loop ended abnormally");
            }
        }
        info!("cache closed");
    }
}

impl<V> Drop for Cache<V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
