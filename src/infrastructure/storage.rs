//! Storage implementations for per-client state.
//!
//! Provides concurrent, sharded storage for rate-limit records and the
//! rate limiter built on it.

use crate::application::limiter::RateLimiter;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::domain::identity::ClientIdentity;
use crate::domain::policy::{GrantPolicy, GrantRecord};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Shared in-memory storage for rate-limit records.
pub type RecordStorage = Arc<ShardedStorage<ClientIdentity, GrantRecord>>;

/// Rate limiter over in-memory records.
pub type InMemoryRateLimiter = RateLimiter<RecordStorage>;

impl RateLimiter<RecordStorage> {
    /// Rate limiter backed by sharded in-memory storage.
    pub fn in_memory(clock: Arc<dyn Clock>, interval: Duration, metrics: Metrics) -> Self {
        Self::new(
            Arc::new(ShardedStorage::new()),
            clock,
            GrantPolicy::new(interval),
            metrics,
        )
    }
}

/// Thread-safe sharded storage backed by DashMap.
///
/// Reads take a shard read lock and writes lock only the shard holding the
/// key, so unrelated clients do not contend with each other.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, ahash::RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let mut value_ref = self.map.entry(key).or_insert_with(factory);
        accessor(&mut value_ref)
    }

    fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Send + Sync + std::fmt::Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        (**self).get_cloned(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
}
