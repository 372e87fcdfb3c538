//! TTL cache for decoded GET responses.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::params::QueryParams;

/// Per-request cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Serve a fresh entry if one exists; store the network answer otherwise.
    #[default]
    Use,
    /// Skip the lookup but store the network answer.
    Refresh,
    /// Neither read nor write.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        matches!(self, Self::Use | Self::Refresh)
    }
}

/// Cache sizing and expiry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Default time-to-live applied when `set` is called without an override.
    pub ttl: Duration,
    /// Upper bound on stored entries; the oldest-inserted entry is evicted first.
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            max_size: 1000,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            enabled: true,
            ttl,
            max_size,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Point-in-time view of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub enabled: bool,
    pub size: usize,
    pub max_size: usize,
    pub default_ttl: Duration,
}

/// Builds the cache key for an endpoint call.
///
/// The credential is never part of the key; parameters are rendered in name order.
pub fn cache_key(endpoint: &str, params: &QueryParams) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    if params.is_empty() {
        endpoint.to_string()
    } else {
        format!("{endpoint}?{}", params.to_query_string())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
    /// Insertion sequence; ties the entry to its slot in the eviction queue.
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    config: CacheConfig,
    entries: HashMap<String, CacheEntry<V>>,
    // Insertion order. Slots whose seq no longer matches the live entry are stale.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

impl<V: Clone> CacheInner<V> {
    fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
        }
    }

    fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.entries.remove(key);
            debug!(key, "cache entry expired");
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&mut self, key: String, value: V, ttl: Duration, now: Instant) {
        // Overwrites keep their original insertion position.
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.created_at = now;
            entry.ttl = ttl;
            return;
        }

        if self.config.max_size == 0 {
            return;
        }
        while self.entries.len() >= self.config.max_size {
            match self.evict_oldest() {
                Some(evicted) => debug!(key = %evicted, "evicted oldest cache entry"),
                None => break,
            }
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.order.push_back((seq, key.clone()));
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                ttl,
                seq,
            },
        );
        self.compact_order();
    }

    fn evict_oldest(&mut self) -> Option<String> {
        while let Some((seq, key)) = self.order.pop_front() {
            let live = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.seq == seq);
            if live {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn compact_order(&mut self) {
        if self.order.len() <= self.entries.len().saturating_mul(2) + 16 {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(seq, key)| entries.get(key).is_some_and(|entry| entry.seq == *seq));
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn cleanup(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.compact_order();
        }
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Thread-safe in-memory cache with per-entry TTL and insertion-order eviction.
///
/// Expired entries are dropped lazily on lookup and in bulk by [`CacheStore::cleanup`].
/// Hits do not refresh an entry's position, so eviction is FIFO rather than LRU.
#[derive(Debug, Clone)]
pub struct CacheStore<V = Value> {
    inner: Arc<Mutex<CacheInner<V>>>,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(config: CacheConfig) -> Self {
        debug!(
            enabled = config.enabled,
            ttl_ms = config.ttl.as_millis() as u64,
            max_size = config.max_size,
            "creating cache store"
        );
        Self {
            inner: Arc::new(Mutex::new(CacheInner::new(config))),
        }
    }

    /// Create a cache store with the default TTL of 5 minutes and 1000 entries.
    pub fn with_default_ttl() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Create a transparent cache: every lookup misses and every write is dropped.
    pub fn disabled() -> Self {
        Self::new(CacheConfig::disabled())
    }

    /// Returns the cached value if present and not expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut store = self.inner.lock().await;
        if !store.config.enabled {
            return None;
        }
        store.get(key, Instant::now())
    }

    /// Stores a value, using the default TTL unless `ttl` overrides it.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let mut store = self.inner.lock().await;
        if !store.config.enabled {
            return;
        }
        let ttl = ttl.unwrap_or(store.config.ttl);
        store.set(key.into(), value, ttl, Instant::now());
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.inner.lock().await.delete(key)
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every expired entry and returns how many were dropped.
    pub async fn cleanup(&self) -> usize {
        let removed = self.inner.lock().await.cleanup(Instant::now());
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.lock().await;
        CacheStats {
            enabled: store.config.enabled,
            size: store.entries.len(),
            max_size: store.config.max_size,
            default_ttl: store.config.ttl,
        }
    }

    pub async fn is_disabled(&self) -> bool {
        !self.inner.lock().await.config.enabled
    }
}
