//! Size- and time-bounded LRU memory.
//!
//! This module provides [`LruMemory`], a thread-safe key-value store that
//! enforces two independent limits: the aggregate estimated size of all items
//! and the absolute age of each item. When the size limit is exceeded the least
//! recently used items are evicted; items older than the TTL are dropped as soon
//! as a read or maintenance pass notices them.
//!
//! # Examples
//!
//! ```
//! use recall::config::MemoryConfig;
//! use recall::memory::LruMemory;
//! use serde_json::json;
//!
//! let memory: LruMemory = LruMemory::new(MemoryConfig::new(10_000, 3600)).unwrap();
//!
//! assert!(memory.put_with_tags("paper:42", json!({"title": "CRISPR"}), ["literature"]));
//! assert_eq!(memory.get("paper:42").unwrap()["title"], "CRISPR");
//!
//! let stats = memory.get_stats();
//! assert_eq!(stats.total_items, 1);
//! assert_eq!(stats.hits, 1);
//! ```

use super::clock::{Clock, SystemClock};
use super::estimator::{JsonSizeEstimator, SizeEstimator};
use super::item::{ItemSummary, MemoryItem};
use crate::config::MemoryConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Point-in-time counters for an [`LruMemory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_items: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub current_size_bytes: usize,
    pub max_size_bytes: usize,
    pub utilization_pct: f64,
    pub hit_rate_pct: f64,
}

/// Occupancy details for an [`LruMemory`].
///
/// `oldest_item` is the stale end of the recency order (next to be evicted),
/// `newest_item` the recent end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_items: usize,
    pub total_size_bytes: usize,
    pub oldest_item: Option<ItemSummary>,
    pub newest_item: Option<ItemSummary>,
    pub most_accessed: Option<ItemSummary>,
}

#[derive(Debug)]
struct Slot<V> {
    item: MemoryItem<V>,
    seq: u64,
}

/// Everything guarded by the store's lock.
///
/// `recency` maps a monotonically increasing sequence number to a key, so its
/// first entry is the stale end and its last entry the recent end. Every
/// helper here runs inside the caller's critical section.
#[derive(Debug)]
struct MemoryState<V> {
    items: HashMap<String, Slot<V>>,
    recency: BTreeMap<u64, String>,
    next_seq: u64,
    current_size_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> MemoryState<V> {
    fn new() -> Self {
        Self {
            items: HashMap::new(),
            recency: BTreeMap::new(),
            next_seq: 0,
            current_size_bytes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Insert or replace, placing the item at the recent end.
    fn insert(&mut self, item: MemoryItem<V>) {
        if let Some(old) = self.remove_entry(&item.key) {
            debug!("Replacing item {} ({} bytes)", old.key, old.size_bytes);
        }
        let seq = self.next_seq();
        self.current_size_bytes = self.current_size_bytes.saturating_add(item.size_bytes);
        self.recency.insert(seq, item.key.clone());
        self.items.insert(item.key.clone(), Slot { item, seq });
    }

    /// Move an existing key to the recent end.
    fn promote(&mut self, key: &str) {
        let seq = self.next_seq();
        if let Some(slot) = self.items.get_mut(key) {
            self.recency.remove(&slot.seq);
            slot.seq = seq;
            self.recency.insert(seq, key.to_string());
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<MemoryItem<V>> {
        let slot = self.items.remove(key)?;
        self.recency.remove(&slot.seq);
        self.current_size_bytes -= slot.item.size_bytes;
        Some(slot.item)
    }

    fn remove_where(&mut self, predicate: impl Fn(&MemoryItem<V>) -> bool) -> usize {
        let doomed: Vec<String> = self
            .items
            .values()
            .filter(|slot| predicate(&slot.item))
            .map(|slot| slot.item.key.clone())
            .collect();

        for key in &doomed {
            self.remove_entry(key);
        }
        doomed.len()
    }

    fn purge_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let removed = self.remove_where(|item| item.is_expired(now, ttl));
        self.expirations += removed as u64;
        if removed > 0 {
            debug!("Cleaned up {} expired items", removed);
        }
        removed
    }

    /// Evict from the stale end until the size limit holds.
    fn evict_to_capacity(&mut self, max_size_bytes: usize) {
        while self.current_size_bytes > max_size_bytes {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            if let Some(slot) = self.items.remove(&key) {
                self.current_size_bytes -= slot.item.size_bytes;
                self.evictions += 1;
                debug!("Evicted item {} due to size limit", key);
            }
        }
    }

    /// Items from the stale end to the recent end.
    fn ordered(&self) -> impl Iterator<Item = &MemoryItem<V>> + '_ {
        self.recency
            .values()
            .filter_map(|key| self.items.get(key).map(|slot| &slot.item))
    }
}

/// Thread-safe LRU store bounded by total estimated size and per-item TTL.
///
/// Clones are cheap and share the same underlying store. Every operation runs
/// under a single lock, so operations on one store are linearizable and an
/// insertion's expiry sweep and eviction never interleave with another call.
pub struct LruMemory<V = Value> {
    state: Arc<Mutex<MemoryState<V>>>,
    config: MemoryConfig,
    estimator: Arc<dyn SizeEstimator<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for LruMemory<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config.clone(),
            estimator: Arc::clone(&self.estimator),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V> fmt::Debug for LruMemory<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruMemory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<V> LruMemory<V>
where
    V: Clone + Serialize + Send + 'static,
{
    /// Create a store that sizes values by their JSON encoding.
    ///
    /// # Errors
    ///
    /// Returns [`RecallError::ConfigError`](crate::RecallError::ConfigError)
    /// if the configuration is invalid.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        Self::with_parts(config, Arc::new(JsonSizeEstimator), Arc::new(SystemClock))
    }
}

impl<V> LruMemory<V>
where
    V: Clone + Send + 'static,
{
    /// Create a store with a custom size estimator and clock.
    pub fn with_parts(
        config: MemoryConfig,
        estimator: Arc<dyn SizeEstimator<V>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(Mutex::new(MemoryState::new())),
            config,
            estimator,
            clock,
        })
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Look up a value, refreshing its recency.
    ///
    /// An expired item is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let expired = state
            .items
            .get(key)
            .map(|slot| slot.item.is_expired(now, self.config.ttl));

        match expired {
            None => {
                state.misses += 1;
                return None;
            }
            Some(true) => {
                state.remove_entry(key);
                state.expirations += 1;
                state.misses += 1;
                debug!("Item {} expired on read", key);
                return None;
            }
            Some(false) => {}
        }

        state.promote(key);
        state.hits += 1;
        let slot = state.items.get_mut(key)?;
        slot.item.touch(now);
        Some(slot.item.value.clone())
    }

    /// Store an untagged value. See [`put_with_tags`](Self::put_with_tags).
    pub fn put(&self, key: impl Into<String>, value: V) -> bool {
        self.put_with_tags(key, value, std::iter::empty::<String>())
    }

    /// Store a value with grouping tags.
    ///
    /// Returns `false` without touching the store when the value's estimated
    /// size exceeds half the capacity. Otherwise the value replaces any
    /// existing entry for `key`, expired items are swept, and least recently
    /// used items are evicted until the store fits its capacity again.
    pub fn put_with_tags<I, T>(&self, key: impl Into<String>, value: V, tags: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let key = key.into();
        let size_bytes = self.estimate_size(&key, &value);

        if size_bytes > self.config.max_size_bytes / 2 {
            warn!("Item {} too large: {} bytes", key, size_bytes);
            return false;
        }

        let tags: HashSet<String> = tags.into_iter().map(Into::into).collect();
        let mut state = self.state.lock();
        let now = self.clock.now();

        state.insert(MemoryItem::new(key, value, now, size_bytes, tags));
        state.purge_expired(now, self.config.ttl);
        state.evict_to_capacity(self.config.max_size_bytes);

        true
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove_entry(key).is_some()
    }

    /// Remove every item.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        state.recency.clear();
        state.current_size_bytes = 0;
    }

    /// Remove items carrying any of `tags`, returning how many were removed.
    pub fn clear_tags<I, T>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags: HashSet<String> = tags.into_iter().map(Into::into).collect();
        let removed = self.state.lock().remove_where(|item| item.has_any_tag(&tags));
        debug!("Cleared {} items by tag", removed);
        removed
    }

    /// List live items carrying `tag`, from least to most recently used.
    ///
    /// This is an enumeration, not an access: recency and access counts are
    /// left alone.
    pub fn get_items_by_tag(&self, tag: &str) -> Vec<(String, V)> {
        let state = self.state.lock();
        let now = self.clock.now();

        state
            .ordered()
            .filter(|item| item.tags.contains(tag) && !item.is_expired(now, self.config.ttl))
            .map(|item| (item.key.clone(), item.value.clone()))
            .collect()
    }

    /// Whether a live item exists for `key`, without counting an access.
    pub fn contains_key(&self, key: &str) -> bool {
        let state = self.state.lock();
        let now = self.clock.now();
        state
            .items
            .get(key)
            .is_some_and(|slot| !slot.item.is_expired(now, self.config.ttl))
    }

    /// Drop every expired item now, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.purge_expired(now, self.config.ttl)
    }

    /// Number of items held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Snapshot the store's counters without side effects.
    ///
    /// The hit rate is hits over all lookups; utilization is the current size
    /// over the capacity. Both are percentages and read `0.0` when undefined.
    ///
    /// # Examples
    ///
    /// ```
    /// use recall::config::MemoryConfig;
    /// use recall::memory::LruMemory;
    /// use serde_json::json;
    ///
    /// let memory: LruMemory = LruMemory::new(MemoryConfig::new(10_000, 3600)).unwrap();
    /// memory.put("k", json!("v"));
    /// memory.get("k");
    /// memory.get("missing");
    ///
    /// let stats = memory.get_stats();
    /// assert_eq!(stats.hits, 1);
    /// assert_eq!(stats.misses, 1);
    /// assert_eq!(stats.hit_rate_pct, 50.0);
    /// ```
    pub fn get_stats(&self) -> MemoryStats {
        let state = self.state.lock();
        let lookups = state.hits + state.misses;

        MemoryStats {
            total_items: state.items.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
            current_size_bytes: state.current_size_bytes,
            max_size_bytes: self.config.max_size_bytes,
            utilization_pct: percentage(
                state.current_size_bytes as f64,
                self.config.max_size_bytes as f64,
            ),
            hit_rate_pct: percentage(state.hits as f64, lookups as f64),
        }
    }

    /// Describe the store's occupancy: item count, total size, and the
    /// items at either end of the recency order plus the most accessed one.
    ///
    /// # Examples
    ///
    /// ```
    /// use recall::config::MemoryConfig;
    /// use recall::memory::LruMemory;
    /// use serde_json::json;
    ///
    /// let memory: LruMemory = LruMemory::new(MemoryConfig::new(10_000, 3600)).unwrap();
    /// memory.put("a", json!(1));
    /// memory.put("b", json!(2));
    /// memory.get("b");
    ///
    /// let usage = memory.get_memory_usage();
    /// assert_eq!(usage.oldest_item.unwrap().key, "a");
    /// assert_eq!(usage.most_accessed.unwrap().key, "b");
    /// ```
    pub fn get_memory_usage(&self) -> MemoryUsage {
        let state = self.state.lock();

        // first maximum wins, i.e. the one closest to the stale end
        let most_accessed = state
            .ordered()
            .reduce(|best, item| {
                if item.access_count > best.access_count {
                    item
                } else {
                    best
                }
            })
            .map(MemoryItem::summary);
        let oldest_item = state.ordered().next().map(MemoryItem::summary);
        let newest_item = state.ordered().last().map(MemoryItem::summary);

        MemoryUsage {
            total_items: state.items.len(),
            total_size_bytes: state.current_size_bytes,
            oldest_item,
            newest_item,
            most_accessed,
        }
    }

    fn estimate_size(&self, key: &str, value: &V) -> usize {
        match self.estimator.estimate(value) {
            Ok(size) => size,
            Err(e) => {
                debug!(
                    "Could not estimate size of {}: {}; assuming {} bytes",
                    key, e, self.config.fallback_size_bytes
                );
                self.config.fallback_size_bytes
            }
        }
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecallError;
    use crate::memory::clock::ManualClock;
    use crate::memory::estimator::FnSizeEstimator;
    use serde_json::json;
    use std::thread;

    /// Store of strings sized by their byte length, with a controllable clock.
    fn sized_memory(
        max_size_bytes: usize,
        ttl_seconds: u64,
    ) -> (LruMemory<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let memory = LruMemory::with_parts(
            MemoryConfig::new(max_size_bytes, ttl_seconds),
            Arc::new(FnSizeEstimator::new(|value: &String| Ok(value.len()))),
            clock.clone(),
        )
        .unwrap();
        (memory, clock)
    }

    fn blob(size: usize) -> String {
        "x".repeat(size)
    }

    fn assert_size_invariant<V>(memory: &LruMemory<V>) {
        let state = memory.state.lock();
        let summed: usize = state.items.values().map(|slot| slot.item.size_bytes).sum();
        assert_eq!(state.current_size_bytes, summed);
        assert_eq!(state.items.len(), state.recency.len());
        assert!(state.current_size_bytes <= memory.config.max_size_bytes);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let err = LruMemory::<Value>::new(MemoryConfig::new(0, 60)).unwrap_err();
        assert!(matches!(err, RecallError::ConfigError(_)));
    }

    #[test]
    fn test_put_then_get() {
        let memory: LruMemory = LruMemory::new(MemoryConfig::new(10_000, 60)).unwrap();

        assert!(memory.put("user", json!({"name": "Alice"})));
        let value = memory.get("user").unwrap();

        assert_eq!(value["name"], "Alice");
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_get_unknown_key_is_miss() {
        let (memory, _) = sized_memory(1000, 60);

        assert!(memory.get("missing").is_none());

        let stats = memory.get_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_lru_item_evicted_when_full() {
        let (memory, _) = sized_memory(1000, 3600);

        assert!(memory.put("a", blob(400)));
        assert!(memory.put("b", blob(400)));
        assert!(memory.put("c", blob(400)));

        assert!(memory.get("a").is_none());
        assert!(memory.get("b").is_some());
        assert!(memory.get("c").is_some());

        let stats = memory.get_stats();
        assert_eq!(stats.current_size_bytes, 800);
        assert_eq!(stats.evictions, 1);
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_get_protects_item_from_eviction() {
        let (memory, _) = sized_memory(1000, 3600);

        memory.put("a", blob(400));
        memory.put("b", blob(400));
        assert!(memory.get("a").is_some());
        memory.put("c", blob(400));

        assert!(memory.get("a").is_some());
        assert!(memory.get("b").is_none());
        assert!(memory.get("c").is_some());
    }

    #[test]
    fn test_zero_ttl_expires_on_read() {
        let (memory, clock) = sized_memory(1000, 0);

        memory.put("x", blob(10));
        assert_eq!(memory.get_stats().total_items, 1);

        clock.advance(chrono::Duration::milliseconds(1));

        assert!(memory.get("x").is_none());
        let stats = memory.get_stats();
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.current_size_bytes, 0);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_read_does_not_count_access() {
        let (memory, clock) = sized_memory(1000, 10);

        memory.put("x", blob(10));
        assert!(memory.get("x").is_some());
        clock.advance(chrono::Duration::seconds(11));
        assert!(memory.get("x").is_none());

        let stats = memory.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_ttl_counts_from_creation_not_access() {
        let (memory, clock) = sized_memory(1000, 10);

        memory.put("x", blob(10));
        clock.advance(chrono::Duration::seconds(6));
        assert!(memory.get("x").is_some());
        clock.advance(chrono::Duration::seconds(6));

        assert!(memory.get("x").is_none());
    }

    #[test]
    fn test_put_sweeps_expired_items() {
        let (memory, clock) = sized_memory(1000, 10);

        memory.put("old", blob(100));
        clock.advance(chrono::Duration::seconds(11));
        memory.put("new", blob(100));

        let stats = memory.get_stats();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.current_size_bytes, 100);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 0);
    }

    #[test]
    fn test_oversized_put_rejected_without_change() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put("a", blob(100));
        let before = memory.get_stats();

        assert!(!memory.put("big", blob(501)));

        assert_eq!(memory.get_stats(), before);
        assert!(!memory.contains_key("big"));
    }

    #[test]
    fn test_half_capacity_item_accepted() {
        let (memory, _) = sized_memory(1000, 3600);
        assert!(memory.put("half", blob(500)));
    }

    #[test]
    fn test_oversized_replacement_keeps_old_value() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put("a", blob(100));

        assert!(!memory.put("a", blob(900)));
        assert_eq!(memory.get("a").unwrap().len(), 100);
    }

    #[test]
    fn test_overwrite_replaces_size() {
        let (memory, _) = sized_memory(1000, 3600);

        memory.put("a", blob(300));
        memory.put("a", blob(100));

        let stats = memory.get_stats();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.current_size_bytes, 100);
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_overwrite_moves_to_recent_end() {
        let (memory, _) = sized_memory(1000, 3600);

        memory.put("a", blob(400));
        memory.put("b", blob(400));
        memory.put("a", blob(400));
        memory.put("c", blob(400));

        assert!(memory.contains_key("a"));
        assert!(!memory.contains_key("b"));
    }

    #[test]
    fn test_overwrite_resets_access_count() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put("a", blob(10));
        memory.get("a");
        memory.put("a", blob(20));

        let usage = memory.get_memory_usage();
        assert_eq!(usage.newest_item.unwrap().access_count, 0);
    }

    #[test]
    fn test_estimation_failure_uses_fallback() {
        let memory = LruMemory::with_parts(
            MemoryConfig::new(10_000, 3600).with_fallback_size(1024),
            Arc::new(FnSizeEstimator::new(|_: &String| {
                Err(RecallError::ConfigError("unmeasurable".to_string()))
            })),
            Arc::new(SystemClock),
        )
        .unwrap();

        assert!(memory.put("a", "value".to_string()));
        assert_eq!(memory.get_stats().current_size_bytes, 1024);
    }

    #[test]
    fn test_fallback_can_exceed_half_capacity() {
        let memory = LruMemory::with_parts(
            MemoryConfig::new(1000, 3600),
            Arc::new(FnSizeEstimator::new(|_: &String| {
                Err(RecallError::ConfigError("unmeasurable".to_string()))
            })),
            Arc::new(SystemClock),
        )
        .unwrap();

        assert!(!memory.put("a", "value".to_string()));
        assert!(memory.is_empty());
    }

    #[test]
    fn test_remove() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put("a", blob(100));

        assert!(memory.remove("a"));
        assert!(!memory.remove("a"));
        assert_eq!(memory.get_stats().current_size_bytes, 0);
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_clear_all() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put_with_tags("a", blob(100), ["t"]);
        memory.put("b", blob(100));

        memory.clear();

        assert!(memory.is_empty());
        assert_eq!(memory.get_stats().current_size_bytes, 0);
        assert!(memory.get_items_by_tag("t").is_empty());
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_clear_by_tag_leaves_other_tags() {
        let (memory, _) = sized_memory(10_000, 3600);
        memory.put_with_tags("s7-a", blob(10), ["session-7"]);
        memory.put_with_tags("s7-b", blob(10), ["session-7", "shared"]);
        memory.put_with_tags("s8-a", blob(20), ["session-8"]);
        memory.put_with_tags("s8-b", blob(30), ["session-8"]);
        let before = memory.get_items_by_tag("session-8");

        let removed = memory.clear_tags(["session-7"]);

        assert_eq!(removed, 2);
        assert!(memory.get_items_by_tag("session-7").is_empty());
        assert_eq!(memory.get_items_by_tag("session-8"), before);
        assert_eq!(memory.get_stats().current_size_bytes, 50);
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_clear_with_no_tags_removes_nothing() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put_with_tags("a", blob(10), ["t"]);

        assert_eq!(memory.clear_tags(Vec::<String>::new()), 0);
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_items_by_tag_in_recency_order() {
        let (memory, _) = sized_memory(10_000, 3600);
        memory.put_with_tags("a", blob(1), ["t"]);
        memory.put_with_tags("b", blob(2), ["t"]);
        memory.put("c", blob(3));
        memory.get("a");

        let keys: Vec<String> = memory.get_items_by_tag("t").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_items_by_tag_is_not_an_access() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put_with_tags("a", blob(400), ["t"]);
        memory.put("b", blob(400));

        assert_eq!(memory.get_items_by_tag("t").len(), 1);
        memory.put("c", blob(400));

        assert!(!memory.contains_key("a"));
        assert_eq!(memory.get_stats().hits, 0);
    }

    #[test]
    fn test_items_by_tag_skips_expired() {
        let (memory, clock) = sized_memory(1000, 10);
        memory.put_with_tags("a", blob(10), ["t"]);
        clock.advance(chrono::Duration::seconds(11));

        assert!(memory.get_items_by_tag("t").is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let (memory, clock) = sized_memory(1000, 10);
        memory.put("a", blob(10));
        memory.put("b", blob(10));
        clock.advance(chrono::Duration::seconds(5));
        memory.put("c", blob(10));
        clock.advance(chrono::Duration::seconds(6));

        assert_eq!(memory.purge_expired(), 2);
        assert_eq!(memory.len(), 1);
        assert!(memory.contains_key("c"));
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_eviction_empties_store_if_needed() {
        let (memory, _) = sized_memory(1000, 3600);
        for i in 0..10 {
            memory.put(format!("k{}", i), blob(100));
        }
        memory.put("last", blob(500));

        assert!(memory.contains_key("last"));
        assert_eq!(memory.get_stats().current_size_bytes, 1000);
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_stats_rates() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put("a", blob(250));
        memory.get("a");
        memory.get("a");
        memory.get("a");
        memory.get("missing");

        let stats = memory.get_stats();
        assert_eq!(stats.max_size_bytes, 1000);
        assert!((stats.utilization_pct - 25.0).abs() < f64::EPSILON);
        assert!((stats.hit_rate_pct - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_on_empty_store() {
        let (memory, _) = sized_memory(1000, 3600);
        let stats = memory.get_stats();

        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.hit_rate_pct, 0.0);
        assert_eq!(stats.utilization_pct, 0.0);
    }

    #[test]
    fn test_stats_serialize() {
        let (memory, _) = sized_memory(1000, 3600);
        memory.put("a", blob(10));

        let value = serde_json::to_value(memory.get_stats()).unwrap();
        assert_eq!(value["total_items"], 1);
        assert_eq!(value["current_size_bytes"], 10);
    }

    #[test]
    fn test_memory_usage() {
        let (memory, clock) = sized_memory(10_000, 3600);
        memory.put("a", blob(10));
        clock.advance(chrono::Duration::seconds(1));
        memory.put("b", blob(20));
        clock.advance(chrono::Duration::seconds(1));
        memory.put("c", blob(30));
        memory.get("b");
        memory.get("b");
        memory.get("c");

        let usage = memory.get_memory_usage();

        assert_eq!(usage.total_items, 3);
        assert_eq!(usage.total_size_bytes, 60);
        assert_eq!(usage.oldest_item.unwrap().key, "a");
        let newest = usage.newest_item.unwrap();
        assert_eq!(newest.key, "c");
        assert_eq!(newest.access_count, 1);
        let most = usage.most_accessed.unwrap();
        assert_eq!(most.key, "b");
        assert_eq!(most.access_count, 2);
    }

    #[test]
    fn test_memory_usage_tie_prefers_stale_end() {
        let (memory, _) = sized_memory(10_000, 3600);
        memory.put("a", blob(10));
        memory.put("b", blob(10));

        let usage = memory.get_memory_usage();
        assert_eq!(usage.most_accessed.unwrap().key, "a");
    }

    #[test]
    fn test_memory_usage_empty() {
        let (memory, _) = sized_memory(1000, 3600);
        let usage = memory.get_memory_usage();

        assert_eq!(usage.total_items, 0);
        assert!(usage.oldest_item.is_none());
        assert!(usage.newest_item.is_none());
        assert!(usage.most_accessed.is_none());
    }

    #[test]
    fn test_largest_capacity_does_not_overflow() {
        let max = MemoryConfig::MAX_SIZE_BYTES;
        let memory = LruMemory::with_parts(
            MemoryConfig::new(max, 3600),
            Arc::new(FnSizeEstimator::new(|size: &usize| Ok(*size))),
            Arc::new(SystemClock),
        )
        .unwrap();

        assert!(memory.put("a", max / 2));
        assert!(memory.put("b", max / 2));
        assert!(memory.put("c", max / 2));

        let stats = memory.get_stats();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.evictions, 1);
        assert!(!memory.contains_key("a"));
        assert_size_invariant(&memory);
    }

    #[test]
    fn test_clone_shares_store() {
        let (memory, _) = sized_memory(1000, 3600);
        let other = memory.clone();

        other.put("a", blob(10));

        assert!(memory.contains_key("a"));
    }

    #[test]
    fn test_size_invariant_over_mixed_operations() {
        let (memory, clock) = sized_memory(2000, 50);
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let key = format!("k{}", seed % 40);
            match seed % 7 {
                0 | 1 | 2 => {
                    let size = (seed % 1200) as usize;
                    let accepted = memory.put(key.clone(), blob(size));
                    assert_eq!(accepted, size <= 1000);
                }
                3 | 4 => {
                    memory.get(&key);
                }
                5 => {
                    memory.remove(&key);
                }
                _ => clock.advance(chrono::Duration::seconds((seed % 20) as i64)),
            }
            assert_size_invariant(&memory);
        }
    }

    #[test]
    fn test_thread_safety() {
        let (memory, _) = sized_memory(5000, 3600);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let mem = memory.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("t{}-{}", t, i % 25);
                        let tag = format!("thread-{}", t);
                        mem.put_with_tags(key.clone(), blob(50 + i % 100), [tag]);
                        mem.get(&key);
                        if i % 10 == 0 {
                            mem.remove(&key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_size_invariant(&memory);
        let stats = memory.get_stats();
        assert_eq!(stats.hits + stats.misses, 8 * 200);
    }
}
