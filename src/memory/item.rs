//! Stored entries and their metadata snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// A cached value together with its access and expiry metadata.
#[derive(Debug, Clone)]
pub struct MemoryItem<V> {
    pub key: String,
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
    pub size_bytes: usize,
    pub tags: HashSet<String>,
}

impl<V> MemoryItem<V> {
    /// A fresh item, created and last accessed at `now`, never read.
    pub fn new(
        key: String,
        value: V,
        now: DateTime<Utc>,
        size_bytes: usize,
        tags: HashSet<String>,
    ) -> Self {
        Self {
            key,
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            size_bytes,
            tags,
        }
    }

    /// Record an access.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
        self.access_count += 1;
    }

    /// True once more than `ttl` has passed since creation.
    ///
    /// A clock that moved backwards never expires an item.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match now.signed_duration_since(self.created_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }

    /// True if the item carries at least one of `tags`.
    pub fn has_any_tag(&self, tags: &HashSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    /// Key, creation time and access count, without the value.
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            key: self.key.clone(),
            created_at: self.created_at,
            access_count: self.access_count,
        }
    }
}

/// Metadata snapshot of a single item, as reported by
/// [`LruMemory::get_memory_usage`](super::LruMemory::get_memory_usage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub access_count: u64,
}
