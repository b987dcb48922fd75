//! Cache entries and cache statistics.

use chrono::{DateTime, Utc};
use fleetdeck_core::{ApiError, CacheKey};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// A fetch is in flight. Previously fetched data, if any, is still present.
    Pending,
    Success,
    /// The last fetch failed. Previously fetched data is kept.
    Error,
}

/// Point-in-time view of one cached key.
///
/// Entries handed out by the cache are snapshots: mutating one has no effect
/// on the cache. `subscriber_count` is cache bookkeeping and is not part of
/// the state restored by a rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub key: CacheKey,
    pub status: EntryStatus,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Set by invalidation; the next read re-fetches.
    pub is_stale: bool,
    pub subscriber_count: usize,
}

impl<T> CacheEntry<T> {
    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == EntryStatus::Error
    }

    /// Time since the data was last written, or `None` if never.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.fetched_at
            .map(|at| now.signed_duration_since(at).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether the entry can be served as-is under `stale_time`.
    pub fn is_fresh(&self, now: DateTime<Utc>, stale_time: Duration) -> bool {
        self.is_success()
            && !self.is_stale
            && self.age(now).map_or(false, |age| age < stale_time)
    }
}

/// State of one key, without the subscriber bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntryState<T> {
    pub status: EntryStatus,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub is_stale: bool,
}

impl<T: Clone> EntryState<T> {
    pub fn pending() -> Self {
        Self {
            status: EntryStatus::Pending,
            data: None,
            error: None,
            fetched_at: None,
            is_stale: false,
        }
    }

    pub fn success(data: T, now: DateTime<Utc>) -> Self {
        Self {
            status: EntryStatus::Success,
            data: Some(data),
            error: None,
            fetched_at: Some(now),
            is_stale: false,
        }
    }

    pub fn to_entry(&self, key: &CacheKey, subscriber_count: usize) -> CacheEntry<T> {
        CacheEntry {
            key: key.clone(),
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            is_stale: self.is_stale,
            subscriber_count,
        }
    }
}

impl<T> From<CacheEntry<T>> for EntryState<T> {
    fn from(entry: CacheEntry<T>) -> Self {
        Self {
            status: entry.status,
            data: entry.data,
            error: entry.error,
            fetched_at: entry.fetched_at,
            is_stale: entry.is_stale,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from a fresh entry.
    pub hits: u64,
    /// Reads that started a fetch.
    pub misses: u64,
    /// Reads that joined a fetch already in flight.
    pub deduplicated: u64,
    /// Fetch responses dropped because a newer request or a write superseded them.
    pub discarded: u64,
    /// Entries removed by garbage collection.
    pub evictions: u64,
    /// Keys currently held.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.deduplicated;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
