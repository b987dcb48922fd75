//! Keyed fetch cache with request deduplication.
//!
//! The cache maps a [`CacheKey`] to the state of one result set. Reads go
//! through [`FetchCache::get_or_fetch`]: a fresh entry is returned directly,
//! otherwise the fetcher runs, and every concurrent reader of the same key
//! awaits that single in-flight fetch.
//!
//! # Ordering
//!
//! Every fetch issued for a key takes the next generation number of that key.
//! Writes and forced re-fetches bump the generation too. A response is applied
//! only if its generation is still the latest, so a slow response can never
//! overwrite a newer fetch result or an optimistic write.
//!
//! The state lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Listeners are called after the lock is released.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use fleetdeck_core::{ApiError, ApiResult, CacheKey, KeyPredicate};
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::entry::{CacheEntry, CacheStats, EntryState, EntryStatus};

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync>;
type SharedFetch<T> = Shared<BoxFuture<'static, ApiResult<T>>>;

/// Change callback. Receives `None` when the key no longer holds an entry.
pub type Listener<T> = Arc<dyn Fn(&CacheKey, Option<&CacheEntry<T>>) + Send + Sync>;

struct Inflight<T> {
    generation: u64,
    future: SharedFetch<T>,
    /// Invalidated while running: the result is stored as stale.
    invalidated: bool,
}

struct Slot<T> {
    state: Option<EntryState<T>>,
    generation: u64,
    inflight: Option<Inflight<T>>,
    /// Superseded fetches whose response has not come back yet.
    orphaned: Vec<Inflight<T>>,
    fetcher: Option<Fetcher<T>>,
    listeners: Vec<(u64, Listener<T>)>,
    idle_since: Option<Instant>,
}

impl<T: Clone + Send + Sync + 'static> Slot<T> {
    fn new() -> Self {
        Self {
            state: None,
            generation: 0,
            inflight: None,
            orphaned: Vec::new(),
            fetcher: None,
            listeners: Vec::new(),
            idle_since: Some(Instant::now()),
        }
    }

    fn snapshot(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.state
            .as_ref()
            .map(|state| state.to_entry(key, self.listeners.len()))
    }

    /// Drop any in-flight fetch so its response is ignored.
    fn supersede(&mut self) {
        if let Some(old) = self.inflight.take() {
            self.orphaned.push(old);
        }
        self.generation += 1;
    }

    fn start_fetch(&mut self, fetcher: &Fetcher<T>) -> (u64, SharedFetch<T>) {
        self.supersede();
        let future = fetcher().shared();
        self.inflight = Some(Inflight {
            generation: self.generation,
            future: future.clone(),
            invalidated: false,
        });
        match self.state.as_mut() {
            Some(state) => state.status = EntryStatus::Pending,
            None => self.state = Some(EntryState::pending()),
        }
        (self.generation, future)
    }

    /// Re-adopt the newest superseded fetch so a restored pending entry
    /// settles with its response. With none left, the entry is marked stale
    /// so the next read fetches again.
    fn resume_orphan(&mut self, key: &CacheKey) {
        let newest = self
            .orphaned
            .iter()
            .enumerate()
            .max_by_key(|(_, o)| o.generation)
            .map(|(pos, _)| pos);
        match newest {
            Some(pos) => {
                let inflight = self.orphaned.swap_remove(pos);
                debug!(key = %key, generation = inflight.generation, "resuming superseded fetch");
                self.inflight = Some(inflight);
            }
            None => {
                if let Some(state) = self.state.as_mut() {
                    state.is_stale = true;
                }
            }
        }
    }

    fn notification(&self, key: &CacheKey) -> Option<Notification<T>> {
        if self.listeners.is_empty() {
            return None;
        }
        Some(Notification {
            key: key.clone(),
            entry: self.snapshot(key),
            listeners: self.listeners.iter().map(|(_, l)| l.clone()).collect(),
        })
    }
}

struct Notification<T> {
    key: CacheKey,
    entry: Option<CacheEntry<T>>,
    listeners: Vec<Listener<T>>,
}

impl<T> Notification<T> {
    fn deliver(self) {
        for listener in &self.listeners {
            listener(&self.key, self.entry.as_ref());
        }
    }
}

struct Inner<T> {
    slots: HashMap<CacheKey, Slot<T>>,
    stats: CacheStats,
    next_listener: u64,
}

enum Settled<T> {
    Done(ApiResult<CacheEntry<T>>),
    /// A newer fetch replaced ours; follow it.
    Follow(u64, SharedFetch<T>),
}

/// Shared, cloneable handle to one cache.
pub struct FetchCache<T> {
    inner: Arc<Mutex<Inner<T>>>,
    config: CacheConfig,
}

impl<T> Clone for FetchCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for FetchCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for FetchCache<T> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<T: Clone + Send + Sync + 'static> FetchCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                slots: HashMap::new(),
                stats: CacheStats::default(),
                next_listener: 0,
            })),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the entry for `key`, fetching it if it is missing or not fresh.
    ///
    /// Concurrent callers for the same key share one fetch. The fetcher is
    /// remembered for the key and reused by invalidation and [`refetch`].
    /// A failed fetch returns the error and leaves earlier data in place.
    ///
    /// [`refetch`]: FetchCache::refetch
    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, fetcher: F) -> ApiResult<CacheEntry<T>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());

        let (generation, future, notification) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let slot = inner.slots.entry(key.clone()).or_insert_with(Slot::new);
            slot.fetcher = Some(fetcher.clone());

            if let Some(entry) = slot.snapshot(key) {
                if entry.is_fresh(Utc::now(), self.config.stale_time) {
                    inner.stats.hits += 1;
                    trace!(key = %key, "cache hit");
                    return Ok(entry);
                }
            }

            if let Some(inflight) = &slot.inflight {
                inner.stats.deduplicated += 1;
                debug!(key = %key, generation = inflight.generation, "joining in-flight fetch");
                (inflight.generation, inflight.future.clone(), None)
            } else {
                inner.stats.misses += 1;
                let (generation, future) = slot.start_fetch(&fetcher);
                debug!(key = %key, generation, "fetch started");
                (generation, future, slot.notification(key))
            }
        };

        if let Some(notification) = notification {
            notification.deliver();
        }
        self.drive(key.clone(), generation, future).await
    }

    /// Start a new fetch for `key` with its registered fetcher, superseding
    /// any fetch already in flight.
    pub async fn refetch(&self, key: &CacheKey) -> ApiResult<CacheEntry<T>> {
        let (generation, future, notification) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let Some(slot) = inner.slots.get_mut(key) else {
                return Err(unregistered(key));
            };
            let Some(fetcher) = slot.fetcher.clone() else {
                return Err(unregistered(key));
            };
            inner.stats.misses += 1;
            let (generation, future) = slot.start_fetch(&fetcher);
            debug!(key = %key, generation, "forced refetch");
            (generation, future, slot.notification(key))
        };

        if let Some(notification) = notification {
            notification.deliver();
        }
        self.drive(key.clone(), generation, future).await
    }

    async fn drive(
        &self,
        key: CacheKey,
        mut generation: u64,
        mut future: SharedFetch<T>,
    ) -> ApiResult<CacheEntry<T>> {
        loop {
            let result = future.await;
            let (settled, notification) = self.settle(&key, generation, result);
            if let Some(notification) = notification {
                notification.deliver();
            }
            match settled {
                Settled::Done(result) => return result,
                Settled::Follow(next_generation, next_future) => {
                    generation = next_generation;
                    future = next_future;
                }
            }
        }
    }

    fn settle(
        &self,
        key: &CacheKey,
        generation: u64,
        result: ApiResult<T>,
    ) -> (Settled<T>, Option<Notification<T>>) {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let Some(slot) = inner.slots.get_mut(key) else {
            trace!(key = %key, generation, "key removed while fetching");
            return (Settled::Done(detached(key, result)), None);
        };

        let is_current = slot
            .inflight
            .as_ref()
            .map_or(false, |inflight| inflight.generation == generation);

        if !is_current {
            if let Some(pos) = slot.orphaned.iter().position(|o| o.generation == generation) {
                slot.orphaned.swap_remove(pos);
                inner.stats.discarded += 1;
                debug!(
                    key = %key,
                    generation,
                    latest = slot.generation,
                    "discarding superseded fetch response"
                );
            }
            if let Some(next) = &slot.inflight {
                return (Settled::Follow(next.generation, next.future.clone()), None);
            }
            // Either a co-awaiter already applied this response or a write
            // replaced it. The stored state is the answer in both cases.
            let settled = match slot.snapshot(key) {
                Some(entry) => outcome_of(entry),
                None => detached(key, result),
            };
            return (Settled::Done(settled), None);
        }

        let invalidated = slot
            .inflight
            .take()
            .map_or(false, |inflight| inflight.invalidated);
        let subscribers = slot.listeners.len();

        let settled = match result {
            Ok(data) => {
                let mut state = EntryState::success(data, Utc::now());
                state.is_stale = invalidated;
                let entry = state.to_entry(key, subscribers);
                slot.state = Some(state);
                trace!(key = %key, generation, "fetch applied");
                Ok(entry)
            }
            Err(error) => {
                debug!(
                    key = %key,
                    generation,
                    status = error.status_code,
                    error = %error.message,
                    "fetch failed"
                );
                let state = slot.state.get_or_insert_with(EntryState::pending);
                state.status = EntryStatus::Error;
                state.error = Some(error.clone());
                Err(error)
            }
        };

        (Settled::Done(settled), slot.notification(key))
    }

    /// Force-set `key` to `data` with status success.
    ///
    /// Any fetch in flight for the key is superseded; its response will be
    /// discarded.
    pub fn write(&self, key: &CacheKey, data: T) -> CacheEntry<T> {
        let (entry, notification) = {
            let mut guard = self.lock();
            let slot = guard.slots.entry(key.clone()).or_insert_with(Slot::new);
            slot.supersede();
            let state = EntryState::success(data, Utc::now());
            let entry = state.to_entry(key, slot.listeners.len());
            slot.state = Some(state);
            (entry, slot.notification(key))
        };
        trace!(key = %key, "entry written");
        if let Some(notification) = notification {
            notification.deliver();
        }
        entry
    }

    /// Put `key` back into exactly the state captured in `previous`.
    ///
    /// `None` restores absence. Subscriber bookkeeping is left as it is now.
    pub(crate) fn restore(&self, key: &CacheKey, previous: Option<CacheEntry<T>>) {
        let notification = {
            let mut guard = self.lock();
            match guard.slots.get_mut(key) {
                Some(slot) => {
                    let was_pending = previous.as_ref().map_or(false, CacheEntry::is_pending);
                    slot.supersede();
                    slot.state = previous.map(EntryState::from);
                    if was_pending {
                        slot.resume_orphan(key);
                    }
                    slot.notification(key)
                }
                None => {
                    if let Some(previous) = previous {
                        let mut slot = Slot::new();
                        slot.state = Some(previous.into());
                        guard.slots.insert(key.clone(), slot);
                    }
                    None
                }
            }
        };
        if let Some(notification) = notification {
            notification.deliver();
        }
    }

    /// Delete the entry for `key`. Returns what was stored.
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let (removed, notification) = {
            let mut guard = self.lock();
            let subscribed = guard
                .slots
                .get(key)
                .map_or(false, |slot| !slot.listeners.is_empty());
            if subscribed {
                let Some(slot) = guard.slots.get_mut(key) else {
                    return None;
                };
                let removed = slot.snapshot(key);
                slot.supersede();
                slot.state = None;
                (removed, slot.notification(key))
            } else {
                let removed = guard
                    .slots
                    .remove(key)
                    .and_then(|slot| slot.snapshot(key));
                (removed, None)
            }
        };
        if let Some(notification) = notification {
            notification.deliver();
        }
        removed
    }

    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.lock().slots.get(key).and_then(|slot| slot.snapshot(key))
    }

    pub fn data(&self, key: &CacheKey) -> Option<T> {
        self.lock()
            .slots
            .get(key)
            .and_then(|slot| slot.state.as_ref())
            .and_then(|state| state.data.clone())
    }

    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        self.lock()
            .slots
            .get(key)
            .map_or(false, |slot| slot.inflight.is_some())
    }

    /// Keys currently holding an entry, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let guard = self.lock();
        let mut keys: Vec<CacheKey> = guard
            .slots
            .iter()
            .filter(|(_, slot)| slot.state.is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Mark every entry matching `predicate` stale.
    ///
    /// Entries with subscribers are re-fetched now and this call waits for
    /// those fetches to settle. Entries without subscribers are re-fetched
    /// on their next read. A fetch already in flight for an unsubscribed
    /// entry stores its result as stale. Returns the number of entries
    /// matched.
    pub async fn invalidate(&self, predicate: &KeyPredicate) -> usize {
        let mut refetches = Vec::new();
        let mut notifications = Vec::new();
        let mut matched = 0;

        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            for (key, slot) in inner.slots.iter_mut() {
                if !predicate.matches(key) || (slot.state.is_none() && slot.inflight.is_none()) {
                    continue;
                }
                matched += 1;
                if let Some(state) = slot.state.as_mut() {
                    state.is_stale = true;
                }
                match slot.fetcher.clone() {
                    Some(fetcher) if !slot.listeners.is_empty() => {
                        inner.stats.misses += 1;
                        let (generation, future) = slot.start_fetch(&fetcher);
                        refetches.push((key.clone(), generation, future));
                    }
                    _ => {
                        if let Some(inflight) = slot.inflight.as_mut() {
                            inflight.invalidated = true;
                        }
                    }
                }
                notifications.extend(slot.notification(key));
            }
        }

        debug!(?predicate, matched, refetching = refetches.len(), "invalidated entries");
        for notification in notifications {
            notification.deliver();
        }
        // Failures are recorded on the entries themselves.
        join_all(
            refetches
                .into_iter()
                .map(|(key, generation, future)| self.drive(key, generation, future)),
        )
        .await;
        matched
    }

    /// Register `listener` for changes to `key`.
    ///
    /// The key counts as subscribed until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, key: &CacheKey, listener: F) -> Subscription
    where
        F: Fn(&CacheKey, Option<&CacheEntry<T>>) + Send + Sync + 'static,
    {
        let id = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            inner.next_listener += 1;
            let id = inner.next_listener;
            let slot = inner.slots.entry(key.clone()).or_insert_with(Slot::new);
            slot.listeners.push((id, Arc::new(listener)));
            slot.idle_since = None;
            id
        };

        let weak = Arc::downgrade(&self.inner);
        let key = key.clone();
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = guard.slots.get_mut(&key) {
                slot.listeners.retain(|(listener_id, _)| *listener_id != id);
                if slot.listeners.is_empty() {
                    slot.idle_since = Some(Instant::now());
                }
            }
        })
    }

    /// Evict entries that have had no subscribers for longer than `gc_time`.
    pub fn collect_garbage(&self) -> usize {
        let gc_time = self.config.gc_time;
        let mut guard = self.lock();
        let before = guard.slots.len();
        guard.slots.retain(|key, slot| {
            let expired = slot.listeners.is_empty()
                && slot.inflight.is_none()
                && slot.idle_since.map_or(false, |since| since.elapsed() >= gc_time);
            if expired {
                trace!(key = %key, "evicting idle entry");
            }
            !expired
        });
        let evicted = before - guard.slots.len();
        guard.stats.evictions += evicted as u64;
        if evicted > 0 {
            debug!(evicted, "cache garbage collected");
        }
        evicted
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.lock();
        let mut stats = guard.stats.clone();
        stats.entry_count = guard
            .slots
            .values()
            .filter(|slot| slot.state.is_some())
            .count() as u64;
        stats
    }
}

fn outcome_of<T>(entry: CacheEntry<T>) -> ApiResult<CacheEntry<T>> {
    match (&entry.status, &entry.error) {
        (EntryStatus::Error, Some(error)) => Err(error.clone()),
        _ => Ok(entry),
    }
}

fn unregistered(key: &CacheKey) -> ApiError {
    ApiError::not_found(format!("no query registered for {}", key))
}

fn detached<T: Clone>(key: &CacheKey, result: ApiResult<T>) -> ApiResult<CacheEntry<T>> {
    result.map(|data| EntryState::success(data, Utc::now()).to_entry(key, 0))
}

/// Keeps a listener registered. Unsubscribes when dropped.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(id: &str) -> CacheKey {
        CacheKey::detail("agents", id)
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_fetching() {
        let cache = FetchCache::<u32>::default();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            let entry = cache
                .get_or_fetch(&key("a"), move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(7) }
                })
                .await
                .unwrap();
            assert_eq!(entry.data, Some(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_data() {
        let cache = FetchCache::<u32>::new(CacheConfig::new().with_stale_time(Duration::ZERO));
        cache.write(&key("a"), 1);

        let err = cache
            .get_or_fetch(&key("a"), || async { Err(ApiError::unavailable("down")) })
            .await
            .unwrap_err();
        assert_eq!(err.status_code, 503);

        let entry = cache.entry(&key("a")).unwrap();
        assert_eq!(entry.status, EntryStatus::Error);
        assert_eq!(entry.data, Some(1));
        assert_eq!(entry.error, Some(ApiError::unavailable("down")));
    }

    #[tokio::test]
    async fn test_subscription_counts_and_listener_calls() {
        let cache = FetchCache::<u32>::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let sub = cache.subscribe(&key("a"), move |_, entry| {
            if entry.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        let second = cache.subscribe(&key("a"), |_, _| {});

        assert_eq!(cache.write(&key("a"), 3).subscriber_count, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        drop(second);
        cache.write(&key("a"), 4);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry(&key("a")).unwrap().subscriber_count, 0);
    }

    #[tokio::test]
    async fn test_garbage_collection_spares_subscribed_entries() {
        let cache = FetchCache::<u32>::new(CacheConfig::new().with_gc_time(Duration::ZERO));
        cache.write(&key("idle"), 1);
        cache.write(&key("watched"), 2);
        let _sub = cache.subscribe(&key("watched"), |_, _| {});

        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.entry(&key("idle")).is_none());
        assert!(cache.entry(&key("watched")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_refetch_without_registered_fetcher_is_not_found() {
        let cache = FetchCache::<u32>::default();
        cache.write(&key("a"), 1);
        let err = cache.refetch(&key("a")).await.unwrap_err();
        assert_eq!(err.status_code, 404);
    }

    #[tokio::test]
    async fn test_remove_clears_entry() {
        let cache = FetchCache::<u32>::default();
        cache.write(&key("a"), 1);
        assert_eq!(cache.remove(&key("a")).and_then(|e| e.data), Some(1));
        assert!(cache.entry(&key("a")).is_none());
        assert!(cache.keys().is_empty());
    }
}
