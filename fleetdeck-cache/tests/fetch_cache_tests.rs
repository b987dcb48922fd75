//! Behavioural tests for the fetch cache: deduplication, write/read,
//! invalidation and response ordering.

use std::sync::atomic::Ordering;
use std::time::Duration;

use fleetdeck_cache::{CacheConfig, EntryStatus, FetchCache};
use fleetdeck_core::{ApiError, CacheKey, KeyPredicate, Query};
use fleetdeck_test_utils::{counting_fetcher, failing_fetcher, ScriptedFetcher};
use futures_util::future::join_all;
use proptest::prelude::*;

fn list_key() -> CacheKey {
    Query::new("agents", 20).cache_key()
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = list_key();

    let reads = join_all((0..8).map(|_| cache.get_or_fetch(&key, script.fetcher())));
    let release = async {
        tokio::task::yield_now().await;
        assert!(script.resolve(0, Ok(42)));
    };
    let (results, ()) = tokio::join!(reads, release);

    assert_eq!(script.calls(), 1);
    for result in results {
        let entry = result.unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
        assert_eq!(entry.data, Some(42));
    }
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.deduplicated, 7);
}

#[tokio::test]
async fn write_then_read_returns_written_value() {
    let cache = FetchCache::<String>::default();
    let key = CacheKey::detail("agents", "agent-3");
    cache.write(&key, "deprecated".to_string());

    let entry = cache.entry(&key).unwrap();
    assert_eq!(entry.status, EntryStatus::Success);
    assert_eq!(entry.data.as_deref(), Some("deprecated"));

    // A fresh write is served without calling the fetcher.
    let (calls, fetcher) = counting_fetcher("from-server".to_string());
    let read = cache.get_or_fetch(&key, fetcher).await.unwrap();
    assert_eq!(read.data.as_deref(), Some("deprecated"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_invalidation_causes_one_refetch() {
    let cache = FetchCache::<u32>::default();
    let key = list_key();
    let (calls, fetcher) = counting_fetcher(1);
    cache.get_or_fetch(&key, fetcher).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    for _ in 0..3 {
        assert_eq!(cache.invalidate(&KeyPredicate::lists_of("agents")).await, 1);
    }
    assert!(cache.entry(&key).unwrap().is_stale);
    // No subscribers, so nothing was fetched eagerly.
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (again, fetcher) = counting_fetcher(2);
    let entry = cache.get_or_fetch(&key, fetcher).await.unwrap();
    assert_eq!(entry.data, Some(2));
    assert!(!entry.is_stale);
    let (_, fetcher) = counting_fetcher(3);
    cache.get_or_fetch(&key, fetcher).await.unwrap();
    assert_eq!(again.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidation_refetches_subscribed_entries_now() {
    let cache = FetchCache::<u32>::default();
    let key = list_key();
    let other = Query::new("categories", 20).cache_key();
    let (calls, fetcher) = counting_fetcher(5);
    cache.get_or_fetch(&key, fetcher).await.unwrap();
    cache.write(&other, 9);
    let _sub = cache.subscribe(&key, |_, _| {});

    assert_eq!(cache.invalidate(&KeyPredicate::resource("agents")).await, 1);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let entry = cache.entry(&key).unwrap();
    assert_eq!(entry.status, EntryStatus::Success);
    assert!(!entry.is_stale);
    assert!(!cache.entry(&other).unwrap().is_stale);
}

#[tokio::test]
async fn latest_issued_response_wins() {
    let cache = FetchCache::<&'static str>::default();
    let script = ScriptedFetcher::new();
    let key = list_key();

    let first = cache.get_or_fetch(&key, script.fetcher());
    let second = async {
        tokio::task::yield_now().await;
        cache.refetch(&key).await
    };
    let release = async {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(script.calls(), 2);
        // F2 resolves first, F1 second.
        assert!(script.resolve(1, Ok("second")));
        tokio::task::yield_now().await;
        assert!(script.resolve(0, Ok("first")));
    };
    let (first, second, ()) = tokio::join!(first, second, release);

    assert_eq!(second.unwrap().data, Some("second"));
    // The superseded reader follows the newer fetch.
    assert_eq!(first.unwrap().data, Some("second"));
    assert_eq!(cache.data(&key), Some("second"));
    assert_eq!(cache.stats().discarded, 1);
}

#[tokio::test]
async fn late_response_does_not_overwrite_a_write() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = CacheKey::detail("agents", "agent-7");

    let read = cache.get_or_fetch(&key, script.fetcher());
    let act = async {
        tokio::task::yield_now().await;
        cache.write(&key, 2);
        assert!(script.resolve(0, Ok(1)));
    };
    let (read, ()) = tokio::join!(read, act);

    assert_eq!(read.unwrap().data, Some(2));
    assert_eq!(cache.data(&key), Some(2));
}

#[tokio::test]
async fn failure_is_reported_and_keeps_stale_data() {
    let cache = FetchCache::<u32>::new(CacheConfig::new().with_stale_time(Duration::ZERO));
    let key = list_key();
    let (_, fetcher) = counting_fetcher(10);
    cache.get_or_fetch(&key, fetcher).await.unwrap();

    let err = cache
        .get_or_fetch(&key, failing_fetcher(ApiError::not_found("gone")))
        .await
        .unwrap_err();
    assert_eq!(err.status_code, 404);

    let entry = cache.entry(&key).unwrap();
    assert!(entry.is_error());
    assert_eq!(entry.data, Some(10));
}

#[tokio::test]
async fn fetch_invalidated_in_flight_settles_stale() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = list_key();

    let read = cache.get_or_fetch(&key, script.fetcher());
    let act = async {
        tokio::task::yield_now().await;
        cache.invalidate(&KeyPredicate::exact(key.clone())).await;
        assert!(script.resolve(0, Ok(1)));
    };
    let (read, ()) = tokio::join!(read, act);

    assert!(read.unwrap().is_stale);
    let (calls, fetcher) = counting_fetcher(2);
    assert_eq!(cache.get_or_fetch(&key, fetcher).await.unwrap().data, Some(2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

proptest! {
    #[test]
    fn written_value_reads_back(values in proptest::collection::vec(any::<u32>(), 1..20)) {
        let cache = FetchCache::<u32>::default();
        let key = list_key();
        for value in &values {
            cache.write(&key, *value);
            let entry = cache.entry(&key).unwrap();
            prop_assert_eq!(entry.status, EntryStatus::Success);
            prop_assert_eq!(entry.data, Some(*value));
        }
    }
}
