//! Optimistic mutation: speculation, commit, rollback and ordering.

use std::time::Duration;

use fleetdeck_cache::{FetchCache, MutationCoordinator};
use fleetdeck_core::{Agent, AgentPatch, AgentStatus, ApiError, CacheKey, KeyPredicate, Query};
use fleetdeck_test_utils::fixtures::{epoch, sample_agent};
use fleetdeck_test_utils::{counting_fetcher, generators::arb_agent, ScriptedFetcher};
use proptest::prelude::*;
use tokio::sync::oneshot;

fn detail(id: &str) -> CacheKey {
    CacheKey::detail("agents", id)
}

fn deprecate(current: Option<&Agent>) -> Option<Agent> {
    current.map(|agent| agent.patched(&AgentPatch::status(AgentStatus::Deprecated), epoch()))
}

#[tokio::test]
async fn offline_update_shows_speculation_then_reverts() {
    let cache = FetchCache::<Agent>::default();
    let key = detail("agent-7");
    cache.write(&key, sample_agent("agent-7", AgentStatus::Active));
    let before = cache.entry(&key);
    let coordinator = MutationCoordinator::new(cache.clone());

    let (tx, rx) = oneshot::channel::<()>();
    let commit = async move {
        let _ = rx.await;
        Err::<Agent, _>(ApiError::unavailable("offline"))
    };
    let mutation = coordinator.mutate(&key, deprecate, commit, &[]);
    let observe = async {
        tokio::task::yield_now().await;
        // Visible before the call settles.
        assert_eq!(
            cache.data(&key).map(|a| a.status),
            Some(AgentStatus::Deprecated)
        );
        let _ = tx.send(());
    };
    let (result, ()) = tokio::join!(mutation, observe);

    assert_eq!(result.unwrap_err().status_code, 503);
    assert_eq!(cache.entry(&key), before);
    assert_eq!(cache.data(&key).map(|a| a.status), Some(AgentStatus::Active));
}

#[tokio::test]
async fn rollback_of_absent_key_leaves_it_absent() {
    let cache = FetchCache::<Agent>::default();
    let key = detail("agent-99");
    let coordinator = MutationCoordinator::new(cache.clone());

    let result = coordinator
        .mutate(
            &key,
            |_| Some(sample_agent("agent-99", AgentStatus::Training)),
            async { Err(ApiError::not_found("Agent not found")) },
            &[],
        )
        .await;

    assert_eq!(result.unwrap_err().status_code, 404);
    assert!(cache.entry(&key).is_none());
}

#[tokio::test]
async fn commit_writes_authoritative_value_and_invalidates_lists() {
    let cache = FetchCache::<Agent>::default();
    let key = detail("agent-7");
    let list = Query::new("agents", 20).cache_key();
    cache.write(&key, sample_agent("agent-7", AgentStatus::Active));
    cache.write(&list, sample_agent("agent-1", AgentStatus::Active));
    let coordinator = MutationCoordinator::new(cache.clone());

    let mut server = sample_agent("agent-7", AgentStatus::Deprecated);
    server.description = "Echoed by the server".to_string();
    let echoed = server.clone();

    let result = coordinator
        .mutate(
            &key,
            deprecate,
            async move { Ok(echoed) },
            &[KeyPredicate::lists_of("agents")],
        )
        .await
        .unwrap();

    assert_eq!(result, server);
    assert_eq!(cache.data(&key), Some(server));
    assert!(!cache.entry(&key).unwrap().is_stale);
    assert!(cache.entry(&list).unwrap().is_stale);
}

#[tokio::test]
async fn second_mutation_snapshots_speculative_state_and_last_settle_wins() {
    let cache = FetchCache::<Agent>::default();
    let key = detail("agent-7");
    cache.write(&key, sample_agent("agent-7", AgentStatus::Active));
    let coordinator = MutationCoordinator::new(cache.clone());

    let (tx1, rx1) = oneshot::channel::<()>();
    let (tx2, rx2) = oneshot::channel::<()>();
    let first = coordinator.mutate(
        &key,
        deprecate,
        async move {
            let _ = rx1.await;
            Ok(sample_agent("agent-7", AgentStatus::Deprecated))
        },
        &[],
    );
    let second = async {
        tokio::task::yield_now().await;
        coordinator
            .mutate(
                &key,
                |current| {
                    // Sees the first mutation's speculation.
                    assert_eq!(current.map(|a| a.status), Some(AgentStatus::Deprecated));
                    current.map(|a| a.patched(&AgentPatch::status(AgentStatus::Training), epoch()))
                },
                async move {
                    let _ = rx2.await;
                    Ok(sample_agent("agent-7", AgentStatus::Training))
                },
                &[],
            )
            .await
    };
    let release = async {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        let _ = tx2.send(());
        tokio::time::sleep(Duration::from_millis(1)).await;
        let _ = tx1.send(());
    };
    let (first, second, ()) = tokio::join!(first, second, release);

    assert!(first.is_ok());
    assert!(second.is_ok());
    // The first mutation settled last.
    assert_eq!(cache.data(&key).map(|a| a.status), Some(AgentStatus::Deprecated));
}

#[tokio::test]
async fn mutation_replaces_fetched_entry() {
    let cache = FetchCache::<Agent>::default();
    let key = detail("agent-7");
    let coordinator = MutationCoordinator::new(cache.clone());
    let (_, fetcher) = counting_fetcher(sample_agent("agent-7", AgentStatus::Active));
    cache.get_or_fetch(&key, fetcher).await.unwrap();

    coordinator
        .mutate(
            &key,
            deprecate,
            async { Ok(sample_agent("agent-7", AgentStatus::Deprecated)) },
            &[],
        )
        .await
        .unwrap();
    assert_eq!(cache.data(&key).map(|a| a.status), Some(AgentStatus::Deprecated));
}

proptest! {
    #[test]
    fn failed_mutation_restores_entry_exactly(agent in arb_agent(), cached in any::<bool>()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let cache = FetchCache::<Agent>::default();
            let key = detail(&agent.id);
            if cached {
                cache.write(&key, agent.clone());
            }
            let before = cache.entry(&key);
            let coordinator = MutationCoordinator::new(cache.clone());

            let result = coordinator
                .mutate(
                    &key,
                    |current| {
                        let base = current.cloned().unwrap_or_else(|| agent.clone());
                        Some(base.patched(&AgentPatch::status(AgentStatus::Deprecated), epoch()))
                    },
                    async { Err(ApiError::unavailable("offline")) },
                    &[],
                )
                .await;

            prop_assert!(result.is_err());
            prop_assert_eq!(cache.entry(&key), before);
            Ok(())
        })?;
    }
}

// ============================================================================
// MUTATIONS OVERLAPPING A FETCH
// ============================================================================

fn offline_commit() -> impl std::future::Future<Output = Result<u32, ApiError>> {
    async { Err(ApiError::unavailable("offline")) }
}

#[tokio::test]
async fn failed_mutation_without_speculation_leaves_fetch_running() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = detail("agent-7");
    let coordinator = MutationCoordinator::new(cache.clone());

    let read = cache.get_or_fetch(&key, script.fetcher());
    let act = async {
        tokio::task::yield_now().await;
        let result = coordinator.mutate(&key, |_| None, offline_commit(), &[]).await;
        assert_eq!(result.unwrap_err().status_code, 503);
        assert!(cache.is_fetching(&key));
        assert!(script.resolve(0, Ok(7)));
    };
    let (read, ()) = tokio::join!(read, act);

    let read = read.unwrap();
    assert!(read.is_success());
    assert_eq!(read.data, Some(7));
    assert_eq!(cache.data(&key), Some(7));
    assert!(!cache.is_fetching(&key));
}

#[tokio::test]
async fn rollback_to_pending_resumes_the_superseded_fetch() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = detail("agent-7");
    let coordinator = MutationCoordinator::new(cache.clone());

    let read = cache.get_or_fetch(&key, script.fetcher());
    let act = async {
        tokio::task::yield_now().await;
        let result = coordinator
            .mutate(&key, |_| Some(9), offline_commit(), &[])
            .await;
        assert!(result.is_err());
        // Back to the pending entry, with its fetch still owning the key.
        let entry = cache.entry(&key).unwrap();
        assert!(entry.is_pending());
        assert_eq!(entry.data, None);
        assert!(cache.is_fetching(&key));
        assert!(script.resolve(0, Ok(7)));
    };
    let (read, ()) = tokio::join!(read, act);

    assert_eq!(read.unwrap().data, Some(7));
    let entry = cache.entry(&key).unwrap();
    assert!(entry.is_success());
    assert_eq!(entry.data, Some(7));
    assert_eq!(script.calls(), 1);
}

#[tokio::test]
async fn committed_mutation_wins_over_fetch_in_flight() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = detail("agent-7");
    let coordinator = MutationCoordinator::new(cache.clone());

    let read = cache.get_or_fetch(&key, script.fetcher());
    let act = async {
        tokio::task::yield_now().await;
        let committed = coordinator
            .mutate(&key, |_| Some(9), async { Ok(10) }, &[])
            .await;
        assert_eq!(committed, Ok(10));
        assert!(script.resolve(0, Ok(7)));
    };
    let (read, ()) = tokio::join!(read, act);

    assert_eq!(read.unwrap().data, Some(10));
    assert_eq!(cache.data(&key), Some(10));
    assert_eq!(cache.stats().discarded, 1);
}

#[tokio::test]
async fn rollback_after_fetch_was_discarded_refetches_on_next_read() {
    let cache = FetchCache::<u32>::default();
    let script = ScriptedFetcher::new();
    let key = detail("agent-7");
    let coordinator = MutationCoordinator::new(cache.clone());

    let read = cache.get_or_fetch(&key, script.fetcher());
    let act = async {
        tokio::task::yield_now().await;
        let (tx, rx) = oneshot::channel::<()>();
        let commit = async move {
            let _ = rx.await;
            Err::<u32, _>(ApiError::unavailable("offline"))
        };
        let mutation = coordinator.mutate(&key, |_| Some(9), commit, &[]);
        let release = async {
            tokio::task::yield_now().await;
            // Lands while the speculative value is in place and is dropped.
            assert!(script.resolve(0, Ok(7)));
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            let _ = tx.send(());
        };
        tokio::join!(mutation, release).0
    };
    let (read, mutation) = tokio::join!(read, act);
    assert!(read.is_ok());
    assert!(mutation.is_err());

    let entry = cache.entry(&key).unwrap();
    assert!(entry.is_pending());
    assert!(entry.is_stale);
    assert!(!cache.is_fetching(&key));

    let reread = cache.get_or_fetch(&key, script.fetcher());
    let release = async {
        tokio::task::yield_now().await;
        assert!(script.resolve(1, Ok(8)));
    };
    let (reread, ()) = tokio::join!(reread, release);
    assert_eq!(reread.unwrap().data, Some(8));
    assert_eq!(script.calls(), 2);
}
