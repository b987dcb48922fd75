//! The cached store running against the mocked backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetdeck_api::keys::{self, AGENTS};
use fleetdeck_api::{ApiClient, CachedResource, FleetStore, MockConfig, MockServer, SessionContext};
use fleetdeck_cache::{CacheConfig, EntryStatus};
use fleetdeck_core::{
    validate_category, Agent, AgentPatch, AgentStatus, CategoryListResponse, GenerationParams,
    Query,
};
use fleetdeck_test_utils::assertions::assert_status;

fn store_with(config: MockConfig) -> (Arc<MockServer>, FleetStore) {
    let server = Arc::new(MockServer::new(config));
    let client = ApiClient::new(server.clone(), SessionContext::new());
    (server, FleetStore::new(client, CacheConfig::default()))
}

fn generation(quantity: u32) -> GenerationParams {
    GenerationParams {
        quantity,
        category: "finance".into(),
        template: "default".into(),
        seed: Some(1234),
    }
}

#[tokio::test]
async fn offline_agent_update_shows_speculation_then_reverts() {
    let (server, store) = store_with(MockConfig::instant());
    store
        .update_agent("agent-7", AgentPatch::status(AgentStatus::Active))
        .await
        .unwrap();

    let key = keys::agent_detail("agent-7");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = store.cache().subscribe(&key, move |_, entry| {
        let status = entry
            .and_then(|e| e.data.clone())
            .and_then(Agent::from_resource)
            .map(|agent| agent.status);
        sink.lock().unwrap().push(status);
    });

    server.set_offline(true);
    let result = store
        .update_agent("agent-7", AgentPatch::status(AgentStatus::Deprecated))
        .await;

    assert_status(&result, 503);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some(AgentStatus::Deprecated), Some(AgentStatus::Active)]
    );
    assert_eq!(
        store.cached::<Agent>(&key).map(|a| a.status),
        Some(AgentStatus::Active)
    );
}

#[tokio::test]
async fn successful_update_stores_server_copy_and_marks_lists_stale() {
    let (_server, store) = store_with(MockConfig::instant());
    let query = Query::new(AGENTS, 20);
    store.list_agents(&query).await.unwrap();
    store.agent("agent-3").await.unwrap();

    let updated = store
        .update_agent("agent-3", AgentPatch::status(AgentStatus::Training))
        .await
        .unwrap();

    assert_eq!(updated.status, AgentStatus::Training);
    assert_eq!(store.cached::<Agent>(&keys::agent_detail("agent-3")), Some(updated));
    assert!(store.entry(&keys::agent_list(&query)).unwrap().is_stale);
}

#[tokio::test]
async fn creating_finance_category_refreshes_subscribed_list() {
    let (_server, store) = store_with(MockConfig::instant());
    let key = keys::category_list(None);
    let before = store.categories(None).await.unwrap();
    let _subscription = store.cache().subscribe(&key, |_, _| {});

    let input = validate_category("Finance", "Budget and spend tracking").unwrap();
    let created = store.create_category(input).await.unwrap();

    assert_eq!(created.slug, "finance");
    let after: CategoryListResponse = store.cached(&key).unwrap();
    assert_eq!(after.total, before.total + 1);
    assert!(after.data.iter().any(|c| c.id == created.id));
    assert!(!store.entry(&key).unwrap().is_stale);
}

#[tokio::test]
async fn generation_run_makes_new_agents_visible() {
    let (server, store) = store_with(MockConfig::instant());
    let query = Query::new(AGENTS, 20);
    let first = store.list_agents(&query).await.unwrap();
    assert_eq!(first.total, 500);

    let run = store.run_generation(generation(3)).await.unwrap();
    assert_eq!(server.agent_count(), 503);
    assert!(store.entry(&keys::agent_list(&query)).unwrap().is_stale);

    let second = store.list_agents(&query).await.unwrap();
    assert_eq!(second.total, 503);
    for id in &run.agent_ids {
        assert!(second.data.iter().any(|a| &a.id == id), "{} missing", id);
    }
    let listed = store.generations().await.unwrap();
    assert_eq!(listed.data[0].id, run.id);
}

#[tokio::test]
async fn failed_generation_run_invalidates_nothing() {
    let (server, store) = store_with(MockConfig::instant().with_failure_rate(1.0));
    let query = Query::new(AGENTS, 20);
    store.list_agents(&query).await.unwrap();

    let result = store.run_generation(generation(5)).await;

    assert_status(&result, 503);
    assert_eq!(
        result.unwrap_err().message,
        "Generation cluster unavailable. Please retry."
    );
    assert_eq!(server.agent_count(), 500);
    assert!(!store.entry(&keys::agent_list(&query)).unwrap().is_stale);
}

#[tokio::test]
async fn missing_agent_is_cached_as_error() {
    let (_server, store) = store_with(MockConfig::instant());
    let result = store.agent("agent-9999").await;

    assert_status(&result, 404);
    let entry = store.entry(&keys::agent_detail("agent-9999")).unwrap();
    assert_eq!(entry.status, EntryStatus::Error);
    assert_eq!(entry.error.unwrap().message, "Not found");
}

#[tokio::test(start_paused = true)]
async fn concurrent_list_reads_share_one_request() {
    let config = MockConfig {
        read_latency: Duration::from_millis(50),
        ..MockConfig::instant()
    };
    let (_server, store) = store_with(config);
    let query = Query::new(AGENTS, 20).with_filter("status", "active");

    let (a, b) = tokio::join!(store.list_agents(&query), store.list_agents(&query));

    assert_eq!(a.unwrap(), b.unwrap());
    let stats = store.cache().stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.deduplicated, 1);
}

#[tokio::test(start_paused = true)]
async fn agent_update_waits_for_simulated_latency() {
    let (_server, store) = store_with(MockConfig::default());
    let started = tokio::time::Instant::now();

    store
        .update_agent("agent-1", AgentPatch::status(AgentStatus::Inactive))
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn logout_drops_cached_data() {
    let (_server, store) = store_with(MockConfig::instant());
    store.templates().await.unwrap();
    assert!(store.cache().stats().entry_count > 0);

    store.logout().await.unwrap();

    assert_eq!(store.cache().stats().entry_count, 0);
    assert!(!store.client().session().is_authenticated());
}
