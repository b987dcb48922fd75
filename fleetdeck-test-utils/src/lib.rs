//! FLEETDECK Test Utilities
//!
//! Shared test infrastructure for the FLEETDECK workspace:
//! - Proptest generators for queries and entities
//! - Fixtures for common records
//! - Scripted fetchers whose responses the test releases by hand
//! - Assertions on `ApiResult`

pub use fleetdeck_core::{
    Agent, AgentMetrics, AgentStatus, ApiError, ApiResult, CacheKey, Category, KeyPredicate,
    Query, SortDirection, SortSpec,
};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for FLEETDECK types.

    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Active),
            Just(AgentStatus::Inactive),
            Just(AgentStatus::Training),
            Just(AgentStatus::Deprecated),
        ]
    }

    pub fn arb_sort_direction() -> impl Strategy<Value = SortDirection> {
        prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
    }

    pub fn arb_sort() -> impl Strategy<Value = Option<SortSpec>> {
        proptest::option::of(
            (
                prop_oneof![Just("name"), Just("createdAt"), Just("status")],
                arb_sort_direction(),
            )
                .prop_map(|(field, direction)| SortSpec::new(field, direction)),
        )
    }

    /// Filter maps with values that include key separators.
    pub fn arb_filters() -> impl Strategy<Value = BTreeMap<String, String>> {
        proptest::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9 &=|:.?-]{1,12}", 0..5)
    }

    pub fn arb_query() -> impl Strategy<Value = Query> {
        (arb_filters(), arb_sort(), 1u32..100, prop_oneof![Just(20u32), Just(50u32)]).prop_map(
            |(filters, sort, page, page_size)| Query {
                resource: "agents".to_string(),
                filters,
                sort,
                page,
                page_size,
            },
        )
    }

    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        // 2020-01-01 .. 2030-01-01
        (1577836800i64..1893456000i64)
            .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    pub fn arb_agent() -> impl Strategy<Value = Agent> {
        (
            1u32..10_000,
            "[A-Z][a-z]{2,8}-[A-Z0-9]{4}",
            arb_agent_status(),
            proptest::collection::vec("[a-z]{2,8}", 1..4),
            arb_timestamp(),
            0u32..1000,
        )
            .prop_map(|(n, name, status, tags, at, tasks)| Agent {
                id: format!("agent-{}", n),
                name,
                category: "finance".to_string(),
                status,
                tags,
                template: "default".to_string(),
                description: "Generated for property tests".to_string(),
                created_at: at,
                updated_at: at,
                generation_run_id: "run-prop".to_string(),
                metrics: AgentMetrics {
                    tasks_completed: tasks,
                    success_rate: 0.5,
                },
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    /// 2025-01-01T00:00:00Z
    pub fn epoch() -> DateTime<Utc> {
        Utc.timestamp_opt(1_735_689_600, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn sample_agent(id: &str, status: AgentStatus) -> Agent {
        Agent {
            id: id.to_string(),
            name: format!("Nova-{}", id.trim_start_matches("agent-")),
            category: "finance".to_string(),
            status,
            tags: vec!["nlp".to_string(), "finance".to_string()],
            template: "default".to_string(),
            description: "Reconciles ledgers overnight".to_string(),
            created_at: epoch(),
            updated_at: epoch(),
            generation_run_id: "run-seed01".to_string(),
            metrics: AgentMetrics {
                tasks_completed: 42,
                success_rate: 0.93,
            },
        }
    }

    pub fn sample_category(name: &str) -> Category {
        Category {
            id: format!("cat-{}", fleetdeck_core::slugify(name)),
            name: name.to_string(),
            slug: fleetdeck_core::slugify(name),
            description: format!("{} agents", name),
            created_at: epoch(),
        }
    }

    pub fn agents_list_query() -> Query {
        Query::new("agents", 20)
    }
}

// ============================================================================
// FETCHERS
// ============================================================================

/// A fetcher whose calls stay pending until the test resolves them.
///
/// Calls are numbered from zero in the order the fetcher was invoked, so a
/// test can settle them in any order.
pub struct ScriptedFetcher<T> {
    senders: Arc<Mutex<Vec<Option<oneshot::Sender<ApiResult<T>>>>>>,
}

impl<T> Clone for ScriptedFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            senders: Arc::clone(&self.senders),
        }
    }
}

impl<T: Send + 'static> Default for ScriptedFetcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ScriptedFetcher<T> {
    pub fn new() -> Self {
        Self {
            senders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Closure suitable for `FetchCache::get_or_fetch`.
    pub fn fetcher(&self) -> impl Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync + 'static {
        let senders = Arc::clone(&self.senders);
        move || {
            let (tx, rx) = oneshot::channel();
            senders
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Some(tx));
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(ApiError::unavailable("scripted call dropped")))
            }
            .boxed()
        }
    }

    /// Number of times the fetcher has been invoked.
    pub fn calls(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Settle call `index`. Returns false if that call has not happened yet
    /// or was already settled.
    pub fn resolve(&self, index: usize, result: ApiResult<T>) -> bool {
        let sender = self
            .senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(index)
            .and_then(Option::take);
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

/// A fetcher that always returns `value` immediately and counts its calls.
pub fn counting_fetcher<T: Clone + Send + Sync + 'static>(
    value: T,
) -> (
    Arc<AtomicUsize>,
    impl Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync + 'static,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let fetcher = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        async move { Ok(value) }.boxed()
    };
    (calls, fetcher)
}

/// A fetcher that always fails with `error`.
pub fn failing_fetcher<T: Send + 'static>(
    error: ApiError,
) -> impl Fn() -> BoxFuture<'static, ApiResult<T>> + Send + Sync + 'static {
    move || {
        let error = error.clone();
        async move { Err(error) }.boxed()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on collaborator results.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &ApiResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a result failed with `status`.
    #[track_caller]
    pub fn assert_status<T: std::fmt::Debug>(result: &ApiResult<T>, status: u16) {
        match result {
            Err(error) => assert_eq!(error.status_code, status, "Wrong status in {:?}", error),
            other => panic!("Expected error with status {}, got: {:?}", status, other),
        }
    }
}
