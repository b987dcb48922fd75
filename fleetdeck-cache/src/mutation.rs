//! Optimistic mutations with rollback.
//!
//! [`MutationCoordinator::mutate`] writes a speculative value into the cache
//! before the effectful call runs, then either replaces it with the
//! authoritative response and invalidates dependent keys, or restores the
//! exact pre-mutation entry and hands the error back. Nothing is retried.
//!
//! Mutations on the same key are not merged. A mutation started while another
//! is in flight snapshots the current, possibly speculative, entry and the
//! mutation that settles last determines the final state.

use std::future::Future;

use fleetdeck_core::{ApiError, ApiResult, CacheKey, KeyPredicate};
use tracing::{debug, warn};

use crate::entry::CacheEntry;
use crate::fetch_cache::FetchCache;

/// What one mutation knows between starting and settling.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationContext<T> {
    pub target_key: CacheKey,
    /// Entry before the mutation; `None` if the key was absent.
    pub previous_entry: Option<CacheEntry<T>>,
    /// Entry after the speculative write; `None` if nothing was written.
    pub speculative_entry: Option<CacheEntry<T>>,
}

/// Lifecycle of a mutation as seen by whoever triggered it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MutationStatus<T> {
    #[default]
    Idle,
    Pending,
    Succeeded(T),
    Failed(ApiError),
}

impl<T> MutationStatus<T> {
    pub fn from_result(result: ApiResult<T>) -> Self {
        match result {
            Ok(value) => MutationStatus::Succeeded(value),
            Err(error) => MutationStatus::Failed(error),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MutationStatus::Pending)
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            MutationStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MutationCoordinator<T> {
    cache: FetchCache<T>,
}

impl<T: Clone + Send + Sync + 'static> MutationCoordinator<T> {
    pub fn new(cache: FetchCache<T>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &FetchCache<T> {
        &self.cache
    }

    /// Run an optimistic mutation against `target_key`.
    ///
    /// `apply` receives the currently cached data and returns the speculative
    /// value; returning `None` skips the speculative write. `commit` is the
    /// effectful call. On success its value is written to `target_key` and
    /// every predicate in `invalidations` is invalidated before returning. On
    /// failure the entry is restored to its state before this call.
    pub async fn mutate<A, C>(
        &self,
        target_key: &CacheKey,
        apply: A,
        commit: C,
        invalidations: &[KeyPredicate],
    ) -> ApiResult<T>
    where
        A: FnOnce(Option<&T>) -> Option<T>,
        C: Future<Output = ApiResult<T>>,
    {
        let context = self.begin(target_key, apply);

        match commit.await {
            Ok(value) => {
                self.cache.write(&context.target_key, value.clone());
                debug!(key = %context.target_key, "mutation committed");
                self.invalidate_all(invalidations).await;
                Ok(value)
            }
            Err(error) => {
                self.rollback(context, &error);
                Err(error)
            }
        }
    }

    /// Run a mutation that has no single cached target, such as a create or
    /// delete, and invalidate dependents once it succeeds.
    pub async fn execute<R, C>(&self, commit: C, invalidations: &[KeyPredicate]) -> ApiResult<R>
    where
        C: Future<Output = ApiResult<R>>,
    {
        match commit.await {
            Ok(value) => {
                self.invalidate_all(invalidations).await;
                Ok(value)
            }
            Err(error) => {
                warn!(
                    status = error.status_code,
                    error = %error.message,
                    "mutation failed"
                );
                Err(error)
            }
        }
    }

    fn begin<A>(&self, target_key: &CacheKey, apply: A) -> MutationContext<T>
    where
        A: FnOnce(Option<&T>) -> Option<T>,
    {
        let previous_entry = self.cache.entry(target_key);
        let speculative = apply(previous_entry.as_ref().and_then(|e| e.data.as_ref()));
        let speculative_entry = speculative.map(|value| self.cache.write(target_key, value));
        debug!(
            key = %target_key,
            speculative = speculative_entry.is_some(),
            "mutation started"
        );
        MutationContext {
            target_key: target_key.clone(),
            previous_entry,
            speculative_entry,
        }
    }

    fn rollback(&self, context: MutationContext<T>, error: &ApiError) {
        if context.speculative_entry.is_none() {
            warn!(
                key = %context.target_key,
                status = error.status_code,
                error = %error.message,
                "mutation failed, nothing to restore"
            );
            return;
        }
        warn!(
            key = %context.target_key,
            status = error.status_code,
            error = %error.message,
            "mutation failed, restoring previous entry"
        );
        self.cache.restore(&context.target_key, context.previous_entry);
    }

    async fn invalidate_all(&self, invalidations: &[KeyPredicate]) {
        for predicate in invalidations {
            self.cache.invalidate(predicate).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_result() {
        let ok: MutationStatus<u32> = MutationStatus::from_result(Ok(1));
        assert_eq!(ok, MutationStatus::Succeeded(1));
        let failed: MutationStatus<u32> =
            MutationStatus::from_result(Err(ApiError::unavailable("offline")));
        assert_eq!(failed.error().map(|e| e.status_code), Some(503));
        assert!(!failed.is_pending());
        assert_eq!(MutationStatus::<u32>::default(), MutationStatus::Idle);
    }

    #[tokio::test]
    async fn test_execute_invalidates_only_on_success() {
        let cache = FetchCache::<u32>::default();
        let key = CacheKey::collection("categories", "list");
        cache.write(&key, 1);
        let coordinator = MutationCoordinator::new(cache.clone());
        let predicates = [KeyPredicate::resource("categories")];

        let err = coordinator
            .execute::<(), _>(async { Err(ApiError::internal("boom")) }, &predicates)
            .await;
        assert!(err.is_err());
        assert!(!cache.entry(&key).unwrap().is_stale);

        coordinator
            .execute(async { Ok(()) }, &predicates)
            .await
            .unwrap();
        assert!(cache.entry(&key).unwrap().is_stale);
    }
}
