//! FLEETDECK Cache - Query Cache and Optimistic Mutations
//!
//! A client-side cache keyed by [`fleetdeck_core::CacheKey`]:
//!
//! - [`FetchCache`] stores one entry per key, deduplicates concurrent fetches,
//!   serves fresh entries without refetching and discards responses that
//!   were superseded by a newer fetch or write.
//! - [`MutationCoordinator`] applies speculative writes, commits or rolls
//!   them back, and invalidates dependent keys.
//!
//! The cache is runtime agnostic: in-flight fetches are shared futures and
//! no task is ever spawned.

pub mod config;
pub mod entry;
pub mod fetch_cache;
pub mod mutation;

pub use config::CacheConfig;
pub use entry::{CacheEntry, CacheStats, EntryStatus};
pub use fetch_cache::{FetchCache, Listener, Subscription};
pub use mutation::{MutationContext, MutationCoordinator, MutationStatus};
