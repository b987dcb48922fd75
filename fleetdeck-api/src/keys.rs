//! Cache keys and invalidation scopes for each backend resource.
//!
//! Collections that are not paginated use a page size of 0 in their key.

use fleetdeck_core::{CacheKey, KeyPredicate, Query};

pub const AGENTS: &str = "agents";
pub const CATEGORIES: &str = "categories";
pub const GENERATIONS: &str = "generations";
pub const TEMPLATES: &str = "templates";

pub fn agent_list(query: &Query) -> CacheKey {
    query.cache_key()
}

pub fn agent_detail(id: &str) -> CacheKey {
    CacheKey::detail(AGENTS, id)
}

pub fn category_list(search: Option<&str>) -> CacheKey {
    Query::new(CATEGORIES, 0)
        .with_filter("search", search.unwrap_or_default())
        .cache_key()
}

pub fn template_list() -> CacheKey {
    Query::new(TEMPLATES, 0).cache_key()
}

pub fn generation_list() -> CacheKey {
    Query::new(GENERATIONS, 0).cache_key()
}

pub fn generation_detail(id: &str) -> CacheKey {
    CacheKey::detail(GENERATIONS, id)
}

/// Every agent list page, regardless of filters.
pub fn all_agent_lists() -> KeyPredicate {
    KeyPredicate::lists_of(AGENTS)
}

/// Everything cached for `resource`.
pub fn everything(resource: &str) -> KeyPredicate {
    KeyPredicate::resource(resource)
}
