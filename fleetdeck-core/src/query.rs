//! Structured queries and the cache keys derived from them.
//!
//! A [`Query`] describes one page of one collection. Its [`CacheKey`] is a
//! canonical string: structurally equal queries always produce the same key,
//! regardless of the order filters were inserted in.
//!
//! # Key Format
//!
//! ```text
//! <resource>:list?<filter>=<value>&...|sort=<field>.<dir>|page=<n>|size=<n>
//! <resource>:detail:<id>
//! ```
//!
//! Filter names are emitted in sorted order and every free-form component is
//! percent-encoded, so the separators `:?&=|.` never appear inside a
//! component. Keys are hierarchical: `agents:` prefixes every agent key and
//! `agents:list` every agent list key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flipped(&self) -> SortDirection {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// One page of one collection, with filters and an optional sort.
///
/// Empty filter values are never stored: setting a filter to `""` removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub resource: String,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<SortSpec>,
    pub page: u32,
    pub page_size: u32,
}

impl Query {
    /// First page of `resource`, unfiltered and unsorted.
    pub fn new(resource: impl Into<String>, page_size: u32) -> Self {
        Self {
            resource: resource.into(),
            filters: BTreeMap::new(),
            sort: None,
            page: 1,
            page_size,
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_filter(name, value);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn set_filter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if value.is_empty() {
            self.filters.remove(&name);
        } else {
            self.filters.insert(name, value);
        }
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_query(self)
    }
}

/// Canonical identity of one cached result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key of a list query.
    pub fn for_query(query: &Query) -> Self {
        let mut key = format!("{}:list?", encode(&query.resource));

        // BTreeMap iteration is already sorted by filter name.
        let filters = query
            .filters
            .iter()
            .map(|(name, value)| format!("{}={}", encode(name), encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        key.push_str(&filters);

        match &query.sort {
            Some(sort) => {
                key.push_str("|sort=");
                key.push_str(&encode(&sort.field));
                key.push('.');
                key.push_str(sort.direction.as_str());
            }
            None => key.push_str("|sort=-"),
        }
        key.push_str(&format!("|page={}|size={}", query.page, query.page_size));
        Self(key)
    }

    /// Key of a single record of `resource`.
    pub fn detail(resource: &str, id: &str) -> Self {
        Self(format!("{}:detail:{}", encode(resource), encode(id)))
    }

    /// Key of an unparameterised collection (e.g. the generations list).
    pub fn collection(resource: &str, name: &str) -> Self {
        Self(format!("{}:{}", encode(resource), encode(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode(component: &str) -> String {
    // Also escape '.', which urlencoding leaves alone but the sort segment uses.
    urlencoding::encode(component).replace('.', "%2E")
}

/// Selects cache entries by key, for invalidation.
#[derive(Clone)]
pub enum KeyPredicate {
    /// Exactly this key.
    Exact(CacheKey),
    /// Every key starting with this prefix.
    Prefix(String),
    /// Every key of a resource (`<resource>:`).
    Resource(String),
    /// Arbitrary predicate.
    Custom(Arc<dyn Fn(&CacheKey) -> bool + Send + Sync>),
}

impl KeyPredicate {
    pub fn exact(key: CacheKey) -> Self {
        Self::Exact(key)
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn resource(resource: impl Into<String>) -> Self {
        Self::Resource(resource.into())
    }

    /// Every list query of `resource`.
    pub fn lists_of(resource: &str) -> Self {
        Self::Prefix(format!("{}:list", encode(resource)))
    }

    pub fn custom(f: impl Fn(&CacheKey) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            KeyPredicate::Exact(expected) => expected == key,
            KeyPredicate::Prefix(prefix) => key.starts_with(prefix),
            KeyPredicate::Resource(resource) => {
                key.starts_with(&format!("{}:", encode(resource)))
            }
            KeyPredicate::Custom(f) => f(key),
        }
    }
}

impl fmt::Debug for KeyPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPredicate::Exact(key) => f.debug_tuple("Exact").field(key).finish(),
            KeyPredicate::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            KeyPredicate::Resource(resource) => f.debug_tuple("Resource").field(resource).finish(),
            KeyPredicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
