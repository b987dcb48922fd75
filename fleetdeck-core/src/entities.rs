//! Entities exchanged with the backend.
//!
//! Wire shapes are camelCase JSON; timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::query::{Query, SortDirection};

// ============================================================================
// AGENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Training,
    Deprecated,
}

impl AgentStatus {
    pub fn all() -> &'static [AgentStatus] {
        &[
            AgentStatus::Active,
            AgentStatus::Inactive,
            AgentStatus::Training,
            AgentStatus::Deprecated,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Training => "training",
            AgentStatus::Deprecated => "deprecated",
        }
    }

    /// Next status in display order, wrapping around.
    pub fn cycle(&self) -> AgentStatus {
        let all = Self::all();
        let idx = all.iter().position(|s| s == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AgentStatus::Active),
            "inactive" => Ok(AgentStatus::Inactive),
            "training" => Ok(AgentStatus::Training),
            "deprecated" => Ok(AgentStatus::Deprecated),
            other => Err(format!("unknown agent status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub tasks_completed: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: AgentStatus,
    pub tags: Vec<String>,
    pub template: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub generation_run_id: String,
    pub metrics: AgentMetrics,
}

impl Agent {
    /// Merge the fields carried by `patch` and stamp `updated_at`.
    ///
    /// Fields absent from the patch are left untouched.
    pub fn apply_patch(&mut self, patch: &AgentPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        self.updated_at = now;
    }

    pub fn patched(&self, patch: &AgentPatch, now: DateTime<Utc>) -> Agent {
        let mut next = self.clone();
        next.apply_patch(patch, now);
        next
    }
}

/// Partial agent update. Only the fields present are sent and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl AgentPatch {
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.tags.is_none()
            && self.category.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentListResponse {
    pub data: Vec<Agent>,
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Query string parameters of `GET /api/agents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDirection>,
}

impl AgentListParams {
    pub fn from_query(query: &Query) -> Self {
        let filter = |name: &str| query.filter(name).map(str::to_string);
        Self {
            page: Some(query.page),
            limit: Some(query.page_size),
            search: filter("search"),
            category: filter("category"),
            status: filter("status"),
            sort_by: query.sort.as_ref().map(|s| s.field.clone()),
            sort_dir: query.sort.as_ref().map(|s| s.direction),
        }
    }

    /// Non-empty parameters as `(name, value)` pairs in wire order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page.filter(|p| *p > 0) {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        let text = [
            ("search", &self.search),
            ("category", &self.category),
            ("status", &self.status),
            ("sortBy", &self.sort_by),
        ];
        for (name, value) in text {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                pairs.push((name, value.clone()));
            }
        }
        if let Some(dir) = self.sort_dir {
            pairs.push(("sortDir", dir.as_str().to_string()));
        }
        pairs
    }
}

// ============================================================================
// CATEGORIES & TEMPLATES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListResponse {
    pub data: Vec<Category>,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// URL slug for a category name: lowercase, whitespace runs become `-`.
pub fn slugify(name: &str) -> String {
    WHITESPACE_RUN
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListResponse {
    pub data: Vec<Template>,
    pub total: u32,
}

// ============================================================================
// GENERATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Failed,
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStatus::Success => f.write_str("success"),
            GenerationStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Parameters of a generation run; also the body of `POST /api/generations/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub quantity: u32,
    pub category: String,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRun {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub params: GenerationParams,
    pub status: GenerationStatus,
    pub generated_count: u32,
    pub agent_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationListResponse {
    pub data: Vec<GenerationRun>,
    pub total: u32,
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: AuthUser,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortSpec;
    use chrono::TimeZone;

    fn sample_agent() -> Agent {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        Agent {
            id: "agent-7".to_string(),
            name: "Nova-AB12".to_string(),
            category: "finance".to_string(),
            status: AgentStatus::Active,
            tags: vec!["nlp".to_string()],
            template: "default".to_string(),
            description: "Tracks budgets".to_string(),
            created_at: at,
            updated_at: at,
            generation_run_id: "run-abc123".to_string(),
            metrics: AgentMetrics {
                tasks_completed: 10,
                success_rate: 0.9,
            },
        }
    }

    #[test]
    fn test_patch_only_touches_listed_fields() {
        let agent = sample_agent();
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        let patched = agent.patched(&AgentPatch::status(AgentStatus::Deprecated), now);

        assert_eq!(patched.status, AgentStatus::Deprecated);
        assert_eq!(patched.name, agent.name);
        assert_eq!(patched.tags, agent.tags);
        assert_eq!(patched.updated_at, now);
    }

    #[test]
    fn test_agent_wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_agent()).unwrap();
        assert!(json.get("generationRunId").is_some());
        assert_eq!(json["metrics"]["tasksCompleted"], 10);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let json = serde_json::to_value(AgentPatch::status(AgentStatus::Training)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "training" }));
    }

    #[test]
    fn test_status_parse_and_cycle() {
        assert_eq!("Deprecated".parse::<AgentStatus>(), Ok(AgentStatus::Deprecated));
        assert!("flying".parse::<AgentStatus>().is_err());
        assert_eq!(AgentStatus::Deprecated.cycle(), AgentStatus::Active);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Finance"), "finance");
        assert_eq!(slugify("Home   Automation Tools"), "home-automation-tools");
    }

    #[test]
    fn test_list_params_from_query() {
        let query = Query::new("agents", 50)
            .with_filter("search", "nova")
            .with_filter("status", "active")
            .with_sort(SortSpec::new("name", SortDirection::Asc))
            .with_page(3);
        let params = AgentListParams::from_query(&query);
        assert_eq!(params.page, Some(3));
        assert_eq!(params.limit, Some(50));
        assert_eq!(params.search.as_deref(), Some("nova"));
        assert_eq!(params.category, None);

        let pairs = params.to_pairs();
        assert!(pairs.contains(&("sortBy", "name".to_string())));
        assert!(pairs.contains(&("sortDir", "asc".to_string())));
    }
}
