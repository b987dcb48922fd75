use std::cmp::Ordering;

use chrono::Utc;
use fleetdeck_core::{Agent, AgentListResponse, AgentPatch};

use super::{body, message, respond, MockState};
use crate::transport::{ApiRequest, ApiResponse};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

fn compare(a: &Agent, b: &Agent, field: &str) -> Ordering {
    match field {
        "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "category" => a.category.cmp(&b.category),
        "template" => a.template.cmp(&b.template),
        "updatedAt" => a.updated_at.cmp(&b.updated_at),
        "tasksCompleted" => a.metrics.tasks_completed.cmp(&b.metrics.tasks_completed),
        "successRate" => a.metrics.success_rate.total_cmp(&b.metrics.success_rate),
        _ => a.created_at.cmp(&b.created_at),
    }
}

fn matches(agent: &Agent, search: Option<&str>, category: Option<&str>, status: Option<&str>) -> bool {
    if let Some(needle) = search {
        if !agent.name.to_lowercase().contains(needle)
            && !agent.description.to_lowercase().contains(needle)
        {
            return false;
        }
    }
    if category.is_some_and(|c| agent.category != c) {
        return false;
    }
    if status.is_some_and(|s| agent.status.as_str() != s) {
        return false;
    }
    true
}

pub fn list(state: &MockState, request: &ApiRequest) -> ApiResponse {
    let non_empty = |name: &str| request.param(name).filter(|v| !v.is_empty());
    let page = non_empty("page")
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = non_empty("limit")
        .and_then(|l| l.parse::<u32>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT);
    let search = non_empty("search").map(str::to_lowercase);
    let sort_by = non_empty("sortBy").unwrap_or("createdAt");
    let descending = non_empty("sortDir").unwrap_or("desc") != "asc";

    let mut filtered: Vec<&Agent> = state
        .agents
        .iter()
        .filter(|a| {
            matches(
                a,
                search.as_deref(),
                non_empty("category"),
                non_empty("status"),
            )
        })
        .collect();
    filtered.sort_by(|a, b| {
        let ordering = compare(a, b, sort_by);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    let total = filtered.len() as u32;
    // Pages past the end come back empty.
    let start = (page as usize - 1).saturating_mul(limit as usize);
    let data = filtered
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take(limit as usize)
        .map(|agent| (*agent).clone())
        .collect();

    respond(
        200,
        &AgentListResponse {
            data,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        },
    )
}

pub fn get(state: &MockState, id: &str) -> ApiResponse {
    match state.agents.iter().find(|a| a.id == id) {
        Some(agent) => respond(200, agent),
        None => message(404, "Not found"),
    }
}

pub fn update(state: &mut MockState, id: &str, request: &ApiRequest) -> ApiResponse {
    let patch: AgentPatch = match body(request) {
        Ok(patch) => patch,
        Err(response) => return response,
    };
    match state.agents.iter_mut().find(|a| a.id == id) {
        Some(agent) => {
            agent.apply_patch(&patch, Utc::now());
            respond(200, agent)
        }
        None => message(404, "Not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;
    use serde_json::json;

    fn state() -> MockState {
        MockState::seeded(42)
    }

    fn list_with(state: &MockState, query: &[(&str, &str)]) -> AgentListResponse {
        let request = ApiRequest::new(Method::Get, "/api/agents").with_query(query.to_vec());
        let response = list(state, &request);
        assert_eq!(response.status, 200);
        serde_json::from_value(response.body).unwrap()
    }

    #[test]
    fn test_defaults_are_newest_first() {
        let state = state();
        let page = list_with(&state, &[]);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
        assert_eq!(page.total, 500);
        assert_eq!(page.total_pages, 25);
        assert!(page
            .data
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_status_filter_and_last_page() {
        let state = state();
        let expected = state
            .agents
            .iter()
            .filter(|a| a.status.as_str() == "training")
            .count() as u32;
        let first = list_with(&state, &[("status", "training"), ("limit", "7")]);
        assert_eq!(first.total, expected);
        assert!(first.data.iter().all(|a| a.status.as_str() == "training"));

        let last_page = first.total_pages.to_string();
        let last = list_with(
            &state,
            &[
                ("status", "training"),
                ("limit", "7"),
                ("page", last_page.as_str()),
            ],
        );
        let remainder = expected - 7 * (first.total_pages - 1);
        assert_eq!(last.data.len() as u32, remainder);
    }

    #[test]
    fn test_page_far_past_the_end_is_empty() {
        let state = state();
        let page = list_with(&state, &[("page", "4294967295"), ("limit", "20")]);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 500);
        assert_eq!(page.page, u32::MAX);
        assert_eq!(page.total_pages, 25);

        let next = list_with(&state, &[("page", "26"), ("limit", "20")]);
        assert!(next.data.is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let state = state();
        let target = state.agents[10].name.clone();
        let shouted = target.to_uppercase();
        let page = list_with(&state, &[("search", shouted.as_str())]);
        assert!(page.data.iter().any(|a| a.name == target));
    }

    #[test]
    fn test_patch_merges_and_missing_is_404() {
        let mut state = state();
        let before = state.agents[6].clone();
        let request = ApiRequest::new(Method::Patch, "/api/agents/agent-7")
            .with_body(json!({ "status": "deprecated" }));
        let response = update(&mut state, "agent-7", &request);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["status"], "deprecated");
        assert_eq!(response.body["name"], before.name.as_str());

        let missing = update(&mut state, "agent-9999", &request);
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body["message"], "Not found");
    }
}
