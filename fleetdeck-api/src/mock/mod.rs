//! In-process mocked backend.
//!
//! [`MockServer`] answers the same routes a real server would, from seeded
//! in-memory data. Latency and failures are simulated per [`MockConfig`].

mod agents;
mod auth;
mod categories;
mod generations;
pub mod seed;

pub use auth::{demo_user, DEMO_EMAIL, DEMO_PASSWORD, DEMO_TOKEN};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use fleetdeck_core::{Agent, Category, GenerationRun, Template};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};

/// Simulated backend behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    pub read_latency: Duration,
    pub update_latency: Duration,
    pub generation_latency: Duration,
    /// Probability in `0.0..=1.0` that a generation run fails with 503.
    pub failure_rate: f64,
    pub seed: u64,
    pub offline: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            read_latency: Duration::ZERO,
            update_latency: Duration::from_millis(600),
            generation_latency: Duration::from_millis(2000),
            failure_rate: 0.1,
            seed: 42,
            offline: false,
        }
    }
}

impl MockConfig {
    /// No latency and no injected failures.
    pub fn instant() -> Self {
        Self {
            update_latency: Duration::ZERO,
            generation_latency: Duration::ZERO,
            failure_rate: 0.0,
            ..Self::default()
        }
    }

    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_update_latency(mut self, latency: Duration) -> Self {
        self.update_latency = latency;
        self
    }

    pub fn with_generation_latency(mut self, latency: Duration) -> Self {
        self.generation_latency = latency;
        self
    }
}

pub(crate) struct MockState {
    pub agents: Vec<Agent>,
    pub categories: Vec<Category>,
    pub templates: Vec<Template>,
    pub runs: Vec<GenerationRun>,
    /// Drives run ids and injected failures.
    pub rng: StdRng,
    pub next_agent: u32,
    pub next_category: u32,
}

impl MockState {
    fn seeded(seed: u64) -> Self {
        let mut agent_rng = StdRng::seed_from_u64(seed);
        let mut catalogue_rng = StdRng::seed_from_u64(seed.wrapping_add(57));
        let agents = seed::agents(&mut agent_rng);
        let categories = seed::categories();
        Self {
            next_agent: agents.len() as u32 + 1,
            next_category: categories.len() as u32 + 1,
            agents,
            categories,
            templates: seed::templates(),
            runs: seed::generation_runs(&mut catalogue_rng),
            rng: agent_rng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Login,
    Logout,
    Me,
    ListAgents,
    GetAgent(String),
    UpdateAgent(String),
    ListCategories,
    CreateCategory,
    UpdateCategory(String),
    DeleteCategory(String),
    ListTemplates,
    ListGenerations,
    GetGeneration(String),
    RunGeneration,
    MethodNotAllowed,
    NotFound,
}

impl Route {
    fn parse(method: Method, path: &str) -> Route {
        let Some(rest) = path.strip_prefix("/api/") else {
            return Route::NotFound;
        };
        let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        let id = |s: &str| s.to_string();

        match (method, segments.as_slice()) {
            (Method::Post, ["auth", "login"]) => Route::Login,
            (Method::Post, ["auth", "logout"]) => Route::Logout,
            (Method::Get, ["auth", "me"]) => Route::Me,
            (Method::Get, ["agents"]) => Route::ListAgents,
            (Method::Get, ["agents", agent]) => Route::GetAgent(id(agent)),
            (Method::Patch, ["agents", agent]) => Route::UpdateAgent(id(agent)),
            (Method::Get, ["resources", "categories"]) => Route::ListCategories,
            (Method::Post, ["resources", "categories"]) => Route::CreateCategory,
            (Method::Patch, ["resources", "categories", cat]) => Route::UpdateCategory(id(cat)),
            (Method::Delete, ["resources", "categories", cat]) => Route::DeleteCategory(id(cat)),
            (Method::Get, ["resources", "templates"]) => Route::ListTemplates,
            (Method::Get, ["generations"]) => Route::ListGenerations,
            (Method::Post, ["generations", "run"]) => Route::RunGeneration,
            (Method::Get, ["generations", run]) => Route::GetGeneration(id(run)),
            (
                _,
                ["auth", "login" | "logout" | "me"]
                | ["agents"]
                | ["agents", _]
                | ["resources", "categories" | "templates"]
                | ["resources", "categories", _]
                | ["generations"]
                | ["generations", _],
            ) => Route::MethodNotAllowed,
            _ => Route::NotFound,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Logout => "logout",
            Route::Me => "me",
            Route::ListAgents => "list_agents",
            Route::GetAgent(_) => "get_agent",
            Route::UpdateAgent(_) => "update_agent",
            Route::ListCategories => "list_categories",
            Route::CreateCategory => "create_category",
            Route::UpdateCategory(_) => "update_category",
            Route::DeleteCategory(_) => "delete_category",
            Route::ListTemplates => "list_templates",
            Route::ListGenerations => "list_generations",
            Route::GetGeneration(_) => "get_generation",
            Route::RunGeneration => "run_generation",
            Route::MethodNotAllowed => "method_not_allowed",
            Route::NotFound => "not_found",
        }
    }
}

/// The mocked backend. Cheap to share behind an `Arc`.
pub struct MockServer {
    config: MockConfig,
    state: Mutex<MockState>,
    offline: AtomicBool,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockServer {
    pub fn new(config: MockConfig) -> Self {
        let state = MockState::seeded(config.seed);
        Self {
            offline: AtomicBool::new(config.offline),
            state: Mutex::new(state),
            config,
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// While offline every request fails before reaching a route.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of agents currently held, for assertions and the status bar.
    pub fn agent_count(&self) -> usize {
        self.lock().agents.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn latency(&self, route: &Route) -> Duration {
        match route {
            Route::UpdateAgent(_) => self.config.update_latency,
            Route::RunGeneration => self.config.generation_latency,
            _ => self.config.read_latency,
        }
    }

    fn handle(&self, route: &Route, request: &ApiRequest) -> ApiResponse {
        let mut state = self.lock();
        match route {
            Route::Login => auth::login(request),
            Route::Logout => auth::logout(),
            Route::Me => auth::me(request),
            Route::ListAgents => agents::list(&state, request),
            Route::GetAgent(id) => agents::get(&state, id),
            Route::UpdateAgent(id) => agents::update(&mut state, id, request),
            Route::ListCategories => categories::list(&state, request),
            Route::CreateCategory => categories::create(&mut state, request),
            Route::UpdateCategory(id) => categories::update(&mut state, id, request),
            Route::DeleteCategory(id) => categories::delete(&mut state, id),
            Route::ListTemplates => categories::templates(&state),
            Route::ListGenerations => generations::list(&state),
            Route::GetGeneration(id) => generations::get(&state, id),
            Route::RunGeneration => {
                let rate = self.config.failure_rate;
                if rate > 0.0 && state.rng.random_bool(rate.min(1.0)) {
                    warn!(route = route.name(), "injected generation failure");
                    return message(503, "Generation cluster unavailable. Please retry.");
                }
                generations::run(&mut state, request)
            }
            Route::MethodNotAllowed => message(405, "Method not allowed"),
            Route::NotFound => message(404, "Not found"),
        }
    }
}

#[async_trait]
impl Transport for MockServer {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        if self.is_offline() {
            debug!(method = %request.method, path = %request.path, "dropped while offline");
            return Err(TransportError::Unreachable("network is offline".to_string()));
        }

        let route = Route::parse(request.method, &request.path);
        let delay = self.latency(&route);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        // Going offline mid-flight loses the response.
        if self.is_offline() {
            return Err(TransportError::Unreachable("network is offline".to_string()));
        }

        let response = self.handle(&route, &request);
        debug!(
            route = route.name(),
            method = %request.method,
            path = %request.path,
            status = response.status,
            "mock request served"
        );
        Ok(response)
    }
}

pub(crate) fn message(status: u16, text: &str) -> ApiResponse {
    ApiResponse::new(status, json!({ "message": text }))
}

pub(crate) fn respond<T: Serialize>(status: u16, body: &T) -> ApiResponse {
    match serde_json::to_value(body) {
        Ok(value) => ApiResponse::new(status, value),
        Err(e) => message(500, &format!("serialization failed: {}", e)),
    }
}

/// Decode a JSON request body, or produce the 400 to send back.
pub(crate) fn body<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiResponse> {
    let value = request.body.clone().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| message(400, &format!("Invalid body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parsing() {
        assert_eq!(Route::parse(Method::Get, "/api/agents"), Route::ListAgents);
        assert_eq!(
            Route::parse(Method::Patch, "/api/agents/agent-7"),
            Route::UpdateAgent("agent-7".into())
        );
        assert_eq!(
            Route::parse(Method::Post, "/api/generations/run"),
            Route::RunGeneration
        );
        assert_eq!(
            Route::parse(Method::Get, "/api/generations/run-abc"),
            Route::GetGeneration("run-abc".into())
        );
        assert_eq!(
            Route::parse(Method::Delete, "/api/agents"),
            Route::MethodNotAllowed
        );
        assert_eq!(Route::parse(Method::Get, "/api/unknown"), Route::NotFound);
        assert_eq!(Route::parse(Method::Get, "/agents"), Route::NotFound);
    }

    #[test]
    fn test_seeded_state_counters() {
        let state = MockState::seeded(42);
        assert_eq!(state.agents.len(), 500);
        assert_eq!(state.next_agent, 501);
        assert_eq!(state.next_category, 6);
        assert_eq!(state.runs.len(), seed::SEED_RUN_COUNT);
    }

    #[test]
    fn test_body_rejects_wrong_shape() {
        let request = ApiRequest::new(Method::Post, "/api/auth/login")
            .with_body(json!({ "email": 3 }));
        let result: Result<fleetdeck_core::LoginRequest, _> = body(&request);
        assert_eq!(result.unwrap_err().status, 400);
    }
}
