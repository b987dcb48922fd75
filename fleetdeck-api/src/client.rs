//! Typed client for the backend routes.
//!
//! Every call attaches the session's bearer token. Non-2xx responses become
//! `ApiError { status_code, message }` with the message taken from the
//! response body; a request that never got a response becomes a 503.

use std::sync::Arc;

use fleetdeck_core::{
    Agent, AgentListParams, AgentListResponse, AgentPatch, ApiError, ApiResult, AuthUser,
    Category, CategoryListResponse, CreateCategoryInput, GenerationListResponse, GenerationParams,
    GenerationRun, LoginRequest, LoginResponse, SuccessResponse, TemplateListResponse,
    UpdateCategoryInput,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::session::SessionContext;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: AuthUser,
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionContext) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    // === Agents ===

    pub async fn list_agents(&self, params: &AgentListParams) -> ApiResult<AgentListResponse> {
        self.get_json("/api/agents", params.to_pairs()).await
    }

    pub async fn get_agent(&self, id: &str) -> ApiResult<Agent> {
        self.get_json(&format!("/api/agents/{}", id), Vec::<(String, String)>::new())
            .await
    }

    pub async fn update_agent(&self, id: &str, patch: &AgentPatch) -> ApiResult<Agent> {
        self.send_json(Method::Patch, &format!("/api/agents/{}", id), Some(patch))
            .await
    }

    // === Categories & templates ===

    pub async fn list_categories(&self, search: Option<&str>) -> ApiResult<CategoryListResponse> {
        let query: Vec<(&str, String)> = search
            .filter(|s| !s.is_empty())
            .map(|s| vec![("search", s.to_string())])
            .unwrap_or_default();
        self.get_json("/api/resources/categories", query).await
    }

    pub async fn create_category(&self, input: &CreateCategoryInput) -> ApiResult<Category> {
        self.send_json(Method::Post, "/api/resources/categories", Some(input))
            .await
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: &UpdateCategoryInput,
    ) -> ApiResult<Category> {
        self.send_json(
            Method::Patch,
            &format!("/api/resources/categories/{}", id),
            Some(input),
        )
        .await
    }

    pub async fn delete_category(&self, id: &str) -> ApiResult<SuccessResponse> {
        self.send_json::<SuccessResponse, ()>(
            Method::Delete,
            &format!("/api/resources/categories/{}", id),
            None,
        )
        .await
    }

    pub async fn list_templates(&self) -> ApiResult<TemplateListResponse> {
        self.get_json("/api/resources/templates", Vec::<(String, String)>::new())
            .await
    }

    // === Generations ===

    pub async fn list_generations(&self) -> ApiResult<GenerationListResponse> {
        self.get_json("/api/generations", Vec::<(String, String)>::new())
            .await
    }

    pub async fn get_generation(&self, id: &str) -> ApiResult<GenerationRun> {
        self.get_json(&format!("/api/generations/{}", id), Vec::<(String, String)>::new())
            .await
    }

    pub async fn run_generation(&self, params: &GenerationParams) -> ApiResult<GenerationRun> {
        self.send_json(Method::Post, "/api/generations/run", Some(params))
            .await
    }

    // === Auth ===

    /// Log in and, on success, sign the session in.
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        let response: LoginResponse = self
            .send_json(Method::Post, "/api/auth/login", Some(request))
            .await?;
        self.session
            .sign_in(response.user.clone(), response.token.clone());
        Ok(response)
    }

    /// Log out. The session is signed out even if the call fails.
    pub async fn logout(&self) -> ApiResult<SuccessResponse> {
        let result = self
            .send_json::<SuccessResponse, ()>(Method::Post, "/api/auth/logout", None)
            .await;
        self.session.sign_out();
        result
    }

    pub async fn me(&self) -> ApiResult<AuthUser> {
        let response: MeResponse = self
            .get_json("/api/auth/me", Vec::<(String, String)>::new())
            .await?;
        Ok(response.user)
    }

    // === Plumbing ===

    async fn get_json<T, K, V>(&self, path: &str, query: Vec<(K, V)>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        let request = ApiRequest::new(Method::Get, path).with_query(query);
        self.execute(request).await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = ApiRequest::new(method, path);
        if let Some(body) = body {
            let value = serde_json::to_value(body)
                .map_err(|e| ApiError::bad_request(format!("unserializable body: {}", e)))?;
            request = request.with_body(value);
        }
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let request = request.with_bearer(self.session.token());
        let method = request.method;
        let path = request.path.clone();

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(%method, path = %path, error = %e, "request failed before a response");
            ApiError::unavailable(e.to_string())
        })?;
        debug!(%method, path = %path, status = response.status, "response received");
        parse_response(response)
    }
}

fn parse_response<T: DeserializeOwned>(response: ApiResponse) -> ApiResult<T> {
    if response.is_success() {
        return serde_json::from_value(response.body)
            .map_err(|e| ApiError::internal(format!("unexpected response shape: {}", e)));
    }
    Err(ApiError::new(response.status, error_message(&response.body)))
}

fn error_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "Request failed".to_string())
}
