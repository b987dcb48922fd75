use fleetdeck_core::{AuthUser, LoginRequest, LoginResponse, SuccessResponse};
use serde_json::json;

use super::{body, message, respond};
use crate::transport::{ApiRequest, ApiResponse};

pub const DEMO_EMAIL: &str = "ada@aiplatform.dev";
pub const DEMO_PASSWORD: &str = "password123";
pub const DEMO_TOKEN: &str = "mock-jwt-token-xyz";
const TOKEN_MARKER: &str = "mock-jwt-token";

pub fn demo_user() -> AuthUser {
    AuthUser {
        id: "user-1".into(),
        name: "Ada Lovelace".into(),
        email: DEMO_EMAIL.into(),
        role: "admin".into(),
    }
}

pub fn login(request: &ApiRequest) -> ApiResponse {
    let credentials: LoginRequest = match body(request) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };
    if credentials.email == DEMO_EMAIL && credentials.password == DEMO_PASSWORD {
        respond(
            200,
            &LoginResponse {
                user: demo_user(),
                token: DEMO_TOKEN.into(),
            },
        )
    } else {
        message(401, "Invalid credentials")
    }
}

pub fn logout() -> ApiResponse {
    respond(200, &SuccessResponse { success: true })
}

pub fn me(request: &ApiRequest) -> ApiResponse {
    match &request.bearer {
        Some(token) if token.contains(TOKEN_MARKER) => {
            ApiResponse::new(200, json!({ "user": demo_user() }))
        }
        _ => message(401, "Unauthorized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;

    #[test]
    fn test_wrong_password_is_401() {
        let request = ApiRequest::new(Method::Post, "/api/auth/login")
            .with_body(json!({ "email": DEMO_EMAIL, "password": "hunter22" }));
        let response = login(&request);
        assert_eq!(response.status, 401);
        assert_eq!(response.body["message"], "Invalid credentials");
    }

    #[test]
    fn test_me_requires_token() {
        let anonymous = ApiRequest::new(Method::Get, "/api/auth/me");
        assert_eq!(me(&anonymous).status, 401);

        let signed = anonymous.with_bearer(Some(DEMO_TOKEN.to_string()));
        assert_eq!(me(&signed).body["user"]["id"], "user-1");
    }
}
