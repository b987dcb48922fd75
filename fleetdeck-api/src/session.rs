//! Signed-in identity, passed explicitly to whoever needs the token.

use fleetdeck_core::AuthUser;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: AuthUser,
    pub token: String,
}

/// Shared handle to the current session.
///
/// Starts signed out. [`sign_in`](SessionContext::sign_in) is called after a
/// successful login and [`sign_out`](SessionContext::sign_out) on logout;
/// nothing else changes it.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: AuthUser, token: String) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(Session { user, token });
    }

    pub fn sign_out(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.current().map(|s| s.user)
    }

    pub fn current(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let session = SessionContext::new();
        let shared = session.clone();
        assert!(!session.is_authenticated());

        session.sign_in(
            AuthUser {
                id: "user-1".into(),
                name: "Ada Lovelace".into(),
                email: "ada@aiplatform.dev".into(),
                role: "admin".into(),
            },
            "mock-jwt-token-xyz".into(),
        );
        assert_eq!(shared.token().as_deref(), Some("mock-jwt-token-xyz"));

        shared.sign_out();
        assert!(session.user().is_none());
    }
}
