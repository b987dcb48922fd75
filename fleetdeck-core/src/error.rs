//! Error types for FLEETDECK operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for calls that reach a collaborator.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure reported by (or on behalf of) the backend.
///
/// Every collaborator failure surfaces as this one type, carrying an
/// HTTP-like status code and a human readable message. Cache entries keep a
/// copy of the last one as their error state.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("request failed with status {status_code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
}

/// Coarse classification of an [`ApiError`], used by callers to pick a
/// presentation (inline field error, toast, retry button).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    TransientService,
    Client,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(503, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    pub fn kind(&self) -> ErrorKind {
        match self.status_code {
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            400 | 422 => ErrorKind::Validation,
            500..=599 => ErrorKind::TransientService,
            _ => ErrorKind::Client,
        }
    }

    /// Transient failures are the only ones a UI should offer to retry.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientService
    }
}

/// A single local validation failure on one form field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// All field failures found while checking one form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(ValidationError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// First message reported for `field`, if any.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "validation failed: {}", joined)
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| "validation failed".to_string());
        ApiError::new(422, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(ApiError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(ApiError::unauthorized("x").kind(), ErrorKind::Unauthorized);
        assert_eq!(ApiError::unavailable("x").kind(), ErrorKind::TransientService);
        assert_eq!(ApiError::new(422, "x").kind(), ErrorKind::Validation);
        assert_eq!(ApiError::new(409, "x").kind(), ErrorKind::Client);
    }

    #[test]
    fn test_only_service_failures_are_retryable() {
        assert!(ApiError::unavailable("cluster down").is_retryable());
        assert!(!ApiError::not_found("gone").is_retryable());
    }

    #[test]
    fn test_validation_errors_convert_to_422() {
        let mut errors = ValidationErrors::new();
        errors.push("name", "Name must be at least 2 characters");
        let api: ApiError = errors.into();
        assert_eq!(api.status_code, 422);
        assert!(api.message.contains("name"));
    }

    #[test]
    fn test_empty_validation_errors_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
