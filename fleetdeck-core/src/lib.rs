//! FLEETDECK Core - Shared Types
//!
//! Entities exchanged with the backend, the error taxonomy, cache keys built
//! from structured queries, the debounced query controller and local
//! validation rules. Nothing in this crate performs I/O.

pub mod controller;
pub mod entities;
pub mod error;
pub mod query;
pub mod validation;

pub use controller::{QueryController, QueryInput, DEFAULT_SEARCH_DELAY};
pub use entities::{
    slugify, Agent, AgentListParams, AgentListResponse, AgentMetrics, AgentPatch, AgentStatus,
    AuthUser, Category, CategoryListResponse, CreateCategoryInput, GenerationListResponse,
    GenerationParams, GenerationRun, GenerationStatus, LoginRequest, LoginResponse,
    SuccessResponse, Template, TemplateListResponse, UpdateCategoryInput,
};
pub use error::{ApiError, ApiResult, ErrorKind, ValidationError, ValidationErrors};
pub use query::{CacheKey, KeyPredicate, Query, SortDirection, SortSpec};
pub use validation::{
    validate_agent_edit, validate_category, validate_generation, validate_login, AgentEditForm,
    GeneratorForm,
};
