//! Backend work requested by the UI.
//!
//! State transitions return a [`Command`]; the event loop hands it to
//! [`spawn`], which runs it against the [`FleetStore`] on a task and sends
//! the [`Outcome`] back as a [`TuiEvent::Settled`]. Reads land in the cache
//! and are picked up by the views from there; the outcome only reports
//! success or failure.

use fleetdeck_api::{keys, FleetStore};
use fleetdeck_core::{
    Agent, AgentPatch, ApiError, ApiResult, Category, CreateCategoryInput, GenerationParams,
    GenerationRun, LoginRequest, LoginResponse, Query, SuccessResponse, UpdateCategoryInput,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::boundary::catch_async;
use crate::events::TuiEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadAgents(Query),
    LoadAgent(String),
    UpdateAgent { id: String, patch: AgentPatch },
    LoadCategories(Option<String>),
    CreateCategory(CreateCategoryInput),
    UpdateCategory { id: String, input: UpdateCategoryInput },
    DeleteCategory(String),
    LoadTemplates,
    LoadGenerations,
    RunGeneration(GenerationParams),
    Login(LoginRequest),
    Logout,
    /// Invalidate everything cached for a resource; watched keys refetch.
    Refresh(&'static str),
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::LoadAgents(_) => "load agents",
            Command::LoadAgent(_) => "load agent",
            Command::UpdateAgent { .. } => "update agent",
            Command::LoadCategories(_) => "load categories",
            Command::CreateCategory(_) => "create category",
            Command::UpdateCategory { .. } => "update category",
            Command::DeleteCategory(_) => "delete category",
            Command::LoadTemplates => "load templates",
            Command::LoadGenerations => "load generations",
            Command::RunGeneration(_) => "run generation",
            Command::Login(_) => "login",
            Command::Logout => "logout",
            Command::Refresh(_) => "refresh",
        }
    }

    /// Mutations change backend state; everything else only reads.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::UpdateAgent { .. }
                | Command::CreateCategory(_)
                | Command::UpdateCategory { .. }
                | Command::DeleteCategory(_)
                | Command::RunGeneration(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Loaded {
        what: &'static str,
        result: ApiResult<()>,
    },
    AgentUpdated {
        id: String,
        patch: AgentPatch,
        result: ApiResult<Agent>,
    },
    CategorySaved(ApiResult<Category>),
    CategoryDeleted {
        id: String,
        result: ApiResult<SuccessResponse>,
    },
    GenerationFinished {
        params: GenerationParams,
        result: ApiResult<GenerationRun>,
    },
    LoggedIn(ApiResult<LoginResponse>),
    LoggedOut,
    Refreshed {
        resource: &'static str,
        invalidated: usize,
    },
}

impl Outcome {
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Outcome::Loaded { result, .. } => result.as_ref().err(),
            Outcome::AgentUpdated { result, .. } => result.as_ref().err(),
            Outcome::CategorySaved(result) => result.as_ref().err(),
            Outcome::CategoryDeleted { result, .. } => result.as_ref().err(),
            Outcome::GenerationFinished { result, .. } => result.as_ref().err(),
            Outcome::LoggedIn(result) => result.as_ref().err(),
            Outcome::LoggedOut | Outcome::Refreshed { .. } => None,
        }
    }
}

fn loaded<T>(what: &'static str, result: ApiResult<T>) -> Outcome {
    Outcome::Loaded {
        what,
        result: result.map(|_| ()),
    }
}

pub async fn run(store: &FleetStore, command: Command) -> Outcome {
    debug!(
        command = command.label(),
        mutation = command.is_mutation(),
        "running command"
    );
    match command {
        Command::LoadAgents(query) => loaded("agents", store.list_agents(&query).await),
        Command::LoadAgent(id) => loaded("agent", store.agent(&id).await),
        Command::UpdateAgent { id, patch } => {
            let result = store.update_agent(&id, patch.clone()).await;
            Outcome::AgentUpdated { id, patch, result }
        }
        Command::LoadCategories(search) => {
            loaded("categories", store.categories(search.as_deref()).await)
        }
        Command::CreateCategory(input) => {
            Outcome::CategorySaved(store.create_category(input).await)
        }
        Command::UpdateCategory { id, input } => {
            Outcome::CategorySaved(store.update_category(&id, input).await)
        }
        Command::DeleteCategory(id) => {
            let result = store.delete_category(&id).await;
            Outcome::CategoryDeleted { id, result }
        }
        Command::LoadTemplates => loaded("templates", store.templates().await),
        Command::LoadGenerations => loaded("generations", store.generations().await),
        Command::RunGeneration(params) => {
            let result = store.run_generation(params.clone()).await;
            Outcome::GenerationFinished { params, result }
        }
        Command::Login(request) => Outcome::LoggedIn(store.login(&request).await),
        Command::Logout => {
            // The session is cleared whether or not the call succeeds.
            if let Err(error) = store.logout().await {
                warn!(
                    status = error.status_code,
                    error = %error.message,
                    "logout call failed, session cleared locally"
                );
            }
            Outcome::LoggedOut
        }
        Command::Refresh(resource) => {
            let invalidated = store.cache().invalidate(&keys::everything(resource)).await;
            Outcome::Refreshed {
                resource,
                invalidated,
            }
        }
    }
}

/// Run `command` on its own task and report back on `events`.
pub fn spawn(
    store: FleetStore,
    command: Command,
    events: mpsc::Sender<TuiEvent>,
) -> JoinHandle<()> {
    let label = command.label();
    tokio::spawn(async move {
        let event = match catch_async(run(&store, command)).await {
            Ok(outcome) => TuiEvent::Settled(Box::new(outcome)),
            Err(message) => {
                error!(command = label, %message, "command task panicked");
                TuiEvent::TaskPanicked {
                    command: label,
                    message,
                }
            }
        };
        let _ = events.send(event).await;
    })
}
