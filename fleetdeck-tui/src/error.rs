//! Error types for the TUI.

use crate::config::ConfigError;
use crate::persistence::PersistenceError;
use fleetdeck_api::TransportError;
use fleetdeck_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
