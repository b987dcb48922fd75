//! Configuration loading for the FLEETDECK console.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use fleetdeck_api::MockConfig;
use fleetdeck_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuiConfig {
    pub backend: BackendConfig,
    pub cache: CacheSection,
    pub list: ListConfig,
    pub mock: MockSection,
    pub auth: AuthConfig,
    pub refresh_interval_ms: u64,
    pub persistence_path: PathBuf,
    pub log_path: PathBuf,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process mocked backend.
    Mock,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Required when `kind = "http"`.
    pub base_url: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub stale_time_ms: u64,
    pub gc_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListConfig {
    pub page_size: u32,
    /// Terminal rows per list item.
    pub row_height: u16,
    pub overscan: usize,
    pub search_debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockSection {
    pub read_latency_ms: u64,
    pub update_latency_ms: u64,
    pub generation_latency_ms: u64,
    pub failure_rate: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Prefilled on the login screen.
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or FLEETDECK_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

impl TuiConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Http
            && self
                .backend
                .base_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(invalid("backend.base_url", "required for the http backend"));
        }
        if self.backend.request_timeout_ms == 0 {
            return Err(invalid("backend.request_timeout_ms", "must be > 0"));
        }
        if self.cache.gc_time_ms < self.cache.stale_time_ms {
            return Err(invalid("cache.gc_time_ms", "must be >= stale_time_ms"));
        }
        if !(1..=100).contains(&self.list.page_size) {
            return Err(invalid("list.page_size", "must be between 1 and 100"));
        }
        if self.list.row_height == 0 {
            return Err(invalid("list.row_height", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.mock.failure_rate) {
            return Err(invalid("mock.failure_rate", "must be between 0.0 and 1.0"));
        }
        if self.refresh_interval_ms == 0 {
            return Err(invalid("refresh_interval_ms", "must be > 0"));
        }
        if self.persistence_path.as_os_str().is_empty() {
            return Err(invalid("persistence_path", "must not be empty"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(invalid("log_path", "must not be empty"));
        }
        if crate::theme::Theme::named(&self.theme.name).is_none() {
            return Err(invalid("theme.name", "expected 'fleet' or 'mono'"));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_stale_time(Duration::from_millis(self.cache.stale_time_ms))
            .with_gc_time(Duration::from_millis(self.cache.gc_time_ms))
    }

    pub fn mock_config(&self) -> MockConfig {
        MockConfig {
            read_latency: Duration::from_millis(self.mock.read_latency_ms),
            update_latency: Duration::from_millis(self.mock.update_latency_ms),
            generation_latency: Duration::from_millis(self.mock.generation_latency_ms),
            failure_rate: self.mock.failure_rate,
            seed: self.mock.seed,
            offline: false,
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.list.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("FLEETDECK_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
