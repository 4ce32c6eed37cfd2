//! Runtime configuration for board store consumers.
//!
//! # Responsibility
//! - Describe store location, logging and mutation policy in one struct.
//! - Load from TOML, then apply `TASKBOARD_*` environment overrides.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid config.
//! - Unknown TOML keys are rejected.

use crate::db::DbOptions;
use crate::logging::default_log_level;
use crate::service::task_service::ServiceOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "TASKBOARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKBOARD_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKBOARD_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "TASKBOARD_BUSY_TIMEOUT_MS";
pub const ENV_COMPACT_ON_DELETE: &str = "TASKBOARD_COMPACT_ON_DELETE";

const DEFAULT_DB_FILE_NAME: &str = "taskboard.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value `{value}` for {name}: {reason}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Store, logging and mutation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Lock wait before a store call fails as unavailable.
    pub busy_timeout_ms: u64,
    pub compact_on_delete: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            compact_on_delete: true,
        }
    }
}

impl BoardConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads `path` (defaults when `None`) and applies process environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        base.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_BUSY_TIMEOUT_MS,
                value: value.clone(),
                reason: "expected milliseconds as an unsigned integer",
            })?;
        }
        if let Some(value) = read(ENV_COMPACT_ON_DELETE) {
            self.compact_on_delete = parse_flag(&value).ok_or(ConfigError::InvalidEnv {
                name: ENV_COMPACT_ON_DELETE,
                value: value.clone(),
                reason: "expected true|false",
            })?;
        }
        Ok(self)
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            compact_on_delete: self.compact_on_delete,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
