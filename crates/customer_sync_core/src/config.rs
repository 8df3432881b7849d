//! Runtime configuration for sync processes.
//!
//! # Responsibility
//! - Resolve store path and logging settings from the environment.
//! - Keep defaults in one place for the CLI and embedding callers.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Logging stays disabled unless a log directory is configured.

use crate::logging::{default_log_level, init_logging};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CUSTOMER_SYNC_DB";
pub const ENV_LOG_LEVEL: &str = "CUSTOMER_SYNC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CUSTOMER_SYNC_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "customer_sync.sqlite3";

/// Resolved configuration for one sync process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// SQLite customer store location.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl SyncConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            db_path: read(ENV_DB_PATH).map_or(defaults.db_path, PathBuf::from),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging is disabled.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: {}", log_dir.display()))?;
        init_logging(&self.log_level, log_dir)?;
        Ok(true)
    }
}
