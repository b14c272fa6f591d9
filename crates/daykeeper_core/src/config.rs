//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve database path, logging, and timer cadence for host entry points.
//!
//! # Invariants
//! - Unset variables fall back to defaults; set-but-invalid values are errors.
//! - `log_dir`, when present, is absolute.

use crate::logging::default_log_level;
use crate::timer::manager::TimerSettings;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "DAYKEEPER_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DAYKEEPER_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DAYKEEPER_LOG_DIR";
pub const ENV_TICK_MS: &str = "DAYKEEPER_TICK_MS";

const DEFAULT_DB_FILE_NAME: &str = "daykeeper.sqlite3";
const DEFAULT_TICK_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidTickInterval(String),
    RelativeLogDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTickInterval(value) => write!(
                f,
                "{ENV_TICK_MS} must be a positive integer of milliseconds, got `{value}`"
            ),
            Self::RelativeLogDir(value) => {
                write!(f, "{ENV_LOG_DIR} must be an absolute path, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Settings shared by the FFI and CLI entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
    pub tick_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl CoreConfig {
    /// Reads the `DAYKEEPER_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            let dir_path = PathBuf::from(&dir);
            if !dir_path.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir));
            }
            config.log_dir = Some(dir_path);
        }
        if let Some(raw) = read(ENV_TICK_MS) {
            let millis = raw
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidTickInterval(raw))?;
            config.tick_interval = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            tick_interval: self.tick_interval,
            ..TimerSettings::default()
        }
    }
}
