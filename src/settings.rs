//! Run configuration, loaded from one file plus `DWD_POI__*` overrides.

use crate::error::{IngestError, Result};
use crate::utils::constants::{
    DEFAULT_DB_PORT, DEFAULT_MAX_WORKERS, DEFAULT_RETENTION_DAYS, DEFAULT_TABLE_NAME,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

const ENV_PREFIX: &str = "DWD_POI";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub paths: PathSettings,
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[serde(default)]
    #[validate(nested)]
    pub retention: RetentionSettings,
    #[serde(default)]
    #[validate(nested)]
    pub fetch: FetchSettings,
    #[serde(default)]
    #[validate(nested)]
    pub run: RunSettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PathSettings {
    pub stations_file: PathBuf,
    pub parameter_file: PathBuf,
    #[validate(length(min = 1))]
    pub base_url: String,
    pub save_dir: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Clone, Deserialize, Validate)]
pub struct DatabaseSettings {
    #[validate(length(min = 1))]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_table_name")]
    #[validate(length(min = 1))]
    pub table_name: String,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .field("table_name", &self.table_name)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RetentionSettings {
    #[validate(range(exclusive_min = 0.0))]
    pub days: f64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct FetchSettings {
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct RunSettings {
    #[validate(range(min = 1))]
    pub max_workers: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_DB_PORT
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

impl Settings {
    /// Load and validate settings. A missing file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(IngestError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let settings: Settings = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }
}
