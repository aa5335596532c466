use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Threshold between two runs of the check cycle, in seconds.
pub const DEFAULT_TIME_THRESHOLD: u64 = 60;
/// Default destination queue for schedules that do not name their own.
pub const DEFAULT_QUEUE_NAME: &str = "schedule-check";

/// Top-level config (chime.toml + CHIME_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChimeConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Settings for the due-task dispatch loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minimum seconds between two check cycles. Cycles never overlap; a cycle
    /// that overruns this interval simply delays the next one.
    #[serde(default = "default_time_threshold")]
    pub time_threshold: u64,
    /// Queue name used for schedules created without an explicit destination.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_threshold: DEFAULT_TIME_THRESHOLD,
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_time_threshold() -> u64 {
    DEFAULT_TIME_THRESHOLD
}
fn default_queue_name() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chime/chime.db", home)
}

impl ChimeConfig {
    /// Load config from a TOML file with CHIME_* env var overrides
    /// (double underscore separates sections, e.g. CHIME_SCHEDULER__QUEUE_NAME).
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.chime/chime.toml
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ChimeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CHIME_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.time_threshold == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.time_threshold must be at least 1 second".to_string(),
            ));
        }
        if self.scheduler.queue_name.is_empty() {
            return Err(ConfigError::Invalid(
                "scheduler.queue_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chime/chime.toml", home)
}
