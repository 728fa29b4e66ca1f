//! Daemon configuration parsing and validation.
//!
//! Configuration is TOML. Every field has a default, so an empty file (or
//! no file at all) yields a runnable configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest permitted sweep interval.
pub const MIN_SWEEP_INTERVAL_SECS: u64 = 1;

/// Longest permitted sweep interval.
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value is out of range.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Database locations.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Expiry sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DaemonConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// field is out of range.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a field is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.sweep.interval_secs;
        if !(MIN_SWEEP_INTERVAL_SECS..=MAX_SWEEP_INTERVAL_SECS).contains(&interval) {
            return Err(ConfigError::Validation(format!(
                "sweep.interval_secs must lie in \
                 [{MIN_SWEEP_INTERVAL_SECS}, {MAX_SWEEP_INTERVAL_SECS}], got {interval}"
            )));
        }
        if self.engine.default_duration_secs == 0 {
            return Err(ConfigError::Validation(
                "engine.default_duration_secs must be positive".to_string(),
            ));
        }
        if self.engine.max_transition_attempts == 0 {
            return Err(ConfigError::Validation(
                "engine.max_transition_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Database locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the grant store database.
    #[serde(default = "default_grants_path")]
    pub grants_path: PathBuf,

    /// Path to the audit ledger database.
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            grants_path: default_grants_path(),
            audit_path: default_audit_path(),
        }
    }
}

/// Expiry sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Seconds between sweep ticks.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SweepConfig {
    /// Returns the sweep interval as a [`Duration`].
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Grant duration applied when a request names none, in seconds.
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: u64,

    /// Bound on contended compare-and-swap attempts for manual transitions.
    #[serde(default = "default_max_transition_attempts")]
    pub max_transition_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: default_duration_secs(),
            max_transition_attempts: default_max_transition_attempts(),
        }
    }
}

fn default_grants_path() -> PathBuf {
    PathBuf::from("consent-grants.db")
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("consent-audit.db")
}

const fn default_sweep_interval_secs() -> u64 {
    30
}

const fn default_duration_secs() -> u64 {
    86_400
}

const fn default_max_transition_attempts() -> u32 {
    3
}
