//! Configuration management for Postdeck
//!
//! Every section has defaults, so a missing file or an empty one yields a
//! working local setup. Durations are written in humantime form
//! (`"2s"`, `"1500ms"`, `"1m 30s"`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::publish::PublishKind;
use crate::types::Destination;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/postdeck/queue.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    pub endpoint: String,
    #[serde(default)]
    pub token_file: Option<String>,
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub kind: PublishKind,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            token_file: None,
            timeout: default_timeout(),
            kind: PublishKind::Post,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PacingStrategy {
    #[default]
    Fixed,
    Backoff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub strategy: PacingStrategy,
    #[serde(default = "default_success_delay", with = "duration_serde")]
    pub success_delay: Duration,
    #[serde(default = "default_failure_delay", with = "duration_serde")]
    pub failure_delay: Duration,
    /// Upper bound for backoff pacing
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            strategy: PacingStrategy::Fixed,
            success_delay: default_success_delay(),
            failure_delay: default_failure_delay(),
            max_delay: default_max_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_batch_clear", with = "duration_serde")]
    pub batch_clear_after: Duration,
    #[serde(default = "default_single_clear", with = "duration_serde")]
    pub single_clear_after: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            batch_clear_after: default_batch_clear(),
            single_clear_after: default_single_clear(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub destination: Destination,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            destination: Destination::Instagram,
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_success_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_failure_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_batch_clear() -> Duration {
    Duration::from_secs(10)
}

fn default_single_clear() -> Duration {
    Duration::from_secs(3)
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists there
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.publish.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField("publish.endpoint".to_string()).into());
        }

        if self.pacing.failure_delay < self.pacing.success_delay {
            return Err(ConfigError::InvalidValue {
                field: "pacing.failure_delay".to_string(),
                reason: format!(
                    "must not be shorter than pacing.success_delay ({})",
                    humantime::format_duration(self.pacing.success_delay)
                ),
            }
            .into());
        }

        if self.publish.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "publish.timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Resolve the configuration file path under the XDG config directory
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("POSTDECK_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("postdeck").join("config.toml"))
}

/// Resolve the content store path
///
/// `POSTDECK_DB_PATH` wins over the configured path, which wins over the
/// platform data directory.
pub fn resolve_store_path(configured: Option<&str>) -> Result<PathBuf> {
    if let Ok(path) = std::env::var("POSTDECK_DB_PATH") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    if let Some(path) = configured {
        return Ok(PathBuf::from(shellexpand::tilde(path).to_string()));
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("postdeck").join("queue.db"))
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
