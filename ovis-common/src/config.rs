//! Configuration loading and resolution
//!
//! Bootstrap configuration lives in a single TOML file with three tables:
//!
//! ```toml
//! [pipeline]
//! window_length = 30
//! chunk_size = 30000
//! time_column = "Time"
//! labels = ["grazing", "lying", "walking"]
//!
//! [influx]
//! url = "http://localhost:8086"
//! org = "farm"
//! bucket = "sheep"
//! token = "..."
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Settings Sources Priority
//!
//! 1. Command-line argument (config file path)
//! 2. Environment variables (`OVIS_CONFIG`, `OVIS_INFLUX_*`, `OVIS_LOG_LEVEL`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing config file is not an error: a warning is logged and the
//! built-in defaults are used.

use crate::time::parse_utc_offset;
use crate::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "OVIS_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub influx: InfluxConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where [`TomlConfig::load_with_source`] found its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This path was resolved but does not exist; defaults were used
    Missing(PathBuf),
    /// No config location could be determined; defaults were used
    NoLocation,
}

impl ConfigSource {
    /// Emit the load outcome (info for a file, warning for defaults)
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                info!("Loaded configuration from {}", path.display());
            }
            ConfigSource::Missing(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
            }
            ConfigSource::NoLocation => {
                warn!("No config file location available, using built-in defaults");
            }
        }
    }

    /// True when built-in defaults were used
    pub fn is_default(&self) -> bool {
        !matches!(self, ConfigSource::File(_))
    }
}

/// Windowing, inference and persistence settings
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Samples per window
    #[serde(default = "default_window_length")]
    pub window_length: usize,

    /// Raw rows per chunk in streaming mode (multiple of `window_length`)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Preferred name of the timestamp column
    #[serde(default = "default_time_column")]
    pub time_column: String,

    /// Behaviour labels, index-aligned with the classifier output
    #[serde(default)]
    pub labels: Vec<String>,

    /// Measurement name for persisted points
    #[serde(default = "default_measurement")]
    pub measurement: String,

    /// Column carrying the animal id (tagged as `sheep_id` when present)
    #[serde(default = "default_entity_column")]
    pub entity_column: Option<String>,

    /// Offset applied to timestamps without one, e.g. "+02:00"
    #[serde(default = "default_source_utc_offset")]
    pub source_utc_offset: String,
}

/// InfluxDB v2 connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_url")]
    pub url: String,

    #[serde(default)]
    pub org: String,

    #[serde(default)]
    pub bucket: String,

    /// API token; prefer `OVIS_INFLUX_TOKEN` over storing it in the file
    #[serde(default)]
    pub token: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_window_length() -> usize {
    30
}

fn default_chunk_size() -> usize {
    30_000
}

fn default_time_column() -> String {
    "Time".to_string()
}

fn default_measurement() -> String {
    "behavior_pred".to_string()
}

fn default_entity_column() -> Option<String> {
    Some("sheep_id".to_string())
}

fn default_source_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_influx_url() -> String {
    "http://localhost:8086".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            chunk_size: default_chunk_size(),
            time_column: default_time_column(),
            labels: Vec::new(),
            measurement: default_measurement(),
            entity_column: default_entity_column(),
            source_utc_offset: default_source_utc_offset(),
        }
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: default_influx_url(),
            org: String::new(),
            bucket: String::new(),
            token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load the config file if one resolves, otherwise fall back to defaults
    ///
    /// An unreadable or malformed file that *does* exist is still an error.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::load_with_source(cli_path)?;
        source.log();
        Ok(config)
    }

    /// Like [`load_or_default`](Self::load_or_default), but report where the
    /// settings came from instead of logging it
    ///
    /// Binaries load config before the subscriber exists; they call
    /// [`ConfigSource::log`] once logging is up.
    pub fn load_with_source(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                let config = Self::load(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((Self::default(), ConfigSource::Missing(path))),
            None => Ok((Self::default(), ConfigSource::NoLocation)),
        }
    }

    /// Apply `OVIS_INFLUX_*` and `OVIS_LOG_LEVEL` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_value("OVIS_INFLUX_URL") {
            self.influx.url = url;
        }
        if let Some(org) = env_value("OVIS_INFLUX_ORG") {
            self.influx.org = org;
        }
        if let Some(bucket) = env_value("OVIS_INFLUX_BUCKET") {
            self.influx.bucket = bucket;
        }
        if let Some(token) = env_value("OVIS_INFLUX_TOKEN") {
            self.influx.token = Some(token);
        }
        if let Some(level) = env_value("OVIS_LOG_LEVEL") {
            self.logging.level = level;
        }
    }
}

impl PipelineConfig {
    /// Check the fields that can be validated without running the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.time_column.trim().is_empty() {
            return Err(Error::Config("time_column must not be empty".to_string()));
        }
        if self.measurement.trim().is_empty() {
            return Err(Error::Config("measurement must not be empty".to_string()));
        }
        self.utc_offset()?;
        Ok(())
    }

    /// Offset applied to naive timestamps
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.source_utc_offset)
    }

    /// Entity column name; an empty string in the file disables tagging
    pub fn entity_column(&self) -> Option<&str> {
        self.entity_column
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl InfluxConfig {
    /// Ensure everything needed for a write is present
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.org.trim().is_empty() {
            missing.push("org");
        }
        if self.bucket.trim().is_empty() {
            missing.push("bucket");
        }
        if self.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("token");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "InfluxDB settings missing: {}. Set them in the [influx] table or via \
                 OVIS_INFLUX_URL / OVIS_INFLUX_ORG / OVIS_INFLUX_BUCKET / OVIS_INFLUX_TOKEN",
                missing.join(", ")
            )))
        }
    }
}

/// Resolve the config file path
///
/// Command-line path, then `OVIS_CONFIG`, then the platform default
/// (`~/.config/ovis/config.toml` on Linux).
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    default_config_path()
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ovis").join("config.toml"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
