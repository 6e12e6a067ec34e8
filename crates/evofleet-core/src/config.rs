//! Configuration loading and typed config structures for the evofleet server.
//!
//! The configuration lives in `evofleet-config.yaml` (or the file named by
//! `EVOFLEET_CONFIG`). Every section is optional; a missing file yields the
//! defaults. `EVOFLEET_HOST` and `EVOFLEET_PORT` override the listen
//! address so deployments can move the server without editing the file.

use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use evofleet_types::RunConfig;
use serde::Deserialize;

use crate::aggregator::{DEFAULT_BUCKET_WIDTH, DEFAULT_BUCKET_WIDTH_MS};
use crate::run_config::{self, RunConfigError};

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "evofleet-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl From<RunConfigError> for ConfigError {
    fn from(e: RunConfigError) -> Self {
        Self::Invalid {
            field: "run",
            reason: e.to_string(),
        }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Streaming aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Fleet actor channel sizes.
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Initial run configuration shown to the operator.
    #[serde(default)]
    pub run: RunConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.server.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `EVOFLEET_CONFIG` or [`DEFAULT_CONFIG_PATH`], falling back
    /// to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be used.
    pub fn load() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = std::env::var_os("EVOFLEET_CONFIG")
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        if path.exists() {
            Ok((Self::from_file(&path)?, Some(path)))
        } else {
            let mut config = Self::default();
            config.server.apply_env_overrides();
            Ok((config, None))
        }
    }

    /// Check values serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation.bucket_width_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "aggregation.bucket_width_ms",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.fleet.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "fleet.channel_capacity",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.fleet.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "fleet.broadcast_capacity",
                reason: "must be greater than zero".to_owned(),
            });
        }
        run_config::validate(&self.run)?;
        Ok(())
    }
}

/// HTTP listen address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Override host and port with `EVOFLEET_HOST` / `EVOFLEET_PORT` when
    /// set. An unparsable port is ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EVOFLEET_HOST") {
            self.host = val;
        }
        if let Some(port) = std::env::var("EVOFLEET_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.port = port;
        }
    }

    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Streaming aggregation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregationConfig {
    /// Width of one aggregation bucket in milliseconds.
    #[serde(default = "default_bucket_width_ms")]
    pub bucket_width_ms: u64,
}

impl AggregationConfig {
    /// Bucket width as a non-zero value, falling back to the default.
    pub fn bucket_width(&self) -> NonZeroU64 {
        NonZeroU64::new(self.bucket_width_ms).unwrap_or(DEFAULT_BUCKET_WIDTH)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bucket_width_ms: default_bucket_width_ms(),
        }
    }
}

/// Fleet actor channel sizes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FleetConfig {
    /// Inputs the actor queue holds before senders wait.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Messages a slow subscriber may fall behind before it lags.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

const fn default_bucket_width_ms() -> u64 {
    DEFAULT_BUCKET_WIDTH_MS
}

const fn default_channel_capacity() -> usize {
    1024
}

const fn default_broadcast_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_owned()
}
