//! Configuration management for procwatch
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `PROCWATCH_<SECTION>__<KEY>` environment variables. Command-line overrides
//! are applied by the caller on the loaded value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Shortest pause between two samples, whatever the configured frequency.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Highest accepted sampling frequency in Hz.
pub const MAX_FREQUENCY_HZ: f64 = 1000.0;

/// Lowest accepted sampling frequency in Hz (one sample every ~11.6 days).
pub const MIN_FREQUENCY_HZ: f64 = 1e-6;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "PROCWATCH";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sampling loop configuration
    pub sampling: SamplingConfig,

    /// Output sink selection
    pub output: OutputConfig,

    /// Chart rendering configuration
    pub render: RenderConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Sampling loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Samples per second
    pub frequency_hz: f64,
}

/// Output sink selection, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print a live status line
    pub console: bool,

    /// Prometheus endpoint
    pub metrics: MetricsConfig,
}

/// Metrics endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve gauges over HTTP
    pub enabled: bool,

    /// Metrics server bind address
    pub bind_address: String,

    /// Metrics server port
    pub port: u16,
}

/// Chart rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Write a chart once the run ends
    pub enabled: bool,

    /// Directory for generated charts; current directory when unset
    pub directory: Option<PathBuf>,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { frequency_hz: 10.0 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            console: true,
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            width: 1000,
            height: 1500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl SamplingConfig {
    /// Pause between two samples: `1 / frequency`, never below [`MIN_SAMPLE_INTERVAL`].
    pub fn interval(&self) -> Duration {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return MIN_SAMPLE_INTERVAL;
        }
        Duration::try_from_secs_f64(1.0 / self.frequency_hz)
            .unwrap_or(Duration::MAX)
            .max(MIN_SAMPLE_INTERVAL)
    }
}

impl MetricsConfig {
    /// `address:port` string the metrics server binds to
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl MonitorConfig {
    /// Load defaults, the given file (or the default location if it exists),
    /// and environment overrides, in that order.
    ///
    /// The result is not validated: callers apply their own overrides first
    /// and call [`MonitorConfig::validate`] once on the final value.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();

        match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound { path: path.to_string_lossy().to_string() });
                }
                tracing::info!("Loading configuration from: {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Ok(default_path) = Self::default_config_path() {
                    if default_path.exists() {
                        tracing::info!("Loading configuration from: {}", default_path.display());
                    }
                    builder = builder.add_source(
                        File::from(default_path).format(FileFormat::Toml).required(false),
                    );
                }
            }
        }

        let config: MonitorConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let frequency = self.sampling.frequency_hz;
        if !frequency.is_finite() || frequency < MIN_FREQUENCY_HZ || frequency > MAX_FREQUENCY_HZ {
            return Err(ConfigError::InvalidValue {
                field: "sampling.frequency_hz".to_string(),
                value: frequency.to_string(),
            });
        }

        if self.output.metrics.bind_address.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.metrics.bind_address".to_string(),
                value: self.output.metrics.bind_address.clone(),
            });
        }

        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "render.width/render.height".to_string(),
                value: format!("{}x{}", self.render.width, self.render.height),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("procwatch").join("config.toml"))
            .ok_or_else(|| ConfigError::ValidationFailed {
                reason: "Unable to determine config directory".to_string(),
            })
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationFailed { reason: e.to_string() })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| ConfigError::ValidationFailed {
                reason: format!("Unable to create config directory: {}", parent.display()),
            })?;
        }

        let content = self.to_toml_string()?;

        fs::write(path, content)
            .map_err(|_| ConfigError::PermissionDenied { path: path.to_string_lossy().to_string() })?;

        Ok(())
    }
}
