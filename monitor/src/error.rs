//! Error handling for procwatch
//!
//! The vanished-process case is not represented here: a process that is gone
//! is reported by the snapshot reader as `None` and ends a run normally.

use std::io;

use thiserror::Error;

/// The main error type for the monitoring library
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Launching the monitored command failed
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metrics endpoint errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// Chart rendering errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while starting the monitored command
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("No command specified")]
    EmptyCommand,

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Spawned process '{program}' has no pid")]
    MissingPid { program: String },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration file permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {reason}")]
    ParseError { reason: String },
}

/// Metrics related errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metric registration failed: {name}")]
    RegistrationFailed { name: String },

    #[error("Metrics export failed: {reason}")]
    ExportFailed { reason: String },

    #[error("Metrics server start failed: {reason}")]
    ServerStartFailed { reason: String },
}

/// Chart rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No samples to plot")]
    EmptySeries,

    #[error("Drawing failed: {reason}")]
    Draw { reason: String },

    #[error("Cannot write chart to {path}: {reason}")]
    Output { path: String, reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MonitorError>;

/// A specialized result type for launching commands
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

/// A specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A specialized result type for metrics operations
pub type MetricsResult<T> = std::result::Result<T, MetricsError>;

/// A specialized result type for chart rendering
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::ValidationFailed {
                reason: format!("missing key {}", key),
            },
            other => ConfigError::ParseError { reason: other.to_string() },
        }
    }
}
