use procwatch_monitor::error::{ConfigError, LaunchError, MonitorError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Monitor(#[from] MonitorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Monitor(MonitorError::Config(_)) => 2,
            CliError::Monitor(MonitorError::Launch(LaunchError::SpawnFailed { .. })) => 127,
            CliError::Monitor(_) => 1,
            CliError::Io(_) => 1,
            CliError::Logging(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Format error for user-friendly display
pub fn format_error(error: &CliError) -> String {
    match error {
        CliError::Config(e) => {
            format!(
                "Configuration Error: {}\n\nCheck the config file, PROCWATCH_* environment variables and command-line flags.",
                e
            )
        }
        CliError::Monitor(MonitorError::Launch(LaunchError::SpawnFailed { program, reason })) => {
            format!(
                "Could not start '{}': {}\n\nCheck that the command exists and is executable.",
                program, reason
            )
        }
        CliError::Monitor(MonitorError::Launch(LaunchError::EmptyCommand)) => {
            "No command specified.\n\nUsage: procwatch [OPTIONS] <COMMAND>...".to_string()
        }
        _ => error.to_string(),
    }
}
