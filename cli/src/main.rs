use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod output;

use commands::{ConfigArgs, RunArgs};
use error::{CliError, Result};
use output::OutputManager;
use procwatch_monitor::config::LoggingConfig;
use procwatch_monitor::MonitorConfig;

#[derive(Parser)]
#[command(name = "procwatch")]
#[command(about = "procwatch - run a command and watch the memory, CPU and I/O of its process tree")]
#[command(version)]
#[command(long_about = "
procwatch launches a command, samples its whole process tree at a fixed frequency,
prints a live status line, optionally serves the values to Prometheus, and writes a
chart of memory, CPU and I/O once the command ends.

Examples:
  procwatch python train.py --epochs 3          # Monitor a script at 10 Hz
  procwatch --frequency 2 -- make -j8            # Sample twice per second
  procwatch --prometheus --port 9000 ./server    # Expose gauges on :9000/metrics
  procwatch --no-console -o run.png ./bench      # Quiet run with a fixed chart path
")]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(flatten)]
    config_args: ConfigArgs,

    /// Configuration file path
    #[arg(short, long, env = "PROCWATCH_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let colored = !cli.no_color && console::Term::stdout().features().colors_supported();
    let output = OutputManager::new(colored);

    if let Err(e) = run_command(cli, &output).await {
        let _ = output.print_error(&error::format_error(&e));
        process::exit(e.exit_code());
    }
}

async fn run_command(cli: Cli, output: &OutputManager) -> Result<()> {
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;
    info!("procwatch {} started", procwatch_monitor::VERSION);

    if cli.config_args.requested() {
        return commands::config::run(&cli.config_args, &config, output);
    }

    commands::run::run(cli.run, config, output).await
}

/// Defaults, config file and environment, then command-line flags on top
fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = MonitorConfig::load(cli.config.as_deref())?;

    cli.run.apply_to(&mut config);
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let level = logging.level.to_lowercase();
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("procwatch={level},procwatch_monitor={level},hyper=warn"))
            .map_err(|e| CliError::Logging(e.to_string()))?,
    };

    // stdout carries the status line, so logs go to stderr
    let result = if logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::Logging(e.to_string()))
}
