use crate::error::Result;
use crate::output::OutputManager;
use chrono::Local;
use clap::Args;
use procwatch_monitor::error::RenderError;
use procwatch_monitor::{
    build_sinks, Monitor, MonitorConfig, MonitorRun, SeriesRenderer, ShutdownSignal, Termination,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const NO_DATA_MESSAGE: &str =
    "No data collected. The monitored process may have crashed or finished too quickly.";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Sampling frequency in Hz [default: 10]
    #[arg(short, long, value_name = "HZ")]
    pub frequency: Option<f64>,

    /// Disable the live console status line
    #[arg(long)]
    pub no_console: bool,

    /// Serve the gauges on a Prometheus endpoint
    #[arg(long)]
    pub prometheus: bool,

    /// Port for the Prometheus endpoint [default: 8000]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Address for the Prometheus endpoint [default: 0.0.0.0]
    #[arg(long, value_name = "ADDR")]
    pub bind_address: Option<String>,

    /// Chart path (defaults to <command>-<timestamp>.png)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip writing the chart
    #[arg(long)]
    pub no_plot: bool,

    /// Command to run and monitor, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        required_unless_present_any = ["print_config", "save_config"],
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut MonitorConfig) {
        if let Some(frequency) = self.frequency {
            config.sampling.frequency_hz = frequency;
        }
        if self.no_console {
            config.output.console = false;
        }
        if self.prometheus {
            config.output.metrics.enabled = true;
        }
        if let Some(port) = self.port {
            config.output.metrics.port = port;
        }
        if let Some(address) = &self.bind_address {
            config.output.metrics.bind_address = address.clone();
        }
        if self.no_plot {
            config.render.enabled = false;
        }
    }
}

pub async fn run(args: RunArgs, config: MonitorConfig, output: &OutputManager) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    let listener = shutdown.listen_for_signals();

    let sinks = build_sinks(&config.output);
    if sinks.is_empty() {
        info!("No output sinks active; samples are still collected for the chart");
    }

    let mut monitor = Monitor::system(config.sampling.clone(), shutdown.clone());
    let result = monitor.run(&args.command, Box::new(sinks)).await;
    listener.abort();
    let run = result?;

    log_termination(&run);

    let renderer = SeriesRenderer::from_config(&config.render);
    let chart_path = args
        .output
        .clone()
        .unwrap_or_else(|| renderer.output_path_for(&args.command, Local::now()));
    let renderer = config.render.enabled.then_some(&renderer);

    match finish_run(&run, renderer, &chart_path, output)? {
        ChartOutcome::Saved(path) => info!(path = %path.display(), "Chart written"),
        ChartOutcome::Failed(e) => warn!(error = %e, "Chart not written"),
        ChartOutcome::NoData | ChartOutcome::Disabled => {}
    }
    Ok(())
}

/// What became of the chart once a run ended.
#[derive(Debug)]
pub enum ChartOutcome {
    /// Nothing was collected, the renderer was not invoked
    NoData,

    /// Charting is switched off
    Disabled,

    Saved(PathBuf),

    /// Reported to the user; the run itself still succeeds
    Failed(RenderError),
}

/// Report a finished run and draw its chart when there is something to draw.
pub fn finish_run(
    run: &MonitorRun,
    renderer: Option<&SeriesRenderer>,
    chart_path: &Path,
    output: &OutputManager,
) -> Result<ChartOutcome> {
    if run.series.is_empty() {
        output.print_warning(NO_DATA_MESSAGE)?;
        return Ok(ChartOutcome::NoData);
    }

    output.print_run_summary(run)?;

    let Some(renderer) = renderer else {
        return Ok(ChartOutcome::Disabled);
    };

    match renderer.render(&run.series, chart_path) {
        Ok(()) => {
            output.print_success(&format!("Plot saved to {}", chart_path.display()))?;
            Ok(ChartOutcome::Saved(chart_path.to_path_buf()))
        }
        Err(e) => {
            output.print_error(&format!("Error plotting stats: {}", e))?;
            Ok(ChartOutcome::Failed(e))
        }
    }
}

fn log_termination(run: &MonitorRun) {
    match run.termination {
        Termination::ProcessExited(Some(0)) => info!(pid = run.pid, "Process exited successfully"),
        Termination::ProcessExited(Some(code)) => warn!(pid = run.pid, code, "Process exited with an error"),
        Termination::ProcessExited(None) => warn!(pid = run.pid, "Process was terminated by a signal"),
        Termination::ProcessVanished => info!(pid = run.pid, "Process disappeared"),
        Termination::Cancelled => info!(pid = run.pid, "Monitoring interrupted"),
    }
}
