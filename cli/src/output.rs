use crate::error::Result;
use console::style;
use procwatch_monitor::{MonitorRun, Termination};

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn print_success(&self, message: &str) -> Result<()> {
        if self.colored {
            println!("{} {}", style("✓").green().bold(), message);
        } else {
            println!("✓ {}", message);
        }
        Ok(())
    }

    pub fn print_warning(&self, message: &str) -> Result<()> {
        if self.colored {
            println!("{} {}", style("⚠").yellow().bold(), message);
        } else {
            println!("⚠ {}", message);
        }
        Ok(())
    }

    pub fn print_error(&self, message: &str) -> Result<()> {
        if self.colored {
            eprintln!("{} {}", style("✗").red().bold(), message);
        } else {
            eprintln!("✗ {}", message);
        }
        Ok(())
    }

    pub fn print_info(&self, message: &str) -> Result<()> {
        if self.colored {
            println!("{} {}", style("ℹ").blue().bold(), message);
        } else {
            println!("ℹ {}", message);
        }
        Ok(())
    }

    /// One-line recap of a finished run
    pub fn print_run_summary(&self, run: &MonitorRun) -> Result<()> {
        self.print_info(&summarize(run))
    }
}

fn summarize(run: &MonitorRun) -> String {
    let ending = match run.termination {
        Termination::ProcessExited(Some(code)) => format!("exited with code {}", code),
        Termination::ProcessExited(None) => "was terminated by a signal".to_string(),
        Termination::ProcessVanished => "is no longer running".to_string(),
        Termination::Cancelled => "was still running when monitoring was interrupted".to_string(),
    };

    format!(
        "Process {} {}. {} samples over {:.2}s, peak memory {:.2}MB, peak CPU {:.2}%",
        run.pid,
        ending,
        run.series.len(),
        run.series.duration_seconds(),
        run.series.peak_memory_mb(),
        run.series.peak_cpu_percent(),
    )
}
