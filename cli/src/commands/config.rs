use crate::error::Result;
use crate::output::OutputManager;
use clap::Args;
use procwatch_monitor::MonitorConfig;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Write the effective configuration to a TOML file and exit
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn requested(&self) -> bool {
        self.print_config || self.save_config.is_some()
    }
}

pub fn run(args: &ConfigArgs, config: &MonitorConfig, output: &OutputManager) -> Result<()> {
    if args.print_config {
        print!("{}", config.to_toml_string()?);
    }

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        output.print_success(&format!("Configuration saved to {}", path.display()))?;
    }

    Ok(())
}
