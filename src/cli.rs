//! Command-line interface. With no subcommand the binary runs one harvest
//! cycle, same as `run`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one harvest cycle (default)
    Run(RunArgs),
    /// Serve the read-only dashboard API
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Config directory (falls back to $CONVOCATORIAS_CONFIG_DIR, then ./config)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Email the digest even if `[notify].enabled` is false
    #[arg(long)]
    pub send_email: bool,

    /// JSON log lines instead of human-readable output
    #[arg(long)]
    pub log_json: bool,
}

/// One week.
pub const MAX_HARVEST_EVERY_MINS: u64 = 7 * 24 * 60;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Config directory (falls back to $CONVOCATORIAS_CONFIG_DIR, then ./config)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Also harvest in the background every N minutes (1 to 10080)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_HARVEST_EVERY_MINS))]
    pub harvest_every_mins: Option<u64>,

    /// JSON log lines instead of human-readable output
    #[arg(long)]
    pub log_json: bool,
}

impl ServeArgs {
    /// Background harvest period, if enabled.
    pub fn harvest_interval(&self) -> Option<Duration> {
        self.harvest_every_mins
            .filter(|m| *m > 0)
            .map(|m| Duration::from_secs(m.saturating_mul(60)))
    }
}

impl Cli {
    /// Effective `--log-json` across the selected command.
    pub fn log_json(&self) -> bool {
        match &self.command {
            Some(Command::Run(a)) => a.log_json,
            Some(Command::Serve(a)) => a.log_json,
            None => self.run.log_json,
        }
    }
}
