//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

use crate::state::{DEFAULT_CYCLE_SECONDS, MAX_CYCLE_SECONDS};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "focus-bell")]
#[command(about = "A focus interval timer that rings once per round at a random moment")]
#[command(version)]
pub struct Config {
    /// Port to bind the control API to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Length of one round in seconds
    #[arg(short, long, default_value_t = DEFAULT_CYCLE_SECONDS, value_parser = clap::value_parser!(u64).range(1..=MAX_CYCLE_SECONDS))]
    pub cycle_seconds: u64,

    /// Where the cycle state is kept between runs
    #[arg(long, conflicts_with = "ephemeral")]
    pub state_file: Option<PathBuf>,

    /// Keep the cycle state in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Shell command that plays the cue (terminal bell when unset)
    #[arg(long)]
    pub cue_command: Option<String>,

    /// Shell command run for background notifications, with title and body as $1 and $2
    #[arg(long)]
    pub notify_command: Option<String>,

    /// Seed for the cue offset draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// How often to check for host sleep, in seconds
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..))]
    pub wake_check_seconds: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn wake_check_period(&self) -> Duration {
        Duration::from_secs(self.wake_check_seconds)
    }
}
