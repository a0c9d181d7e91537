//! Command-line arguments

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use url::Url;

/// Play a remote stream and report its playback lifecycle
#[derive(Parser, Debug)]
#[command(name = "avplay")]
#[command(about = "A command-line tool to play remote streams")]
#[command(version)]
pub struct Args {
    /// The remote url to play
    pub url: String,

    /// Start the player muted
    #[arg(long)]
    pub muted: bool,

    /// Print timed metadata carried in the stream
    #[arg(long = "metadata-output", overrides_with = "no_metadata_output")]
    metadata_output: bool,

    /// Do not print timed metadata
    #[arg(long = "no-metadata-output", overrides_with = "metadata_output")]
    no_metadata_output: bool,

    /// Print access and error log entries as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Timeout for the HEAD request in seconds
    #[arg(long, default_value = "10")]
    pub head_timeout: u64,

    /// Simulated clock tick in milliseconds
    #[arg(long, default_value = "250")]
    pub tick_ms: u64,

    /// Length of the simulated item in seconds; omitted means a live stream
    #[arg(long)]
    pub duration: Option<f64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Metadata output is on unless `--no-metadata-output` is the last of the pair
    pub fn should_output_metadata(&self) -> bool {
        !self.no_metadata_output || self.metadata_output
    }

    pub fn head_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.head_timeout)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Validate the numeric and level arguments
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(anyhow!("Tick must be at least 1ms"));
        }

        if self.head_timeout == 0 {
            return Err(anyhow!("HEAD timeout must be positive"));
        }

        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(anyhow!("Duration must be a positive number of seconds"));
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow!(
                    "Invalid log level '{}'. Valid levels: error, warn, info, debug, trace",
                    self.log_level
                ));
            }
        }

        Ok(())
    }
}

/// Parse the playable URL; only absolute URLs with a host are accepted
pub fn parse_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    url.has_host().then_some(url)
}
