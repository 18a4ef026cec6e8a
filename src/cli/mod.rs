//! Command-line interface definition

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Network Speed Tester - run repeated download/upload/ping trials and summarize them
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Number of trials to run (default 5)
    #[arg(short, long, value_parser = parse_trial_count)]
    pub count: Option<u32>,

    /// Record failed trials as skipped instead of aborting the run
    #[arg(long)]
    pub best_effort: bool,

    /// Candidate speed-test server base URL (can be used multiple times)
    #[arg(long = "server", value_name = "URL", action = ArgAction::Append)]
    pub servers: Vec<String>,

    /// Export the trial run to this file (can be used multiple times)
    #[arg(short, long = "output", value_name = "PATH", action = ArgAction::Append)]
    pub outputs: Vec<PathBuf>,

    /// Export format (json or csv); inferred from each output's extension when omitted
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Report previously saved results instead of running trials
    #[arg(long, value_name = "PATH")]
    pub load: Option<PathBuf>,

    /// Print every trial after the summary
    #[arg(long)]
    pub history: bool,

    /// Bytes fetched per download measurement
    #[arg(long, value_name = "BYTES")]
    pub download_bytes: Option<u64>,

    /// Bytes sent per upload measurement
    #[arg(long, value_name = "BYTES")]
    pub upload_bytes: Option<u64>,

    /// Latency probes per trial
    #[arg(long, value_name = "N")]
    pub ping_count: Option<u32>,

    /// Request timeout in seconds
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Round ping times to this many decimals before computing the mode
    #[arg(long, value_name = "DECIMALS")]
    pub mode_precision: Option<u32>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Print an example .env file and exit
    #[arg(long)]
    pub example_env: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.load.is_some() && self.best_effort {
            return Err("--best-effort only applies when running trials, not with --load".to_string());
        }

        if self.load.is_some() && !self.servers.is_empty() {
            return Err("--server only applies when running trials, not with --load".to_string());
        }

        if self.format.is_some() && self.outputs.is_empty() {
            return Err("--format requires at least one --output".to_string());
        }

        Ok(())
    }

    /// Check if colors should be enabled
    ///
    /// `None` leaves the decision to the configuration.
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else {
            None
        }
    }

    /// Whether the terminal should get colors, honoring `NO_COLOR`/`TERM=dumb`
    pub fn use_colors(&self) -> bool {
        self.color_override().unwrap_or_else(supports_color)
    }
}

fn parse_trial_count(s: &str) -> Result<u32, String> {
    let count: u32 = s.parse().map_err(|_| format!("Invalid trial count: {}", s))?;
    if count == 0 {
        Err("Trial count must be greater than 0".to_string())
    } else {
        Ok(count)
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_TIMEOUT_SECS {
                Err(format!("Duration cannot exceed {} seconds", crate::defaults::MAX_TIMEOUT_SECS))
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    cfg!(unix)
}
