//! Configuration data model and validation

use crate::types::{AppError, FailurePolicy, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of trials to run
    #[serde(default = "default_trial_count")]
    pub trial_count: u32,

    /// Behaviour when a trial fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Candidate speed-test server base URLs
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    /// Bytes fetched per download measurement
    #[serde(default = "default_download_bytes")]
    pub download_bytes: u64,

    /// Bytes sent per upload measurement
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: u64,

    /// Latency probes per trial (and per server during selection)
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Decimals ping times are rounded to before computing the mode
    #[serde(default)]
    pub mode_precision: Option<u32>,

    /// Files to export the trial run to
    #[serde(default)]
    pub outputs: Vec<PathBuf>,

    /// Export format override; inferred from each output's extension when unset
    #[serde(default)]
    pub output_format: Option<String>,

    /// Previously saved results to report instead of running trials
    #[serde(default)]
    pub load_path: Option<PathBuf>,

    /// Print every trial of the run after the summary
    #[serde(default)]
    pub show_history: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trial_count: default_trial_count(),
            failure_policy: FailurePolicy::default(),
            servers: default_servers(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            ping_count: default_ping_count(),
            timeout_seconds: default_timeout_secs(),
            mode_precision: None,
            outputs: Vec::new(),
            output_format: None,
            load_path: None,
            show_history: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        use crate::defaults::*;

        if self.trial_count == 0 {
            return Err(AppError::config("Trial count must be greater than 0"));
        }

        if self.trial_count > MAX_TRIAL_COUNT {
            return Err(AppError::config(format!("Trial count cannot exceed {}", MAX_TRIAL_COUNT)));
        }

        if self.load_path.is_none() && self.servers.is_empty() {
            return Err(AppError::config("At least one speed-test server is required"));
        }

        for server in &self.servers {
            if server.trim().is_empty() {
                return Err(AppError::config("Server URL cannot be empty"));
            }

            match url::Url::parse(server) {
                Ok(parsed) => {
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        return Err(AppError::config(format!("Server URL must use http or https: {}", server)));
                    }
                }
                Err(e) => {
                    return Err(AppError::config(format!("Invalid server URL '{}': {}", server, e)));
                }
            }
        }

        for (name, bytes) in [("Download", self.download_bytes), ("Upload", self.upload_bytes)] {
            if !(MIN_TRANSFER_BYTES..=MAX_TRANSFER_BYTES).contains(&bytes) {
                return Err(AppError::config(format!(
                    "{} size must be between {} and {} bytes, got {}",
                    name, MIN_TRANSFER_BYTES, MAX_TRANSFER_BYTES, bytes
                )));
            }
        }

        if self.ping_count == 0 || self.ping_count > MAX_PING_COUNT {
            return Err(AppError::config(format!("Ping count must be between 1 and {}", MAX_PING_COUNT)));
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout_seconds > MAX_TIMEOUT_SECS {
            return Err(AppError::config(format!("Timeout cannot exceed {} seconds", MAX_TIMEOUT_SECS)));
        }

        if let Some(precision) = self.mode_precision {
            if precision > MAX_MODE_PRECISION {
                return Err(AppError::config(format!("Mode precision cannot exceed {} decimals", MAX_MODE_PRECISION)));
            }
        }

        if let Some(ref format) = self.output_format {
            crate::export::ExportFormat::parse(format)?;
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(trial_count) = std::env::var("TRIAL_COUNT") {
            self.trial_count = trial_count.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TRIAL_COUNT value '{}': {}", trial_count, e)))?;
        }

        if let Ok(policy) = std::env::var("FAILURE_POLICY") {
            self.failure_policy = policy.parse()?;
        }

        if let Ok(servers) = std::env::var("SPEEDTEST_SERVERS") {
            self.servers = servers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(bytes) = std::env::var("DOWNLOAD_BYTES") {
            self.download_bytes = bytes.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid DOWNLOAD_BYTES value '{}': {}", bytes, e)))?;
        }

        if let Ok(bytes) = std::env::var("UPLOAD_BYTES") {
            self.upload_bytes = bytes.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid UPLOAD_BYTES value '{}': {}", bytes, e)))?;
        }

        if let Ok(ping_count) = std::env::var("PING_COUNT") {
            self.ping_count = ping_count.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", ping_count, e)))?;
        }

        if let Ok(timeout) = std::env::var("TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(precision) = std::env::var("MODE_PRECISION") {
            self.mode_precision = Some(precision.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid MODE_PRECISION value '{}': {}", precision, e)))?);
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_trial_count() -> u32 {
    crate::defaults::DEFAULT_TRIAL_COUNT
}

fn default_servers() -> Vec<String> {
    crate::defaults::DEFAULT_SERVERS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_download_bytes() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_BYTES
}

fn default_upload_bytes() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_BYTES
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
