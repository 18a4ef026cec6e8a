//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::FailurePolicy;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                println!("Loaded configuration from .env file");
            }
        } else if debug {
            println!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Speed Tester Configuration
#
# Values specified here are used as defaults and can be overridden by
# command-line arguments.

# Number of trials per run (1-100)
# TRIAL_COUNT=5

# What to do when a trial fails: fail-fast or best-effort
# FAILURE_POLICY=fail-fast

# Candidate speed-test servers (comma-separated base URLs).
# The server with the lowest median round trip is used.
# SPEEDTEST_SERVERS=https://speed.cloudflare.com

# Bytes transferred per download and upload measurement
# DOWNLOAD_BYTES=25000000
# UPLOAD_BYTES=10000000

# Latency probes per trial
# PING_COUNT=5

# Request timeout in seconds (1-300)
# TIMEOUT_SECONDS=30

# Round ping times to this many decimals before computing the mode
# MODE_PRECISION=1

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Example configurations for different scenarios:
#
# Quick check on a slow link:
# TRIAL_COUNT=3
# DOWNLOAD_BYTES=2000000
# UPLOAD_BYTES=1000000
#
# Long unattended run that tolerates flaky trials:
# TRIAL_COUNT=50
# FAILURE_POLICY=best-effort
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        use crate::defaults::*;

        match key {
            "TRIAL_COUNT" => {
                let count: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid TRIAL_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > MAX_TRIAL_COUNT {
                    return Err(AppError::config(format!(
                        "TRIAL_COUNT must be between 1 and {}, got: {}",
                        MAX_TRIAL_COUNT, count
                    )));
                }
            }
            "FAILURE_POLICY" => {
                value.parse::<FailurePolicy>()?;
            }
            "SPEEDTEST_SERVERS" => {
                for server in value.split(',') {
                    let server = server.trim();
                    if !server.is_empty() {
                        url::Url::parse(server)
                            .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_SERVERS entry '{}': {}", server, e)))?;
                    }
                }
            }
            "DOWNLOAD_BYTES" | "UPLOAD_BYTES" => {
                let bytes: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !(MIN_TRANSFER_BYTES..=MAX_TRANSFER_BYTES).contains(&bytes) {
                    return Err(AppError::config(format!(
                        "{} must be between {} and {}, got: {}",
                        key, MIN_TRANSFER_BYTES, MAX_TRANSFER_BYTES, bytes
                    )));
                }
            }
            "PING_COUNT" => {
                let count: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > MAX_PING_COUNT {
                    return Err(AppError::config(format!(
                        "PING_COUNT must be between 1 and {}, got: {}",
                        MAX_PING_COUNT, count
                    )));
                }
            }
            "TIMEOUT_SECONDS" => {
                let timeout: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", value, e)))?;
                if timeout == 0 || timeout > MAX_TIMEOUT_SECS {
                    return Err(AppError::config(format!(
                        "TIMEOUT_SECONDS must be between 1 and {}, got: {}",
                        MAX_TIMEOUT_SECS, timeout
                    )));
                }
            }
            "MODE_PRECISION" => {
                let precision: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid MODE_PRECISION value '{}': {}", value, e)))?;
                if precision > MAX_MODE_PRECISION {
                    return Err(AppError::config(format!(
                        "MODE_PRECISION cannot exceed {}, got: {}",
                        MAX_MODE_PRECISION, precision
                    )));
                }
            }
            "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TRIAL_COUNT", "Number of trials per run (1-100)", "5"),
            ("FAILURE_POLICY", "fail-fast or best-effort", "best-effort"),
            ("SPEEDTEST_SERVERS", "Comma-separated candidate server URLs", "https://speed.cloudflare.com"),
            ("DOWNLOAD_BYTES", "Bytes fetched per download measurement", "25000000"),
            ("UPLOAD_BYTES", "Bytes sent per upload measurement", "10000000"),
            ("PING_COUNT", "Latency probes per trial (1-50)", "5"),
            ("TIMEOUT_SECONDS", "Request timeout in seconds (1-300)", "30"),
            ("MODE_PRECISION", "Decimals ping times are rounded to for the mode", "1"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value).err()
            })
            .map(|e| format!("Warning: {}", e))
            .collect()
    }

    /// Check if .env file exists and validate its contents
    pub fn check_env_file() -> Result<Option<Vec<String>>> {
        Self::check_env_file_at(Path::new(".env"))
    }

    /// Validate the entries of an env file at `path`
    pub fn check_env_file_at(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
