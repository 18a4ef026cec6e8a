//! Configuration validation utilities and rules

use crate::{
    error::Result,
    export::ExportFormat,
    models::Config,
    types::FailurePolicy,
};

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    ///
    /// Hard errors (bad values, unsupported export formats) are returned as
    /// `Err`; everything else is reported as a list of warnings.
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_outputs(config)?);
        if config.load_path.is_none() {
            warnings.extend(Self::validate_servers(&config.servers));
            warnings.extend(Self::validate_measurement_settings(config));
        } else if !uses_default_servers(config) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Server settings are ignored when loading saved results".to_string(),
            ));
        }
        warnings.extend(Self::validate_statistics_settings(config));

        Ok(warnings)
    }

    /// Every output must resolve to a supported format before any trial runs
    fn validate_outputs(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        for output in &config.outputs {
            let format = match config.output_format {
                Some(ref format) => ExportFormat::parse(format)?,
                None => ExportFormat::from_path(output)?,
            };

            let matches_extension = ExportFormat::from_path(output)
                .map(|inferred| inferred == format)
                .unwrap_or(false);
            if !matches_extension {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("'{}' will be written as {}", output.display(), format),
                ));
            }

            if config.load_path.as_deref() == Some(output.as_path()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("'{}' is both the loaded file and an export target and will be overwritten", output.display()),
                ));
            }
        }

        Ok(warnings)
    }

    /// Validate candidate server URLs
    fn validate_servers(servers: &[String]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for server in servers {
            let Ok(parsed) = url::Url::parse(server) else {
                continue;
            };

            if parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Server '{}' uses HTTP instead of HTTPS; proxies on the path may distort throughput", server),
                ));
            }

            match parsed.host() {
                Some(url::Host::Ipv4(ip)) if ip.is_private() || ip.is_loopback() => {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Server '{}' is on a private/local network and will not measure the internet link", server),
                    ));
                }
                Some(url::Host::Domain("localhost")) => {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("Server '{}' is local and will not measure the internet link", server),
                    ));
                }
                _ => {}
            }
        }

        warnings
    }

    /// Validate transfer sizes, probe counts and timeouts
    fn validate_measurement_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.trial_count > 50 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("High trial count of {} will increase execution time", config.trial_count),
            ));
        }

        let total_bytes = (config.download_bytes + config.upload_bytes) * u64::from(config.trial_count);
        if total_bytes > 2_000_000_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("The run will transfer about {} MB", total_bytes / 1_000_000),
            ));
        }

        if config.download_bytes < 1_000_000 || config.upload_bytes < 1_000_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Transfers under 1 MB are dominated by connection setup and understate throughput".to_string(),
            ));
        }

        if config.ping_count < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Ping count of {} gives a coarse latency and jitter estimate", config.ping_count),
            ));
        }

        if config.timeout_seconds < 5 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Timeout of {}s may be too short to finish a transfer", config.timeout_seconds),
            ));
        } else if config.timeout_seconds > 120 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long timeout of {}s will slow down failure detection", config.timeout_seconds),
            ));
        }

        if config.failure_policy == FailurePolicy::BestEffort && config.trial_count == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Best-effort collection of a single trial behaves like fail-fast".to_string(),
            ));
        }

        warnings
    }

    /// Settings that affect the summary
    fn validate_statistics_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.load_path.is_none() && config.trial_count == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "A single trial leaves the standard deviation undefined (recommended: >= 3)".to_string(),
            ));
        } else if config.load_path.is_none() && config.trial_count < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Trial count of {} may not provide reliable statistics (recommended: >= 3)", config.trial_count),
            ));
        }

        if config.mode_precision.is_none() && config.verbose {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Ping mode is computed on exact values; set --mode-precision to group nearby times".to_string(),
            ));
        }

        warnings
    }
}

fn uses_default_servers(config: &Config) -> bool {
    config.servers.iter().map(String::as_str).eq(crate::defaults::DEFAULT_SERVERS.iter().copied())
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> colored::Color {
        match self {
            Self::Info => colored::Color::Blue,
            Self::Warning => colored::Color::Yellow,
            Self::Error => colored::Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        use colored::Colorize;

        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
