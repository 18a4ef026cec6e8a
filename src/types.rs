//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// What to do when a trial fails to produce a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failed trial
    #[default]
    FailFast,
    /// Record the failed trial as skipped and keep going
    BestEffort,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::BestEffort => "best-effort",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" | "failfast" | "abort" => Ok(Self::FailFast),
            "best-effort" | "besteffort" | "skip" => Ok(Self::BestEffort),
            other => Err(AppError::config(format!(
                "Invalid failure policy '{}': expected 'fail-fast' or 'best-effort'",
                other
            ))),
        }
    }
}

/// Every quantity a trial can measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Download,
    Upload,
    Ping,
    Latency,
    Jitter,
    PacketLoss,
}

impl Metric {
    /// All metrics in report order
    pub const ALL: [Metric; 6] = [
        Metric::Download,
        Metric::Upload,
        Metric::Ping,
        Metric::Latency,
        Metric::Jitter,
        Metric::PacketLoss,
    ];

    /// Lower-case label used inside table rows ("Average download speed")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Download => "download speed",
            Self::Upload => "upload speed",
            Self::Ping => "ping time",
            Self::Latency => "latency",
            Self::Jitter => "jitter",
            Self::PacketLoss => "packet loss",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Download | Self::Upload => "Mbit/s",
            Self::Ping | Self::Latency | Self::Jitter => "ms",
            Self::PacketLoss => "%",
        }
    }

    /// Whether the metric is always present in a sample
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Download | Self::Upload | Self::Ping)
    }

    /// Format a value of this metric with two-decimal precision and unit
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::PacketLoss => format!("{:.2}%", value),
            _ => format!("{:.2} {}", value, self.unit()),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
