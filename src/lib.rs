//! Network Speed Tester
//!
//! Runs a series of internet speed trials (download, upload, ping), keeps the
//! results as an ordered [`TrialRun`], summarizes them into descriptive
//! statistics and renders or persists them as a text table, JSON or CSV.
//!
//! The four entry points are [`collect`], [`summarize`], [`render_table`] and
//! [`export`]/[`load`].

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod export;
pub mod logging;
pub mod models;
pub mod output;
pub mod provider;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorReporter, Result};
pub use executor::{collect, CollectionAborted, CollectionError, CollectionOutcome, TrialExecutor};
pub use export::{export, load, ExportFormat};
pub use models::{Config, MetricSample, SkippedTrial, Trial, TrialRun};
pub use output::{render_table, ColoredFormatter, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use provider::{HttpSpeedProvider, MeasurementProvider};
pub use stats::{summarize, MetricSummary, StatisticsEngine, SummaryReport};
pub use types::{FailurePolicy, Metric};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Build metadata recorded by `build.rs`
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TRIAL_COUNT: u32 = 5;
    pub const MAX_TRIAL_COUNT: u32 = 100;
    pub const DEFAULT_SERVERS: &[&str] = &["https://speed.cloudflare.com"];
    pub const DEFAULT_DOWNLOAD_BYTES: u64 = 25_000_000;
    pub const DEFAULT_UPLOAD_BYTES: u64 = 10_000_000;
    pub const MIN_TRANSFER_BYTES: u64 = 1_000;
    pub const MAX_TRANSFER_BYTES: u64 = 1_000_000_000;
    pub const DEFAULT_PING_COUNT: u32 = 5;
    pub const MAX_PING_COUNT: u32 = 50;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_TIMEOUT_SECS: u64 = 300;
    pub const MAX_MODE_PRECISION: u32 = 6;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
