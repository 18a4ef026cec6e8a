//! Structured logging system for network speed tester
//!
//! This module provides:
//! - Structured logging with multiple levels and contexts
//! - Debug mode detailed tracing with source locations
//! - Trial lifecycle logging with correlation IDs per run
//! - JSON structured output for integration with log aggregators

use crate::error::AppError;
use crate::models::{Config, MetricSample, SkippedTrial};
use crate::types::FailurePolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Per-trial progress and operation scopes
    Debug = 0,
    /// Run lifecycle and exports
    Info = 1,
    /// Skipped trials and empty runs
    Warn = 2,
    /// Aborted runs
    Error = 3,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
    /// File and line information
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    /// Source file name
    pub file: String,
    /// Line number
    pub line: u32,
    /// Module path
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
}

/// Shared logging context for correlation and session tracking
#[derive(Debug, Default)]
struct LogContext {
    /// Global correlation ID for the session
    session_id: Option<String>,
    /// Current operation correlation ID
    current_correlation_id: Option<String>,
}

/// Logger implementation with multiple output formats
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
    /// Whether to include location information
    include_location: bool,
    /// Output format
    format: LogFormat,
    /// Logger name
    name: String,
    /// Shared context storage
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a logger with specific configuration
    ///
    /// Quiet runs only surface warnings; `--verbose` adds info and `--debug`
    /// switches to JSON entries with source locations.
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Start a correlated operation
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        {
            let mut context = self.context.write().await;
            context.current_correlation_id = Some(correlation_id.clone());
        }

        self.debug(&format!("Started operation: {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log()
            .await;

        correlation_id
    }

    /// End a correlated operation
    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.debug(&format!("Completed operation: {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "end")
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.current_correlation_id.as_deref() == Some(correlation_id) {
            context.current_correlation_id = None;
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Write log entry to output
    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        if entry.correlation_id.is_none() {
            entry.correlation_id = context.current_correlation_id.clone();
        }
        drop(context);

        let output = self.format_entry(&entry);

        // Write to stderr for errors/warnings, stdout for others
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn format_entry(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
        }
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields_str: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields_str.sort();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add location information
    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Add every collected metric of a sample
    pub fn sample(self, sample: &MetricSample) -> Self {
        self.field("download_mbps", sample.download_speed)
            .field("upload_mbps", sample.upload_speed)
            .field("ping_ms", sample.ping_time)
            .field("latency_ms", sample.latency)
            .field("jitter_ms", sample.jitter)
            .field("packet_loss_pct", sample.packet_loss)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for the lifecycle of a trial run
pub struct TrialLogger {
    logger: Logger,
    run_correlation_id: Option<String>,
}

impl TrialLogger {
    /// Create a new trial logger
    pub fn new(config: &Config) -> Self {
        Self::from_logger(Logger::with_config("TRIALS".to_string(), config))
    }

    /// Wrap an already configured logger
    pub fn from_logger(logger: Logger) -> Self {
        Self {
            logger,
            run_correlation_id: None,
        }
    }

    /// Underlying logger
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Log the beginning of a run and open its correlation scope
    pub async fn run_started(&mut self, provider: &str, trial_count: u32, policy: FailurePolicy) {
        let correlation_id = self.logger.start_operation("trial_run").await;
        self.logger.info(&format!("Running {} trials against {}", trial_count, provider))
            .correlation_id(&correlation_id)
            .field("provider", provider)
            .field("trial_count", trial_count)
            .field("failure_policy", policy.as_str())
            .log()
            .await;
        self.run_correlation_id = Some(correlation_id);
    }

    pub async fn trial_started(&self, test_number: u32, trial_count: u32) {
        self.logger.debug(&format!("Starting trial {}/{}", test_number, trial_count))
            .field("test_number", test_number)
            .log()
            .await;
    }

    pub async fn trial_completed(&self, test_number: u32, sample: &MetricSample) {
        self.logger.info(&format!(
            "Trial {} completed: down={:.2} Mbit/s up={:.2} Mbit/s ping={:.2} ms",
            test_number, sample.download_speed, sample.upload_speed, sample.ping_time
        ))
            .field("test_number", test_number)
            .sample(sample)
            .log()
            .await;
    }

    pub async fn trial_skipped(&self, skipped: &SkippedTrial, error: &AppError) {
        self.logger.warn(&format!("Trial {} skipped: {}", skipped.test_number, skipped.reason))
            .field("test_number", skipped.test_number)
            .error_info(error)
            .log()
            .await;
    }

    pub async fn run_aborted(&self, test_number: u32, completed: usize, error: &AppError) {
        self.logger.error(&format!(
            "Run aborted at trial {} after {} completed trials: {}",
            test_number, completed, error
        ))
            .field("test_number", test_number)
            .field("completed_trials", completed)
            .error_info(error)
            .log()
            .await;
        self.close_run(false).await;
    }

    pub async fn run_finished(&self, completed: usize, skipped: usize) {
        self.logger.info(&format!("Run finished: {} trials completed, {} skipped", completed, skipped))
            .field("completed_trials", completed)
            .field("skipped_trials", skipped)
            .log()
            .await;
        self.close_run(true).await;
    }

    async fn close_run(&self, success: bool) {
        if let Some(ref correlation_id) = self.run_correlation_id {
            self.logger.end_operation(correlation_id, "trial_run", success).await;
        }
    }
}

/// Global logger factory and management
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    /// Create a new logger factory
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    /// Create a trial logger sharing this session
    pub async fn create_trial_logger(&self) -> TrialLogger {
        TrialLogger::from_logger(self.create_logger("TRIALS").await)
    }

    /// Get session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_logger(name: &str) -> Logger {
        Logger::with_config(name.to_string(), &Config { enable_color: false, ..Default::default() })
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
    }

    #[test]
    fn test_logger_with_config_levels() {
        let quiet = Logger::with_config("TEST".to_string(), &Config::default());
        assert_eq!(quiet.min_level, LogLevel::Warn);
        assert_eq!(quiet.format, LogFormat::Console);

        let verbose = Logger::with_config("TEST".to_string(), &Config { verbose: true, ..Default::default() });
        assert_eq!(verbose.min_level, LogLevel::Info);

        let debug = Logger::with_config(
            "TEST".to_string(),
            &Config { debug: true, enable_color: false, ..Default::default() },
        );
        assert_eq!(debug.min_level, LogLevel::Debug);
        assert_eq!(debug.format, LogFormat::Json);
        assert!(debug.include_location);
        assert!(!debug.use_color);
    }

    #[tokio::test]
    async fn test_session_id_management() {
        let logger = plain_logger("TEST");
        logger.set_session_id("test-session".to_string()).await;

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some("test-session"));
    }

    #[tokio::test]
    async fn test_operation_correlation() {
        let logger = plain_logger("TEST");
        let correlation_id = logger.start_operation("trial_run").await;
        assert!(!correlation_id.is_empty());
        assert_eq!(
            logger.context.read().await.current_correlation_id.as_deref(),
            Some(correlation_id.as_str())
        );

        logger.end_operation(&correlation_id, "trial_run", true).await;
        assert!(logger.context.read().await.current_correlation_id.is_none());
    }

    #[test]
    fn test_log_formats() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "Trial 1 completed".to_string(),
            logger: "TRIALS".to_string(),
            correlation_id: Some("short".to_string()),
            fields: {
                let mut map = HashMap::new();
                map.insert("test_number".to_string(), serde_json::json!(1));
                map
            },
            location: None,
        };

        let logger = plain_logger("TRIALS");
        let console_output = logger.format_entry(&entry);
        assert!(console_output.contains(" INFO [TRIALS] Trial 1 completed [short]"));
        assert!(console_output.contains("test_number=1"));

        let json_output = logger.format_json(&entry);
        let parsed: serde_json::Value = serde_json::from_str(&json_output).unwrap();
        assert_eq!(parsed["message"], "Trial 1 completed");
        assert_eq!(parsed["fields"]["test_number"], 1);
    }

    #[test]
    fn test_sample_fields() {
        let logger = plain_logger("TEST");
        let sample = MetricSample::new(50.0, 10.0, 12.5).with_jitter(1.25);
        let builder = logger.info("sample").sample(&sample);

        assert_eq!(builder.entry.fields["download_mbps"], serde_json::json!(50.0));
        assert_eq!(builder.entry.fields["jitter_ms"], serde_json::json!(1.25));
        assert_eq!(builder.entry.fields["latency_ms"], serde_json::Value::Null);
    }

    #[test]
    fn test_error_info_fields() {
        let logger = plain_logger("TEST");
        let builder = logger.error("failed").error_info(&AppError::measurement("timeout"));

        assert_eq!(builder.entry.fields["error_category"], "MEASUREMENT");
        assert_eq!(builder.entry.fields["error_recoverable"], true);
    }

    #[test]
    fn test_log_location() {
        let logger = plain_logger("TEST");
        let builder = logger.debug("here").location("executor/mod.rs", 42, Some("nst::executor"));
        let location = builder.entry.location.as_ref().unwrap();
        assert_eq!(location.file, "executor/mod.rs");
        assert_eq!(location.line, 42);
    }

    #[tokio::test]
    async fn test_trial_logger_lifecycle() {
        let config = Config::default();
        let mut trial_logger = TrialLogger::new(&config);
        assert_eq!(trial_logger.logger().name(), "TRIALS");

        trial_logger.run_started("mock", 2, FailurePolicy::BestEffort).await;
        assert!(trial_logger.run_correlation_id.is_some());

        trial_logger.trial_started(1, 2).await;
        trial_logger.trial_completed(1, &MetricSample::new(1.0, 1.0, 1.0)).await;
        trial_logger.run_finished(1, 0).await;
        assert!(trial_logger.logger().context.read().await.current_correlation_id.is_none());
    }

    #[tokio::test]
    async fn test_logger_factory() {
        let factory = LoggerFactory::new(Config::default());
        let logger = factory.create_logger("TEST").await;
        assert_eq!(logger.name(), "TEST");
        assert_eq!(
            logger.context.read().await.session_id.as_deref(),
            Some(factory.session_id())
        );

        let trial_logger = factory.create_trial_logger().await;
        assert_eq!(trial_logger.logger().name(), "TRIALS");
    }
}
