//! Error handling for the network speed tester

use thiserror::Error;

/// Custom error types for the network speed tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or arguments
    #[error("Validation error: {0}")]
    Validation(String),

    /// The measurement provider failed to produce a sample
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// Statistics were requested over too few samples
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Export or load format outside the supported set
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// A results file that is not valid for its declared format
    #[error("Malformed file: {0}")]
    MalformedFile(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new measurement error
    pub fn measurement<S: Into<String>>(message: S) -> Self {
        Self::Measurement(message.into())
    }

    /// Create a new insufficient data error
    pub fn insufficient_data<S: Into<String>>(message: S) -> Self {
        Self::InsufficientData(message.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(message: S) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new malformed file error
    pub fn malformed_file<S: Into<String>>(message: S) -> Self {
        Self::MalformedFile(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Measurement(_) => "MEASUREMENT",
            Self::InsufficientData(_) => "DATA",
            Self::UnsupportedFormat(_) => "FORMAT",
            Self::Io(_) => "IO",
            Self::MalformedFile(_) => "FILE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (running again may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Measurement(_) | Self::Io(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::UnsupportedFormat(_) => false,
            Self::InsufficientData(_) | Self::MalformedFile(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the values passed on the command line.", msg)
            }
            Self::Measurement(msg) => {
                format!("Speed measurement failed: {}\n\nSuggestion: Check your internet connection, try another --server, or use --best-effort to skip failed trials.", msg)
            }
            Self::InsufficientData(msg) => {
                format!("Not enough data: {}\n\nSuggestion: Run at least one successful trial before summarizing.", msg)
            }
            Self::UnsupportedFormat(msg) => {
                format!("Unsupported file format: {}\n\nSuggestion: Use --format json or --format csv, or a .json/.csv file extension.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::MalformedFile(msg) => {
                format!("Results file could not be read: {}\n\nSuggestion: Make sure the file was written by this tool and matches its extension.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::UnsupportedFormat(_) => 1,
            Self::Measurement(_) => 2,
            Self::InsufficientData(_) => 3,
            Self::Io(_) | Self::MalformedFile(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::UnsupportedFormat(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Measurement(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::InsufficientData(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::MalformedFile(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_io() {
            Self::io(error.to_string())
        } else {
            Self::malformed_file(format!("JSON error: {}", error))
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::measurement(format!("request timed out: {}", error))
        } else if error.is_connect() {
            Self::measurement(format!("connection failed: {}", error))
        } else {
            Self::measurement(error.to_string())
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::config(format!("URL parse error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for structured error logging and user feedback
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error report as it would be printed
    pub fn render(&self, error: &AppError) -> String {
        let mut report = error.format_for_console(self.use_color);

        if let Some(source) = std::error::Error::source(error) {
            report.push_str(&format!("\nCaused by: {}", source));
        }

        if self.verbose {
            report.push_str("\n\n");
            report.push_str(&error.user_friendly_message());

            if error.is_recoverable() {
                let hint = "This error might be temporary. You can try running the command again.";
                report.push_str("\n\n");
                if self.use_color {
                    use colored::Colorize;
                    report.push_str(&hint.green().to_string());
                } else {
                    report.push_str(hint);
                }
            }
        }

        report
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}
