//! Colored formatter implementation with terminal color support
//!
//! Layout is delegated to [`PlainFormatter`]; this formatter only adds ANSI
//! colors, so column widths are computed on uncolored text.

use crate::{
    error::Result,
    executor::{CollectionAborted, CollectionOutcome},
    models::{SkippedTrial, Trial, TrialRun},
    provider::SpeedServer,
    stats::SummaryReport,
    types::Metric,
};
use super::formatter::{sample_lines, summary_rows, summary_table_format, FormattingOptions, OutputFormatter, PlainFormatter};
use colored::*;

/// Quality classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl PerformanceLevel {
    /// Classify a throughput in Mbit/s
    pub fn from_speed(mbits: f64) -> Self {
        if mbits >= 100.0 {
            Self::Excellent
        } else if mbits >= 25.0 {
            Self::Good
        } else if mbits >= 10.0 {
            Self::Fair
        } else if mbits >= 2.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Classify a round-trip time in milliseconds
    pub fn from_ping(ms: f64) -> Self {
        if ms < 20.0 {
            Self::Excellent
        } else if ms < 50.0 {
            Self::Good
        } else if ms < 100.0 {
            Self::Fair
        } else if ms < 300.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Get color for this performance level
    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }

    /// Get descriptive text
    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            highlight: Color::Magenta,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Apply bold formatting if colors are enabled
    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    /// Apply dimmed formatting if colors are enabled
    fn dimmed(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.dimmed()
        } else {
            text.normal()
        }
    }

    /// Bold and colored if colors are enabled
    fn emphasize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color).bold()
        } else {
            text.normal()
        }
    }

    /// Format a metric value colored by its quality level
    fn format_metric_colored(&self, metric: Metric, value: f64) -> ColoredString {
        let formatted = metric.format_value(value);
        let level = match metric {
            Metric::Download | Metric::Upload => Some(PerformanceLevel::from_speed(value)),
            Metric::Ping | Metric::Latency => Some(PerformanceLevel::from_ping(value)),
            Metric::Jitter | Metric::PacketLoss => None,
        };
        match level {
            Some(level) => self.colorize(&formatted, level.color()),
            None => self.colorize(&formatted, self.color_scheme.info),
        }
    }

    /// Color border lines and the header row of a rendered plain table
    fn colorize_table(&self, table: &str, bordered: bool) -> String {
        let header_index = if bordered { 1 } else { 0 };
        table
            .lines()
            .enumerate()
            .map(|(idx, line)| {
                if bordered && line.starts_with('+') {
                    self.colorize(line, self.color_scheme.border).to_string()
                } else if idx == header_index {
                    self.bold(line).to_string()
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "=".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.header),
            self.emphasize(title, self.color_scheme.header),
            self.colorize(&border, self.color_scheme.header),
        ))
    }

    fn format_server(&self, server: &SpeedServer) -> Result<String> {
        let mut output = format!(
            "{} {}",
            self.colorize("Found:", self.color_scheme.info),
            self.bold(&server.to_string())
        );
        if self.options.verbose_mode {
            let rtt = format!("({:.2} ms median round trip)", server.median_rtt_ms);
            output.push(' ');
            output.push_str(&self.dimmed(&rtt).to_string());
        }
        Ok(output)
    }

    fn format_trial(&self, trial: &Trial, trial_count: u32) -> Result<String> {
        let sample = &trial.sample;
        let mut output = format!(
            "{} download {}, upload {}, ping {}",
            self.bold(&format!("Test {}/{}:", trial.test_number, trial_count)),
            self.format_metric_colored(Metric::Download, sample.download_speed),
            self.format_metric_colored(Metric::Upload, sample.upload_speed),
            self.format_metric_colored(Metric::Ping, sample.ping_time),
        );

        if self.options.verbose_mode {
            for metric in [Metric::Latency, Metric::Jitter, Metric::PacketLoss] {
                if let Some(value) = sample.get(metric) {
                    output.push_str(&format!(", {} {}", metric.label(), self.format_metric_colored(metric, value)));
                }
            }
        }

        Ok(output)
    }

    fn format_skipped(&self, skipped: &SkippedTrial) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize(&format!("Test {} skipped:", skipped.test_number), self.color_scheme.warning),
            self.dimmed(&skipped.reason)
        ))
    }

    fn format_summary_table(&self, report: &SummaryReport) -> Result<String> {
        let bordered = self.options.table_borders;
        let table = self.plain_formatter.create_table(&summary_table_format(bordered), &summary_rows(report));
        Ok(self.colorize_table(&table, bordered))
    }

    fn format_history(&self, run: &TrialRun) -> Result<String> {
        let blocks: Vec<String> = run
            .iter()
            .map(|trial| {
                let mut block = self.bold(&format!("Test {}", trial.test_number)).to_string();
                for line in sample_lines(trial) {
                    block.push('\n');
                    block.push_str(&line);
                }
                block
            })
            .collect();
        Ok(blocks.join("\n\n"))
    }

    fn format_outcome(&self, outcome: &CollectionOutcome) -> Result<String> {
        let text = self.plain_formatter.format_outcome(outcome)?;
        let color = if outcome.is_complete() {
            self.color_scheme.success
        } else {
            self.color_scheme.warning
        };
        Ok(self.colorize(&text, color).to_string())
    }

    fn format_aborted(&self, aborted: &CollectionAborted) -> Result<String> {
        Ok(format!(
            "{} {}\n{}",
            self.colorize("✗", self.color_scheme.error),
            self.emphasize(&format!("Test {} failed: {}", aborted.trial_number, aborted.error), self.color_scheme.error),
            self.dimmed(&format!(
                "{} trial(s) completed before the failure; nothing was exported",
                aborted.partial_run.len()
            ))
        ))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize("✗", self.color_scheme.error),
            self.colorize(error, self.color_scheme.error)
        ))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize("⚠", self.color_scheme.warning),
            self.colorize(warning, self.color_scheme.warning)
        ))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize("✓", self.color_scheme.success),
            self.colorize(message, self.color_scheme.success)
        ))
    }
}
