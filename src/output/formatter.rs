//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, Result},
    executor::{CollectionAborted, CollectionOutcome},
    models::{SkippedTrial, Trial, TrialRun},
    provider::SpeedServer,
    stats::{MetricSummary, SummaryReport},
    types::Metric,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the selected speed-test server
    fn format_server(&self, server: &SpeedServer) -> Result<String>;

    /// Format one completed trial as it comes in
    fn format_trial(&self, trial: &Trial, trial_count: u32) -> Result<String>;

    /// Format a trial skipped under best-effort collection
    fn format_skipped(&self, skipped: &SkippedTrial) -> Result<String>;

    /// Format the summary statistics table
    fn format_summary_table(&self, report: &SummaryReport) -> Result<String>;

    /// Format every trial of a run
    fn format_history(&self, run: &TrialRun) -> Result<String>;

    /// Format how a finished collection went
    fn format_outcome(&self, outcome: &CollectionOutcome) -> Result<String>;

    /// Format a fail-fast abort
    fn format_aborted(&self, aborted: &CollectionAborted) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with detailed information
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Maximum output width
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Show borders around table
    pub show_borders: bool,
    /// Show header row
    pub show_header: bool,
    /// Minimum column width
    pub min_column_width: usize,
    /// Maximum column width
    pub max_column_width: usize,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    /// Column header
    pub header: String,
    /// Column alignment
    pub alignment: Alignment,
    /// Minimum width
    pub min_width: usize,
    /// Maximum width
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width: header.len(),
            max_width: 60,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Two-column Metric/Value layout of the summary table
pub fn summary_table_format(show_borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::new("Metric", Alignment::Left),
            Column::new("Value", Alignment::Right),
        ],
        show_borders,
        show_header: true,
        min_column_width: 5,
        max_column_width: 60,
    }
}

/// Rows of the summary table
///
/// Per metric: average, median, standard deviation, maximum, minimum; the
/// ping mode follows its metric's rows.
pub fn summary_rows(report: &SummaryReport) -> Vec<RowData> {
    let mut rows = Vec::with_capacity(report.metrics.len() * 6);
    for summary in &report.metrics {
        rows.extend(metric_rows(summary));
    }
    rows
}

fn metric_rows(summary: &MetricSummary) -> Vec<RowData> {
    let metric = summary.metric;
    let label = metric.label();
    let std_dev = summary
        .std_dev
        .map(|sd| metric.format_value(sd))
        .unwrap_or_else(|| "undefined".to_string());

    let mut rows = vec![
        vec![format!("Average {}", label), metric.format_value(summary.mean)],
        vec![format!("Median {}", label), metric.format_value(summary.median)],
        vec![format!("Standard deviation of {}", label), std_dev],
        vec![format!("Maximum {}", label), metric.format_value(summary.max)],
        vec![format!("Minimum {}", label), metric.format_value(summary.min)],
    ];

    if let Some(mode) = summary.mode {
        let value = metric.format_value(mode.value);
        let value = if mode.tied { format!("{} (tie)", value) } else { value };
        rows.push(vec![format!("Mode of {}", label), value]);
    }

    rows
}

/// Plain "Download speed: 49.51 Mbit/s" lines of one sample
pub(crate) fn sample_lines(trial: &Trial) -> Vec<String> {
    Metric::ALL
        .iter()
        .filter_map(|&metric| {
            trial.sample.get(metric).map(|value| {
                let label = metric.label();
                let mut chars = label.chars();
                let capitalized = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                };
                format!("{}: {}", capitalized, metric.format_value(value))
            })
        })
        .collect()
}

fn fmt_error(what: &str) -> impl Fn(std::fmt::Error) -> AppError + '_ {
    move |e| AppError::internal(format!("Failed to format {}: {}", what, e))
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Create a table with the given format and data
    pub fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let column_widths = self.calculate_column_widths(format, rows);

        let mut output = String::new();

        // Header
        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        // Data rows
        for row in rows {
            output.push_str(&self.create_row(row, &column_widths, format));
            output.push('\n');
        }

        // Bottom border
        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&column_widths));
        }

        output.trim_end_matches('\n').to_string()
    }

    /// Calculate optimal column widths
    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        let num_columns = format.columns.len().max(
            rows.iter().map(|r| r.len()).max().unwrap_or(0)
        );

        (0..num_columns)
            .map(|col_idx| {
                let column = format.columns.get(col_idx);
                let mut width = match column {
                    Some(col) => col.min_width.max(col.header.chars().count()),
                    None => format.min_column_width,
                };

                // Find maximum content width in this column
                for row in rows {
                    if let Some(cell) = row.get(col_idx) {
                        width = width.max(cell.chars().count());
                    }
                }

                // Apply column constraints
                width.min(column.map_or(format.max_column_width, |c| c.max_width))
            })
            .collect()
    }

    /// Create a table row
    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format.columns.get(idx).map_or(&Alignment::Left, |c| &c.alignment);
            let padded_cell = self.align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&padded_cell);
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    /// Create horizontal border for table
    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    /// Align text within specified width
    fn align_text(&self, text: &str, width: usize, alignment: &Alignment) -> String {
        let len = text.chars().count();
        if len >= width {
            return text.chars().take(width).collect();
        }

        let padding = width - len;
        match alignment {
            Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
            Alignment::Right => format!("{}{}", " ".repeat(padding), text),
            Alignment::Center => {
                let left_pad = padding / 2;
                let right_pad = padding - left_pad;
                format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
            }
        }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.chars().count() + 4);

        writeln!(output, "{}", border).map_err(fmt_error("header"))?;
        writeln!(output, "  {}  ", title).map_err(fmt_error("header"))?;
        write!(output, "{}", border).map_err(fmt_error("header"))?;

        Ok(output)
    }

    fn format_server(&self, server: &SpeedServer) -> Result<String> {
        let mut output = format!("Found: {}", server);
        if self.options.verbose_mode {
            write!(output, " ({:.2} ms median round trip)", server.median_rtt_ms)
                .map_err(fmt_error("server"))?;
        }
        Ok(output)
    }

    fn format_trial(&self, trial: &Trial, trial_count: u32) -> Result<String> {
        let sample = &trial.sample;
        let mut output = format!(
            "Test {}/{}: download {}, upload {}, ping {}",
            trial.test_number,
            trial_count,
            Metric::Download.format_value(sample.download_speed),
            Metric::Upload.format_value(sample.upload_speed),
            Metric::Ping.format_value(sample.ping_time),
        );

        if self.options.verbose_mode {
            for metric in [Metric::Latency, Metric::Jitter, Metric::PacketLoss] {
                if let Some(value) = sample.get(metric) {
                    write!(output, ", {} {}", metric.label(), metric.format_value(value))
                        .map_err(fmt_error("trial"))?;
                }
            }
        }

        Ok(output)
    }

    fn format_skipped(&self, skipped: &SkippedTrial) -> Result<String> {
        Ok(format!("Test {} skipped: {}", skipped.test_number, skipped.reason))
    }

    fn format_summary_table(&self, report: &SummaryReport) -> Result<String> {
        let format = summary_table_format(self.options.table_borders);
        Ok(self.create_table(&format, &summary_rows(report)))
    }

    fn format_history(&self, run: &TrialRun) -> Result<String> {
        let mut output = String::new();

        for (idx, trial) in run.iter().enumerate() {
            if idx > 0 {
                output.push('\n');
            }
            writeln!(output, "Test {}", trial.test_number).map_err(fmt_error("history"))?;
            for line in sample_lines(trial) {
                writeln!(output, "{}", line).map_err(fmt_error("history"))?;
            }
        }

        Ok(output.trim_end().to_string())
    }

    fn format_outcome(&self, outcome: &CollectionOutcome) -> Result<String> {
        let mut output = format!(
            "Completed {} of {} trials",
            outcome.run.len(),
            outcome.requested
        );

        if !outcome.skipped.is_empty() {
            let numbers: Vec<String> = outcome.skipped.iter().map(|s| s.test_number.to_string()).collect();
            write!(output, " ({} skipped: {})", outcome.skip_count(), numbers.join(", "))
                .map_err(fmt_error("outcome"))?;
        }

        Ok(output)
    }

    fn format_aborted(&self, aborted: &CollectionAborted) -> Result<String> {
        Ok(format!(
            "ERROR: Test {} failed: {}\n{} trial(s) completed before the failure; nothing was exported",
            aborted.trial_number,
            aborted.error,
            aborted.partial_run.len()
        ))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
