//! Output formatting and display system
//!
//! This module provides a flexible output formatting system for trial runs,
//! supporting both colored and plain text output with table formatting.

mod formatter;
mod colored;

pub use formatter::{
    summary_rows,
    summary_table_format,
    Alignment,
    Column,
    FormattingOptions,
    OutputFormatter,
    PlainFormatter,
    RowData,
    TableFormat,
};
pub use colored::{
    ColoredFormatter,
    ColorScheme,
    PerformanceLevel,
};

use crate::stats::SummaryReport;

/// Render a summary report as a plain two-column `Metric`/`Value` table
///
/// Values are two-decimal fixed point with units; an undefined standard
/// deviation is shown as `undefined`.
pub fn render_table(report: &SummaryReport) -> String {
    let formatter = PlainFormatter::new(FormattingOptions {
        enable_color: false,
        ..Default::default()
    });
    formatter.create_table(&summary_table_format(true), &summary_rows(report))
}

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: true,
            max_width: 120,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a formatter from the application configuration
    pub fn from_config(config: &crate::models::Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.enable_color, config.verbose || config.debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricSample, TrialRun};
    use crate::stats::summarize;

    #[test]
    fn test_render_table_example_run() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(50.12, 10.03, 12.5),
            MetricSample::new(48.90, 9.87, 14.0),
        ])
        .unwrap();
        let table = render_table(&summarize(&run).unwrap());

        assert!(table.starts_with("+--"));
        assert!(table.contains("| Metric "));
        assert!(table.contains("| Average download speed "));
        assert!(table.contains(" 49.51 Mbit/s |"));
        assert!(table.contains(" 13.25 ms |"));
        assert!(table.contains("| Mode of ping time "));
        assert!(table.contains(" 12.50 ms (tie) |"));

        // Every line has the same width
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_render_table_single_sample() {
        let run = TrialRun::from_samples(vec![MetricSample::new(50.0, 10.0, 12.0)]).unwrap();
        let table = render_table(&summarize(&run).unwrap());
        assert_eq!(table.matches("undefined").count(), 3);
    }

    #[test]
    fn test_render_table_is_deterministic() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(1.0, 2.0, 3.0).with_packet_loss(2.0),
            MetricSample::new(3.0, 4.0, 5.0).with_packet_loss(0.0),
        ])
        .unwrap();
        let report = summarize(&run).unwrap();
        assert_eq!(render_table(&report), render_table(&report));
        assert!(render_table(&report).contains(" 1.00% |"));
    }

    #[test]
    fn test_factory_selects_formatter() {
        let run = TrialRun::from_samples(vec![MetricSample::new(1.0, 2.0, 3.0)]).unwrap();
        let report = summarize(&run).unwrap();

        let plain = OutputFormatterFactory::create_formatter(false, false);
        assert_eq!(plain.format_summary_table(&report).unwrap(), render_table(&report));
        assert_eq!(plain.format_error("x").unwrap(), "ERROR: x");

        let colored = OutputFormatterFactory::create_formatter(true, false);
        assert!(colored.format_error("x").unwrap().contains('x'));
    }
}
