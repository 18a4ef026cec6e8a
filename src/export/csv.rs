//! CSV layout of a trial run
//!
//! Header row, then one row per trial. The metric columns come first and
//! `Test Number` is appended last, so the leading three columns match the
//! plain download/upload/ping layout. Floats use Rust's shortest round-trip
//! formatting so a reloaded file reproduces the values exactly.

use crate::{
    error::{AppError, Result},
    models::{MetricSample, Trial, TrialRun},
    types::Metric,
};
use std::io::Write;

pub const TEST_NUMBER_COLUMN: &str = "Test Number";

/// Column header of a metric
pub fn column_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Download => "Download Speed (Mbit/s)",
        Metric::Upload => "Upload Speed (Mbit/s)",
        Metric::Ping => "Ping Time (ms)",
        Metric::Latency => "Latency (ms)",
        Metric::Jitter => "Jitter (ms)",
        Metric::PacketLoss => "Packet Loss (%)",
    }
}

fn metric_for_column(name: &str) -> Option<Metric> {
    Metric::ALL.iter().copied().find(|&m| column_name(m) == name)
}

/// Metrics written as columns, in column order
fn columns(run: &TrialRun) -> Vec<Metric> {
    let mut metrics: Vec<Metric> = Metric::ALL.iter().copied().filter(Metric::is_required).collect();
    metrics.extend(run.optional_metrics_seen());
    metrics
}

pub fn write_csv<W: Write>(run: &TrialRun, writer: &mut W) -> Result<()> {
    let columns = columns(run);

    let mut header: Vec<&str> = columns.iter().map(|&m| column_name(m)).collect();
    header.push(TEST_NUMBER_COLUMN);
    writeln!(writer, "{}", header.join(","))?;

    for trial in run {
        let mut row: Vec<String> = columns
            .iter()
            .map(|&m| trial.sample.get(m).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        row.push(trial.test_number.to_string());
        writeln!(writer, "{}", row.join(","))?;
    }

    Ok(())
}

/// Parse a CSV document written by [`write_csv`]
///
/// Files without a `Test Number` column (the older three-column layout) are
/// numbered 1..n in row order.
pub fn parse_csv(content: &str) -> Result<TrialRun> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return Err(AppError::malformed_file("CSV file is empty"));
    };
    let layout = Layout::from_header(header_line)?;

    let mut trials = Vec::new();
    for (index, line) in lines {
        let line_number = index + 1;
        let cells: Vec<&str> = split_row(line);
        if cells.len() != layout.width() {
            return Err(AppError::malformed_file(format!(
                "line {}: expected {} fields, found {}",
                line_number,
                layout.width(),
                cells.len()
            )));
        }

        let test_number = match layout.test_number {
            Some(column) => cells[column].parse::<u32>().map_err(|e| {
                AppError::malformed_file(format!("line {}: invalid test number '{}': {}", line_number, cells[column], e))
            })?,
            None => trials.len() as u32 + 1,
        };

        let mut sample = MetricSample::new(0.0, 0.0, 0.0);
        for &(column, metric) in &layout.metrics {
            let cell = cells[column];
            if cell.is_empty() {
                if metric.is_required() {
                    return Err(AppError::malformed_file(format!(
                        "line {}: missing {}",
                        line_number,
                        column_name(metric)
                    )));
                }
                continue;
            }

            let value: f64 = cell.parse().map_err(|e| {
                AppError::malformed_file(format!("line {}: invalid {} '{}': {}", line_number, column_name(metric), cell, e))
            })?;
            set_metric(&mut sample, metric, value);
        }

        trials.push(Trial::new(test_number, sample));
    }

    TrialRun::from_trials(trials).map_err(|e| AppError::malformed_file(e.to_string()))
}

fn set_metric(sample: &mut MetricSample, metric: Metric, value: f64) {
    match metric {
        Metric::Download => sample.download_speed = value,
        Metric::Upload => sample.upload_speed = value,
        Metric::Ping => sample.ping_time = value,
        Metric::Latency => sample.latency = Some(value),
        Metric::Jitter => sample.jitter = Some(value),
        Metric::PacketLoss => sample.packet_loss = Some(value),
    }
}

/// Split a row on commas, trimming whitespace and surrounding quotes
fn split_row(line: &str) -> Vec<&str> {
    line.split(',')
        .map(|cell| {
            let cell = cell.trim();
            cell.strip_prefix('"')
                .and_then(|c| c.strip_suffix('"'))
                .unwrap_or(cell)
        })
        .collect()
}

/// Column positions resolved from the header row
struct Layout {
    test_number: Option<usize>,
    metrics: Vec<(usize, Metric)>,
}

impl Layout {
    fn from_header(line: &str) -> Result<Self> {
        let mut test_number = None;
        let mut metrics: Vec<(usize, Metric)> = Vec::new();

        for (column, name) in split_row(line).into_iter().enumerate() {
            if name == TEST_NUMBER_COLUMN {
                if test_number.replace(column).is_some() {
                    return Err(AppError::malformed_file("duplicate 'Test Number' column"));
                }
                continue;
            }

            let metric = metric_for_column(name)
                .ok_or_else(|| AppError::malformed_file(format!("unknown CSV column '{}'", name)))?;
            if metrics.iter().any(|&(_, m)| m == metric) {
                return Err(AppError::malformed_file(format!("duplicate column '{}'", name)));
            }
            metrics.push((column, metric));
        }

        for metric in Metric::ALL.iter().copied().filter(Metric::is_required) {
            if !metrics.iter().any(|&(_, m)| m == metric) {
                return Err(AppError::malformed_file(format!(
                    "missing required column '{}'",
                    column_name(metric)
                )));
            }
        }

        Ok(Self { test_number, metrics })
    }

    fn width(&self) -> usize {
        self.metrics.len() + usize::from(self.test_number.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(run: &TrialRun) -> String {
        let mut buffer = Vec::new();
        write_csv(run, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_write_required_columns() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(50.12, 10.03, 12.5),
            MetricSample::new(48.9, 9.87, 14.0),
        ])
        .unwrap();

        assert_eq!(
            render(&run),
            "Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms),Test Number\n\
             50.12,10.03,12.5,1\n\
             48.9,9.87,14,2\n"
        );
    }

    #[test]
    fn test_optional_columns_leave_gaps() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(1.0, 2.0, 3.0).with_jitter(0.25),
            MetricSample::new(1.5, 2.5, 3.5),
        ])
        .unwrap();

        let text = render(&run);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms),Jitter (ms),Test Number");
        assert_eq!(lines[1], "1,2,3,0.25,1");
        assert_eq!(lines[2], "1.5,2.5,3.5,,2");

        assert_eq!(parse_csv(&text).unwrap(), run);
    }

    #[test]
    fn test_parse_three_column_layout() {
        let text = "Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms)\r\n\
                    49.51,10.0,13.25\r\n\
                    \r\n\
                    \"50\",11,12\r\n";
        let run = parse_csv(text).unwrap();
        assert_eq!(run.len(), 2);
        assert_eq!(run.trials()[1].test_number, 2);
        assert_eq!(run.trials()[1].sample, MetricSample::new(50.0, 11.0, 12.0));
    }

    #[test]
    fn test_parse_rejects_malformed_content() {
        let header = "Test Number,Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms)";
        let cases = [
            String::new(),
            "Download Speed (Mbit/s),Ping Time (ms)\n1,2\n".to_string(),
            "Test Number,Bandwidth\n1,2\n".to_string(),
            format!("{}\n1,2,3\n", header),
            format!("{}\n1,fast,3,4\n", header),
            format!("{}\n1,-2,3,4\n", header),
            format!("{}\n2,1,1,1\n1,1,1,1\n", header),
            format!("{}\nfirst,1,1,1\n", header),
            format!("{}\n1,,1,1\n", header),
        ];

        for case in &cases {
            assert!(
                matches!(parse_csv(case), Err(AppError::MalformedFile(_))),
                "expected MalformedFile for {:?}",
                case
            );
        }
    }

    #[test]
    fn test_leading_columns_are_download_upload_ping() {
        let run = TrialRun::from_trials(vec![
            Trial::new(4, MetricSample::new(50.12, 10.03, 12.5)),
            Trial::new(9, MetricSample::new(48.9, 9.87, 14.0)),
        ])
        .unwrap();
        let text = render(&run);

        for line in text.lines().skip(1) {
            let cells: Vec<&str> = line.split(',').collect();
            let download: f64 = cells[0].parse().unwrap();
            assert!(download > 48.0 && download < 51.0);
        }
        assert!(text.lines().nth(2).unwrap().ends_with(",9"));

        // Test Number may sit in any column when reading
        let reordered = "Test Number,Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms)\n\
                         4,50.12,10.03,12.5\n\
                         9,48.9,9.87,14\n";
        assert_eq!(parse_csv(reordered).unwrap(), run);
        assert_eq!(parse_csv(&text).unwrap(), run);
    }

    #[test]
    fn test_header_only_is_empty_run() {
        let run = parse_csv("Test Number,Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms)\n").unwrap();
        assert!(run.is_empty());
    }
}
