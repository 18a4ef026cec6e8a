//! Persisting trial runs to JSON or CSV and loading them back

pub mod csv;

use crate::{
    error::{AppError, Result},
    models::{MetricSample, Trial, TrialRun},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Parse a user-supplied format name (case-insensitive)
    pub fn parse(format: &str) -> Result<Self> {
        match format.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(AppError::unsupported_format(format!(
                "'{}' is not a supported format (expected json or csv)",
                other
            ))),
        }
    }

    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Self::parse(ext),
            None => Err(AppError::unsupported_format(format!(
                "cannot infer a format for '{}' without an extension (use --format)",
                path.display()
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One trial as stored in JSON files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrialRecord {
    test_number: u32,
    download_speed: f64,
    upload_speed: f64,
    ping_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jitter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    packet_loss: Option<f64>,
}

impl From<&Trial> for TrialRecord {
    fn from(trial: &Trial) -> Self {
        let sample = &trial.sample;
        Self {
            test_number: trial.test_number,
            download_speed: sample.download_speed,
            upload_speed: sample.upload_speed,
            ping_time: sample.ping_time,
            latency: sample.latency,
            jitter: sample.jitter,
            packet_loss: sample.packet_loss,
        }
    }
}

impl From<TrialRecord> for Trial {
    fn from(record: TrialRecord) -> Self {
        Trial::new(
            record.test_number,
            MetricSample {
                download_speed: record.download_speed,
                upload_speed: record.upload_speed,
                ping_time: record.ping_time,
                latency: record.latency,
                jitter: record.jitter,
                packet_loss: record.packet_loss,
            },
        )
    }
}

/// Parallel-array layout written by earlier versions of the tool
#[derive(Debug, Deserialize)]
struct LegacyResults {
    download_speeds: Vec<f64>,
    upload_speeds: Vec<f64>,
    ping_times: Vec<f64>,
}

impl LegacyResults {
    fn into_run(self) -> Result<TrialRun> {
        let count = self.download_speeds.len();
        if self.upload_speeds.len() != count || self.ping_times.len() != count {
            return Err(AppError::malformed_file(format!(
                "result lists differ in length ({} downloads, {} uploads, {} pings)",
                count,
                self.upload_speeds.len(),
                self.ping_times.len()
            )));
        }

        let samples = self.download_speeds
            .into_iter()
            .zip(self.upload_speeds)
            .zip(self.ping_times)
            .map(|((download, upload), ping)| MetricSample::new(download, upload, ping));
        TrialRun::from_samples(samples)
    }
}

/// Write every trial of `run` to `destination`
///
/// `format` is checked before the destination is opened, so an unsupported
/// format leaves the file system untouched.
pub fn export<P: AsRef<Path>>(run: &TrialRun, destination: P, format: &str) -> Result<()> {
    let format = ExportFormat::parse(format)?;
    export_as(run, destination, format)
}

pub fn export_as<P: AsRef<Path>>(run: &TrialRun, destination: P, format: ExportFormat) -> Result<()> {
    let path = destination.as_ref();
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create {}: {}", path.display(), e)))?;

    let mut writer = BufWriter::new(file);
    export_to_writer(run, &mut writer, format)?;
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to write {}: {}", path.display(), e)))
}

/// Serialize `run` into any writer
pub fn export_to_writer<W: Write>(run: &TrialRun, writer: &mut W, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Json => {
            let records: Vec<TrialRecord> = run.iter().map(TrialRecord::from).collect();
            serde_json::to_writer_pretty(&mut *writer, &records)?;
            writeln!(writer)?;
        }
        ExportFormat::Csv => csv::write_csv(run, writer)?,
    }
    Ok(())
}

/// Load a file written by [`export`]
pub fn load<P: AsRef<Path>>(source: P, format: &str) -> Result<TrialRun> {
    let format = ExportFormat::parse(format)?;
    load_as(source, format)
}

/// Load a file, inferring its format from the extension
pub fn load_path<P: AsRef<Path>>(source: P) -> Result<TrialRun> {
    let format = ExportFormat::from_path(source.as_ref())?;
    load_as(source, format)
}

pub fn load_as<P: AsRef<Path>>(source: P, format: ExportFormat) -> Result<TrialRun> {
    let path = source.as_ref();
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open {}: {}", path.display(), e)))?;

    load_from_reader(BufReader::new(file), format).map_err(|e| match e {
        AppError::MalformedFile(msg) => AppError::malformed_file(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

pub fn load_from_reader<R: Read>(mut reader: R, format: ExportFormat) -> Result<TrialRun> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => AppError::malformed_file("file is not valid UTF-8"),
            _ => AppError::from(e),
        })?;

    match format {
        ExportFormat::Json => parse_json(&content),
        ExportFormat::Csv => csv::parse_csv(&content),
    }
}

fn parse_json(content: &str) -> Result<TrialRun> {
    let document: serde_json::Value = serde_json::from_str(content)?;

    let run = match document {
        serde_json::Value::Array(_) => {
            let records: Vec<TrialRecord> = serde_json::from_value(document)?;
            TrialRun::from_trials(records.into_iter().map(Trial::from).collect())
        }
        serde_json::Value::Object(_) => {
            let legacy: LegacyResults = serde_json::from_value(document)?;
            legacy.into_run()
        }
        _ => return Err(AppError::malformed_file("expected an array of trials")),
    };

    run.map_err(|e| match e {
        AppError::Validation(msg) => AppError::malformed_file(msg),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn example_run() -> TrialRun {
        TrialRun::from_samples(vec![
            MetricSample::new(50.12, 10.03, 12.5),
            MetricSample::new(48.90, 9.87, 14.0),
        ])
        .unwrap()
    }

    fn detailed_run() -> TrialRun {
        TrialRun::from_samples(vec![
            MetricSample::new(0.1 + 0.2, 1.0 / 3.0, 12.345678901234567)
                .with_latency(15.000000000000002)
                .with_jitter(2.2250738585072014e-308)
                .with_packet_loss(0.0),
            MetricSample::new(93.42187500000001, 1e-7, 7.0)
                .with_latency(9.25)
                .with_jitter(0.5)
                .with_packet_loss(20.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(ExportFormat::parse("json").unwrap(), ExportFormat::Json);
        assert_eq!(" CSV ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(ExportFormat::parse("xml"), Err(AppError::UnsupportedFormat(_))));
        assert!(matches!(ExportFormat::parse(""), Err(AppError::UnsupportedFormat(_))));

        assert_eq!(ExportFormat::from_path(Path::new("out/results.json")).unwrap(), ExportFormat::Json);
        assert!(ExportFormat::from_path(Path::new("results")).is_err());
        assert!(ExportFormat::from_path(Path::new("results.xml")).is_err());
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let run = detailed_run();

        export(&run, &path, "json").unwrap();
        let loaded = load(&path, "json").unwrap();

        assert_eq!(loaded, run);
        for (a, b) in loaded.samples().zip(run.samples()) {
            assert_eq!(a.download_speed.to_bits(), b.download_speed.to_bits());
            assert_eq!(a.jitter.map(f64::to_bits), b.jitter.map(f64::to_bits));
        }
    }

    #[test]
    fn test_json_layout() {
        let mut buffer = Vec::new();
        export_to_writer(&example_run(), &mut buffer, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        for key in ["test_number", "download_speed", "upload_speed", "ping_time"] {
            assert!(records[0].get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(records[1]["test_number"], 2);
        assert_eq!(records[1]["ping_time"], 14.0);
    }

    #[test]
    fn test_csv_has_one_line_per_trial_plus_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let run = example_run();

        export(&run, &path, "csv").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert_eq!(content.lines().count(), run.len() + 1);
        assert!(content.starts_with("Download Speed (Mbit/s),Upload Speed (Mbit/s),Ping Time (ms),Test Number"));
        assert_eq!(load_path(&path).unwrap(), run);
    }

    #[test]
    fn test_csv_round_trip_with_optional_metrics() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detailed.csv");
        let run = detailed_run();

        export_as(&run, &path, ExportFormat::Csv).unwrap();
        assert_eq!(load(&path, "csv").unwrap(), run);
    }

    #[test]
    fn test_unsupported_format_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.xml");

        let result = export(&example_run(), &path, "xml");

        assert!(matches!(result, Err(AppError::UnsupportedFormat(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_unwritable_destination_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("results.json");

        let result = export(&example_run(), &path, "json");
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_empty_run_exports() {
        let mut buffer = Vec::new();
        export_to_writer(&TrialRun::new(), &mut buffer, ExportFormat::Json).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().trim(), "[]");
        assert!(parse_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = load(dir.path().join("nope.json"), "json");
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_legacy_layout_loads() {
        let legacy = r#"{"download_speeds": [49.5, 51.25], "upload_speeds": [9.75, 10.5], "ping_times": [14.0, 13.0]}"#;
        let run = parse_json(legacy).unwrap();

        assert_eq!(run.len(), 2);
        assert_eq!(run.trials()[0].test_number, 1);
        assert_eq!(run.trials()[1].sample, MetricSample::new(51.25, 10.5, 13.0));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let cases = [
            "",
            "not json",
            "42",
            r#"[{"test_number": 1, "download_speed": 1.0, "upload_speed": 1.0}]"#,
            r#"[{"test_number": 1, "download_speed": 1.0, "upload_speed": 1.0, "ping_time": 1.0, "color": "red"}]"#,
            r#"[{"test_number": 1, "download_speed": -1.0, "upload_speed": 1.0, "ping_time": 1.0}]"#,
            r#"[{"test_number": 1, "download_speed": 1.0, "upload_speed": 1.0, "ping_time": 1.0, "packet_loss": 101.0}]"#,
            r#"[{"test_number": 1, "download_speed": 1.0, "upload_speed": 1.0, "ping_time": 1.0},
                {"test_number": 1, "download_speed": 1.0, "upload_speed": 1.0, "ping_time": 1.0}]"#,
            r#"{"download_speeds": [1.0, 2.0], "upload_speeds": [1.0], "ping_times": [1.0, 2.0]}"#,
            r#"{"download_speeds": [1.0]}"#,
        ];

        for case in cases {
            assert!(
                matches!(parse_json(case), Err(AppError::MalformedFile(_))),
                "expected MalformedFile for {}",
                case
            );
        }
    }

    #[test]
    fn test_load_reports_path_of_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();

        match load_path(&path) {
            Err(AppError::MalformedFile(msg)) => assert!(msg.contains("broken.json")),
            other => panic!("expected MalformedFile, got {:?}", other),
        }
    }
}
