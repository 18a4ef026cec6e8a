//! Descriptive statistics over a trial run
//!
//! The summary is a pure function of the run: it is recomputed every time it is
//! requested and never stored alongside the samples.

use crate::{
    defaults::MAX_MODE_PRECISION,
    error::{AppError, Result},
    models::metrics::TrialRun,
    types::Metric,
};
use serde::Serialize;

/// Statistics engine producing summary reports from trial runs
#[derive(Debug, Clone, Default)]
pub struct StatisticsEngine {
    config: StatisticsConfig,
}

/// Configuration for statistical calculations
#[derive(Debug, Clone, Default)]
pub struct StatisticsConfig {
    /// Round ping times to this many decimals before taking the mode.
    ///
    /// Exact float ties are rare in raw measurements, so the mode is only
    /// meaningful on discretized values.
    pub mode_precision: Option<u32>,
}

/// Most frequent value of a metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeValue {
    /// The modal value (first encountered among equally frequent values)
    pub value: f64,
    /// How many samples had this value
    pub occurrences: usize,
    /// Whether another value occurred just as often
    pub tied: bool,
}

/// Statistics for a single metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    #[serde(skip)]
    pub metric: Metric,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation, `None` (undefined) with fewer than two samples
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    /// Only computed for ping time
    pub mode: Option<ModeValue>,
}

/// Summary of every metric present in all samples of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub sample_count: usize,
    pub metrics: Vec<MetricSummary>,
}

impl SummaryReport {
    /// Look up the summary of one metric
    pub fn get(&self, metric: Metric) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

impl StatisticsEngine {
    /// Create a new statistics engine
    ///
    /// Fails when the mode precision exceeds [`MAX_MODE_PRECISION`] decimals.
    pub fn new(config: StatisticsConfig) -> Result<Self> {
        if let Some(decimals) = config.mode_precision {
            if decimals > MAX_MODE_PRECISION {
                return Err(AppError::validation(format!(
                    "Mode precision must be at most {} decimals, got {}",
                    MAX_MODE_PRECISION, decimals
                )));
            }
        }
        Ok(Self { config })
    }

    /// Create a statistics engine with default configuration
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Summarize every metric present in all samples of the run
    pub fn summarize(&self, run: &TrialRun) -> Result<SummaryReport> {
        if run.is_empty() {
            return Err(AppError::insufficient_data("cannot summarize an empty trial run"));
        }

        let mut metrics = Vec::new();
        for metric in run.common_metrics() {
            let values = run
                .values(metric)
                .ok_or_else(|| AppError::internal(format!("{} missing from a sample", metric)))?;
            metrics.push(self.summarize_metric(metric, &values)?);
        }

        Ok(SummaryReport {
            sample_count: run.len(),
            metrics,
        })
    }

    fn summarize_metric(&self, metric: Metric, values: &[f64]) -> Result<MetricSummary> {
        let mode = if metric == Metric::Ping {
            let discretized: Vec<f64> = match self.config.mode_precision {
                Some(decimals) => values.iter().map(|&v| round_to(v, decimals)).collect(),
                None => values.to_vec(),
            };
            Some(mode(&discretized)?)
        } else {
            None
        };

        Ok(MetricSummary {
            metric,
            count: values.len(),
            mean: mean(values)?,
            median: median(values)?,
            std_dev: sample_std_dev(values)?,
            min: min(values)?,
            max: max(values)?,
            mode,
        })
    }
}

/// Summarize a trial run with default settings
pub fn summarize(run: &TrialRun) -> Result<SummaryReport> {
    StatisticsEngine::with_defaults().summarize(run)
}

fn require_values(values: &[f64], what: &str) -> Result<()> {
    if values.is_empty() {
        Err(AppError::insufficient_data(format!("{} of an empty sample set", what)))
    } else {
        Ok(())
    }
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    require_values(values, "mean")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value, or the mean of the two middle values for even counts
pub fn median(values: &[f64]) -> Result<f64> {
    require_values(values, "median")?;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Sample (n - 1) standard deviation, `None` when fewer than two values
pub fn sample_std_dev(values: &[f64]) -> Result<Option<f64>> {
    require_values(values, "standard deviation")?;
    if values.len() < 2 {
        return Ok(None);
    }

    let mean = mean(values)?;
    let variance = values.iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>() / (values.len() - 1) as f64;

    Ok(Some(variance.sqrt()))
}

pub fn min(values: &[f64]) -> Result<f64> {
    require_values(values, "minimum")?;
    Ok(values.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn max(values: &[f64]) -> Result<f64> {
    require_values(values, "maximum")?;
    Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Most frequent value under exact equality; ties go to the first value seen
pub fn mode(values: &[f64]) -> Result<ModeValue> {
    require_values(values, "mode")?;

    // (value, count) in order of first appearance
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &value in values {
        // -0.0 and 0.0 count as the same value
        let value = if value == 0.0 { 0.0 } else { value };
        match counts.iter_mut().find(|(v, _)| v.to_bits() == value.to_bits()) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best = counts[0];
    for &(value, count) in &counts[1..] {
        if count > best.1 {
            best = (value, count);
        }
    }

    let tied = counts.iter().filter(|(_, count)| *count == best.1).count() > 1;

    Ok(ModeValue {
        value: best.0,
        occurrences: best.1,
        tied,
    })
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metrics::MetricSample;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn two_trial_run() -> TrialRun {
        TrialRun::from_samples(vec![
            MetricSample::new(50.12, 10.03, 12.5),
            MetricSample::new(48.90, 9.87, 14.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_two_trial_example() {
        let report = summarize(&two_trial_run()).unwrap();
        assert_eq!(report.sample_count, 2);

        let download = report.get(Metric::Download).unwrap();
        assert!(close(download.mean, 49.51));
        assert!(close(download.median, 49.51));
        assert!(close(download.min, 48.90));
        assert!(close(download.max, 50.12));
        assert!(download.mode.is_none());

        let ping = report.get(Metric::Ping).unwrap();
        assert!(close(ping.mean, 13.25));
        let mode = ping.mode.unwrap();
        assert_eq!(mode.value, 12.5);
        assert_eq!(mode.occurrences, 1);
        assert!(mode.tied);
    }

    #[test]
    fn test_single_sample_std_dev_is_undefined() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(50.0, 10.0, 12.0).with_jitter(1.0),
        ])
        .unwrap();
        let report = summarize(&run).unwrap();

        assert_eq!(report.metrics.len(), 4);
        for summary in &report.metrics {
            assert_eq!(summary.std_dev, None, "{} should be undefined", summary.metric);
        }
        let ping = report.get(Metric::Ping).unwrap();
        assert_eq!(ping.mode.unwrap().value, 12.0);
        assert!(!ping.mode.unwrap().tied);
    }

    #[test]
    fn test_empty_run_is_insufficient_data() {
        let result = summarize(&TrialRun::new());
        assert!(matches!(result, Err(AppError::InsufficientData(_))));
    }

    #[test]
    fn test_report_only_covers_metrics_in_every_sample() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(1.0, 1.0, 1.0).with_latency(5.0).with_packet_loss(0.0),
            MetricSample::new(2.0, 2.0, 2.0).with_latency(6.0),
        ])
        .unwrap();
        let report = summarize(&run).unwrap();

        assert!(report.get(Metric::Latency).is_some());
        assert!(report.get(Metric::PacketLoss).is_none());
        assert!(report.get(Metric::Jitter).is_none());
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_sample_std_dev() {
        // Sample variance of 2,4,4,4,5,5,7,9 is 32/7
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap().unwrap();
        assert!(close(sd, (32.0f64 / 7.0).sqrt()));
        assert_eq!(sample_std_dev(&[1.0]).unwrap(), None);
        assert_eq!(sample_std_dev(&[3.0, 3.0]).unwrap(), Some(0.0));
    }

    #[test]
    fn test_mode_prefers_most_frequent() {
        let mode = mode(&[14.0, 12.5, 14.0, 12.5, 14.0]).unwrap();
        assert_eq!(mode.value, 14.0);
        assert_eq!(mode.occurrences, 3);
        assert!(!mode.tied);
    }

    #[test]
    fn test_mode_ties_resolve_to_first_seen() {
        let mode = mode(&[20.0, 11.0, 11.0, 20.0]).unwrap();
        assert_eq!(mode.value, 20.0);
        assert_eq!(mode.occurrences, 2);
        assert!(mode.tied);
    }

    #[test]
    fn test_mode_precision_discretizes_ping() {
        let run = TrialRun::from_samples(vec![
            MetricSample::new(1.0, 1.0, 12.31),
            MetricSample::new(1.0, 1.0, 14.02),
            MetricSample::new(1.0, 1.0, 14.04),
        ])
        .unwrap();

        let raw = summarize(&run).unwrap();
        assert_eq!(raw.get(Metric::Ping).unwrap().mode.unwrap().value, 12.31);

        let engine = StatisticsEngine::new(StatisticsConfig { mode_precision: Some(0) }).unwrap();
        let rounded = engine.summarize(&run).unwrap();
        let mode = rounded.get(Metric::Ping).unwrap().mode.unwrap();
        assert_eq!(mode.value, 14.0);
        assert_eq!(mode.occurrences, 2);
        // Rounding only affects the mode
        assert!(close(rounded.get(Metric::Ping).unwrap().mean, raw.get(Metric::Ping).unwrap().mean));
    }

    #[test]
    fn test_excessive_mode_precision_rejected() {
        let result = StatisticsEngine::new(StatisticsConfig { mode_precision: Some(400) });
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(StatisticsEngine::new(StatisticsConfig { mode_precision: Some(MAX_MODE_PRECISION + 1) }).is_err());

        let engine = StatisticsEngine::new(StatisticsConfig { mode_precision: Some(MAX_MODE_PRECISION) }).unwrap();
        let run = TrialRun::from_samples(vec![
            MetricSample::new(1.0, 1.0, 12.5),
            MetricSample::new(1.0, 1.0, 12.5),
        ])
        .unwrap();
        let mode = engine.summarize(&run).unwrap().get(Metric::Ping).unwrap().mode.unwrap();
        assert_eq!(mode.value, 12.5);
        assert_eq!(mode.occurrences, 2);
    }

    #[test]
    fn test_helpers_reject_empty_input() {
        assert!(matches!(mean(&[]), Err(AppError::InsufficientData(_))));
        assert!(median(&[]).is_err());
        assert!(sample_std_dev(&[]).is_err());
        assert!(mode(&[]).is_err());
        assert!(min(&[]).is_err());
        assert!(max(&[]).is_err());
    }
}
