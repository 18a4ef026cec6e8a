//! Metric samples and trial run data models

use crate::error::{AppError, Result};
use crate::types::Metric;
use serde::{Deserialize, Serialize};

/// Measured values from a single trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Download speed (Mbit/s)
    pub download_speed: f64,

    /// Upload speed (Mbit/s)
    pub upload_speed: f64,

    /// Ping time (ms)
    pub ping_time: f64,

    /// Mean round-trip latency (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,

    /// Mean variation between consecutive round trips (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,

    /// Share of lost probes (percent, 0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_loss: Option<f64>,
}

impl MetricSample {
    /// Create a sample with the three always-present metrics
    pub fn new(download_speed: f64, upload_speed: f64, ping_time: f64) -> Self {
        Self {
            download_speed,
            upload_speed,
            ping_time,
            latency: None,
            jitter: None,
            packet_loss: None,
        }
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency = Some(latency_ms);
        self
    }

    pub fn with_jitter(mut self, jitter_ms: f64) -> Self {
        self.jitter = Some(jitter_ms);
        self
    }

    pub fn with_packet_loss(mut self, loss_percent: f64) -> Self {
        self.packet_loss = Some(loss_percent);
        self
    }

    /// Value of a metric, `None` if it was not collected
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Download => Some(self.download_speed),
            Metric::Upload => Some(self.upload_speed),
            Metric::Ping => Some(self.ping_time),
            Metric::Latency => self.latency,
            Metric::Jitter => self.jitter,
            Metric::PacketLoss => self.packet_loss,
        }
    }

    /// Reject non-finite, negative, or out-of-range values
    pub fn validate(&self) -> Result<()> {
        for metric in Metric::ALL {
            let Some(value) = self.get(metric) else {
                continue;
            };

            if !value.is_finite() {
                return Err(AppError::validation(format!("{} is not a finite number: {}", metric, value)));
            }
            if value < 0.0 {
                return Err(AppError::validation(format!("{} cannot be negative: {}", metric, value)));
            }
            if metric == Metric::PacketLoss && value > 100.0 {
                return Err(AppError::validation(format!("packet loss cannot exceed 100%: {}", value)));
            }
        }

        Ok(())
    }
}

/// A sample tagged with its 1-based position in the requested sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub test_number: u32,
    pub sample: MetricSample,
}

impl Trial {
    pub fn new(test_number: u32, sample: MetricSample) -> Self {
        Self { test_number, sample }
    }
}

/// Ordered sequence of completed trials
///
/// Only the collector appends; once handed out a run is read-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialRun {
    trials: Vec<Trial>,
}

impl TrialRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a run from already-complete trials
    ///
    /// Test numbers must be positive and strictly increasing.
    pub fn from_trials(trials: Vec<Trial>) -> Result<Self> {
        let mut previous = 0u32;
        for trial in &trials {
            if trial.test_number <= previous {
                return Err(AppError::validation(format!(
                    "test numbers must be positive and strictly increasing (got {} after {})",
                    trial.test_number, previous
                )));
            }
            trial.sample.validate()?;
            previous = trial.test_number;
        }

        Ok(Self { trials })
    }

    /// Build a run numbering the samples 1..=n
    pub fn from_samples<I>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = MetricSample>,
    {
        let trials = samples
            .into_iter()
            .enumerate()
            .map(|(i, sample)| Trial::new(i as u32 + 1, sample))
            .collect();
        Self::from_trials(trials)
    }

    pub(crate) fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter()
    }

    /// Samples in trial order
    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.trials.iter().map(|t| &t.sample)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Values of one metric in trial order, `None` unless every sample has it
    pub fn values(&self, metric: Metric) -> Option<Vec<f64>> {
        self.samples().map(|s| s.get(metric)).collect()
    }

    /// Metrics present in every sample (empty for an empty run)
    pub fn common_metrics(&self) -> Vec<Metric> {
        if self.is_empty() {
            return Vec::new();
        }
        Metric::ALL
            .iter()
            .copied()
            .filter(|&m| self.samples().all(|s| s.get(m).is_some()))
            .collect()
    }

    /// Optional metrics present in at least one sample
    pub fn optional_metrics_seen(&self) -> Vec<Metric> {
        Metric::ALL
            .iter()
            .copied()
            .filter(|m| !m.is_required())
            .filter(|&m| self.samples().any(|s| s.get(m).is_some()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a TrialRun {
    type Item = &'a Trial;
    type IntoIter = std::slice::Iter<'a, Trial>;

    fn into_iter(self) -> Self::IntoIter {
        self.trials.iter()
    }
}

/// A trial that produced no sample under best-effort collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTrial {
    pub test_number: u32,
    pub reason: String,
}
