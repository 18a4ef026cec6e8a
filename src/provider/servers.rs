//! Speed-test server candidates, latency probe statistics and best-server ranking

use crate::error::{AppError, Result};
use std::fmt;
use std::time::Duration;
use url::Url;

/// A speed-test server that answered latency probes
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedServer {
    /// Base URL the endpoints are resolved against
    pub url: Url,
    /// Host name for display
    pub host: String,
    /// Location reported by the server, if any
    pub location: Option<String>,
    /// Median round-trip time observed while ranking
    pub median_rtt_ms: f64,
}

impl fmt::Display for SpeedServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} located in {}", self.host, location),
            None => write!(f, "{}", self.host),
        }
    }
}

/// Parse a candidate base URL
pub fn parse_server_url(server: &str) -> Result<Url> {
    let url = Url::parse(server.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::config(format!(
            "Unsupported server scheme '{}' in {}",
            other, server
        ))),
    }
}

/// Resolve an endpoint name (`__down`, `__up`) against a base URL
///
/// Unlike `Url::join`, a base path without trailing slash is kept.
pub fn endpoint(base: &Url, name: &str) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("Server URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

/// Display name of a server URL
pub fn host_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => url.to_string(),
    }
}

/// Round trips of one batch of latency probes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeStats {
    /// Probes attempted
    pub sent: u32,
    /// Round-trip times of the probes that succeeded, in send order
    pub rtts_ms: Vec<f64>,
}

impl ProbeStats {
    pub fn new(sent: u32) -> Self {
        Self {
            sent,
            rtts_ms: Vec::with_capacity(sent as usize),
        }
    }

    pub fn record(&mut self, rtt: Duration) {
        self.rtts_ms.push(rtt.as_secs_f64() * 1000.0);
    }

    pub fn received(&self) -> u32 {
        self.rtts_ms.len() as u32
    }

    /// Percentage of probes that failed
    pub fn packet_loss(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        f64::from(self.sent.saturating_sub(self.received())) / f64::from(self.sent) * 100.0
    }

    pub fn min_rtt(&self) -> Option<f64> {
        self.rtts_ms.iter().copied().reduce(f64::min)
    }

    pub fn mean_rtt(&self) -> Option<f64> {
        crate::stats::mean(&self.rtts_ms).ok()
    }

    pub fn median_rtt(&self) -> Option<f64> {
        crate::stats::median(&self.rtts_ms).ok()
    }

    /// Mean absolute difference between consecutive round trips
    pub fn jitter(&self) -> Option<f64> {
        if self.rtts_ms.len() < 2 {
            return None;
        }
        let diffs: Vec<f64> = self.rtts_ms
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).abs())
            .collect();
        crate::stats::mean(&diffs).ok()
    }
}

/// Ranking result for one candidate
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub url: Url,
    pub location: Option<String>,
    pub probes: ProbeStats,
}

/// Pick the candidate with the lowest median RTT
///
/// Candidates with no successful probe are skipped; the earlier candidate
/// wins a tie.
pub fn choose_best(candidates: Vec<CandidateResult>) -> Result<SpeedServer> {
    let tried = candidates.len();
    let mut best: Option<SpeedServer> = None;

    for candidate in candidates {
        let Some(median_rtt_ms) = candidate.probes.median_rtt() else {
            continue;
        };
        if best.as_ref().map_or(true, |b| median_rtt_ms < b.median_rtt_ms) {
            best = Some(SpeedServer {
                host: host_of(&candidate.url),
                url: candidate.url,
                location: candidate.location,
                median_rtt_ms,
            });
        }
    }

    best.ok_or_else(|| {
        AppError::measurement(format!("None of the {} speed-test servers responded", tried))
    })
}
