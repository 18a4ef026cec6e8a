//! Measurement providers
//!
//! The collector only sees [`MeasurementProvider`]: something that yields one
//! [`MetricSample`] per call or fails. [`HttpSpeedProvider`] is the concrete
//! implementation talking to Cloudflare-style `__down`/`__up` endpoints.

pub mod servers;


pub use servers::{ProbeStats, SpeedServer};

use crate::{
    error::{AppError, Result},
    models::{Config, MetricSample},
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header::HeaderMap, Client};
use servers::CandidateResult;
use std::time::{Duration, Instant};
use url::Url;

/// Source of one metric sample per trial
#[async_trait]
pub trait MeasurementProvider: Send {
    /// Run one measurement
    async fn measure(&mut self) -> Result<MetricSample>;

    /// Short description used in logs
    fn name(&self) -> String;
}

#[async_trait]
impl<P: MeasurementProvider + ?Sized> MeasurementProvider for Box<P> {
    async fn measure(&mut self) -> Result<MetricSample> {
        (**self).measure().await
    }

    fn name(&self) -> String {
        (**self).name()
    }
}

/// Settings of the HTTP provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub servers: Vec<String>,
    pub download_bytes: u64,
    pub upload_bytes: u64,
    pub ping_count: u32,
    pub timeout: Duration,
}

impl From<&Config> for ProviderSettings {
    fn from(config: &Config) -> Self {
        Self {
            servers: config.servers.clone(),
            download_bytes: config.download_bytes,
            upload_bytes: config.upload_bytes,
            ping_count: config.ping_count,
            timeout: config.timeout(),
        }
    }
}

/// Convert a timed transfer to Mbit/s (1 Mbit = 1024 × 1024 bits)
pub fn mbits_per_second(bytes: u64, elapsed: Duration) -> Result<f64> {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return Err(AppError::measurement("transfer finished too quickly to be timed"));
    }
    Ok(bytes as f64 * 8.0 / seconds / (1024.0 * 1024.0))
}

/// HTTP speed-test provider
pub struct HttpSpeedProvider {
    client: Client,
    settings: ProviderSettings,
    selected: Option<SpeedServer>,
}

impl HttpSpeedProvider {
    /// Create a provider with its own HTTP client
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        if settings.servers.is_empty() {
            return Err(AppError::config("At least one speed-test server is required"));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings,
            selected: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ProviderSettings::from(config))
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Server chosen by [`select_best_server`](Self::select_best_server), if any
    pub fn selected_server(&self) -> Option<&SpeedServer> {
        self.selected.as_ref()
    }

    /// Probe every candidate and keep the one with the lowest median RTT
    ///
    /// The choice is cached; later calls return it without probing again.
    pub async fn select_best_server(&mut self) -> Result<&SpeedServer> {
        if self.selected.is_none() {
            let mut candidates = Vec::with_capacity(self.settings.servers.len());
            for server in &self.settings.servers {
                let url = servers::parse_server_url(server)?;
                let (probes, headers) = self.probe(&url, self.settings.ping_count).await?;
                candidates.push(CandidateResult {
                    location: headers.as_ref().and_then(location_from_headers),
                    url,
                    probes,
                });
            }
            self.selected = Some(servers::choose_best(candidates)?);
        }

        self.selected
            .as_ref()
            .ok_or_else(|| AppError::internal("server selection produced no server"))
    }

    /// Send `count` zero-byte downloads and time each round trip
    ///
    /// Failed probes are counted, not returned as errors. The headers of the
    /// first successful probe are kept for the server location.
    async fn probe(&self, base: &Url, count: u32) -> Result<(ProbeStats, Option<HeaderMap>)> {
        let mut url = servers::endpoint(base, "__down")?;
        url.query_pairs_mut().append_pair("bytes", "0");

        let mut stats = ProbeStats::new(count);
        let mut first_headers = None;

        for _ in 0..count {
            let start = Instant::now();
            let response = match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => response,
                _ => continue,
            };
            let headers = response.headers().clone();
            if response.bytes().await.is_err() {
                continue;
            }
            stats.record(start.elapsed());
            first_headers.get_or_insert(headers);
        }

        Ok((stats, first_headers))
    }

    /// Timed download of `download_bytes`, in Mbit/s
    async fn measure_download(&self, base: &Url) -> Result<f64> {
        let mut url = servers::endpoint(base, "__down")?;
        url.query_pairs_mut().append_pair("bytes", &self.settings.download_bytes.to_string());

        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::measurement(format!(
                "download failed with HTTP status {}",
                response.status()
            )));
        }

        let mut received: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            received += chunk?.len() as u64;
        }
        let elapsed = start.elapsed();

        if received == 0 {
            return Err(AppError::measurement("download returned an empty body"));
        }
        mbits_per_second(received, elapsed)
    }

    /// Timed upload of `upload_bytes`, in Mbit/s
    async fn measure_upload(&self, base: &Url) -> Result<f64> {
        let url = servers::endpoint(base, "__up")?;
        let payload = vec![0u8; self.settings.upload_bytes as usize];

        let start = Instant::now();
        let response = self.client.post(url).body(payload).send().await?;
        if !response.status().is_success() {
            return Err(AppError::measurement(format!(
                "upload failed with HTTP status {}",
                response.status()
            )));
        }
        response.bytes().await?;

        mbits_per_second(self.settings.upload_bytes, start.elapsed())
    }
}

#[async_trait]
impl MeasurementProvider for HttpSpeedProvider {
    async fn measure(&mut self) -> Result<MetricSample> {
        let base = self.select_best_server().await?.url.clone();

        let (probes, _) = self.probe(&base, self.settings.ping_count).await?;
        let (Some(ping_time), Some(latency)) = (probes.min_rtt(), probes.mean_rtt()) else {
            return Err(AppError::measurement(format!(
                "all {} ping probes to {} failed",
                probes.sent, base
            )));
        };

        let download_speed = self.measure_download(&base).await?;
        let upload_speed = self.measure_upload(&base).await?;

        let mut sample = MetricSample::new(download_speed, upload_speed, ping_time)
            .with_latency(latency)
            .with_packet_loss(probes.packet_loss());
        if let Some(jitter) = probes.jitter() {
            sample = sample.with_jitter(jitter);
        }
        Ok(sample)
    }

    fn name(&self) -> String {
        match &self.selected {
            Some(server) => format!("http({})", server.host),
            None => format!("http({} candidates)", self.settings.servers.len()),
        }
    }
}

/// City and country from Cloudflare's `cf-meta-*` response headers
fn location_from_headers(headers: &HeaderMap) -> Option<String> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
    };

    match (read("cf-meta-city"), read("cf-meta-country")) {
        (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
        (None, Some(country)) => Some(country),
        (Some(city), None) => Some(city),
        (None, None) => read("cf-meta-colo"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_mbits_per_second_uses_binary_megabits() {
        // 128 KiB in one second is exactly 1 Mbit/s
        let speed = mbits_per_second(131_072, Duration::from_secs(1)).unwrap();
        assert_eq!(speed, 1.0);

        let speed = mbits_per_second(131_072, Duration::from_millis(500)).unwrap();
        assert_eq!(speed, 2.0);

        assert!(mbits_per_second(1, Duration::ZERO).is_err());
    }

    #[test]
    fn test_provider_requires_servers() {
        let settings = ProviderSettings {
            servers: Vec::new(),
            download_bytes: 1000,
            upload_bytes: 1000,
            ping_count: 1,
            timeout: Duration::from_secs(1),
        };
        assert!(matches!(HttpSpeedProvider::new(settings), Err(AppError::Config(_))));
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            download_bytes: 4096,
            ping_count: 3,
            timeout_seconds: 7,
            ..Default::default()
        };
        let settings = ProviderSettings::from(&config);
        assert_eq!(settings.download_bytes, 4096);
        assert_eq!(settings.ping_count, 3);
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert_eq!(settings.servers, config.servers);
    }

    #[test]
    fn test_location_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(location_from_headers(&headers), None);

        headers.insert("cf-meta-colo", HeaderValue::from_static("FRA"));
        assert_eq!(location_from_headers(&headers).as_deref(), Some("FRA"));

        headers.insert("cf-meta-country", HeaderValue::from_static("DE"));
        assert_eq!(location_from_headers(&headers).as_deref(), Some("DE"));

        headers.insert("cf-meta-city", HeaderValue::from_static("Frankfurt"));
        assert_eq!(location_from_headers(&headers).as_deref(), Some("Frankfurt, DE"));
    }

    #[test]
    fn test_name_before_selection() {
        let provider = HttpSpeedProvider::from_config(&Config::default()).unwrap();
        assert_eq!(provider.name(), "http(1 candidates)");
        assert!(provider.selected_server().is_none());
    }
}
