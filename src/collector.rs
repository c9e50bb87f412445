//! Prometheus collector that polls the upstream on every scrape.
//!
//! Each scrape runs one pull-translate-emit cycle: probe `/healthz`, fetch
//! and decode `/stats`, then publish all six gauge values together. Failure
//! handling is asymmetric on purpose: a non-2xx health probe is a report
//! *from* the upstream and is emitted as explicit zeros, while transport,
//! body-read, and decode failures mean the scrape itself broke, so the cycle
//! emits nothing and the aggregator sees a gap instead of a fabricated zero.

use std::time::Duration;

use anyhow::Result;
use prometheus::core::{Collector, Desc};
use prometheus::{proto, Gauge, GaugeVec, Opts};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::warn;

use crate::types::ServerSnapshot;

/// Label values of the `cpu_load` family, in emission order.
pub const LOAD_BUCKETS: [&str; 3] = ["1m", "5m", "15m"];

/// Everything that can go wrong inside one scrape cycle. Only `Unhealthy`
/// produces emitted metrics (all zeros); the other variants are fail-silent.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream reported unhealthy: {0}")]
    Unhealthy(StatusCode),
    #[error("failed to read stats body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to decode stats payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Owns the six live gauges and the upstream connection details. Registered
/// once at startup; the registry drives `collect` on every scrape.
pub struct UpstreamCollector {
    base_url: String,
    client: Client,

    health: Gauge,
    load: GaugeVec,
    memory_total: Gauge,
    memory_used: Gauge,
}

impl UpstreamCollector {
    pub fn new(namespace: &str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let health = Gauge::with_opts(
            Opts::new("health", "health of the upstream server").namespace(namespace),
        )?;
        let load = GaugeVec::new(
            Opts::new("cpu_load", "CPU load average with 1m, 5m, and 15m buckets")
                .namespace(namespace),
            &["bucket"],
        )?;
        let memory_total = Gauge::with_opts(
            Opts::new("memory_bytes_total", "total memory in bytes").namespace(namespace),
        )?;
        let memory_used = Gauge::with_opts(
            Opts::new("memory_bytes_used", "used memory in bytes").namespace(namespace),
        )?;

        // Instantiate the labelled children up front so every emission,
        // including a degraded one on the first cycle, carries all six series.
        for bucket in LOAD_BUCKETS {
            load.with_label_values(&[bucket]);
        }

        // Client-level timeout is the primary defense against a hung
        // upstream; the aggregator's scrape timeout is only a backstop.
        let client = Client::builder().timeout(timeout).build()?;

        let base_url: String = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            health,
            load,
            memory_total,
            memory_used,
        })
    }

    /// One best-effort pull against the upstream. No retries here: the
    /// aggregator's periodic re-scrape is the retry mechanism.
    fn scrape(&self) -> Result<ServerSnapshot, ScrapeError> {
        let health = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .map_err(ScrapeError::Transport)?;
        let status = health.status();
        if !status.is_success() {
            return Err(ScrapeError::Unhealthy(status));
        }

        // Stats are only consulted after a healthy probe. A non-2xx error
        // page here fails JSON decoding and lands on the silent path.
        let stats = self
            .client
            .get(format!("{}/stats", self.base_url))
            .send()
            .map_err(ScrapeError::Transport)?;
        let body = stats.text().map_err(ScrapeError::Body)?;
        serde_json::from_str(&body).map_err(ScrapeError::Decode)
    }

    /// Values pass through untouched: no unit conversion, no clamping.
    fn publish(&self, snapshot: &ServerSnapshot) {
        self.health.set(1.0);
        self.load
            .with_label_values(&["1m"])
            .set(snapshot.cpu.load_1m);
        self.load
            .with_label_values(&["5m"])
            .set(snapshot.cpu.load_5m);
        self.load
            .with_label_values(&["15m"])
            .set(snapshot.cpu.load_15m);
        self.memory_total.set(snapshot.memory.total_bytes as f64);
        self.memory_used.set(snapshot.memory.used_bytes as f64);
    }

    /// Degraded-state contract: zero is a meaningful reported value here,
    /// not an absence, and all six series carry it together.
    fn publish_degraded(&self) {
        self.health.set(0.0);
        for bucket in LOAD_BUCKETS {
            self.load.with_label_values(&[bucket]).set(0.0);
        }
        self.memory_total.set(0.0);
        self.memory_used.set(0.0);
    }

    fn families(&self) -> Vec<proto::MetricFamily> {
        let mut families = self.health.collect();
        families.extend(self.load.collect());
        families.extend(self.memory_total.collect());
        families.extend(self.memory_used.collect());
        families
    }
}

impl Collector for UpstreamCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.health.desc();
        descs.extend(self.load.desc());
        descs.extend(self.memory_total.desc());
        descs.extend(self.memory_used.desc());
        descs
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        match self.scrape() {
            Ok(snapshot) => {
                self.publish(&snapshot);
                self.families()
            }
            Err(ScrapeError::Unhealthy(status)) => {
                warn!(%status, "upstream reported unhealthy, emitting zeroed metrics");
                self.publish_degraded();
                self.families()
            }
            Err(err) => {
                // Scrape-side failure: the aggregator should see a gap in
                // the series, not a zero that looks like a measurement.
                warn!(error = %err, "skipping emission for this scrape cycle");
                Vec::new()
            }
        }
    }
}
