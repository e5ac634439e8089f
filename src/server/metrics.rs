//! Prometheus metrics for certificate expiry
//!
//! The registry is owned by `Metrics` and shared through `SharedMetrics`.
//! The collector writes to it, `/metrics` scrapes read from it; the
//! `prometheus` types are internally synchronised so no extra locking is
//! needed.

use chrono::{DateTime, Utc};
use prometheus::{Encoder, Gauge, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Name of the expiry gauge
pub const EXPIRY_METRIC_NAME: &str = "ca_cert_expiry_timestamp";

/// Name of the collection outcome counter
pub const COLLECTIONS_METRIC_NAME: &str = "ca_cert_collections_total";

/// Content type of the Prometheus text exposition format
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub type SharedMetrics = Arc<Metrics>;

/// Metric registry holding the expiry gauge
pub struct Metrics {
    registry: Registry,
    expiry: Gauge,
    collections: IntCounterVec,
}

impl Metrics {
    /// Create and register all metrics
    ///
    /// Fails if a metric name is registered twice.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let expiry = Gauge::with_opts(Opts::new(
            EXPIRY_METRIC_NAME,
            "Timestamp of CA certificate expiration in seconds since UNIX epoch",
        ))?;
        registry.register(Box::new(expiry.clone()))?;

        let collections = IntCounterVec::new(
            Opts::new(
                COLLECTIONS_METRIC_NAME,
                "Number of certificate expiry collections by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(collections.clone()))?;

        Ok(Self {
            registry,
            expiry,
            collections,
        })
    }

    /// Publish a certificate expiry (last write wins)
    pub fn set_expiry(&self, expiry: DateTime<Utc>) {
        self.expiry.set(expiry.timestamp() as f64);
        self.collections.with_label_values(&["success"]).inc();
    }

    /// Record a failed collection; the expiry gauge is left untouched
    pub fn record_collection_error(&self) {
        self.collections.with_label_values(&["error"]).inc();
    }

    /// Current value of the expiry gauge (0 until the first success)
    pub fn expiry(&self) -> f64 {
        self.expiry.get()
    }

    /// Render all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Create the shared metrics registry
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(Metrics::new()?))
}
