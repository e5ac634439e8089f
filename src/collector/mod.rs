//! Periodic certificate expiry collector
//!
//! Runs once at startup and then on a fixed interval. Every cycle re-reads
//! the certificate file and publishes its `NotAfter` to the expiry gauge.
//! Failures are logged and leave the previous gauge value in place.

pub mod cert;

pub use cert::{parse_expiry, read_expiry, CertError};

use crate::server::{SharedMetrics, ShutdownSignal};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default interval between collections
pub const DEFAULT_COLLECT_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Publishes the expiry of the certificate at `path` to `metrics`
pub struct ExpiryCollector {
    path: PathBuf,
    metrics: SharedMetrics,
    interval: Duration,
}

impl ExpiryCollector {
    pub fn new(path: PathBuf, metrics: SharedMetrics, interval: Duration) -> Self {
        Self {
            path,
            metrics,
            interval,
        }
    }

    /// Run a single collection cycle
    ///
    /// On success the gauge is updated; on failure it is left stale.
    pub async fn collect(&self) -> Result<DateTime<Utc>, CertError> {
        match read_expiry(&self.path).await {
            Ok(expiry) => {
                self.metrics.set_expiry(expiry);
                debug!(
                    path = %self.path.display(),
                    expiry = %expiry,
                    "Updated certificate expiry"
                );
                Ok(expiry)
            }
            Err(e) => {
                self.metrics.record_collection_error();
                Err(e)
            }
        }
    }

    /// Collect immediately, then every interval until `shutdown` fires
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            path = %self.path.display(),
            interval = ?self.interval,
            "Starting certificate expiry collector"
        );

        loop {
            tokio::select! {
                // The first tick completes immediately
                _ = ticker.tick() => {
                    if let Err(e) = self.collect().await {
                        warn!(
                            path = %self.path.display(),
                            error = %e,
                            "Error getting certificate expiry"
                        );
                    }
                }
                _ = shutdown.wait() => {
                    info!("Certificate expiry collector stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
