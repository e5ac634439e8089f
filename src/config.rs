//! Command line and environment configuration
//!
//! Every flag can also be set through an environment variable so the
//! sidecar can be configured from a Pod spec without changing `args`.

use crate::collector::DEFAULT_COLLECT_INTERVAL;
use crate::server::shutdown::DEFAULT_SHUTDOWN_TIMEOUT;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Default file: the service account CA mounted into every pod
pub const DEFAULT_CA_CERT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Serve a CA certificate over HTTP and export its expiry as a metric
#[derive(Debug, Clone, Parser)]
#[command(name = "kube-ca-server", version)]
pub struct Config {
    /// Port to serve on
    #[arg(short = 'p', long, env = "CA_SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// The static file to host
    #[arg(short = 'f', long, env = "CA_SERVER_FILE", default_value = DEFAULT_CA_CERT_PATH)]
    pub file: PathBuf,

    /// Seconds between certificate expiry collections
    #[arg(
        long,
        env = "CA_SERVER_COLLECT_INTERVAL_SECS",
        default_value_t = DEFAULT_COLLECT_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub collect_interval_secs: u64,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(
        long,
        env = "CA_SERVER_SHUTDOWN_TIMEOUT_SECS",
        default_value_t = DEFAULT_SHUTDOWN_TIMEOUT.as_secs()
    )]
    pub shutdown_timeout_secs: u64,
}

impl Config {
    pub fn collect_interval(&self) -> Duration {
        Duration::from_secs(self.collect_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
