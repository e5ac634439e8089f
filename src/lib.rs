//! Serve a Kubernetes CA certificate over HTTP and export its expiry as a
//! Prometheus gauge.

pub mod clock;
pub mod collector;
pub mod config;
pub mod server;

#[cfg(test)]
mod testutil;
