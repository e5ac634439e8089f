use clap::Parser;
use kube_ca_server::clock::SystemClock;
use kube_ca_server::collector::ExpiryCollector;
use kube_ca_server::config::Config;
use kube_ca_server::server::{
    self, build_router, create_metrics, shutdown_channel, wait_for_signal, AppState, DrainOutcome,
    ReadinessState, ShutdownCoordinator,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Registration failure is a programming error, not a runtime condition
    let metrics = create_metrics()?;
    info!("Prometheus metrics registry initialized");

    // Stops the collector once a termination signal arrives
    let (shutdown_controller, shutdown_signal) = shutdown_channel();

    let readiness = ReadinessState::new();

    let listener = match server::bind(config.port).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Error starting HTTP server");
            return Err(e.into());
        }
    };

    let state = AppState::new(
        config.file.clone(),
        Arc::new(SystemClock),
        readiness.clone(),
        metrics.clone(),
    );
    let server_handle = server::spawn(listener, build_router(state))?;
    readiness.set_ready();
    info!(
        file = %config.file.display(),
        port = config.port,
        "Serving file over HTTP"
    );

    let collector = ExpiryCollector::new(
        config.file.clone(),
        metrics.clone(),
        config.collect_interval(),
    );
    let collector_handle = tokio::spawn(collector.run(shutdown_signal));

    let coordinator =
        ShutdownCoordinator::new(shutdown_controller, readiness, config.shutdown_timeout());
    let outcome = coordinator.run(wait_for_signal(), server_handle).await;

    collector_handle.abort();

    match outcome? {
        DrainOutcome::Drained => info!("Shut down gracefully"),
        DrainOutcome::TimedOut => warn!("Shut down with requests still in flight"),
    }
    Ok(())
}
