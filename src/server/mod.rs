//! HTTP server for the served file, health and metrics endpoints
//!
//! - `/` - The configured file, re-read on every request
//! - `/healthz` - Liveness probe (process is running)
//! - `/readyz` - Readiness probe (listener bound, not shutting down)
//! - `/metrics` - Prometheus metrics in text format
//!
//! Any other path falls through to the file handler.
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

mod files;
mod health;
pub mod metrics;
pub mod shutdown;
mod sniff;

pub use health::ReadinessState;
pub use metrics::{create_metrics, Metrics, SharedMetrics};
pub use shutdown::{
    shutdown_channel, wait_for_signal, DrainOutcome, ShutdownController, ShutdownCoordinator,
    ShutdownPhase, ShutdownSignal,
};

use crate::clock::Clock;
use axum::{
    extract::{Request, State},
    http::{header::CONNECTION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// How long cancelled handlers get to unwind after a drain timeout
const ABORT_GRACE: Duration = Duration::from_secs(1);

/// Errors from the HTTP server lifecycle
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[from] std::io::Error),

    #[error("In-flight requests did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

/// State shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    file: Arc<PathBuf>,
    clock: Arc<dyn Clock>,
    readiness: ReadinessState,
    metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        file: PathBuf,
        clock: Arc<dyn Clock>,
        readiness: ReadinessState,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            file: Arc::new(file),
            clock,
            readiness,
            metrics,
        }
    }
}

/// Build the router for the file, health and metrics endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(files::serve_file))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .fallback(files::serve_file)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind a listener on all interfaces
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    bind_addr(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Bind a listener on a specific address
pub async fn bind_addr(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Lifecycle of a running HTTP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Running,
    ShuttingDown,
    Stopped,
}

/// Handle to an HTTP server running in a background task
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: ShutdownController,
    abort: CancellationToken,
    phase: watch::Sender<ServerPhase>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Drop the handler of every in-flight request once `abort` is cancelled
async fn cancel_on_abort(
    State(abort): State<CancellationToken>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        _ = abort.cancelled() => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(CONNECTION, "close")],
            "Server shutting down\n",
        )
            .into_response(),
    }
}

/// Start serving `router` on an already bound listener
pub fn spawn(listener: TcpListener, router: Router) -> Result<ServerHandle, ServerError> {
    let local_addr = listener.local_addr()?;
    let (shutdown, mut signal) = shutdown_channel();
    let abort = CancellationToken::new();
    let (phase, _) = watch::channel(ServerPhase::Running);

    let router = router.layer(middleware::from_fn_with_state(
        abort.clone(),
        cancel_on_abort,
    ));

    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.wait().await })
            .await
    });

    info!(addr = %local_addr, "HTTP server listening");

    Ok(ServerHandle {
        local_addr,
        shutdown,
        abort,
        phase,
        task,
    })
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn phase(&self) -> ServerPhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions
    pub fn subscribe(&self) -> watch::Receiver<ServerPhase> {
        self.phase.subscribe()
    }

    /// Wait until the server task exits without being asked to
    pub async fn stopped(&mut self) -> Result<(), ServerError> {
        let result = (&mut self.task).await;
        self.phase.send_replace(ServerPhase::Stopped);
        flatten(result)
    }

    /// Stop accepting connections and wait for in-flight requests
    ///
    /// Returns `ServerError::ShutdownTimeout` if requests are still running
    /// after `deadline`. Their handlers are then cancelled, each answered
    /// with 503 and a closed connection, before the phase becomes `Stopped`.
    pub async fn shutdown(mut self, deadline: Duration) -> Result<(), ServerError> {
        self.phase.send_replace(ServerPhase::ShuttingDown);
        self.shutdown.shutdown();

        if let Ok(joined) = tokio::time::timeout(deadline, &mut self.task).await {
            self.phase.send_replace(ServerPhase::Stopped);
            return flatten(joined);
        }

        self.abort.cancel();
        if tokio::time::timeout(ABORT_GRACE, &mut self.task)
            .await
            .is_err()
        {
            warn!("HTTP server did not stop after cancelling requests");
            self.task.abort();
        }
        self.phase.send_replace(ServerPhase::Stopped);
        Err(ServerError::ShutdownTimeout(deadline))
    }
}

fn flatten(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(result) => result.map_err(ServerError::Serve),
        Err(e) => Err(ServerError::Serve(std::io::Error::other(e))),
    }
}

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "files_test.rs"]
mod files_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
