//! Graceful shutdown handling
//!
//! Handles SIGTERM and SIGINT signals for clean shutdown:
//! - Marks the pod not ready and stops the expiry collector
//! - Stops accepting new connections
//! - Waits for in-flight requests, bounded by a drain deadline
//!
//! The coordinator moves through `WaitingForSignal -> Draining -> Stopped`
//! exactly once per process.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::health::ReadinessState;
use super::{ServerError, ServerHandle};

/// Default deadline for draining in-flight requests
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shutdown signal receiver
///
/// Cloned and handed to every component that must stop on shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    pub fn shutdown(&self) {
        // send_replace never fails, even with no receivers left
        self.sender.send_replace(true);
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Wait for SIGTERM or SIGINT signal
///
/// Returns the name of the signal that was received.
///
/// # Panics
/// Panics if signal handlers cannot be registered (OS resource exhaustion).
#[cfg(unix)]
pub async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to register SIGTERM handler");
            panic!("Cannot register SIGTERM handler: {}", e);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to register SIGINT handler");
            panic!("Cannot register SIGINT handler: {}", e);
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Wait for Ctrl+C signal (Windows)
///
/// # Panics
/// Panics if Ctrl+C handler cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to wait for Ctrl+C");
        panic!("Cannot wait for Ctrl+C: {}", e);
    }
    "CTRL_C"
}

/// Lifecycle of the shutdown coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    WaitingForSignal,
    Draining,
    Stopped,
}

/// How the HTTP server finished draining
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every in-flight request completed before the deadline
    Drained,
    /// The deadline expired and the remaining requests were cancelled
    TimedOut,
}

/// Waits for a termination signal and drains the HTTP server
pub struct ShutdownCoordinator {
    components: ShutdownController,
    readiness: ReadinessState,
    deadline: Duration,
    phase: watch::Sender<ShutdownPhase>,
}

impl ShutdownCoordinator {
    /// # Arguments
    /// * `components` - Stops background components (the expiry collector)
    /// * `readiness` - Flipped to not ready once a signal arrives
    /// * `deadline` - Upper bound on the drain of in-flight requests
    pub fn new(
        components: ShutdownController,
        readiness: ReadinessState,
        deadline: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(ShutdownPhase::WaitingForSignal);
        Self {
            components,
            readiness,
            deadline,
            phase,
        }
    }

    /// Observe phase transitions
    pub fn subscribe(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase.subscribe()
    }

    /// Block until `signal` resolves, then shut the server down gracefully
    ///
    /// A drain timeout is logged and reported as `DrainOutcome::TimedOut`
    /// rather than an error. If the server stops on its own before any
    /// signal arrives, its error is returned.
    pub async fn run<F>(
        self,
        signal: F,
        mut server: ServerHandle,
    ) -> Result<DrainOutcome, ServerError>
    where
        F: Future<Output = &'static str>,
    {
        let signal_name = tokio::select! {
            name = signal => name,
            result = server.stopped() => {
                self.phase.send_replace(ShutdownPhase::Stopped);
                self.components.shutdown();
                result?;
                warn!("HTTP server stopped without a shutdown signal");
                return Ok(DrainOutcome::Drained);
            }
        };

        info!(signal = signal_name, deadline = ?self.deadline, "Shutting down");
        self.phase.send_replace(ShutdownPhase::Draining);
        self.readiness.set_not_ready();
        self.components.shutdown();

        let outcome = match server.shutdown(self.deadline).await {
            Ok(()) => {
                info!("HTTP server drained");
                Ok(DrainOutcome::Drained)
            }
            Err(ServerError::ShutdownTimeout(deadline)) => {
                warn!(deadline = ?deadline, "Failed to drain HTTP server before deadline");
                Ok(DrainOutcome::TimedOut)
            }
            Err(e) => Err(e),
        };

        self.phase.send_replace(ShutdownPhase::Stopped);
        outcome
    }
}
