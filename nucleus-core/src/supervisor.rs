//! The server that owns a set of workers and translates OS signals into
//! orderly shutdown. Grounded on `original_source/src/spoc/workers.py`'s
//! `BaseServer` (`add`, `start`, `stop`, `force_stop`) for the supervision
//! shape, and on `r2e-core/src/builder.rs::shutdown_signal` for the
//! `tokio::signal::ctrl_c()` + SIGTERM graceful-shutdown idiom.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::worker::Worker;

/// Owns an ordered list of workers and coordinates start/stop/join across
/// them. The supervisor's own stop signal is set exactly once, either by
/// `stop()` or by an installed OS signal handler.
pub struct Supervisor {
    workers: Vec<Arc<Worker>>,
    stop_signal: Arc<AtomicBool>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Supervisor {
            workers: Vec::new(),
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn add(&mut self, worker: Arc<Worker>) {
        self.workers.push(worker);
    }

    pub fn start(&self) {
        for worker in &self.workers {
            worker.start();
        }
    }

    pub fn stop(&self) {
        for worker in &self.workers {
            worker.stop();
        }
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Joins every worker, allocating the remaining budget of `timeout`
    /// across them in order; a worker still alive after its slice is
    /// terminated by its `join` implementation.
    pub fn join_all(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        for worker in &self.workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            worker.join(remaining);
        }
    }

    /// Starts every worker, blocks until the supervisor's own stop signal is
    /// set (by `stop()` or an OS signal), then stops and joins every worker.
    /// Installs handlers for interrupt and termination so they set the stop
    /// signal exactly once.
    pub async fn run_forever(&self, join_timeout: Duration) -> Result<()> {
        self.start();

        let stop_signal = self.stop_signal.clone();
        tokio::select! {
            _ = wait_for_stop_signal(stop_signal) => {}
            _ = shutdown_signal() => {
                self.stop_signal.store(true, Ordering::SeqCst);
            }
        }

        self.stop();
        self.join_all(join_timeout);
        Ok(())
    }
}

async fn wait_for_stop_signal(flag: Arc<AtomicBool>) {
    loop {
        if flag.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

/// Resolves when the process receives SIGINT (or, on Unix, SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
