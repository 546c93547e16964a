//! Drivers that stand in for a host timer
//!
//! Inside a real host, the host's own scheduler calls
//! [`PollingServer::step`] and waits for the returned interval. These drivers
//! do the same for standalone processes, tests and demos.

use crate::{PollingServer, StepOutcome};

/// Step the server on the current thread until it stops
///
/// Sleeps the thread between steps. Stop it with a
/// [`StopHandle`](crate::StopHandle) from another thread.
pub fn run_blocking(server: &mut PollingServer) {
    tracing::info!(addr = %server.local_addr(), "Polling server running");
    loop {
        match server.step() {
            StepOutcome::Reschedule(delay) => std::thread::sleep(delay),
            StepOutcome::Stop => break,
        }
    }
}

/// Step the server from an async task until it stops
///
/// The server is not `Send`, so drive this future on the thread that owns the
/// server: `block_on`, a current-thread runtime or a `LocalSet`.
pub async fn run(server: &mut PollingServer) {
    tracing::info!(addr = %server.local_addr(), "Polling server running");
    loop {
        match server.step() {
            StepOutcome::Reschedule(delay) => tokio::time::sleep(delay).await,
            StepOutcome::Stop => break,
        }
    }
}
