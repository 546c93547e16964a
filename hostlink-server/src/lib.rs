//! Non-blocking command server for interactive hosts
//!
//! This crate runs inside a host application whose own execution loop must
//! never block: a 3D editor, a game engine, a GUI with a timer callback. The
//! host calls [`PollingServer::step`] from its periodic scheduler; each step
//! makes at most one non-blocking accept and one non-blocking read, and only
//! blocks to write a response whole.
//!
//! # Core Features
//!
//! - **Single client**: one accepted connection at a time, listen backlog 1
//! - **JSON framing**: a message ends where the buffered bytes first parse
//! - **Command registry**: named handlers with per-command tier and context
//! - **Capability flag**: extended commands gated by a live host setting
//! - **Fault isolation**: handler errors and panics become error responses;
//!   transport and framing faults only drop the client
//! - **Observability**: `tracing` events and optional OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hostlink_server::{from_fn, run_blocking, PollingServer};
//! use serde_json::json;
//!
//! fn main() -> hostlink_core::Result<()> {
//!     let mut server = PollingServer::builder()
//!         .bind_str("127.0.0.1:9876")?
//!         .handler("get_scene_info", from_fn(|_| Ok(json!({"objects": 3}))))
//!         .build()?;
//!
//!     // A real host would call `server.step()` from its own timer instead.
//!     run_blocking(&mut server);
//!     Ok(())
//! }
//! ```
//!
//! # Step State Machine
//!
//! ```text
//! build() ──► Listening ──► (no client) ──accept──► Connected(buffering)
//!                 ▲                                      │
//!                 └──── peer close / transport error ◄───┘
//! stop() or StopHandle::stop() ──► Stopped (terminal; step() returns Stop)
//! ```

mod builder;
mod capability;
mod connection;
mod context;
mod dispatcher;
mod handler;
mod metrics;
mod registry;
mod scheduler;

pub use builder::ServerBuilder;
pub use capability::CapabilityFlag;
pub use context::{ContextGuard, ContextRequirement, HostContext, NoHostContext};
pub use dispatcher::{CommandDispatcher, CAPABILITY_STATUS_COMMAND};
pub use handler::{from_fn, from_typed_fn, FnHandler, Handler, HandlerResult};
pub use metrics::ServerMetrics;
pub use registry::{Command, CommandSpec, Registry, RegistryBuilder, Tier};
pub use scheduler::{run, run_blocking};

use connection::{ClientConnection, ReadOutcome};
use hostlink_core::Error;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the host scheduler should do after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Call `step` again after this delay
    Reschedule(Duration),
    /// The server has stopped; do not call `step` again
    Stop,
}

/// Stops a [`PollingServer`] from anywhere, including other threads
///
/// Clearing the flag does not touch the sockets; the server closes them on
/// its next step, which then returns [`StepOutcome::Stop`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

/// Single-client command server driven by an external periodic scheduler
///
/// Created by [`ServerBuilder::build`], which leaves it bound and running.
/// The server and its handlers stay on the thread that drives it; it is not
/// `Send`.
pub struct PollingServer {
    listener: Option<TcpListener>,
    client: Option<ClientConnection>,
    dispatcher: CommandDispatcher,
    running: Arc<AtomicBool>,
    local_addr: SocketAddr,
    poll_interval: Duration,
    read_chunk_size: usize,
    max_frame_len: usize,
    metrics: Option<Arc<ServerMetrics>>,
}

impl PollingServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Stop serving and close both sockets
    ///
    /// Idempotent. Any later `step` returns [`StepOutcome::Stop`].
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.close_sockets();
    }

    /// Run one bounded, non-blocking iteration
    ///
    /// Never fails: every fault is logged and handled here. The only blocking
    /// operation is writing a response, and the handler itself runs
    /// synchronously inside the step.
    pub fn step(&mut self) -> StepOutcome {
        if !self.is_running() {
            self.close_sockets();
            return StepOutcome::Stop;
        }

        if self.client.is_none() {
            self.accept_client();
        }

        if self.client.is_some() {
            self.service_client();
        }

        StepOutcome::Reschedule(self.poll_interval)
    }

    fn accept_client(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        match listener.accept() {
            Ok((stream, peer)) => {
                match ClientConnection::new(stream, peer, self.read_chunk_size, self.max_frame_len) {
                    Ok(conn) => {
                        tracing::info!(peer = %peer, "Client connected");
                        if let Some(ref m) = self.metrics {
                            m.record_connection(1);
                        }
                        self.client = Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(peer = %peer, error = %e, "Failed to configure client socket");
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                if let Some(ref m) = self.metrics {
                    m.record_error("transport");
                }
            }
        }
    }

    fn service_client(&mut self) {
        let Some(conn) = self.client.as_mut() else {
            return;
        };

        let request = match conn.poll_request() {
            Ok(ReadOutcome::Idle) | Ok(ReadOutcome::Pending) => return,
            Ok(ReadOutcome::Closed) => {
                tracing::info!(peer = %conn.peer(), "Client disconnected");
                self.drop_client();
                return;
            }
            Ok(ReadOutcome::Request(request)) => request,
            Err(e) => {
                self.fail_client(e);
                return;
            }
        };

        tracing::debug!(
            peer = %conn.peer(),
            command = %request.command_type,
            "Request received"
        );
        let response = self.dispatcher.dispatch_request(&request);

        if let Some(conn) = self.client.as_mut() {
            if let Err(e) = conn.send_response(&response) {
                self.fail_client(e);
            }
        }
    }

    fn fail_client(&mut self, error: Error) {
        if let Some(conn) = self.client.as_ref() {
            tracing::warn!(
                peer = %conn.peer(),
                error = %error,
                kind = error.kind(),
                "Dropping client after connection fault"
            );
        }
        if let Some(ref m) = self.metrics {
            m.record_error(error.kind());
        }
        self.drop_client();
    }

    fn drop_client(&mut self) {
        if let Some(conn) = self.client.take() {
            conn.close();
            if let Some(ref m) = self.metrics {
                m.record_disconnection(0);
            }
        }
    }

    fn close_sockets(&mut self) {
        self.drop_client();
        if self.listener.take().is_some() {
            tracing::info!(addr = %self.local_addr, "Server stopped");
        }
    }
}
