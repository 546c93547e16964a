//! Async client for hostlink command hosts
//!
//! This crate talks to a `hostlink-server` running inside a host
//! application. Each command is one JSON request followed by one JSON
//! response on a plain TCP socket, with no framing beyond JSON validity.
//!
//! # Core Features
//!
//! - **Lazy connection**: the socket opens on the first command
//! - **Chunked receive**: responses of any size, bounded by one overall timeout
//! - **Fault recovery**: a broken transport is dropped and reopened on next use
//! - **Sessions**: [`HostSession`] checks a reused connection before handing it out
//! - **Observability**: `tracing` spans and optional OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hostlink_client::ClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = ClientBuilder::new("localhost", 9876).build()?;
//!
//!     let info = conn.send_command("get_scene_info", Default::default()).await?;
//!     println!("Scene: {}", info);
//!
//!     let params = json!({"name": "Cube", "location": [0.0, 0.0, 1.0]});
//!     let moved: serde_json::Value = conn.send_typed("modify_object", &params).await?;
//!     println!("Moved: {}", moved);
//!
//!     Ok(())
//! }
//! ```

mod client_builder;
mod connection;
mod connection_state;
mod metrics;
mod session;

pub use client_builder::ClientBuilder;
pub use connection::ConnectionManager;
pub use connection_state::ConnectionState;
pub use metrics::ClientMetrics;
pub use session::{HostSession, CAPABILITY_STATUS_COMMAND};

pub use hostlink_core::{BridgeConfig, Error, Params, Result};
