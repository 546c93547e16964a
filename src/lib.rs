//! hostlink - JSON command bridge for non-blocking host applications
//!
//! This is the convenience crate that re-exports the hostlink sub-crates.
//! Use it when one process needs both sides of the bridge, or when you want a
//! single dependency.
//!
//! # Architecture
//!
//! - **hostlink-core**: wire types, JSON framing, errors, configuration, observability
//! - **hostlink-server**: the polling server a host application steps from its timer
//! - **hostlink-client**: the async client that sends commands to a host
//! - **hostlink-macros**: the `#[handler]` attribute
//!
//! # Quick Start - Host
//!
//! ```rust,no_run
//! use hostlink::server::from_typed_fn;
//! use hostlink::{run_blocking, PollingServer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct RenameParams { name: String, new_name: String }
//!
//! #[derive(Serialize)]
//! struct Renamed { name: String }
//!
//! fn main() -> hostlink::Result<()> {
//!     let mut server = PollingServer::builder()
//!         .bind_str("127.0.0.1:9876")?
//!         .handler("rename_object", from_typed_fn(|p: RenameParams| {
//!             anyhow::ensure!(!p.new_name.is_empty(), "New name is empty");
//!             Ok(Renamed { name: p.new_name })
//!         }))
//!         .build()?;
//!
//!     run_blocking(&mut server);
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Client
//!
//! ```rust,no_run
//! use hostlink::ClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = ClientBuilder::new("localhost", 9876).build()?;
//!
//!     let info = conn.send_command("get_scene_info", Default::default()).await?;
//!     println!("Scene: {}", info);
//!
//!     Ok(())
//! }
//! ```

pub use hostlink_client as client;
pub use hostlink_core as core;
pub use hostlink_macros as macros;
pub use hostlink_server as server;

pub use hostlink_client::{ClientBuilder, ConnectionManager, HostSession};
pub use hostlink_core::{BridgeConfig, Error, Params, Request, Response, Result};
pub use hostlink_macros::handler;
pub use hostlink_server::{run, run_blocking, PollingServer, StepOutcome, StopHandle};
