//! Core wire types, framing and configuration for hostlink
//!
//! hostlink bridges an automation client and an interactive host application
//! whose execution loop must never block. This crate holds the pieces both
//! sides share:
//!
//! - **Types**: the `Request` and `Response` documents exchanged on the wire
//! - **Codec**: JSON encoding/decoding and the `FrameAssembler` that decides
//!   message boundaries by JSON-parseability
//! - **Error handling**: the `Error` enum used across the workspace
//! - **Config**: `BridgeConfig` with defaults, validation and env overrides
//! - **Observability**: tracing subscriber and OpenTelemetry setup
//!
//! # Wire format
//!
//! Every message is a single UTF-8 JSON object. There is no length prefix and
//! no delimiter: a message is complete when the bytes received so far parse as
//! a whole JSON document. This forbids pipelining; a peer must wait for the
//! response to one request before writing the next.
//!
//! # Example
//!
//! ```rust
//! use hostlink_core::{codec, Frame, FrameAssembler, Request};
//!
//! let request = Request::new("get_scene_info", serde_json::Map::new());
//! let bytes = codec::encode_request(&request).unwrap();
//!
//! let mut assembler = FrameAssembler::new();
//! let (head, tail) = bytes.split_at(5);
//! assert!(matches!(assembler.feed(head).unwrap(), Frame::Incomplete));
//! match assembler.feed(tail).unwrap() {
//!     Frame::Message(value) => assert_eq!(value["type"], "get_scene_info"),
//!     Frame::Incomplete => unreachable!(),
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod observability;
pub mod types;

pub use codec::{Frame, FrameAssembler};
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{Params, Request, Response};
