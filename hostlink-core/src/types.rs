//! Wire types exchanged between client and host
//!
//! Two documents make up the whole protocol:
//!
//! ```text
//! Request:  {"type": "<command>", "params": {...}}
//! Response: {"status": "success", "result": <any>}
//!         | {"status": "error", "message": "<text>"}
//! ```
//!
//! `params` is always an object. A request without it decodes with an empty
//! map, matching what hosts have historically accepted.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command parameters: a JSON object keyed by parameter name
pub type Params = serde_json::Map<String, Value>;

/// A command sent from the client to the host
///
/// # Examples
///
/// ```rust
/// use hostlink_core::Request;
/// use serde_json::json;
///
/// let request = Request::new("delete_object", json!({"name": "Cube"}).as_object().cloned().unwrap());
/// assert_eq!(request.command_type, "delete_object");
/// assert_eq!(request.params["name"], "Cube");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Name of the command; selects the handler on the host
    #[serde(rename = "type")]
    pub command_type: String,
    /// Handler-specific parameters
    #[serde(default)]
    pub params: Params,
}

impl Request {
    /// Create a new request
    pub fn new(command_type: impl Into<String>, params: Params) -> Self {
        Self {
            command_type: command_type.into(),
            params,
        }
    }

    /// Create a request with no parameters
    pub fn bare(command_type: impl Into<String>) -> Self {
        Self::new(command_type, Params::new())
    }
}

/// The host's answer to a single request
///
/// Serialized with an internal `status` tag so the wire shape is exactly
/// `{"status": "success", "result": ...}` or
/// `{"status": "error", "message": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// The handler ran and returned a value
    Success {
        #[serde(default)]
        result: Value,
    },
    /// The command failed; `message` is meant for humans
    Error { message: String },
}

impl Response {
    /// Build a success response
    pub fn success(result: Value) -> Self {
        Response::Success { result }
    }

    /// Build an error response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Error response for a command type with no enabled handler
    pub fn unknown_command(command_type: &str) -> Self {
        Response::error(Error::UnknownCommand(command_type.to_string()).to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// Short status label used in logs and metrics
    pub fn status(&self) -> &'static str {
        match self {
            Response::Success { .. } => "success",
            Response::Error { .. } => "error",
        }
    }

    /// Convert into the handler's result, or `Error::Remote` with the host's message
    pub fn into_result(self) -> Result<Value> {
        match self {
            Response::Success { result } => Ok(result),
            Response::Error { message } => Err(Error::Remote(message)),
        }
    }
}
