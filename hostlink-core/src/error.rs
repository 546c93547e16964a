//! Error types for hostlink
//!
//! A single `Error` enum covers every failure that can occur on either side of
//! the bridge. The variants line up with the protocol's error taxonomy:
//!
//! - **Transport**: `Transport`, `NotConnected`, `ClosedBeforeData`, `Timeout`
//! - **Framing**: `Framing` (server side), `IncompleteResponse` (client side)
//! - **Protocol**: a parsed document that is not a well-formed request/response
//! - **Handler**: `Handler`, `UnknownCommand`, and `Remote` for failures
//!   reported back by the host
//!
//! Only handler and unknown-command failures ever travel over the wire (as a
//! `status: "error"` response). Everything else stays local to the side that
//! observed it and is visible to the peer only as connection teardown.

use thiserror::Error;

/// Result type for hostlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for hostlink operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Socket-level failure while connecting, accepting, reading or writing
    #[error("Transport error: {0}")]
    Transport(String),

    /// The client could not (re)establish its connection
    ///
    /// Raised by `send_command` when the lazy connect attempt fails.
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// The peer closed the connection before sending a single response byte
    #[error("Connection closed before receiving any data")]
    ClosedBeforeData,

    /// Some response bytes arrived but never formed a complete JSON document
    #[error("Incomplete JSON response received")]
    IncompleteResponse,

    /// The server's receive buffer outgrew the framing window without parsing
    #[error("Framing error: {0}")]
    Framing(String),

    /// A complete JSON document that is not a valid request or response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A handler failed while executing a command
    #[error("Handler error: {0}")]
    Handler(String),

    /// No handler is registered (or enabled) for the command type
    #[error("Unknown command type: {0}")]
    UnknownCommand(String),

    /// The host answered with `status: "error"`
    ///
    /// Holds the host's message verbatim so callers can show it as-is.
    #[error("{0}")]
    Remote(String),

    /// No complete response arrived within the receive timeout
    #[error("Timeout waiting for host response")]
    Timeout,

    /// Serialization or deserialization of a Rust value failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the client must drop its socket after this error
    ///
    /// Transport faults, timeouts and broken responses leave the stream in an
    /// unknown state. A `Remote` error is a well-formed answer, so the
    /// connection stays usable.
    pub fn invalidates_connection(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::ClosedBeforeData
                | Error::IncompleteResponse
                | Error::Timeout
                | Error::Protocol(_)
        )
    }

    /// Stable label for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::NotConnected(_) => "not_connected",
            Error::ClosedBeforeData => "closed_before_data",
            Error::IncompleteResponse => "incomplete_response",
            Error::Framing(_) => "framing",
            Error::Protocol(_) => "protocol",
            Error::Handler(_) => "handler",
            Error::UnknownCommand(_) => "unknown_command",
            Error::Remote(_) => "remote",
            Error::Timeout => "timeout",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error: Error = io_error.into();

        match error {
            Error::Transport(msg) => assert_eq!(msg, "reset by peer"),
            _ => panic!("Expected Transport error"),
        }
    }

    #[test]
    fn test_error_from_serde() {
        let serde_error = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err();
        let error: Error = serde_error.into();
        assert!(matches!(error, Error::Serialization(msg) if !msg.is_empty()));
    }

    #[test]
    fn test_unknown_command_display() {
        let error = Error::UnknownCommand("nonexistent".into());
        assert_eq!(error.to_string(), "Unknown command type: nonexistent");
    }

    #[test]
    fn test_remote_error_display_is_verbatim() {
        let error = Error::Remote("Object not found: Cube".into());
        assert_eq!(error.to_string(), "Object not found: Cube");
    }

    #[test]
    fn test_client_error_messages() {
        assert_eq!(
            Error::ClosedBeforeData.to_string(),
            "Connection closed before receiving any data"
        );
        assert_eq!(
            Error::IncompleteResponse.to_string(),
            "Incomplete JSON response received"
        );
    }

    #[test]
    fn test_invalidates_connection() {
        assert!(Error::Transport("broken pipe".into()).invalidates_connection());
        assert!(Error::ClosedBeforeData.invalidates_connection());
        assert!(Error::IncompleteResponse.invalidates_connection());
        assert!(Error::Timeout.invalidates_connection());

        assert!(!Error::Remote("boom".into()).invalidates_connection());
        assert!(!Error::Serialization("bad".into()).invalidates_connection());
        assert!(!Error::NotConnected("refused".into()).invalidates_connection());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::Framing("too big".into()).kind(), "framing");
        assert_eq!(Error::Timeout.kind(), "timeout");
        assert_eq!(Error::UnknownCommand("x".into()).kind(), "unknown_command");
    }
}
