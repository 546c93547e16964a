//! Client connection to a hostlink host
//!
//! [`ConnectionManager`] owns one outbound TCP socket and carries one request
//! at a time over it. It connects lazily, and after any transport fault it
//! drops the socket so the next command starts from a fresh connection.
//! There are no retries within a single call.
//!
//! # Receiving
//!
//! The host writes one JSON document per response with no framing, so the
//! manager keeps reading chunks and retries the parse after each one. The
//! whole exchange is bounded by the response timeout:
//!
//! | what happened | result |
//! |---|---|
//! | a chunk completes the document | the decoded response |
//! | peer closed, nothing received | `Error::ClosedBeforeData` |
//! | peer closed, partial data | `Error::IncompleteResponse` |
//! | timeout, nothing received | `Error::Timeout` |
//! | timeout, partial data | `Error::IncompleteResponse` |
//! | socket error | `Error::Transport` |

use crate::connection_state::ConnectionState;
use crate::metrics::ClientMetrics;
use hostlink_core::{codec, BridgeConfig, Error, Params, Request, Response, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Single-socket command client
///
/// One request is in flight at a time; every operation takes `&mut self`.
/// Wrap the manager in a mutex to share it between tasks.
///
/// # Examples
///
/// ```rust,no_run
/// use hostlink_client::ConnectionManager;
/// use hostlink_core::BridgeConfig;
/// use serde_json::json;
///
/// # async fn example() -> hostlink_core::Result<()> {
/// let mut conn = ConnectionManager::new(BridgeConfig::default());
///
/// let info = conn.send_command("get_scene_info", Default::default()).await?;
/// println!("{}", info);
///
/// let params = json!({"name": "Cube"}).as_object().cloned().unwrap_or_default();
/// conn.send_command("delete_object", params).await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager {
    config: BridgeConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
    connections_opened: u64,
    metrics: Option<Arc<ClientMetrics>>,
}

impl ConnectionManager {
    /// Create a disconnected manager; nothing is opened until first use
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            stream: None,
            state: ConnectionState::Disconnected,
            connections_opened: 0,
            metrics: None,
        }
    }

    pub(crate) fn with_metrics(mut self, metrics: Option<Arc<ClientMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the connection if it is not already open
    ///
    /// Returns `true` when connected afterwards. Failures are logged, never
    /// returned.
    pub async fn connect(&mut self) -> bool {
        match self.ensure_connected().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(addr = %self.config.address(), error = %e, "Failed to connect to host");
                false
            }
        }
    }

    /// Drop the socket; the next command reconnects
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!(addr = %self.config.address(), "Disconnected from host");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Send one command and wait for its response
    ///
    /// # Errors
    ///
    /// - `NotConnected` if the lazy connect fails
    /// - `Transport`, `ClosedBeforeData`, `IncompleteResponse`, `Timeout` or
    ///   `Protocol` for a failed exchange; the connection is dropped first
    /// - `Remote` when the host answers `status: "error"`; the connection is
    ///   kept
    #[tracing::instrument(skip(self, params), fields(command = %command_type))]
    pub async fn send_command(&mut self, command_type: &str, params: Params) -> Result<Value> {
        if let Err(e) = self.ensure_connected().await {
            tracing::error!(error = %e, "Not connected to host");
            self.record_error(&e);
            return Err(Error::NotConnected(e.to_string()));
        }

        let start = Instant::now();
        let request = Request::new(command_type, params);
        let outcome = self.exchange(&request).await;
        let elapsed = start.elapsed().as_secs_f64();

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                if e.invalidates_connection() {
                    tracing::warn!(error = %e, kind = e.kind(), "Exchange failed, dropping connection");
                    self.disconnect();
                } else {
                    tracing::warn!(error = %e, kind = e.kind(), "Exchange failed");
                }
                self.record_error(&e);
                if let Some(ref m) = self.metrics {
                    m.record_request(command_type, "failed", elapsed);
                }
                return Err(e);
            }
        };

        if let Some(ref m) = self.metrics {
            m.record_request(command_type, response.status(), elapsed);
        }

        let result = response.into_result();
        match result {
            Ok(_) => tracing::debug!(elapsed_secs = elapsed, "Command succeeded"),
            Err(ref e) => tracing::warn!(message = %e, "Host reported an error"),
        }
        result
    }

    /// Send a command with typed parameters and result
    ///
    /// # Errors
    ///
    /// As [`send_command`](Self::send_command), plus `Serialization` when
    /// `params` is not a JSON object or the result does not match `R`.
    pub async fn send_typed<P, R>(&mut self, command_type: &str, params: &P) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let params = match serde_json::to_value(params)? {
            Value::Object(map) => map,
            Value::Null => Params::new(),
            other => {
                return Err(Error::Serialization(format!(
                    "Command parameters must be a JSON object, got {}",
                    other
                )))
            }
        };
        let result = self.send_command(command_type, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let addr = self.config.address();
        self.set_state(ConnectionState::Connecting);

        let connected = tokio::time::timeout(self.config.response_timeout, TcpStream::connect(&addr)).await;
        let stream = match connected {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e.into());
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(Error::Timeout);
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Could not disable Nagle's algorithm");
        }

        if self.connections_opened > 0 {
            if let Some(ref m) = self.metrics {
                m.record_reconnection();
            }
        }
        self.connections_opened += 1;
        self.stream = Some(stream);
        self.set_state(ConnectionState::Connected);

        tracing::info!(addr = %addr, "Connected to host");
        Ok(())
    }

    async fn exchange(&mut self, request: &Request) -> Result<Response> {
        let bytes = codec::encode_request(request)?;
        let timeout = self.config.response_timeout;
        let chunk_size = self.config.read_chunk_size;

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::NotConnected("connection was closed".to_string()))?;

        stream.write_all(&bytes).await?;
        tracing::trace!(bytes = bytes.len(), "Request sent");

        receive_response(stream, timeout, chunk_size).await
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        if let Some(ref m) = self.metrics {
            m.update_connection_state(state.as_gauge());
        }
    }

    fn record_error(&self, error: &Error) {
        if let Some(ref m) = self.metrics {
            m.record_error(error.kind());
        }
    }
}

/// Read until the accumulated bytes parse as one JSON document
async fn receive_response(
    stream: &mut TcpStream,
    timeout: std::time::Duration,
    chunk_size: usize,
) -> Result<Response> {
    let deadline = Instant::now() + timeout;
    let mut received: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; chunk_size];

    loop {
        match tokio::time::timeout_at(deadline, stream.read(&mut chunk)).await {
            Ok(Ok(0)) => {
                if received.is_empty() {
                    return Err(Error::ClosedBeforeData);
                }
                tracing::debug!(bytes = received.len(), "Host closed mid-response");
                break;
            }
            Ok(Ok(n)) => {
                received.extend_from_slice(&chunk[..n]);
                if let Ok(value) = serde_json::from_slice::<Value>(&received) {
                    tracing::trace!(bytes = received.len(), "Response complete");
                    return codec::decode_response_value(value);
                }
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                if received.is_empty() {
                    return Err(Error::Timeout);
                }
                tracing::debug!(bytes = received.len(), "Timed out mid-response");
                break;
            }
        }
    }

    codec::decode_response(&received)
}
