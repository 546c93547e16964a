//! Owned host session
//!
//! A [`HostSession`] holds at most one [`ConnectionManager`] and hands it out
//! through [`acquire`](HostSession::acquire). Before reusing an existing
//! connection it sends the capability status command; a connection that fails
//! that check is torn down and replaced. The reply also tells the
//! session whether the host currently accepts extended commands.

use crate::{ClientMetrics, ConnectionManager};
use hostlink_core::{BridgeConfig, Error, Params, Result};
use serde_json::Value;
use std::sync::Arc;

/// Command the host answers with `{"enabled": bool, "message": string}`
pub const CAPABILITY_STATUS_COMMAND: &str = "get_capability_status";

/// Validated, lazily created connection to one host
///
/// # Examples
///
/// ```rust,no_run
/// use hostlink_client::HostSession;
/// use hostlink_core::BridgeConfig;
///
/// # async fn example() -> hostlink_core::Result<()> {
/// let mut session = HostSession::new(BridgeConfig::default());
///
/// let conn = session.acquire().await?;
/// let info = conn.send_command("get_scene_info", Default::default()).await?;
///
/// if session.extended_enabled() {
///     session.send_command("search_assets", Default::default()).await?;
/// }
/// session.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct HostSession {
    config: BridgeConfig,
    metrics: Option<Arc<ClientMetrics>>,
    manager: Option<ConnectionManager>,
    extended_enabled: bool,
}

impl HostSession {
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_metrics(config, None)
    }

    pub(crate) fn with_metrics(config: BridgeConfig, metrics: Option<Arc<ClientMetrics>>) -> Self {
        Self {
            config,
            metrics,
            manager: None,
            extended_enabled: false,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Extended-tier flag as last reported by the host
    pub fn extended_enabled(&self) -> bool {
        self.extended_enabled
    }

    /// True while the session holds a manager
    pub fn is_active(&self) -> bool {
        self.manager.is_some()
    }

    /// Return a usable connection, replacing a stale one
    ///
    /// An existing connection is checked with the capability status command.
    /// On success the extended flag is refreshed; on failure the connection
    /// is dropped and a new one is opened. A freshly opened connection is not
    /// checked.
    ///
    /// # Errors
    ///
    /// `NotConnected` when no connection to the host can be opened.
    pub async fn acquire(&mut self) -> Result<&mut ConnectionManager> {
        if let Some(conn) = self.manager.as_mut() {
            match conn.send_command(CAPABILITY_STATUS_COMMAND, Params::new()).await {
                Ok(status) => {
                    self.extended_enabled = extended_flag(&status);
                    tracing::debug!(extended = self.extended_enabled, "Existing connection is valid");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Existing connection is no longer valid");
                    conn.disconnect();
                    self.manager = None;
                }
            }
        }

        if self.manager.is_none() {
            let mut conn = ConnectionManager::new(self.config.clone()).with_metrics(self.metrics.clone());
            if !conn.connect().await {
                return Err(Error::NotConnected(format!(
                    "Could not connect to host at {}. Make sure the host is running.",
                    self.config.address()
                )));
            }
            tracing::info!(addr = %self.config.address(), "Created new host connection");
            self.manager = Some(conn);
        }

        self.manager
            .as_mut()
            .ok_or_else(|| Error::NotConnected("session has no connection".to_string()))
    }

    /// Acquire a connection and send one command over it
    pub async fn send_command(&mut self, command_type: &str, params: Params) -> Result<Value> {
        self.acquire().await?.send_command(command_type, params).await
    }

    /// Connect and check the host once, logging the outcome
    ///
    /// Returns `true` when the host answered. Failures never propagate, so a
    /// caller can start before the host is up.
    pub async fn start(&mut self) -> bool {
        let conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Could not connect to host on startup");
                return false;
            }
        };

        match conn.send_command(CAPABILITY_STATUS_COMMAND, Params::new()).await {
            Ok(status) => {
                self.extended_enabled = extended_flag(&status);
                tracing::info!(extended = self.extended_enabled, "Connected to host on startup");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Host did not answer the capability check");
                false
            }
        }
    }

    /// Drop the connection; the next `acquire` opens a new one
    pub fn shutdown(&mut self) {
        if let Some(mut conn) = self.manager.take() {
            conn.disconnect();
        }
        self.extended_enabled = false;
        tracing::info!("Host session shut down");
    }
}

fn extended_flag(status: &Value) -> bool {
    status.get("enabled").and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extended_flag() {
        assert!(extended_flag(&json!({"enabled": true, "message": "on"})));
        assert!(!extended_flag(&json!({"enabled": false})));
        assert!(!extended_flag(&json!({"enabled": "yes"})));
        assert!(!extended_flag(&json!(null)));
    }

    #[test]
    fn test_new_session_is_inactive() {
        let session = HostSession::new(BridgeConfig::default());
        assert!(!session.is_active());
        assert!(!session.extended_enabled());
    }

    #[tokio::test]
    async fn test_acquire_without_host() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut session = HostSession::new(BridgeConfig::new("127.0.0.1", port));

        match session.acquire().await {
            Err(Error::NotConnected(msg)) => assert!(msg.contains("Make sure the host is running")),
            Err(other) => panic!("Expected NotConnected, got {:?}", other),
            Ok(_) => panic!("Expected NotConnected, got a connection"),
        }
        assert!(!session.is_active());
        assert!(!session.start().await);
    }
}
