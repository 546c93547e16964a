//! Client builder
//!
//! Collects the bridge settings, metrics and observability options for a
//! [`ConnectionManager`] or a [`HostSession`]. Building never touches the
//! network; the connection opens on first use.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hostlink_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> hostlink_core::Result<()> {
//! let mut conn = ClientBuilder::new("localhost", 9876)
//!     .response_timeout(Duration::from_secs(30))
//!     .with_metrics()
//!     .service_name("scene-agent")
//!     .build()?;
//!
//! let status = conn.send_command("get_capability_status", Default::default()).await?;
//! # Ok(())
//! # }
//! ```

use crate::{ClientMetrics, ConnectionManager, HostSession};
use hostlink_core::{BridgeConfig, Error, ObservabilityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ConnectionManager`] and [`HostSession`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: BridgeConfig,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
    metrics: bool,
}

impl ClientBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(BridgeConfig::new(host, port))
    }

    pub fn from_config(config: BridgeConfig) -> Self {
        Self {
            config,
            observability_config: None,
            service_name: None,
            metrics: false,
        }
    }

    /// Replace all bridge settings
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Overall time allowed for one response (default 15 s)
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Initialize observability with `config` during `build`, and record metrics
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self.metrics = true;
        self
    }

    pub fn with_default_observability(self) -> Self {
        self.with_observability(ObservabilityConfig::default())
    }

    /// Record metrics through the global meter provider
    pub fn with_metrics(mut self) -> Self {
        self.metrics = true;
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Validate the settings and create a disconnected manager
    ///
    /// # Errors
    ///
    /// `Config` when a setting is out of range, when OTLP exporters are
    /// enabled outside a tokio runtime, or when observability fails to
    /// initialize.
    pub fn build(self) -> Result<ConnectionManager> {
        let metrics = self.prepare()?;
        Ok(ConnectionManager::new(self.config).with_metrics(metrics))
    }

    /// Validate the settings and create a session that opens managers on demand
    pub fn build_session(self) -> Result<HostSession> {
        let metrics = self.prepare()?;
        Ok(HostSession::with_metrics(self.config, metrics))
    }

    fn prepare(&self) -> Result<Option<Arc<ClientMetrics>>> {
        self.config.validate()?;

        if let Some(ref obs) = self.observability_config {
            let mut obs = obs.clone();
            if let Some(ref name) = self.service_name {
                obs.service_name = name.clone();
            }
            if obs.needs_runtime() && tokio::runtime::Handle::try_current().is_err() {
                return Err(Error::Config("OTLP exporters need a tokio runtime".to_string()));
            }
            hostlink_core::init_observability(obs).map_err(|e| {
                Error::Config(format!("Failed to initialize observability: {}", e))
            })?;
        }

        Ok(self
            .metrics
            .then(|| Arc::new(ClientMetrics::new(self.meter_name()))))
    }

    fn meter_name(&self) -> String {
        self.service_name
            .clone()
            .unwrap_or_else(|| "hostlink-client".to_string())
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::from_config(BridgeConfig::default())
    }
}
