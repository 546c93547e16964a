//! Server builder for constructing polling servers
//!
//! The builder gathers the registry, the capability flag, the host context
//! and the transport settings, then binds the listener. Binding uses
//! SO_REUSEADDR (so a restarted host can rebind while the old socket sits in
//! TIME_WAIT), a backlog of 1 and non-blocking mode.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hostlink_core::BridgeConfig;
//! use hostlink_server::{from_fn, CommandSpec, PollingServer};
//! use serde_json::json;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! # fn example() -> hostlink_core::Result<()> {
//! let extended = Arc::new(AtomicBool::new(false));
//!
//! let server = PollingServer::builder()
//!     .config(BridgeConfig::from_env()?)
//!     .handler("get_scene_info", from_fn(|_| Ok(json!({"objects": 0}))))
//!     .command(
//!         "delete_object",
//!         CommandSpec::core().with_context("viewport"),
//!         from_fn(|p| Ok(json!({"deleted": p["name"]}))),
//!     )
//!     .extended("search_assets", from_fn(|_| Ok(json!([]))))
//!     .capability(Arc::clone(&extended))
//!     .with_metrics()
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::{
    CapabilityFlag, CommandDispatcher, CommandSpec, Handler, HostContext, PollingServer,
    Registry, ServerMetrics,
};
use hostlink_core::{BridgeConfig, Error, ObservabilityConfig, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Only one pending connection is queued; the server serves one client.
const LISTEN_BACKLOG: i32 = 1;

/// Builder for a [`PollingServer`]
pub struct ServerBuilder {
    config: BridgeConfig,
    addr: Option<SocketAddr>,
    registry: Registry,
    capability: Option<Box<dyn CapabilityFlag>>,
    host_context: Option<Box<dyn HostContext>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
    metrics: bool,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            addr: None,
            registry: Registry::new(),
            capability: None,
            host_context: None,
            observability_config: None,
            service_name: None,
            metrics: false,
        }
    }

    /// Use `config` for host, port, poll interval and buffer limits
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind to an explicit socket address instead of `config.host:config.port`
    ///
    /// Port 0 picks an ephemeral port; read it back with
    /// [`PollingServer::local_addr`].
    pub fn bind(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Bind to an explicit address given as a string (e.g. "127.0.0.1:9876")
    pub fn bind_str(mut self, addr: &str) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address {:?}: {}", addr, e)))?;
        self.addr = Some(addr);
        Ok(self)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.config.max_frame_len = len;
        self
    }

    /// Register a core-tier command
    pub fn handler(mut self, command_type: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.registry.register(command_type, handler);
        self
    }

    /// Register an extended-tier command
    pub fn extended(mut self, command_type: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.registry
            .register_with(command_type, CommandSpec::extended(), handler);
        self
    }

    /// Register a command with explicit metadata
    pub fn command(
        mut self,
        command_type: impl Into<String>,
        spec: CommandSpec,
        handler: Box<dyn Handler>,
    ) -> Self {
        self.registry.register_with(command_type, spec, handler);
        self
    }

    /// Replace the registry (drops previously registered commands)
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Source of the extended-tier flag (default: always off)
    pub fn capability(mut self, flag: impl CapabilityFlag + 'static) -> Self {
        self.capability = Some(Box::new(flag));
        self
    }

    /// Host context provider (default: [`NoHostContext`](crate::NoHostContext))
    pub fn host_context(mut self, host_context: impl HostContext + 'static) -> Self {
        self.host_context = Some(Box::new(host_context));
        self
    }

    /// Initialize observability with `config` during `build`, and record metrics
    ///
    /// OTLP traces and metrics need a running tokio runtime; for a host driven
    /// by `run_blocking` or its own timer, disable them and keep the logs.
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self.metrics = true;
        self
    }

    pub fn with_default_observability(self) -> Self {
        self.with_observability(ObservabilityConfig::default())
    }

    /// Record metrics through the global meter provider, without installing one
    pub fn with_metrics(mut self) -> Self {
        self.metrics = true;
        self
    }

    /// Service name used for the meter and, if enabled, observability
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Bind the listener and return a running server
    ///
    /// # Errors
    ///
    /// `Config` for invalid settings, an unresolvable address, or OTLP
    /// exporters enabled outside a tokio runtime; `Transport` if the socket
    /// cannot be bound.
    pub fn build(self) -> Result<PollingServer> {
        let addr = match self.addr {
            Some(addr) => {
                self.config.validate_limits()?;
                addr
            }
            None => {
                self.config.validate()?;
                resolve(&self.config.address())?
            }
        };

        let service_name = self
            .service_name
            .clone()
            .unwrap_or_else(|| "hostlink-server".to_string());

        if let Some(mut obs) = self.observability_config {
            if let Some(name) = self.service_name {
                obs.service_name = name;
            }
            if obs.needs_runtime() && tokio::runtime::Handle::try_current().is_err() {
                return Err(Error::Config("OTLP exporters need a tokio runtime".to_string()));
            }
            hostlink_core::init_observability(obs).map_err(|e| {
                Error::Config(format!("Failed to initialize observability: {}", e))
            })?;
        }

        let metrics = self
            .metrics
            .then(|| Arc::new(ServerMetrics::new(service_name)));

        let listener = bind_listener(addr)?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Server listening");

        let mut dispatcher = CommandDispatcher::new(self.registry);
        if let Some(flag) = self.capability {
            dispatcher = dispatcher.with_capability_boxed(flag);
        }
        if let Some(host_context) = self.host_context {
            dispatcher = dispatcher.with_host_context_boxed(host_context);
        }
        if let Some(ref m) = metrics {
            dispatcher = dispatcher.with_metrics(Arc::clone(m));
        }

        Ok(PollingServer {
            listener: Some(listener),
            client: None,
            dispatcher,
            running: Arc::new(AtomicBool::new(true)),
            local_addr,
            poll_interval: self.config.poll_interval,
            read_chunk_size: self.config.read_chunk_size,
            max_frame_len: self.config.max_frame_len,
            metrics,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(address: &str) -> Result<SocketAddr> {
    address
        .to_socket_addrs()
        .map_err(|e| Error::Config(format!("Cannot resolve {}: {}", address, e)))?
        .next()
        .ok_or_else(|| Error::Config(format!("No address found for {}", address)))
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}
