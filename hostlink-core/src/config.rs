//! Bridge configuration shared by server and client
//!
//! `BridgeConfig` gathers the transport and timing knobs of the bridge. Both
//! `ServerBuilder::config` and `ClientBuilder::config` accept it, so one value
//! can describe both ends of a link.
//!
//! # Environment Variables
//!
//! [`BridgeConfig::from_env`] starts from the defaults and overrides:
//! - `HOSTLINK_HOST`: host name or address
//! - `HOSTLINK_PORT`: TCP port
//! - `HOSTLINK_TIMEOUT_SECS`: client response timeout in whole seconds

use crate::codec::DEFAULT_MAX_FRAME_LEN;
use crate::error::{Error, Result};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9876;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8192;

/// Lowest port the bridge accepts; privileged ports are rejected
pub const MIN_PORT: u16 = 1024;

/// Transport and timing settings for one bridge link
///
/// # Defaults
///
/// | field | default |
/// |---|---|
/// | `host` | `"localhost"` |
/// | `port` | `9876` |
/// | `poll_interval` | 100 ms |
/// | `response_timeout` | 15 s |
/// | `read_chunk_size` | 8192 bytes |
/// | `max_frame_len` | 16 MiB |
///
/// # Examples
///
/// ```rust
/// use hostlink_core::BridgeConfig;
/// use std::time::Duration;
///
/// let config = BridgeConfig::default()
///     .with_port(9900)
///     .with_response_timeout(Duration::from_secs(30));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.address(), "localhost:9900");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Host the server binds to and the client connects to
    pub host: String,
    /// TCP port, 1024-65535
    pub port: u16,
    /// Delay the host scheduler waits between two server steps
    pub poll_interval: Duration,
    /// Overall time the client waits for one complete response
    pub response_timeout: Duration,
    /// Bytes requested per receive call on either side
    pub read_chunk_size: usize,
    /// Largest unparsed buffer the server tolerates before dropping the client
    pub max_frame_len: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl BridgeConfig {
    /// Create a configuration for `host:port` with all other defaults
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Build a configuration from the defaults and `HOSTLINK_*` variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a variable is set but cannot be parsed.
    /// Range checks are left to [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOSTLINK_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("HOSTLINK_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("HOSTLINK_PORT={:?}: {}", port, e)))?;
        }
        if let Ok(secs) = std::env::var("HOSTLINK_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("HOSTLINK_TIMEOUT_SECS={:?}: {}", secs, e)))?;
            config.response_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// `host:port`, suitable for `ToSocketAddrs` and `TcpStream::connect`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.validate_endpoint()?;
        self.validate_limits()
    }

    /// Check `host` and `port` only
    pub fn validate_endpoint(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.port < MIN_PORT {
            return Err(Error::Config(format!(
                "port {} is outside {}-65535",
                self.port, MIN_PORT
            )));
        }
        Ok(())
    }

    /// Check the timing and size fields only
    ///
    /// Used when the endpoint comes from somewhere else, such as an explicit
    /// socket address bound to an ephemeral port.
    pub fn validate_limits(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be non-zero".into()));
        }
        if self.response_timeout.is_zero() {
            return Err(Error::Config("response_timeout must be non-zero".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(Error::Config("read_chunk_size must be non-zero".into()));
        }
        if self.max_frame_len == 0 {
            return Err(Error::Config("max_frame_len must be non-zero".into()));
        }
        Ok(())
    }
}
