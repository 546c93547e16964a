//! Logging, tracing and metrics setup
//!
//! hostlink instruments itself with `tracing` spans and events and with
//! OpenTelemetry instruments obtained from `opentelemetry::global`. Nothing is
//! exported until the embedding application calls [`init_observability`],
//! which installs:
//!
//! - a `tracing-subscriber` registry with an `EnvFilter` and a JSON fmt layer
//! - optionally, a `tracing-opentelemetry` layer feeding an OTLP span exporter
//! - optionally, an OTLP meter provider read every 30 seconds
//!
//! A host application that already owns a subscriber can skip this module
//! entirely; the library only emits, it never installs anything on its own.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hostlink_core::ObservabilityConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Logs only. The OTLP trace and metric exporters spawn onto the current
//!     // tokio runtime, so enable them only from inside one.
//!     let config = ObservabilityConfig::new("scene-bridge")
//!         .with_traces(false)
//!         .with_metrics(false)
//!         .with_log_level("hostlink_server=debug,info");
//!
//!     hostlink_core::init_observability(config)?;
//!
//!     // ... run the bridge ...
//!
//!     hostlink_core::shutdown_observability();
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint
//! - `RUST_LOG`: filter directives; take precedence over `log_level`

use opentelemetry::{global, KeyValue};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type InitResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Interval at which the periodic reader exports metrics
const METRICS_EXPORT_INTERVAL: Duration = Duration::from_secs(30);

/// What to export and where
///
/// # Defaults
///
/// - service name `"hostlink"`, version from the crate
/// - endpoint from `OTEL_EXPORTER_OTLP_ENDPOINT`, else `http://localhost:4317`
/// - traces, metrics and logs enabled
/// - log level from `RUST_LOG`, else `"info"`
///
/// # Examples
///
/// ```rust
/// use hostlink_core::ObservabilityConfig;
///
/// let config = ObservabilityConfig::new("scene-bridge")
///     .with_metrics(false)
///     .with_log_level("debug");
///
/// assert_eq!(config.service_name, "scene-bridge");
/// assert!(!config.enable_metrics);
/// ```
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Reported as `service.name` on every span and metric
    pub service_name: String,
    /// Reported as `service.version`
    pub service_version: String,
    /// OTLP/gRPC collector endpoint
    pub otlp_endpoint: String,
    /// Export spans through OTLP
    pub enable_traces: bool,
    /// Install an OTLP meter provider
    pub enable_metrics: bool,
    /// Emit JSON log lines to stdout
    pub enable_logs: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "hostlink".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: true,
            enable_metrics: true,
            enable_logs: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl ObservabilityConfig {
    /// Defaults with a custom service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    pub fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    pub fn with_logs(mut self, enable: bool) -> Self {
        self.enable_logs = enable;
        self
    }

    /// Whether an OTLP exporter is enabled, which requires a running tokio runtime
    pub fn needs_runtime(&self) -> bool {
        self.enable_traces || self.enable_metrics
    }

    fn resource(&self) -> opentelemetry_sdk::Resource {
        opentelemetry_sdk::Resource::builder_empty()
            .with_attributes(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build()
    }
}

/// Install the subscriber and the enabled OpenTelemetry providers
///
/// Call once, early in `main`. The OTLP exporters use tonic, so a tokio
/// runtime must be running when traces or metrics are enabled.
///
/// # Errors
///
/// Fails if an exporter cannot be built, if the log filter does not parse, or
/// if a global subscriber is already installed.
pub fn init_observability(config: ObservabilityConfig) -> InitResult<()> {
    let tracer = if config.enable_traces {
        Some(init_tracer(&config)?)
    } else {
        None
    };

    if config.enable_metrics {
        init_metrics(&config)?;
    }

    init_tracing_subscriber(&config, tracer)?;

    tracing::info!(
        service_name = %config.service_name,
        otlp_endpoint = %config.otlp_endpoint,
        traces = config.enable_traces,
        metrics = config.enable_metrics,
        logs = config.enable_logs,
        "Observability initialized"
    );

    Ok(())
}

// The tracer is taken from the provider before the provider goes global; the
// tracing-opentelemetry layer needs it directly.
fn init_tracer(config: &ObservabilityConfig) -> InitResult<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    global::set_tracer_provider(provider);

    Ok(tracer)
}

fn init_metrics(config: &ObservabilityConfig) -> InitResult<()> {
    use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRICS_EXPORT_INTERVAL)
        .build();

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(config.resource())
        .build();

    global::set_meter_provider(provider);
    Ok(())
}

fn init_tracing_subscriber(
    config: &ObservabilityConfig,
    tracer: Option<opentelemetry_sdk::trace::Tracer>,
) -> InitResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    // Option<Layer> is itself a layer, so each toggle maps onto one slot.
    let telemetry_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));
    let fmt_layer = config.enable_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .json()
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Log the end of the telemetry session
///
/// SDK providers flush their pending batches when dropped, so there is no
/// explicit flush here. Safe to call more than once.
pub fn shutdown_observability() {
    tracing::info!("Shutting down observability");
}
