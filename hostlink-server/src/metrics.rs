//! Server metrics definitions
//!
//! OpenTelemetry instruments recorded by the polling server when metrics are
//! enabled on the builder. They are no-ops until a meter provider is
//! installed, for example by `hostlink_core::init_observability`.
//!
//! # Metrics Collected
//!
//! - **connections_active**: 1 while a client is connected, else 0 (gauge)
//! - **connections_total**: clients accepted since startup (counter)
//! - **commands_total**: commands dispatched, by type and status (counter)
//! - **command_duration**: handler latency in seconds (histogram)
//! - **errors_total**: connection faults, by error kind (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use hostlink_server::ServerMetrics;
//!
//! let metrics = ServerMetrics::new("scene-host");
//! metrics.record_connection(1);
//! metrics.record_command("get_scene_info", "success", 0.004);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Instruments for the polling server, all named `hostlink.server.*`
pub struct ServerMetrics {
    pub connections_active: Gauge<i64>,
    pub connections_total: Counter<u64>,
    pub commands_total: Counter<u64>,
    pub command_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
}

impl ServerMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connections_active: meter
                .i64_gauge("hostlink.server.connections.active")
                .with_description("Whether a client is currently connected")
                .build(),
            connections_total: meter
                .u64_counter("hostlink.server.connections.total")
                .with_description("Total number of clients accepted")
                .build(),
            commands_total: meter
                .u64_counter("hostlink.server.commands.total")
                .with_description("Total number of commands dispatched")
                .build(),
            command_duration: meter
                .f64_histogram("hostlink.server.command.duration")
                .with_description("Command handling duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("hostlink.server.errors.total")
                .with_description("Total number of connection faults")
                .build(),
        }
    }

    pub fn record_connection(&self, active: i64) {
        self.connections_active.record(active, &[]);
        self.connections_total.add(1, &[]);
    }

    pub fn record_disconnection(&self, active: i64) {
        self.connections_active.record(active, &[]);
    }

    pub fn record_command(&self, command: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("command", command.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.commands_total.add(1, attributes);
        self.command_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, kind: &str) {
        let attributes = &[KeyValue::new("error_kind", kind.to_string())];
        self.errors_total.add(1, attributes);
    }
}
