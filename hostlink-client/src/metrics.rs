//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by [`ConnectionManager`] when metrics
//! are enabled on the [`ClientBuilder`]. They cost nothing until a meter
//! provider is installed.
//!
//! # Metrics Collected
//!
//! - **connection_state**: 0 disconnected, 1 connecting, 2 connected (gauge)
//! - **requests_total**: commands sent, by type and status (counter)
//! - **request_duration**: round-trip latency in seconds (histogram)
//! - **errors_total**: failures, by error kind (counter)
//! - **reconnections_total**: connections opened after the first (counter)
//!
//! [`ConnectionManager`]: crate::ConnectionManager
//! [`ClientBuilder`]: crate::ClientBuilder

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Instruments for the client, all named `hostlink.client.*`
pub struct ClientMetrics {
    pub connection_state: Gauge<i64>,
    pub requests_total: Counter<u64>,
    pub request_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub reconnections_total: Counter<u64>,
}

impl ClientMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("hostlink.client.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=connected)")
                .build(),
            requests_total: meter
                .u64_counter("hostlink.client.requests.total")
                .with_description("Total number of commands sent")
                .build(),
            request_duration: meter
                .f64_histogram("hostlink.client.request.duration")
                .with_description("Command round-trip duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("hostlink.client.errors.total")
                .with_description("Total number of failed commands and connects")
                .build(),
            reconnections_total: meter
                .u64_counter("hostlink.client.reconnections.total")
                .with_description("Connections opened after the first one")
                .build(),
        }
    }

    pub fn update_connection_state(&self, state: i64) {
        self.connection_state.record(state, &[]);
    }

    pub fn record_request(&self, command: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("command", command.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, kind: &str) {
        let attributes = &[KeyValue::new("error_kind", kind.to_string())];
        self.errors_total.add(1, attributes);
    }

    pub fn record_reconnection(&self) {
        self.reconnections_total.add(1, &[]);
    }
}
