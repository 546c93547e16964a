//! Command dispatch
//!
//! [`CommandDispatcher`] turns one decoded request into exactly one
//! [`Response`]. Nothing a handler does can escape it: errors and panics are
//! logged locally and converted into `status: "error"` responses, and command
//! types with no enabled handler get the standard unknown-command message.
//!
//! # Dispatch order
//!
//! 1. Look the command up in the registry. Extended-tier commands are treated
//!    as unknown while the capability flag reads false; the flag is asked on
//!    every call.
//! 2. If the registry has no entry for [`CAPABILITY_STATUS_COMMAND`], answer
//!    it from the flag directly.
//! 3. Enter the command's host context, run the handler, leave the context.

use crate::capability::CapabilityFlag;
use crate::context::{HostContext, NoHostContext};
use crate::metrics::ServerMetrics;
use crate::registry::{Registry, Tier};
use hostlink_core::{Error, Params, Request, Response};
use serde_json::{json, Value};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Built-in command reporting whether extended commands are available
///
/// Registering a handler under this name replaces the built-in answer.
pub const CAPABILITY_STATUS_COMMAND: &str = "get_capability_status";

/// Routes requests to registered handlers and builds their responses
pub struct CommandDispatcher {
    registry: Registry,
    capability: Box<dyn CapabilityFlag>,
    host_context: Box<dyn HostContext>,
    metrics: Option<Arc<ServerMetrics>>,
}

impl CommandDispatcher {
    /// Dispatcher with the capability flag off and no host contexts
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            capability: Box::new(false),
            host_context: Box::new(NoHostContext),
            metrics: None,
        }
    }

    pub fn with_capability(mut self, flag: impl CapabilityFlag + 'static) -> Self {
        self.capability = Box::new(flag);
        self
    }

    pub(crate) fn with_capability_boxed(mut self, flag: Box<dyn CapabilityFlag>) -> Self {
        self.capability = flag;
        self
    }

    pub fn with_host_context(mut self, host_context: impl HostContext + 'static) -> Self {
        self.host_context = Box::new(host_context);
        self
    }

    pub(crate) fn with_host_context_boxed(mut self, host_context: Box<dyn HostContext>) -> Self {
        self.host_context = host_context;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current reading of the capability flag
    pub fn capability_enabled(&self) -> bool {
        self.capability.is_enabled()
    }

    /// Whether `command_type` would reach a handler right now
    pub fn is_available(&self, command_type: &str) -> bool {
        match self.registry.get(command_type) {
            Some(command) => command.spec().tier == Tier::Core || self.capability_enabled(),
            None => command_type == CAPABILITY_STATUS_COMMAND,
        }
    }

    /// Command types that would reach a handler right now, sorted
    pub fn available_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .registry
            .commands()
            .into_iter()
            .filter(|name| self.is_available(name))
            .collect();
        if !self.registry.contains(CAPABILITY_STATUS_COMMAND) {
            names.push(CAPABILITY_STATUS_COMMAND.to_string());
            names.sort();
        }
        names
    }

    pub fn dispatch_request(&self, request: &Request) -> Response {
        self.dispatch(&request.command_type, &request.params)
    }

    /// Execute one command and build its response
    #[tracing::instrument(skip_all, fields(command = %command_type))]
    pub fn dispatch(&self, command_type: &str, params: &Params) -> Response {
        let start = Instant::now();
        let response = self.execute(command_type, params);

        if let Some(ref m) = self.metrics {
            m.record_command(command_type, response.status(), start.elapsed().as_secs_f64());
        }
        tracing::debug!(
            status = response.status(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Command dispatched"
        );

        response
    }

    fn execute(&self, command_type: &str, params: &Params) -> Response {
        let command = match self.registry.get(command_type) {
            Some(command) if command.spec().tier == Tier::Core || self.capability_enabled() => {
                command
            }
            Some(_) => {
                tracing::debug!("Extended command requested while capability is off");
                return Response::unknown_command(command_type);
            }
            None if command_type == CAPABILITY_STATUS_COMMAND => {
                return Response::success(self.capability_status());
            }
            None => {
                tracing::warn!("Unknown command type");
                return Response::unknown_command(command_type);
            }
        };

        let host_context = self.host_context.as_ref();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<Value> {
            let _guard = command.spec().context.enter(host_context).map_err(|e| {
                e.context(format!(
                    "Failed to enter host context {}",
                    command.spec().context
                ))
            })?;
            command.handler().handle(params)
        }));

        match outcome {
            Ok(Ok(result)) => Response::success(result),
            Ok(Err(e)) => {
                self.record_failure(&Error::Handler(format!("{:#}", e)));
                Response::error(e.to_string())
            }
            Err(payload) => {
                let message = format!("Handler panicked: {}", panic_message(payload.as_ref()));
                self.record_failure(&Error::Handler(message.clone()));
                Response::error(message)
            }
        }
    }

    fn record_failure(&self, error: &Error) {
        tracing::error!(error = %error, kind = error.kind(), "Command failed");
        if let Some(ref m) = self.metrics {
            m.record_error(error.kind());
        }
    }

    fn capability_status(&self) -> Value {
        if self.capability_enabled() {
            json!({
                "enabled": true,
                "message": "Extended commands are enabled and ready to use."
            })
        } else {
            json!({
                "enabled": false,
                "message": "Extended commands are disabled. Enable the capability on the host to use them."
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}
