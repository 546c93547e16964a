//! Command handlers
//!
//! A handler is the host-side implementation of one command type. It runs
//! synchronously inside the server step, on the host's own thread, so it may
//! touch host state that is neither `Send` nor `Sync`.
//!
//! # Creating Handlers
//!
//! 1. **from_fn**: wrap a closure that works on the raw parameter map
//! 2. **from_typed_fn**: wrap a closure taking a `Deserialize` type and
//!    returning a `Serialize` type
//! 3. **#[handler]**: annotate a typed function (via hostlink-macros)
//!
//! Handlers report failure through `anyhow::Result`, so any error type can be
//! returned with `?`. The error's display text becomes the `message` of the
//! error response the client receives.
//!
//! # Examples
//!
//! ```rust
//! use hostlink_server::{from_fn, from_typed_fn};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! let info = from_fn(|_params| Ok(json!({"name": "Scene", "object_count": 3})));
//!
//! #[derive(Deserialize)]
//! struct DeleteParams { name: String }
//!
//! let delete = from_typed_fn(|p: DeleteParams| Ok(json!({"deleted": p.name})));
//! ```

use hostlink_core::Params;
use serde_json::Value;

/// Outcome of running a handler
pub type HandlerResult = anyhow::Result<Value>;

/// Host-side implementation of a single command type
///
/// Handlers are not required to be `Send` or `Sync`; the server never moves
/// them off the thread that drives it.
pub trait Handler {
    /// Execute the command with its decoded parameters
    fn handle(&self, params: &Params) -> HandlerResult;
}

/// Adapter that turns a closure into a [`Handler`]
///
/// Use [`from_fn`] rather than naming this type.
pub struct FnHandler<F>
where
    F: Fn(&Params) -> HandlerResult,
{
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Params) -> HandlerResult,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Params) -> HandlerResult,
{
    fn handle(&self, params: &Params) -> HandlerResult {
        (self.func)(params)
    }
}

/// Create a handler from a closure over the raw parameter map
///
/// # Examples
///
/// ```rust
/// use hostlink_server::from_fn;
/// use serde_json::json;
///
/// let echo = from_fn(|params| Ok(json!({"echo": params})));
/// ```
pub fn from_fn<F>(func: F) -> Box<dyn Handler>
where
    F: Fn(&Params) -> HandlerResult + 'static,
{
    Box::new(FnHandler::new(func))
}

/// Create a handler with automatic parameter and result conversion
///
/// Parameters are deserialized from the request's `params` object. A request
/// with no parameters also satisfies unit-like types such as `()`.
///
/// # Errors
///
/// The handler fails with `Invalid params: ...` when deserialization fails,
/// and with `Invalid result: ...` when the return value cannot be serialized.
///
/// # Examples
///
/// ```rust
/// use hostlink_server::from_typed_fn;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize)]
/// struct MoveParams { name: String, location: [f64; 3] }
///
/// #[derive(Serialize)]
/// struct Moved { name: String, location: [f64; 3] }
///
/// let handler = from_typed_fn(|p: MoveParams| {
///     anyhow::ensure!(!p.name.is_empty(), "Object name is required");
///     Ok(Moved { name: p.name, location: p.location })
/// });
/// ```
pub fn from_typed_fn<P, R, F>(func: F) -> Box<dyn Handler>
where
    P: serde::de::DeserializeOwned + 'static,
    R: serde::Serialize + 'static,
    F: Fn(P) -> anyhow::Result<R> + 'static,
{
    from_fn(move |params: &Params| {
        let params: P = decode_params(params)?;
        let result = func(params)?;
        serde_json::to_value(result).map_err(|e| anyhow::anyhow!("Invalid result: {}", e))
    })
}

fn decode_params<P: serde::de::DeserializeOwned>(params: &Params) -> anyhow::Result<P> {
    match serde_json::from_value(Value::Object(params.clone())) {
        Ok(decoded) => Ok(decoded),
        Err(_) if params.is_empty() => serde_json::from_value(Value::Null)
            .map_err(|e| anyhow::anyhow!("Invalid params: {}", e)),
        Err(e) => Err(anyhow::anyhow!("Invalid params: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Deserialize)]
    struct ScaleParams {
        name: String,
        factor: f64,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Scaled {
        name: String,
        scale: [f64; 3],
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_raw_handler() {
        let handler = from_fn(|params| Ok(json!({"keys": params.len()})));
        let result = handler.handle(&params(json!({"a": 1, "b": 2}))).unwrap();
        assert_eq!(result, json!({"keys": 2}));
    }

    #[test]
    fn test_typed_handler() {
        let handler = from_typed_fn(|p: ScaleParams| {
            Ok(Scaled {
                name: p.name,
                scale: [p.factor; 3],
            })
        });

        let result = handler
            .handle(&params(json!({"name": "Cube", "factor": 2.0})))
            .unwrap();
        let scaled: Scaled = serde_json::from_value(result).unwrap();
        assert_eq!(
            scaled,
            Scaled {
                name: "Cube".into(),
                scale: [2.0, 2.0, 2.0]
            }
        );
    }

    #[test]
    fn test_typed_handler_invalid_params() {
        let handler = from_typed_fn(|p: ScaleParams| Ok(p.factor));
        let err = handler.handle(&params(json!({"name": "Cube"}))).unwrap_err();
        assert!(err.to_string().starts_with("Invalid params:"), "{}", err);
    }

    #[test]
    fn test_typed_handler_unit_params() {
        let handler = from_typed_fn(|_: ()| Ok("ready"));
        assert_eq!(handler.handle(&Params::new()).unwrap(), json!("ready"));
    }

    #[test]
    fn test_handler_error_propagates() {
        let handler = from_fn(|_| anyhow::bail!("boom"));
        let err = handler.handle(&Params::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_handler_may_hold_non_send_state() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handler = from_fn(move |_| {
            counter.set(counter.get() + 1);
            Ok(json!(counter.get()))
        });

        handler.handle(&Params::new()).unwrap();
        assert_eq!(handler.handle(&Params::new()).unwrap(), json!(2));
        assert_eq!(calls.get(), 2);
    }
}
