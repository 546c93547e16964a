//! Procedural macros for hostlink command handlers
//!
//! # `#[handler]`
//!
//! Turns a plain function with typed parameters into a factory returning
//! `Box<dyn hostlink_server::Handler>`. Parameters are deserialized from the
//! request's `params` object and the `Ok` value is serialized as the result.
//!
//! Without the macro:
//!
//! ```ignore
//! pub fn delete_object() -> Box<dyn Handler> {
//!     from_typed_fn(|p: DeleteParams| Ok(json!({"deleted": p.name})))
//! }
//! ```
//!
//! With it:
//!
//! ```ignore
//! #[hostlink::handler]
//! pub fn delete_object(p: DeleteParams) -> anyhow::Result<Value> {
//!     Ok(json!({"deleted": p.name}))
//! }
//!
//! let server = PollingServer::builder()
//!     .handler("delete_object", delete_object())
//!     .build()?;
//! ```
//!
//! The generated code refers to `hostlink_server`, so the calling crate needs
//! it as a dependency (directly or through the `hostlink` facade crate's
//! dependency graph).

mod handler;

use proc_macro::TokenStream;

/// Attribute macro for defining command handlers
///
/// # Generated Code
///
/// ```ignore
/// #[handler]
/// fn scale_object(p: ScaleParams) -> anyhow::Result<Scaled> {
///     // ...
/// }
/// ```
///
/// becomes approximately
///
/// ```ignore
/// fn scale_object() -> Box<dyn hostlink_server::Handler> {
///     fn inner_handler(p: ScaleParams) -> anyhow::Result<Scaled> {
///         // ...
///     }
///     hostlink_server::from_typed_fn(move |params: ScaleParams| {
///         inner_handler(params).map_err(Into::into)
///     })
/// }
/// ```
///
/// # Rules
///
/// - The function is synchronous; handlers run inside the host's step.
/// - It takes zero or one parameter. Zero parameters means `()`, which
///   accepts an empty `params` object.
/// - It returns `Result<T, E>` with `T: Serialize` and `E` convertible into
///   `anyhow::Error`.
/// - Visibility, doc comments and other attributes are kept.
#[proc_macro_attribute]
pub fn handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::handler_impl(item)
}
