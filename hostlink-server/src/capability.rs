//! Sources for the extended-tier capability flag
//!
//! Extended commands are only dispatched while the host's capability flag
//! reads true. The dispatcher asks its [`CapabilityFlag`] on every call and
//! never caches the answer, so a host can flip the flag at runtime (from a
//! settings panel, say) and the very next request sees the change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something that can be asked whether extended commands are enabled
pub trait CapabilityFlag {
    fn is_enabled(&self) -> bool;
}

/// A fixed setting
impl CapabilityFlag for bool {
    fn is_enabled(&self) -> bool {
        *self
    }
}

/// A switch shared with other parts of the host
impl CapabilityFlag for Arc<AtomicBool> {
    fn is_enabled(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// A callback into host settings
impl<F> CapabilityFlag for F
where
    F: Fn() -> bool,
{
    fn is_enabled(&self) -> bool {
        self()
    }
}
