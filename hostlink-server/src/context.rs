//! Scoped host-context acquisition
//!
//! Some host operations only work while a particular host context is active
//! (for example, an editor area or a modal scope). Commands declare that need
//! as data, through [`ContextRequirement`] in their `CommandSpec`; the
//! dispatcher enters the context before the handler runs and leaves it when
//! the returned [`ContextGuard`] drops, whatever the handler did.

use std::fmt;

/// Access to the host's scoped contexts
///
/// Implementations usually wrap host API calls and keep any bookkeeping in
/// interior-mutable state. They are not required to be `Send`.
pub trait HostContext {
    /// Make the context named `name` current
    fn enter(&self, name: &str) -> anyhow::Result<()>;

    /// Restore whatever was current before the matching `enter`
    fn leave(&self, name: &str);
}

/// Host without scoped contexts: entering always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHostContext;

impl HostContext for NoHostContext {
    fn enter(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn leave(&self, _name: &str) {}
}

/// Which host context, if any, a command must run inside
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContextRequirement {
    /// Run in whatever context is current
    #[default]
    None,
    /// Enter the named context for the duration of the handler
    Scoped(String),
}

impl ContextRequirement {
    pub fn scoped(name: impl Into<String>) -> Self {
        ContextRequirement::Scoped(name.into())
    }

    /// Enter the required context, if any
    ///
    /// Returns `Ok(None)` when nothing has to be entered.
    pub fn enter<'a>(&'a self, host: &'a dyn HostContext) -> anyhow::Result<Option<ContextGuard<'a>>> {
        match self {
            ContextRequirement::None => Ok(None),
            ContextRequirement::Scoped(name) => ContextGuard::enter(host, name).map(Some),
        }
    }
}

impl fmt::Display for ContextRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextRequirement::None => f.write_str("none"),
            ContextRequirement::Scoped(name) => write!(f, "scoped({})", name),
        }
    }
}

/// Leaves the entered context on drop, including during unwinding
#[must_use = "the context is left as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    host: &'a dyn HostContext,
    name: &'a str,
}

impl<'a> ContextGuard<'a> {
    pub fn enter(host: &'a dyn HostContext, name: &'a str) -> anyhow::Result<Self> {
        host.enter(name)?;
        tracing::trace!(context = name, "Entered host context");
        Ok(Self { host, name })
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.host.leave(self.name);
        tracing::trace!(context = self.name, "Left host context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recording {
        events: RefCell<Vec<String>>,
    }

    impl HostContext for Recording {
        fn enter(&self, name: &str) -> anyhow::Result<()> {
            anyhow::ensure!(name != "missing", "No such context: {}", name);
            self.events.borrow_mut().push(format!("enter {}", name));
            Ok(())
        }

        fn leave(&self, name: &str) {
            self.events.borrow_mut().push(format!("leave {}", name));
        }
    }

    #[test]
    fn test_guard_leaves_on_drop() {
        let host = Recording::default();
        {
            let guard = ContextGuard::enter(&host, "viewport").unwrap();
            assert_eq!(guard.name(), "viewport");
            assert_eq!(host.events.borrow().as_slice(), ["enter viewport"]);
        }
        assert_eq!(host.events.borrow().as_slice(), ["enter viewport", "leave viewport"]);
    }

    #[test]
    fn test_failed_enter_does_not_leave() {
        let host = Recording::default();
        let err = ContextGuard::enter(&host, "missing").err().unwrap();
        assert_eq!(err.to_string(), "No such context: missing");
        assert!(host.events.borrow().is_empty());
    }

    #[test]
    fn test_requirement_none_enters_nothing() {
        let host = Recording::default();
        let guard = ContextRequirement::None.enter(&host).unwrap();
        assert!(guard.is_none());
        drop(guard);
        assert!(host.events.borrow().is_empty());
    }

    #[test]
    fn test_requirement_scoped() {
        let host = Recording::default();
        let requirement = ContextRequirement::scoped("viewport");
        drop(requirement.enter(&host).unwrap());
        assert_eq!(host.events.borrow().as_slice(), ["enter viewport", "leave viewport"]);
        assert_eq!(requirement.to_string(), "scoped(viewport)");
    }

    #[test]
    fn test_no_host_context() {
        let host = NoHostContext;
        assert!(ContextRequirement::scoped("anything").enter(&host).unwrap().is_some());
    }
}
