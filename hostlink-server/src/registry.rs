//! Command registry
//!
//! Maps command-type strings to handlers together with the declarative
//! metadata the dispatcher needs before running them: which tier the command
//! belongs to and which host context it requires.
//!
//! # Examples
//!
//! ```rust
//! use hostlink_server::{from_fn, CommandSpec, Registry, Tier};
//! use serde_json::json;
//!
//! let registry = Registry::builder()
//!     .handler("get_scene_info", from_fn(|_| Ok(json!({"objects": 0}))))
//!     .extended("search_assets", from_fn(|_| Ok(json!([]))))
//!     .command(
//!         "delete_object",
//!         CommandSpec::core().with_context("viewport"),
//!         from_fn(|_| Ok(json!({"deleted": true}))),
//!     )
//!     .build();
//!
//! assert_eq!(registry.get("search_assets").unwrap().spec().tier, Tier::Extended);
//! assert_eq!(registry.commands(), vec!["delete_object", "get_scene_info", "search_assets"]);
//! ```

use crate::context::ContextRequirement;
use crate::handler::Handler;
use std::collections::HashMap;

/// Availability class of a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Always dispatched
    #[default]
    Core,
    /// Dispatched only while the capability flag is on
    Extended,
}

/// Per-command metadata consulted once per dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub tier: Tier,
    pub context: ContextRequirement,
}

impl CommandSpec {
    pub fn core() -> Self {
        Self::default()
    }

    pub fn extended() -> Self {
        Self {
            tier: Tier::Extended,
            ..Self::default()
        }
    }

    /// Require the named host context while the handler runs
    pub fn with_context(mut self, name: impl Into<String>) -> Self {
        self.context = ContextRequirement::scoped(name);
        self
    }
}

/// A registered handler and its metadata
pub struct Command {
    spec: CommandSpec,
    handler: Box<dyn Handler>,
}

impl Command {
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

/// Table of commands keyed by command type
///
/// Registering a name twice replaces the earlier entry.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<String, Command>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Register a core-tier command with no context requirement
    pub fn register(&mut self, command_type: impl Into<String>, handler: Box<dyn Handler>) {
        self.register_with(command_type, CommandSpec::core(), handler);
    }

    /// Register a command with explicit metadata
    pub fn register_with(
        &mut self,
        command_type: impl Into<String>,
        spec: CommandSpec,
        handler: Box<dyn Handler>,
    ) {
        let command_type = command_type.into();
        if self
            .commands
            .insert(command_type.clone(), Command { spec, handler })
            .is_some()
        {
            tracing::debug!(command = %command_type, "Replaced existing command");
        }
    }

    pub fn get(&self, command_type: &str) -> Option<&Command> {
        self.commands.get(command_type)
    }

    pub fn contains(&self, command_type: &str) -> bool {
        self.commands.contains_key(command_type)
    }

    /// Registered command types, sorted
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Fluent construction of a [`Registry`]
#[derive(Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a core-tier command
    pub fn handler(mut self, command_type: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.registry.register(command_type, handler);
        self
    }

    /// Add an extended-tier command
    pub fn extended(mut self, command_type: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.registry
            .register_with(command_type, CommandSpec::extended(), handler);
        self
    }

    /// Add a command with explicit metadata
    pub fn command(
        mut self,
        command_type: impl Into<String>,
        spec: CommandSpec,
        handler: Box<dyn Handler>,
    ) -> Self {
        self.registry.register_with(command_type, spec, handler);
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::from_fn;
    use hostlink_core::Params;
    use serde_json::json;

    #[test]
    fn test_registry_basic() {
        let mut registry = Registry::new();
        registry.register("get_scene_info", from_fn(|_| Ok(json!({"name": "Scene"}))));

        assert!(registry.contains("get_scene_info"));
        assert!(!registry.contains("unknown"));
        assert_eq!(registry.len(), 1);

        let command = registry.get("get_scene_info").unwrap();
        assert_eq!(command.spec(), &CommandSpec::core());
        let result = command.handler().handle(&Params::new()).unwrap();
        assert_eq!(result, json!({"name": "Scene"}));
    }

    #[test]
    fn test_register_replaces() {
        let registry = Registry::builder()
            .handler("ping", from_fn(|_| Ok(json!(1))))
            .extended("ping", from_fn(|_| Ok(json!(2))))
            .build();

        assert_eq!(registry.len(), 1);
        let command = registry.get("ping").unwrap();
        assert_eq!(command.spec().tier, Tier::Extended);
        assert_eq!(command.handler().handle(&Params::new()).unwrap(), json!(2));
    }

    #[test]
    fn test_command_spec_builders() {
        let spec = CommandSpec::extended().with_context("viewport");
        assert_eq!(spec.tier, Tier::Extended);
        assert_eq!(spec.context, ContextRequirement::Scoped("viewport".into()));
        assert_eq!(CommandSpec::core().context, ContextRequirement::None);
    }

    #[test]
    fn test_empty_registry() {
        let registry = RegistryBuilder::default().build();
        assert!(registry.is_empty());
        assert!(registry.commands().is_empty());
        assert!(registry.get("anything").is_none());
    }
}
