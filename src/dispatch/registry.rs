// Command registry: name -> handler definition, built once at startup

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use crate::dispatch::{Invocation, Surface};
use crate::utils::config::DEFAULT_COOLDOWN;
use crate::Data;

/// Future returned by a command handler
pub type HandlerFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Entry point of a command, shared by both surfaces
pub type Handler = for<'a> fn(&'a Data, &'a dyn Surface, &'a Invocation) -> HandlerFuture<'a>;

/// Static description of one command
#[derive(Clone, Copy)]
pub struct CommandDefinition {
    pub name: &'static str,
    /// Reachable as `<prefix>name` in addition to the slash command
    pub text_enabled: bool,
    /// Overrides the registry's default cooldown window
    pub cooldown: Option<Duration>,
    pub handler: Handler,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("text_enabled", &self.text_enabled)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

impl CommandDefinition {
    pub fn new(name: &'static str, handler: Handler) -> Self {
        Self {
            name,
            text_enabled: false,
            cooldown: None,
            handler,
        }
    }

    pub fn text_enabled(mut self) -> Self {
        self.text_enabled = true;
        self
    }

    pub fn cooldown(mut self, window: Duration) -> Self {
        self.cooldown = Some(window);
        self
    }
}

/// Lookup table of every command the bot answers to
#[derive(Debug)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDefinition>,
    default_cooldown: Duration,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_default_cooldown(DEFAULT_COOLDOWN)
    }

    pub fn with_default_cooldown(default_cooldown: Duration) -> Self {
        Self {
            commands: HashMap::new(),
            default_cooldown,
        }
    }

    /// Add a command; a later definition with the same name replaces the earlier one
    pub fn register(mut self, definition: CommandDefinition) -> Self {
        if self.commands.insert(definition.name, definition).is_some() {
            warn!("Command '{}' registered twice, keeping the last definition", definition.name);
        }
        self
    }

    /// Any registered command (structured surface)
    pub fn resolve(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    /// Only commands reachable from chat messages
    pub fn resolve_text(&self, name: &str) -> Option<&CommandDefinition> {
        self.resolve(name).filter(|def| def.text_enabled)
    }

    /// Cooldown window that applies to `definition`
    pub fn window_for(&self, definition: &CommandDefinition) -> Duration {
        definition.cooldown.unwrap_or(self.default_cooldown)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered names in alphabetical order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop<'a>(_: &'a Data, _: &'a dyn Surface, _: &'a Invocation) -> HandlerFuture<'a> {
        Box::pin(async { Ok::<(), anyhow::Error>(()) })
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::new()
            .register(CommandDefinition::new("config", noop).text_enabled())
            .register(CommandDefinition::new("serverinfo", noop).cooldown(Duration::from_secs(10)))
    }

    #[test]
    fn test_resolve() {
        let registry = registry();
        assert_eq!(registry.resolve("config").unwrap().name, "config");
        assert_eq!(registry.resolve("serverinfo").unwrap().name, "serverinfo");
        assert!(registry.resolve("help").is_none());
    }

    #[test]
    fn test_text_surface_only_sees_text_enabled() {
        let registry = registry();
        assert!(registry.resolve_text("config").is_some());
        assert!(registry.resolve_text("serverinfo").is_none());
    }

    #[test]
    fn test_window_for() {
        let registry = registry();
        let config = registry.resolve("config").unwrap();
        let info = registry.resolve("serverinfo").unwrap();
        assert_eq!(registry.window_for(config), Duration::from_secs(3));
        assert_eq!(registry.window_for(info), Duration::from_secs(10));
    }

    #[test]
    fn test_duplicate_replaces() {
        let registry = registry().register(CommandDefinition::new("config", noop));
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve_text("config").is_none());
    }

    #[test]
    fn test_names_sorted() {
        assert_eq!(registry().names(), vec!["config", "serverinfo"]);
    }
}
