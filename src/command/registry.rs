//! Command registry and dispatch

use super::keybinding::KeyBinding;
use crate::error::{ProxyError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Handler<C> = Arc<dyn Fn(&mut C) -> Result<()> + Send + Sync>;
type Predicate<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// A named action over a context `C`
pub struct Command<C> {
    id: String,
    label: String,
    bindings: Vec<KeyBinding>,
    enabled: Option<Predicate<C>>,
    handler: Handler<C>,
}

impl<C> Command<C> {
    /// Create a command with its handler
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut C) -> Result<()> + Send + Sync + 'static,
    {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            bindings: Vec::new(),
            enabled: None,
            handler: Arc::new(handler),
        }
    }

    /// Human readable label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Bind a key combination
    pub fn with_binding(mut self, binding: KeyBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Only run while `enabled` holds for the context
    pub fn with_enabled<F>(mut self, enabled: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(enabled));
        self
    }

    /// Command id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bound key combinations
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// True when the command may run against `ctx`
    pub fn is_enabled(&self, ctx: &C) -> bool {
        self.enabled.as_ref().map_or(true, |enabled| enabled(ctx))
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Registry of commands keyed by id and key binding.
///
/// Created once at startup and passed to whatever dispatches input.
/// Iteration follows registration order.
pub struct CommandRegistry<C> {
    commands: Vec<Command<C>>,
    by_id: HashMap<String, usize>,
    by_key: HashMap<KeyBinding, usize>,
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            by_id: HashMap::new(),
            by_key: HashMap::new(),
        }
    }
}

impl<C> CommandRegistry<C> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Fails if its id or any of its bindings is taken;
    /// the registry is unchanged on failure.
    pub fn register(&mut self, command: Command<C>) -> Result<()> {
        if self.by_id.contains_key(&command.id) {
            return Err(ProxyError::Command(format!(
                "command '{}' is already registered",
                command.id
            )));
        }
        for (i, binding) in command.bindings.iter().enumerate() {
            let taken = self
                .by_key
                .get(binding)
                .map(|&idx| self.commands[idx].id.as_str())
                .or_else(|| command.bindings[..i].contains(binding).then_some(command.id.as_str()));
            if let Some(owner) = taken {
                return Err(ProxyError::Command(format!(
                    "key '{}' is already bound to '{}'",
                    binding, owner
                )));
            }
        }

        let idx = self.commands.len();
        tracing::trace!(command = %command.id, "Registering command");
        self.by_id.insert(command.id.clone(), idx);
        for binding in &command.bindings {
            self.by_key.insert(binding.clone(), idx);
        }
        self.commands.push(command);
        Ok(())
    }

    /// Look up a command by id
    pub fn get(&self, id: &str) -> Option<&Command<C>> {
        self.by_id.get(id).map(|&idx| &self.commands[idx])
    }

    /// Command bound to `binding`
    pub fn lookup_key(&self, binding: &KeyBinding) -> Option<&Command<C>> {
        self.by_key.get(binding).map(|&idx| &self.commands[idx])
    }

    /// Commands in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Command<C>> {
        self.commands.iter()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the command `id` against `ctx`
    pub fn dispatch(&self, id: &str, ctx: &mut C) -> Result<()> {
        let command = self
            .get(id)
            .ok_or_else(|| ProxyError::Command(format!("unknown command '{}'", id)))?;
        if !command.is_enabled(ctx) {
            return Err(ProxyError::Command(format!("command '{}' is disabled", id)));
        }

        tracing::debug!(command = id, "Dispatching command");
        (command.handler)(ctx)
    }

    /// Run whatever is bound to `binding`.
    ///
    /// Returns `Ok(false)` when nothing enabled is bound to the key.
    pub fn dispatch_key(&self, binding: &KeyBinding, ctx: &mut C) -> Result<bool> {
        let Some(command) = self.lookup_key(binding) else {
            tracing::trace!(key = %binding, "No command bound");
            return Ok(false);
        };
        if !command.is_enabled(ctx) {
            return Ok(false);
        }

        tracing::debug!(command = %command.id, key = %binding, "Dispatching key");
        (command.handler)(ctx)?;
        Ok(true)
    }
}

impl<C> fmt::Debug for CommandRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.commands.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: i32,
        locked: bool,
    }

    fn key(s: &str) -> KeyBinding {
        KeyBinding::parse(s).unwrap()
    }

    fn registry() -> CommandRegistry<Counter> {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                Command::new("increment", |c: &mut Counter| {
                    c.value += 1;
                    Ok(())
                })
                .with_label("Increment")
                .with_binding(key("ctrl+up"))
                .with_enabled(|c: &Counter| !c.locked),
            )
            .unwrap();
        registry
            .register(Command::new("fail", |_: &mut Counter| Err(ProxyError::Command("boom".into()))).with_binding(key("f")))
            .unwrap();
        registry
    }

    #[test]
    fn test_dispatch_by_id_and_key() {
        let registry = registry();
        let mut ctx = Counter::default();

        registry.dispatch("increment", &mut ctx).unwrap();
        assert!(registry.dispatch_key(&key("Up+Control"), &mut ctx).unwrap());
        assert_eq!(ctx.value, 2);

        assert!(!registry.dispatch_key(&key("ctrl+down"), &mut ctx).unwrap());
        assert!(registry.dispatch("decrement", &mut ctx).is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut registry = registry();

        let err = registry.register(Command::new("increment", |_: &mut Counter| Ok(()))).unwrap_err();
        assert!(matches!(err, ProxyError::Command(_)));

        let err = registry
            .register(Command::new("other", |_: &mut Counter| Ok(())).with_binding(key("Ctrl+Up")))
            .unwrap_err();
        assert!(err.to_string().contains("increment"));
        assert!(registry.get("other").is_none());

        let err = registry
            .register(
                Command::new("twice", |_: &mut Counter| Ok(()))
                    .with_binding(key("x"))
                    .with_binding(key("X")),
            )
            .unwrap_err();
        assert!(matches!(err, ProxyError::Command(_)));
        assert!(registry.lookup_key(&key("x")).is_none());
    }

    #[test]
    fn test_registration_order() {
        let registry = registry();
        let ids: Vec<&str> = registry.iter().map(Command::id).collect();
        assert_eq!(ids, vec!["increment", "fail"]);
    }

    #[test]
    fn test_disabled_command() {
        let registry = registry();
        let mut ctx = Counter {
            locked: true,
            ..Default::default()
        };

        assert!(!registry.dispatch_key(&key("ctrl+up"), &mut ctx).unwrap());
        assert!(registry.dispatch("increment", &mut ctx).is_err());
        assert_eq!(ctx.value, 0);
    }

    #[test]
    fn test_handler_error_propagates() {
        let registry = registry();
        let err = registry.dispatch_key(&key("f"), &mut Counter::default()).unwrap_err();
        assert_eq!(err.to_string(), ProxyError::Command("boom".into()).to_string());
    }
}
