//! The command registry the keybinding core executes against.

use crate::error::CommandError;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Future returned by command execution.
pub type CommandFuture = Pin<Box<dyn Future<Output = Result<Value, CommandError>> + Send + 'static>>;

/// A command known to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Unique identifier
    pub id: String,
    /// Human-readable label
    pub label: Option<String>,
    /// Optional group for palette organization
    pub category: Option<String>,
}

impl Command {
    /// Create a command with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            category: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Capabilities the keybinding core needs from a command registry.
pub trait CommandRegistry: Send + Sync {
    fn get_command(&self, id: &str) -> Option<Command>;

    /// Whether an enabled handler exists for `id` with these arguments.
    fn is_enabled(&self, id: &str, args: Option<&Value>) -> bool;

    /// Execute through the first enabled handler; rejects with
    /// [`CommandError::UnknownCommand`] for an unregistered id and
    /// [`CommandError::NoActiveHandler`] when no handler is enabled.
    fn execute_command(&self, id: &str, args: Option<Value>) -> CommandFuture;
}

type ExecuteFn = dyn Fn(Option<Value>) -> CommandFuture + Send + Sync;
type EnabledFn = dyn Fn(Option<&Value>) -> bool + Send + Sync;

/// One handler in a command's handler chain.
#[derive(Clone)]
pub struct CommandHandler {
    execute: Arc<ExecuteFn>,
    is_enabled: Option<Arc<EnabledFn>>,
}

impl CommandHandler {
    /// A handler running an async body.
    pub fn new(execute: impl Fn(Option<Value>) -> CommandFuture + Send + Sync + 'static) -> Self {
        Self {
            execute: Arc::new(execute),
            is_enabled: None,
        }
    }

    /// A handler running a synchronous body.
    pub fn sync(
        execute: impl Fn(Option<Value>) -> Result<Value, CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |args| {
            let result = execute(args);
            Box::pin(std::future::ready(result))
        })
    }

    /// Only enable the handler while `predicate` holds.
    pub fn enabled_when(
        mut self,
        predicate: impl Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_enabled = Some(Arc::new(predicate));
        self
    }

    /// Check if the handler accepts these arguments.
    pub fn is_enabled(&self, args: Option<&Value>) -> bool {
        self.is_enabled.as_ref().map_or(true, |predicate| predicate(args))
    }

    /// Run the handler.
    pub fn execute(&self, args: Option<Value>) -> CommandFuture {
        (self.execute)(args)
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("conditional", &self.is_enabled.is_some())
            .finish()
    }
}

/// In-memory [`CommandRegistry`] with an ordered handler chain per command.
///
/// The most recently registered handler is asked first; the first enabled
/// one runs.
#[derive(Debug, Default)]
pub struct CommandRegistryImpl {
    commands: RwLock<HashMap<String, Command>>,
    handlers: RwLock<HashMap<String, Vec<CommandHandler>>>,
}

impl CommandRegistryImpl {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; a duplicate id is logged and ignored.
    pub fn register_command(&self, command: Command) -> bool {
        let mut commands = self.commands.write().unwrap_or_else(|e| e.into_inner());
        if commands.contains_key(&command.id) {
            warn!(command = %command.id, "a command is already registered with this id");
            return false;
        }
        commands.insert(command.id.clone(), command);
        true
    }

    /// Register a command together with its first handler.
    pub fn register(&self, command: Command, handler: CommandHandler) -> bool {
        let id = command.id.clone();
        if !self.register_command(command) {
            return false;
        }
        self.register_handler(&id, handler);
        true
    }

    /// Add a handler for `id`; it takes precedence over earlier ones.
    pub fn register_handler(&self, id: &str, handler: CommandHandler) {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(id.to_string()).or_default().insert(0, handler);
    }

    /// Remove a command and all of its handlers.
    pub fn unregister_command(&self, id: &str) {
        self.commands.write().unwrap_or_else(|e| e.into_inner()).remove(id);
        self.handlers.write().unwrap_or_else(|e| e.into_inner()).remove(id);
    }

    /// First enabled handler for `id`.
    pub fn active_handler(&self, id: &str, args: Option<&Value>) -> Option<CommandHandler> {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers
            .get(id)?
            .iter()
            .find(|handler| handler.is_enabled(args))
            .cloned()
    }
}

impl CommandRegistry for CommandRegistryImpl {
    fn get_command(&self, id: &str) -> Option<Command> {
        self.commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn is_enabled(&self, id: &str, args: Option<&Value>) -> bool {
        self.active_handler(id, args).is_some()
    }

    fn execute_command(&self, id: &str, args: Option<Value>) -> CommandFuture {
        if self.get_command(id).is_none() {
            return Box::pin(std::future::ready(Err(CommandError::UnknownCommand(
                id.to_string(),
            ))));
        }
        match self.active_handler(id, args.as_ref()) {
            Some(handler) => handler.execute(args),
            None => Box::pin(std::future::ready(Err(CommandError::NoActiveHandler(
                id.to_string(),
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(value: Value) -> CommandHandler {
        CommandHandler::sync(move |_| Ok(value.clone()))
    }

    #[tokio::test]
    async fn test_execute_first_enabled_handler() {
        let registry = CommandRegistryImpl::new();
        registry.register(Command::new("save"), ok(json!("first")));
        registry.register_handler("save", ok(json!("second")).enabled_when(|_| false));
        registry.register_handler("save", ok(json!("third")));

        assert_eq!(registry.execute_command("save", None).await, Ok(json!("third")));
        assert!(registry.is_enabled("save", None));
    }

    #[tokio::test]
    async fn test_no_active_handler() {
        let registry = CommandRegistryImpl::new();
        registry.register(Command::new("save"), ok(json!(null)).enabled_when(|_| false));

        assert!(!registry.is_enabled("save", None));
        assert_eq!(
            registry.execute_command("save", None).await,
            Err(CommandError::NoActiveHandler("save".to_string()))
        );
        assert!(!registry.is_enabled("missing", None));
        assert_eq!(
            registry.execute_command("missing", None).await,
            Err(CommandError::UnknownCommand("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_handler_sees_args() {
        let registry = CommandRegistryImpl::new();
        registry.register(
            Command::new("goto"),
            CommandHandler::sync(|args| Ok(args.unwrap_or(Value::Null)))
                .enabled_when(|args| args.is_some()),
        );

        assert!(!registry.is_enabled("goto", None));
        assert_eq!(
            registry.execute_command("goto", Some(json!({"line": 3}))).await,
            Ok(json!({"line": 3}))
        );
    }

    #[test]
    fn test_duplicate_registration_is_noop() {
        let registry = CommandRegistryImpl::new();
        assert!(registry.register_command(Command::new("a").with_label("First")));
        assert!(!registry.register_command(Command::new("a").with_label("Second")));
        assert_eq!(
            registry.get_command("a").and_then(|c| c.label),
            Some("First".to_string())
        );

        registry.unregister_command("a");
        assert!(registry.get_command("a").is_none());
    }
}
