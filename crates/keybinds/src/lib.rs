//! # keybinds
//!
//! Keybinding resolution: turns a stream of raw keydowns into command
//! executions.
//!
//! ## Features
//!
//! - Key notation parser with platform aware modifiers (`ctrlcmd`, `cmd`, `macctrl`)
//! - Multi-chord sequences (`ctrlcmd+k ctrlcmd+c`)
//! - Default, user and workspace scopes with `-command` suppression records
//! - When-expressions and legacy keybinding contexts
//! - Keyboard layout aware matching, re-resolved on layout change
//! - Accelerator labels (symbols on macOS, words elsewhere)
//!
//! ## Example
//!
//! ```no_run
//! use keybinds::{
//!     Command, CommandHandler, CommandRegistryImpl, ExpressionMatcher, KeyDispatcher,
//!     Keybinding, KeybindingPreferences, KeybindingRegistry, Platform, StandardLayout,
//! };
//! use std::sync::Arc;
//!
//! let commands = CommandRegistryImpl::new();
//! commands.register(
//!     Command::new("editor.save"),
//!     CommandHandler::sync(|_| Ok(serde_json::Value::Null)),
//! );
//!
//! let mut registry = KeybindingRegistry::new(
//!     Platform::current(),
//!     Arc::new(commands),
//!     Arc::new(StandardLayout::us()),
//!     Arc::new(ExpressionMatcher::new()),
//! );
//! let _save = registry.register_keybinding(Keybinding::new("editor.save", "ctrlcmd+s"));
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let mut dispatcher =
//!     KeyDispatcher::new(registry, KeybindingPreferences::default(), runtime.handle().clone());
//! let outcome = dispatcher.dispatch_key_down("ctrlcmd+s", None);
//! ```

mod binding;
mod command;
mod config;
mod conflict;
mod context;
mod dispatch;
mod display;
mod error;
mod key;
mod keycode;
mod layout;
mod parser;
mod registry;
mod store;

pub use binding::{
    BindingIdentity, BindingTarget, Keybinding, KeybindingScope, ScopedKeybinding,
    PASSTHROUGH_COMMAND,
};
pub use command::{Command, CommandFuture, CommandHandler, CommandRegistry, CommandRegistryImpl};
pub use config::{parse_keymap, KeybindingPreferences};
pub use conflict::{Collision, KeybindingsResult};
pub use context::{ConditionState, ContextKeyService, ExpressionMatcher, FocusTarget, KeybindingContext};
pub use dispatch::{DispatchOutcome, KeyDispatcher};
pub use display::{KeyDisplayConfig, KeyDisplayFormat};
pub use error::{
    CommandError, ContextError, KeybindingError, KeybindingResult, LayoutError, ParseError,
};
pub use key::{Key, KeyModifier, ModifierBit, Platform};
pub use keycode::{CompareResult, KeyCode, KeySequence};
pub use layout::{
    keyboard_event_from_crossterm, DispatchMode, KeyboardEvent, KeyboardLayout, LayoutChange,
    StandardLayout,
};
pub use parser::{parse_keystroke, parse_sequence};
pub use registry::{KeybindingEvent, KeybindingMatch, KeybindingRegistry};
pub use store::{BindingId, RegistrationHandle};

/// Helper to create a key code without modifiers.
pub fn key(key: Key) -> KeyCode {
    KeyCode::new(key)
}

/// Helper to create a Ctrl+key code.
pub fn ctrl(key: Key) -> KeyCode {
    KeyCode::new(key).with_ctrl()
}

/// Helper to create an Alt+key code.
pub fn alt(key: Key) -> KeyCode {
    KeyCode::new(key).with_alt()
}

/// Helper to create a Shift+key code.
pub fn shift(key: Key) -> KeyCode {
    KeyCode::new(key).with_shift()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::command::{Command, CommandHandler, CommandRegistryImpl};
    use crate::context::ExpressionMatcher;
    use crate::error::CommandError;
    use crate::key::Platform;
    use crate::keycode::KeySequence;
    use crate::layout::StandardLayout;
    use crate::parser::parse_sequence;
    use crate::registry::KeybindingRegistry;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    pub fn seq(text: &str) -> KeySequence {
        parse_sequence(text, Platform::other()).unwrap()
    }

    /// Commands whose single handler returns the command id.
    pub fn commands(ids: &[&str]) -> CommandRegistryImpl {
        let commands = CommandRegistryImpl::new();
        for id in ids {
            let value = json!(id);
            commands.register(Command::new(*id), CommandHandler::sync(move |_| Ok(value.clone())));
        }
        commands
    }

    pub fn registry(ids: &[&str]) -> KeybindingRegistry {
        registry_with(commands(ids), Platform::other())
    }

    pub fn registry_with(commands: CommandRegistryImpl, platform: Platform) -> KeybindingRegistry {
        KeybindingRegistry::new(
            platform,
            Arc::new(commands),
            Arc::new(StandardLayout::us()),
            Arc::new(ExpressionMatcher::new()),
        )
    }

    pub fn registry_with_layout(
        commands: CommandRegistryImpl,
        layout: Arc<StandardLayout>,
    ) -> KeybindingRegistry {
        KeybindingRegistry::new(
            Platform::other(),
            Arc::new(commands),
            layout,
            Arc::new(ExpressionMatcher::new()),
        )
    }

    /// Executions observed by [`recording`] handlers, in completion order.
    #[derive(Debug, Clone, Default)]
    pub struct Recorder {
        calls: Arc<Mutex<Vec<(String, Option<Value>)>>>,
    }

    impl Recorder {
        pub fn calls(&self) -> Vec<(String, Option<Value>)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.calls().into_iter().map(|(id, _)| id).collect()
        }
    }

    /// Commands that record their execution once the returned future runs.
    pub fn recording(ids: &[&str]) -> (CommandRegistryImpl, Recorder) {
        let commands = CommandRegistryImpl::new();
        let recorder = Recorder::default();
        for command in ids {
            let id = command.to_string();
            let calls = recorder.calls.clone();
            let handler = CommandHandler::new(move |args| {
                let id = id.clone();
                let calls = calls.clone();
                Box::pin(async move {
                    calls.lock().unwrap().push((id.clone(), args));
                    Ok::<_, CommandError>(json!(id))
                })
            });
            commands.register(Command::new(*command), handler);
        }
        (commands, recorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_helpers() {
        let k = key(Key::Enter);
        assert_eq!(k.key, Some(Key::Enter));
        assert!(!k.has_modifiers());

        assert!(ctrl(Key::S).ctrl);
        assert!(alt(Key::X).alt);
        assert_eq!(shift(Key::Tab).to_string(), "shift+tab");
    }
}
