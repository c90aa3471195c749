//! Keybinding records, scopes and the suppression variant.

use crate::keycode::KeySequence;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Reserved command that is always active and lets the key event through.
pub const PASSTHROUGH_COMMAND: &str = "passthrough";

/// A keybinding as authored in a keymap file or contributed in code.
///
/// A `command` prefixed with `-` (e.g. `"-editor.save"`) disables every
/// binding of that command with the same keybinding, context and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keybinding {
    /// Command id, or `-id` for a suppression record
    pub command: String,
    /// Key sequence text, e.g. `"ctrlcmd+k ctrlcmd+c"`
    pub keybinding: String,
    /// Legacy keybinding context id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// When-expression guarding the binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Arguments passed to the command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Keybinding {
    /// Create a binding of `command` to the key text `keybinding`.
    pub fn new(command: impl Into<String>, keybinding: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            keybinding: keybinding.into(),
            context: None,
            when: None,
            args: None,
        }
    }

    /// Set the legacy context id.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the when-expression.
    pub fn with_when(mut self, when: impl Into<String>) -> Self {
        self.when = Some(when.into());
        self
    }

    /// Set the arguments passed to the command.
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    /// Classify the command field.
    pub fn target(&self) -> BindingTarget {
        BindingTarget::parse(&self.command)
    }

    /// Duplicate check: command, context and when always count; keybinding
    /// and args count unless ignored.
    pub fn equals(&self, other: &Keybinding, ignore_keybinding: bool, ignore_args: bool) -> bool {
        self.command == other.command
            && self.context == other.context
            && self.when == other.when
            && (ignore_keybinding || self.keybinding == other.keybinding)
            && (ignore_args || self.args == other.args)
    }
}

impl fmt::Display for Keybinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.keybinding, self.command)?;
        if let Some(ref context) = self.context {
            write!(f, " [context: {}]", context)?;
        }
        if let Some(ref when) = self.when {
            write!(f, " [when: {}]", when)?;
        }
        Ok(())
    }
}

/// What a stored binding does once its key sequence matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingTarget {
    /// Execute the command
    Active(String),
    /// Disable matching bindings of the command
    Suppression(String),
}

impl BindingTarget {
    /// Classify a command id; a leading `-` marks a suppression.
    pub fn parse(command: &str) -> Self {
        match command.strip_prefix('-') {
            Some(target) => Self::Suppression(target.to_string()),
            None => Self::Active(command.to_string()),
        }
    }

    /// The command id without the suppression prefix.
    pub fn command(&self) -> &str {
        match self {
            Self::Active(id) | Self::Suppression(id) => id,
        }
    }

    /// Check if this target runs a command.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Structural key a suppression record and its victims share.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingIdentity {
    pub command: String,
    pub sequence: KeySequence,
    pub context: Option<String>,
    pub when: Option<String>,
}

impl BindingIdentity {
    /// Identity of `binding` under its resolved key sequence.
    pub fn new(binding: &Keybinding, sequence: &KeySequence) -> Self {
        Self {
            command: binding.target().command().to_string(),
            sequence: sequence.clone(),
            context: binding.context.clone(),
            when: binding.when.clone(),
        }
    }
}

/// Binding layers; higher values take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeybindingScope {
    Default = 0,
    User = 1,
    Workspace = 2,
}

impl KeybindingScope {
    pub const COUNT: usize = 3;

    /// Scopes from highest to lowest precedence.
    pub fn by_precedence() -> [KeybindingScope; 3] {
        [Self::Workspace, Self::User, Self::Default]
    }

    /// Position of the scope in the per-scope tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for KeybindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::User => write!(f, "user"),
            Self::Workspace => write!(f, "workspace"),
        }
    }
}

/// A keybinding together with the scope it was registered in.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedKeybinding {
    pub binding: Keybinding,
    pub scope: KeybindingScope,
}

impl ScopedKeybinding {
    /// Get the bound command id.
    pub fn command(&self) -> &str {
        &self.binding.command
    }

    /// Get the key text.
    pub fn keybinding(&self) -> &str {
        &self.binding.keybinding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_parse() {
        assert_eq!(
            BindingTarget::parse("editor.save"),
            BindingTarget::Active("editor.save".to_string())
        );
        let suppression = BindingTarget::parse("-editor.save");
        assert_eq!(suppression, BindingTarget::Suppression("editor.save".to_string()));
        assert_eq!(suppression.command(), "editor.save");
        assert!(!suppression.is_active());
    }

    #[test]
    fn test_equals() {
        let a = Keybinding::new("save", "ctrl+s").with_args(json!({"force": true}));
        let b = Keybinding::new("save", "ctrl+s");
        assert!(!a.equals(&b, false, false));
        assert!(a.equals(&b, false, true));

        let c = Keybinding::new("save", "ctrl+shift+s");
        assert!(!b.equals(&c, false, false));
        assert!(b.equals(&c, true, false));

        let d = Keybinding::new("save", "ctrl+s").with_when("editorFocus");
        assert!(!b.equals(&d, true, true));
    }

    #[test]
    fn test_scope_order() {
        assert!(KeybindingScope::Workspace > KeybindingScope::User);
        assert_eq!(KeybindingScope::by_precedence()[0], KeybindingScope::Workspace);
        assert_eq!(KeybindingScope::User.index(), 1);
        assert_eq!(KeybindingScope::Default.to_string(), "default");
    }

    #[test]
    fn test_deserialize() {
        let binding: Keybinding = serde_json::from_value(json!({
            "command": "editor.fold",
            "keybinding": "ctrlcmd+k ctrlcmd+[",
            "when": "editorFocus"
        }))
        .unwrap();
        assert_eq!(binding.command, "editor.fold");
        assert_eq!(binding.when.as_deref(), Some("editorFocus"));
        assert!(binding.context.is_none());
        assert!(binding.args.is_none());
    }

    #[test]
    fn test_display() {
        let binding = Keybinding::new("save", "ctrl+s").with_when("editorFocus");
        assert_eq!(binding.to_string(), "ctrl+s -> save [when: editorFocus]");
    }
}
