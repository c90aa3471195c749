//! Error types.

use thiserror::Error;

/// Error parsing key notation such as `"ctrl+shift+a"` or `"ctrlcmd+k ctrlcmd+c"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Empty input or an empty token (`"ctrl+"`)
    #[error("can't parse empty keybinding")]
    Empty,
    /// Token is neither a modifier nor a known key
    #[error("can't parse keybinding '{0}': unknown token")]
    UnknownToken(String),
    /// The same token appears twice in one chord
    #[error("can't parse keybinding '{0}': duplicate modifiers")]
    DuplicateToken(String),
    /// `cmd`/`meta`/`macctrl` used on a non-macOS platform
    #[error("can't parse keybinding '{0}': modifier is for macOS only")]
    MacOnly(String),
    /// More than one non-modifier key in one chord
    #[error("can't parse keybinding '{0}': multiple keys in one chord")]
    MultipleKeys(String),
    /// A modifier follows the key
    #[error("can't parse keybinding '{0}': the key must be the last token")]
    KeyNotLast(String),
    /// A chord carries only modifiers
    #[error("can't parse keybinding '{0}': chord has no key")]
    MissingKey(String),
}

/// Error evaluating a when-expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("malformed when-expression '{expression}': {reason}")]
    Malformed { expression: String, reason: String },
}

/// Error executing a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("the command '{0}' cannot be executed: no active handler")]
    NoActiveHandler(String),
    #[error("command '{id}' failed: {message}")]
    Failed { id: String, message: String },
}

/// Error interpreting a raw keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("unrecognized keyboard event: {0}")]
    UnrecognizedEvent(String),
}

/// Errors surfaced by the keybinding registry and its configuration layer.
#[derive(Debug, Error)]
pub enum KeybindingError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A keymap was rejected as a whole; the scope keeps its previous bindings.
    #[error("invalid keymap: {count} binding(s) could not be parsed, first: {first}")]
    InvalidKeymap { count: usize, first: ParseError },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for KeybindingError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e.to_string())
    }
}

impl From<toml::ser::Error> for KeybindingError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Toml(e.to_string())
    }
}

/// Result type for keybinding operations.
pub type KeybindingResult<T> = Result<T, KeybindingError>;
