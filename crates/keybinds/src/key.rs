//! Physical key identities, symbolic modifiers and the platform predicate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The platform the keybindings are resolved for.
///
/// This is the only place where macOS and other platforms diverge: it decides
/// whether `cmd`/`meta` are legal in key notation and what `ctrlcmd` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    is_mac: bool,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self {
            is_mac: cfg!(target_os = "macos"),
        }
    }

    /// The macOS platform.
    pub const fn mac() -> Self {
        Self { is_mac: true }
    }

    /// Any platform other than macOS.
    pub const fn other() -> Self {
        Self { is_mac: false }
    }

    /// Check if this is macOS.
    pub const fn is_mac(self) -> bool {
        self.is_mac
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Symbolic modifiers, resolved against a [`Platform`] when building a key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyModifier {
    /// M1: Cmd on macOS, Ctrl elsewhere
    CtrlCmd,
    /// M2
    Shift,
    /// M3: Alt / Option
    Alt,
    /// M4: Ctrl on macOS, no-op elsewhere
    MacCtrl,
}

impl KeyModifier {
    /// Get the physical key code.
    pub fn id(self) -> &'static str {
        match self {
            Self::CtrlCmd => "M1",
            Self::Shift => "M2",
            Self::Alt => "M3",
            Self::MacCtrl => "M4",
        }
    }
}

/// A physical modifier bit carried by a key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierBit {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

macro_rules! keys {
    ($( $variant:ident => $code:literal, $easy:literal, $label:literal; )*) => {
        /// A layout-independent key identity.
        ///
        /// Keys are named after the physical position they occupy on a US
        /// keyboard (the DOM `code` naming); the character they produce is a
        /// concern of the keyboard layout.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Key {
            $($variant,)*
        }

        impl Key {
            pub const ALL: &'static [Key] = &[$(Key::$variant,)*];

            /// Physical code, e.g. `"KeyA"`, `"ArrowLeft"`.
            pub fn code(self) -> &'static str {
                match self {
                    $(Key::$variant => $code,)*
                }
            }

            /// Lowercase token used in key notation, e.g. `"a"`, `"left"`.
            pub fn easy_string(self) -> &'static str {
                match self {
                    $(Key::$variant => $easy,)*
                }
            }

            /// Human-readable name for non-printable keys.
            pub fn label(self) -> &'static str {
                match self {
                    $(Key::$variant => $label,)*
                }
            }
        }
    };
}

keys! {
    Backspace => "Backspace", "backspace", "Backspace";
    Tab => "Tab", "tab", "Tab";
    Enter => "Enter", "enter", "Enter";
    Escape => "Escape", "escape", "Escape";
    Space => "Space", "space", "Space";
    PageUp => "PageUp", "pageup", "PageUp";
    PageDown => "PageDown", "pagedown", "PageDown";
    End => "End", "end", "End";
    Home => "Home", "home", "Home";
    ArrowLeft => "ArrowLeft", "left", "Left";
    ArrowUp => "ArrowUp", "up", "Up";
    ArrowRight => "ArrowRight", "right", "Right";
    ArrowDown => "ArrowDown", "down", "Down";
    Insert => "Insert", "insert", "Insert";
    Delete => "Delete", "delete", "Delete";
    ShiftLeft => "ShiftLeft", "shiftleft", "Shift";
    ShiftRight => "ShiftRight", "shiftright", "Shift";
    ControlLeft => "ControlLeft", "controlleft", "Ctrl";
    ControlRight => "ControlRight", "controlright", "Ctrl";
    AltLeft => "AltLeft", "altleft", "Alt";
    AltRight => "AltRight", "altright", "Alt";
    MetaLeft => "MetaLeft", "metaleft", "Meta";
    MetaRight => "MetaRight", "metaright", "Meta";
    Digit0 => "Digit0", "0", "0";
    Digit1 => "Digit1", "1", "1";
    Digit2 => "Digit2", "2", "2";
    Digit3 => "Digit3", "3", "3";
    Digit4 => "Digit4", "4", "4";
    Digit5 => "Digit5", "5", "5";
    Digit6 => "Digit6", "6", "6";
    Digit7 => "Digit7", "7", "7";
    Digit8 => "Digit8", "8", "8";
    Digit9 => "Digit9", "9", "9";
    A => "KeyA", "a", "A";
    B => "KeyB", "b", "B";
    C => "KeyC", "c", "C";
    D => "KeyD", "d", "D";
    E => "KeyE", "e", "E";
    F => "KeyF", "f", "F";
    G => "KeyG", "g", "G";
    H => "KeyH", "h", "H";
    I => "KeyI", "i", "I";
    J => "KeyJ", "j", "J";
    K => "KeyK", "k", "K";
    L => "KeyL", "l", "L";
    M => "KeyM", "m", "M";
    N => "KeyN", "n", "N";
    O => "KeyO", "o", "O";
    P => "KeyP", "p", "P";
    Q => "KeyQ", "q", "Q";
    R => "KeyR", "r", "R";
    S => "KeyS", "s", "S";
    T => "KeyT", "t", "T";
    U => "KeyU", "u", "U";
    V => "KeyV", "v", "V";
    W => "KeyW", "w", "W";
    X => "KeyX", "x", "X";
    Y => "KeyY", "y", "Y";
    Z => "KeyZ", "z", "Z";
    F1 => "F1", "f1", "F1";
    F2 => "F2", "f2", "F2";
    F3 => "F3", "f3", "F3";
    F4 => "F4", "f4", "F4";
    F5 => "F5", "f5", "F5";
    F6 => "F6", "f6", "F6";
    F7 => "F7", "f7", "F7";
    F8 => "F8", "f8", "F8";
    F9 => "F9", "f9", "F9";
    F10 => "F10", "f10", "F10";
    F11 => "F11", "f11", "F11";
    F12 => "F12", "f12", "F12";
    F13 => "F13", "f13", "F13";
    F14 => "F14", "f14", "F14";
    F15 => "F15", "f15", "F15";
    F16 => "F16", "f16", "F16";
    F17 => "F17", "f17", "F17";
    F18 => "F18", "f18", "F18";
    F19 => "F19", "f19", "F19";
    F20 => "F20", "f20", "F20";
    F21 => "F21", "f21", "F21";
    F22 => "F22", "f22", "F22";
    F23 => "F23", "f23", "F23";
    F24 => "F24", "f24", "F24";
    Semicolon => "Semicolon", ";", ";";
    Equal => "Equal", "=", "=";
    Comma => "Comma", ",", ",";
    Minus => "Minus", "-", "-";
    Period => "Period", ".", ".";
    Slash => "Slash", "/", "/";
    Backquote => "Backquote", "`", "`";
    BracketLeft => "BracketLeft", "[", "[";
    Backslash => "Backslash", "\\", "\\";
    BracketRight => "BracketRight", "]", "]";
    Quote => "Quote", "'", "'";
    Numpad0 => "Numpad0", "numpad0", "Numpad0";
    Numpad1 => "Numpad1", "numpad1", "Numpad1";
    Numpad2 => "Numpad2", "numpad2", "Numpad2";
    Numpad3 => "Numpad3", "numpad3", "Numpad3";
    Numpad4 => "Numpad4", "numpad4", "Numpad4";
    Numpad5 => "Numpad5", "numpad5", "Numpad5";
    Numpad6 => "Numpad6", "numpad6", "Numpad6";
    Numpad7 => "Numpad7", "numpad7", "Numpad7";
    Numpad8 => "Numpad8", "numpad8", "Numpad8";
    Numpad9 => "Numpad9", "numpad9", "Numpad9";
    NumpadAdd => "NumpadAdd", "numpad_add", "Numpad+";
    NumpadSubtract => "NumpadSubtract", "numpad_subtract", "Numpad-";
    NumpadMultiply => "NumpadMultiply", "numpad_multiply", "Numpad*";
    NumpadDivide => "NumpadDivide", "numpad_divide", "Numpad/";
    NumpadDecimal => "NumpadDecimal", "numpad_decimal", "Numpad.";
    NumpadEnter => "NumpadEnter", "numpad_enter", "NumpadEnter";
}

/// Extra spellings accepted in key notation.
const KEY_ALIASES: &[(&str, Key)] = &[
    ("esc", Key::Escape),
    ("return", Key::Enter),
    ("del", Key::Delete),
    ("ins", Key::Insert),
    ("pgup", Key::PageUp),
    ("pgdown", Key::PageDown),
    ("pgdn", Key::PageDown),
    ("arrowleft", Key::ArrowLeft),
    ("arrowup", Key::ArrowUp),
    ("arrowright", Key::ArrowRight),
    ("arrowdown", Key::ArrowDown),
];

impl Key {
    /// Look up a key by its exact physical code (`"KeyA"`).
    pub fn from_code(code: &str) -> Option<Key> {
        Key::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// Look up a key from a notation token, case-insensitively.
    ///
    /// Accepts easy strings (`"a"`, `"pageup"`), aliases (`"esc"`) and
    /// physical codes (`"KeyA"`, `"ControlLeft"`).
    pub fn from_token(token: &str) -> Option<Key> {
        let token = token.to_lowercase();
        Key::ALL
            .iter()
            .copied()
            .find(|k| k.easy_string() == token || k.code().eq_ignore_ascii_case(&token))
            .or_else(|| {
                KEY_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == token)
                    .map(|(_, key)| *key)
            })
    }

    /// Look up the key that produces `c` on a US layout.
    pub fn from_character(c: char) -> Option<Key> {
        if c == ' ' {
            return Some(Key::Space);
        }
        let c = c.to_ascii_lowercase();
        Key::ALL.iter().copied().find(|k| k.character() == Some(c))
    }

    /// The character this key produces on a US layout, if printable.
    pub fn character(self) -> Option<char> {
        let easy = self.easy_string();
        let mut chars = easy.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    /// Check if this is a letter key.
    pub fn is_letter(self) -> bool {
        (Key::A..=Key::Z).contains(&self)
    }

    /// Check if this is a function key.
    pub fn is_function_key(self) -> bool {
        (Key::F1..=Key::F24).contains(&self)
    }

    /// The modifier bit this key sets, if it is itself a modifier key.
    pub fn modifier(self) -> Option<ModifierBit> {
        match self {
            Key::ShiftLeft | Key::ShiftRight => Some(ModifierBit::Shift),
            Key::ControlLeft | Key::ControlRight => Some(ModifierBit::Ctrl),
            Key::AltLeft | Key::AltRight => Some(ModifierBit::Alt),
            Key::MetaLeft | Key::MetaRight => Some(ModifierBit::Meta),
            _ => None,
        }
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(self) -> bool {
        self.modifier().is_some()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.easy_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_token() {
        assert_eq!(Key::from_token("a"), Some(Key::A));
        assert_eq!(Key::from_token("A"), Some(Key::A));
        assert_eq!(Key::from_token("KeyA"), Some(Key::A));
        assert_eq!(Key::from_token("esc"), Some(Key::Escape));
        assert_eq!(Key::from_token("PageDown"), Some(Key::PageDown));
        assert_eq!(Key::from_token("controlleft"), Some(Key::ControlLeft));
        assert_eq!(Key::from_token("invalid"), None);
    }

    #[test]
    fn test_lookup_by_code() {
        assert_eq!(Key::from_code("Digit7"), Some(Key::Digit7));
        assert_eq!(Key::from_code("digit7"), None);
    }

    #[test]
    fn test_characters() {
        assert_eq!(Key::A.character(), Some('a'));
        assert_eq!(Key::Backslash.character(), Some('\\'));
        assert_eq!(Key::Enter.character(), None);
        assert_eq!(Key::from_character('Q'), Some(Key::Q));
        assert_eq!(Key::from_character(' '), Some(Key::Space));
        assert_eq!(Key::from_character('/'), Some(Key::Slash));
    }

    #[test]
    fn test_classification() {
        assert!(Key::M.is_letter());
        assert!(!Key::Digit1.is_letter());
        assert!(Key::F24.is_function_key());
        assert!(!Key::Numpad1.is_function_key());
        assert_eq!(Key::ControlRight.modifier(), Some(ModifierBit::Ctrl));
        assert!(!Key::Space.is_modifier());
    }

    #[test]
    fn test_platform() {
        assert!(Platform::mac().is_mac());
        assert!(!Platform::other().is_mac());
        assert_eq!(KeyModifier::CtrlCmd.id(), "M1");
        assert_eq!(KeyModifier::MacCtrl.id(), "M4");
    }
}
