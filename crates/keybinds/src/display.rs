//! Accelerator rendering: key codes as shortcut labels.

use crate::key::{Key, ModifierBit, Platform};
use crate::keycode::{KeyCode, KeySequence};
use crate::layout::KeyboardLayout;
use serde::{Deserialize, Serialize};

/// Format for displaying key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDisplayFormat {
    /// Unicode symbols: ⌘S, ⌃P, ⇧Tab
    Symbolic,
    /// Text labels: Ctrl+S, Alt+P, Shift+Tab
    #[default]
    Text,
}

impl KeyDisplayFormat {
    /// Symbols on macOS unless ASCII output is requested, words elsewhere.
    pub fn for_platform(platform: Platform, ascii_only: bool) -> Self {
        if platform.is_mac() && !ascii_only {
            Self::Symbolic
        } else {
            Self::Text
        }
    }
}

/// Configuration for key display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDisplayConfig {
    /// Display format
    pub format: KeyDisplayFormat,
    /// Platform the labels are rendered for
    pub platform: Platform,
}

impl KeyDisplayConfig {
    /// Pick the display format for a platform.
    pub fn new(platform: Platform, ascii_only: bool) -> Self {
        Self {
            format: KeyDisplayFormat::for_platform(platform, ascii_only),
            platform,
        }
    }

    /// Create a symbolic display config.
    pub fn symbolic(platform: Platform) -> Self {
        Self {
            format: KeyDisplayFormat::Symbolic,
            platform,
        }
    }

    /// Create a text display config.
    pub fn text(platform: Platform) -> Self {
        Self {
            format: KeyDisplayFormat::Text,
            platform,
        }
    }

    /// Format a modifier.
    pub fn format_modifier(&self, modifier: ModifierBit) -> &'static str {
        match (self.format, modifier) {
            (KeyDisplayFormat::Symbolic, ModifierBit::Meta) => "\u{2318}",
            (KeyDisplayFormat::Symbolic, ModifierBit::Ctrl) => "\u{2303}",
            (KeyDisplayFormat::Symbolic, ModifierBit::Alt) => "\u{2325}",
            (KeyDisplayFormat::Symbolic, ModifierBit::Shift) => "\u{21e7}",
            (KeyDisplayFormat::Text, ModifierBit::Meta) if self.platform.is_mac() => "Cmd",
            (KeyDisplayFormat::Text, ModifierBit::Meta) => "Meta",
            (KeyDisplayFormat::Text, ModifierBit::Ctrl) => "Ctrl",
            (KeyDisplayFormat::Text, ModifierBit::Alt) => "Alt",
            (KeyDisplayFormat::Text, ModifierBit::Shift) => "Shift",
        }
    }

    /// Format a physical key as the character it produces under `layout`.
    pub fn format_key(&self, key: Key, layout: &dyn KeyboardLayout) -> String {
        if self.format == KeyDisplayFormat::Symbolic {
            if let Some(symbol) = key_symbol(key) {
                return symbol.to_string();
            }
        }

        let character = layout.keyboard_character(key);
        if key.is_letter() || key.is_function_key() {
            return character.to_uppercase();
        }

        let mut chars = character.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => character,
        }
    }

    /// Modifier labels in `meta, ctrl, alt, shift` order, then the key.
    pub fn components(&self, code: &KeyCode, layout: &dyn KeyboardLayout) -> Vec<String> {
        let mut components = Vec::new();

        for (held, modifier) in [
            (code.meta, ModifierBit::Meta),
            (code.ctrl, ModifierBit::Ctrl),
            (code.alt, ModifierBit::Alt),
            (code.shift, ModifierBit::Shift),
        ] {
            if held {
                components.push(self.format_modifier(modifier).to_string());
            }
        }
        if let Some(key) = code.key {
            components.push(self.format_key(key, layout));
        }

        components
    }

    /// One chord as a single label, components joined by `separator`.
    pub fn accelerator(&self, code: &KeyCode, layout: &dyn KeyboardLayout, separator: &str) -> String {
        self.components(code, layout).join(separator)
    }

    /// One label per chord.
    pub fn accelerator_for_sequence(
        &self,
        sequence: &KeySequence,
        layout: &dyn KeyboardLayout,
        separator: &str,
    ) -> Vec<String> {
        sequence
            .iter()
            .map(|code| self.accelerator(code, layout, separator))
            .collect()
    }
}

fn key_symbol(key: Key) -> Option<&'static str> {
    Some(match key {
        Key::Enter => "\u{23ce}",
        Key::Escape => "\u{238b}",
        Key::Tab => "\u{21e5}",
        Key::Backspace => "\u{232b}",
        Key::Delete => "\u{2326}",
        Key::Space => "\u{2423}",
        Key::ArrowUp => "\u{2191}",
        Key::ArrowDown => "\u{2193}",
        Key::ArrowLeft => "\u{2190}",
        Key::ArrowRight => "\u{2192}",
        Key::Home => "\u{21f1}",
        Key::End => "\u{21f2}",
        Key::PageUp => "\u{21de}",
        Key::PageDown => "\u{21df}",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StandardLayout;
    use crate::parser::{parse_keystroke, parse_sequence};

    fn render(text: &str, platform: Platform, ascii_only: bool, separator: &str) -> String {
        let layout = StandardLayout::us();
        let code = parse_keystroke(text, platform).unwrap();
        KeyDisplayConfig::new(platform, ascii_only).accelerator(&code, &layout, separator)
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(
            KeyDisplayFormat::for_platform(Platform::mac(), false),
            KeyDisplayFormat::Symbolic
        );
        assert_eq!(
            KeyDisplayFormat::for_platform(Platform::mac(), true),
            KeyDisplayFormat::Text
        );
        assert_eq!(
            KeyDisplayFormat::for_platform(Platform::other(), false),
            KeyDisplayFormat::Text
        );
    }

    #[test]
    fn test_text_format() {
        let other = Platform::other();
        insta::assert_snapshot!(render("alt+ctrl+pagedown", other, false, "+"), @"Ctrl+Alt+PageDown");
        insta::assert_snapshot!(render("shift+f5", other, false, "+"), @"Shift+F5");
        insta::assert_snapshot!(render("ctrl+1", other, false, "+"), @"Ctrl+1");
        insta::assert_snapshot!(render("ctrl+[", other, false, "+"), @"Ctrl+[");
        insta::assert_snapshot!(render("ctrl+space", other, false, "+"), @"Ctrl+Space");
    }

    #[test]
    fn test_symbolic_format() {
        let mac = Platform::mac();
        insta::assert_snapshot!(render("cmd+shift+k", mac, false, ""), @"⌘⇧K");
        insta::assert_snapshot!(render("macctrl+alt+up", mac, false, ""), @"⌃⌥↑");
        insta::assert_snapshot!(render("cmd+shift+k", mac, true, "+"), @"Cmd+Shift+K");
    }

    #[test]
    fn test_sequence_labels() {
        let layout = StandardLayout::us();
        let platform = Platform::other();
        let sequence = parse_sequence("ctrlcmd+k ctrlcmd+c", platform).unwrap();
        let labels = KeyDisplayConfig::new(platform, false).accelerator_for_sequence(&sequence, &layout, "+");
        assert_eq!(labels, vec!["Ctrl+K", "Ctrl+C"]);
    }

    #[test]
    fn test_labels_follow_layout() {
        let layout = StandardLayout::us();
        layout.set_layout("de", StandardLayout::swaps(&[(Key::Y, Key::Z)]));

        // Physical Y produces "z" on a German keyboard.
        let code = KeyCode::new(Key::Y).with_ctrl();
        let label = KeyDisplayConfig::text(Platform::other()).accelerator(&code, &layout, "+");
        assert_eq!(label, "Ctrl+Z");
    }
}
