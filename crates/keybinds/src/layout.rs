//! Keyboard layout service: raw keyboard events in, layout-independent key codes out.

use crate::context::FocusTarget;
use crate::error::LayoutError;
use crate::key::Key;
use crate::keycode::KeyCode;
use crossterm::event::{
    KeyCode as TermKey, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// How literally a raw keydown is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Use the physical key position (`event.code`)
    #[default]
    Code,
    /// Use the character the key produced (`event.key`)
    KeyCode,
}

/// A raw keydown as delivered by the host toolkit.
#[derive(Debug, Clone, Default)]
pub struct KeyboardEvent {
    /// Physical key code, e.g. `"KeyA"`
    pub code: String,
    /// Produced character or key name, e.g. `"a"`, `"Enter"`
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    /// Part of an IME composition
    pub is_composing: bool,
    /// Element that had focus
    pub target: Option<FocusTarget>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyboardEvent {
    /// Create a keydown from a physical code and the produced key.
    pub fn new(code: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    /// Synthesize the event pressing `code` would produce under `layout`.
    pub fn from_key_code(code: KeyCode, layout: &dyn KeyboardLayout) -> Self {
        let (physical, produced) = match code.key {
            Some(key) => (key.code().to_string(), layout.keyboard_character(key)),
            None => (String::new(), String::new()),
        };
        Self {
            code: physical,
            key: produced,
            ctrl: code.ctrl,
            shift: code.shift,
            alt: code.alt,
            meta: code.meta,
            ..Self::default()
        }
    }

    /// Hold Ctrl.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Hold Shift.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Hold Alt.
    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Hold Meta.
    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Set the focused element.
    pub fn with_target(mut self, target: FocusTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Mark the event as handled.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Stop the event from reaching other listeners.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Check if the event was handled.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Check if propagation was stopped.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Notification that the active keyboard layout changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutChange {
    pub layout: String,
}

/// Maps physical key events to key codes under the live keyboard layout.
///
/// Every key code the core compares is expressed in physical positions:
/// events are converted to them here, and binding text (written in logical
/// keys) is mapped to them with [`resolve_key_code`](Self::resolve_key_code).
pub trait KeyboardLayout: Send + Sync {
    /// Build the key code for a keydown; fails on events it cannot interpret.
    fn key_code_from_event(
        &self,
        event: &KeyboardEvent,
        mode: DispatchMode,
    ) -> Result<KeyCode, LayoutError>;

    /// Map a key code written in logical keys to physical positions.
    fn resolve_key_code(&self, code: KeyCode) -> KeyCode;

    /// The character a physical key produces, for display.
    fn keyboard_character(&self, key: Key) -> String;

    /// Subscribe to layout changes.
    fn subscribe(&self) -> broadcast::Receiver<LayoutChange>;
}

#[derive(Debug)]
struct LayoutState {
    name: String,
    /// Logical key to the physical key that produces it
    remap: HashMap<Key, Key>,
}

/// US physical layout with a replaceable logical-to-physical remap table.
#[derive(Debug)]
pub struct StandardLayout {
    state: RwLock<LayoutState>,
    changes: broadcast::Sender<LayoutChange>,
}

impl StandardLayout {
    /// The identity (US) layout.
    pub fn us() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: RwLock::new(LayoutState {
                name: "us".to_string(),
                remap: HashMap::new(),
            }),
            changes,
        }
    }

    /// Build a symmetric remap from swapped key pairs, e.g. `(Y, Z)` for QWERTZ.
    pub fn swaps(pairs: &[(Key, Key)]) -> HashMap<Key, Key> {
        pairs
            .iter()
            .flat_map(|&(a, b)| [(a, b), (b, a)])
            .collect()
    }

    /// Replace the active layout and notify subscribers.
    pub fn set_layout(&self, name: impl Into<String>, remap: HashMap<Key, Key>) {
        let name = name.into();
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.name = name.clone();
            state.remap = remap;
        }
        // No subscribers is fine.
        let _ = self.changes.send(LayoutChange { layout: name });
    }

    /// Get the active layout name.
    pub fn name(&self) -> String {
        self.state.read().unwrap_or_else(|e| e.into_inner()).name.clone()
    }

    fn physical_for(&self, logical: Key) -> Key {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.remap.get(&logical).copied().unwrap_or(logical)
    }

    fn logical_for(&self, physical: Key) -> Key {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .remap
            .iter()
            .find(|(_, p)| **p == physical)
            .map(|(l, _)| *l)
            .unwrap_or(physical)
    }
}

impl Default for StandardLayout {
    fn default() -> Self {
        Self::us()
    }
}

impl KeyboardLayout for StandardLayout {
    fn key_code_from_event(
        &self,
        event: &KeyboardEvent,
        mode: DispatchMode,
    ) -> Result<KeyCode, LayoutError> {
        let by_code = || Key::from_code(&event.code);
        let by_key = || {
            let mut chars = event.key.chars();
            let logical = match (chars.next(), chars.next()) {
                (Some(c), None) => Key::from_character(c),
                _ => Key::from_token(&event.key),
            };
            logical.map(|key| self.physical_for(key))
        };

        let key = match mode {
            DispatchMode::Code => by_code().or_else(by_key),
            DispatchMode::KeyCode => by_key().or_else(by_code),
        }
        .ok_or_else(|| {
            LayoutError::UnrecognizedEvent(format!("code={:?} key={:?}", event.code, event.key))
        })?;

        let mut code = KeyCode {
            key: Some(key),
            ctrl: event.ctrl,
            shift: event.shift,
            alt: event.alt,
            meta: event.meta,
        };
        if let Some(bit) = key.modifier() {
            code.key = None;
            code.set_modifier(bit);
        }
        Ok(code)
    }

    fn resolve_key_code(&self, code: KeyCode) -> KeyCode {
        KeyCode {
            key: code.key.map(|key| self.physical_for(key)),
            ..code
        }
    }

    fn keyboard_character(&self, key: Key) -> String {
        let logical = self.logical_for(key);
        match logical.character() {
            Some(c) => c.to_string(),
            None => logical.label().to_string(),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LayoutChange> {
        self.changes.subscribe()
    }
}

/// Convert a crossterm key event; key releases yield `None`.
pub fn keyboard_event_from_crossterm(event: &TermKeyEvent) -> Option<KeyboardEvent> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let named = |key: Key| (key.code().to_string(), key.label().to_string());
    let (code, key, extra_shift) = match event.code {
        TermKey::Char(' ') => (Key::Space.code().to_string(), " ".to_string(), false),
        // Terminals report the produced character only; the layout maps it
        // back to a physical key.
        TermKey::Char(c) => (String::new(), c.to_string(), false),
        TermKey::F(n) => (format!("F{}", n), format!("F{}", n), false),
        TermKey::BackTab => {
            let (code, key) = named(Key::Tab);
            (code, key, true)
        }
        TermKey::Modifier(modifier) => {
            let key = match modifier {
                ModifierKeyCode::LeftShift => Key::ShiftLeft,
                ModifierKeyCode::RightShift => Key::ShiftRight,
                ModifierKeyCode::LeftControl => Key::ControlLeft,
                ModifierKeyCode::RightControl => Key::ControlRight,
                ModifierKeyCode::LeftAlt => Key::AltLeft,
                ModifierKeyCode::RightAlt => Key::AltRight,
                ModifierKeyCode::LeftSuper | ModifierKeyCode::LeftMeta => Key::MetaLeft,
                ModifierKeyCode::RightSuper | ModifierKeyCode::RightMeta => Key::MetaRight,
                _ => return None,
            };
            let (code, key) = named(key);
            (code, key, false)
        }
        other => {
            let key = match other {
                TermKey::Backspace => Key::Backspace,
                TermKey::Enter => Key::Enter,
                TermKey::Left => Key::ArrowLeft,
                TermKey::Right => Key::ArrowRight,
                TermKey::Up => Key::ArrowUp,
                TermKey::Down => Key::ArrowDown,
                TermKey::Home => Key::Home,
                TermKey::End => Key::End,
                TermKey::PageUp => Key::PageUp,
                TermKey::PageDown => Key::PageDown,
                TermKey::Tab => Key::Tab,
                TermKey::Delete => Key::Delete,
                TermKey::Insert => Key::Insert,
                TermKey::Esc => Key::Escape,
                _ => return None,
            };
            let (code, key) = named(key);
            (code, key, false)
        }
    };

    let mods = event.modifiers;
    Some(KeyboardEvent {
        code,
        key,
        ctrl: mods.contains(KeyModifiers::CONTROL),
        shift: mods.contains(KeyModifiers::SHIFT) || extra_shift,
        alt: mods.contains(KeyModifiers::ALT),
        meta: mods.contains(KeyModifiers::SUPER) || mods.contains(KeyModifiers::META),
        ..KeyboardEvent::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mode_uses_physical_key() {
        let layout = StandardLayout::us();
        let event = KeyboardEvent::new("KeyA", "a").with_ctrl();
        let code = layout.key_code_from_event(&event, DispatchMode::Code).unwrap();
        assert_eq!(code, KeyCode::new(Key::A).with_ctrl());
    }

    #[test]
    fn test_modifier_keydown_is_modifier_only() {
        let layout = StandardLayout::us();
        let event = KeyboardEvent::new("ShiftLeft", "Shift").with_shift();
        let code = layout.key_code_from_event(&event, DispatchMode::Code).unwrap();
        assert!(code.is_modifier_only());
        assert!(code.shift);
    }

    #[test]
    fn test_unrecognized_event() {
        let layout = StandardLayout::us();
        let event = KeyboardEvent::new("IntlRo", "ろ");
        assert!(layout.key_code_from_event(&event, DispatchMode::Code).is_err());
    }

    #[test]
    fn test_remapped_layout() {
        let layout = StandardLayout::us();
        let mut changes = layout.subscribe();
        layout.set_layout("de", StandardLayout::swaps(&[(Key::Y, Key::Z)]));

        assert_eq!(changes.try_recv().unwrap().layout, "de");
        assert_eq!(layout.name(), "de");

        // "ctrl+z" is typed on the physical Y key of a German keyboard.
        let resolved = layout.resolve_key_code(KeyCode::new(Key::Z).with_ctrl());
        assert_eq!(resolved.key, Some(Key::Y));
        assert_eq!(layout.keyboard_character(Key::Y), "z");

        // The produced character maps back to the same physical key.
        let event = KeyboardEvent::new("KeyY", "z").with_ctrl();
        let by_key = layout.key_code_from_event(&event, DispatchMode::KeyCode).unwrap();
        let by_code = layout.key_code_from_event(&event, DispatchMode::Code).unwrap();
        assert_eq!(by_key, by_code);
    }

    #[test]
    fn test_keyboard_character_labels() {
        let layout = StandardLayout::us();
        assert_eq!(layout.keyboard_character(Key::A), "a");
        assert_eq!(layout.keyboard_character(Key::PageDown), "PageDown");
        assert_eq!(layout.keyboard_character(Key::Space), "Space");
    }

    #[test]
    fn test_event_flags() {
        let mut event = KeyboardEvent::new("KeyA", "a");
        assert!(!event.default_prevented());
        event.prevent_default();
        event.stop_propagation();
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
    }

    #[test]
    fn test_from_crossterm() {
        let event = TermKeyEvent::new(TermKey::Char('k'), KeyModifiers::CONTROL);
        let converted = keyboard_event_from_crossterm(&event).unwrap();
        assert_eq!(converted.code, "");
        assert_eq!(converted.key, "k");
        assert!(converted.ctrl);

        let layout = StandardLayout::us();
        let code = layout.key_code_from_event(&converted, DispatchMode::Code).unwrap();
        assert_eq!(code, KeyCode::new(Key::K).with_ctrl());

        let back_tab = TermKeyEvent::new(TermKey::BackTab, KeyModifiers::SHIFT);
        let converted = keyboard_event_from_crossterm(&back_tab).unwrap();
        assert_eq!(converted.code, "Tab");
        assert!(converted.shift);

        let mut release = TermKeyEvent::new(TermKey::Char('k'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(keyboard_event_from_crossterm(&release).is_none());
    }

    #[test]
    fn test_terminal_char_follows_layout() {
        let layout = StandardLayout::us();
        layout.set_layout("de", StandardLayout::swaps(&[(Key::Y, Key::Z)]));

        let event = TermKeyEvent::new(TermKey::Char('z'), KeyModifiers::CONTROL);
        let converted = keyboard_event_from_crossterm(&event).unwrap();
        let code = layout.key_code_from_event(&converted, DispatchMode::Code).unwrap();
        assert_eq!(code, layout.resolve_key_code(KeyCode::new(Key::Z).with_ctrl()));
        assert_eq!(code.key, Some(Key::Y));
    }
}
