//! Key codes (one chord) and key sequences (multi-chord bindings).

use crate::key::{Key, KeyModifier, ModifierBit, Platform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single chord: an optional key plus modifier bits.
///
/// Equality is structural, so the order in which modifiers were written in
/// notation never matters. A key code without a key is "modifier-only"; it is
/// what a bare Shift or Ctrl keydown produces and never completes a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeyCode {
    /// The key, absent for modifier-only chords
    pub key: Option<Key>,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyCode {
    /// A key code with no modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    /// Build a key code from symbolic modifiers resolved for `platform`.
    pub fn from_modifiers(key: Key, modifiers: &[KeyModifier], platform: Platform) -> Self {
        let mut code = Self::new(key);
        for modifier in modifiers {
            match modifier {
                KeyModifier::CtrlCmd if platform.is_mac() => code.meta = true,
                KeyModifier::CtrlCmd => code.ctrl = true,
                KeyModifier::Shift => code.shift = true,
                KeyModifier::Alt => code.alt = true,
                KeyModifier::MacCtrl if platform.is_mac() => code.ctrl = true,
                KeyModifier::MacCtrl => {}
            }
        }
        code
    }

    /// Add Ctrl.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Add Shift.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Add Alt.
    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Add Meta.
    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub(crate) fn set_modifier(&mut self, bit: ModifierBit) {
        match bit {
            ModifierBit::Ctrl => self.ctrl = true,
            ModifierBit::Shift => self.shift = true,
            ModifierBit::Alt => self.alt = true,
            ModifierBit::Meta => self.meta = true,
        }
    }

    /// Check if any modifier is held.
    pub fn has_modifiers(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }

    /// True iff there is no key and at least one modifier is held.
    pub fn is_modifier_only(&self) -> bool {
        self.key.is_none() && self.has_modifiers()
    }

    /// Canonical notation: `meta+ctrl+alt+shift+key`.
    pub fn to_keystroke(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if self.meta {
            parts.push("meta");
        }
        if self.ctrl {
            parts.push("ctrl");
        }
        if self.alt {
            parts.push("alt");
        }
        if self.shift {
            parts.push("shift");
        }
        if let Some(key) = self.key {
            parts.push(key.easy_string());
        }

        write!(f, "{}", parts.join("+"))
    }
}

impl From<Key> for KeyCode {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// Outcome of comparing a typed candidate sequence against a bound reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareResult {
    /// Identical
    Full,
    /// Candidate is a proper prefix of the reference: keep listening
    Partial,
    /// Reference is a proper prefix of the candidate
    Shadow,
    /// Diverged
    None,
}

/// An ordered list of chords, e.g. `ctrl+k ctrl+c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeySequence {
    /// The chords in this sequence
    pub keys: Vec<KeyCode>,
}

impl KeySequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Create a single-chord sequence.
    pub fn single(key: KeyCode) -> Self {
        Self { keys: vec![key] }
    }

    /// Create a sequence from chords.
    pub fn from_keys(keys: Vec<KeyCode>) -> Self {
        Self { keys }
    }

    /// Append a chord.
    pub fn push(&mut self, key: KeyCode) {
        self.keys.push(key);
    }

    /// Remove all chords.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Check if no chord was pressed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of chords.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Iterate over the chords.
    pub fn iter(&self) -> impl Iterator<Item = &KeyCode> {
        self.keys.iter()
    }

    /// Compare `self` (typed so far) with `reference` (a bound sequence).
    ///
    /// Chords are compared element-wise up to the shorter length. An empty
    /// candidate is a prefix of everything, so it compares `Partial` against
    /// any non-empty reference; callers never ask that in practice.
    pub fn compare(&self, reference: &KeySequence) -> CompareResult {
        let shared = self.len().min(reference.len());
        if self.keys[..shared] != reference.keys[..shared] {
            return CompareResult::None;
        }

        match self.len().cmp(&reference.len()) {
            std::cmp::Ordering::Equal => CompareResult::Full,
            std::cmp::Ordering::Less => CompareResult::Partial,
            std::cmp::Ordering::Greater => CompareResult::Shadow,
        }
    }

    /// Check if this sequence starts with another sequence.
    pub fn starts_with(&self, prefix: &KeySequence) -> bool {
        matches!(
            prefix.compare(self),
            CompareResult::Full | CompareResult::Partial
        )
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.keys.iter().map(|k| k.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl From<KeyCode> for KeySequence {
    fn from(key: KeyCode) -> Self {
        Self::single(key)
    }
}

impl From<Vec<KeyCode>> for KeySequence {
    fn from(keys: Vec<KeyCode>) -> Self {
        Self { keys }
    }
}
