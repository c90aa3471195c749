//! Collision detection between keybindings.

use crate::binding::{Keybinding, ScopedKeybinding};
use crate::keycode::{CompareResult, KeySequence};

/// Bindings related to one key sequence, grouped by how they compare to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeybindingsResult {
    /// Bindings the sequence completes, from the highest scope that has any
    pub full: Vec<ScopedKeybinding>,
    /// Bindings the sequence is a prefix of
    pub partial: Vec<ScopedKeybinding>,
    /// Bindings that are a prefix of the sequence
    pub shadow: Vec<ScopedKeybinding>,
}

impl KeybindingsResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing relates to the sequence.
    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.partial.is_empty() && self.shadow.is_empty()
    }

    /// Check if any binding is in conflict with the sequence.
    pub fn has_collision(&self) -> bool {
        !self.is_empty()
    }
}

impl std::fmt::Display for KeybindingsResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No conflicts detected");
        }

        for (label, bindings) in [
            ("FULL", &self.full),
            ("PARTIAL", &self.partial),
            ("SHADOW", &self.shadow),
        ] {
            for scoped in bindings {
                writeln!(
                    f,
                    "[{}] '{}' from {}",
                    label, scoped.binding, scoped.scope
                )?;
            }
        }

        Ok(())
    }
}

/// An existing binding a new one would collide with.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// The binding already registered
    pub existing: ScopedKeybinding,
    /// How the new sequence compares to the existing one
    pub relation: CompareResult,
}

impl std::fmt::Display for Collision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let relation = match self.relation {
            CompareResult::Full => "same keys as",
            CompareResult::Partial => "prefix of",
            CompareResult::Shadow => "shadowed by",
            CompareResult::None => "unrelated to",
        };
        write!(
            f,
            "{} '{}' in {} scope",
            relation, self.existing.binding, self.existing.scope
        )
    }
}

/// Two bindings compete for the same keys only when they share a legacy
/// context and neither is narrowed by a when-expression.
pub fn same_profile(a: &Keybinding, b: &Keybinding) -> bool {
    a.context == b.context && a.when.is_none() && b.when.is_none()
}

/// Any relation other than `None` is a collision.
pub fn collision_between(candidate: &KeySequence, existing: &KeySequence) -> Option<CompareResult> {
    match candidate.compare(existing) {
        CompareResult::None => None,
        relation => Some(relation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::KeybindingScope;
    use crate::key::Platform;
    use crate::parser::parse_sequence;

    fn seq(text: &str) -> KeySequence {
        parse_sequence(text, Platform::other()).unwrap()
    }

    #[test]
    fn test_collision_relations() {
        assert_eq!(collision_between(&seq("ctrl+b"), &seq("ctrl+b")), Some(CompareResult::Full));
        assert_eq!(
            collision_between(&seq("ctrl+b"), &seq("ctrl+b a")),
            Some(CompareResult::Partial)
        );
        assert_eq!(
            collision_between(&seq("ctrl+b a"), &seq("ctrl+b")),
            Some(CompareResult::Shadow)
        );
        assert_eq!(collision_between(&seq("ctrl+b"), &seq("ctrl+c")), None);
    }

    #[test]
    fn test_same_profile() {
        let plain = Keybinding::new("a", "ctrl+b");
        assert!(same_profile(&plain, &Keybinding::new("b", "ctrl+b")));
        assert!(!same_profile(&plain, &Keybinding::new("b", "ctrl+b").with_when("editorFocus")));
        assert!(!same_profile(&plain, &Keybinding::new("b", "ctrl+b").with_context("terminal")));
    }

    #[test]
    fn test_result_display() {
        let mut result = KeybindingsResult::new();
        assert!(!result.has_collision());
        assert_eq!(result.to_string(), "No conflicts detected");

        result.full.push(ScopedKeybinding {
            binding: Keybinding::new("save", "ctrl+s"),
            scope: KeybindingScope::User,
        });
        result.shadow.push(ScopedKeybinding {
            binding: Keybinding::new("sync", "ctrl+s ctrl+y"),
            scope: KeybindingScope::Default,
        });

        let display = result.to_string();
        assert!(result.has_collision());
        assert!(display.contains("[FULL] 'ctrl+s -> save' from user"));
        assert!(display.contains("[SHADOW] 'ctrl+s ctrl+y -> sync' from default"));
    }

    #[test]
    fn test_collision_display() {
        let collision = Collision {
            existing: ScopedKeybinding {
                binding: Keybinding::new("cmd", "ctrl+b a"),
                scope: KeybindingScope::Default,
            },
            relation: CompareResult::Partial,
        };
        assert_eq!(collision.to_string(), "prefix of 'ctrl+b a -> cmd' in default scope");
    }
}
