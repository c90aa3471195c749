//! Keybinding preferences and keymap ingestion.

use crate::binding::Keybinding;
use crate::error::KeybindingResult;
use crate::layout::DispatchMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// User preferences that shape how keys are dispatched and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeybindingPreferences {
    /// How literally raw keydowns are interpreted.
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
    /// Render accelerators with words instead of macOS symbols.
    #[serde(default)]
    pub ascii_accelerators: bool,
    /// Placed between chords in the "waiting for more keys" status.
    #[serde(default = "default_chord_separator")]
    pub chord_separator: String,
}

fn default_chord_separator() -> String {
    " ".to_string()
}

impl Default for KeybindingPreferences {
    fn default() -> Self {
        Self {
            dispatch_mode: DispatchMode::default(),
            ascii_accelerators: false,
            chord_separator: default_chord_separator(),
        }
    }
}

impl KeybindingPreferences {
    /// Parse preferences from TOML.
    pub fn from_toml_str(content: &str) -> KeybindingResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize preferences to TOML.
    pub fn to_toml_string(&self) -> KeybindingResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load preferences from file.
    pub fn load(path: &Path) -> KeybindingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save preferences to file.
    pub fn save(&self, path: &Path) -> KeybindingResult<()> {
        let content = self.to_toml_string()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Parse a keymap document: a JSON array of
/// `{command, keybinding, context?, when?, args?}` objects.
///
/// Key text is not validated here; that happens when the keymap is applied.
pub fn parse_keymap(json: &str) -> KeybindingResult<Vec<Keybinding>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeybindingError;
    use serde_json::json;

    #[test]
    fn test_default_preferences() {
        let prefs = KeybindingPreferences::default();
        assert_eq!(prefs.dispatch_mode, DispatchMode::Code);
        assert!(!prefs.ascii_accelerators);
        assert_eq!(prefs.chord_separator, " ");
    }

    #[test]
    fn test_partial_toml() {
        let prefs = KeybindingPreferences::from_toml_str("dispatch_mode = \"keycode\"").unwrap();
        assert_eq!(prefs.dispatch_mode, DispatchMode::KeyCode);
        assert_eq!(prefs.chord_separator, " ");

        let err = KeybindingPreferences::from_toml_str("dispatch_mode = \"scancode\"").unwrap_err();
        assert!(matches!(err, KeybindingError::Toml(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keybindings.toml");

        let prefs = KeybindingPreferences {
            dispatch_mode: DispatchMode::KeyCode,
            ascii_accelerators: true,
            chord_separator: ", ".to_string(),
        };
        prefs.save(&path).unwrap();

        assert_eq!(KeybindingPreferences::load(&path).unwrap(), prefs);
        assert!(matches!(
            KeybindingPreferences::load(&dir.path().join("missing.toml")),
            Err(KeybindingError::Io(_))
        ));
    }

    #[test]
    fn test_parse_keymap() {
        let keymap = parse_keymap(
            r#"[
                {"command": "editor.save", "keybinding": "ctrlcmd+s"},
                {"command": "-editor.fold", "keybinding": "ctrlcmd+k ctrlcmd+[", "when": "editorFocus"},
                {"command": "workbench.goto", "keybinding": "ctrl+g", "args": {"line": 1}}
            ]"#,
        )
        .unwrap();

        assert_eq!(keymap.len(), 3);
        assert_eq!(keymap[0], Keybinding::new("editor.save", "ctrlcmd+s"));
        assert!(!keymap[1].target().is_active());
        assert_eq!(keymap[2].args, Some(json!({"line": 1})));

        assert!(matches!(parse_keymap("{}"), Err(KeybindingError::Json(_))));
    }
}
