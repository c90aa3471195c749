//! Key notation parser.

use crate::error::ParseError;
use crate::key::{Key, ModifierBit, Platform};
use crate::keycode::{KeyCode, KeySequence};
use std::collections::HashSet;

/// Parse one chord into a [`KeyCode`].
///
/// Tokens are separated by `+` and matched case-insensitively:
/// - `"ctrl"`, `"control"` - Ctrl
/// - `"shift"` - Shift
/// - `"alt"`, `"option"` - Alt
/// - `"ctrlcmd"` - Cmd on macOS, Ctrl elsewhere
/// - `"cmd"`, `"command"`, `"meta"` - Cmd (macOS only)
/// - `"macctrl"` - Ctrl (macOS only)
/// - anything [`Key::from_token`] knows, which must be the last token
pub fn parse_keystroke(text: &str, platform: Platform) -> Result<KeyCode, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered.split('+').map(str::trim).collect();

    let mut seen = HashSet::new();
    for token in &tokens {
        if token.is_empty() {
            return Err(ParseError::Empty);
        }
        if !seen.insert(*token) {
            return Err(ParseError::DuplicateToken(text.to_string()));
        }
    }

    let mut code = KeyCode::default();
    for (index, token) in tokens.iter().enumerate() {
        if let Some(bit) = modifier_token(token, text, platform)? {
            if code.key.is_some() {
                return Err(ParseError::KeyNotLast(text.to_string()));
            }
            code.set_modifier(bit);
            continue;
        }

        let key = Key::from_token(token).ok_or_else(|| ParseError::UnknownToken(text.to_string()))?;

        // `ControlLeft+a` spells a modifier through its physical key name.
        if let Some(bit) = key.modifier() {
            if bit == ModifierBit::Meta && !platform.is_mac() {
                return Err(ParseError::MacOnly(text.to_string()));
            }
            if code.key.is_some() {
                return Err(ParseError::KeyNotLast(text.to_string()));
            }
            code.set_modifier(bit);
            continue;
        }

        if code.key.is_some() {
            return Err(ParseError::MultipleKeys(text.to_string()));
        }
        if index != tokens.len() - 1 && !is_modifier_tail(&tokens[index + 1..], platform) {
            return Err(ParseError::MultipleKeys(text.to_string()));
        }
        code.key = Some(key);
    }

    Ok(code)
}

/// Parse a whitespace separated list of chords.
///
/// Every chord must contain a key: a bare `"ctrl"` can never be completed by
/// a keydown, so it is rejected here rather than silently never matching.
pub fn parse_sequence(text: &str, platform: Platform) -> Result<KeySequence, ParseError> {
    let mut sequence = KeySequence::new();
    for chord in text.split_whitespace() {
        let code = parse_keystroke(chord, platform)?;
        if code.key.is_none() {
            return Err(ParseError::MissingKey(chord.to_string()));
        }
        sequence.push(code);
    }

    if sequence.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(sequence)
}

fn modifier_token(
    token: &str,
    text: &str,
    platform: Platform,
) -> Result<Option<ModifierBit>, ParseError> {
    let bit = match token {
        "ctrl" | "control" => ModifierBit::Ctrl,
        "shift" => ModifierBit::Shift,
        "alt" | "option" => ModifierBit::Alt,
        "ctrlcmd" if platform.is_mac() => ModifierBit::Meta,
        "ctrlcmd" => ModifierBit::Ctrl,
        "cmd" | "command" | "meta" if platform.is_mac() => ModifierBit::Meta,
        "macctrl" if platform.is_mac() => ModifierBit::Ctrl,
        "cmd" | "command" | "meta" | "macctrl" => {
            return Err(ParseError::MacOnly(text.to_string()))
        }
        _ => return Ok(None),
    };
    Ok(Some(bit))
}

// Tokens after the key are only legal when they are modifiers, which is
// reported as `KeyNotLast` by the caller rather than `MultipleKeys`.
fn is_modifier_tail(rest: &[&str], platform: Platform) -> bool {
    rest.iter().all(|token| {
        matches!(modifier_token(token, token, platform), Ok(Some(_)) | Err(_))
            || Key::from_token(token).is_some_and(Key::is_modifier)
    })
}
