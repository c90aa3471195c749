//! Context evaluation for keybindings: when-expressions, focus targets and
//! legacy keybinding contexts.

use crate::binding::Keybinding;
use crate::error::ContextError;
use std::collections::HashMap;

/// Named boolean context keys.
#[derive(Debug, Clone, Default)]
pub struct ConditionState {
    /// Named boolean variables
    pub variables: HashMap<String, bool>,
}

impl ConditionState {
    /// Create new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.variables.insert(name.into(), value);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.set(name, value);
        self
    }

    /// Get a variable, if defined.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.variables.get(name).copied()
    }
}

/// The UI element that had focus when a key event arrived.
///
/// Context keys set on the target shadow the matcher's global keys.
#[derive(Debug, Clone, Default)]
pub struct FocusTarget {
    /// Element identifier, for diagnostics
    pub element: String,
    /// Context keys scoped to this element
    pub state: ConditionState,
}

impl FocusTarget {
    /// Create a target for the focused element.
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            state: ConditionState::new(),
        }
    }

    /// Set a context key on this target.
    pub fn with_key(mut self, name: impl Into<String>, value: bool) -> Self {
        self.state.set(name, value);
        self
    }
}

/// Evaluates when-expressions against a focus target.
pub trait ContextKeyService: Send + Sync {
    /// Evaluate `expression`; a malformed expression is an error, never a panic.
    fn match_expression(&self, expression: &str, target: &FocusTarget) -> Result<bool, ContextError>;
}

/// A legacy keybinding context: a named predicate a binding can refer to
/// through its `context` field.
pub trait KeybindingContext: Send + Sync {
    fn id(&self) -> &str;

    fn is_enabled(&self, binding: &Keybinding) -> bool;
}

/// Default [`ContextKeyService`] over boolean context keys.
///
/// Expression syntax supports:
/// - Variable names: `editorFocus`, `readOnly`, `config.vim.enabled`
/// - Literals: `true`, `false`
/// - Boolean operators: `!`, `&&`, `||` (in decreasing precedence)
/// - Parentheses for grouping
///
/// Example: `"editorFocus && !(readOnly || inDiff)"`
#[derive(Debug, Clone, Default)]
pub struct ExpressionMatcher {
    global: ConditionState,
}

impl ExpressionMatcher {
    /// Create a matcher with no global keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matcher with global keys.
    pub fn with_state(global: ConditionState) -> Self {
        Self { global }
    }

    /// Set a global context key.
    pub fn set(&mut self, name: impl Into<String>, value: bool) {
        self.global.set(name, value);
    }

    fn lookup(&self, name: &str, target: &FocusTarget) -> bool {
        target
            .state
            .get(name)
            .or_else(|| self.global.get(name))
            .unwrap_or(false)
    }
}

impl ContextKeyService for ExpressionMatcher {
    fn match_expression(&self, expression: &str, target: &FocusTarget) -> Result<bool, ContextError> {
        let tokens = tokenize(expression)?;
        if tokens.is_empty() {
            return Ok(true);
        }

        let mut parser = ExprParser {
            expression,
            tokens: &tokens,
            pos: 0,
            lookup: &|name: &str| self.lookup(name, target),
        };
        let value = parser.or()?;
        if parser.pos != tokens.len() {
            return Err(malformed(expression, "unexpected trailing tokens"));
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn malformed(expression: &str, reason: &str) -> ContextError {
    ContextError::Malformed {
        expression: expression.to_string(),
        reason: reason.to_string(),
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ContextError> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '!' => tokens.push(Token::Not),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '&' | '|' => {
                if chars.next() != Some(c) {
                    return Err(malformed(expression, "expected '&&' or '||'"));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' || c == ':' => {
                let mut name = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '.' || next == ':' || next == '-' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => {
                return Err(malformed(expression, &format!("unexpected character '{}'", other)));
            }
        }
    }

    Ok(tokens)
}

struct ExprParser<'a> {
    expression: &'a str,
    tokens: &'a [Token],
    pos: usize,
    lookup: &'a dyn Fn(&str) -> bool,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or(&mut self) -> Result<bool, ContextError> {
        let mut value = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, ContextError> {
        let mut value = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<bool, ContextError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(!self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<bool, ContextError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| malformed(self.expression, "unexpected end of expression"))?;
        self.pos += 1;

        match token {
            Token::Open => {
                let value = self.or()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(malformed(self.expression, "missing ')'"));
                }
                self.pos += 1;
                Ok(value)
            }
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => true,
                "false" => false,
                _ => (self.lookup)(&name),
            }),
            _ => Err(malformed(self.expression, "expected a context key")),
        }
    }
}
