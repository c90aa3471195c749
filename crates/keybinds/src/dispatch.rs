//! The keydown dispatch loop.
//!
//! Keydowns accumulate into a key sequence. While the sequence is a prefix
//! of some binding the event is swallowed and a status line shows the keys
//! pressed so far; any other outcome executes the bound command (if any)
//! and starts over with an empty sequence. There is no timeout: an
//! abandoned prefix is dropped by the next keydown that doesn't extend it.

use crate::binding::{ScopedKeybinding, PASSTHROUGH_COMMAND};
use crate::config::KeybindingPreferences;
use crate::context::FocusTarget;
use crate::error::{CommandError, ParseError};
use crate::keycode::KeySequence;
use crate::layout::{KeyboardEvent, LayoutChange};
use crate::parser::parse_keystroke;
use crate::registry::{KeybindingMatch, KeybindingRegistry};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

/// What a keydown amounted to.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not looked at: already handled elsewhere, IME composition, a bare
    /// modifier or an event the layout could not interpret
    Ignored,
    /// Waiting for more keys
    Partial(ScopedKeybinding),
    /// The bound command was spawned on the dispatcher's runtime
    Executed {
        binding: ScopedKeybinding,
        task: JoinHandle<Result<Value, CommandError>>,
    },
    /// Bound to the passthrough command; default handling proceeds
    Passthrough(ScopedKeybinding),
    /// Nothing bound
    NoMatch,
}

impl DispatchOutcome {
    /// Check if the event was consumed.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Partial(_) | Self::Executed { .. })
    }
}

/// Turns keydowns into command executions.
pub struct KeyDispatcher {
    registry: KeybindingRegistry,
    runtime: Handle,
    preferences: KeybindingPreferences,
    layout_changes: broadcast::Receiver<LayoutChange>,
    sequence: KeySequence,
    composing: bool,
    status: Option<String>,
}

impl KeyDispatcher {
    /// Create a dispatcher that spawns commands on `runtime`.
    pub fn new(
        registry: KeybindingRegistry,
        preferences: KeybindingPreferences,
        runtime: Handle,
    ) -> Self {
        let layout_changes = registry.layout().subscribe();
        Self {
            registry,
            runtime,
            preferences,
            layout_changes,
            sequence: KeySequence::new(),
            composing: false,
            status: None,
        }
    }

    /// Get the keybinding registry.
    pub fn registry(&self) -> &KeybindingRegistry {
        &self.registry
    }

    /// Get the keybinding registry mutably.
    pub fn registry_mut(&mut self) -> &mut KeybindingRegistry {
        &mut self.registry
    }

    /// Get the active preferences.
    pub fn preferences(&self) -> &KeybindingPreferences {
        &self.preferences
    }

    /// Replace the preferences.
    pub fn set_preferences(&mut self, preferences: KeybindingPreferences) {
        self.preferences = preferences;
    }

    /// Keys pressed so far in an unfinished sequence.
    pub fn pending_sequence(&self) -> &KeySequence {
        &self.sequence
    }

    /// The "waiting for more keys" status, while a sequence is pending.
    pub fn pending_status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// An IME composition began; keydowns are ignored until it ends.
    pub fn composition_start(&mut self) {
        self.composing = true;
    }

    /// The IME composition ended.
    pub fn composition_end(&mut self) {
        self.composing = false;
    }

    /// Apply pending keyboard layout changes; returns whether there were any.
    pub fn sync_layout(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.layout_changes.try_recv() {
                Ok(change) => {
                    debug!(layout = %change.layout, "keyboard layout changed");
                    changed = true;
                }
                Err(TryRecvError::Lagged(_)) => changed = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if changed {
            self.registry.handle_layout_change();
        }
        changed
    }

    /// Handle one keydown.
    pub fn handle_key_down(&mut self, event: &mut KeyboardEvent) -> DispatchOutcome {
        self.sync_layout();

        if event.default_prevented() || event.is_composing || self.composing {
            trace!(code = %event.code, "keydown ignored");
            return DispatchOutcome::Ignored;
        }

        let code = match self
            .registry
            .layout()
            .key_code_from_event(event, self.preferences.dispatch_mode)
        {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "keydown ignored");
                return DispatchOutcome::Ignored;
            }
        };
        if code.key.is_none() {
            return DispatchOutcome::Ignored;
        }

        self.sequence.push(code);
        let target = event.target.clone().unwrap_or_default();

        match self.registry.match_keybinding(&self.sequence, Some(&target)) {
            Some(KeybindingMatch::Partial(binding)) => {
                event.prevent_default();
                event.stop_propagation();
                self.status = Some(self.status_text());
                debug!(sequence = %self.sequence, "partial match, waiting for more keys");
                DispatchOutcome::Partial(binding)
            }
            Some(KeybindingMatch::Full(binding)) => {
                self.reset();
                if binding.command() == PASSTHROUGH_COMMAND {
                    debug!(binding = %binding.binding, "passthrough");
                    return DispatchOutcome::Passthrough(binding);
                }

                event.prevent_default();
                event.stop_propagation();
                let task = self.execute(&binding);
                DispatchOutcome::Executed { binding, task }
            }
            None => {
                trace!(sequence = %self.sequence, "no keybinding");
                self.reset();
                DispatchOutcome::NoMatch
            }
        }
    }

    /// Synthesize the keydown for `keystroke` and dispatch it.
    pub fn dispatch_key_down(
        &mut self,
        keystroke: &str,
        target: Option<FocusTarget>,
    ) -> Result<DispatchOutcome, ParseError> {
        let layout = self.registry.layout().clone();
        let code = layout.resolve_key_code(parse_keystroke(keystroke, self.registry.platform())?);
        let mut event = KeyboardEvent::from_key_code(code, layout.as_ref());
        event.target = target;
        Ok(self.handle_key_down(&mut event))
    }

    /// Type the first keybinding of `command`, chord by chord.
    pub fn dispatch_command(
        &mut self,
        command: &str,
        target: Option<FocusTarget>,
    ) -> Result<DispatchOutcome, ParseError> {
        let Some(binding) = self.registry.get_keybindings_for_command(command).into_iter().next() else {
            debug!(command = %command, "no keybinding to dispatch");
            return Ok(DispatchOutcome::NoMatch);
        };

        let layout = self.registry.layout().clone();
        let sequence = self.registry.resolve_keybinding(&binding.binding)?;
        self.reset();

        let mut outcome = DispatchOutcome::NoMatch;
        for code in sequence.iter() {
            let mut event = KeyboardEvent::from_key_code(*code, layout.as_ref());
            event.target = target.clone();
            outcome = self.handle_key_down(&mut event);
        }
        Ok(outcome)
    }

    fn execute(&self, binding: &ScopedKeybinding) -> JoinHandle<Result<Value, CommandError>> {
        let command = binding.binding.command.clone();
        let execution = self
            .registry
            .commands()
            .execute_command(&command, binding.binding.args.clone());

        self.runtime.spawn(async move {
            let result = execution.await;
            if let Err(ref e) = result {
                error!(command = %command, error = %e, "failed to execute command");
            }
            result
        })
    }

    fn status_text(&self) -> String {
        let keys = self
            .registry
            .accelerator_for_sequence(&self.sequence, "+", self.preferences.ascii_accelerators)
            .join(&self.preferences.chord_separator);
        format!("({}) was pressed, waiting for more keys", keys)
    }

    fn reset(&mut self) {
        self.sequence.clear();
        self.status = None;
    }
}

impl std::fmt::Debug for KeyDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDispatcher")
            .field("registry", &self.registry)
            .field("sequence", &self.sequence.to_string())
            .field("composing", &self.composing)
            .finish()
    }
}
