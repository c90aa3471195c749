//! The keybinding registry: layered binding storage, resolution of key
//! sequences to commands, and change notifications.
//!
//! Bindings are kept in three scopes (default, user, workspace). Lookups
//! scan the workspace scope first and, within a scope, entries in stored
//! order; the first eligible entry wins. Stored key text is resolved against
//! the live keyboard layout and cached until the layout changes.

use crate::binding::{
    BindingIdentity, BindingTarget, Keybinding, KeybindingScope, ScopedKeybinding,
    PASSTHROUGH_COMMAND,
};
use crate::command::CommandRegistry;
use crate::conflict::{collision_between, same_profile, Collision, KeybindingsResult};
use crate::context::{ContextKeyService, FocusTarget, KeybindingContext};
use crate::display::KeyDisplayConfig;
use crate::error::{KeybindingError, KeybindingResult, ParseError};
use crate::key::Platform;
use crate::keycode::{CompareResult, KeyCode, KeySequence};
use crate::layout::KeyboardLayout;
use crate::parser::parse_sequence;
use crate::store::{BindingId, BindingStore, RegistrationHandle, ResolvedCache, StoredBinding};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Notification that the effective bindings changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeybindingEvent {
    /// A scope's keymap was replaced
    KeymapReplaced(KeybindingScope),
    /// A scope was emptied
    ScopeReset(KeybindingScope),
    /// The keyboard layout changed; rendered accelerators are stale
    LayoutChanged,
}

/// Result of matching a key sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum KeybindingMatch {
    /// The sequence completes this binding
    Full(ScopedKeybinding),
    /// The sequence is a prefix of this binding
    Partial(ScopedKeybinding),
}

impl KeybindingMatch {
    /// Get the matched binding.
    pub fn binding(&self) -> &ScopedKeybinding {
        match self {
            Self::Full(binding) | Self::Partial(binding) => binding,
        }
    }

    /// Check if the sequence completes the binding.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}

/// Layered keybinding registry and resolution engine.
pub struct KeybindingRegistry {
    platform: Platform,
    commands: Arc<dyn CommandRegistry>,
    layout: Arc<dyn KeyboardLayout>,
    context_keys: Arc<dyn ContextKeyService>,
    contexts: HashMap<String, Box<dyn KeybindingContext>>,
    store: BindingStore,
    resolved: ResolvedCache,
    /// Batch registered by the last `set_keymap` per scope
    keymaps: [Option<RegistrationHandle>; KeybindingScope::COUNT],
    events: broadcast::Sender<KeybindingEvent>,
}

impl KeybindingRegistry {
    /// Create an empty registry.
    pub fn new(
        platform: Platform,
        commands: Arc<dyn CommandRegistry>,
        layout: Arc<dyn KeyboardLayout>,
        context_keys: Arc<dyn ContextKeyService>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            platform,
            commands,
            layout,
            context_keys,
            contexts: HashMap::new(),
            store: BindingStore::new(),
            resolved: ResolvedCache::new(),
            keymaps: Default::default(),
            events,
        }
    }

    /// Get the platform keys are parsed for.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Get the command registry.
    pub fn commands(&self) -> &Arc<dyn CommandRegistry> {
        &self.commands
    }

    /// Get the keyboard layout.
    pub fn layout(&self) -> &Arc<dyn KeyboardLayout> {
        &self.layout
    }

    /// Subscribe to binding change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<KeybindingEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: KeybindingEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Register a legacy keybinding context; a duplicate id is logged and ignored.
    pub fn register_context(&mut self, context: Box<dyn KeybindingContext>) {
        let id = context.id().to_string();
        if self.contexts.contains_key(&id) {
            warn!(context = %id, "a keybinding context is already registered with this id");
            return;
        }
        self.contexts.insert(id, context);
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a binding in the default scope.
    pub fn register_keybinding(&mut self, binding: Keybinding) -> RegistrationHandle {
        self.register_in_scope(binding, KeybindingScope::Default)
    }

    /// Register bindings in the default scope; one handle revokes them all.
    pub fn register_keybindings(
        &mut self,
        bindings: impl IntoIterator<Item = Keybinding>,
    ) -> RegistrationHandle {
        self.register_keybindings_in_scope(bindings, KeybindingScope::Default)
    }

    /// Register a batch into `scope`; failed entries are skipped.
    pub fn register_keybindings_in_scope(
        &mut self,
        bindings: impl IntoIterator<Item = Keybinding>,
        scope: KeybindingScope,
    ) -> RegistrationHandle {
        let mut handle = RegistrationHandle::default();
        for binding in bindings {
            for id in self.register_in_scope(binding, scope).ids() {
                handle.push(*id);
            }
        }
        handle
    }

    /// Register one binding in `scope`.
    ///
    /// Malformed key text and collisions with an existing binding of the
    /// same scope are logged and leave the registry untouched; the returned
    /// handle is then empty.
    pub fn register_in_scope(&mut self, binding: Keybinding, scope: KeybindingScope) -> RegistrationHandle {
        let sequence = match self.resolve_keybinding(&binding) {
            Ok(sequence) => sequence,
            Err(e) => {
                warn!(binding = %binding, %scope, error = %e, "could not register keybinding");
                return RegistrationHandle::default();
            }
        };

        if binding.target().is_active() {
            if let Some(collision) = self.find_collision(scope, &binding, &sequence) {
                warn!(binding = %binding, %scope, %collision, "collided keybinding is ignored");
                return RegistrationHandle::default();
            }
        }

        let id = self.store.insert(scope, binding, sequence.len());
        self.resolved.insert(id, sequence);
        RegistrationHandle::single(id)
    }

    /// Revoke a registration. Entries already removed by other means are skipped.
    pub fn dispose(&mut self, handle: &RegistrationHandle) {
        for id in self.store.revoke(handle) {
            self.resolved.remove(id);
        }
    }

    fn forget(&mut self, ids: &[BindingId]) {
        for id in ids {
            self.resolved.remove(*id);
        }
    }

    /// Remove every default-scope binding of `command`; returns how many were removed.
    pub fn unregister_by_command(&mut self, command: &str) -> usize {
        let removed = self
            .store
            .remove_where(KeybindingScope::Default, |entry| entry.binding.command == command);
        self.forget(&removed);
        removed.len()
    }

    /// Remove every default-scope binding whose keys equal `text`.
    pub fn unregister_by_key_text(&mut self, text: &str) -> usize {
        let sequence = match self.resolve_text(text) {
            Ok(sequence) => sequence,
            Err(e) => {
                warn!(keybinding = %text, error = %e, "could not unregister keybinding");
                return 0;
            }
        };

        let ids: Vec<BindingId> = self
            .store
            .scope(KeybindingScope::Default)
            .iter()
            .filter(|entry| {
                self.resolved_sequence(entry)
                    .is_ok_and(|resolved| resolved.compare(&sequence) == CompareResult::Full)
            })
            .map(|entry| entry.id)
            .collect();

        let removed = self
            .store
            .remove_where(KeybindingScope::Default, |entry| ids.contains(&entry.id));
        self.forget(&removed);
        removed.len()
    }

    /// Remove default-scope bindings equal to `binding`, args included.
    pub fn unregister_binding(&mut self, binding: &Keybinding) -> usize {
        let removed = self
            .store
            .remove_where(KeybindingScope::Default, |entry| {
                entry.binding.equals(binding, false, false)
            });
        self.forget(&removed);
        removed.len()
    }

    /// Replace the bindings `scope` received from its previous keymap.
    ///
    /// The keymap is applied as a whole: if any binding fails to parse,
    /// nothing changes and [`KeybindingError::InvalidKeymap`] is returned.
    pub fn set_keymap(&mut self, scope: KeybindingScope, bindings: Vec<Keybinding>) -> KeybindingResult<()> {
        let failures: Vec<ParseError> = bindings
            .iter()
            .filter_map(|binding| self.resolve_keybinding(binding).err())
            .collect();
        if let Some(first) = failures.first() {
            warn!(%scope, count = failures.len(), error = %first, "keymap rejected");
            return Err(KeybindingError::InvalidKeymap {
                count: failures.len(),
                first: first.clone(),
            });
        }

        if let Some(previous) = self.keymaps[scope.index()].take() {
            self.dispose(&previous);
        }
        let handle = self.register_keybindings_in_scope(bindings, scope);
        debug!(%scope, bindings = handle.len(), "keymap replaced");
        self.keymaps[scope.index()] = Some(handle);
        self.notify(KeybindingEvent::KeymapReplaced(scope));
        Ok(())
    }

    /// Empty `scope`, including bindings registered outside a keymap.
    pub fn reset_keybindings_for_scope(&mut self, scope: KeybindingScope) {
        let removed = self.store.clear_scope(scope);
        self.forget(&removed);
        self.keymaps[scope.index()] = None;
        self.notify(KeybindingEvent::ScopeReset(scope));
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Parse key text and map it onto the current keyboard layout.
    pub fn resolve_text(&self, text: &str) -> Result<KeySequence, ParseError> {
        let parsed = parse_sequence(text, self.platform)?;
        Ok(parsed
            .iter()
            .map(|code| self.layout.resolve_key_code(*code))
            .collect::<Vec<KeyCode>>()
            .into())
    }

    /// Resolve a binding's key text without touching the cache.
    pub fn resolve_keybinding(&self, binding: &Keybinding) -> Result<KeySequence, ParseError> {
        self.resolve_text(&binding.keybinding)
    }

    fn resolved_sequence(&self, entry: &StoredBinding) -> Result<KeySequence, ParseError> {
        self.resolved
            .get_or_resolve(entry.id, || self.resolve_keybinding(&entry.binding))
    }

    // Entries that fail to resolve are logged and skipped.
    fn resolved_or_skip(&self, entry: &StoredBinding) -> Option<KeySequence> {
        match self.resolved_sequence(entry) {
            Ok(sequence) => Some(sequence),
            Err(e) => {
                warn!(binding = %entry.binding, error = %e, "skipping unresolvable keybinding");
                None
            }
        }
    }

    /// Drop every resolved sequence and notify listeners.
    pub fn handle_layout_change(&mut self) {
        self.resolved.invalidate_all();
        debug!("keyboard layout changed, resolved keybindings invalidated");
        self.notify(KeybindingEvent::LayoutChanged);
    }

    /// Find the first eligible binding `sequence` completes or is a prefix of.
    ///
    /// Context and when-expressions are only checked when a target is given.
    pub fn match_keybinding(
        &self,
        sequence: &KeySequence,
        target: Option<&FocusTarget>,
    ) -> Option<KeybindingMatch> {
        let mut disabled = HashSet::new();

        for entry in self.store.iter_by_precedence() {
            let Some(resolved) = self.resolved_or_skip(entry) else {
                continue;
            };
            let relation = sequence.compare(&resolved);
            if !matches!(relation, CompareResult::Full | CompareResult::Partial) {
                continue;
            }

            let identity = BindingIdentity::new(&entry.binding, &resolved);
            if let BindingTarget::Suppression(_) = entry.target {
                disabled.insert(identity);
                continue;
            }
            if disabled.contains(&identity) || !self.is_enabled(entry, target) {
                continue;
            }

            let binding = entry.to_scoped();
            return Some(match relation {
                CompareResult::Full => KeybindingMatch::Full(binding),
                _ => KeybindingMatch::Partial(binding),
            });
        }

        None
    }

    fn is_enabled(&self, entry: &StoredBinding, target: Option<&FocusTarget>) -> bool {
        let command = entry.target.command();
        if command != PASSTHROUGH_COMMAND
            && !self.commands.is_enabled(command, entry.binding.args.as_ref())
        {
            return false;
        }
        target.map_or(true, |target| self.is_enabled_in_scope(&entry.binding, target))
    }

    /// Check the binding's legacy context and when-expression against `target`.
    ///
    /// A context id nobody registered does not disable the binding; a
    /// malformed when-expression does.
    pub fn is_enabled_in_scope(&self, binding: &Keybinding, target: &FocusTarget) -> bool {
        if let Some(context) = binding.context.as_ref().and_then(|id| self.contexts.get(id)) {
            if !context.is_enabled(binding) {
                return false;
            }
        }

        match &binding.when {
            None => true,
            Some(when) => match self.context_keys.match_expression(when, target) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(binding = %binding, error = %e, "when-expression treated as false");
                    false
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Bindings of a registered command, highest precedence first, with
    /// suppressed ones left out.
    pub fn get_keybindings_for_command(&self, command: &str) -> Vec<ScopedKeybinding> {
        if self.commands.get_command(command).is_none() {
            return Vec::new();
        }

        let mut disabled = HashSet::new();
        let mut result = Vec::new();
        for entry in self.store.iter_by_precedence() {
            if entry.target.command() != command {
                continue;
            }
            let Some(resolved) = self.resolved_or_skip(entry) else {
                continue;
            };
            let identity = BindingIdentity::new(&entry.binding, &resolved);
            match entry.target {
                BindingTarget::Suppression(_) => {
                    disabled.insert(identity);
                }
                BindingTarget::Active(_) if !disabled.contains(&identity) => {
                    result.push(entry.to_scoped());
                }
                BindingTarget::Active(_) => {}
            }
        }
        result
    }

    /// Every entry of one scope in stored order, suppression records included.
    pub fn get_keybindings_by_scope(&self, scope: KeybindingScope) -> Vec<ScopedKeybinding> {
        self.store.scope(scope).iter().map(StoredBinding::to_scoped).collect()
    }

    /// Group the bindings related to `sequence` by how they compare to it.
    pub fn get_keybindings_for_key_sequence(&self, sequence: &KeySequence) -> KeybindingsResult {
        let mut result = KeybindingsResult::new();
        let mut disabled = HashSet::new();

        for scope in KeybindingScope::by_precedence() {
            let mut full = Vec::new();
            for entry in self.store.scope(scope) {
                let Some(resolved) = self.resolved_or_skip(entry) else {
                    continue;
                };
                let relation = sequence.compare(&resolved);
                if relation == CompareResult::None {
                    continue;
                }

                let identity = BindingIdentity::new(&entry.binding, &resolved);
                if !entry.target.is_active() {
                    disabled.insert(identity);
                    continue;
                }
                if disabled.contains(&identity) {
                    continue;
                }

                match relation {
                    CompareResult::Full => full.push(entry.to_scoped()),
                    CompareResult::Partial => result.partial.push(entry.to_scoped()),
                    CompareResult::Shadow => result.shadow.push(entry.to_scoped()),
                    CompareResult::None => {}
                }
            }
            if result.full.is_empty() {
                result.full = full;
            }
        }

        result
    }

    /// Check if `binding` would collide with a usable binding already in `scope`.
    pub fn contains_keybinding_in_scope(&self, binding: &Keybinding, scope: KeybindingScope) -> bool {
        match self.resolve_keybinding(binding) {
            Ok(sequence) => self.find_collision(scope, binding, &sequence).is_some(),
            Err(e) => {
                warn!(binding = %binding, error = %e, "could not check keybinding");
                false
            }
        }
    }

    fn find_collision(
        &self,
        scope: KeybindingScope,
        binding: &Keybinding,
        sequence: &KeySequence,
    ) -> Option<Collision> {
        self.store
            .scope(scope)
            .iter()
            .filter(|entry| self.is_usable(entry) && same_profile(&entry.binding, binding))
            .find_map(|entry| {
                let resolved = self.resolved_or_skip(entry)?;
                collision_between(sequence, &resolved).map(|relation| Collision {
                    existing: entry.to_scoped(),
                    relation,
                })
            })
    }

    // An active binding whose command exists.
    fn is_usable(&self, entry: &StoredBinding) -> bool {
        match &entry.target {
            BindingTarget::Active(command) => {
                command == PASSTHROUGH_COMMAND || self.commands.get_command(command).is_some()
            }
            BindingTarget::Suppression(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // Accelerators
    // ------------------------------------------------------------------

    /// One label per chord of `binding`; empty when its keys can't be resolved.
    pub fn accelerator_for(&self, binding: &Keybinding, separator: &str, ascii_only: bool) -> Vec<String> {
        match self.resolve_keybinding(binding) {
            Ok(sequence) => self.accelerator_for_sequence(&sequence, separator, ascii_only),
            Err(e) => {
                warn!(binding = %binding, error = %e, "no accelerator for keybinding");
                Vec::new()
            }
        }
    }

    /// One label per chord of `sequence`.
    pub fn accelerator_for_sequence(
        &self,
        sequence: &KeySequence,
        separator: &str,
        ascii_only: bool,
    ) -> Vec<String> {
        KeyDisplayConfig::new(self.platform, ascii_only).accelerator_for_sequence(
            sequence,
            self.layout.as_ref(),
            separator,
        )
    }

    /// Label of one chord.
    pub fn accelerator_for_key_code(&self, code: &KeyCode, separator: &str, ascii_only: bool) -> String {
        KeyDisplayConfig::new(self.platform, ascii_only).accelerator(code, self.layout.as_ref(), separator)
    }

    /// Display components of one chord, modifiers first.
    pub fn components_for_key_code(&self, code: &KeyCode, ascii_only: bool) -> Vec<String> {
        KeyDisplayConfig::new(self.platform, ascii_only).components(code, self.layout.as_ref())
    }
}

impl std::fmt::Debug for KeybindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeybindingRegistry")
            .field("platform", &self.platform)
            .field("bindings", &self.store.len())
            .field("resolved", &self.resolved.len())
            .field("contexts", &self.contexts.len())
            .finish()
    }
}
