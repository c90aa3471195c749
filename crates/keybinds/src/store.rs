//! Layered binding storage and the resolved-sequence cache.

use crate::binding::{BindingTarget, Keybinding, KeybindingScope, ScopedKeybinding};
use crate::error::ParseError;
use crate::keycode::KeySequence;
use std::cell::RefCell;
use std::collections::HashMap;

/// Identifier of one stored binding, unique for the lifetime of a store.
pub type BindingId = u64;

/// A binding as held by the store.
#[derive(Debug, Clone)]
pub struct StoredBinding {
    pub id: BindingId,
    pub scope: KeybindingScope,
    pub binding: Keybinding,
    pub target: BindingTarget,
    /// Number of chords, fixed at registration
    pub chords: usize,
}

impl StoredBinding {
    /// Copy out the binding with its scope.
    pub fn to_scoped(&self) -> ScopedKeybinding {
        ScopedKeybinding {
            binding: self.binding.clone(),
            scope: self.scope,
        }
    }
}

/// Handle returned by registration; hand it back to revoke exactly those entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "dropping a registration handle makes the bindings irrevocable"]
pub struct RegistrationHandle {
    ids: Vec<BindingId>,
}

impl RegistrationHandle {
    pub(crate) fn single(id: BindingId) -> Self {
        Self { ids: vec![id] }
    }

    pub(crate) fn push(&mut self, id: BindingId) {
        self.ids.push(id);
    }

    /// Get the binding ids.
    pub fn ids(&self) -> &[BindingId] {
        &self.ids
    }

    /// Check if nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Three ordered binding lists, one per scope.
#[derive(Debug, Default)]
pub struct BindingStore {
    scopes: [Vec<StoredBinding>; KeybindingScope::COUNT],
    next_id: BindingId,
}

impl BindingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding with `chords` chords into `scope`.
    ///
    /// The entry goes immediately before the first entry with the same chord
    /// count, or to the end of the list when there is none.
    pub fn insert(&mut self, scope: KeybindingScope, binding: Keybinding, chords: usize) -> BindingId {
        let id = self.next_id;
        self.next_id += 1;

        let entry = StoredBinding {
            id,
            scope,
            target: binding.target(),
            binding,
            chords,
        };

        let list = &mut self.scopes[scope.index()];
        let position = list
            .iter()
            .position(|existing| existing.chords == chords)
            .unwrap_or(list.len());
        list.insert(position, entry);
        id
    }

    /// Remove one entry by id.
    pub fn remove(&mut self, id: BindingId) -> Option<StoredBinding> {
        for list in &mut self.scopes {
            if let Some(index) = list.iter().position(|entry| entry.id == id) {
                return Some(list.remove(index));
            }
        }
        None
    }

    /// Remove every entry of the handle still present; returns the removed ids.
    pub fn revoke(&mut self, handle: &RegistrationHandle) -> Vec<BindingId> {
        handle
            .ids()
            .iter()
            .filter_map(|id| self.remove(*id).map(|entry| entry.id))
            .collect()
    }

    /// Entries of one scope in scan order.
    pub fn scope(&self, scope: KeybindingScope) -> &[StoredBinding] {
        &self.scopes[scope.index()]
    }

    /// All entries, highest precedence scope first.
    pub fn iter_by_precedence(&self) -> impl Iterator<Item = &StoredBinding> {
        KeybindingScope::by_precedence()
            .into_iter()
            .flat_map(move |scope| self.scopes[scope.index()].iter())
    }

    /// Empty a scope; returns the removed ids.
    pub fn clear_scope(&mut self, scope: KeybindingScope) -> Vec<BindingId> {
        self.scopes[scope.index()]
            .drain(..)
            .map(|entry| entry.id)
            .collect()
    }

    /// Remove entries of `scope` matching `predicate`; returns the removed ids.
    pub fn remove_where(
        &mut self,
        scope: KeybindingScope,
        mut predicate: impl FnMut(&StoredBinding) -> bool,
    ) -> Vec<BindingId> {
        let list = &mut self.scopes[scope.index()];
        let mut removed = Vec::new();
        list.retain(|entry| {
            if predicate(entry) {
                removed.push(entry.id);
                false
            } else {
                true
            }
        });
        removed
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.scopes.iter().map(Vec::len).sum()
    }

    /// Check if every scope is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binding id to the key sequence its text resolved to under the current
/// keyboard layout.
///
/// Lookups happen during `&self` scans, so the map sits behind a `RefCell`;
/// the registry that owns it is single-threaded.
#[derive(Debug, Default)]
pub struct ResolvedCache {
    entries: RefCell<HashMap<BindingId, KeySequence>>,
}

impl ResolvedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached sequence for `id`, resolving and caching it on a miss.
    pub fn get_or_resolve(
        &self,
        id: BindingId,
        resolve: impl FnOnce() -> Result<KeySequence, ParseError>,
    ) -> Result<KeySequence, ParseError> {
        if let Some(sequence) = self.entries.borrow().get(&id) {
            return Ok(sequence.clone());
        }
        let sequence = resolve()?;
        self.entries.borrow_mut().insert(id, sequence.clone());
        Ok(sequence)
    }

    /// Cache a resolution.
    pub fn insert(&self, id: BindingId, sequence: KeySequence) {
        self.entries.borrow_mut().insert(id, sequence);
    }

    /// Forget one resolution.
    pub fn remove(&self, id: BindingId) {
        self.entries.borrow_mut().remove(&id);
    }

    /// Forget every resolution, e.g. after a keyboard layout change.
    pub fn invalidate_all(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of cached resolutions.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Key, Platform};
    use crate::keycode::KeyCode;
    use crate::parser::parse_sequence;

    fn commands(store: &BindingStore, scope: KeybindingScope) -> Vec<&str> {
        store
            .scope(scope)
            .iter()
            .map(|entry| entry.binding.command.as_str())
            .collect()
    }

    #[test]
    fn test_length_aware_insertion() {
        let mut store = BindingStore::new();
        let scope = KeybindingScope::Default;
        store.insert(scope, Keybinding::new("one", "ctrl+a"), 1);
        store.insert(scope, Keybinding::new("two", "ctrl+k ctrl+a"), 2);
        store.insert(scope, Keybinding::new("three", "ctrl+b"), 1);
        store.insert(scope, Keybinding::new("four", "ctrl+k ctrl+b"), 2);

        // Newest first among equal chord counts; a new chord count appends.
        assert_eq!(commands(&store, scope), vec!["three", "one", "four", "two"]);

        store.insert(scope, Keybinding::new("five", "ctrl+k ctrl+k ctrl+a"), 3);
        assert_eq!(commands(&store, scope).last(), Some(&"five"));
    }

    #[test]
    fn test_insertion_keeps_scopes_apart() {
        let mut store = BindingStore::new();
        store.insert(KeybindingScope::User, Keybinding::new("user", "a"), 1);
        store.insert(KeybindingScope::Workspace, Keybinding::new("ws", "a"), 1);
        store.insert(KeybindingScope::Default, Keybinding::new("def", "a"), 1);

        let order: Vec<&str> = store
            .iter_by_precedence()
            .map(|entry| entry.binding.command.as_str())
            .collect();
        assert_eq!(order, vec!["ws", "user", "def"]);
    }

    #[test]
    fn test_revoke_and_suppression_target() {
        let mut store = BindingStore::new();
        let scope = KeybindingScope::Default;
        let mut handle = RegistrationHandle::single(store.insert(scope, Keybinding::new("a", "a"), 1));
        handle.push(store.insert(scope, Keybinding::new("-b", "b"), 1));
        let keep = store.insert(scope, Keybinding::new("c", "c"), 1);

        let suppression = store
            .scope(scope)
            .iter()
            .find(|entry| entry.id == handle.ids()[1])
            .map(|entry| entry.target.clone());
        assert_eq!(suppression, Some(BindingTarget::Suppression("b".to_string())));

        assert_eq!(store.revoke(&handle).len(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.scope(scope)[0].id, keep);
        assert!(store.revoke(&handle).is_empty());
    }

    #[test]
    fn test_remove_where_and_clear() {
        let mut store = BindingStore::new();
        store.insert(KeybindingScope::Default, Keybinding::new("a", "a"), 1);
        store.insert(KeybindingScope::Default, Keybinding::new("b", "b"), 1);
        store.insert(KeybindingScope::User, Keybinding::new("a", "a"), 1);

        let removed = store.remove_where(KeybindingScope::Default, |e| e.binding.command == "a");
        assert_eq!(removed.len(), 1);
        assert_eq!(commands(&store, KeybindingScope::Default), vec!["b"]);
        assert_eq!(commands(&store, KeybindingScope::User), vec!["a"]);

        assert_eq!(store.clear_scope(KeybindingScope::User).len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resolved_cache() {
        let cache = ResolvedCache::new();
        let platform = Platform::other();
        let first = cache
            .get_or_resolve(7, || parse_sequence("ctrl+a", platform))
            .unwrap();
        assert_eq!(first, KeySequence::single(KeyCode::new(Key::A).with_ctrl()));

        // A hit never calls the resolver.
        let second = cache
            .get_or_resolve(7, || Err(ParseError::Empty))
            .unwrap();
        assert_eq!(first, second);

        assert!(cache.get_or_resolve(8, || Err(ParseError::Empty)).is_err());
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
