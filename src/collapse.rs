//! Collapse state for rendered sections.
//!
//! Automatic policy keeps the newest section of a message open and folds the
//! rest. A section the user has toggled is locked, and the policy never
//! touches it again until automation is reset.

use crate::keys::SectionKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Boolean flags per section key.
///
/// Writes go to the key and, for message-scoped keys, to its base key as
/// well. Reads try the exact key first and fall back to the base key, so
/// state recorded before a message index was known is still found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionStateMap(BTreeMap<SectionKey, bool>);

/// Section key -> collapsed
pub type CollapseState = SectionStateMap;

/// Section key -> locked by an explicit user action
pub type ManualLocks = SectionStateMap;

impl SectionStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SectionKey) -> Option<bool> {
        self.0
            .get(key)
            .or_else(|| self.0.get(&key.base()))
            .copied()
    }

    /// `true` only if the flag is present and set
    pub fn is_set(&self, key: &SectionKey) -> bool {
        self.get(key).unwrap_or(false)
    }

    /// Like [`is_set`](Self::is_set) but without the base key fallback
    pub fn is_set_exact(&self, key: &SectionKey) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: &SectionKey, value: bool) {
        self.0.insert(*key, value);
        if key.is_scoped() {
            self.0.insert(key.base(), value);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionKey, &bool)> {
        self.0.iter()
    }
}

/// Compute the next collapse state for one message's sections.
///
/// `keys` must be in document order. With automation enabled every section
/// but the last is collapsed; locked keys keep whatever `prev` holds for them.
/// With automation disabled `prev` is returned unchanged.
pub fn reconcile(
    prev: &CollapseState,
    keys: &[SectionKey],
    locks: &ManualLocks,
    auto_enabled: bool,
) -> CollapseState {
    let mut next = prev.clone();
    if !auto_enabled {
        return next;
    }

    let last = keys.len().saturating_sub(1);
    for (index, key) in keys.iter().enumerate() {
        if is_locked(locks, key) {
            continue;
        }
        next.set(key, index != last);
    }

    next
}

/// A lock on one message's section must not pin the same (kind, ordinal) in
/// other messages, so scoped keys ignore the shared base entry.
fn is_locked(locks: &ManualLocks, key: &SectionKey) -> bool {
    if key.is_scoped() {
        locks.is_set_exact(key)
    } else {
        locks.is_set(key)
    }
}

/// Flip a section's collapse flag and lock it against the automatic policy.
/// Returns the new collapsed value.
pub fn toggle(state: &mut CollapseState, locks: &mut ManualLocks, key: &SectionKey) -> bool {
    let collapsed = !state.is_set(key);
    state.set(key, collapsed);
    locks.set(key, true);
    collapsed
}

/// Open a section for navigation and lock it open.
pub fn expand(state: &mut CollapseState, locks: &mut ManualLocks, key: &SectionKey) {
    if state.is_set(key) {
        state.set(key, false);
    }
    locks.set(key, true);
}
