//! Ordered session ids and the active pointer.

use std::collections::HashSet;

use tracing::warn;

use super::types::PersistedSession;

/// Tab order (newest first) plus the active id.
///
/// Invariants: ids are unique and `active`, when set, is one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    ids: Vec<String>,
    active: Option<String>,
}

impl Registry {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Prepend `id` and make it active. Returns `false` (and only activates)
    /// when the id is already registered.
    pub fn insert_front(&mut self, id: &str) -> bool {
        let fresh = !self.contains(id);
        if fresh {
            self.ids.insert(0, id.to_string());
        }
        self.active = Some(id.to_string());
        fresh
    }

    /// Remove `id`. When it was active, the id immediately before it becomes
    /// active; when it was first, the new first id does. Only removing the
    /// last id leaves no active session.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(idx) = self.ids.iter().position(|i| i == id) else {
            return false;
        };
        self.ids.remove(idx);
        if self.active.as_deref() == Some(id) {
            self.active = idx
                .checked_sub(1)
                .and_then(|prev| self.ids.get(prev))
                .or_else(|| self.ids.first())
                .cloned();
        }
        true
    }

    /// Make `id` active if registered.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    pub fn to_persisted(&self) -> Vec<PersistedSession> {
        self.ids
            .iter()
            .map(|id| PersistedSession {
                id: id.clone(),
                selected: self.active.as_deref() == Some(id),
            })
            .collect()
    }

    /// Rebuild from a stored list. Duplicate ids keep their first position;
    /// the first entry flagged `selected` becomes active.
    pub fn from_persisted(entries: impl IntoIterator<Item = PersistedSession>) -> Self {
        let mut seen = HashSet::new();
        let mut registry = Self::default();
        for entry in entries {
            if !seen.insert(entry.id.clone()) {
                warn!(id = %entry.id, "dropping duplicate persisted session");
                continue;
            }
            if entry.selected {
                if registry.active.is_some() {
                    warn!(id = %entry.id, "ignoring extra selected flag");
                } else {
                    registry.active = Some(entry.id.clone());
                }
            }
            registry.ids.push(entry.id);
        }
        registry
    }
}
