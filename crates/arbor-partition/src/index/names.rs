//! One-to-one name and identifier maps.

use std::collections::HashMap;

use crate::entry::EntryId;

/// A bijection between name strings and entry identifiers.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: HashMap<String, EntryId>,
    by_id: HashMap<EntryId, String>,
}

impl NameIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` for `id`, replacing any earlier name of `id`.
    pub fn insert(&mut self, name: String, id: EntryId) {
        self.remove(id);
        self.by_name.insert(name.clone(), id);
        self.by_id.insert(id, name);
    }

    /// Forgets `id`.
    pub fn remove(&mut self, id: EntryId) {
        if let Some(name) = self.by_id.remove(&id) {
            self.by_name.remove(&name);
        }
    }

    /// Identifier stored under `name`.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<EntryId> {
        self.by_name.get(name).copied()
    }

    /// Name stored for `id`.
    #[must_use]
    pub fn name(&self, id: EntryId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Number of names held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
