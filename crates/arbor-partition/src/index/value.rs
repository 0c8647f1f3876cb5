//! A bidirectional key to entry-id index.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeBounds;

use crate::entry::EntryId;

/// Maps keys to the entries holding them, and each entry back to its keys.
///
/// The reverse side lets an entry be dropped from the index without knowing
/// which keys it was filed under.
#[derive(Debug, Clone)]
pub struct ValueIndex<K: Ord + Clone> {
    forward: BTreeMap<K, BTreeSet<EntryId>>,
    reverse: HashMap<EntryId, BTreeSet<K>>,
}

impl<K: Ord + Clone> Default for ValueIndex<K> {
    fn default() -> Self {
        Self {
            forward: BTreeMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<K: Ord + Clone> ValueIndex<K> {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `id` under `key`.
    pub fn insert(&mut self, key: K, id: EntryId) {
        self.reverse.entry(id).or_default().insert(key.clone());
        self.forward.entry(key).or_default().insert(id);
    }

    /// Removes the single pairing of `key` and `id`.
    pub fn remove(&mut self, key: &K, id: EntryId) {
        if let Some(ids) = self.forward.get_mut(key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.forward.remove(key);
            }
        }
        if let Some(keys) = self.reverse.get_mut(&id) {
            keys.remove(key);
            if keys.is_empty() {
                self.reverse.remove(&id);
            }
        }
    }

    /// Drops `id` from every key it is filed under.
    pub fn remove_entry(&mut self, id: EntryId) {
        let Some(keys) = self.reverse.remove(&id) else {
            return;
        };
        for key in keys {
            if let Some(ids) = self.forward.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.forward.remove(&key);
                }
            }
        }
    }

    /// Entries filed under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> BTreeSet<EntryId> {
        self.forward.get(key).cloned().unwrap_or_default()
    }

    /// Number of entries filed under `key`.
    #[must_use]
    pub fn count(&self, key: &K) -> usize {
        self.forward.get(key).map_or(0, BTreeSet::len)
    }

    /// Keys `id` is filed under.
    #[must_use]
    pub fn keys_of(&self, id: EntryId) -> BTreeSet<K> {
        self.reverse.get(&id).cloned().unwrap_or_default()
    }

    /// Returns `true` when the pairing exists.
    #[must_use]
    pub fn contains(&self, key: &K, id: EntryId) -> bool {
        self.forward.get(key).is_some_and(|ids| ids.contains(&id))
    }

    /// Entries filed under any key in `range`.
    #[must_use]
    pub fn range(&self, range: impl RangeBounds<K>) -> BTreeSet<EntryId> {
        self.forward
            .range(range)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Entries filed under any key accepted by `predicate`.
    #[must_use]
    pub fn matching(&self, mut predicate: impl FnMut(&K) -> bool) -> BTreeSet<EntryId> {
        self.forward
            .iter()
            .filter(|(key, _)| predicate(key))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Every indexed entry.
    #[must_use]
    pub fn entries(&self) -> BTreeSet<EntryId> {
        self.reverse.keys().copied().collect()
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}
