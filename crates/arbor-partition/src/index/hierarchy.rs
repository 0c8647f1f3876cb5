//! Parent and child links between entries.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::entry::EntryId;

/// Parent links and per-parent child sets.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    parents: HashMap<EntryId, EntryId>,
    children: HashMap<EntryId, BTreeSet<EntryId>>,
}

impl HierarchyIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `id` below `parent`. A `None` parent marks a context entry.
    pub fn attach(&mut self, id: EntryId, parent: Option<EntryId>) {
        if let Some(parent_id) = parent {
            self.parents.insert(id, parent_id);
            self.children.entry(parent_id).or_default().insert(id);
        }
    }

    /// Unlinks `id` from its parent, keeping its own children.
    pub fn detach(&mut self, id: EntryId) {
        let Some(parent_id) = self.parents.remove(&id) else {
            return;
        };
        if let Some(siblings) = self.children.get_mut(&parent_id) {
            siblings.remove(&id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
    }

    /// Removes every link touching `id`.
    pub fn forget(&mut self, id: EntryId) {
        self.detach(id);
        if let Some(orphans) = self.children.remove(&id) {
            for orphan in orphans {
                self.parents.remove(&orphan);
            }
        }
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.parents.get(&id).copied()
    }

    /// Direct children of `id`.
    #[must_use]
    pub fn children(&self, id: EntryId) -> BTreeSet<EntryId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    /// Number of direct children of `id`.
    #[must_use]
    pub fn child_count(&self, id: EntryId) -> usize {
        self.children.get(&id).map_or(0, BTreeSet::len)
    }

    /// Every descendant of `id`, parents before their children.
    #[must_use]
    pub fn descendants(&self, id: EntryId) -> Vec<EntryId> {
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.children.get(&current).into_iter().flatten() {
                ordered.push(*child);
                queue.push_back(*child);
            }
        }
        ordered
    }

    /// Ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: EntryId) -> Vec<EntryId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(parent_id) = self.parents.get(&current).copied() {
            if chain.contains(&parent_id) {
                break;
            }
            chain.push(parent_id);
            current = parent_id;
        }
        chain
    }
}
