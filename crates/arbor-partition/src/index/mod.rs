//! Indices a partition keeps in step with its entry store.

mod hierarchy;
mod names;
mod value;

use std::collections::{BTreeSet, HashMap};

use arbor_name::{Name, normalize_attribute_type};
use tracing::warn;

pub use hierarchy::HierarchyIndex;
pub use names::NameIndex;
pub use value::ValueIndex;

use crate::entry::{Entry, EntryId};

const LOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::index");
const ALIAS_TARGET_ATTRIBUTE: &str = "aliasedobjectname";

/// Every index of one partition.
///
/// Entries are filed with [`add`](Self::add) and removed with
/// [`remove`](Self::remove) or [`forget`](Self::forget). Re-filing an entry
/// after a change is a remove followed by an add; callers moving a subtree
/// re-file parents before children so alias ancestry is rebuilt correctly.
#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    existence: ValueIndex<String>,
    hierarchy: HierarchyIndex,
    normalized_names: NameIndex,
    user_names: NameIndex,
    alias_targets: HashMap<EntryId, Name>,
    one_level_aliases: ValueIndex<EntryId>,
    subtree_aliases: ValueIndex<EntryId>,
    user_indices: HashMap<String, ValueIndex<String>>,
}

impl IndexSet {
    /// Creates an index set maintaining user indices on `indexed`.
    #[must_use]
    pub fn new<I, S>(indexed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let user_indices = indexed
            .into_iter()
            .map(|attribute| (normalize_attribute_type(attribute.as_ref()), ValueIndex::new()))
            .collect();
        Self {
            user_indices,
            ..Self::default()
        }
    }

    /// Files `entry` below `parent`.
    pub fn add(&mut self, entry: &Entry, parent: Option<EntryId>) {
        let id = entry.id();
        self.normalized_names
            .insert(entry.name().normalized().to_owned(), id);
        self.user_names
            .insert(entry.name().user_provided().to_owned(), id);
        self.hierarchy.attach(id, parent);

        for attribute in entry.attributes().iter() {
            let attr_type = attribute.normalized_id();
            if let Some(index) = self.user_indices.get_mut(&attr_type) {
                for value in attribute.normalized_values() {
                    index.insert(value, id);
                }
            }
            self.existence.insert(attr_type, id);
        }

        if entry.is_alias() {
            self.add_alias(entry, parent);
        }
    }

    fn add_alias(&mut self, entry: &Entry, parent: Option<EntryId>) {
        let id = entry.id();
        let Some(raw_target) = entry.attributes().first_value(ALIAS_TARGET_ATTRIBUTE) else {
            return;
        };
        let target = match Name::parse(raw_target) {
            Ok(target) => target,
            Err(error) => {
                warn!(
                    target: LOG_TARGET,
                    alias = %entry.name(),
                    %error,
                    "alias target is not a valid name; not indexed as alias"
                );
                return;
            }
        };
        self.alias_targets.insert(id, target);
        if let Some(parent_id) = parent {
            self.one_level_aliases.insert(parent_id, id);
        }
        for ancestor in self.hierarchy.ancestors(id) {
            self.subtree_aliases.insert(ancestor, id);
        }
    }

    /// Removes `id` from every index but keeps the links to its children,
    /// ready for it to be filed again.
    pub fn remove(&mut self, id: EntryId) {
        self.normalized_names.remove(id);
        self.user_names.remove(id);
        self.hierarchy.detach(id);
        self.existence.remove_entry(id);
        for index in self.user_indices.values_mut() {
            index.remove_entry(id);
        }
        self.alias_targets.remove(&id);
        self.one_level_aliases.remove_entry(id);
        self.subtree_aliases.remove_entry(id);
    }

    /// Removes `id` entirely, including its child links.
    pub fn forget(&mut self, id: EntryId) {
        self.remove(id);
        self.hierarchy.forget(id);
    }

    /// Identifier of the entry named `name`.
    #[must_use]
    pub fn id_of(&self, name: &Name) -> Option<EntryId> {
        self.normalized_names.id(name.normalized())
    }

    /// Identifier of the entry whose user-provided name is exactly `name`.
    #[must_use]
    pub fn id_of_user_name(&self, name: &str) -> Option<EntryId> {
        self.user_names.id(name)
    }

    /// Normalized name of `id`.
    #[must_use]
    pub fn normalized_name(&self, id: EntryId) -> Option<&str> {
        self.normalized_names.name(id)
    }

    /// User-provided name of `id`.
    #[must_use]
    pub fn user_name(&self, id: EntryId) -> Option<&str> {
        self.user_names.name(id)
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.normalized_names.len()
    }

    /// Returns `true` when no entries are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized_names.is_empty()
    }

    /// The hierarchy index.
    #[must_use]
    pub const fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    /// Entries holding attribute `attr_type`.
    #[must_use]
    pub fn with_attribute(&self, attr_type: &str) -> BTreeSet<EntryId> {
        self.existence.get(&normalize_attribute_type(attr_type))
    }

    /// Attribute types recorded for `id` in the existence index.
    #[must_use]
    pub fn attribute_types(&self, id: EntryId) -> BTreeSet<String> {
        self.existence.keys_of(id)
    }

    /// The user index on `attr_type`, when one is configured.
    #[must_use]
    pub fn user_index(&self, attr_type: &str) -> Option<&ValueIndex<String>> {
        self.user_indices.get(&normalize_attribute_type(attr_type))
    }

    /// Normalized names of the attributes carrying user indices.
    pub fn indexed_attributes(&self) -> impl Iterator<Item = &str> {
        self.user_indices.keys().map(String::as_str)
    }

    /// Target of the alias `id`.
    #[must_use]
    pub fn alias_target(&self, id: EntryId) -> Option<&Name> {
        self.alias_targets.get(&id)
    }

    /// Aliases directly below `parent`.
    #[must_use]
    pub fn one_level_aliases(&self, parent: EntryId) -> BTreeSet<EntryId> {
        self.one_level_aliases.get(&parent)
    }

    /// Aliases anywhere below `ancestor`.
    #[must_use]
    pub fn subtree_aliases(&self, ancestor: EntryId) -> BTreeSet<EntryId> {
        self.subtree_aliases.get(&ancestor)
    }
}
