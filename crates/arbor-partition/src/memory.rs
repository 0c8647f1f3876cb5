//! A partition over any [`EntryStore`], with in-memory indices.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_name::Name;
use tracing::{debug, info, warn};

use crate::attributes::Attributes;
use crate::checks::ensure_leaf;
use crate::entry::{Entry, EntryId, Modification};
use crate::error::{PartitionError, StoreError};
use crate::filter::Filter;
use crate::index::IndexSet;
use crate::partition::{EntryStream, Partition, Relocation};
use crate::schema::SchemaLookup;
use crate::search::{Environment, Projection, SearchControls, SearchEngine};
use crate::store::{EntryStore, MemoryEntryStore, StoreOp, StoredEntry};

const LOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::memory");

struct PartitionState {
    store: Box<dyn EntryStore>,
    indices: IndexSet,
    next_id: EntryId,
}

impl PartitionState {
    fn load(&self, id: EntryId) -> Result<Option<Entry>, PartitionError> {
        let Some(record) = self.store.get(id)? else {
            return Ok(None);
        };
        Ok(Some(StoredEntry::decode(id, &record)?))
    }

    fn load_indexed(&self, id: EntryId) -> Result<Entry, PartitionError> {
        self.load(id)?.ok_or_else(|| {
            PartitionError::internal(format!("entry {id} is indexed but has no stored record"))
        })
    }

    fn require(&self, name: &Name) -> Result<EntryId, PartitionError> {
        self.indices
            .id_of(name)
            .ok_or_else(|| PartitionError::name_not_found(name))
    }

    /// Copies the stored records of `ids`, skipping any that are gone.
    fn snapshot(&self, ids: Vec<EntryId>) -> Result<Vec<(EntryId, Vec<u8>)>, PartitionError> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.store.get(id)? {
                records.push((id, record));
            }
        }
        Ok(records)
    }

    /// Files `entry` again after its record was rewritten.
    fn refile(&mut self, entry: &Entry, parent: Option<EntryId>) {
        self.indices.remove(entry.id());
        self.indices.add(entry, parent);
    }
}

/// A partition keeping its indices in memory over a pluggable entry store.
///
/// Mutations take the writer lock, commit a single batch to the store and
/// only then update the indices, so a failed store write leaves both
/// untouched. Readers share the lock. Cursors returned by
/// [`list`](Partition::list) and [`search`](Partition::search) copy the
/// records of their results under the same read lock that selected them
/// and decode them as they are pulled.
pub struct MemoryPartition {
    id: String,
    suffix: Name,
    schema: Arc<dyn SchemaLookup>,
    state: Arc<RwLock<PartitionState>>,
}

impl MemoryPartition {
    /// Creates an empty partition backed by a [`MemoryEntryStore`].
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        suffix: Name,
        indexed_attributes: &[String],
        schema: Arc<dyn SchemaLookup>,
    ) -> Self {
        Self {
            id: id.into(),
            suffix,
            schema,
            state: Arc::new(RwLock::new(PartitionState {
                store: Box::new(MemoryEntryStore::new()),
                indices: IndexSet::new(indexed_attributes),
                next_id: EntryId::FIRST,
            })),
        }
    }

    /// Opens a partition over an existing store, rebuilding every index
    /// from the stored records.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::Store`] when a record cannot be read or
    /// decoded.
    pub fn open(
        id: impl Into<String>,
        suffix: Name,
        indexed_attributes: &[String],
        schema: Arc<dyn SchemaLookup>,
        store: Box<dyn EntryStore>,
    ) -> Result<Self, PartitionError> {
        let partition_id = id.into();
        let mut entries = Vec::new();
        for entry_id in store.ids()? {
            if let Some(record) = store.get(entry_id)? {
                entries.push(StoredEntry::decode(entry_id, &record)?);
            }
        }
        entries.sort_by_key(|entry| entry.name().len());

        let mut indices = IndexSet::new(indexed_attributes);
        let mut next_id = EntryId::FIRST;
        for entry in &entries {
            let parent = if *entry.name() == suffix {
                None
            } else {
                let parent = entry
                    .name()
                    .parent()
                    .and_then(|parent_name| indices.id_of(&parent_name));
                if parent.is_none() {
                    warn!(
                        target: LOG_TARGET,
                        partition = %partition_id,
                        entry = %entry.name(),
                        "stored entry has no parent in the partition"
                    );
                }
                parent
            };
            indices.add(entry, parent);
            next_id = next_id.max(entry.id().next());
        }
        info!(
            target: LOG_TARGET,
            partition = %partition_id,
            suffix = %suffix,
            entries = entries.len(),
            "rebuilt partition indices from store"
        );
        Ok(Self {
            id: partition_id,
            suffix,
            schema,
            state: Arc::new(RwLock::new(PartitionState {
                store,
                indices,
                next_id,
            })),
        })
    }

    /// Creates the context entry at the suffix unless it already exists.
    /// The suffix's naming values are added to `attributes`. Returns `true`
    /// when the entry was created.
    ///
    /// # Errors
    ///
    /// Returns store or lock faults.
    pub fn initialize(&self, mut attributes: Attributes) -> Result<bool, PartitionError> {
        if self.has_entry(&self.suffix)? {
            return Ok(false);
        }
        if let Some(rdn) = self.suffix.rdn() {
            for ava in rdn.avas() {
                attributes.add_values(ava.normalized_type(), [ava.value()]);
            }
        }
        self.add(&self.suffix, attributes)?;
        info!(
            target: LOG_TARGET,
            partition = %self.id,
            suffix = %self.suffix,
            "created partition context entry"
        );
        Ok(true)
    }

    /// The schema this partition projects attributes with.
    #[must_use]
    pub fn schema(&self) -> Arc<dyn SchemaLookup> {
        Arc::clone(&self.schema)
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Fails when the lock is poisoned.
    pub fn entry_count(&self) -> Result<usize, PartitionError> {
        Ok(self.read()?.indices.len())
    }

    /// Runs `inspect` against the current indices under the read lock.
    ///
    /// # Errors
    ///
    /// Fails when the lock is poisoned.
    pub fn with_indices<R>(&self, inspect: impl FnOnce(&IndexSet) -> R) -> Result<R, PartitionError> {
        Ok(inspect(&self.read()?.indices))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PartitionState>, PartitionError> {
        self.state
            .read()
            .map_err(|_| PartitionError::internal(format!("partition '{}' lock poisoned", self.id)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PartitionState>, PartitionError> {
        self.state
            .write()
            .map_err(|_| PartitionError::internal(format!("partition '{}' lock poisoned", self.id)))
    }

    fn ensure_within(&self, name: &Name) -> Result<(), PartitionError> {
        if name.is_within(&self.suffix) {
            Ok(())
        } else {
            Err(PartitionError::OutsideSuffix {
                name: name.to_string(),
                suffix: self.suffix.to_string(),
            })
        }
    }

    fn cursor(&self, records: Vec<(EntryId, Vec<u8>)>, projection: Projection) -> EntryStream {
        Box::new(EntryCursor {
            records: records.into_iter(),
            projection,
            schema: Arc::clone(&self.schema),
        })
    }
}

impl fmt::Debug for MemoryPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPartition")
            .field("id", &self.id)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

impl Partition for MemoryPartition {
    fn id(&self) -> &str {
        &self.id
    }

    fn suffix(&self) -> &Name {
        &self.suffix
    }

    fn add(&self, name: &Name, attributes: Attributes) -> Result<EntryId, PartitionError> {
        self.ensure_within(name)?;
        let mut state = self.write()?;
        if state.indices.id_of(name).is_some() {
            return Err(PartitionError::entry_already_exists(name));
        }
        let parent = if *name == self.suffix {
            None
        } else {
            let parent_name = name
                .parent()
                .ok_or_else(|| PartitionError::name_not_found(name))?;
            Some(state.require(&parent_name)?)
        };
        let id = state.next_id;
        let entry = Entry::new(id, name.clone(), attributes);
        let record = StoredEntry::encode(&entry)?;
        state.store.apply(vec![StoreOp::Put { id, record }])?;
        state.next_id = id.next();
        state.indices.add(&entry, parent);
        debug!(target: LOG_TARGET, partition = %self.id, entry = %name, %id, "added entry");
        Ok(id)
    }

    fn delete(&self, name: &Name) -> Result<(), PartitionError> {
        self.ensure_within(name)?;
        let mut state = self.write()?;
        let id = state.require(name)?;
        ensure_leaf(name, state.indices.hierarchy().child_count(id))?;
        state.store.apply(vec![StoreOp::Delete { id }])?;
        state.indices.forget(id);
        debug!(target: LOG_TARGET, partition = %self.id, entry = %name, %id, "deleted entry");
        Ok(())
    }

    fn modify_many(&self, name: &Name, modifications: &[Modification]) -> Result<(), PartitionError> {
        self.ensure_within(name)?;
        let mut state = self.write()?;
        let id = state.require(name)?;
        let current = state.load_indexed(id)?;
        let mut attributes = current.attributes().clone();
        for modification in modifications {
            modification.apply_to(name, &mut attributes)?;
        }
        let updated = current.with_attributes(attributes);
        let record = StoredEntry::encode(&updated)?;
        state.store.apply(vec![StoreOp::Put { id, record }])?;
        let parent = state.indices.hierarchy().parent(id);
        state.refile(&updated, parent);
        debug!(
            target: LOG_TARGET,
            partition = %self.id,
            entry = %name,
            changes = modifications.len(),
            "modified entry"
        );
        Ok(())
    }

    fn relocate(&self, name: &Name, relocation: &Relocation) -> Result<Name, PartitionError> {
        let new_parent = &relocation.new_parent;
        self.ensure_within(name)?;
        if *name == self.suffix {
            return Err(PartitionError::unsupported(format!(
                "the context entry '{name}' of partition '{}' cannot be renamed or moved",
                self.id
            )));
        }
        if !new_parent.is_within(&self.suffix) {
            return Err(PartitionError::unsupported(format!(
                "'{new_parent}' lies outside partition '{}'",
                self.id
            )));
        }
        if new_parent.is_within(name) {
            return Err(PartitionError::unsupported(format!(
                "cannot move '{name}' below itself"
            )));
        }

        let mut state = self.write()?;
        let id = state.require(name)?;
        let parent_id = state.require(new_parent)?;
        let old_rdn = name
            .rdn()
            .ok_or_else(|| PartitionError::internal(format!("'{name}' has no leaf component")))?;
        let new_name = new_parent.child(relocation.new_rdn.as_ref().unwrap_or(old_rdn).clone());
        if new_name != *name && state.indices.id_of(&new_name).is_some() {
            return Err(PartitionError::entry_already_exists(&new_name));
        }

        let current = state.load_indexed(id)?;
        let mut attributes = current.attributes().clone();
        if let Some(fresh) = &relocation.new_rdn {
            for ava in fresh.avas() {
                attributes.add_values(ava.normalized_type(), [ava.value()]);
            }
            if relocation.delete_old_rdn {
                for ava in old_rdn.avas() {
                    if !fresh.contains(ava.normalized_type(), ava.value()) {
                        attributes.remove_value(ava.normalized_type(), ava.value());
                    }
                }
            }
        }
        for modification in &relocation.modifications {
            modification.apply_to(&new_name, &mut attributes)?;
        }

        let mut moved = vec![(Entry::new(id, new_name.clone(), attributes), Some(parent_id))];
        for descendant in state.indices.hierarchy().descendants(id) {
            let entry = state.load_indexed(descendant)?;
            let renamed = entry.name().rebase(name, &new_name).ok_or_else(|| {
                PartitionError::internal(format!("'{}' is not below '{name}'", entry.name()))
            })?;
            let parent = state.indices.hierarchy().parent(descendant);
            moved.push((entry.renamed(renamed), parent));
        }
        let batch = moved
            .iter()
            .map(|(entry, _)| {
                StoredEntry::encode(entry).map(|record| StoreOp::Put {
                    id: entry.id(),
                    record,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        state.store.apply(batch)?;
        for (entry, parent) in &moved {
            state.refile(entry, *parent);
        }
        debug!(
            target: LOG_TARGET,
            partition = %self.id,
            from = %name,
            to = %new_name,
            descendants = moved.len().saturating_sub(1),
            changes = relocation.modifications.len(),
            "relocated entry"
        );
        Ok(new_name)
    }

    fn list(&self, base: &Name) -> Result<EntryStream, PartitionError> {
        self.ensure_within(base)?;
        let records = {
            let state = self.read()?;
            let id = state.require(base)?;
            state.snapshot(state.indices.hierarchy().children(id).into_iter().collect())?
        };
        Ok(self.cursor(records, Projection::all()))
    }

    fn search(
        &self,
        base: &Name,
        _environment: &Environment,
        filter: &Filter,
        controls: &SearchControls,
    ) -> Result<EntryStream, PartitionError> {
        filter.validate()?;
        self.ensure_within(base)?;
        let records = {
            let state = self.read()?;
            let loader = |id: EntryId| state.load(id);
            let engine = SearchEngine::new(&state.indices, &loader);
            let candidates = engine.candidates(base, filter, controls)?;
            state.snapshot(candidates)?
        };
        Ok(self.cursor(records, controls.projection()))
    }

    fn lookup(&self, name: &Name) -> Result<Option<Entry>, PartitionError> {
        if !name.is_within(&self.suffix) {
            return Ok(None);
        }
        let state = self.read()?;
        match state.indices.id_of(name) {
            Some(id) => state.load(id),
            None => Ok(None),
        }
    }

    fn lookup_attributes(
        &self,
        name: &Name,
        attributes: &[String],
    ) -> Result<Option<Entry>, PartitionError> {
        let projection = Projection::requested(attributes, false);
        Ok(self
            .lookup(name)?
            .map(|entry| projection.apply(entry, self.schema.as_ref())))
    }

    fn has_entry(&self, name: &Name) -> Result<bool, PartitionError> {
        Ok(self.read()?.indices.id_of(name).is_some())
    }
}

/// Decodes records captured when the cursor opened, one at a time.
struct EntryCursor {
    records: std::vec::IntoIter<(EntryId, Vec<u8>)>,
    projection: Projection,
    schema: Arc<dyn SchemaLookup>,
}

impl Iterator for EntryCursor {
    type Item = Result<Entry, PartitionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, record) = self.records.next()?;
        Some(
            StoredEntry::decode(id, &record)
                .map(|entry| self.projection.apply(entry, self.schema.as_ref()))
                .map_err(PartitionError::from),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}
