//! The keyed record store beneath a partition.

use std::collections::BTreeMap;

use arbor_name::Name;
use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::entry::{Entry, EntryId};
use crate::error::StoreError;

/// A single write in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Insert or overwrite the record for `id`.
    Put {
        /// Record key.
        id: EntryId,
        /// Encoded record.
        record: Vec<u8>,
    },
    /// Remove the record for `id`. Missing records are ignored.
    Delete {
        /// Record key.
        id: EntryId,
    },
}

/// Opaque keyed storage of entry records.
///
/// Implementations must apply a batch entirely or not at all.
pub trait EntryStore: Send + Sync {
    /// Fetches the record for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn get(&self, id: EntryId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Lists every stored key in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn ids(&self) -> Result<Vec<EntryId>, StoreError>;

    /// Applies a batch of writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the batch could not be committed. No part
    /// of a failed batch is visible afterwards.
    fn apply(&mut self, batch: Vec<StoreOp>) -> Result<(), StoreError>;
}

/// A [`BTreeMap`]-backed store.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    records: BTreeMap<EntryId, Vec<u8>>,
}

impl MemoryEntryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EntryStore for MemoryEntryStore {
    fn get(&self, id: EntryId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(&id).cloned())
    }

    fn ids(&self) -> Result<Vec<EntryId>, StoreError> {
        Ok(self.records.keys().copied().collect())
    }

    fn apply(&mut self, batch: Vec<StoreOp>) -> Result<(), StoreError> {
        for op in batch {
            match op {
                StoreOp::Put { id, record } => {
                    self.records.insert(id, record);
                }
                StoreOp::Delete { id } => {
                    self.records.remove(&id);
                }
            }
        }
        Ok(())
    }
}

/// The serialized form of an entry. The identifier is the store key and is
/// not repeated inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Name in its user-provided form.
    pub name: Name,
    /// Attribute values.
    pub attributes: Attributes,
}

impl StoredEntry {
    /// Encodes an entry for storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] when serialization fails.
    pub fn encode(entry: &Entry) -> Result<Vec<u8>, StoreError> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            name: &'a Name,
            attributes: &'a Attributes,
        }
        serde_json::to_vec(&Borrowed {
            name: entry.name(),
            attributes: entry.attributes(),
        })
        .map_err(StoreError::encode)
    }

    /// Decodes the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] when the record is corrupt.
    pub fn decode(id: EntryId, record: &[u8]) -> Result<Entry, StoreError> {
        let stored: Self =
            serde_json::from_slice(record).map_err(|source| StoreError::decode(id, source))?;
        Ok(Entry::new(id, stored.name, stored.attributes))
    }
}
