//! Storage partitions for the Arbor directory core.
//!
//! A partition owns one subtree of the namespace, rooted at its suffix. It
//! stores entries in an opaque keyed [`EntryStore`] and keeps an [`IndexSet`]
//! in step with every mutation:
//!
//! - the **existence** index answers presence filters,
//! - the **hierarchy** index links entries to their parent and children,
//! - the **name** indices resolve normalized and user-provided names to ids,
//! - the **alias** indices record alias targets and where aliases live,
//! - **user** indices map normalized values of configured attributes to ids.
//!
//! The [`Partition`] trait is the single capability interface the router
//! talks to. [`MemoryPartition`] implements it over any [`EntryStore`],
//! serializing mutations behind a writer lock so readers never observe an
//! entry whose indices disagree with the store.
//!
//! Searches run through the [`SearchEngine`], which evaluates a [`Filter`]
//! against the indices, falls back to a scope scan for unindexed leaves and
//! yields results lazily.

mod attributes;
mod checks;
mod entry;
mod error;
mod filter;
mod index;
mod memory;
mod partition;
mod schema;
mod search;
mod store;

pub use attributes::{Attribute, Attributes};
pub use checks::{ensure_leaf, ensure_rdn_preserved, ensure_structural_class};
pub use entry::{Entry, EntryId, ModOp, Modification};
pub use error::{PartitionError, StoreError};
pub use filter::Filter;
pub use index::{HierarchyIndex, IndexSet, NameIndex, ValueIndex};
pub use memory::MemoryPartition;
pub use partition::{EntryStream, Partition, Relocation};
pub use schema::{AttributeUsage, ObjectClassKind, SchemaLookup, StaticSchema};
pub use search::{
    AliasDerefMode, EntryLoader, Environment, Projection, SearchControls, SearchEngine, SearchScope,
};
pub use store::{EntryStore, MemoryEntryStore, StoreOp, StoredEntry};

#[cfg(test)]
mod tests;
