//! Errors raised by partitions and entry stores.

use std::sync::Arc;

use arbor_name::NameError;
use thiserror::Error;

use crate::entry::EntryId;

/// Failures reported by an [`EntryStore`](crate::EntryStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// An entry could not be serialized.
    #[error("failed to encode entry record: {source}")]
    Encode {
        /// Underlying serializer error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// A stored record could not be decoded.
    #[error("failed to decode record {id}: {source}")]
    Decode {
        /// Identifier of the corrupt record.
        id: EntryId,
        /// Underlying deserializer error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The backing engine reported a failure.
    #[error("entry store failure: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates an encode error.
    #[must_use]
    pub fn encode(source: serde_json::Error) -> Self {
        Self::Encode {
            source: Arc::new(source),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(id: EntryId, source: serde_json::Error) -> Self {
        Self::Decode {
            id,
            source: Arc::new(source),
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Errors returned by [`Partition`](crate::Partition) operations.
#[derive(Debug, Clone, Error)]
pub enum PartitionError {
    /// No entry exists at the name.
    #[error("no such entry: '{name}'")]
    NameNotFound {
        /// The missing name.
        name: String,
    },

    /// An entry already exists at the name.
    #[error("entry already exists: '{name}'")]
    EntryAlreadyExists {
        /// The occupied name.
        name: String,
    },

    /// A delete targeted an entry that still has children.
    #[error("cannot delete '{name}': entry has {children} children")]
    NonEmptyContainer {
        /// The non-leaf entry.
        name: String,
        /// Number of direct children.
        children: usize,
    },

    /// The name lies outside this partition's suffix.
    #[error("'{name}' is not within partition suffix '{suffix}'")]
    OutsideSuffix {
        /// The offending name.
        name: String,
        /// The partition suffix.
        suffix: String,
    },

    /// A modification removed an attribute or value that is not present.
    #[error("entry '{name}' has no attribute or value '{attribute}' to remove")]
    NoSuchAttribute {
        /// Entry being modified.
        name: String,
        /// The missing attribute type.
        attribute: String,
    },

    /// The change would leave the entry without a structural class or strip
    /// its naming value.
    #[error("structural violation on '{name}': {message}")]
    StructuralViolation {
        /// Entry being changed.
        name: String,
        /// What rule was broken.
        message: String,
    },

    /// The filter is malformed.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// What is wrong with the filter.
        message: String,
    },

    /// A name could not be parsed.
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// The operation is not meaningful for this partition.
    #[error("unsupported operation: {message}")]
    Unsupported {
        /// Why the operation was refused.
        message: String,
    },

    /// The entry store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An internal invariant was broken, for example a poisoned lock.
    #[error("internal partition error: {message}")]
    Internal {
        /// Description of the fault.
        message: String,
    },
}

impl PartitionError {
    /// Creates a name-not-found error.
    #[must_use]
    pub fn name_not_found(name: impl ToString) -> Self {
        Self::NameNotFound {
            name: name.to_string(),
        }
    }

    /// Creates an entry-already-exists error.
    #[must_use]
    pub fn entry_already_exists(name: impl ToString) -> Self {
        Self::EntryAlreadyExists {
            name: name.to_string(),
        }
    }

    /// Creates a structural violation error.
    #[must_use]
    pub fn structural_violation(name: impl ToString, message: impl Into<String>) -> Self {
        Self::StructuralViolation {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Creates an invalid filter error.
    #[must_use]
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
