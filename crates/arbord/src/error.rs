//! Errors surfaced by the directory core.
//!
//! Every expected condition is a typed variant. [`DirectoryError::Internal`]
//! is reserved for broken invariants such as a poisoned lock. Each variant
//! maps to an LDAP result code through [`DirectoryError::result_code`].

use arbor_config::ConfigError;
use arbor_name::NameError;
use arbor_partition::{PartitionError, StoreError};
use thiserror::Error;

use crate::operation::OperationKind;

/// Errors returned by the nexus, the interceptor chain and the service.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// No entry, or no partition, exists for the name.
    #[error("no such entry: '{name}'")]
    NameNotFound {
        /// The unresolved name.
        name: String,
    },

    /// An entry already exists at the name.
    #[error("entry already exists: '{name}'")]
    EntryAlreadyExists {
        /// The occupied name.
        name: String,
    },

    /// A delete targeted an entry with children.
    #[error("cannot delete '{name}': entry has {children} children")]
    NonEmptyContainer {
        /// The non-leaf entry.
        name: String,
        /// Number of direct children.
        children: usize,
    },

    /// A partition is already mounted at the suffix.
    #[error("a partition is already registered at suffix '{suffix}'")]
    DuplicateSuffix {
        /// The contested suffix.
        suffix: String,
    },

    /// A partition with the identifier is already mounted.
    #[error("a partition with id '{id}' is already registered")]
    DuplicatePartitionId {
        /// The contested identifier.
        id: String,
    },

    /// Two interceptor stages share a name.
    #[error("interceptor name '{name}' is used more than once")]
    DuplicateInterceptorName {
        /// The repeated name.
        name: String,
    },

    /// A configuration tag names no registered factory.
    #[error("unknown {category} kind '{kind}'")]
    UnknownKind {
        /// `interceptor` or `partition`.
        category: &'static str,
        /// The unrecognised tag.
        kind: String,
    },

    /// The change breaks object-class or naming structure.
    #[error("structural violation on '{name}': {message}")]
    StructuralViolation {
        /// Entry being changed.
        name: String,
        /// What rule was broken.
        message: String,
    },

    /// The change breaks an attribute constraint.
    #[error("schema violation on '{name}': {message}")]
    SchemaViolation {
        /// Entry being changed.
        name: String,
        /// What rule was broken.
        message: String,
    },

    /// A removal targeted an absent attribute or value.
    #[error("entry '{name}' has no attribute or value '{attribute}' to remove")]
    NoSuchAttribute {
        /// Entry being modified.
        name: String,
        /// The missing attribute type.
        attribute: String,
    },

    /// The search filter is malformed.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// What is wrong with the filter.
        message: String,
    },

    /// A name could not be parsed.
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// The operation is not supported in this form.
    #[error("unsupported operation: {message}")]
    Unsupported {
        /// Why the operation was refused.
        message: String,
    },

    /// The operation needs an authenticated principal.
    #[error("anonymous {operation} operations are not permitted")]
    Unauthenticated {
        /// The refused operation.
        operation: OperationKind,
    },

    /// The principal may not perform the operation on the name.
    #[error("'{principal}' may not {operation} '{name}'")]
    InsufficientAccess {
        /// Acting principal.
        principal: String,
        /// The refused operation.
        operation: OperationKind,
        /// Target name.
        name: String,
    },

    /// Configuration was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The entry store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An internal invariant was broken.
    #[error("internal directory error: {message}")]
    Internal {
        /// Description of the fault.
        message: String,
    },
}

impl DirectoryError {
    /// LDAP result code for this error.
    #[must_use]
    pub const fn result_code(&self) -> u8 {
        match self {
            Self::NoSuchAttribute { .. } => 16,
            Self::SchemaViolation { .. } => 19,
            Self::InvalidFilter { .. } => 2,
            Self::NameNotFound { .. } => 32,
            Self::InvalidName(_) => 34,
            Self::Unauthenticated { .. } => 48,
            Self::InsufficientAccess { .. } => 50,
            Self::Unsupported { .. } => 53,
            Self::StructuralViolation { .. } => 65,
            Self::NonEmptyContainer { .. } => 66,
            Self::EntryAlreadyExists { .. } => 68,
            Self::DuplicateSuffix { .. }
            | Self::DuplicatePartitionId { .. }
            | Self::DuplicateInterceptorName { .. }
            | Self::UnknownKind { .. }
            | Self::Configuration(_)
            | Self::Store(_)
            | Self::Internal { .. } => 80,
        }
    }

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

    /// Creates a schema violation error.
    #[must_use]
    pub fn schema_violation(name: impl ToString, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            name: name.to_string(),
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

impl From<PartitionError> for DirectoryError {
    fn from(error: PartitionError) -> Self {
        match error {
            PartitionError::NameNotFound { name } | PartitionError::OutsideSuffix { name, .. } => {
                Self::NameNotFound { name }
            }
            PartitionError::EntryAlreadyExists { name } => Self::EntryAlreadyExists { name },
            PartitionError::NonEmptyContainer { name, children } => {
                Self::NonEmptyContainer { name, children }
            }
            PartitionError::NoSuchAttribute { name, attribute } => {
                Self::NoSuchAttribute { name, attribute }
            }
            PartitionError::StructuralViolation { name, message } => {
                Self::StructuralViolation { name, message }
            }
            PartitionError::InvalidFilter { message } => Self::InvalidFilter { message },
            PartitionError::InvalidName(source) => Self::InvalidName(source),
            PartitionError::Unsupported { message } => Self::Unsupported { message },
            PartitionError::Store(source) => Self::Store(source),
            PartitionError::Internal { message } => Self::Internal { message },
        }
    }
}
