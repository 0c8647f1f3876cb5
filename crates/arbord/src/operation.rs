//! The operation envelope threaded through the interceptor chain.

use std::fmt;

use arbor_name::{Name, Rdn};
use arbor_partition::{
    Attributes, Entry, EntryId, EntryStream, Environment, Filter, Modification, Relocation,
    SearchControls,
};
use strum::{Display, EnumString};

/// The kinds of directory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OperationKind {
    /// Create an entry.
    Add,
    /// Remove a leaf entry.
    Delete,
    /// Change attribute values.
    Modify,
    /// Change an entry's RDN.
    Rename,
    /// Re-parent an entry.
    Move,
    /// Re-parent and rename in one step.
    MoveAndRename,
    /// Enumerate direct children.
    List,
    /// Evaluate a filter below a base.
    Search,
    /// Fetch one entry.
    Lookup,
    /// Test for an entry.
    HasEntry,
}

impl OperationKind {
    /// Returns `true` for operations that change stored entries.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Delete | Self::Modify | Self::Rename | Self::Move | Self::MoveAndRename
        )
    }
}

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Principal {
    /// No bound identity.
    #[default]
    Anonymous,
    /// An authenticated identity.
    Authenticated(Name),
}

impl Principal {
    /// Returns `true` for the anonymous principal.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// The bound name, if any.
    #[must_use]
    pub const fn name(&self) -> Option<&Name> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(name) => Some(name),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated(name) => write!(f, "{name}"),
        }
    }
}

/// An operation and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create `name` with `attributes`.
    Add {
        /// Target name.
        name: Name,
        /// Initial attributes.
        attributes: Attributes,
    },
    /// Delete the leaf `name`.
    Delete {
        /// Target name.
        name: Name,
    },
    /// Apply `modifications` to `name` in order.
    Modify {
        /// Target name.
        name: Name,
        /// Changes to apply.
        modifications: Vec<Modification>,
    },
    /// Rename `name` in place.
    Rename {
        /// Target name.
        name: Name,
        /// Replacement leaf component.
        new_rdn: Rdn,
        /// Remove the old naming values from the entry.
        delete_old_rdn: bool,
        /// Changes committed together with the rename.
        modifications: Vec<Modification>,
    },
    /// Move `name` below `new_parent`.
    Move {
        /// Target name.
        name: Name,
        /// Destination parent.
        new_parent: Name,
        /// Changes committed together with the move.
        modifications: Vec<Modification>,
    },
    /// Move `name` below `new_parent` under a new RDN.
    MoveAndRename {
        /// Target name.
        name: Name,
        /// Destination parent.
        new_parent: Name,
        /// Replacement leaf component.
        new_rdn: Rdn,
        /// Remove the old naming values from the entry.
        delete_old_rdn: bool,
        /// Changes committed together with the move.
        modifications: Vec<Modification>,
    },
    /// List the children of `name`.
    List {
        /// Base entry.
        name: Name,
    },
    /// Search below `name`.
    Search {
        /// Base entry.
        name: Name,
        /// Match condition.
        filter: Filter,
        /// Scope, projection and limits.
        controls: SearchControls,
    },
    /// Fetch `name`, restricted to `attributes` when any are given.
    Lookup {
        /// Target name.
        name: Name,
        /// Requested attribute types.
        attributes: Vec<String>,
    },
    /// Test whether `name` exists.
    HasEntry {
        /// Target name.
        name: Name,
    },
}

impl Operation {
    /// The kind of this operation.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Add { .. } => OperationKind::Add,
            Self::Delete { .. } => OperationKind::Delete,
            Self::Modify { .. } => OperationKind::Modify,
            Self::Rename { .. } => OperationKind::Rename,
            Self::Move { .. } => OperationKind::Move,
            Self::MoveAndRename { .. } => OperationKind::MoveAndRename,
            Self::List { .. } => OperationKind::List,
            Self::Search { .. } => OperationKind::Search,
            Self::Lookup { .. } => OperationKind::Lookup,
            Self::HasEntry { .. } => OperationKind::HasEntry,
        }
    }

    /// The name the operation targets.
    #[must_use]
    pub const fn name(&self) -> &Name {
        match self {
            Self::Add { name, .. }
            | Self::Delete { name }
            | Self::Modify { name, .. }
            | Self::Rename { name, .. }
            | Self::Move { name, .. }
            | Self::MoveAndRename { name, .. }
            | Self::List { name }
            | Self::Search { name, .. }
            | Self::Lookup { name, .. }
            | Self::HasEntry { name } => name,
        }
    }

    /// Mutable access to the target name.
    pub const fn name_mut(&mut self) -> &mut Name {
        match self {
            Self::Add { name, .. }
            | Self::Delete { name }
            | Self::Modify { name, .. }
            | Self::Rename { name, .. }
            | Self::Move { name, .. }
            | Self::MoveAndRename { name, .. }
            | Self::List { name }
            | Self::Search { name, .. }
            | Self::Lookup { name, .. }
            | Self::HasEntry { name } => name,
        }
    }

    /// The partition-level request for a rename or move, or `None` for
    /// other operations and for renames of the root name.
    #[must_use]
    pub fn relocation(&self) -> Option<Relocation> {
        let relocation = match self {
            Self::Rename {
                name,
                new_rdn,
                delete_old_rdn,
                modifications,
            } => Relocation::rename(name, new_rdn.clone(), *delete_old_rdn)
                .ok()?
                .with_modifications(modifications.clone()),
            Self::Move {
                new_parent,
                modifications,
                ..
            } => Relocation::move_to(new_parent.clone()).with_modifications(modifications.clone()),
            Self::MoveAndRename {
                new_parent,
                new_rdn,
                delete_old_rdn,
                modifications,
                ..
            } => Relocation::move_and_rename(new_parent.clone(), new_rdn.clone(), *delete_old_rdn)
                .with_modifications(modifications.clone()),
            _ => return None,
        };
        Some(relocation)
    }

    /// Mutable access to the changes a write carries: the modifications of
    /// a modify, rename or move.
    pub const fn modifications_mut(&mut self) -> Option<&mut Vec<Modification>> {
        match self {
            Self::Modify { modifications, .. }
            | Self::Rename { modifications, .. }
            | Self::Move { modifications, .. }
            | Self::MoveAndRename { modifications, .. } => Some(modifications),
            _ => None,
        }
    }

    /// The name the entry will carry once a rename or move succeeds.
    #[must_use]
    pub fn destination(&self) -> Option<Name> {
        self.relocation()
            .and_then(|relocation| relocation.destination(self.name()))
    }
}

/// Everything a stage sees: who, what and the settings passed along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Acting principal.
    pub principal: Principal,
    /// The operation and its payload.
    pub operation: Operation,
    /// Opaque settings passed alongside the operation.
    pub environment: Environment,
}

impl OperationContext {
    /// Wraps an operation for `principal` with an empty environment.
    #[must_use]
    pub fn new(principal: Principal, operation: Operation) -> Self {
        Self {
            principal,
            operation,
            environment: Environment::new(),
        }
    }

    /// The operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// The target name.
    #[must_use]
    pub const fn name(&self) -> &Name {
        self.operation.name()
    }
}

/// What an operation produced.
pub enum OperationResult {
    /// An entry was added with this identifier.
    Added(EntryId),
    /// A delete or modify completed.
    Completed,
    /// A rename or move completed; the entry's new name.
    Relocated(Name),
    /// Lazily produced entries from a list or search.
    Entries(EntryStream),
    /// A fetched entry, or `None` when absent.
    Entry(Option<Entry>),
    /// The outcome of an existence test.
    Exists(bool),
}

impl OperationResult {
    /// Short label for logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Completed => "completed",
            Self::Relocated(_) => "relocated",
            Self::Entries(_) => "entries",
            Self::Entry(_) => "entry",
            Self::Exists(_) => "exists",
        }
    }
}

impl fmt::Debug for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added(id) => f.debug_tuple("Added").field(id).finish(),
            Self::Completed => f.write_str("Completed"),
            Self::Relocated(name) => f.debug_tuple("Relocated").field(name).finish(),
            Self::Entries(_) => f.write_str("Entries(..)"),
            Self::Entry(entry) => f.debug_tuple("Entry").field(entry).finish(),
            Self::Exists(exists) => f.debug_tuple("Exists").field(exists).finish(),
        }
    }
}
