//! The capability interface every partition implements.

use arbor_name::{Name, Rdn};

use crate::attributes::Attributes;
use crate::entry::{Entry, EntryId, ModOp, Modification};
use crate::error::PartitionError;
use crate::filter::Filter;
use crate::search::{Environment, SearchControls};

/// Lazily decoded entries. Every item comes from the committed state the
/// stream was opened against; later writes are not observed.
pub type EntryStream = Box<dyn Iterator<Item = Result<Entry, PartitionError>> + Send>;

/// Where a rename or move sends an entry, and what else changes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Parent of the entry afterwards.
    pub new_parent: Name,
    /// Replacement leaf component; `None` keeps the current one.
    pub new_rdn: Option<Rdn>,
    /// Remove the old naming values from the entry.
    pub delete_old_rdn: bool,
    /// Changes to the relocated entry committed together with the move.
    pub modifications: Vec<Modification>,
}

impl Relocation {
    /// Renames `name` in place.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::Unsupported`] for the root name.
    pub fn rename(name: &Name, new_rdn: Rdn, delete_old_rdn: bool) -> Result<Self, PartitionError> {
        let new_parent = name
            .parent()
            .ok_or_else(|| PartitionError::unsupported("the root name cannot be renamed"))?;
        Ok(Self::move_and_rename(new_parent, new_rdn, delete_old_rdn))
    }

    /// Moves below `new_parent`, keeping the leaf component.
    #[must_use]
    pub const fn move_to(new_parent: Name) -> Self {
        Self {
            new_parent,
            new_rdn: None,
            delete_old_rdn: false,
            modifications: Vec::new(),
        }
    }

    /// Moves below `new_parent` under `new_rdn`.
    #[must_use]
    pub const fn move_and_rename(new_parent: Name, new_rdn: Rdn, delete_old_rdn: bool) -> Self {
        Self {
            new_parent,
            new_rdn: Some(new_rdn),
            delete_old_rdn,
            modifications: Vec::new(),
        }
    }

    /// Adds changes applied to the entry in the same commit.
    #[must_use]
    pub fn with_modifications(mut self, modifications: Vec<Modification>) -> Self {
        self.modifications = modifications;
        self
    }

    /// The name `name` carries once relocated, or `None` for the root name.
    #[must_use]
    pub fn destination(&self, name: &Name) -> Option<Name> {
        self.new_rdn
            .as_ref()
            .or_else(|| name.rdn())
            .map(|rdn| self.new_parent.child(rdn.clone()))
    }
}

/// A storage partition owning one suffix of the namespace.
///
/// Names passed to a partition are expected to lie within its suffix.
/// Every mutating call leaves the partition's indices consistent with its
/// entry store before it returns, whether it succeeds or fails.
pub trait Partition: Send + Sync {
    /// Stable identifier of the partition.
    fn id(&self) -> &str;

    /// The suffix this partition owns.
    fn suffix(&self) -> &Name;

    /// Adds an entry. Its parent must already exist unless `name` is the
    /// suffix.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::EntryAlreadyExists`] or
    /// [`PartitionError::NameNotFound`] for a missing parent.
    fn add(&self, name: &Name, attributes: Attributes) -> Result<EntryId, PartitionError>;

    /// Deletes a leaf entry.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::NameNotFound`] or
    /// [`PartitionError::NonEmptyContainer`].
    fn delete(&self, name: &Name) -> Result<(), PartitionError>;

    /// Applies one kind of change to several attributes.
    ///
    /// # Errors
    ///
    /// As for [`modify_many`](Self::modify_many).
    fn modify(&self, name: &Name, op: ModOp, attributes: &Attributes) -> Result<(), PartitionError> {
        let modifications: Vec<Modification> = attributes
            .iter()
            .map(|attribute| Modification::new(op, attribute.clone()))
            .collect();
        self.modify_many(name, &modifications)
    }

    /// Applies a sequence of changes atomically.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::NameNotFound`] or
    /// [`PartitionError::NoSuchAttribute`]. A failed call changes nothing.
    fn modify_many(&self, name: &Name, modifications: &[Modification]) -> Result<(), PartitionError>;

    /// Renames and/or moves an entry, applying the relocation's
    /// modifications in the same commit, and returns its new name.
    /// Descendant names follow.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::NameNotFound`] for the entry or new
    /// parent, [`PartitionError::EntryAlreadyExists`] for an occupied
    /// destination, [`PartitionError::NoSuchAttribute`] from the
    /// modifications and [`PartitionError::Unsupported`] for the suffix
    /// entry or a destination outside the partition or below the entry
    /// itself. A failed call changes nothing.
    fn relocate(&self, name: &Name, relocation: &Relocation) -> Result<Name, PartitionError>;

    /// Renames an entry in place and returns its new name.
    ///
    /// # Errors
    ///
    /// As for [`relocate`](Self::relocate).
    fn modify_rn(&self, name: &Name, new_rdn: &Rdn, delete_old_rdn: bool) -> Result<Name, PartitionError> {
        self.relocate(name, &Relocation::rename(name, new_rdn.clone(), delete_old_rdn)?)
    }

    /// Moves an entry below `new_parent` and returns its new name.
    ///
    /// # Errors
    ///
    /// As for [`relocate`](Self::relocate).
    fn move_to(&self, name: &Name, new_parent: &Name) -> Result<Name, PartitionError> {
        self.relocate(name, &Relocation::move_to(new_parent.clone()))
    }

    /// Moves and renames an entry in one step and returns its new name.
    ///
    /// # Errors
    ///
    /// As for [`relocate`](Self::relocate).
    fn move_and_rename(
        &self,
        name: &Name,
        new_parent: &Name,
        new_rdn: &Rdn,
        delete_old_rdn: bool,
    ) -> Result<Name, PartitionError> {
        self.relocate(
            name,
            &Relocation::move_and_rename(new_parent.clone(), new_rdn.clone(), delete_old_rdn),
        )
    }

    /// Direct children of `base`.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::NameNotFound`].
    fn list(&self, base: &Name) -> Result<EntryStream, PartitionError>;

    /// Entries below `base` matching `filter`.
    ///
    /// # Errors
    ///
    /// Fails with [`PartitionError::InvalidFilter`] or
    /// [`PartitionError::NameNotFound`] before any entry is produced.
    fn search(
        &self,
        base: &Name,
        environment: &Environment,
        filter: &Filter,
        controls: &SearchControls,
    ) -> Result<EntryStream, PartitionError>;

    /// The entry at `name`, or `None`.
    ///
    /// # Errors
    ///
    /// Fails on store or lock faults.
    fn lookup(&self, name: &Name) -> Result<Option<Entry>, PartitionError>;

    /// The entry at `name` restricted to the requested attributes.
    ///
    /// # Errors
    ///
    /// Fails on store or lock faults.
    fn lookup_attributes(
        &self,
        name: &Name,
        attributes: &[String],
    ) -> Result<Option<Entry>, PartitionError>;

    /// Returns `true` when an entry exists at `name`.
    ///
    /// # Errors
    ///
    /// Fails on lock faults.
    fn has_entry(&self, name: &Name) -> Result<bool, PartitionError>;
}
