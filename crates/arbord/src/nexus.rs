//! Longest-suffix routing of operations to partitions.
//!
//! The nexus owns the suffix registry. Every backing-store call resolves the
//! target name to the partition with the longest registered suffix that is
//! an ancestor of (or equal to) the name, then delegates unchanged. Lookups
//! walk the name's ancestors leaf side first, so resolution costs one hash
//! probe per name component regardless of how many partitions are mounted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_name::{Name, Rdn};
use arbor_partition::{
    Attributes, Entry, EntryId, EntryStream, Environment, Filter, ModOp, Modification, Partition,
    Relocation, SearchControls,
};
use tracing::{debug, info};

use crate::error::DirectoryError;
use crate::operation::{Operation, OperationContext, OperationResult};

const NEXUS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::nexus");

/// Registry of mounted partitions keyed by normalized suffix.
#[derive(Default)]
pub struct PartitionNexus {
    partitions: RwLock<HashMap<String, Arc<dyn Partition>>>,
}

impl PartitionNexus {
    /// An empty nexus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<dyn Partition>>>, DirectoryError> {
        self.partitions
            .read()
            .map_err(|_| DirectoryError::internal("suffix registry lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<dyn Partition>>>, DirectoryError> {
        self.partitions
            .write()
            .map_err(|_| DirectoryError::internal("suffix registry lock poisoned"))
    }

    /// Mounts `partition` at its suffix.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::DuplicateSuffix`] when the suffix is taken
    /// and [`DirectoryError::DuplicatePartitionId`] when the identifier is.
    pub fn register(&self, partition: Arc<dyn Partition>) -> Result<(), DirectoryError> {
        let suffix = partition.suffix().clone();
        let mut partitions = self.write()?;
        if partitions.contains_key(suffix.normalized()) {
            return Err(DirectoryError::DuplicateSuffix {
                suffix: suffix.to_string(),
            });
        }
        if partitions
            .values()
            .any(|mounted| mounted.id() == partition.id())
        {
            return Err(DirectoryError::DuplicatePartitionId {
                id: partition.id().to_owned(),
            });
        }
        info!(
            target: NEXUS_TARGET,
            partition = partition.id(),
            suffix = %suffix,
            "registered partition"
        );
        partitions.insert(suffix.normalized().to_owned(), partition);
        Ok(())
    }

    /// Unmounts the partition at `suffix`, returning it. Absent suffixes are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Fails only when the registry lock is poisoned.
    pub fn unregister(&self, suffix: &Name) -> Result<Option<Arc<dyn Partition>>, DirectoryError> {
        let removed = self.write()?.remove(suffix.normalized());
        if let Some(partition) = &removed {
            info!(
                target: NEXUS_TARGET,
                partition = partition.id(),
                suffix = %suffix,
                "unregistered partition"
            );
        }
        Ok(removed)
    }

    /// The partition owning `name`: the one whose suffix is the longest
    /// registered ancestor-or-self of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NameNotFound`] when no suffix covers `name`.
    pub fn resolve(&self, name: &Name) -> Result<Arc<dyn Partition>, DirectoryError> {
        let partitions = self.read()?;
        name.normalized_ancestors()
            .find_map(|candidate| partitions.get(candidate))
            .cloned()
            .ok_or_else(|| DirectoryError::name_not_found(name))
    }

    /// Suffix of the partition owning `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NameNotFound`] when no suffix covers `name`.
    pub fn suffix_of(&self, name: &Name) -> Result<Name, DirectoryError> {
        Ok(self.resolve(name)?.suffix().clone())
    }

    /// Snapshot of the registered suffixes.
    ///
    /// # Errors
    ///
    /// Fails only when the registry lock is poisoned.
    pub fn list_suffixes(&self) -> Result<Vec<Name>, DirectoryError> {
        let mut suffixes: Vec<Name> = self
            .read()?
            .values()
            .map(|partition| partition.suffix().clone())
            .collect();
        suffixes.sort();
        Ok(suffixes)
    }

    /// Returns `true` when `name` is exactly a registered suffix.
    ///
    /// # Errors
    ///
    /// Fails only when the registry lock is poisoned.
    pub fn is_suffix(&self, name: &Name) -> Result<bool, DirectoryError> {
        Ok(self.read()?.contains_key(name.normalized()))
    }

    /// Resolves the owner of an operation target. The empty name is the root
    /// DSE, which no partition serves.
    fn route(&self, name: &Name) -> Result<Arc<dyn Partition>, DirectoryError> {
        if name.is_empty() {
            return Err(DirectoryError::unsupported(
                "operations on the root DSE are not supported",
            ));
        }
        let partition = self.resolve(name)?;
        debug!(
            target: NEXUS_TARGET,
            name = %name,
            partition = partition.id(),
            "routed name"
        );
        Ok(partition)
    }

    /// Routes a rename or move. The destination must stay in the source
    /// partition, and neither the old nor the new name may sit on or above
    /// another partition's suffix.
    fn route_relocation(
        &self,
        name: &Name,
        destination: &Name,
    ) -> Result<Arc<dyn Partition>, DirectoryError> {
        let source = self.route(name)?;
        let target = self.route(destination)?;
        if source.id() != target.id() {
            return Err(DirectoryError::unsupported(format!(
                "cannot relocate '{name}' from partition '{}' to '{destination}' in partition '{}'",
                source.id(),
                target.id()
            )));
        }
        let partitions = self.read()?;
        let nested = partitions.values().find(|mounted| {
            mounted.id() != source.id()
                && (mounted.suffix().is_within(destination) || mounted.suffix().is_within(name))
        });
        if let Some(nested) = nested {
            return Err(DirectoryError::unsupported(format!(
                "cannot relocate '{name}' to '{destination}' across the suffix '{}' of partition '{}'",
                nested.suffix(),
                nested.id()
            )));
        }
        Ok(source)
    }

    /// Adds an entry.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn add(&self, name: &Name, attributes: Attributes) -> Result<EntryId, DirectoryError> {
        Ok(self.route(name)?.add(name, attributes)?)
    }

    /// Deletes a leaf entry.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn delete(&self, name: &Name) -> Result<(), DirectoryError> {
        Ok(self.route(name)?.delete(name)?)
    }

    /// Applies one kind of change to several attributes.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn modify(
        &self,
        name: &Name,
        op: ModOp,
        attributes: &Attributes,
    ) -> Result<(), DirectoryError> {
        Ok(self.route(name)?.modify(name, op, attributes)?)
    }

    /// Applies a sequence of changes.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn modify_many(
        &self,
        name: &Name,
        modifications: &[Modification],
    ) -> Result<(), DirectoryError> {
        Ok(self.route(name)?.modify_many(name, modifications)?)
    }

    /// Applies a rename or move, with any accompanying modifications, as a
    /// single change in the owning partition.
    ///
    /// # Errors
    ///
    /// Routing and partition errors; [`DirectoryError::Unsupported`] when
    /// the new name belongs to, or would contain, another partition.
    pub fn relocate(&self, name: &Name, relocation: &Relocation) -> Result<Name, DirectoryError> {
        let destination = relocation
            .destination(name)
            .ok_or_else(|| DirectoryError::unsupported("the root name cannot be relocated"))?;
        let partition = self.route_relocation(name, &destination)?;
        Ok(partition.relocate(name, relocation)?)
    }

    /// Renames an entry in place.
    ///
    /// # Errors
    ///
    /// As for [`relocate`](Self::relocate).
    pub fn modify_rn(
        &self,
        name: &Name,
        new_rdn: &Rdn,
        delete_old_rdn: bool,
    ) -> Result<Name, DirectoryError> {
        let relocation = Relocation::rename(name, new_rdn.clone(), delete_old_rdn)?;
        self.relocate(name, &relocation)
    }

    /// Moves an entry below `new_parent`.
    ///
    /// # Errors
    ///
    /// As for [`relocate`](Self::relocate).
    pub fn move_to(&self, name: &Name, new_parent: &Name) -> Result<Name, DirectoryError> {
        self.relocate(name, &Relocation::move_to(new_parent.clone()))
    }

    /// Moves and renames an entry.
    ///
    /// # Errors
    ///
    /// As for [`relocate`](Self::relocate).
    pub fn move_and_rename(
        &self,
        name: &Name,
        new_parent: &Name,
        new_rdn: &Rdn,
        delete_old_rdn: bool,
    ) -> Result<Name, DirectoryError> {
        let relocation =
            Relocation::move_and_rename(new_parent.clone(), new_rdn.clone(), delete_old_rdn);
        self.relocate(name, &relocation)
    }

    /// Direct children of `base`.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn list(&self, base: &Name) -> Result<EntryStream, DirectoryError> {
        Ok(self.route(base)?.list(base)?)
    }

    /// Searches below `base`.
    ///
    /// # Errors
    ///
    /// Routing and partition errors, raised before any result.
    pub fn search(
        &self,
        base: &Name,
        environment: &Environment,
        filter: &Filter,
        controls: &SearchControls,
    ) -> Result<EntryStream, DirectoryError> {
        Ok(self
            .route(base)?
            .search(base, environment, filter, controls)?)
    }

    /// Fetches an entry.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn lookup(&self, name: &Name) -> Result<Option<Entry>, DirectoryError> {
        Ok(self.route(name)?.lookup(name)?)
    }

    /// Fetches an entry restricted to `attributes`.
    ///
    /// # Errors
    ///
    /// Routing and partition errors.
    pub fn lookup_attributes(
        &self,
        name: &Name,
        attributes: &[String],
    ) -> Result<Option<Entry>, DirectoryError> {
        Ok(self.route(name)?.lookup_attributes(name, attributes)?)
    }

    /// Tests for an entry. Names outside every partition do not exist.
    ///
    /// # Errors
    ///
    /// Partition errors other than a missing owner.
    pub fn has_entry(&self, name: &Name) -> Result<bool, DirectoryError> {
        match self.route(name) {
            Ok(partition) => Ok(partition.has_entry(name)?),
            Err(DirectoryError::NameNotFound { .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Executes the operation in `context` against its owning partition.
    /// This is the terminal link of every interceptor chain.
    ///
    /// # Errors
    ///
    /// The errors of the delegated call.
    pub fn execute(&self, context: &OperationContext) -> Result<OperationResult, DirectoryError> {
        match &context.operation {
            Operation::Add { name, attributes } => {
                self.add(name, attributes.clone()).map(OperationResult::Added)
            }
            Operation::Delete { name } => self.delete(name).map(|()| OperationResult::Completed),
            Operation::Modify {
                name,
                modifications,
            } => self
                .modify_many(name, modifications)
                .map(|()| OperationResult::Completed),
            Operation::Rename { name, .. }
            | Operation::Move { name, .. }
            | Operation::MoveAndRename { name, .. } => {
                let relocation = context.operation.relocation().ok_or_else(|| {
                    DirectoryError::unsupported("the root name cannot be relocated")
                })?;
                self.relocate(name, &relocation)
                    .map(OperationResult::Relocated)
            }
            Operation::List { name } => self.list(name).map(OperationResult::Entries),
            Operation::Search {
                name,
                filter,
                controls,
            } => self
                .search(name, &context.environment, filter, controls)
                .map(OperationResult::Entries),
            Operation::Lookup { name, attributes } => {
                let entry = if attributes.is_empty() {
                    self.lookup(name)?
                } else {
                    self.lookup_attributes(name, attributes)?
                };
                Ok(OperationResult::Entry(entry))
            }
            Operation::HasEntry { name } => self.has_entry(name).map(OperationResult::Exists),
        }
    }
}
