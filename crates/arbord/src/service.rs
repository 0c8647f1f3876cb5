//! The directory service: a nexus of partitions behind an interceptor chain.

use std::sync::Arc;

use arbor_config::ServerConfig;
use arbor_name::{Name, Rdn};
use arbor_partition::{
    Attributes, Entry, EntryId, EntryStream, Filter, ModOp, Modification, SchemaLookup,
    SearchControls,
};
use tracing::{debug, info};

use crate::chain::InterceptorChain;
use crate::error::DirectoryError;
use crate::factory::{InterceptorFactory, PartitionFactory, StageResources};
use crate::interceptors::{Clock, EventBus};
use crate::nexus::PartitionNexus;
use crate::operation::{Operation, OperationContext, OperationKind, OperationResult, Principal};

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Pluggable parts used when assembling a service from configuration.
pub struct ServiceComponents {
    /// Schema shared by partitions and stages.
    pub schema: Arc<dyn SchemaLookup>,
    /// Time source for operational attributes.
    pub clock: Arc<dyn Clock>,
    /// Interceptor kinds available to the configuration.
    pub interceptors: InterceptorFactory,
    /// Partition kinds available to the configuration.
    pub partitions: PartitionFactory,
}

impl Default for ServiceComponents {
    fn default() -> Self {
        Self {
            schema: Arc::new(arbor_partition::StaticSchema::core()),
            clock: Arc::new(crate::interceptors::SystemClock),
            interceptors: InterceptorFactory::with_defaults(),
            partitions: PartitionFactory::with_defaults(),
        }
    }
}

/// Owns the partition nexus, the interceptor chain and the event bus.
///
/// Every operation enters through [`DirectoryService::execute`], usually
/// via a [`Session`], and runs through the chain before reaching the
/// owning partition.
pub struct DirectoryService {
    nexus: PartitionNexus,
    chain: InterceptorChain,
    events: Arc<EventBus>,
    schema: Arc<dyn SchemaLookup>,
}

impl DirectoryService {
    /// Assembles a service from parts.
    #[must_use]
    pub const fn new(
        nexus: PartitionNexus,
        chain: InterceptorChain,
        events: Arc<EventBus>,
        schema: Arc<dyn SchemaLookup>,
    ) -> Self {
        Self {
            nexus,
            chain,
            events,
            schema,
        }
    }

    /// Builds the chain and mounts every partition named by `config`, then
    /// provisions the administrator entry when its parent exists.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, factory or registration failure.
    pub fn from_config(
        config: &ServerConfig,
        components: &ServiceComponents,
    ) -> Result<Self, DirectoryError> {
        config.validate()?;
        let events = Arc::new(EventBus::new());
        let resources = StageResources::from_config(
            config,
            Arc::clone(&components.schema),
            Arc::clone(&events),
            Arc::clone(&components.clock),
        )?;
        let chain = components
            .interceptors
            .build(&config.interceptors, &resources)?;
        let nexus = PartitionNexus::new();
        for partition in &config.partitions {
            nexus.register(
                components
                    .partitions
                    .build(partition, Arc::clone(&components.schema))?,
            )?;
        }
        provision_admin(&nexus, &resources.admin_principal)?;
        info!(
            target: SERVICE_TARGET,
            partitions = config.partitions.len(),
            stages = chain.len(),
            "directory service assembled"
        );
        Ok(Self::new(nexus, chain, events, Arc::clone(&components.schema)))
    }

    /// The partition nexus.
    #[must_use]
    pub const fn nexus(&self) -> &PartitionNexus {
        &self.nexus
    }

    /// The interceptor chain.
    #[must_use]
    pub const fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// The bus change listeners subscribe to.
    #[must_use]
    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// The shared schema.
    #[must_use]
    pub fn schema(&self) -> Arc<dyn SchemaLookup> {
        Arc::clone(&self.schema)
    }

    /// Opens a session acting as `principal`.
    #[must_use]
    pub const fn session(&self, principal: Principal) -> Session<'_> {
        Session {
            service: self,
            principal,
        }
    }

    /// Runs `context` through the chain.
    ///
    /// # Errors
    ///
    /// The first error raised by a stage or partition.
    pub fn execute(&self, mut context: OperationContext) -> Result<OperationResult, DirectoryError> {
        let operation = context.kind();
        let name = context.name().clone();
        match self.chain.execute(&self.nexus, &mut context) {
            Ok(result) => {
                debug!(
                    target: SERVICE_TARGET,
                    %operation,
                    %name,
                    principal = %context.principal,
                    result = result.label(),
                    "operation completed"
                );
                Ok(result)
            }
            Err(error) => {
                debug!(
                    target: SERVICE_TARGET,
                    %operation,
                    %name,
                    principal = %context.principal,
                    result_code = error.result_code(),
                    %error,
                    "operation failed"
                );
                Err(error)
            }
        }
    }
}

fn provision_admin(nexus: &PartitionNexus, admin: &Name) -> Result<(), DirectoryError> {
    let parent = admin.parent().filter(|parent| !parent.is_empty());
    let (Some(parent), Some(rdn)) = (parent, admin.rdn()) else {
        return Ok(());
    };
    if !nexus.has_entry(&parent)? || nexus.has_entry(admin)? {
        return Ok(());
    }
    let mut attributes = Attributes::new()
        .with(
            "objectClass",
            ["top", "person", "organizationalPerson", "inetOrgPerson"],
        )
        .with("cn", ["system administrator"])
        .with("sn", ["administrator"])
        .with("displayName", ["Directory Superuser"]);
    for ava in rdn.avas() {
        attributes.add_values(ava.normalized_type(), [ava.value()]);
    }
    nexus.add(admin, attributes)?;
    info!(target: SERVICE_TARGET, %admin, "provisioned administrator entry");
    Ok(())
}

/// A principal's view of the service, with one method per operation.
pub struct Session<'a> {
    service: &'a DirectoryService,
    principal: Principal,
}

fn unexpected(kind: OperationKind, result: &OperationResult) -> DirectoryError {
    DirectoryError::internal(format!(
        "{kind} produced an unexpected '{}' result",
        result.label()
    ))
}

impl Session<'_> {
    /// The acting principal.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Runs `operation` as this session's principal.
    ///
    /// # Errors
    ///
    /// The first error raised by a stage or partition.
    pub fn execute(&self, operation: Operation) -> Result<OperationResult, DirectoryError> {
        self.service
            .execute(OperationContext::new(self.principal.clone(), operation))
    }

    /// Adds an entry.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn add(&self, name: &Name, attributes: Attributes) -> Result<EntryId, DirectoryError> {
        match self.execute(Operation::Add {
            name: name.clone(),
            attributes,
        })? {
            OperationResult::Added(id) => Ok(id),
            other => Err(unexpected(OperationKind::Add, &other)),
        }
    }

    /// Deletes a leaf entry.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn delete(&self, name: &Name) -> Result<(), DirectoryError> {
        self.completed(Operation::Delete { name: name.clone() })
    }

    /// Applies one operation to every attribute in `attributes`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn modify(
        &self,
        name: &Name,
        op: ModOp,
        attributes: &Attributes,
    ) -> Result<(), DirectoryError> {
        let modifications = attributes
            .iter()
            .map(|attribute| Modification::new(op, attribute.clone()))
            .collect::<Vec<_>>();
        self.modify_many(name, &modifications)
    }

    /// Applies `modifications` in order, all or nothing.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn modify_many(
        &self,
        name: &Name,
        modifications: &[Modification],
    ) -> Result<(), DirectoryError> {
        self.completed(Operation::Modify {
            name: name.clone(),
            modifications: modifications.to_vec(),
        })
    }

    /// Renames an entry in place and returns its new name.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn rename(
        &self,
        name: &Name,
        new_rdn: &Rdn,
        delete_old_rdn: bool,
    ) -> Result<Name, DirectoryError> {
        self.relocated(Operation::Rename {
            name: name.clone(),
            new_rdn: new_rdn.clone(),
            delete_old_rdn,
            modifications: Vec::new(),
        })
    }

    /// Moves an entry and its subtree below `new_parent`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn move_to(&self, name: &Name, new_parent: &Name) -> Result<Name, DirectoryError> {
        self.relocated(Operation::Move {
            name: name.clone(),
            new_parent: new_parent.clone(),
            modifications: Vec::new(),
        })
    }

    /// Moves an entry below `new_parent` under `new_rdn`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn move_and_rename(
        &self,
        name: &Name,
        new_parent: &Name,
        new_rdn: &Rdn,
        delete_old_rdn: bool,
    ) -> Result<Name, DirectoryError> {
        self.relocated(Operation::MoveAndRename {
            name: name.clone(),
            new_parent: new_parent.clone(),
            new_rdn: new_rdn.clone(),
            delete_old_rdn,
            modifications: Vec::new(),
        })
    }

    /// Lists the direct children of `base`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn list(&self, base: &Name) -> Result<EntryStream, DirectoryError> {
        self.entries(Operation::List { name: base.clone() })
    }

    /// Searches below `base`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn search(
        &self,
        base: &Name,
        filter: Filter,
        controls: SearchControls,
    ) -> Result<EntryStream, DirectoryError> {
        self.entries(Operation::Search {
            name: base.clone(),
            filter,
            controls,
        })
    }

    /// Fetches an entry's user attributes.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn lookup(&self, name: &Name) -> Result<Option<Entry>, DirectoryError> {
        self.lookup_attributes(name, &[])
    }

    /// Fetches an entry restricted to `attributes`.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn lookup_attributes(
        &self,
        name: &Name,
        attributes: &[String],
    ) -> Result<Option<Entry>, DirectoryError> {
        match self.execute(Operation::Lookup {
            name: name.clone(),
            attributes: attributes.to_vec(),
        })? {
            OperationResult::Entry(entry) => Ok(entry),
            other => Err(unexpected(OperationKind::Lookup, &other)),
        }
    }

    /// Tests whether `name` exists.
    ///
    /// # Errors
    ///
    /// See [`DirectoryService::execute`].
    pub fn has_entry(&self, name: &Name) -> Result<bool, DirectoryError> {
        match self.execute(Operation::HasEntry { name: name.clone() })? {
            OperationResult::Exists(exists) => Ok(exists),
            other => Err(unexpected(OperationKind::HasEntry, &other)),
        }
    }

    fn completed(&self, operation: Operation) -> Result<(), DirectoryError> {
        let kind = operation.kind();
        match self.execute(operation)? {
            OperationResult::Completed => Ok(()),
            other => Err(unexpected(kind, &other)),
        }
    }

    fn relocated(&self, operation: Operation) -> Result<Name, DirectoryError> {
        let kind = operation.kind();
        match self.execute(operation)? {
            OperationResult::Relocated(name) => Ok(name),
            other => Err(unexpected(kind, &other)),
        }
    }

    fn entries(&self, operation: Operation) -> Result<EntryStream, DirectoryError> {
        let kind = operation.kind();
        match self.execute(operation)? {
            OperationResult::Entries(entries) => Ok(entries),
            other => Err(unexpected(kind, &other)),
        }
    }
}
