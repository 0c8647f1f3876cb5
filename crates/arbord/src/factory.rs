//! Resolves configuration `kind` tags into stages and partitions.

use std::collections::HashMap;
use std::sync::Arc;

use arbor_config::{InterceptorConfig, PartitionConfig, ServerConfig};
use arbor_name::Name;
use arbor_partition::{Attribute, Attributes, MemoryPartition, Partition, SchemaLookup};
use tracing::debug;

use crate::chain::{Interceptor, InterceptorChain};
use crate::error::DirectoryError;
use crate::interceptors::{
    AuthenticationInterceptor, AuthorizationInterceptor, Clock, EventBus, EventInterceptor,
    ExceptionInterceptor, NormalizationInterceptor, OperationalAttributeInterceptor,
    SchemaInterceptor,
};

const FACTORY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::factory");

/// Shared services handed to every stage constructor.
#[derive(Clone)]
pub struct StageResources {
    /// Schema used for canonical names and validation.
    pub schema: Arc<dyn SchemaLookup>,
    /// Bus receiving change notifications.
    pub events: Arc<EventBus>,
    /// Time source for operational timestamps.
    pub clock: Arc<dyn Clock>,
    /// Whether anonymous sessions may write.
    pub allow_anonymous_writes: bool,
    /// The administrative principal.
    pub admin_principal: Name,
    /// Subtree reserved to the administrator.
    pub protected_suffix: Name,
}

impl StageResources {
    /// Derives stage settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidName`] when the admin principal or
    /// protected suffix does not parse.
    pub fn from_config(
        config: &ServerConfig,
        schema: Arc<dyn SchemaLookup>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DirectoryError> {
        Ok(Self {
            schema,
            events,
            clock,
            allow_anonymous_writes: config.allow_anonymous_writes,
            admin_principal: Name::parse(&config.admin_principal)?,
            protected_suffix: Name::parse(&config.protected_suffix)?,
        })
    }
}

/// Builds one interceptor stage.
pub type InterceptorConstructor = fn(&StageResources) -> Arc<dyn Interceptor>;

/// Builds one partition from its configuration.
pub type PartitionConstructor =
    fn(&PartitionConfig, Arc<dyn SchemaLookup>) -> Result<Arc<dyn Partition>, DirectoryError>;

/// Registry of interceptor kinds.
#[derive(Debug, Clone, Default)]
pub struct InterceptorFactory {
    constructors: HashMap<String, InterceptorConstructor>,
}

impl InterceptorFactory {
    /// A registry with no kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the stock stages under their conventional tags.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register("normalization", |resources| {
            Arc::new(NormalizationInterceptor::new(Arc::clone(&resources.schema)))
        });
        factory.register("authentication", |resources| {
            Arc::new(AuthenticationInterceptor::new(resources.allow_anonymous_writes))
        });
        factory.register("authorization", |resources| {
            Arc::new(AuthorizationInterceptor::new(
                resources.admin_principal.clone(),
                resources.protected_suffix.clone(),
            ))
        });
        factory.register("exception", |_| Arc::new(ExceptionInterceptor::new()));
        factory.register("operational", |resources| {
            Arc::new(OperationalAttributeInterceptor::new(
                Arc::clone(&resources.schema),
                Arc::clone(&resources.clock),
            ))
        });
        factory.register("schema", |resources| {
            Arc::new(SchemaInterceptor::new(Arc::clone(&resources.schema)))
        });
        factory.register("event", |resources| {
            Arc::new(EventInterceptor::new(Arc::clone(&resources.events)))
        });
        factory
    }

    /// Registers `constructor` under `kind`, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, constructor: InterceptorConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    /// Returns `true` when `kind` is registered.
    #[must_use]
    pub fn supports(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Builds the chain described by `stages`, outermost first.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UnknownKind`] for an unregistered tag and
    /// [`DirectoryError::DuplicateInterceptorName`] for a repeated name.
    pub fn build(
        &self,
        stages: &[InterceptorConfig],
        resources: &StageResources,
    ) -> Result<InterceptorChain, DirectoryError> {
        let built = stages
            .iter()
            .map(|stage| {
                let constructor =
                    self.constructors
                        .get(&stage.kind)
                        .ok_or_else(|| DirectoryError::UnknownKind {
                            category: "interceptor",
                            kind: stage.kind.clone(),
                        })?;
                debug!(
                    target: FACTORY_TARGET,
                    name = %stage.name,
                    kind = %stage.kind,
                    "constructing interceptor"
                );
                Ok((stage.name.clone(), constructor(resources)))
            })
            .collect::<Result<Vec<_>, DirectoryError>>()?;
        InterceptorChain::new(built)
    }
}

/// Registry of partition kinds.
#[derive(Debug, Clone, Default)]
pub struct PartitionFactory {
    constructors: HashMap<String, PartitionConstructor>,
}

impl PartitionFactory {
    /// A registry with no kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the in-memory partition under `memory`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register("memory", memory_partition);
        factory
    }

    /// Registers `constructor` under `kind`, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, constructor: PartitionConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    /// Builds the partition described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::UnknownKind`] for an unregistered tag, or
    /// whatever the constructor reports.
    pub fn build(
        &self,
        config: &PartitionConfig,
        schema: Arc<dyn SchemaLookup>,
    ) -> Result<Arc<dyn Partition>, DirectoryError> {
        let constructor =
            self.constructors
                .get(&config.kind)
                .ok_or_else(|| DirectoryError::UnknownKind {
                    category: "partition",
                    kind: config.kind.clone(),
                })?;
        debug!(
            target: FACTORY_TARGET,
            id = %config.id,
            kind = %config.kind,
            suffix = %config.suffix,
            "constructing partition"
        );
        constructor(config, schema)
    }
}

/// Converts configured context-entry attributes.
#[must_use]
pub fn context_attributes(config: &PartitionConfig) -> Attributes {
    config
        .context_entry
        .iter()
        .map(|(id, values)| Attribute::new(id.as_str(), values.iter().cloned()))
        .collect()
}

fn memory_partition(
    config: &PartitionConfig,
    schema: Arc<dyn SchemaLookup>,
) -> Result<Arc<dyn Partition>, DirectoryError> {
    let suffix = Name::parse(&config.suffix)?;
    let partition = MemoryPartition::new(
        config.id.as_str(),
        suffix,
        &config.indexed_attributes,
        schema,
    );
    partition.initialize(context_attributes(config))?;
    Ok(Arc::new(partition))
}
