//! Rewrites attribute types to their canonical schema spelling.

use std::sync::Arc;

use arbor_name::{Name, Rdn};
use arbor_partition::{Attributes, SchemaLookup};
use tracing::trace;

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::operation::{Operation, OperationContext, OperationResult};

/// Canonicalizes attribute sets, modifications, filters and requested
/// attribute lists so `commonName` and `cn` are treated alike by every later
/// stage and by the partitions. Names keep the spelling the client used and
/// only their normalized form is canonicalized.
pub struct NormalizationInterceptor {
    schema: Arc<dyn SchemaLookup>,
}

impl NormalizationInterceptor {
    /// Builds the stage over `schema`.
    #[must_use]
    pub const fn new(schema: Arc<dyn SchemaLookup>) -> Self {
        Self { schema }
    }

    fn attribute_type(&self, attr_type: &str) -> String {
        self.schema
            .canonical_attribute(attr_type)
            .unwrap_or_else(|| attr_type.trim().to_owned())
    }

    fn rdn(&self, rdn: &Rdn) -> Rdn {
        rdn.with_canonical_types(&|attr_type| self.attribute_type(attr_type))
    }

    fn name(&self, name: &Name) -> Name {
        name.with_canonical_types(&|attr_type| self.attribute_type(attr_type))
    }

    fn attributes(&self, attributes: &Attributes) -> Attributes {
        let mut canonical = Attributes::new();
        for attribute in attributes.iter().filter(|attribute| !attribute.is_empty()) {
            canonical.add_values(
                &self.attribute_type(attribute.id()),
                attribute.values().iter().cloned(),
            );
        }
        canonical
    }

    fn requested(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .map(|attr| match attr.trim() {
                special @ ("*" | "+" | "1.1") => special.to_owned(),
                other => self.attribute_type(other),
            })
            .collect()
    }

    fn rewrite(&self, operation: &mut Operation) {
        let canonical_name = self.name(operation.name());
        *operation.name_mut() = canonical_name;
        match operation {
            Operation::Add { attributes, .. } => {
                *attributes = self.attributes(attributes);
            }
            Operation::Rename { new_rdn, .. } => {
                *new_rdn = self.rdn(new_rdn);
            }
            Operation::Move { new_parent, .. } => {
                *new_parent = self.name(new_parent);
            }
            Operation::MoveAndRename {
                new_parent,
                new_rdn,
                ..
            } => {
                *new_parent = self.name(new_parent);
                *new_rdn = self.rdn(new_rdn);
            }
            Operation::Search {
                filter, controls, ..
            } => {
                filter.rename_attributes(&|attr| self.attribute_type(attr));
                controls.attributes = self.requested(&controls.attributes);
            }
            Operation::Lookup { attributes, .. } => {
                *attributes = self.requested(attributes);
            }
            Operation::Modify { .. }
            | Operation::Delete { .. }
            | Operation::List { .. }
            | Operation::HasEntry { .. } => {}
        }
        if let Some(modifications) = operation.modifications_mut() {
            for modification in modifications.iter_mut() {
                let id = self.attribute_type(modification.attribute.id());
                modification.attribute.rename(id);
            }
        }
    }
}

impl Interceptor for NormalizationInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        self.rewrite(&mut context.operation);
        trace!(
            target: STAGE_TARGET,
            operation = %context.kind(),
            name = %context.name(),
            "normalized operation"
        );
        next.proceed(context)
    }
}
