//! Enforces object-class and attribute rules on writes.

use std::collections::BTreeSet;
use std::sync::Arc;

use arbor_name::Name;
use arbor_partition::{
    Attributes, Modification, SchemaLookup, ensure_rdn_preserved, ensure_structural_class,
};
use tracing::trace;

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::operation::{Operation, OperationContext, OperationResult};

const OBJECT_CLASS: &str = "objectClass";

/// Validates adds and modifications against the schema.
///
/// An added entry has its object classes completed with every superclass,
/// must name only known classes, must carry a structural class and must
/// hold its own naming values. Modifications are simulated on the stored
/// entry and the result held to the same rules. Single-valued attributes
/// may carry at most one value.
pub struct SchemaInterceptor {
    schema: Arc<dyn SchemaLookup>,
}

impl SchemaInterceptor {
    /// Builds the stage over `schema`.
    #[must_use]
    pub const fn new(schema: Arc<dyn SchemaLookup>) -> Self {
        Self { schema }
    }

    fn complete_object_classes(
        &self,
        name: &Name,
        attributes: &mut Attributes,
    ) -> Result<(), DirectoryError> {
        let mut pending = attributes.values(OBJECT_CLASS).to_vec();
        let mut seen = BTreeSet::new();
        while let Some(class) = pending.pop() {
            if !seen.insert(class.to_ascii_lowercase()) {
                continue;
            }
            if self.schema.object_class_kind(&class).is_none() {
                return Err(DirectoryError::schema_violation(
                    name,
                    format!("unknown object class '{class}'"),
                ));
            }
            let superclasses = self.schema.superclasses(&class);
            attributes.add_values(OBJECT_CLASS, superclasses.iter().cloned());
            pending.extend(superclasses);
        }
        Ok(())
    }

    fn ensure_single_values(&self, name: &Name, attributes: &Attributes) -> Result<(), DirectoryError> {
        match attributes
            .iter()
            .find(|attribute| attribute.len() > 1 && self.schema.is_single_valued(attribute.id()))
        {
            Some(attribute) => Err(DirectoryError::schema_violation(
                name,
                format!("attribute '{}' admits a single value", attribute.id()),
            )),
            None => Ok(()),
        }
    }

    fn validate(&self, name: &Name, attributes: &Attributes) -> Result<(), DirectoryError> {
        ensure_structural_class(name, attributes, self.schema.as_ref())?;
        ensure_rdn_preserved(name, attributes)?;
        self.ensure_single_values(name, attributes)
    }

    fn check_add(&self, name: &Name, attributes: &mut Attributes) -> Result<(), DirectoryError> {
        self.complete_object_classes(name, attributes)?;
        self.validate(name, attributes)
    }

    fn check_modify(
        &self,
        next: Next<'_>,
        name: &Name,
        modifications: &[Modification],
    ) -> Result<(), DirectoryError> {
        let current = next
            .nexus()
            .lookup(name)?
            .ok_or_else(|| DirectoryError::name_not_found(name))?;
        let mut attributes = current.attributes().clone();
        for modification in modifications {
            modification.apply_to(name, &mut attributes)?;
        }
        self.validate(name, &attributes)
    }
}

impl Interceptor for SchemaInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        match &mut context.operation {
            Operation::Add { name, attributes } => self.check_add(name, attributes)?,
            Operation::Modify {
                name,
                modifications,
            } => self.check_modify(next, name, modifications)?,
            _ => return next.proceed(context),
        }
        trace!(
            target: STAGE_TARGET,
            operation = %context.kind(),
            name = %context.name(),
            "schema checks passed"
        );
        next.proceed(context)
    }
}
