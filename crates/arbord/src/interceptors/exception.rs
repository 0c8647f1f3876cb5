//! Turns predictable failures into precise errors before the nexus runs.

use arbor_name::Name;
use tracing::debug;

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::nexus::PartitionNexus;
use crate::operation::{Operation, OperationContext, OperationResult};

/// Checks existence preconditions up front so callers get
/// `EntryAlreadyExists`, `NameNotFound` or `Unsupported` naming the exact
/// entry at fault, rather than whatever the partition happens to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionInterceptor;

impl ExceptionInterceptor {
    /// Builds the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn require_entry(nexus: &PartitionNexus, name: &Name) -> Result<(), DirectoryError> {
    if nexus.has_entry(name)? {
        Ok(())
    } else {
        Err(DirectoryError::name_not_found(name))
    }
}

fn require_vacant(nexus: &PartitionNexus, name: &Name) -> Result<(), DirectoryError> {
    if nexus.has_entry(name)? {
        Err(DirectoryError::entry_already_exists(name))
    } else {
        Ok(())
    }
}

fn require_movable(nexus: &PartitionNexus, name: &Name) -> Result<(), DirectoryError> {
    require_entry(nexus, name)?;
    if nexus.is_suffix(name)? {
        return Err(DirectoryError::unsupported(format!(
            "'{name}' is a partition context entry and cannot be renamed or moved"
        )));
    }
    Ok(())
}

fn check(nexus: &PartitionNexus, operation: &Operation) -> Result<(), DirectoryError> {
    match operation {
        Operation::Add { name, .. } => {
            require_vacant(nexus, name)?;
            if !nexus.is_suffix(name)?
                && let Some(parent) = name.parent()
            {
                require_entry(nexus, &parent)?;
            }
            Ok(())
        }
        Operation::Delete { name } => {
            require_entry(nexus, name)?;
            if nexus.is_suffix(name)? {
                return Err(DirectoryError::unsupported(format!(
                    "'{name}' is a partition context entry and cannot be deleted"
                )));
            }
            Ok(())
        }
        Operation::Modify { name, .. }
        | Operation::List { name }
        | Operation::Search { name, .. } => require_entry(nexus, name),
        Operation::Rename { name, .. } => {
            require_movable(nexus, name)?;
            relocation_target(nexus, name, operation, None)
        }
        Operation::Move {
            name, new_parent, ..
        }
        | Operation::MoveAndRename {
            name, new_parent, ..
        } => {
            require_movable(nexus, name)?;
            relocation_target(nexus, name, operation, Some(new_parent))
        }
        Operation::Lookup { .. } | Operation::HasEntry { .. } => Ok(()),
    }
}

fn relocation_target(
    nexus: &PartitionNexus,
    name: &Name,
    operation: &Operation,
    new_parent: Option<&Name>,
) -> Result<(), DirectoryError> {
    if let Some(parent) = new_parent {
        require_entry(nexus, parent)?;
    }
    match operation.destination() {
        Some(destination) if destination != *name => require_vacant(nexus, &destination),
        _ => Ok(()),
    }
}

impl Interceptor for ExceptionInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        if let Err(error) = check(next.nexus(), &context.operation) {
            debug!(
                target: STAGE_TARGET,
                operation = %context.kind(),
                name = %context.name(),
                %error,
                "precondition failed"
            );
            return Err(error);
        }
        next.proceed(context)
    }
}
