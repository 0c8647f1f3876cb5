//! Structural checks shared by partitions and the interceptor chain.

use arbor_name::Name;

use crate::attributes::Attributes;
use crate::error::PartitionError;
use crate::schema::{ObjectClassKind, SchemaLookup};

/// Fails when the entry at `name` still has children.
///
/// # Errors
///
/// Returns [`PartitionError::NonEmptyContainer`] when `children` is non-zero.
pub fn ensure_leaf(name: &Name, children: usize) -> Result<(), PartitionError> {
    if children == 0 {
        Ok(())
    } else {
        Err(PartitionError::NonEmptyContainer {
            name: name.to_string(),
            children,
        })
    }
}

/// Fails when `attributes` no longer carry every naming value of `name`'s
/// leaf RDN.
///
/// # Errors
///
/// Returns [`PartitionError::StructuralViolation`] naming the first missing
/// value.
pub fn ensure_rdn_preserved(name: &Name, attributes: &Attributes) -> Result<(), PartitionError> {
    let Some(rdn) = name.rdn() else {
        return Ok(());
    };
    for ava in rdn.avas() {
        if !attributes.contains_value(ava.normalized_type(), ava.value()) {
            return Err(PartitionError::structural_violation(
                name,
                format!(
                    "naming value {}={} must remain on the entry",
                    ava.attr_type(),
                    ava.value()
                ),
            ));
        }
    }
    Ok(())
}

/// Fails unless some `objectClass` value names a structural class.
///
/// # Errors
///
/// Returns [`PartitionError::StructuralViolation`] when no structural class
/// is present.
pub fn ensure_structural_class(
    name: &Name,
    attributes: &Attributes,
    schema: &dyn SchemaLookup,
) -> Result<(), PartitionError> {
    let structural = attributes
        .object_classes()
        .iter()
        .any(|class| schema.object_class_kind(class) == Some(ObjectClassKind::Structural));
    if structural {
        Ok(())
    } else {
        Err(PartitionError::structural_violation(
            name,
            "entry must carry at least one structural object class",
        ))
    }
}
