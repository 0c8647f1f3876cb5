//! Maintains creator and modifier metadata on every write.

use std::sync::Arc;

use arbor_partition::{
    Attribute, AttributeUsage, Entry, EntryStream, Modification, SchemaLookup,
};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::trace;

use super::STAGE_TARGET;
use crate::chain::{Interceptor, Next};
use crate::error::DirectoryError;
use crate::operation::{Operation, OperationContext, OperationResult, Principal};

const CREATORS_NAME: &str = "creatorsName";
const CREATE_TIMESTAMP: &str = "createTimestamp";
const MODIFIERS_NAME: &str = "modifiersName";
const MODIFY_TIMESTAMP: &str = "modifyTimestamp";

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Reads the system clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Formats `instant` as an LDAP generalized time such as `20240131235959Z`.
///
/// # Errors
///
/// Returns [`DirectoryError::Internal`] when the instant cannot be
/// formatted, which only happens for years outside `0000..=9999`.
pub fn generalized_time(instant: OffsetDateTime) -> Result<String, DirectoryError> {
    instant
        .to_offset(time::UtcOffset::UTC)
        .format(format_description!(
            "[year][month][day][hour][minute][second]Z"
        ))
        .map_err(|error| DirectoryError::internal(format!("cannot format timestamp: {error}")))
}

fn is_maintained(attr_type: &str) -> bool {
    [CREATORS_NAME, CREATE_TIMESTAMP, MODIFIERS_NAME, MODIFY_TIMESTAMP]
        .iter()
        .any(|maintained| maintained.eq_ignore_ascii_case(attr_type))
}

fn principal_name(principal: &Principal) -> String {
    principal
        .name()
        .map(|name| name.user_provided().to_owned())
        .unwrap_or_default()
}

fn user_only(schema: &dyn SchemaLookup, mut entry: Entry) -> Entry {
    entry
        .attributes_mut()
        .retain(|attribute| schema.attribute_usage(attribute.id()) == AttributeUsage::User);
    entry
}

/// Stamps `creatorsName`/`createTimestamp` on adds and
/// `modifiersName`/`modifyTimestamp` on modifications, renames and moves.
/// Values supplied by clients for these attributes are discarded. A rename
/// or move carries its stamp in the same commit as the new name.
///
/// Plain lookups and listings have operational attributes stripped;
/// callers ask for them by name or with `+`.
pub struct OperationalAttributeInterceptor {
    schema: Arc<dyn SchemaLookup>,
    clock: Arc<dyn Clock>,
}

impl OperationalAttributeInterceptor {
    /// Builds the stage.
    #[must_use]
    pub const fn new(schema: Arc<dyn SchemaLookup>, clock: Arc<dyn Clock>) -> Self {
        Self { schema, clock }
    }

    fn modifier_stamp(&self, principal: &Principal) -> Result<Vec<Modification>, DirectoryError> {
        let now = generalized_time(self.clock.now())?;
        Ok(vec![
            Modification::replace(Attribute::new(MODIFIERS_NAME, [principal_name(principal)])),
            Modification::replace(Attribute::new(MODIFY_TIMESTAMP, [now])),
        ])
    }

    fn stamp(&self, context: &mut OperationContext) -> Result<(), DirectoryError> {
        match &mut context.operation {
            Operation::Add { attributes, .. } => {
                attributes.retain(|attribute| !is_maintained(attribute.id()));
                let now = generalized_time(self.clock.now())?;
                attributes.put(Attribute::new(
                    CREATORS_NAME,
                    [principal_name(&context.principal)],
                ));
                attributes.put(Attribute::new(CREATE_TIMESTAMP, [now]));
            }
            operation => {
                let Some(modifications) = operation.modifications_mut() else {
                    return Ok(());
                };
                modifications.retain(|modification| !is_maintained(modification.attribute.id()));
                modifications.extend(self.modifier_stamp(&context.principal)?);
                trace!(target: STAGE_TARGET, name = %operation.name(), "stamped modifier");
            }
        }
        Ok(())
    }

    fn strip_stream(&self, entries: EntryStream) -> EntryStream {
        let schema = Arc::clone(&self.schema);
        Box::new(entries.map(move |entry| entry.map(|entry| user_only(schema.as_ref(), entry))))
    }
}

impl Interceptor for OperationalAttributeInterceptor {
    fn process(
        &self,
        context: &mut OperationContext,
        next: Next<'_>,
    ) -> Result<OperationResult, DirectoryError> {
        self.stamp(context)?;
        let plain_lookup = matches!(
            &context.operation,
            Operation::Lookup { attributes, .. } if attributes.is_empty()
        );
        let result = next.proceed(context)?;
        match result {
            OperationResult::Entry(entry) if plain_lookup => {
                Ok(OperationResult::Entry(entry.map(|entry| user_only(self.schema.as_ref(), entry))))
            }
            OperationResult::Entries(entries)
                if matches!(context.operation, Operation::List { .. }) =>
            {
                Ok(OperationResult::Entries(self.strip_stream(entries)))
            }
            other => Ok(other),
        }
    }
}
