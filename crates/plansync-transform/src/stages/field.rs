//! Stage 1: copy source fields to destination fields.

use plansync_model::{DestinationRecord, FieldMapping, FieldValue, SourceRecord};
use tracing::warn;

use super::Stage;
use crate::error::StageError;
use crate::functions::FunctionRegistry;

/// Apply field mappings in order.
///
/// Absent source fields are not written. A failing or unknown transformation
/// falls back to the untransformed source value. A `required` mapping whose
/// source value is absent or null fails the record.
pub fn apply_field_mappings(
    mappings: &[FieldMapping],
    registry: &FunctionRegistry,
    source: &SourceRecord,
    destination: &mut DestinationRecord,
) -> Result<(), StageError> {
    for mapping in mappings {
        let Some(value) = source.get(&mapping.source_field) else {
            if mapping.required {
                return Err(required_missing(mapping));
            }
            continue;
        };
        if value.is_null() {
            if mapping.required {
                return Err(required_missing(mapping));
            }
            destination.insert(mapping.destination_field.clone(), FieldValue::Null);
            continue;
        }

        let mapped = match &mapping.transformation {
            None => value.clone(),
            Some(transformation) => {
                match registry.apply(&transformation.name, value, &transformation.params) {
                    Ok(transformed) => transformed,
                    Err(error) => {
                        warn!(
                            field = %mapping.source_field,
                            function = %transformation.name,
                            %error,
                            "transformation failed, keeping source value"
                        );
                        value.clone()
                    }
                }
            }
        };
        destination.insert(mapping.destination_field.clone(), mapped);
    }
    Ok(())
}

fn required_missing(mapping: &FieldMapping) -> StageError {
    StageError::RequiredFieldMissing {
        stage: Stage::FieldMapping,
        field: mapping.source_field.clone(),
    }
}
