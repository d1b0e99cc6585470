//! Stage 2: literal assignments guarded by conditions over the source record.

use plansync_model::{ConditionalMapping, DestinationRecord, SourceRecord};
use tracing::warn;

use crate::condition::Condition;
use crate::error::ConditionError;

/// A conditional mapping with its condition parsed once per batch.
#[derive(Debug, Clone)]
pub struct CompiledConditional<'a> {
    mapping: &'a ConditionalMapping,
    condition: Result<Condition, ConditionError>,
}

impl<'a> CompiledConditional<'a> {
    /// Parse the condition. A malformed condition is reported once here and
    /// then evaluates to false for every record.
    pub fn compile(index: usize, mapping: &'a ConditionalMapping) -> Self {
        let condition = Condition::parse(&mapping.condition);
        if let Err(error) = &condition {
            warn!(
                rule = index,
                %error,
                "unparseable condition, conditional mapping will never apply"
            );
        }
        Self { mapping, condition }
    }

    pub fn mapping(&self) -> &ConditionalMapping {
        self.mapping
    }

    pub fn condition(&self) -> Result<&Condition, &ConditionError> {
        self.condition.as_ref()
    }

    pub fn holds(&self, source: &SourceRecord) -> bool {
        self.condition
            .as_ref()
            .is_ok_and(|condition| condition.evaluate(source))
    }
}

/// Apply every conditional mapping whose condition holds for `source`.
///
/// Conditions only ever see the source record. Assignments overwrite.
pub fn apply_conditional_mappings(
    compiled: &[CompiledConditional<'_>],
    source: &SourceRecord,
    destination: &mut DestinationRecord,
) {
    for conditional in compiled {
        if !conditional.holds(source) {
            continue;
        }
        for assignment in &conditional.mapping.assignments {
            destination.insert(
                assignment.destination_field.clone(),
                assignment.value.clone(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansync_model::{FieldAssignment, FieldValue, Record};

    fn terminated() -> ConditionalMapping {
        ConditionalMapping {
            condition: r#"source.status == "TERMINATED""#.to_string(),
            assignments: vec![FieldAssignment::new("destinationStatus", "INACTIVE")],
        }
    }

    #[test]
    fn assigns_when_condition_holds() {
        let mapping = terminated();
        let compiled = [CompiledConditional::compile(0, &mapping)];

        let mut destination = Record::new();
        apply_conditional_mappings(
            &compiled,
            &Record::new().with("status", "TERMINATED"),
            &mut destination,
        );
        assert_eq!(destination.value("destinationStatus"), &FieldValue::text("INACTIVE"));

        let mut destination = Record::new();
        apply_conditional_mappings(&compiled, &Record::new().with("status", "ACTIVE"), &mut destination);
        assert!(!destination.contains("destinationStatus"));
    }

    #[test]
    fn reads_source_not_destination() {
        let mapping = terminated();
        let compiled = [CompiledConditional::compile(0, &mapping)];
        let mut destination = Record::new().with("status", "TERMINATED");
        apply_conditional_mappings(&compiled, &Record::new(), &mut destination);
        assert!(!destination.contains("destinationStatus"));
    }

    #[test]
    fn assignments_overwrite_prior_values() {
        let mapping = terminated();
        let compiled = [CompiledConditional::compile(0, &mapping)];
        let mut destination = Record::new().with("destinationStatus", "ACTIVE");
        apply_conditional_mappings(
            &compiled,
            &Record::new().with("status", "TERMINATED"),
            &mut destination,
        );
        assert_eq!(destination.value("destinationStatus"), &FieldValue::text("INACTIVE"));
    }

    #[test]
    fn malformed_condition_evaluates_false() {
        for text in ["status ~= 'X'", "", "status == ", "require('fs')"] {
            let mapping = ConditionalMapping {
                condition: text.to_string(),
                assignments: vec![FieldAssignment::new("flag", true)],
            };
            let compiled = [CompiledConditional::compile(0, &mapping)];
            assert!(compiled[0].condition().is_err(), "condition {text:?}");
            let mut destination = Record::new();
            apply_conditional_mappings(
                &compiled,
                &Record::new().with("status", "X"),
                &mut destination,
            );
            assert!(destination.is_empty(), "condition {text:?}");
        }
    }
}
