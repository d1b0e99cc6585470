//! Per-record transformation pipeline.

use plansync_model::{DestinationRecord, MappingRules, SourceRecord};

use crate::error::StageError;
use crate::functions::FunctionRegistry;
use crate::stages::{
    CompiledCalculation, CompiledConditional, apply_calculated_fields, apply_conditional_mappings,
    apply_default_values, apply_field_mappings, apply_lookup_mappings,
};

/// Mapping rules compiled for one batch.
///
/// Conditions and formulas are parsed once at construction and shared,
/// read-only, by every record of the batch.
#[derive(Debug, Clone)]
pub struct RecordPipeline<'a> {
    rules: &'a MappingRules,
    registry: &'a FunctionRegistry,
    conditionals: Vec<CompiledConditional<'a>>,
    calculations: Vec<CompiledCalculation<'a>>,
}

impl<'a> RecordPipeline<'a> {
    pub fn compile(rules: &'a MappingRules, registry: &'a FunctionRegistry) -> Self {
        let conditionals = rules
            .conditional_mappings
            .iter()
            .enumerate()
            .map(|(idx, mapping)| CompiledConditional::compile(idx, mapping))
            .collect();
        let calculations = rules
            .calculated_fields
            .iter()
            .enumerate()
            .map(|(idx, field)| CompiledCalculation::compile(idx, field))
            .collect();
        Self {
            rules,
            registry,
            conditionals,
            calculations,
        }
    }

    pub fn rules(&self) -> &MappingRules {
        self.rules
    }

    /// Run the five stages over one source record.
    ///
    /// The destination record starts empty and never shares storage with
    /// `source`.
    pub fn transform(&self, source: &SourceRecord) -> Result<DestinationRecord, StageError> {
        let mut destination = DestinationRecord::new();
        apply_field_mappings(
            &self.rules.field_mappings,
            self.registry,
            source,
            &mut destination,
        )?;
        apply_conditional_mappings(&self.conditionals, source, &mut destination);
        apply_calculated_fields(&self.calculations, source, &mut destination);
        apply_lookup_mappings(&self.rules.lookup_mappings, source, &mut destination);
        apply_default_values(&self.rules.default_values, &mut destination);
        Ok(destination)
    }
}
