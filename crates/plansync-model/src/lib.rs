//! Data model for payroll / retirement-plan record integration.
//!
//! - **value**: loosely-typed [`FieldValue`] and [`Record`]
//! - **mapping**: versioned [`MappingConfiguration`] and its five rule kinds
//! - **rule**: operator-based [`ValidationRule`]s
//! - **result**: [`ValidationResult`], [`MappingResult`], [`ExecutionMetrics`]
//! - **execution**: persisted [`ExecutionLog`] and its summary view

pub mod error;
pub mod execution;
pub mod ids;
pub mod mapping;
pub mod result;
pub mod rule;
pub mod value;

pub use error::{ModelError, Result};
pub use execution::{ExecutionLog, ExecutionLogSummary, ExecutionStatus};
pub use ids::{FileImportId, MappingConfigId, RuleId, TenantId};
pub use mapping::{
    ApplyWhen, CalculatedField, ConditionalMapping, DefaultValue, FieldAssignment, FieldMapping,
    LookupMapping, LookupTable, MappingConfiguration, MappingRules, MappingType, Params, Rounding,
    Transformation,
};
pub use result::{
    ExecutionMetrics, IssueKind, MappedRecord, MappingResult, RecordIssue, ValidationIssue,
    ValidationResult,
};
pub use rule::{MappingTypeFilter, RuleLogic, RuleOperator, RuleScope, Severity, ValidationRule};
pub use value::{DestinationRecord, FieldValue, Record, SourceRecord};
