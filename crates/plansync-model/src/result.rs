//! Per-record and per-batch results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::RuleId;
use crate::rule::Severity;
use crate::value::{DestinationRecord, FieldValue};

/// Caller-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// A stage processor failed for the record; the record is dropped.
    MappingFailed,
    /// A rule with severity `ERROR` failed; the record is kept but invalid.
    ValidationError,
    /// A rule with severity `WARNING` failed; advisory only.
    ValidationWarning,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MappingFailed => "MAPPING_FAILED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ValidationWarning => "VALIDATION_WARNING",
        }
    }

    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::ValidationError,
            Severity::Warning => Self::ValidationWarning,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed rule for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    /// Rule code, derived from the rule operator (e.g. `GREATER_THAN`).
    pub code: String,
    pub message: String,
    /// Offending value; `None` when the field was absent.
    pub value: Option<FieldValue>,
    pub rule_id: RuleId,
}

/// Validation outcome for one destination record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn push(&mut self, severity: Severity, issue: ValidationIssue) {
        match severity {
            Severity::Error => {
                self.valid = false;
                self.errors.push(issue);
            }
            Severity::Warning => self.warnings.push(issue),
        }
    }
}

/// A batch-level error or warning, tagged with the record's position in the
/// input batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub record_index: usize,
    pub kind: IssueKind,
    /// `MAPPING_FAILED` for stage faults, the rule code for validation issues.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
}

impl RecordIssue {
    pub fn mapping_failed(
        record_index: usize,
        field: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            record_index,
            kind: IssueKind::MappingFailed,
            code: IssueKind::MappingFailed.as_str().to_string(),
            message: message.into(),
            field,
            value: None,
            rule_id: None,
        }
    }

    pub fn from_validation(record_index: usize, severity: Severity, issue: ValidationIssue) -> Self {
        Self {
            record_index,
            kind: IssueKind::from_severity(severity),
            code: issue.code,
            message: issue.message,
            field: Some(issue.field),
            value: issue.value,
            rule_id: Some(issue.rule_id),
        }
    }
}

/// A destination record that completed every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedRecord {
    /// Position of the source record in the input batch.
    pub source_index: usize,
    pub record: DestinationRecord,
    /// False when at least one `ERROR` rule failed for this record.
    pub valid: bool,
}

/// Counts and timing for one batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub processing_time_ms: u64,
    pub average_time_per_record_ms: f64,
}

impl ExecutionMetrics {
    pub fn new(
        total_records: usize,
        successful_records: usize,
        processing_time_ms: u64,
    ) -> Self {
        let average_time_per_record_ms = if total_records == 0 {
            0.0
        } else {
            processing_time_ms as f64 / total_records as f64
        };
        Self {
            total_records,
            successful_records,
            failed_records: total_records.saturating_sub(successful_records),
            processing_time_ms,
            average_time_per_record_ms,
        }
    }
}

/// Batch-level output of the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MappingResult {
    /// True when there are no `MAPPING_FAILED` and no `VALIDATION_ERROR`
    /// entries.
    pub success: bool,
    /// Successfully produced records, in original relative order.
    pub records: Vec<MappedRecord>,
    /// `MAPPING_FAILED` and `VALIDATION_ERROR` entries, ordered by record index.
    pub errors: Vec<RecordIssue>,
    /// `VALIDATION_WARNING` entries, ordered by record index.
    pub warnings: Vec<RecordIssue>,
    pub metrics: ExecutionMetrics,
}

impl MappingResult {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn mapping_failures(&self) -> impl Iterator<Item = &RecordIssue> {
        self.errors
            .iter()
            .filter(|issue| issue.kind == IssueKind::MappingFailed)
    }

    /// Copy with wall-clock fields zeroed, for comparing repeated runs.
    #[must_use]
    pub fn without_timing(&self) -> Self {
        let mut copy = self.clone();
        copy.metrics.processing_time_ms = 0;
        copy.metrics.average_time_per_record_ms = 0.0;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_average() {
        let metrics = ExecutionMetrics::new(4, 3, 10);
        assert_eq!(metrics.failed_records, 1);
        assert_eq!(metrics.average_time_per_record_ms, 2.5);
        assert_eq!(ExecutionMetrics::new(0, 0, 3).average_time_per_record_ms, 0.0);
    }

    #[test]
    fn error_severity_invalidates() {
        let mut result = ValidationResult::valid();
        let issue = ValidationIssue {
            field: "amount".to_string(),
            code: "GREATER_THAN".to_string(),
            message: "too small".to_string(),
            value: Some(FieldValue::Number(-1.0)),
            rule_id: RuleId::new("r1").unwrap(),
        };
        result.push(Severity::Warning, issue.clone());
        assert!(result.valid);
        result.push(Severity::Error, issue);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }
}
