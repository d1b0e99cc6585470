//! Execution log recorder.
//!
//! Summarises a finished batch into an [`ExecutionLog`]: counts, an
//! error-code histogram and a bounded sample of errors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use plansync_model::{
    ExecutionLog, ExecutionStatus, FileImportId, MappingConfiguration, MappingResult,
};

/// Batch identity and timing handed to the recorder.
#[derive(Debug, Clone)]
pub struct BatchRun<'a> {
    pub configuration: &'a MappingConfiguration,
    pub file_import_id: Option<FileImportId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutionLogRecorder {
    error_sample_size: usize,
}

impl ExecutionLogRecorder {
    pub fn new(error_sample_size: usize) -> Self {
        Self { error_sample_size }
    }

    pub fn summarize(&self, run: BatchRun<'_>, result: &MappingResult) -> ExecutionLog {
        let mut error_counts: BTreeMap<String, usize> = BTreeMap::new();
        for error in &result.errors {
            *error_counts.entry(error.code.clone()).or_default() += 1;
        }

        ExecutionLog {
            id: Uuid::new_v4(),
            mapping_config_id: run.configuration.id.clone(),
            config_version: run.configuration.version,
            tenant_id: run.configuration.tenant_id.clone(),
            file_import_id: run.file_import_id,
            status: status_of(result),
            started_at: run.started_at,
            completed_at: run.completed_at,
            total_records: result.metrics.total_records,
            successful_records: result.metrics.successful_records,
            failed_records: result.metrics.failed_records,
            error_count: result.error_count(),
            warning_count: result.warning_count(),
            processing_time_ms: result.metrics.processing_time_ms,
            error_counts,
            error_sample: result
                .errors
                .iter()
                .take(self.error_sample_size)
                .cloned()
                .collect(),
        }
    }
}

fn status_of(result: &MappingResult) -> ExecutionStatus {
    if result.success {
        ExecutionStatus::Success
    } else if result.metrics.total_records > 0 && result.metrics.successful_records == 0 {
        ExecutionStatus::Failed
    } else {
        ExecutionStatus::PartialSuccess
    }
}
