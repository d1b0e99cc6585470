//! Persisted execution log of one batch run.
//!
//! Logs are append-only. They keep counts, an error-code histogram and a
//! small sample of errors, never the full error list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{FileImportId, MappingConfigId, TenantId};
use crate::result::RecordIssue;

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// No mapping failures and no validation errors.
    Success,
    /// Some records produced, but with mapping failures or validation errors.
    PartialSuccess,
    /// No record was produced from a non-empty batch.
    Failed,
}

impl ExecutionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: Uuid,
    pub mapping_config_id: MappingConfigId,
    pub config_version: u32,
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_import_id: Option<FileImportId>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub processing_time_ms: u64,
    /// Error code to occurrence count.
    pub error_counts: BTreeMap<String, usize>,
    /// First few errors of the batch.
    pub error_sample: Vec<RecordIssue>,
}

/// Listing view of an [`ExecutionLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogSummary {
    pub id: Uuid,
    pub mapping_config_id: MappingConfigId,
    pub config_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_import_id: Option<FileImportId>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub processing_time_ms: u64,
    pub error_counts: BTreeMap<String, usize>,
}

impl From<&ExecutionLog> for ExecutionLogSummary {
    fn from(log: &ExecutionLog) -> Self {
        Self {
            id: log.id,
            mapping_config_id: log.mapping_config_id.clone(),
            config_version: log.config_version,
            file_import_id: log.file_import_id.clone(),
            status: log.status,
            started_at: log.started_at,
            completed_at: log.completed_at,
            total_records: log.total_records,
            successful_records: log.successful_records,
            failed_records: log.failed_records,
            error_count: log.error_count,
            warning_count: log.warning_count,
            processing_time_ms: log.processing_time_ms,
            error_counts: log.error_counts.clone(),
        }
    }
}
