//! Engine and per-call options.

use serde::{Deserialize, Serialize};

use plansync_model::FileImportId;

/// Default number of errors kept in an execution log sample.
pub const DEFAULT_ERROR_SAMPLE_SIZE: usize = 10;

fn default_error_sample_size() -> usize {
    DEFAULT_ERROR_SAMPLE_SIZE
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Errors kept in each execution log.
    #[serde(default = "default_error_sample_size")]
    pub error_sample_size: usize,
    /// Hard cap on records per `apply` call, checked before any record is
    /// processed.
    #[serde(default)]
    pub max_batch_size: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            error_sample_size: DEFAULT_ERROR_SAMPLE_SIZE,
            max_batch_size: None,
        }
    }
}

/// Options for one `apply` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Compute the full result but write no execution log.
    pub dry_run: bool,
    /// Skip the validation rule evaluator.
    pub skip_validation: bool,
    /// File import that triggered the run, recorded in the execution log.
    pub file_import_id: Option<FileImportId>,
}

impl ApplyOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    #[must_use]
    pub fn with_file_import(mut self, file_import_id: FileImportId) -> Self {
        self.file_import_id = Some(file_import_id);
        self
    }
}
