//! Error types for the orchestrator and its stores.

use std::path::PathBuf;

use thiserror::Error;

use plansync_model::{MappingConfigId, RuleId, TenantId};
use plansync_transform::ConfigError;

/// Failures of a configuration, rule or execution-log store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("mapping configuration {0} not found")]
    NotFound(MappingConfigId),

    #[error("mapping configuration {0} is deleted")]
    Deleted(MappingConfigId),

    #[error("mapping configuration {id} belongs to another tenant than {tenant_id}")]
    TenantMismatch {
        id: MappingConfigId,
        tenant_id: TenantId,
    },

    /// Optimistic concurrency check failed.
    #[error("mapping configuration {id} is at version {actual}, expected {expected}")]
    VersionConflict {
        id: MappingConfigId,
        expected: u32,
        actual: u32,
    },

    #[error(transparent)]
    InvalidConfiguration(#[from] ConfigError),

    #[error("mapping configuration {0} has no version left")]
    VersionExhausted(MappingConfigId),

    #[error("validation rule {id} is invalid: {message}")]
    InvalidRule { id: RuleId, message: String },

    #[error("store lock poisoned")]
    Poisoned,
}

/// Whole-call failures of [`MappingEngine::apply`](crate::MappingEngine::apply).
///
/// Everything that goes wrong for an individual record is folded into the
/// returned `MappingResult` instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    #[error("mapping configuration {0} not found")]
    ConfigurationNotFound(MappingConfigId),

    #[error("mapping configuration {0} is inactive")]
    ConfigurationInactive(MappingConfigId),

    #[error("mapping configuration {0} is deleted")]
    ConfigurationDeleted(MappingConfigId),

    #[error("mapping configuration {id} does not belong to tenant {tenant_id}")]
    WrongTenant {
        id: MappingConfigId,
        tenant_id: TenantId,
    },

    #[error("batch of {size} records exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}
