//! Stores for the engine's external collaborators.
//!
//! The engine reads configurations and rules through [`ConfigurationSource`]
//! and [`RuleSource`], and appends batch summaries through
//! [`ExecutionLogStore`]. The control-plane side of configuration and rule
//! management is [`ConfigurationStore`] and [`RuleStore`].
//!
//! Two implementations are provided: [`InMemoryStore`] and the JSON directory
//! [`JsonRepository`]. Both run [`validate_rules`](plansync_transform::validate_rules)
//! on every configuration save.

mod json;
mod memory;

pub use json::JsonRepository;
pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};

use plansync_model::{
    ExecutionLog, MappingConfigId, MappingConfiguration, TenantId, ValidationRule,
};
use plansync_transform::{FunctionRegistry, validate_rules};
use plansync_validate::CompiledRule;

use crate::error::StoreError;

/// Read access to mapping configurations.
pub trait ConfigurationSource {
    /// Configuration by id, including inactive and soft-deleted ones.
    fn configuration(&self, id: &MappingConfigId)
    -> Result<Option<MappingConfiguration>, StoreError>;
}

/// Read access to validation rules.
pub trait RuleSource {
    /// Global rules plus rules scoped to `tenant_id`, active or not.
    fn rules_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<ValidationRule>, StoreError>;
}

/// Append-only execution log storage.
pub trait ExecutionLogStore {
    fn append_log(&self, log: &ExecutionLog) -> Result<(), StoreError>;

    /// Logs of one configuration, in append order.
    fn logs_for_configuration(&self, id: &MappingConfigId)
    -> Result<Vec<ExecutionLog>, StoreError>;
}

/// Configuration lifecycle: save with version increment, list, activate,
/// soft-delete.
pub trait ConfigurationStore: ConfigurationSource {
    /// Insert at version 1, or replace the stored configuration with its
    /// version incremented. `expected_version` rejects stale writes.
    fn save_configuration(
        &self,
        configuration: MappingConfiguration,
        expected_version: Option<u32>,
    ) -> Result<MappingConfiguration, StoreError>;

    /// Configurations owned by the tenant, soft-deleted ones excluded.
    fn list_configurations(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<MappingConfiguration>, StoreError>;

    fn set_active(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
        active: bool,
    ) -> Result<MappingConfiguration, StoreError>;

    fn soft_delete_configuration(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
    ) -> Result<MappingConfiguration, StoreError>;
}

/// Validation rule management.
pub trait RuleStore: RuleSource {
    /// Insert or replace a rule by id.
    fn save_rule(&self, rule: ValidationRule) -> Result<(), StoreError>;
}

/// Validate and version a configuration about to replace `existing`.
pub(crate) fn prepare_save(
    existing: Option<&MappingConfiguration>,
    mut incoming: MappingConfiguration,
    expected_version: Option<u32>,
    registry: &FunctionRegistry,
    now: DateTime<Utc>,
) -> Result<MappingConfiguration, StoreError> {
    validate_rules(&incoming.rules, registry)?;

    match existing {
        Some(current) => {
            if current.tenant_id != incoming.tenant_id {
                return Err(StoreError::TenantMismatch {
                    id: current.id.clone(),
                    tenant_id: incoming.tenant_id,
                });
            }
            if current.is_deleted() {
                return Err(StoreError::Deleted(current.id.clone()));
            }
            if let Some(expected) = expected_version
                && expected != current.version
            {
                return Err(StoreError::VersionConflict {
                    id: current.id.clone(),
                    expected,
                    actual: current.version,
                });
            }
            incoming.version = next_version(current)?;
            incoming.created_at = current.created_at.or(Some(now));
        }
        None => {
            if let Some(expected) = expected_version {
                return Err(StoreError::VersionConflict {
                    id: incoming.id.clone(),
                    expected,
                    actual: 0,
                });
            }
            incoming.version = 1;
            incoming.created_at = Some(now);
        }
    }
    incoming.updated_at = Some(now);
    incoming.deleted_at = None;
    Ok(incoming)
}

/// Look up an owned, not-deleted configuration for a lifecycle change.
pub(crate) fn owned_configuration(
    existing: Option<MappingConfiguration>,
    id: &MappingConfigId,
    tenant_id: &TenantId,
) -> Result<MappingConfiguration, StoreError> {
    let configuration = existing.ok_or_else(|| StoreError::NotFound(id.clone()))?;
    if &configuration.tenant_id != tenant_id {
        return Err(StoreError::TenantMismatch {
            id: id.clone(),
            tenant_id: tenant_id.clone(),
        });
    }
    if configuration.is_deleted() {
        return Err(StoreError::Deleted(id.clone()));
    }
    Ok(configuration)
}

fn next_version(configuration: &MappingConfiguration) -> Result<u32, StoreError> {
    configuration
        .version
        .checked_add(1)
        .ok_or_else(|| StoreError::VersionExhausted(configuration.id.clone()))
}

/// Apply an in-place lifecycle change: bump the version and touch timestamps.
pub(crate) fn touch(
    configuration: &mut MappingConfiguration,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    configuration.version = next_version(configuration)?;
    configuration.updated_at = Some(now);
    Ok(())
}

/// Reject rules whose pattern does not compile.
pub(crate) fn check_rule(rule: &ValidationRule) -> Result<(), StoreError> {
    CompiledRule::try_compile(rule.clone())
        .map(|_| ())
        .map_err(|error| StoreError::InvalidRule {
            id: rule.id.clone(),
            message: error.to_string(),
        })
}
