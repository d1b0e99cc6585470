//! In-memory store.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;

use plansync_model::{
    ExecutionLog, MappingConfigId, MappingConfiguration, TenantId, ValidationRule,
};
use plansync_transform::FunctionRegistry;

use super::{
    ConfigurationSource, ConfigurationStore, ExecutionLogStore, RuleSource, RuleStore, check_rule,
    owned_configuration, prepare_save, touch,
};
use crate::error::StoreError;

/// Thread-safe store backed by in-process maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    registry: FunctionRegistry,
    configurations: RwLock<BTreeMap<MappingConfigId, MappingConfiguration>>,
    rules: RwLock<Vec<ValidationRule>>,
    logs: RwLock<Vec<ExecutionLog>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store validating configurations against a custom function catalog.
    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// Insert a configuration as-is, bypassing validation and versioning.
    ///
    /// Intended for seeding fixtures and for configurations created by an
    /// older control plane.
    pub fn insert_configuration(&self, configuration: MappingConfiguration) -> Result<(), StoreError> {
        self.configurations
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(configuration.id.clone(), configuration);
        Ok(())
    }

    /// Every execution log, in append order.
    pub fn all_logs(&self) -> Result<Vec<ExecutionLog>, StoreError> {
        Ok(self.logs.read().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn update(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
        change: impl FnOnce(&mut MappingConfiguration),
    ) -> Result<MappingConfiguration, StoreError> {
        let mut configurations = self.configurations.write().map_err(|_| StoreError::Poisoned)?;
        let mut configuration = owned_configuration(configurations.get(id).cloned(), id, tenant_id)?;
        change(&mut configuration);
        touch(&mut configuration, Utc::now())?;
        configurations.insert(id.clone(), configuration.clone());
        Ok(configuration)
    }
}

impl ConfigurationSource for InMemoryStore {
    fn configuration(
        &self,
        id: &MappingConfigId,
    ) -> Result<Option<MappingConfiguration>, StoreError> {
        Ok(self
            .configurations
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(id)
            .cloned())
    }
}

impl ConfigurationStore for InMemoryStore {
    fn save_configuration(
        &self,
        configuration: MappingConfiguration,
        expected_version: Option<u32>,
    ) -> Result<MappingConfiguration, StoreError> {
        let mut configurations = self.configurations.write().map_err(|_| StoreError::Poisoned)?;
        let saved = prepare_save(
            configurations.get(&configuration.id),
            configuration,
            expected_version,
            &self.registry,
            Utc::now(),
        )?;
        configurations.insert(saved.id.clone(), saved.clone());
        Ok(saved)
    }

    fn list_configurations(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<MappingConfiguration>, StoreError> {
        Ok(self
            .configurations
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .filter(|configuration| {
                &configuration.tenant_id == tenant_id && !configuration.is_deleted()
            })
            .cloned()
            .collect())
    }

    fn set_active(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
        active: bool,
    ) -> Result<MappingConfiguration, StoreError> {
        self.update(id, tenant_id, |configuration| configuration.active = active)
    }

    fn soft_delete_configuration(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
    ) -> Result<MappingConfiguration, StoreError> {
        self.update(id, tenant_id, |configuration| {
            configuration.deleted_at = Some(Utc::now());
        })
    }
}

impl RuleSource for InMemoryStore {
    fn rules_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<ValidationRule>, StoreError> {
        Ok(self
            .rules
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .iter()
            .filter(|rule| rule.scope.applies_to(tenant_id))
            .cloned()
            .collect())
    }
}

impl RuleStore for InMemoryStore {
    fn save_rule(&self, rule: ValidationRule) -> Result<(), StoreError> {
        check_rule(&rule)?;
        let mut rules = self.rules.write().map_err(|_| StoreError::Poisoned)?;
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Ok(())
    }
}

impl ExecutionLogStore for InMemoryStore {
    fn append_log(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        self.logs
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(log.clone());
        Ok(())
    }

    fn logs_for_configuration(
        &self,
        id: &MappingConfigId,
    ) -> Result<Vec<ExecutionLog>, StoreError> {
        Ok(self
            .logs
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .iter()
            .filter(|log| &log.mapping_config_id == id)
            .cloned()
            .collect())
    }
}
