//! Pipeline orchestrator.
//!
//! [`MappingEngine::apply`] runs one batch:
//!
//! 1. Resolve the mapping configuration and check it belongs to the caller,
//!    is active and not deleted. Failures here abort the whole call.
//! 2. Load and compile the tenant's validation rules once.
//! 3. Transform every record through the five stages. A record-fatal stage
//!    fault becomes a `MAPPING_FAILED` entry at that record's index and the
//!    batch continues.
//! 4. Validate all produced records in one call and merge the issues by
//!    index.
//! 5. Unless this is a dry run, append an execution log.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, debug_span, error, info, info_span, warn};

use plansync_model::{
    ExecutionLogSummary, ExecutionMetrics, MappedRecord, MappingConfigId, MappingConfiguration,
    MappingResult, RecordIssue, Severity, SourceRecord, TenantId,
};
use plansync_transform::{FunctionRegistry, RecordPipeline};
use plansync_validate::RuleEngine;

use crate::error::EngineError;
use crate::options::{ApplyOptions, EngineOptions};
use crate::recorder::{BatchRun, ExecutionLogRecorder};
use crate::store::{ConfigurationSource, ExecutionLogStore, RuleSource};

/// Record transformation and validation engine over a store.
#[derive(Debug)]
pub struct MappingEngine<S> {
    store: S,
    registry: FunctionRegistry,
    options: EngineOptions,
}

impl<S> MappingEngine<S>
where
    S: ConfigurationSource + RuleSource + ExecutionLogStore,
{
    /// Engine with the built-in function catalog and default options.
    pub fn new(store: S) -> Self {
        Self {
            store,
            registry: FunctionRegistry::builtin(),
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Transform and validate a batch of source records.
    ///
    /// Only configuration lookup, batch size and store failures are
    /// returned as errors. Everything that goes wrong for an individual
    /// record is reported inside the [`MappingResult`].
    pub fn apply(
        &self,
        mapping_config_id: &MappingConfigId,
        records: &[SourceRecord],
        tenant_id: &TenantId,
        options: &ApplyOptions,
    ) -> Result<MappingResult, EngineError> {
        let span = info_span!(
            "apply",
            mapping_config_id = %mapping_config_id,
            tenant_id = %tenant_id,
            records = records.len(),
            dry_run = options.dry_run
        );
        let _guard = span.enter();
        let started_at = Utc::now();
        let start = Instant::now();

        if let Some(max) = self.options.max_batch_size
            && records.len() > max
        {
            return Err(EngineError::BatchTooLarge {
                size: records.len(),
                max,
            });
        }

        let configuration = self.load_configuration(mapping_config_id, tenant_id)?;
        let rule_engine = if options.skip_validation {
            None
        } else {
            let rules = self.store.rules_for_tenant(tenant_id)?;
            Some(RuleEngine::for_tenant(
                rules,
                tenant_id,
                configuration.mapping_type,
            ))
        };

        let pipeline = RecordPipeline::compile(&configuration.rules, &self.registry);
        let mut produced = Vec::with_capacity(records.len());
        let mut errors = Vec::new();
        for (index, source) in records.iter().enumerate() {
            let _record = debug_span!("record", record_index = index).entered();
            match pipeline.transform(source) {
                Ok(record) => produced.push(MappedRecord {
                    source_index: index,
                    record,
                    valid: true,
                }),
                Err(fault) => {
                    warn!(
                        record_index = index,
                        stage = %fault.stage(),
                        field = fault.field(),
                        error = %fault,
                        "record failed mapping"
                    );
                    errors.push(RecordIssue::mapping_failed(
                        index,
                        fault.field().map(str::to_string),
                        fault.to_string(),
                    ));
                }
            }
        }

        let mut warnings = Vec::new();
        if let Some(rule_engine) = &rule_engine {
            let results = rule_engine.validate_batch(produced.iter().map(|mapped| &mapped.record));
            for (mapped, result) in produced.iter_mut().zip(results) {
                mapped.valid = result.valid;
                errors.extend(result.errors.into_iter().map(|issue| {
                    RecordIssue::from_validation(
                        mapped.source_index,
                        Severity::Error,
                        issue,
                    )
                }));
                warnings.extend(result.warnings.into_iter().map(|issue| {
                    RecordIssue::from_validation(
                        mapped.source_index,
                        Severity::Warning,
                        issue,
                    )
                }));
            }
        }
        errors.sort_by_key(|issue| issue.record_index);
        warnings.sort_by_key(|issue| issue.record_index);

        let processing_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = MappingResult {
            success: errors.is_empty(),
            metrics: ExecutionMetrics::new(records.len(), produced.len(), processing_time_ms),
            records: produced,
            errors,
            warnings,
        };

        info!(
            total = result.metrics.total_records,
            produced = result.metrics.successful_records,
            errors = result.error_count(),
            warnings = result.warning_count(),
            success = result.success,
            duration_ms = processing_time_ms,
            "batch applied"
        );

        if options.dry_run {
            debug!("dry run, execution log skipped");
        } else {
            let run = BatchRun {
                configuration: &configuration,
                file_import_id: options.file_import_id.clone(),
                started_at,
                completed_at: Utc::now(),
            };
            let log = ExecutionLogRecorder::new(self.options.error_sample_size)
                .summarize(run, &result);
            if let Err(write_error) = self.store.append_log(&log) {
                error!(
                    execution_log_id = %log.id,
                    error = %write_error,
                    "failed to write execution log"
                );
            }
        }

        Ok(result)
    }

    /// Execution log summaries of one configuration for one tenant, newest
    /// first, at most `limit` entries.
    pub fn get_execution_logs(
        &self,
        mapping_config_id: &MappingConfigId,
        tenant_id: &TenantId,
        limit: usize,
    ) -> Result<Vec<ExecutionLogSummary>, EngineError> {
        let mut logs = self.store.logs_for_configuration(mapping_config_id)?;
        logs.retain(|log| &log.tenant_id == tenant_id);
        // Append order breaks ties between equal start times.
        logs.reverse();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        logs.truncate(limit);
        Ok(logs.iter().map(ExecutionLogSummary::from).collect())
    }

    fn load_configuration(
        &self,
        id: &MappingConfigId,
        tenant_id: &TenantId,
    ) -> Result<MappingConfiguration, EngineError> {
        let configuration = self
            .store
            .configuration(id)?
            .ok_or_else(|| EngineError::ConfigurationNotFound(id.clone()))?;
        if &configuration.tenant_id != tenant_id {
            return Err(EngineError::WrongTenant {
                id: id.clone(),
                tenant_id: tenant_id.clone(),
            });
        }
        if configuration.is_deleted() {
            return Err(EngineError::ConfigurationDeleted(id.clone()));
        }
        if !configuration.active {
            return Err(EngineError::ConfigurationInactive(id.clone()));
        }
        debug!(version = configuration.version, "mapping configuration loaded");
        Ok(configuration)
    }
}
