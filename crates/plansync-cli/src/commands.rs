use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use plansync_core::{
    ApplyOptions, ConfigurationStore, JsonRepository, MappingEngine, RuleStore, StoreError,
};
use plansync_model::{FileImportId, MappingConfigId, MappingResult, TenantId};
use plansync_cli::input::{read_configuration, read_records, read_rules};
use plansync_cli::settings::Settings;
use plansync_cli::summary::{config_issue_table, function_table, log_table};
use plansync_transform::{FunctionRegistry, RulesValidator};

use crate::cli::{ApplyArgs, CheckArgs, ImportConfigArgs, ImportRulesArgs, LogsArgs};

/// Resolved settings shared by every subcommand.
pub struct CommandContext {
    pub settings: Settings,
    pub store_dir: PathBuf,
}

impl CommandContext {
    pub fn new(settings: Settings, store_dir_override: Option<PathBuf>) -> Self {
        let store_dir = store_dir_override.unwrap_or_else(|| settings.store_dir.clone());
        Self {
            settings,
            store_dir,
        }
    }

    fn repository(&self) -> Result<JsonRepository> {
        JsonRepository::open(&self.store_dir)
            .with_context(|| format!("open repository {}", self.store_dir.display()))
    }

    fn engine(&self) -> Result<MappingEngine<JsonRepository>> {
        Ok(MappingEngine::new(self.repository()?).with_options(self.settings.engine_options()))
    }
}

pub fn run_apply(context: &CommandContext, args: &ApplyArgs) -> Result<MappingResult> {
    let config_id = MappingConfigId::new(args.config.as_str()).context("invalid --config")?;
    let tenant_id = TenantId::new(args.tenant.as_str()).context("invalid --tenant")?;
    let mut options = ApplyOptions {
        dry_run: args.dry_run,
        skip_validation: args.skip_validation,
        file_import_id: None,
    };
    if let Some(file_import) = &args.file_import {
        options = options.with_file_import(
            FileImportId::new(file_import.as_str()).context("invalid --file-import")?,
        );
    }

    let records = read_records(&args.records)?;
    let engine = context.engine()?;
    let result = engine
        .apply(&config_id, &records, &tenant_id, &options)
        .with_context(|| format!("apply mapping configuration {config_id}"))?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&result).context("serialize mapping result")?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), "mapping result written");
    }
    Ok(result)
}

pub fn run_logs(context: &CommandContext, args: &LogsArgs) -> Result<()> {
    let config_id = MappingConfigId::new(args.config.as_str()).context("invalid --config")?;
    let tenant_id = TenantId::new(args.tenant.as_str()).context("invalid --tenant")?;
    let limit = args.limit.unwrap_or(context.settings.default_log_limit);

    let summaries = context
        .engine()?
        .get_execution_logs(&config_id, &tenant_id, limit)
        .with_context(|| format!("load execution logs of {config_id}"))?;
    if summaries.is_empty() {
        println!("No execution logs for {config_id}.");
    } else {
        println!("{}", log_table(&summaries));
    }
    Ok(())
}

/// Validate a configuration file. Returns false when problems were found.
pub fn run_check(args: &CheckArgs) -> Result<bool> {
    let configuration = read_configuration(&args.configuration)?;
    let registry = FunctionRegistry::builtin();
    let mut validator = RulesValidator::new(&registry);
    if let Some(sample) = &args.sample {
        let records = read_records(sample)?;
        let fields: Vec<String> = records
            .iter()
            .flat_map(|record| record.field_names())
            .map(str::to_string)
            .collect();
        validator = validator.with_source_fields(fields);
    }

    let issues = validator.issues(&configuration.rules);
    if issues.is_empty() {
        println!("{}: OK", configuration.id);
        return Ok(true);
    }
    println!("{}: {} problem(s)", configuration.id, issues.len());
    println!("{}", config_issue_table(&issues));
    Ok(false)
}

pub fn run_import_config(context: &CommandContext, args: &ImportConfigArgs) -> Result<()> {
    let configuration = read_configuration(&args.configuration)?;
    let span = info_span!("import_config", mapping_config_id = %configuration.id);
    let _guard = span.enter();

    let repository = context.repository()?;
    match repository.save_configuration(configuration, args.expected_version) {
        Ok(saved) => {
            println!("Saved {} at version {}.", saved.id, saved.version);
            Ok(())
        }
        Err(StoreError::InvalidConfiguration(error)) => {
            println!("{}", config_issue_table(&error.issues));
            Err(StoreError::InvalidConfiguration(error)).context("configuration rejected")
        }
        Err(error) => Err(error).context("save configuration"),
    }
}

pub fn run_import_rules(context: &CommandContext, args: &ImportRulesArgs) -> Result<()> {
    let rules = read_rules(&args.rules)?;
    let repository = context.repository()?;
    let count = rules.len();
    for rule in rules {
        let id = rule.id.clone();
        repository
            .save_rule(rule)
            .with_context(|| format!("save validation rule {id}"))?;
    }
    println!("Saved {count} validation rule(s).");
    Ok(())
}

pub fn run_functions() -> Result<()> {
    println!("{}", function_table(&FunctionRegistry::builtin()));
    Ok(())
}
