use std::fs;

use plansync_core::{
    ApplyOptions, ConfigurationSource, ConfigurationStore, ExecutionLogStore, JsonRepository,
    MappingEngine, RuleSource, RuleStore, StoreError,
};
use plansync_model::{
    ConditionalMapping, FieldAssignment, FieldMapping, MappingConfigId, MappingConfiguration,
    MappingRules, MappingType, Record, RuleId, RuleLogic, RuleOperator, RuleScope, Severity,
    TenantId, Transformation, ValidationRule,
};
use plansync_transform::{FunctionRegistry, FunctionSpec, no_params};
use tempfile::TempDir;

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).expect("tenant id")
}

fn sample_config(id: &str, tenant_id: &str) -> MappingConfiguration {
    let rules = MappingRules {
        field_mappings: vec![FieldMapping::new("grossPay", "employeePreTax")],
        ..MappingRules::default()
    };
    MappingConfiguration::new(
        MappingConfigId::new(id).expect("config id"),
        tenant(tenant_id),
        MappingType::Contribution,
        "payroll",
        "recordkeeper",
    )
    .with_rules(rules)
}

#[test]
fn repository_save_and_load() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");

    let saved = repo
        .save_configuration(sample_config("cfg-1", "acme"), None)
        .expect("save configuration");
    assert_eq!(saved.version, 1);
    assert!(saved.created_at.is_some());
    assert!(dir.path().join("configurations/cfg-1.json").exists());

    let loaded = repo
        .configuration(&saved.id)
        .expect("load configuration")
        .expect("configuration should exist");
    assert_eq!(loaded, saved);
}

#[test]
fn repository_load_nonexistent() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");
    let missing = repo
        .configuration(&MappingConfigId::new("nope").expect("config id"))
        .expect("load");
    assert!(missing.is_none());
}

#[test]
fn updates_increment_version_and_reject_stale_writes() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");
    let first = repo
        .save_configuration(sample_config("cfg-1", "acme"), None)
        .expect("save");

    let second = repo
        .save_configuration(sample_config("cfg-1", "acme"), Some(first.version))
        .expect("update");
    assert_eq!(second.version, 2);
    assert_eq!(second.created_at, first.created_at);

    let stale = repo.save_configuration(sample_config("cfg-1", "acme"), Some(1));
    assert!(matches!(
        stale,
        Err(StoreError::VersionConflict {
            expected: 1,
            actual: 2,
            ..
        })
    ));

    let other_tenant = repo.save_configuration(sample_config("cfg-1", "globex"), None);
    assert!(matches!(other_tenant, Err(StoreError::TenantMismatch { .. })));
}

#[test]
fn malformed_configuration_is_not_persisted() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");
    let rules = MappingRules {
        conditional_mappings: vec![ConditionalMapping {
            condition: "source.status ~= 1".to_string(),
            assignments: vec![FieldAssignment::new("destinationStatus", "INACTIVE")],
        }],
        ..MappingRules::default()
    };
    let result = repo.save_configuration(sample_config("cfg-bad", "acme").with_rules(rules), None);
    assert!(matches!(result, Err(StoreError::InvalidConfiguration(_))));
    assert!(!dir.path().join("configurations/cfg-bad.json").exists());
}

#[test]
fn list_excludes_deleted_and_foreign_configurations() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");
    for (id, owner) in [("cfg-b", "acme"), ("cfg-a", "acme"), ("cfg-c", "globex"), ("cfg-d", "acme")] {
        repo.save_configuration(sample_config(id, owner), None)
            .expect("save");
    }
    let acme = tenant("acme");
    let deleted = repo
        .soft_delete_configuration(&MappingConfigId::new("cfg-d").expect("id"), &acme)
        .expect("delete");
    assert_eq!(deleted.version, 2);

    let ids: Vec<String> = repo
        .list_configurations(&acme)
        .expect("list")
        .into_iter()
        .map(|config| config.id.to_string())
        .collect();
    assert_eq!(ids, vec!["cfg-a", "cfg-b"]);

    // Deleted configurations stay readable.
    let still_there = repo.configuration(&deleted.id).expect("load");
    assert!(still_there.is_some_and(|config| config.is_deleted()));
}

#[test]
fn lifecycle_changes_check_ownership() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");
    let saved = repo
        .save_configuration(sample_config("cfg-1", "acme"), None)
        .expect("save");

    let result = repo.set_active(&saved.id, &tenant("globex"), false);
    assert!(matches!(result, Err(StoreError::TenantMismatch { .. })));

    let inactive = repo
        .set_active(&saved.id, &tenant("acme"), false)
        .expect("deactivate");
    assert!(!inactive.active);
    assert!(!inactive.is_applicable());

    let missing = repo.set_active(
        &MappingConfigId::new("nope").expect("id"),
        &tenant("acme"),
        true,
    );
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[test]
fn rules_are_upserted_and_scoped() {
    let dir = TempDir::new().expect("temp dir");
    let repo = JsonRepository::open(dir.path()).expect("open repo");
    let global = ValidationRule::new(
        RuleId::new("amount-positive").expect("rule id"),
        RuleLogic::new("amount", RuleOperator::GreaterThan { value: 0.0 }),
        Severity::Error,
    );
    repo.save_rule(global.clone()).expect("save global");
    repo.save_rule(global.with_message("{field} must be above zero"))
        .expect("replace global");
    repo.save_rule(
        ValidationRule::new(
            RuleId::new("acme-cap").expect("rule id"),
            RuleLogic::new("amount", RuleOperator::LessThan { value: 1000.0 }),
            Severity::Warning,
        )
        .with_scope(RuleScope::Tenant(tenant("acme"))),
    )
    .expect("save tenant rule");

    let acme_rules = repo.rules_for_tenant(&tenant("acme")).expect("rules");
    assert_eq!(acme_rules.len(), 2);
    assert_eq!(acme_rules[0].message, "{field} must be above zero");
    assert_eq!(repo.rules_for_tenant(&tenant("globex")).expect("rules").len(), 1);

    let bad_pattern = ValidationRule::new(
        RuleId::new("bad").expect("rule id"),
        RuleLogic::new(
            "ssn",
            RuleOperator::Matches {
                pattern: "([0-9".to_string(),
            },
        ),
        Severity::Error,
    );
    assert!(matches!(
        repo.save_rule(bad_pattern),
        Err(StoreError::InvalidRule { .. })
    ));
}

#[test]
fn execution_logs_survive_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let config = {
        let repo = JsonRepository::open(dir.path()).expect("open repo");
        let saved = repo
            .save_configuration(sample_config("cfg-1", "acme"), None)
            .expect("save");
        let engine = MappingEngine::new(repo);
        let records = vec![Record::new().with("grossPay", 100)];
        for _ in 0..2 {
            engine
                .apply(&saved.id, &records, &tenant("acme"), &ApplyOptions::default())
                .expect("apply");
        }
        saved
    };

    let repo = JsonRepository::open(dir.path()).expect("reopen repo");
    let logs = repo.logs_for_configuration(&config.id).expect("logs");
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| log.total_records == 1));

    let raw = fs::read_to_string(dir.path().join("logs/cfg-1.jsonl")).expect("read log file");
    assert_eq!(raw.lines().count(), 2);

    let engine = MappingEngine::new(repo);
    let summaries = engine
        .get_execution_logs(&config.id, &tenant("acme"), 1)
        .expect("summaries");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, logs[1].id);
}

#[test]
fn repository_validates_against_its_registry() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = sample_config("cfg-1", "acme");
    config.rules.field_mappings[0].transformation = Some(Transformation::new("identity"));

    let repo = JsonRepository::open(dir.path()).expect("open repo");
    assert!(matches!(
        repo.save_configuration(config.clone(), None),
        Err(StoreError::InvalidConfiguration(_))
    ));

    let mut registry = FunctionRegistry::empty();
    registry.register(FunctionSpec {
        name: "identity",
        description: "Return the value unchanged",
        func: |value, _| Ok(value.clone()),
        params: no_params,
    });
    let repo = repo.with_registry(registry);
    let saved = repo.save_configuration(config, None).expect("save");
    assert_eq!(saved.version, 1);
}
