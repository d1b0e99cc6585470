use plansync_cli::logging::REDACTED_VALUE;
use plansync_cli::summary::{apply_summary_table, function_table, issue_table};
use plansync_model::{
    ExecutionMetrics, FieldValue, MappingResult, RecordIssue, RuleId, Severity, ValidationIssue,
};
use plansync_transform::FunctionRegistry;

fn result_with_issues() -> MappingResult {
    let issue = ValidationIssue {
        field: "employeePreTax".to_string(),
        code: "GREATER_THAN".to_string(),
        message: "employeePreTax must be positive".to_string(),
        value: Some(FieldValue::Number(-100.0)),
        rule_id: RuleId::new("pretax-positive").unwrap(),
    };
    MappingResult {
        success: false,
        records: Vec::new(),
        errors: vec![
            RecordIssue::mapping_failed(0, Some("employeeNumber".to_string()), "missing"),
            RecordIssue::from_validation(2, Severity::Error, issue.clone()),
        ],
        warnings: vec![RecordIssue::from_validation(1, Severity::Warning, issue)],
        metrics: ExecutionMetrics::new(3, 2, 7),
    }
}

#[test]
fn issue_values_are_redacted() {
    let rendered = issue_table(&result_with_issues()).to_string();
    assert!(rendered.contains(REDACTED_VALUE));
    assert!(!rendered.contains("-100"));
    assert!(rendered.contains("MAPPING_FAILED"));
    assert!(rendered.contains("pretax-positive"));
}

#[test]
fn values_inside_messages_are_redacted() {
    let issue = ValidationIssue {
        field: "ssn".to_string(),
        code: "MATCHES".to_string(),
        message: "ssn 123-45-6789 is invalid".to_string(),
        value: Some(FieldValue::text("123-45-6789")),
        rule_id: RuleId::new("ssn-format").unwrap(),
    };
    let result = MappingResult {
        errors: vec![RecordIssue::from_validation(0, Severity::Error, issue)],
        ..MappingResult::default()
    };
    let rendered = issue_table(&result).to_string();
    assert!(!rendered.contains("123-45-6789"));
    assert!(rendered.contains("ssn [REDACTED] is invalid"));
}

#[test]
fn issues_are_listed_by_record() {
    let table = issue_table(&result_with_issues());
    assert_eq!(table.row_count(), 3);
    let rendered = table.to_string();
    let first = rendered.find("MAPPING_FAILED").unwrap();
    let warning = rendered.find("WARN").unwrap();
    assert!(first < warning);
}

#[test]
fn summary_shows_counts_and_outcome() {
    let rendered = apply_summary_table(&result_with_issues()).to_string();
    assert!(rendered.contains("FAILED"));
    assert!(rendered.contains("Produced"));

    let clean = MappingResult {
        success: true,
        metrics: ExecutionMetrics::new(1, 1, 0),
        ..MappingResult::default()
    };
    assert!(apply_summary_table(&clean).to_string().contains("OK"));
}

#[test]
fn function_table_lists_catalog() {
    let registry = FunctionRegistry::builtin();
    let rendered = function_table(&registry).to_string();
    for name in registry.names() {
        assert!(rendered.contains(name), "{name} missing from table");
    }
}
