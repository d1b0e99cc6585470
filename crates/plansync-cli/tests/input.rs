use std::fs;

use plansync_cli::input::{read_configuration, read_records, read_rules, records_from_csv};
use plansync_model::{FieldValue, MappingType, Record};
use tempfile::TempDir;

#[test]
fn csv_cells_become_text_and_empty_cells_null() {
    let csv = "employeeNumber, grossPay ,status\nE1,500000,ACTIVE\nE2,,TERMINATED\n";
    let records = records_from_csv(csv.as_bytes()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0],
        Record::new()
            .with("employeeNumber", "E1")
            .with("grossPay", "500000")
            .with("status", "ACTIVE")
    );
    assert_eq!(records[1].get("grossPay"), Some(&FieldValue::Null));
    assert_eq!(records[0].value("grossPay").as_number(), Some(500_000.0));
}

#[test]
fn ragged_csv_rows_are_rejected() {
    let csv = "a,b\n1,2,3\n";
    assert!(records_from_csv(csv.as_bytes()).is_err());
}

#[test]
fn json_records_keep_their_types() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.json");
    fs::write(
        &path,
        r#"[{"employeeNumber": "E1", "grossPay": 500000, "active": true, "note": null}]"#,
    )
    .unwrap();

    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("grossPay"), Some(&FieldValue::Number(500_000.0)));
    assert_eq!(records[0].get("active"), Some(&FieldValue::Bool(true)));
    assert_eq!(records[0].get("note"), Some(&FieldValue::Null));
}

#[test]
fn csv_extension_selects_the_csv_reader() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("payroll.CSV");
    fs::write(&path, "employeeNumber\nE7\n").unwrap();
    let records = read_records(&path).unwrap();
    assert_eq!(records[0].get("employeeNumber"), Some(&FieldValue::text("E7")));
}

#[test]
fn configuration_file_is_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "id": "acme-contributions",
            "tenant_id": "acme",
            "source_system": "payroll",
            "destination_system": "recordkeeper",
            "mapping_type": "contribution",
            "rules": {
                "field_mappings": [
                    {"source_field": "grossPay", "destination_field": "employeePreTax"}
                ]
            }
        }"#,
    )
    .unwrap();

    let configuration = read_configuration(&path).unwrap();
    assert_eq!(configuration.mapping_type, MappingType::Contribution);
    assert_eq!(configuration.rules.field_mappings.len(), 1);
    assert!(configuration.active);
}

#[test]
fn rules_file_accepts_one_rule_or_many() {
    let dir = TempDir::new().unwrap();
    let rule = r#"{
        "id": "pretax-positive",
        "logic": {"field": "employeePreTax", "operator": "greater_than", "value": 0},
        "message": "{field} must be positive",
        "severity": "ERROR"
    }"#;

    let single = dir.path().join("single.json");
    fs::write(&single, rule).unwrap();
    assert_eq!(read_rules(&single).unwrap().len(), 1);

    let many = dir.path().join("many.json");
    fs::write(&many, format!("[{rule}, {rule}]")).unwrap();
    assert_eq!(read_rules(&many).unwrap().len(), 2);

    let missing = dir.path().join("missing.json");
    let error = read_rules(&missing).unwrap_err();
    assert!(format!("{error:#}").contains("missing.json"));
}
