use plansync_model::{
    ApplyWhen, CalculatedField, ConditionalMapping, DefaultValue, FieldAssignment, FieldMapping,
    FieldValue, MappingRules, Record, Rounding, Transformation,
};
use plansync_transform::{FunctionRegistry, RecordPipeline, Stage};

fn contribution_rules() -> MappingRules {
    MappingRules {
        field_mappings: vec![FieldMapping::new("grossPay", "employeePreTax")],
        calculated_fields: vec![
            CalculatedField::new("employerMatch", "employeePreTax * 0.05")
                .with_rounding(Rounding::Cents),
        ],
        ..MappingRules::default()
    }
}

#[test]
fn employer_match_from_mapped_pre_tax() {
    let registry = FunctionRegistry::builtin();
    let rules = contribution_rules();
    let pipeline = RecordPipeline::compile(&rules, &registry);

    let source = Record::new()
        .with("employeeNumber", "E1")
        .with("grossPay", 500_000)
        .with("deferralBps", 500);
    let destination = pipeline.transform(&source).unwrap();

    let expected = Record::new()
        .with("employeePreTax", 500_000)
        .with("employerMatch", 25_000);
    assert_eq!(destination, expected);
}

#[test]
fn terminated_status_maps_to_inactive() {
    let registry = FunctionRegistry::builtin();
    let rules = MappingRules {
        conditional_mappings: vec![ConditionalMapping {
            condition: r#"source.status == "TERMINATED""#.to_string(),
            assignments: vec![FieldAssignment::new("destinationStatus", "INACTIVE")],
        }],
        ..MappingRules::default()
    };
    let pipeline = RecordPipeline::compile(&rules, &registry);

    let terminated = pipeline
        .transform(&Record::new().with("status", "TERMINATED"))
        .unwrap();
    assert_eq!(terminated.value("destinationStatus"), &FieldValue::text("INACTIVE"));

    let active = pipeline
        .transform(&Record::new().with("status", "ACTIVE"))
        .unwrap();
    assert!(!active.contains("destinationStatus"));

    let mut with_default = rules.clone();
    with_default.default_values = vec![DefaultValue::new(
        "destinationStatus",
        "ACTIVE",
        ApplyWhen::IfNull,
    )];
    let pipeline = RecordPipeline::compile(&with_default, &registry);
    let active = pipeline
        .transform(&Record::new().with("status", "ACTIVE"))
        .unwrap();
    assert_eq!(active.value("destinationStatus"), &FieldValue::text("ACTIVE"));
    let terminated = pipeline
        .transform(&Record::new().with("status", "TERMINATED"))
        .unwrap();
    assert_eq!(terminated.value("destinationStatus"), &FieldValue::text("INACTIVE"));
}

#[test]
fn bad_transformation_only_affects_its_own_record() {
    let registry = FunctionRegistry::builtin();
    let rules = MappingRules {
        field_mappings: vec![
            FieldMapping::new("hireDate", "hireDate")
                .with_transformation(Transformation::new("format_date")),
            FieldMapping::new("name", "lastName")
                .with_transformation(Transformation::new("uppercase")),
        ],
        ..MappingRules::default()
    };
    let pipeline = RecordPipeline::compile(&rules, &registry);

    let good = Record::new().with("hireDate", "03/01/2021").with("name", "lee");
    let bad = Record::new().with("hireDate", "last spring").with("name", "kim");

    let outputs: Vec<Record> = [&good, &bad, &good]
        .into_iter()
        .map(|source| pipeline.transform(source).unwrap())
        .collect();

    assert_eq!(outputs[0].value("hireDate"), &FieldValue::text("2021-03-01"));
    assert_eq!(outputs[1].value("hireDate"), &FieldValue::text("last spring"));
    assert_eq!(outputs[1].value("lastName"), &FieldValue::text("KIM"));
    assert_eq!(outputs[0], outputs[2]);
}

#[test]
fn defaults_never_overwrite_earlier_stages_unless_always() {
    let registry = FunctionRegistry::builtin();
    let fields = ["mapped", "conditional", "calculated", "looked_up"];
    let base = MappingRules {
        field_mappings: vec![FieldMapping::new("a", "mapped")],
        conditional_mappings: vec![ConditionalMapping {
            condition: "flag == true".to_string(),
            assignments: vec![FieldAssignment::new("conditional", "from-condition")],
        }],
        calculated_fields: vec![CalculatedField::new("calculated", "a * 2")],
        lookup_mappings: vec![plansync_model::LookupMapping {
            source_field: "code".to_string(),
            destination_field: "looked_up".to_string(),
            table: plansync_model::LookupTable::External("codes".to_string()),
            default: None,
        }],
        default_values: Vec::new(),
    };
    let source = Record::new()
        .with("a", 21)
        .with("flag", true)
        .with("code", "X1");

    for policy in [ApplyWhen::IfNull, ApplyWhen::IfEmpty, ApplyWhen::Always] {
        let mut rules = base.clone();
        rules.default_values = fields
            .iter()
            .map(|field| DefaultValue::new(*field, "DEFAULT", policy))
            .collect();
        let pipeline = RecordPipeline::compile(&rules, &registry);
        let destination = pipeline.transform(&source).unwrap();

        for field in fields {
            let overwritten = destination.value(field) == &FieldValue::text("DEFAULT");
            assert_eq!(
                overwritten,
                policy == ApplyWhen::Always,
                "field {field} under {policy:?}"
            );
        }
    }
}

#[test]
fn required_mapping_failure_names_stage_and_field() {
    let registry = FunctionRegistry::builtin();
    let rules = MappingRules {
        field_mappings: vec![FieldMapping::new("employeeNumber", "participantId").required()],
        ..MappingRules::default()
    };
    let pipeline = RecordPipeline::compile(&rules, &registry);
    let error = pipeline.transform(&Record::new()).unwrap_err();
    assert_eq!(error.stage(), Stage::FieldMapping);
    insta::assert_snapshot!(error.to_string(), @"field mapping stage: required source field 'employeeNumber' is missing");
}

#[test]
fn source_record_is_left_untouched() {
    let registry = FunctionRegistry::builtin();
    let rules = contribution_rules();
    let pipeline = RecordPipeline::compile(&rules, &registry);
    let source = Record::new().with("grossPay", 1_000);
    let snapshot = source.clone();
    let _ = pipeline.transform(&source).unwrap();
    assert_eq!(source, snapshot);
}
