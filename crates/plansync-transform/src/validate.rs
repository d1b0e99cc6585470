//! Mapping rule validation before a configuration is saved.
//!
//! Run-time stages are lenient: a malformed condition evaluates to false and
//! a malformed formula leaves its field unset. Saving is strict, so the same
//! defects are rejected here with every problem listed at once.

use std::collections::BTreeSet;

use plansync_model::{LookupTable, MappingRules};

use crate::condition::Condition;
use crate::error::{ConditionError, ConfigError, ConfigIssue};
use crate::expression::Formula;
use crate::functions::FunctionRegistry;

/// Validate rules against `registry`, without a source schema.
pub fn validate_rules(rules: &MappingRules, registry: &FunctionRegistry) -> Result<(), ConfigError> {
    RulesValidator::new(registry).validate(rules)
}

/// Configurable mapping rule checker.
#[derive(Debug, Clone)]
pub struct RulesValidator<'a> {
    registry: &'a FunctionRegistry,
    source_fields: Option<BTreeSet<String>>,
}

impl<'a> RulesValidator<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            source_fields: None,
        }
    }

    /// Check field references against a known source schema.
    #[must_use]
    pub fn with_source_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self, rules: &MappingRules) -> Result<(), ConfigError> {
        let issues = self.issues(rules);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { issues })
        }
    }

    /// Every problem found, in rule order.
    pub fn issues(&self, rules: &MappingRules) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        // Destination fields written by stages 1 and 2, visible to formulas.
        let mut produced: BTreeSet<&str> = BTreeSet::new();

        for (idx, mapping) in rules.field_mappings.iter().enumerate() {
            let location = format!("field_mappings[{idx}]");
            if mapping.source_field.trim().is_empty() {
                issues.push(ConfigIssue::new(&location, "source field is empty"));
            } else if !self.is_known_source(&mapping.source_field) {
                issues.push(ConfigIssue::new(
                    &location,
                    format!("unknown source field '{}'", mapping.source_field),
                ));
            }
            if mapping.destination_field.trim().is_empty() {
                issues.push(ConfigIssue::new(&location, "destination field is empty"));
            }
            if let Some(transformation) = &mapping.transformation {
                if !self.registry.contains(&transformation.name) {
                    issues.push(ConfigIssue::new(
                        &location,
                        format!("unknown transformation function '{}'", transformation.name),
                    ));
                } else if let Err(error) = self
                    .registry
                    .check_params(&transformation.name, &transformation.params)
                {
                    issues.push(ConfigIssue::new(&location, error));
                }
            }
            produced.insert(mapping.destination_field.as_str());
        }

        for (idx, conditional) in rules.conditional_mappings.iter().enumerate() {
            let location = format!("conditional_mappings[{idx}]");
            match Condition::parse(&conditional.condition) {
                Ok(condition) if !self.is_known_source(condition.field()) => {
                    issues.push(ConfigIssue::new(
                        &location,
                        ConditionError::UnknownField(condition.field().to_string()),
                    ));
                }
                Ok(_) => {}
                Err(error) => issues.push(ConfigIssue::new(&location, error)),
            }
            if conditional.assignments.is_empty() {
                issues.push(ConfigIssue::new(&location, "no assignments"));
            }
            for (pos, assignment) in conditional.assignments.iter().enumerate() {
                if assignment.destination_field.trim().is_empty() {
                    issues.push(ConfigIssue::new(
                        format!("{location}.assignments[{pos}]"),
                        "destination field is empty",
                    ));
                }
                produced.insert(assignment.destination_field.as_str());
            }
        }

        for (idx, calculated) in rules.calculated_fields.iter().enumerate() {
            let location = format!("calculated_fields[{idx}]");
            if calculated.destination_field.trim().is_empty() {
                issues.push(ConfigIssue::new(&location, "destination field is empty"));
            }
            match Formula::parse(&calculated.formula) {
                Ok(formula) => {
                    for field in formula.fields() {
                        if !self.is_known_source(field) && !produced.contains(field) {
                            issues.push(ConfigIssue::new(
                                &location,
                                format!("formula references unknown field '{field}'"),
                            ));
                        }
                    }
                }
                Err(error) => issues.push(ConfigIssue::new(&location, error)),
            }
        }

        for (idx, lookup) in rules.lookup_mappings.iter().enumerate() {
            let location = format!("lookup_mappings[{idx}]");
            if lookup.source_field.trim().is_empty() {
                issues.push(ConfigIssue::new(&location, "source field is empty"));
            } else if !self.is_known_source(&lookup.source_field) {
                issues.push(ConfigIssue::new(
                    &location,
                    format!("unknown source field '{}'", lookup.source_field),
                ));
            }
            if lookup.destination_field.trim().is_empty() {
                issues.push(ConfigIssue::new(&location, "destination field is empty"));
            }
            if let LookupTable::External(reference) = &lookup.table
                && reference.trim().is_empty()
            {
                issues.push(ConfigIssue::new(&location, "lookup has no table"));
            }
        }

        for (idx, default) in rules.default_values.iter().enumerate() {
            if default.destination_field.trim().is_empty() {
                issues.push(ConfigIssue::new(
                    format!("default_values[{idx}]"),
                    "destination field is empty",
                ));
            }
        }

        issues
    }

    fn is_known_source(&self, field: &str) -> bool {
        self.source_fields
            .as_ref()
            .is_none_or(|fields| fields.contains(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use plansync_model::{
        CalculatedField, ConditionalMapping, FieldAssignment, FieldMapping, Transformation,
    };

    fn rules() -> MappingRules {
        MappingRules {
            field_mappings: vec![
                FieldMapping::new("grossPay", "employeePreTax"),
                FieldMapping::new("name", "lastName")
                    .with_transformation(Transformation::new("uppercase")),
            ],
            conditional_mappings: vec![ConditionalMapping {
                condition: "status == 'TERMINATED'".to_string(),
                assignments: vec![FieldAssignment::new("destinationStatus", "INACTIVE")],
            }],
            calculated_fields: vec![CalculatedField::new("employerMatch", "employeePreTax * 0.05")],
            ..MappingRules::default()
        }
    }

    #[test]
    fn well_formed_rules_pass() {
        let registry = FunctionRegistry::builtin();
        assert_eq!(validate_rules(&rules(), &registry), Ok(()));
        let validator = RulesValidator::new(&registry).with_source_fields(["grossPay", "name", "status"]);
        assert_eq!(validator.validate(&rules()), Ok(()));
    }

    #[test]
    fn every_problem_is_reported() {
        let registry = FunctionRegistry::builtin();
        let mut rules = rules();
        rules.field_mappings[1].transformation = Some(Transformation::new("eval"));
        rules.conditional_mappings[0].condition = "status >= 1".to_string();
        rules.calculated_fields.push(CalculatedField::new("bad", "grossPay; rm -rf /"));

        let error = validate_rules(&rules, &registry).unwrap_err();
        assert_eq!(error.issues.len(), 3);
        assert_snapshot!(error.to_string(), @"mapping rules are invalid (3 problem(s)): field_mappings[1]: unknown transformation function 'eval'; conditional_mappings[0]: unsupported operator \">=\" (expected ==, !=, > or <); calculated_fields[1]: character ';' at position 8 is not allowed");
    }

    #[test]
    fn transformation_parameters_are_checked() {
        let registry = FunctionRegistry::builtin();
        let mut rules = rules();
        rules.field_mappings[1].transformation =
            Some(Transformation::new("pad_start").with_param("length", 4e9));
        rules.field_mappings[0].transformation =
            Some(Transformation::new("round").with_param("places", 2.0));

        let error = validate_rules(&rules, &registry).unwrap_err();
        assert_eq!(error.issues.len(), 1);
        assert_eq!(error.issues[0].location, "field_mappings[1]");
        assert!(error.issues[0].message.contains("length"));

        rules.field_mappings[1].transformation =
            Some(Transformation::new("pad_start").with_param("length", 9.0));
        assert_eq!(validate_rules(&rules, &registry), Ok(()));
    }

    #[test]
    fn unknown_fields_are_rejected_with_schema() {
        let registry = FunctionRegistry::builtin();
        let validator = RulesValidator::new(&registry).with_source_fields(["grossPay"]);
        let issues = validator.issues(&rules());
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "field_mappings[1]: unknown source field 'name'".to_string(),
                "conditional_mappings[0]: unknown source field \"status\"".to_string(),
            ]
        );
    }
}
