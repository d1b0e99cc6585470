//! Rule engine for validating destination records.
//!
//! The engine is built once per batch from the rules applicable to a tenant
//! and mapping type, then shared read-only across every record.

use tracing::{debug, warn};

use plansync_model::{
    DestinationRecord, MappingType, Severity, TenantId, ValidationIssue, ValidationResult,
    ValidationRule,
};

use crate::message::render_message;
use crate::operator::CompiledOperator;

/// A rule with its operator compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: ValidationRule,
    operator: CompiledOperator,
}

impl CompiledRule {
    /// Compile one rule. A pattern that fails to compile is reported once and
    /// makes the rule fail for every record it sees.
    pub fn compile(rule: ValidationRule) -> Self {
        let operator = CompiledOperator::compile(&rule.logic.operator).unwrap_or_else(|error| {
            warn!(
                rule_id = %rule.id,
                %error,
                "invalid pattern, rule will fail every record"
            );
            CompiledOperator::Matches(None)
        });
        Self { rule, operator }
    }

    /// Compile one rule, rejecting a pattern that does not compile.
    pub fn try_compile(rule: ValidationRule) -> Result<Self, regex::Error> {
        let operator = CompiledOperator::compile(&rule.logic.operator)?;
        Ok(Self { rule, operator })
    }

    pub fn rule(&self) -> &ValidationRule {
        &self.rule
    }

    pub fn severity(&self) -> Severity {
        self.rule.severity
    }

    /// Check one record, returning an issue when the rule fails.
    pub fn check(&self, record: &DestinationRecord) -> Option<ValidationIssue> {
        let field = &self.rule.logic.field;
        let value = record.get(field);
        if self.operator.passes(value) {
            return None;
        }
        Some(ValidationIssue {
            field: field.clone(),
            code: self.rule.logic.operator.code().to_string(),
            message: render_message(&self.rule, value),
            value: value.cloned(),
            rule_id: self.rule.id.clone(),
        })
    }
}

/// Compiled rules for one batch.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Engine over every given rule, in order, without filtering.
    pub fn new(rules: impl IntoIterator<Item = ValidationRule>) -> Self {
        Self {
            rules: rules.into_iter().map(CompiledRule::compile).collect(),
        }
    }

    /// Engine over the rules applicable to `tenant_id` and `mapping_type`.
    ///
    /// Global rules and the tenant's own rules are both kept, even when they
    /// target the same field. Inactive rules are dropped.
    pub fn for_tenant(
        rules: impl IntoIterator<Item = ValidationRule>,
        tenant_id: &TenantId,
        mapping_type: MappingType,
    ) -> Self {
        let engine = Self::new(
            rules
                .into_iter()
                .filter(|rule| rule.is_applicable(tenant_id, mapping_type)),
        );
        debug!(
            tenant_id = %tenant_id,
            mapping_type = %mapping_type,
            rule_count = engine.len(),
            "validation rules loaded"
        );
        engine
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Evaluate every rule against one record. There is no short-circuit:
    /// a record collects one issue per failing rule.
    pub fn validate(&self, record: &DestinationRecord) -> ValidationResult {
        let mut result = ValidationResult::valid();
        for rule in &self.rules {
            if let Some(issue) = rule.check(record) {
                result.push(rule.severity(), issue);
            }
        }
        result
    }

    /// Validate a batch of records, one result per record in input order.
    pub fn validate_batch<'r, I>(&self, records: I) -> Vec<ValidationResult>
    where
        I: IntoIterator<Item = &'r DestinationRecord>,
    {
        records
            .into_iter()
            .map(|record| self.validate(record))
            .collect()
    }
}
