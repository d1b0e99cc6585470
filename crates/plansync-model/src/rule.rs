//! Validation rule definitions.
//!
//! Rules are generic, operator-based checks applied to destination records.
//! A tenant sees both global rules and its own rules; the two sets are
//! evaluated side by side and a tenant rule never replaces a global rule that
//! targets the same field.

use serde::{Deserialize, Serialize};

use crate::ids::{RuleId, TenantId};
use crate::mapping::MappingType;
use crate::value::FieldValue;

/// Rule severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Marks the record invalid and blocks batch success.
    Error,
    /// Advisory only.
    Warning,
}

impl Severity {
    /// Parse severity from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
        }
    }
}

/// Who a rule belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    #[default]
    Global,
    Tenant(TenantId),
}

impl RuleScope {
    /// Global rules apply to everyone, tenant rules only to their tenant.
    pub fn applies_to(&self, tenant_id: &TenantId) -> bool {
        match self {
            Self::Global => true,
            Self::Tenant(owner) => owner == tenant_id,
        }
    }
}

/// Mapping types a rule is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingTypeFilter {
    /// Wildcard.
    #[default]
    All,
    Types(Vec<MappingType>),
}

impl MappingTypeFilter {
    pub fn matches(&self, mapping_type: MappingType) -> bool {
        match self {
            Self::All => true,
            Self::Types(types) => types.contains(&mapping_type),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A generic check over one destination field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: RuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: RuleScope,
    #[serde(default)]
    pub applies_to: MappingTypeFilter,
    pub logic: RuleLogic,
    /// Message template. `{field}`, `{value}` and `{expected}` are replaced
    /// when an issue is reported.
    pub message: String,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ValidationRule {
    pub fn new(id: RuleId, logic: RuleLogic, severity: Severity) -> Self {
        Self {
            id,
            name: String::new(),
            scope: RuleScope::Global,
            applies_to: MappingTypeFilter::All,
            logic,
            message: String::new(),
            severity,
            active: true,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_applies_to(mut self, applies_to: MappingTypeFilter) -> Self {
        self.applies_to = applies_to;
        self
    }

    /// Active, in scope for the tenant, and matching the mapping type.
    pub fn is_applicable(&self, tenant_id: &TenantId, mapping_type: MappingType) -> bool {
        self.active && self.scope.applies_to(tenant_id) && self.applies_to.matches(mapping_type)
    }
}

/// Target field plus operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleLogic {
    pub field: String,
    #[serde(flatten)]
    pub operator: RuleOperator,
}

impl RuleLogic {
    pub fn new(field: impl Into<String>, operator: RuleOperator) -> Self {
        Self {
            field: field.into(),
            operator,
        }
    }
}

/// Closed set of rule operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum RuleOperator {
    Equals { value: FieldValue },
    NotEquals { value: FieldValue },
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    /// Inclusive numeric range.
    Between { min: f64, max: f64 },
    In { values: Vec<FieldValue> },
    NotIn { values: Vec<FieldValue> },
    /// Regular expression matched against the display form of the value.
    Matches { pattern: String },
    /// Present, non-null, and non-blank if textual.
    NotEmpty,
}

impl RuleOperator {
    /// Operator name as written in rule configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals { .. } => "equals",
            Self::NotEquals { .. } => "not_equals",
            Self::GreaterThan { .. } => "greater_than",
            Self::LessThan { .. } => "less_than",
            Self::Between { .. } => "between",
            Self::In { .. } => "in",
            Self::NotIn { .. } => "not_in",
            Self::Matches { .. } => "matches",
            Self::NotEmpty => "not_empty",
        }
    }

    /// Issue code reported when a rule with this operator fails.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Equals { .. } => "EQUALS",
            Self::NotEquals { .. } => "NOT_EQUALS",
            Self::GreaterThan { .. } => "GREATER_THAN",
            Self::LessThan { .. } => "LESS_THAN",
            Self::Between { .. } => "BETWEEN",
            Self::In { .. } => "IN",
            Self::NotIn { .. } => "NOT_IN",
            Self::Matches { .. } => "MATCHES",
            Self::NotEmpty => "NOT_EMPTY",
        }
    }

    /// Human-readable description of the expected value, used for `{expected}`.
    pub fn expected(&self) -> String {
        match self {
            Self::Equals { value } => format!("equal to {value}"),
            Self::NotEquals { value } => format!("not equal to {value}"),
            Self::GreaterThan { value } => format!("greater than {}", FieldValue::Number(*value)),
            Self::LessThan { value } => format!("less than {}", FieldValue::Number(*value)),
            Self::Between { min, max } => format!(
                "between {} and {}",
                FieldValue::Number(*min),
                FieldValue::Number(*max)
            ),
            Self::In { values } => format!("one of [{}]", join_values(values)),
            Self::NotIn { values } => format!("none of [{}]", join_values(values)),
            Self::Matches { pattern } => format!("matching /{pattern}/"),
            Self::NotEmpty => "a non-empty value".to_string(),
        }
    }
}

fn join_values(values: &[FieldValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
