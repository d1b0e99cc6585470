//! Mapping configuration types.
//!
//! A [`MappingConfiguration`] is the versioned, tenant-owned definition of how
//! one record type is converted from a source system's schema into a
//! destination system's schema. Its [`MappingRules`] hold five ordered rule
//! lists that the transformation pipeline executes in a fixed stage order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MappingConfigId, TenantId};
use crate::value::FieldValue;

/// Parameters passed to a named transformation function.
pub type Params = BTreeMap<String, FieldValue>;

/// Kind of record a configuration converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    Contribution,
    Employee,
    Election,
    Loan,
}

impl MappingType {
    pub const ALL: [MappingType; 4] = [
        MappingType::Contribution,
        MappingType::Employee,
        MappingType::Election,
        MappingType::Loan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::Employee => "employee",
            Self::Election => "election",
            Self::Loan => "loan",
        }
    }

    /// Parse a mapping type from its snake_case name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

fn initial_version() -> u32 {
    1
}

/// Versioned definition of how one record type moves between two systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    pub id: MappingConfigId,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub name: String,
    /// Source system identifier (e.g. a payroll provider).
    pub source_system: String,
    /// Destination system identifier (e.g. a plan record-keeper).
    pub destination_system: String,
    pub mapping_type: MappingType,
    #[serde(default)]
    pub rules: MappingRules,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Incremented on every in-place update.
    #[serde(default = "initial_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft-delete marker. Deleted configurations stay readable because
    /// execution logs reference them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MappingConfiguration {
    pub fn new(
        id: MappingConfigId,
        tenant_id: TenantId,
        mapping_type: MappingType,
        source_system: impl Into<String>,
        destination_system: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name: String::new(),
            source_system: source_system.into(),
            destination_system: destination_system.into(),
            mapping_type,
            rules: MappingRules::default(),
            active: true,
            version: initial_version(),
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: MappingRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Active and not soft-deleted.
    pub fn is_applicable(&self) -> bool {
        self.active && !self.is_deleted()
    }
}

/// The five ordered rule lists, executed in declaration order of the fields
/// below: field mappings, conditional mappings, calculated fields, lookups,
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingRules {
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub conditional_mappings: Vec<ConditionalMapping>,
    #[serde(default)]
    pub calculated_fields: Vec<CalculatedField>,
    #[serde(default)]
    pub lookup_mappings: Vec<LookupMapping>,
    #[serde(default)]
    pub default_values: Vec<DefaultValue>,
}

impl MappingRules {
    pub fn rule_count(&self) -> usize {
        self.field_mappings.len()
            + self.conditional_mappings.len()
            + self.calculated_fields.len()
            + self.lookup_mappings.len()
            + self.default_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }
}

/// Copy one source field to one destination field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: String,
    pub destination_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Transformation>,
    /// When set, an absent or null source value fails the whole record.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl FieldMapping {
    pub fn new(source_field: impl Into<String>, destination_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            destination_field: destination_field.into(),
            transformation: None,
            required: false,
        }
    }

    #[must_use]
    pub fn with_transformation(mut self, transformation: Transformation) -> Self {
        self.transformation = Some(transformation);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Reference to a function in the transformation catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: Params,
}

impl Transformation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Literal assignments applied when a condition over the source record holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalMapping {
    /// `field <op> literal`, with `op` one of `==`, `!=`, `>`, `<`.
    pub condition: String,
    pub assignments: Vec<FieldAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAssignment {
    pub destination_field: String,
    pub value: FieldValue,
}

impl FieldAssignment {
    pub fn new(destination_field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            destination_field: destination_field.into(),
            value: value.into(),
        }
    }
}

/// Destination field computed from an arithmetic formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedField {
    pub destination_field: String,
    pub formula: String,
    #[serde(default)]
    pub rounding: Rounding,
}

impl CalculatedField {
    pub fn new(destination_field: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            destination_field: destination_field.into(),
            formula: formula.into(),
            rounding: Rounding::None,
        }
    }

    #[must_use]
    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }
}

/// Rounding applied to a calculated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    #[default]
    None,
    /// Nearest 1/100 unit.
    Cents,
    /// Nearest whole unit.
    Dollars,
}

impl Rounding {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::Cents => (value * 100.0).round() / 100.0,
            Self::Dollars => value.round(),
        }
    }
}

/// Translate a source code into a destination code through a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupMapping {
    pub source_field: String,
    pub destination_field: String,
    pub table: LookupTable,
    /// Written when the source value is absent or not found in the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
}

/// Where lookup values come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupTable {
    /// Inline key to value map. Keys are matched against the display form
    /// of the source value.
    Inline(BTreeMap<String, FieldValue>),
    /// Reference to an externally managed table. Not resolved by the engine.
    External(String),
}

/// Literal written to a destination field in the last stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub destination_field: String,
    pub value: FieldValue,
    #[serde(default)]
    pub apply_when: ApplyWhen,
}

impl DefaultValue {
    pub fn new(
        destination_field: impl Into<String>,
        value: impl Into<FieldValue>,
        apply_when: ApplyWhen,
    ) -> Self {
        Self {
            destination_field: destination_field.into(),
            value: value.into(),
            apply_when,
        }
    }
}

/// When a default value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyWhen {
    /// Unconditionally overwrite.
    Always,
    /// Field absent or null.
    #[default]
    IfNull,
    /// Field absent, null, empty string, or empty collection.
    IfEmpty,
}

impl ApplyWhen {
    /// Whether a default should be written over the current value.
    pub fn should_apply(&self, current: Option<&FieldValue>) -> bool {
        match self {
            Self::Always => true,
            Self::IfNull => current.is_none_or(FieldValue::is_null),
            Self::IfEmpty => current.is_none_or(FieldValue::is_empty),
        }
    }
}
