//! Compiled rule operators.

use regex::Regex;

use plansync_model::{FieldValue, RuleOperator};

/// A rule operator with its pattern compiled.
#[derive(Debug, Clone)]
pub(crate) enum CompiledOperator {
    Equals(FieldValue),
    NotEquals(FieldValue),
    GreaterThan(f64),
    LessThan(f64),
    Between { min: f64, max: f64 },
    In(Vec<FieldValue>),
    NotIn(Vec<FieldValue>),
    /// `None` when the pattern failed to compile; such a rule always fails.
    Matches(Option<Regex>),
    NotEmpty,
}

impl CompiledOperator {
    pub(crate) fn compile(operator: &RuleOperator) -> Result<Self, regex::Error> {
        Ok(match operator {
            RuleOperator::Equals { value } => Self::Equals(value.clone()),
            RuleOperator::NotEquals { value } => Self::NotEquals(value.clone()),
            RuleOperator::GreaterThan { value } => Self::GreaterThan(*value),
            RuleOperator::LessThan { value } => Self::LessThan(*value),
            RuleOperator::Between { min, max } => Self::Between {
                min: *min,
                max: *max,
            },
            RuleOperator::In { values } => Self::In(values.clone()),
            RuleOperator::NotIn { values } => Self::NotIn(values.clone()),
            RuleOperator::Matches { pattern } => Self::Matches(Some(Regex::new(pattern)?)),
            RuleOperator::NotEmpty => Self::NotEmpty,
        })
    }

    /// Whether `value` satisfies the operator.
    ///
    /// Absent and null values only fail `not_empty` and a pattern that did
    /// not compile; every other operator leaves them to a `not_empty` rule.
    /// Numeric operators fail for values without a numeric view.
    pub(crate) fn passes(&self, value: Option<&FieldValue>) -> bool {
        if matches!(self, Self::Matches(None)) {
            return false;
        }
        let value = match value {
            None | Some(FieldValue::Null) => return !matches!(self, Self::NotEmpty),
            Some(value) => value,
        };
        match self {
            Self::Equals(expected) => value.loosely_equals(expected),
            Self::NotEquals(expected) => !value.loosely_equals(expected),
            Self::GreaterThan(limit) => value.as_number().is_some_and(|n| n > *limit),
            Self::LessThan(limit) => value.as_number().is_some_and(|n| n < *limit),
            Self::Between { min, max } => value
                .as_number()
                .is_some_and(|n| n >= *min && n <= *max),
            Self::In(values) => values.iter().any(|candidate| value.loosely_equals(candidate)),
            Self::NotIn(values) => !values.iter().any(|candidate| value.loosely_equals(candidate)),
            Self::Matches(pattern) => pattern
                .as_ref()
                .is_some_and(|regex| regex.is_match(&value.to_string())),
            Self::NotEmpty => !value.is_blank(),
        }
    }
}
