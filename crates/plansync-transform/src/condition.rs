//! Typed `field <op> literal` conditions for conditional mappings.
//!
//! A condition is parsed once into a [`Condition`] and then evaluated against
//! each source record. The grammar is deliberately tiny:
//!
//! ```text
//! condition := FIELD OP LITERAL
//! FIELD     := ['source.'] [A-Za-z_][A-Za-z0-9_.]*
//! OP        := '==' | '===' | '!=' | '!==' | '>' | '<'
//! LITERAL   := quoted string | number | true | false | null
//! ```

use std::fmt;

use plansync_model::{FieldValue, Record};

use crate::error::ConditionError;

const SOURCE_PREFIX: &str = "source.";

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
}

impl ComparisonOp {
    fn parse(symbol: &str) -> Result<Self, ConditionError> {
        match symbol {
            "==" | "===" => Ok(Self::Equal),
            "!=" | "!==" => Ok(Self::NotEqual),
            ">" => Ok(Self::GreaterThan),
            "<" => Ok(Self::LessThan),
            other => Err(ConditionError::UnsupportedOperator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
        }
    }
}

/// A parsed condition over the source record.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    op: ComparisonOp,
    literal: FieldValue,
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, ConditionError> {
        let chars: Vec<char> = text.chars().collect();
        let mut pos = skip_whitespace(&chars, 0);
        if pos == chars.len() {
            return Err(ConditionError::Empty);
        }

        let field = parse_field(&chars, &mut pos)?;

        pos = skip_whitespace(&chars, pos);
        let op_start = pos;
        while pos < chars.len() && matches!(chars[pos], '=' | '!' | '<' | '>') {
            pos += 1;
        }
        if op_start == pos {
            return Err(ConditionError::MissingOperator);
        }
        let symbol: String = chars[op_start..pos].iter().collect();
        let op = ComparisonOp::parse(&symbol)?;

        pos = skip_whitespace(&chars, pos);
        let literal = parse_literal(&chars, &mut pos)?;

        pos = skip_whitespace(&chars, pos);
        if pos < chars.len() {
            return Err(ConditionError::TrailingInput { position: pos });
        }

        Ok(Self { field, op, literal })
    }

    /// Source field the condition reads.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> ComparisonOp {
        self.op
    }

    pub fn literal(&self) -> &FieldValue {
        &self.literal
    }

    /// Evaluate against a source record.
    ///
    /// Equality compares loosely (numerically when both sides are numeric).
    /// Ordering comparisons are false unless both sides are numeric.
    pub fn evaluate(&self, source: &Record) -> bool {
        let actual = source.value(&self.field);
        match self.op {
            ComparisonOp::Equal => actual.loosely_equals(&self.literal),
            ComparisonOp::NotEqual => !actual.loosely_equals(&self.literal),
            ComparisonOp::GreaterThan => compare_numbers(actual, &self.literal, |a, b| a > b),
            ComparisonOp::LessThan => compare_numbers(actual, &self.literal, |a, b| a < b),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.field, self.op.symbol())?;
        match &self.literal {
            FieldValue::Text(text) => write!(f, "{text:?}"),
            FieldValue::Null => f.write_str("null"),
            other => write!(f, "{other}"),
        }
    }
}

fn compare_numbers(actual: &FieldValue, literal: &FieldValue, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.as_number(), literal.as_number()) {
        (Some(left), Some(right)) => cmp(left, right),
        _ => false,
    }
}

fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

fn parse_field(chars: &[char], pos: &mut usize) -> Result<String, ConditionError> {
    let start = *pos;
    if !(chars[start].is_ascii_alphabetic() || chars[start] == '_') {
        return Err(ConditionError::InvalidField { position: start });
    }
    while *pos < chars.len()
        && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '_' || chars[*pos] == '.')
    {
        *pos += 1;
    }
    let raw: String = chars[start..*pos].iter().collect();
    let name = raw.strip_prefix(SOURCE_PREFIX).unwrap_or(&raw);
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && !name.ends_with('.');
    if !valid {
        return Err(ConditionError::InvalidField { position: start });
    }
    Ok(name.to_string())
}

fn parse_literal(chars: &[char], pos: &mut usize) -> Result<FieldValue, ConditionError> {
    let Some(&first) = chars.get(*pos) else {
        return Err(ConditionError::InvalidLiteral("missing literal".to_string()));
    };

    if first == '"' || first == '\'' {
        let start = *pos + 1;
        let Some(offset) = chars[start..].iter().position(|&c| c == first) else {
            return Err(ConditionError::InvalidLiteral(
                "unterminated string".to_string(),
            ));
        };
        *pos = start + offset + 1;
        return Ok(FieldValue::Text(chars[start..start + offset].iter().collect()));
    }

    let start = *pos;
    while *pos < chars.len() && !chars[*pos].is_whitespace() {
        *pos += 1;
    }
    let word: String = chars[start..*pos].iter().collect();
    match word.as_str() {
        "true" => return Ok(FieldValue::Bool(true)),
        "false" => return Ok(FieldValue::Bool(false)),
        "null" => return Ok(FieldValue::Null),
        _ => {}
    }

    let numeric_shape = word
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && word.chars().any(|c| c.is_ascii_digit());
    match word.parse::<f64>() {
        Ok(number) if numeric_shape && number.is_finite() => Ok(FieldValue::Number(number)),
        _ => Err(ConditionError::InvalidLiteral(format!(
            "expected a quoted string, number, true, false or null (found `{word}`)"
        ))),
    }
}
