//! Loosely-typed field values and records.
//!
//! Source systems deliver records as untyped field/value maps (parsed CSV
//! rows, JSON payloads). [`FieldValue`] keeps the scalar shape of such data
//! without forcing a schema on it, and [`Record`] is the ordered map used for
//! both source and destination records.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest magnitude printed without a fractional part.
const INTEGRAL_DISPLAY_LIMIT: f64 = 1e15;

static NULL_VALUE: FieldValue = FieldValue::Null;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Absent or explicit null.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Collection values only appear when a source system sends arrays.
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, an empty string, or an empty collection.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }

    /// Null, or text that is blank after trimming, or an empty collection.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            other => other.is_empty(),
        }
    }

    /// Numeric view of the value.
    ///
    /// Text is parsed after trimming; booleans, nulls and lists have no
    /// numeric value. Non-finite numbers are treated as non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            Self::Number(number) => *number,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
            Self::Null | Self::Bool(_) | Self::List(_) => return None,
        };
        number.is_finite().then_some(number)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Comparison used by equality conditions, lookups and set membership.
    ///
    /// Two values are equal when both have a numeric view and the numbers
    /// match, otherwise when their display forms match exactly.
    pub fn loosely_equals(&self, other: &FieldValue) -> bool {
        if let (Some(left), Some(right)) = (self.as_number(), other.as_number()) {
            return left == right;
        }
        if self.is_null() || other.is_null() {
            return self.is_null() && other.is_null();
        }
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(number) => format_number(*number, f),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

fn format_number(number: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if number.fract() == 0.0 && number.abs() < INTEGRAL_DISPLAY_LIMIT {
        write!(f, "{}", number as i64)
    } else {
        write!(f, "{number}")
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// An ordered field-name to value map.
///
/// Used for both source records (read-only once handed to the pipeline) and
/// destination records (built incrementally, never sharing storage with the
/// source record they were derived from).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

/// Record as delivered by a source system.
pub type SourceRecord = Record;

/// Record produced for the destination system.
pub type DestinationRecord = Record;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Value of the field, with absent fields reported as [`FieldValue::Null`].
    pub fn value(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NULL_VALUE)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Builder-style insert, handy for fixtures.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
