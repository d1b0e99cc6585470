//! Error types for the transformation engine.
//!
//! Only [`StageError`] is fatal to a record. Expression, condition and
//! transformation-function errors are recoverable inside their stage and only
//! surface through engineering logs, or through [`ConfigError`] when a
//! configuration is validated before it is saved.

use std::fmt;

use thiserror::Error;

use crate::stages::Stage;

/// Errors from tokenizing, parsing or evaluating an arithmetic expression.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,

    #[error("expression is longer than {max} characters")]
    TooLong { max: usize },

    #[error("character {ch:?} at position {position} is not allowed")]
    InvalidCharacter { ch: char, position: usize },

    #[error("malformed number at position {position}")]
    InvalidNumber { position: usize },

    #[error("unexpected {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parenthesis at position {position}")]
    UnbalancedParenthesis { position: usize },

    #[error("function calls are not allowed ({name})")]
    FunctionCall { name: String },

    #[error("expression nesting exceeds {max} levels")]
    TooDeep { max: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

/// Errors from parsing a `field <op> literal` condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConditionError {
    #[error("condition is empty")]
    Empty,

    #[error("invalid field reference at position {position}")]
    InvalidField { position: usize },

    #[error("missing comparison operator")]
    MissingOperator,

    #[error("unsupported operator {0:?} (expected ==, !=, > or <)")]
    UnsupportedOperator(String),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("unexpected trailing input at position {position}")]
    TrailingInput { position: usize },

    #[error("unknown source field {0:?}")]
    UnknownField(String),
}

/// Errors raised by transformation catalog functions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransformError {
    #[error("unknown transformation function: {0}")]
    UnknownFunction(String),

    #[error("{function}: missing parameter '{param}'")]
    MissingParam {
        function: &'static str,
        param: &'static str,
    },

    #[error("{function}: invalid parameter '{param}': {message}")]
    InvalidParam {
        function: &'static str,
        param: &'static str,
        message: String,
    },

    #[error("{function}: cannot be applied to {kind} values")]
    UnsupportedValue {
        function: &'static str,
        kind: &'static str,
    },

    /// The input could not be interpreted. The input itself is not part of
    /// the message because record values may carry personal data.
    #[error("{function}: {message}")]
    Unparseable {
        function: &'static str,
        message: String,
    },
}

/// Record-fatal faults raised by a stage processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StageError {
    #[error("{stage} stage: required source field '{field}' is missing")]
    RequiredFieldMissing { stage: Stage, field: String },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::RequiredFieldMissing { stage, .. } => *stage,
        }
    }

    /// Field the fault is attributed to.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::RequiredFieldMissing { field, .. } => Some(field),
        }
    }
}

/// One problem found while validating mapping rules before they are saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Rule location, e.g. `calculated_fields[2]`.
    pub location: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(location: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            location: location.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Mapping rules rejected on save.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("mapping rules are invalid ({} problem(s)): {}", .issues.len(), format_issues(.issues))]
pub struct ConfigError {
    pub issues: Vec<ConfigIssue>,
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
