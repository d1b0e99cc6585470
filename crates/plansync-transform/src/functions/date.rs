//! Date catalog functions.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use plansync_model::{FieldValue, Params};

use super::{FunctionSpec, param_text, scalar_text};
use crate::error::TransformError;

const NAME: &str = "format_date";

/// Output format when `to` is not given.
const DEFAULT_OUTPUT: &str = "%Y-%m-%d";

/// Date formats tried, in order, when `from` is not given.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d", "%Y%m%d", "%d-%b-%Y", "%b %d, %Y",
];

/// Date-time formats tried, in order, when `from` is not given.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub(super) const FUNCTIONS: &[FunctionSpec] = &[FunctionSpec {
    name: NAME,
    description: "Reformat a date from `from` (or a common format) to `to` (default %Y-%m-%d)",
    func: format_date,
    params: check_format_date,
}];

/// Rejects parameters of the wrong type and output formats chrono cannot
/// render.
fn check_format_date(params: &Params) -> Result<(), TransformError> {
    param_text(NAME, params, "from")?;
    let to = param_text(NAME, params, "to")?.unwrap_or(DEFAULT_OUTPUT);
    let Some(sample) = NaiveDate::from_ymd_opt(2000, 1, 31) else {
        return Ok(());
    };
    render(sample, to).map(|_| ())
}

fn format_date(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let text = scalar_text(NAME, value)?;
    let text = text.trim();
    let from = param_text(NAME, params, "from")?;
    let to = param_text(NAME, params, "to")?.unwrap_or(DEFAULT_OUTPUT);

    let date = match from {
        Some(format) => parse_with(text, format),
        None => parse_common(text),
    }
    .ok_or_else(|| TransformError::Unparseable {
        function: NAME,
        message: match from {
            Some(format) => format!("value does not match date format {format:?}"),
            None => "value is not a recognised date".to_string(),
        },
    })?;

    render(date, to).map(FieldValue::Text)
}

fn render(date: NaiveDate, format: &str) -> Result<String, TransformError> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).map_err(|_| TransformError::InvalidParam {
        function: NAME,
        param: "to",
        message: format!("invalid date format {format:?}"),
    })?;
    Ok(out)
}

fn parse_with(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_common(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|format| {
                NaiveDateTime::parse_from_str(text, format)
                    .ok()
                    .map(|dt| dt.date())
            })
        })
}
