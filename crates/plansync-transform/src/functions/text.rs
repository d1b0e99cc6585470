//! Text catalog functions.

use plansync_model::{FieldValue, Params};

use super::{FunctionSpec, no_params, param_count, param_text, scalar_text};
use crate::error::TransformError;

/// Longest text `pad_start` produces.
const MAX_PAD_LENGTH: usize = 1024;

pub(super) const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec {
        name: "uppercase",
        description: "Convert text to upper case",
        func: uppercase,
        params: no_params,
    },
    FunctionSpec {
        name: "lowercase",
        description: "Convert text to lower case",
        func: lowercase,
        params: no_params,
    },
    FunctionSpec {
        name: "trim",
        description: "Remove surrounding whitespace",
        func: trim,
        params: no_params,
    },
    FunctionSpec {
        name: "to_string",
        description: "Convert any value to its text form",
        func: to_string,
        params: no_params,
    },
    FunctionSpec {
        name: "pad_start",
        description: "Left-pad text to `length` characters with `fill` (default 0)",
        func: pad_start,
        params: check_pad_start,
    },
    FunctionSpec {
        name: "substring",
        description: "Characters from `start`, optionally limited to `length`",
        func: substring,
        params: check_substring,
    },
    FunctionSpec {
        name: "replace",
        description: "Replace every occurrence of `from` with `to`",
        func: replace,
        params: check_replace,
    },
    FunctionSpec {
        name: "digits_only",
        description: "Keep only ASCII digits",
        func: digits_only,
        params: no_params,
    },
    FunctionSpec {
        name: "format_ssn",
        description: "Format nine digits as NNN-NN-NNNN",
        func: format_ssn,
        params: no_params,
    },
];

fn uppercase(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    Ok(FieldValue::Text(scalar_text("uppercase", value)?.to_uppercase()))
}

fn lowercase(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    Ok(FieldValue::Text(scalar_text("lowercase", value)?.to_lowercase()))
}

fn trim(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    Ok(FieldValue::text(scalar_text("trim", value)?.trim()))
}

fn to_string(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    Ok(match value {
        FieldValue::Null => FieldValue::Null,
        other => FieldValue::Text(other.to_string()),
    })
}

fn pad_params(params: &Params) -> Result<(usize, char), TransformError> {
    const NAME: &str = "pad_start";
    let length = param_count(NAME, params, "length")?.ok_or(TransformError::MissingParam {
        function: NAME,
        param: "length",
    })?;
    if length > MAX_PAD_LENGTH {
        return Err(TransformError::InvalidParam {
            function: NAME,
            param: "length",
            message: format!("must be at most {MAX_PAD_LENGTH}"),
        });
    }
    let fill = match param_text(NAME, params, "fill")? {
        None => '0',
        Some(fill) => {
            let mut chars = fill.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => ch,
                _ => {
                    return Err(TransformError::InvalidParam {
                        function: NAME,
                        param: "fill",
                        message: "expected a single character".to_string(),
                    });
                }
            }
        }
    };
    Ok((length, fill))
}

fn check_pad_start(params: &Params) -> Result<(), TransformError> {
    pad_params(params).map(|_| ())
}

fn pad_start(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let text = scalar_text("pad_start", value)?;
    let (length, fill) = pad_params(params)?;

    let current = text.chars().count();
    if current >= length {
        return Ok(FieldValue::Text(text));
    }
    let mut padded: String = std::iter::repeat_n(fill, length - current).collect();
    padded.push_str(&text);
    Ok(FieldValue::Text(padded))
}

fn substring_params(params: &Params) -> Result<(usize, Option<usize>), TransformError> {
    const NAME: &str = "substring";
    let start = param_count(NAME, params, "start")?.unwrap_or(0);
    Ok((start, param_count(NAME, params, "length")?))
}

fn check_substring(params: &Params) -> Result<(), TransformError> {
    substring_params(params).map(|_| ())
}

fn substring(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let text = scalar_text("substring", value)?;
    let (start, length) = substring_params(params)?;
    let chars = text.chars().skip(start);
    let sliced: String = match length {
        Some(length) => chars.take(length).collect(),
        None => chars.collect(),
    };
    Ok(FieldValue::Text(sliced))
}

fn replace_params(params: &Params) -> Result<(&str, &str), TransformError> {
    const NAME: &str = "replace";
    let from = param_text(NAME, params, "from")?.ok_or(TransformError::MissingParam {
        function: NAME,
        param: "from",
    })?;
    if from.is_empty() {
        return Err(TransformError::InvalidParam {
            function: NAME,
            param: "from",
            message: "must not be empty".to_string(),
        });
    }
    Ok((from, param_text(NAME, params, "to")?.unwrap_or("")))
}

fn check_replace(params: &Params) -> Result<(), TransformError> {
    replace_params(params).map(|_| ())
}

fn replace(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let text = scalar_text("replace", value)?;
    let (from, to) = replace_params(params)?;
    Ok(FieldValue::Text(text.replace(from, to)))
}

fn digits_only(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    let text = scalar_text("digits_only", value)?;
    Ok(FieldValue::Text(
        text.chars().filter(char::is_ascii_digit).collect(),
    ))
}

fn format_ssn(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    let text = scalar_text("format_ssn", value)?;
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 9 {
        return Err(TransformError::Unparseable {
            function: "format_ssn",
            message: format!("expected 9 digits, found {}", digits.len()),
        });
    }
    Ok(FieldValue::Text(format!(
        "{}-{}-{}",
        &digits[..3],
        &digits[3..5],
        &digits[5..]
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, FieldValue)]) -> Params {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn case_conversion_stringifies_scalars() {
        let none = Params::new();
        assert_eq!(uppercase(&FieldValue::text("smith"), &none), Ok(FieldValue::text("SMITH")));
        assert_eq!(lowercase(&FieldValue::text("SMITH"), &none), Ok(FieldValue::text("smith")));
        assert_eq!(uppercase(&FieldValue::Number(12.0), &none), Ok(FieldValue::text("12")));
        assert_eq!(
            uppercase(&FieldValue::Null, &none),
            Err(TransformError::UnsupportedValue {
                function: "uppercase",
                kind: "null"
            })
        );
    }

    #[test]
    fn pad_start_pads_to_length() {
        let p = params(&[("length", FieldValue::Number(6.0))]);
        assert_eq!(pad_start(&FieldValue::Number(42.0), &p), Ok(FieldValue::text("000042")));
        assert_eq!(pad_start(&FieldValue::text("1234567"), &p), Ok(FieldValue::text("1234567")));

        let star = params(&[("length", FieldValue::Number(4.0)), ("fill", FieldValue::text("*"))]);
        assert_eq!(pad_start(&FieldValue::text("ab"), &star), Ok(FieldValue::text("**ab")));

        let huge = params(&[("length", FieldValue::Number(5e7))]);
        assert!(matches!(
            pad_start(&FieldValue::text("x"), &huge),
            Err(TransformError::InvalidParam { param: "length", .. })
        ));
        let longest = params(&[("length", FieldValue::Number(MAX_PAD_LENGTH as f64))]);
        assert_eq!(
            pad_start(&FieldValue::text("x"), &longest).map(|v| v.to_string().len()),
            Ok(MAX_PAD_LENGTH)
        );

        let bad = params(&[("length", FieldValue::Number(4.0)), ("fill", FieldValue::text("ab"))]);
        assert!(matches!(
            pad_start(&FieldValue::text("x"), &bad),
            Err(TransformError::InvalidParam { param: "fill", .. })
        ));
    }

    #[test]
    fn substring_is_char_based() {
        let p = params(&[("start", FieldValue::Number(1.0)), ("length", FieldValue::Number(3.0))]);
        assert_eq!(substring(&FieldValue::text("Zoë Smith"), &p), Ok(FieldValue::text("oë ")));
        let tail = params(&[("start", FieldValue::Number(20.0))]);
        assert_eq!(substring(&FieldValue::text("short"), &tail), Ok(FieldValue::text("")));
    }

    #[test]
    fn replace_requires_from() {
        let p = params(&[("from", FieldValue::text("-")), ("to", FieldValue::text(""))]);
        assert_eq!(replace(&FieldValue::text("12-34"), &p), Ok(FieldValue::text("1234")));
        assert!(matches!(
            replace(&FieldValue::text("x"), &Params::new()),
            Err(TransformError::MissingParam { param: "from", .. })
        ));
    }

    #[test]
    fn ssn_normalisation() {
        let none = Params::new();
        assert_eq!(
            digits_only(&FieldValue::text("(555) 010-2000"), &none),
            Ok(FieldValue::text("5550102000"))
        );
        assert_eq!(
            format_ssn(&FieldValue::text("123 45 6789"), &none),
            Ok(FieldValue::text("123-45-6789"))
        );
        assert!(format_ssn(&FieldValue::text("12345"), &none).is_err());
    }
}
