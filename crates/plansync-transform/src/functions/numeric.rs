//! Numeric and type-conversion catalog functions.

use plansync_model::{FieldValue, Params};

use super::{FunctionSpec, kind_of, no_params, numeric, param_count, required_number};
use crate::error::TransformError;

/// Largest accepted `places` for `round`.
const MAX_ROUND_PLACES: usize = 10;

pub(super) const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec {
        name: "multiply",
        description: "Multiply by `factor`",
        func: multiply,
        params: check_multiply,
    },
    FunctionSpec {
        name: "divide",
        description: "Divide by a non-zero `divisor`",
        func: divide,
        params: check_divide,
    },
    FunctionSpec {
        name: "round",
        description: "Round half away from zero to `places` decimals (default 0)",
        func: round,
        params: check_round,
    },
    FunctionSpec {
        name: "dollars_to_cents",
        description: "Convert a dollar amount to whole cents",
        func: dollars_to_cents,
        params: no_params,
    },
    FunctionSpec {
        name: "cents_to_dollars",
        description: "Convert cents to a dollar amount",
        func: cents_to_dollars,
        params: no_params,
    },
    FunctionSpec {
        name: "to_number",
        description: "Parse a number, ignoring `$`, `,` and whitespace",
        func: to_number,
        params: no_params,
    },
    FunctionSpec {
        name: "to_boolean",
        description: "Parse true/false, yes/no, y/n or 1/0",
        func: to_boolean,
        params: no_params,
    },
];

fn finite(function: &'static str, value: f64) -> Result<FieldValue, TransformError> {
    if value.is_finite() {
        Ok(FieldValue::Number(value))
    } else {
        Err(TransformError::Unparseable {
            function,
            message: "result is not a finite number".to_string(),
        })
    }
}

fn check_multiply(params: &Params) -> Result<(), TransformError> {
    required_number("multiply", params, "factor").map(|_| ())
}

fn multiply(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let factor = required_number("multiply", params, "factor")?;
    finite("multiply", numeric("multiply", value)? * factor)
}

fn divisor(params: &Params) -> Result<f64, TransformError> {
    let divisor = required_number("divide", params, "divisor")?;
    if divisor == 0.0 {
        return Err(TransformError::InvalidParam {
            function: "divide",
            param: "divisor",
            message: "must not be zero".to_string(),
        });
    }
    Ok(divisor)
}

fn check_divide(params: &Params) -> Result<(), TransformError> {
    divisor(params).map(|_| ())
}

fn divide(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let divisor = divisor(params)?;
    finite("divide", numeric("divide", value)? / divisor)
}

fn round_places(params: &Params) -> Result<usize, TransformError> {
    let places = param_count("round", params, "places")?.unwrap_or(0);
    if places > MAX_ROUND_PLACES {
        return Err(TransformError::InvalidParam {
            function: "round",
            param: "places",
            message: format!("must be at most {MAX_ROUND_PLACES}"),
        });
    }
    Ok(places)
}

fn check_round(params: &Params) -> Result<(), TransformError> {
    round_places(params).map(|_| ())
}

fn round(value: &FieldValue, params: &Params) -> Result<FieldValue, TransformError> {
    let scale = 10f64.powi(round_places(params)? as i32);
    finite("round", (numeric("round", value)? * scale).round() / scale)
}

fn dollars_to_cents(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    finite(
        "dollars_to_cents",
        (numeric("dollars_to_cents", value)? * 100.0).round(),
    )
}

fn cents_to_dollars(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    finite("cents_to_dollars", numeric("cents_to_dollars", value)? / 100.0)
}

fn to_number(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    match value {
        FieldValue::Number(number) => finite("to_number", *number),
        FieldValue::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
                .collect();
            match cleaned.parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(FieldValue::Number(number)),
                _ => Err(TransformError::Unparseable {
                    function: "to_number",
                    message: "value is not numeric".to_string(),
                }),
            }
        }
        other => Err(TransformError::UnsupportedValue {
            function: "to_number",
            kind: kind_of(other),
        }),
    }
}

fn to_boolean(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
    let unparseable = || TransformError::Unparseable {
        function: "to_boolean",
        message: "value is not a recognised boolean".to_string(),
    };
    match value {
        FieldValue::Bool(flag) => Ok(FieldValue::Bool(*flag)),
        FieldValue::Number(number) if *number == 1.0 => Ok(FieldValue::Bool(true)),
        FieldValue::Number(number) if *number == 0.0 => Ok(FieldValue::Bool(false)),
        FieldValue::Number(_) => Err(unparseable()),
        FieldValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(FieldValue::Bool(true)),
            "false" | "no" | "n" | "0" => Ok(FieldValue::Bool(false)),
            _ => Err(unparseable()),
        },
        other => Err(TransformError::UnsupportedValue {
            function: "to_boolean",
            kind: kind_of(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(key: &str, value: f64) -> Params {
        let mut params = Params::new();
        params.insert(key.to_string(), FieldValue::Number(value));
        params
    }

    #[test]
    fn scaling() {
        assert_eq!(
            multiply(&FieldValue::text("12.5"), &with("factor", 4.0)),
            Ok(FieldValue::Number(50.0))
        );
        assert_eq!(
            divide(&FieldValue::Number(10.0), &with("divisor", 4.0)),
            Ok(FieldValue::Number(2.5))
        );
        assert!(matches!(
            divide(&FieldValue::Number(10.0), &with("divisor", 0.0)),
            Err(TransformError::InvalidParam { param: "divisor", .. })
        ));
        assert!(matches!(
            multiply(&FieldValue::text("abc"), &with("factor", 2.0)),
            Err(TransformError::Unparseable { .. })
        ));
    }

    #[test]
    fn rounding_and_currency() {
        assert_eq!(
            round(&FieldValue::Number(2.346), &with("places", 2.0)),
            Ok(FieldValue::Number(2.35))
        );
        assert_eq!(
            round(&FieldValue::Number(-2.5), &Params::new()),
            Ok(FieldValue::Number(-3.0))
        );
        assert_eq!(
            dollars_to_cents(&FieldValue::text("1234.567"), &Params::new()),
            Ok(FieldValue::Number(123_457.0))
        );
        assert_eq!(
            cents_to_dollars(&FieldValue::Number(2500.0), &Params::new()),
            Ok(FieldValue::Number(25.0))
        );
    }

    #[test]
    fn parsing_conversions() {
        let none = Params::new();
        assert_eq!(
            to_number(&FieldValue::text(" $1,250.75 "), &none),
            Ok(FieldValue::Number(1250.75))
        );
        assert!(to_number(&FieldValue::text("12abc"), &none).is_err());
        assert_eq!(to_boolean(&FieldValue::text("Yes"), &none), Ok(FieldValue::Bool(true)));
        assert_eq!(to_boolean(&FieldValue::Number(0.0), &none), Ok(FieldValue::Bool(false)));
        assert!(to_boolean(&FieldValue::text("maybe"), &none).is_err());
    }
}
