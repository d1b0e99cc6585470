//! Transformation function registry.
//!
//! Field mappings may name a function from a fixed catalog. The catalog is a
//! plain map built when the registry is constructed; configuration can only
//! select entries by name, never add behaviour.

use std::collections::BTreeMap;

use plansync_model::{FieldValue, Params};

use crate::error::TransformError;

mod date;
mod numeric;
mod text;

/// Signature shared by every catalog function.
pub type TransformFn = fn(&FieldValue, &Params) -> Result<FieldValue, TransformError>;

/// Checks a function's parameters without a value, when a configuration is
/// saved.
pub type ParamCheck = fn(&Params) -> Result<(), TransformError>;

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub func: TransformFn,
    pub params: ParamCheck,
}

/// Named, pure transformation functions.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<&'static str, FunctionSpec>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FunctionRegistry {
    /// Registry with no functions.
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for spec in text::FUNCTIONS
            .iter()
            .chain(numeric::FUNCTIONS)
            .chain(date::FUNCTIONS)
        {
            registry.register(*spec);
        }
        registry
    }

    /// Add or replace a function.
    pub fn register(&mut self, spec: FunctionSpec) {
        self.functions.insert(spec.name, spec);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    pub fn specs(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Apply the named function.
    pub fn apply(
        &self,
        name: &str,
        value: &FieldValue,
        params: &Params,
    ) -> Result<FieldValue, TransformError> {
        let spec = self
            .get(name)
            .ok_or_else(|| TransformError::UnknownFunction(name.to_string()))?;
        (spec.func)(value, params)
    }

    /// Check the parameters given to the named function.
    pub fn check_params(&self, name: &str, params: &Params) -> Result<(), TransformError> {
        let spec = self
            .get(name)
            .ok_or_else(|| TransformError::UnknownFunction(name.to_string()))?;
        (spec.params)(params)
    }
}

/// Parameter check for functions that take none.
pub fn no_params(_: &Params) -> Result<(), TransformError> {
    Ok(())
}

/// Kind name used in error messages.
pub(crate) fn kind_of(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Null => "null",
        FieldValue::Bool(_) => "boolean",
        FieldValue::Number(_) => "number",
        FieldValue::Text(_) => "text",
        FieldValue::List(_) => "list",
    }
}

/// Text view of a scalar value. Numbers and booleans are stringified.
pub(crate) fn scalar_text(function: &'static str, value: &FieldValue) -> Result<String, TransformError> {
    match value {
        FieldValue::Text(text) => Ok(text.clone()),
        FieldValue::Number(_) | FieldValue::Bool(_) => Ok(value.to_string()),
        other => Err(TransformError::UnsupportedValue {
            function,
            kind: kind_of(other),
        }),
    }
}

/// Numeric view of a value, rejecting anything without one.
pub(crate) fn numeric(function: &'static str, value: &FieldValue) -> Result<f64, TransformError> {
    match value {
        FieldValue::Number(_) | FieldValue::Text(_) => {
            value.as_number().ok_or_else(|| TransformError::Unparseable {
                function,
                message: "value is not numeric".to_string(),
            })
        }
        other => Err(TransformError::UnsupportedValue {
            function,
            kind: kind_of(other),
        }),
    }
}

pub(crate) fn param_number(
    function: &'static str,
    params: &Params,
    param: &'static str,
) -> Result<Option<f64>, TransformError> {
    match params.get(param) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(value) => value
            .as_number()
            .map(Some)
            .ok_or_else(|| TransformError::InvalidParam {
                function,
                param,
                message: "expected a number".to_string(),
            }),
    }
}

pub(crate) fn required_number(
    function: &'static str,
    params: &Params,
    param: &'static str,
) -> Result<f64, TransformError> {
    param_number(function, params, param)?.ok_or(TransformError::MissingParam { function, param })
}

/// Non-negative integer parameter.
pub(crate) fn param_count(
    function: &'static str,
    params: &Params,
    param: &'static str,
) -> Result<Option<usize>, TransformError> {
    match param_number(function, params, param)? {
        None => Ok(None),
        Some(number) if number >= 0.0 && number.fract() == 0.0 && number <= u32::MAX as f64 => {
            Ok(Some(number as usize))
        }
        Some(_) => Err(TransformError::InvalidParam {
            function,
            param,
            message: "expected a non-negative integer".to_string(),
        }),
    }
}

pub(crate) fn param_text<'a>(
    function: &'static str,
    params: &'a Params,
    param: &'static str,
) -> Result<Option<&'a str>, TransformError> {
    match params.get(param) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Text(text)) => Ok(Some(text)),
        Some(_) => Err(TransformError::InvalidParam {
            function,
            param,
            message: "expected text".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_complete() {
        let registry = FunctionRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "cents_to_dollars",
                "digits_only",
                "divide",
                "dollars_to_cents",
                "format_date",
                "format_ssn",
                "lowercase",
                "multiply",
                "pad_start",
                "replace",
                "round",
                "substring",
                "to_boolean",
                "to_number",
                "to_string",
                "trim",
                "uppercase",
            ]
        );
        assert!(registry.specs().all(|spec| !spec.description.is_empty()));
    }

    #[test]
    fn unknown_function_is_an_error() {
        let registry = FunctionRegistry::builtin();
        assert_eq!(
            registry.apply("eval", &FieldValue::text("x"), &Params::new()),
            Err(TransformError::UnknownFunction("eval".to_string()))
        );
    }

    #[test]
    fn custom_functions_can_be_registered() {
        fn shout(value: &FieldValue, _: &Params) -> Result<FieldValue, TransformError> {
            Ok(FieldValue::text(format!("{value}!")))
        }
        let mut registry = FunctionRegistry::empty();
        registry.register(FunctionSpec {
            name: "shout",
            description: "append an exclamation mark",
            func: shout,
            params: no_params,
        });
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.apply("shout", &FieldValue::text("hi"), &Params::new()),
            Ok(FieldValue::text("hi!"))
        );
    }

    #[test]
    fn parameters_are_checked_without_a_value() {
        let registry = FunctionRegistry::builtin();
        let mut params = Params::new();
        params.insert("length".to_string(), FieldValue::Number(4e9));
        assert!(matches!(
            registry.check_params("pad_start", &params),
            Err(TransformError::InvalidParam { param: "length", .. })
        ));
        assert!(matches!(
            registry.check_params("pad_start", &Params::new()),
            Err(TransformError::MissingParam { param: "length", .. })
        ));
        assert!(registry.check_params("uppercase", &params).is_ok());
        assert!(matches!(
            registry.check_params("divide", &Params::new()),
            Err(TransformError::MissingParam { param: "divisor", .. })
        ));
        assert!(matches!(
            registry.check_params("eval", &Params::new()),
            Err(TransformError::UnknownFunction(_))
        ));
    }

    #[test]
    fn param_helpers_validate_types() {
        let mut params = Params::new();
        params.insert("places".to_string(), FieldValue::Number(-1.0));
        params.insert("to".to_string(), FieldValue::Number(3.0));
        assert!(matches!(
            param_count("round", &params, "places"),
            Err(TransformError::InvalidParam { .. })
        ));
        assert!(matches!(
            param_text("format_date", &params, "to"),
            Err(TransformError::InvalidParam { .. })
        ));
        assert_eq!(
            required_number("multiply", &params, "factor"),
            Err(TransformError::MissingParam {
                function: "multiply",
                param: "factor"
            })
        );
    }
}
