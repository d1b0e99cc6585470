//! Stage 3: destination fields computed from arithmetic formulas.

use plansync_model::{CalculatedField, DestinationRecord, FieldValue, SourceRecord};
use tracing::warn;

use crate::error::ExpressionError;
use crate::expression::Formula;

/// A calculated field with its formula parsed once per batch.
#[derive(Debug, Clone)]
pub struct CompiledCalculation<'a> {
    field: &'a CalculatedField,
    formula: Result<Formula, ExpressionError>,
}

impl<'a> CompiledCalculation<'a> {
    pub fn compile(index: usize, field: &'a CalculatedField) -> Self {
        let formula = Formula::parse(&field.formula);
        if let Err(error) = &formula {
            warn!(
                rule = index,
                field = %field.destination_field,
                %error,
                "unparseable formula, calculated field will never be set"
            );
        }
        Self { field, formula }
    }

    pub fn field(&self) -> &CalculatedField {
        self.field
    }

    pub fn formula(&self) -> Result<&Formula, &ExpressionError> {
        self.formula.as_ref()
    }

    /// Evaluate and round. References resolve against the source record;
    /// names the source does not carry at all fall back to the destination
    /// record. Missing or non-numeric values count as zero.
    pub fn evaluate(
        &self,
        source: &SourceRecord,
        destination: &DestinationRecord,
    ) -> Result<f64, ExpressionError> {
        let formula = self.formula.as_ref().map_err(Clone::clone)?;
        let resolve = |name: &str| {
            source
                .get(name)
                .or_else(|| destination.get(name))
                .and_then(FieldValue::as_number)
                .unwrap_or(0.0)
        };
        let raw = formula.evaluate(&resolve)?;
        Ok(self.field.rounding.apply(raw))
    }
}

/// Evaluate every calculated field, then write the results.
///
/// All formulas see the destination record as it was before this stage, so
/// calculated fields never depend on each other. A failing formula leaves its
/// field unset.
pub fn apply_calculated_fields(
    compiled: &[CompiledCalculation<'_>],
    source: &SourceRecord,
    destination: &mut DestinationRecord,
) {
    let mut results = Vec::with_capacity(compiled.len());
    for calculation in compiled {
        if calculation.formula.is_err() {
            continue;
        }
        match calculation.evaluate(source, destination) {
            Ok(value) => results.push((&calculation.field.destination_field, value)),
            Err(error) => warn!(
                field = %calculation.field.destination_field,
                %error,
                "formula failed, calculated field left unset"
            ),
        }
    }
    for (field, value) in results {
        destination.insert(field.clone(), FieldValue::Number(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansync_model::{Record, Rounding};

    fn calc(destination: &str, formula: &str, rounding: Rounding) -> CalculatedField {
        CalculatedField::new(destination, formula).with_rounding(rounding)
    }

    #[test]
    fn employer_match_in_cents() {
        let field = calc("employerMatch", "employeePreTax * 0.05", Rounding::Cents);
        let compiled = [CompiledCalculation::compile(0, &field)];
        let source = Record::new().with("grossPay", 500_000).with("deferralBps", 500);
        let mut destination = Record::new().with("employeePreTax", 500_000);
        apply_calculated_fields(&compiled, &source, &mut destination);
        assert_eq!(destination.value("employerMatch"), &FieldValue::Number(25_000.0));
    }

    #[test]
    fn source_values_take_precedence() {
        let field = calc("total", "amount + 1", Rounding::None);
        let compiled = [CompiledCalculation::compile(0, &field)];
        let source = Record::new().with("amount", "10");
        let mut destination = Record::new().with("amount", 99);
        apply_calculated_fields(&compiled, &source, &mut destination);
        assert_eq!(destination.value("total"), &FieldValue::Number(11.0));
    }

    #[test]
    fn missing_and_non_numeric_references_are_zero() {
        let field = calc("total", "a + b + 5", Rounding::None);
        let compiled = [CompiledCalculation::compile(0, &field)];
        let source = Record::new().with("a", "n/a");
        let mut destination = Record::new();
        apply_calculated_fields(&compiled, &source, &mut destination);
        assert_eq!(destination.value("total"), &FieldValue::Number(5.0));
    }

    #[test]
    fn rounding_policies_apply() {
        let fields = [
            calc("cents", "x / 3", Rounding::Cents),
            calc("dollars", "x / 3", Rounding::Dollars),
        ];
        let compiled: Vec<_> = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| CompiledCalculation::compile(idx, field))
            .collect();
        let source = Record::new().with("x", 10);
        let mut destination = Record::new();
        apply_calculated_fields(&compiled, &source, &mut destination);
        assert_eq!(destination.value("cents"), &FieldValue::Number(3.33));
        assert_eq!(destination.value("dollars"), &FieldValue::Number(3.0));
    }

    #[test]
    fn failures_leave_field_unset() {
        let fields = [
            calc("ratio", "a / b", Rounding::None),
            calc("evil", "process.exit(1)", Rounding::None),
            calc("ok", "2 * 3", Rounding::None),
        ];
        let compiled: Vec<_> = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| CompiledCalculation::compile(idx, field))
            .collect();
        assert!(compiled[1].formula().is_err());

        let mut destination = Record::new();
        apply_calculated_fields(&compiled, &Record::new().with("a", 1), &mut destination);
        assert!(!destination.contains("ratio"));
        assert!(!destination.contains("evil"));
        assert_eq!(destination.value("ok"), &FieldValue::Number(6.0));
    }

    #[test]
    fn calculated_fields_do_not_see_each_other() {
        let fields = [
            calc("first", "10", Rounding::None),
            calc("second", "first + 1", Rounding::None),
        ];
        let compiled: Vec<_> = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| CompiledCalculation::compile(idx, field))
            .collect();
        let mut destination = Record::new();
        apply_calculated_fields(&compiled, &Record::new(), &mut destination);
        assert_eq!(destination.value("second"), &FieldValue::Number(1.0));
    }
}
