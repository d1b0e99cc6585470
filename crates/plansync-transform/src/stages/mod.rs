//! The five record stage processors, run in [`Stage::ORDER`].
//!
//! Each processor reads the immutable source record and updates the
//! destination record built so far. Only [`field`] can raise a record-fatal
//! [`StageError`](crate::error::StageError); every other fault degrades to a
//! `warn!` event and the stage moves on.

use std::fmt;

pub mod calculated;
pub mod conditional;
pub mod defaults;
pub mod field;
pub mod lookup;

pub use calculated::{CompiledCalculation, apply_calculated_fields};
pub use conditional::{CompiledConditional, apply_conditional_mappings};
pub use defaults::apply_default_values;
pub use field::apply_field_mappings;
pub use lookup::apply_lookup_mappings;

/// One of the ordered transformation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    FieldMapping,
    ConditionalMapping,
    CalculatedField,
    Lookup,
    DefaultValue,
}

impl Stage {
    /// Fixed execution order.
    pub const ORDER: [Stage; 5] = [
        Stage::FieldMapping,
        Stage::ConditionalMapping,
        Stage::CalculatedField,
        Stage::Lookup,
        Stage::DefaultValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldMapping => "field mapping",
            Self::ConditionalMapping => "conditional mapping",
            Self::CalculatedField => "calculated field",
            Self::Lookup => "lookup",
            Self::DefaultValue => "default value",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
