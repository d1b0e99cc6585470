//! Record transformation for plansync.
//!
//! This crate turns a source record into a destination record by running the
//! five mapping stages in a fixed order:
//!
//! 1. **field mappings**, with optional catalog transformations
//! 2. **conditional mappings**, guarded by typed conditions over the source
//! 3. **calculated fields**, evaluated by a restricted arithmetic parser
//! 4. **lookups** through inline tables
//! 5. **default values**
//!
//! Tenant-authored formulas and conditions are parsed by hand-written
//! tokenizers into closed data types. Nothing in configuration can reach a
//! general-purpose interpreter.

pub mod condition;
pub mod error;
pub mod expression;
pub mod functions;
pub mod pipeline;
pub mod stages;
pub mod validate;

pub use condition::{ComparisonOp, Condition};
pub use error::{
    ConditionError, ConfigError, ConfigIssue, ExpressionError, StageError, TransformError,
};
pub use expression::{Expr, Formula, evaluate_arithmetic};
pub use functions::{FunctionRegistry, FunctionSpec, ParamCheck, TransformFn, no_params};
pub use pipeline::RecordPipeline;
pub use stages::Stage;
pub use validate::{RulesValidator, validate_rules};
