//! Operator-based validation of destination records.
//!
//! [`RuleEngine::for_tenant`] selects the active global and tenant rules for
//! a mapping type, compiles them once, and evaluates every rule against every
//! record without short-circuiting.

mod engine;
mod message;
mod operator;

pub use engine::{CompiledRule, RuleEngine};
