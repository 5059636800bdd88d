//! OCO policy engine module
//!
//! Converts market and account context into a validated
//! (take-profit, stop-loss) price pair by evaluating the configured
//! formulas in a restricted expression sandbox.

mod engine;
mod expr;
mod types;

pub use engine::{PolicyEngine, SCOPE_VARS};
pub use expr::{Expr, ExprError};
pub use types::{BracketPrices, OcoInputs, PolicyError, Side};
