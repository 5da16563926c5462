//! Expression evaluation seam.
//!
//! The dispatcher only needs two questions answered about a user expression: "does the
//! condition hold?" and "what value does it produce?". [`BasicEvaluator`] is the in-tree
//! implementation; embedders can plug in their own engine.

mod basic;

pub use basic::BasicEvaluator;

use crate::context::EvaluationContext;
use crate::error::ExpressionError;
use crate::value::Value;

pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expr: &str, ctx: &EvaluationContext<'_>) -> Result<Value, ExpressionError>;

    /// Blank conditions always hold. A non-boolean result counts as `false`.
    fn is_condition_met(
        &self,
        expr: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, ExpressionError> {
        if expr.trim().is_empty() {
            return Ok(true);
        }
        Ok(self.evaluate(expr, ctx)?.as_bool().unwrap_or(false))
    }
}
