use std::fmt;
use std::sync::Arc;

use crate::core::value::Value;

use super::context::EvaluationContext;
use super::error::{EvalError, EvalResult};

type EvalFn = dyn Fn(&dyn EvaluationContext) -> Value + Send + Sync;

/// A compiled expression.
///
/// Evaluators are immutable once built and read nothing but the context they are given,
/// so one evaluator can be shared by any number of threads, each with its own context.
#[derive(Clone)]
pub struct Evaluator {
    function: Arc<EvalFn>,
}

impl Evaluator {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&dyn EvaluationContext) -> Value + Send + Sync + 'static,
    {
        Self {
            function: Arc::new(function),
        }
    }

    pub fn constant(value: Value) -> Self {
        Self::new(move |_| value.clone())
    }

    pub fn evaluate(&self, ctx: &dyn EvaluationContext) -> Value {
        (self.function)(ctx)
    }

    /// Evaluates a predicate; an `Error` or non-boolean result is reported, never read as
    /// `false`.
    pub fn evaluate_predicate(&self, ctx: &dyn EvaluationContext) -> EvalResult<bool> {
        match self.evaluate(ctx) {
            Value::Boolean(b) => Ok(b),
            Value::Error => Err(EvalError::ErrorValue),
            other => Err(EvalError::UnexpectedValue {
                expected: "boolean",
                found: other,
            }),
        }
    }

    /// Evaluates a measure; an `Error` or non-numeric result is reported, never read as `0`.
    pub fn evaluate_measure(&self, ctx: &dyn EvaluationContext) -> EvalResult<f64> {
        match self.evaluate(ctx) {
            Value::Error => Err(EvalError::ErrorValue),
            value => value.to_float().ok_or(EvalError::UnexpectedValue {
                expected: "numeric",
                found: value,
            }),
        }
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}
