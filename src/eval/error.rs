use strum::Display;
use thiserror::Error;

use crate::core::value::Value;

/// Failures resolving names while building an evaluator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Function {function} expects {expected} arguments, found {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("Malformed group expression {operator}: {message}")]
    MalformedGroupExpression { operator: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Get,
    It,
    Local,
    Random,
    Aggregate,
    Dt,
}

/// A context was asked for an operation it does not provide.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{operation} is not supported in {context} context")]
pub struct Unsupported {
    pub operation: Operation,
    pub context: &'static str,
}

impl Unsupported {
    pub fn new(operation: Operation, context: &'static str) -> Self {
        Self { operation, context }
    }
}

/// Outcome of a context operation.
pub type Capability = Result<Value, Unsupported>;

/// Failures surfaced when an evaluation result drives a decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Evaluation produced an error value")]
    ErrorValue,
    #[error("Expected a {expected} value, found {found}")]
    UnexpectedValue { expected: &'static str, found: Value },
}

pub type EvalResult<T> = Result<T, EvalError>;
