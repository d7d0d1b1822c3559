//! Compile-once, evaluate-many interpretation of expressions.
//!
//! [`ExpressionCompiler`] turns an expression into an [`Evaluator`]; at simulation time a
//! concrete [`EvaluationContext`] is built for each agent and step and handed to it.

pub mod compiler;
pub mod context;
mod error;
pub mod evaluator;
pub mod random;

pub use compiler::{evaluate_constant, CompileResult, CompiledFunction, ExpressionCompiler};
pub use context::{
    AgentContext, BehaviourContext, DynamicContext, ElementContext, EvaluationContext,
    FunctionCallContext, GroupSelection, LetContext, SensingContext, SystemContext,
};
pub use error::{Capability, CompileError, EvalError, EvalResult, Operation, Unsupported};
pub use evaluator::Evaluator;
pub use random::RandomSource;
