//! # agora
//!
//! Expression core of a modelling language for stochastic multi-agent systems.
//!
//! Agents carry their own state, environmental attributes and observations; scene
//! elements carry environmental attributes only. Expressions describe how agents sense
//! the system, pick actions and evolve, and which measures and predicates hold over the
//! whole population.
//!
//! ## Pipeline
//! 1. An external parser produces [`ast`] nodes and declarations.
//! 2. [`model::ModelBuilder`] registers declarations, type-checks them with
//!    [`type_checker`] and freezes the name registries of [`core`](crate::core).
//! 3. [`model::Model::checked_compile`] checks an expression at its use site and compiles
//!    it into an [`eval::Evaluator`].
//! 4. At simulation time the evaluator is invoked with an [`eval::EvaluationContext`]
//!    built for one agent or system state.
//!
//! Evaluation never fails: operations unsupported by a context, or applied to values of
//! the wrong tag, produce [`Value::Error`](crate::core::Value::Error), which poisons what depends on it.
//! Consumers that take decisions use [`eval::Evaluator::evaluate_predicate`] and
//! [`eval::Evaluator::evaluate_measure`], where such an error is explicit.

pub mod ast;
pub mod config;
pub mod core;
pub mod error;
pub mod eval;
pub mod model;
pub mod type_checker;

// Re-exports
pub use config::EngineConfig;
pub use error::*;
pub use model::{Model, ModelBuilder};
