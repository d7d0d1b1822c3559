//! Static type inference for model expressions.
//!
//! The checker walks an [`Expression`](crate::ast::Expression) under an immutable
//! [`TypeScope`] and returns its [`Type`](crate::core::types::Type). It never aborts: every
//! failure appends one [`TypeCheckError`] to an [`ErrorSink`] and degrades the node to
//! `Type::None`, which is absorbing, so one pass reports every independent error in a tree.
//!
//! # Scopes
//! A scope says which attributes a bare reference and `it.` may read, whether group
//! expressions are allowed, and which local names (`let` bindings, function parameters)
//! are in view. Scopes for each use site are built by
//! [`ElementAttributeTable::scope_for`](symbols::ElementAttributeTable::scope_for).
//!
//! ```
//! use agora::ast::Expression;
//! use agora::core::types::Type;
//! use agora::type_checker::{SymbolTable, TypeChecker, TypeContext, TypeScope};
//!
//! let symbols = SymbolTable::new();
//! let mut ctx = TypeContext::new();
//! let expr = Expression::binary(
//!     agora::ast::BinaryOperator::Add,
//!     Expression::integer(1),
//!     Expression::integer(2),
//! );
//! let ty = TypeChecker::new(&symbols).check(&expr, &TypeScope::constant(), &mut ctx);
//! assert_eq!(ty, Type::Integer);
//! assert!(!ctx.has_errors());
//! ```

pub mod checker;
mod error;
pub mod expression;
pub mod scope;
pub mod symbols;

#[cfg(test)]
mod tests;

pub use checker::TypeChecker;
pub use error::{Location, TypeCheckError, TypeCheckResult};
pub use scope::{TypeScope, Visibility};
pub use symbols::{
    ElementAttributeTable, ElementAttributes, FunctionSignature, ScopeKind, SymbolOracle,
    SymbolTable,
};

/// Append-only destination of type errors.
pub trait ErrorSink {
    fn record(&mut self, error: TypeCheckError);
}

impl ErrorSink for Vec<TypeCheckError> {
    fn record(&mut self, error: TypeCheckError) {
        self.push(error);
    }
}

/// Error collection for one checking pass.
#[derive(Debug, Clone, Default)]
pub struct TypeContext {
    errors: Vec<TypeCheckError>,
    max_errors: Option<usize>,
    dropped: usize,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `max_errors` errors; later ones are only counted.
    pub fn with_max_errors(max_errors: Option<usize>) -> Self {
        Self {
            max_errors,
            ..Self::default()
        }
    }

    /// Records `error`, or only counts it once the cap is reached.
    pub fn add_error(&mut self, error: TypeCheckError) {
        if self.max_errors.is_some_and(|max| self.errors.len() >= max) {
            tracing::trace!("Dropping type error over the cap: {}", error);
            self.dropped += 1;
            return;
        }
        self.errors.push(error);
    }

    /// Whether anything was reported, kept or dropped.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.dropped > 0
    }

    /// Number of errors seen, including the ones dropped over the cap.
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.dropped
    }

    pub fn errors(&self) -> &[TypeCheckError] {
        &self.errors
    }

    /// Hands the kept errors over and resets the pass.
    pub fn take_errors(&mut self) -> Vec<TypeCheckError> {
        self.dropped = 0;
        std::mem::take(&mut self.errors)
    }

    /// Forgets every error, kept and dropped.
    pub fn clear(&mut self) {
        self.errors.clear();
        self.dropped = 0;
    }
}

impl ErrorSink for TypeContext {
    fn record(&mut self, error: TypeCheckError) {
        self.add_error(error);
    }
}
