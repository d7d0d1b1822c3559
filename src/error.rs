use thiserror::Error;

use crate::core::registry::RegistryError;
use crate::eval::{CompileError, EvalError};
use crate::type_checker::TypeCheckError;

#[derive(Error, Debug)]
pub enum Error {
    // type checking
    #[error("Type check error: {0}")]
    TypeCheck(#[from] TypeCheckError),
    #[error("Invalid model: {} type errors, first: {}", .0.len(), first_error(.0))]
    InvalidModel(Vec<TypeCheckError>),
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn first_error(errors: &[TypeCheckError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }

    /// Type errors carried by this error, if any.
    pub fn type_errors(&self) -> &[TypeCheckError] {
        match self {
            Error::TypeCheck(error) => std::slice::from_ref(error),
            Error::InvalidModel(errors) => errors,
            _ => &[],
        }
    }
}
