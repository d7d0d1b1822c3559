use thiserror::Error;

pub use crate::ast::Location;
use crate::core::types::Type;

/// Error type for type checking operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeCheckError {
    #[error("{location}: type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        location: Location,
    },

    #[error("{location}: unknown symbol {name}")]
    UnknownSymbol { name: String, location: Location },

    #[error("{location}: symbol {name} is not accessible here")]
    IllegalSymbol { name: String, location: Location },

    #[error("{location}: illegal group expression {operator}: {message}")]
    IllegalGroupExpression {
        operator: String,
        message: String,
        location: Location,
    },

    #[error("{location}: operator {operator} cannot be applied to {left_type} and {right_type}")]
    InvalidOperatorType {
        operator: String,
        left_type: Type,
        right_type: Type,
        location: Location,
    },

    #[error("{location}: function {function} expects {expected} arguments, found {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
        location: Location,
    },

    #[error("{location}: unknown field {field}")]
    UnknownField { field: String, location: Location },

    #[error("{location}: missing field {field} in record {record}")]
    MissingField {
        record: String,
        field: String,
        location: Location,
    },

    #[error("{location}: duplicated identifier {name}, first declared at {first}")]
    DuplicateIdentifier {
        name: String,
        first: Location,
        location: Location,
    },
}

impl TypeCheckError {
    pub fn type_mismatch(expected: Type, found: Type, location: Location) -> Self {
        Self::TypeMismatch {
            expected,
            found,
            location,
        }
    }

    pub fn unknown_symbol(name: &str, location: Location) -> Self {
        Self::UnknownSymbol {
            name: name.to_string(),
            location,
        }
    }

    pub fn illegal_symbol(name: &str, location: Location) -> Self {
        Self::IllegalSymbol {
            name: name.to_string(),
            location,
        }
    }

    pub fn illegal_group_expression(operator: impl ToString, message: &str, location: Location) -> Self {
        Self::IllegalGroupExpression {
            operator: operator.to_string(),
            message: message.to_string(),
            location,
        }
    }

    pub fn invalid_operator(
        operator: impl ToString,
        left_type: Type,
        right_type: Type,
        location: Location,
    ) -> Self {
        Self::InvalidOperatorType {
            operator: operator.to_string(),
            left_type,
            right_type,
            location,
        }
    }

    pub fn duplicate_identifier(name: &str, first: Location, location: Location) -> Self {
        Self::DuplicateIdentifier {
            name: name.to_string(),
            first,
            location,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Self::TypeMismatch { location, .. }
            | Self::UnknownSymbol { location, .. }
            | Self::IllegalSymbol { location, .. }
            | Self::IllegalGroupExpression { location, .. }
            | Self::InvalidOperatorType { location, .. }
            | Self::ArityMismatch { location, .. }
            | Self::UnknownField { location, .. }
            | Self::MissingField { location, .. }
            | Self::DuplicateIdentifier { location, .. } => *location,
        }
    }
}

/// Result type for type checking operations
pub type TypeCheckResult<T> = Result<T, TypeCheckError>;
