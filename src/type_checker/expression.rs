//! Typing rules of operators, independent of scopes and error reporting.

use crate::ast::{BinaryOperator, GroupOperator, MathFunction, UnaryOperator};
use crate::core::types::Type;

pub fn unary_type(op: UnaryOperator, operand: &Type) -> Option<Type> {
    match op {
        UnaryOperator::Plus | UnaryOperator::Minus if operand.is_numeric() => Some(operand.clone()),
        UnaryOperator::Not if operand.is_boolean() => Some(Type::Boolean),
        _ => None,
    }
}

pub fn binary_type(op: BinaryOperator, left: &Type, right: &Type) -> Option<Type> {
    match op {
        BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Implies => {
            (left.is_boolean() && right.is_boolean()).then_some(Type::Boolean)
        }
        BinaryOperator::Power => (left.is_numeric() && right.is_numeric()).then_some(Type::Real),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::ZeroDivide
        | BinaryOperator::Modulo => {
            if left.is_numeric() && right.is_numeric() {
                Type::merge(left, right)
            } else {
                None
            }
        }
    }
}

pub fn relation_type(left: &Type, right: &Type) -> Option<Type> {
    (left.is_numeric() && right.is_numeric()).then_some(Type::Boolean)
}

/// Type a group expression's value must have.
pub fn group_value_type(op: GroupOperator) -> Type {
    if op.is_quantifier() {
        Type::Boolean
    } else {
        Type::Real
    }
}

pub fn group_result_type(op: GroupOperator) -> Type {
    match op {
        GroupOperator::Count => Type::Integer,
        GroupOperator::Exists | GroupOperator::ForAll => Type::Boolean,
        GroupOperator::Min | GroupOperator::Max | GroupOperator::Mean | GroupOperator::Sum => {
            Type::Real
        }
    }
}

pub fn math_type(function: MathFunction, argument: &Type) -> Option<Type> {
    if !argument.is_numeric() {
        return None;
    }
    match function {
        MathFunction::Abs => Some(argument.clone()),
        _ => Some(Type::Real),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_promotion() {
        assert_eq!(
            binary_type(BinaryOperator::Add, &Type::Integer, &Type::Integer),
            Some(Type::Integer)
        );
        assert_eq!(
            binary_type(BinaryOperator::Divide, &Type::Integer, &Type::Real),
            Some(Type::Real)
        );
        assert_eq!(
            binary_type(BinaryOperator::Power, &Type::Integer, &Type::Integer),
            Some(Type::Real)
        );
        assert_eq!(
            binary_type(BinaryOperator::Add, &Type::Boolean, &Type::Integer),
            None
        );
    }

    #[test]
    fn test_none_does_not_cascade() {
        assert_eq!(
            binary_type(BinaryOperator::Add, &Type::None, &Type::Real),
            Some(Type::None)
        );
        assert_eq!(
            binary_type(BinaryOperator::And, &Type::None, &Type::Boolean),
            Some(Type::Boolean)
        );
        assert_eq!(unary_type(UnaryOperator::Not, &Type::None), Some(Type::Boolean));
        assert_eq!(relation_type(&Type::None, &Type::Integer), Some(Type::Boolean));
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(math_type(MathFunction::Abs, &Type::Integer), Some(Type::Integer));
        assert_eq!(math_type(MathFunction::Sqrt, &Type::Integer), Some(Type::Real));
        assert_eq!(math_type(MathFunction::Sin, &Type::Boolean), None);
    }
}
