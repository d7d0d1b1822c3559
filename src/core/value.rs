use std::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOperator, MathFunction, RelationOperator};

/// Runtime values produced by compiled evaluators.
///
/// `Error` poisons every operation it takes part in, so a single failed
/// sub-expression only degrades the values that depend on it.
#[derive(Clone, Debug, PartialEq, Default, Deserialize, Serialize)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Record(BTreeMap<String, Value>),
    #[default]
    Error,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Record(fields) => {
                write!(f, "[")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                write!(f, "]")
            }
            Value::Error => write!(f, "error"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    /// Numeric view of the value; `NaN` for non-numeric tags.
    pub fn as_float(&self) -> f64 {
        self.to_float().unwrap_or(f64::NAN)
    }

    /// Integer view of the value; reals truncate toward zero, non-numeric tags give `0`.
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Integer(v) => *v,
            Value::Real(v) => *v as i64,
            _ => 0,
        }
    }

    /// Boolean view of the value; `false` for non-boolean tags.
    ///
    /// Only use this where an `Error` has already been ruled out. Decisions taken on
    /// the result of an evaluation go through [`Value::to_bool`].
    pub fn as_bool(&self) -> bool {
        self.to_bool().unwrap_or(false)
    }

    pub fn to_float(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Value {
        match self {
            Value::Record(fields) => fields.get(name).cloned().unwrap_or(Value::Error),
            _ => Value::Error,
        }
    }

    pub fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> Value {
        match op {
            BinaryOperator::Add => Self::add(left, right),
            BinaryOperator::Subtract => Self::subtract(left, right),
            BinaryOperator::Multiply => Self::multiply(left, right),
            BinaryOperator::Divide => Self::divide(left, right),
            BinaryOperator::ZeroDivide => Self::zero_divide(left, right),
            BinaryOperator::Modulo => Self::modulo(left, right),
            BinaryOperator::Power => Self::power(left, right),
            BinaryOperator::And => Self::and(left, right),
            BinaryOperator::Or => Self::or(left, right),
            BinaryOperator::Implies => Self::implies(left, right),
        }
    }

    fn numeric(
        left: &Value,
        right: &Value,
        int_op: impl FnOnce(i64, i64) -> Option<i64>,
        real_op: impl FnOnce(f64, f64) -> f64,
    ) -> Value {
        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => {
                int_op(*a, *b).map(Value::Integer).unwrap_or(Value::Error)
            }
            (a, b) => match (a.to_float(), b.to_float()) {
                (Some(x), Some(y)) => Value::Real(real_op(x, y)),
                _ => Value::Error,
            },
        }
    }

    pub fn add(left: &Value, right: &Value) -> Value {
        Self::numeric(left, right, i64::checked_add, |a, b| a + b)
    }

    pub fn subtract(left: &Value, right: &Value) -> Value {
        Self::numeric(left, right, i64::checked_sub, |a, b| a - b)
    }

    pub fn multiply(left: &Value, right: &Value) -> Value {
        Self::numeric(left, right, i64::checked_mul, |a, b| a * b)
    }

    fn is_zero(value: &Value) -> bool {
        match value {
            Value::Integer(v) => *v == 0,
            Value::Real(v) => *v == 0.0,
            _ => false,
        }
    }

    /// `a / b`; a zero divisor yields `Error` for every numeric tag.
    pub fn divide(left: &Value, right: &Value) -> Value {
        if Self::is_zero(right) {
            return Value::Error;
        }
        Self::numeric(left, right, i64::checked_div, |a, b| a / b)
    }

    /// `a // b`; a zero divisor yields the zero of the promoted result type.
    pub fn zero_divide(left: &Value, right: &Value) -> Value {
        if Self::is_zero(right) {
            return Self::numeric(left, right, |_, _| Some(0), |_, _| 0.0);
        }
        Self::divide(left, right)
    }

    /// `a % b`; a zero divisor yields `Error` for every numeric tag.
    pub fn modulo(left: &Value, right: &Value) -> Value {
        if Self::is_zero(right) {
            return Value::Error;
        }
        Self::numeric(left, right, i64::checked_rem, |a, b| a % b)
    }

    /// Power always produces a real.
    pub fn power(left: &Value, right: &Value) -> Value {
        match (left.to_float(), right.to_float()) {
            (Some(a), Some(b)) => Value::Real(a.powf(b)),
            _ => Value::Error,
        }
    }

    fn logical(left: &Value, right: &Value, op: impl FnOnce(bool, bool) -> bool) -> Value {
        match (left, right) {
            (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(op(*a, *b)),
            _ => Value::Error,
        }
    }

    pub fn and(left: &Value, right: &Value) -> Value {
        Self::logical(left, right, |a, b| a && b)
    }

    pub fn or(left: &Value, right: &Value) -> Value {
        Self::logical(left, right, |a, b| a || b)
    }

    pub fn implies(left: &Value, right: &Value) -> Value {
        Self::logical(left, right, |a, b| !a || b)
    }

    pub fn not(value: &Value) -> Value {
        match value {
            Value::Boolean(v) => Value::Boolean(!v),
            _ => Value::Error,
        }
    }

    pub fn minus(value: &Value) -> Value {
        match value {
            Value::Integer(v) => v.checked_neg().map(Value::Integer).unwrap_or(Value::Error),
            Value::Real(v) => Value::Real(-v),
            _ => Value::Error,
        }
    }

    pub fn plus(value: &Value) -> Value {
        match value {
            Value::Integer(_) | Value::Real(_) => value.clone(),
            _ => Value::Error,
        }
    }

    pub fn abs(value: &Value) -> Value {
        match value {
            Value::Integer(v) => v.checked_abs().map(Value::Integer).unwrap_or(Value::Error),
            Value::Real(v) => Value::Real(v.abs()),
            _ => Value::Error,
        }
    }

    pub fn compare(op: RelationOperator, left: &Value, right: &Value) -> Value {
        let outcome = match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => op.test(a, b),
            (a, b) => match (a.to_float(), b.to_float()) {
                (Some(x), Some(y)) => op.test(&x, &y),
                _ => return Value::Error,
            },
        };
        Value::Boolean(outcome)
    }

    pub fn apply_math(function: MathFunction, value: &Value) -> Value {
        if function == MathFunction::Abs {
            return Self::abs(value);
        }
        match value.to_float() {
            Some(x) => Value::Real(function.apply(x)),
            None => Value::Error,
        }
    }

    pub fn atan2(y: &Value, x: &Value) -> Value {
        match (y.to_float(), x.to_float()) {
            (Some(y), Some(x)) => Value::Real(y.atan2(x)),
            _ => Value::Error,
        }
    }

    pub fn distance(x1: &Value, y1: &Value, x2: &Value, y2: &Value) -> Value {
        match (x1.to_float(), y1.to_float(), x2.to_float(), y2.to_float()) {
            (Some(x1), Some(y1), Some(x2), Some(y2)) => Value::Real((x2 - x1).hypot(y2 - y1)),
            _ => Value::Error,
        }
    }

    pub fn angle_of(x1: &Value, y1: &Value, x2: &Value, y2: &Value) -> Value {
        match (x1.to_float(), y1.to_float(), x2.to_float(), y2.to_float()) {
            (Some(x1), Some(y1), Some(x2), Some(y2)) => Value::Real((y2 - y1).atan2(x2 - x1)),
            _ => Value::Error,
        }
    }

    /// Smaller operand. Like arithmetic, a `Real` operand makes the result `Real`.
    pub fn min(left: &Value, right: &Value) -> Value {
        Self::extremum(left, right, i64::min, f64::min)
    }

    pub fn max(left: &Value, right: &Value) -> Value {
        Self::extremum(left, right, i64::max, f64::max)
    }

    fn extremum(
        left: &Value,
        right: &Value,
        integer: fn(i64, i64) -> i64,
        real: fn(f64, f64) -> f64,
    ) -> Value {
        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(integer(*a, *b)),
            (a, b) => match (a.to_float(), b.to_float()) {
                (Some(x), Some(y)) => Value::Real(real(x, y)),
                _ => Value::Error,
            },
        }
    }
}
