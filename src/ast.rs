//! Abstract syntax of the modelling language.
//!
//! The tree is produced by an external parser; everything downstream (checker,
//! compiler, model builder) dispatches exhaustively over [`ExpressionKind`].

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::types::Type;

/// Source position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Literal),
    /// Free identifier: constant, parameter, attribute or local binding.
    Reference(String),
    /// `it.name`
    It(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Relation {
        op: RelationOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        guard: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    /// Aggregates and quantifiers over a population.
    ///
    /// `min`, `max`, `mean`, `sum`, `exists` and `forall` take a `value`; `count` does
    /// not. `guard` filters the elements taking part.
    Group {
        op: GroupOperator,
        group: Option<String>,
        guard: Option<Box<Expression>>,
        value: Option<Box<Expression>>,
    },
    /// `rnd`
    Random,
    /// `rnd[min, max]`
    WeightedRandom {
        min: Box<Expression>,
        max: Box<Expression>,
    },
    Math {
        function: MathFunction,
        argument: Box<Expression>,
    },
    Atan2 {
        y: Box<Expression>,
        x: Box<Expression>,
    },
    /// `distance(x1, y1, x2, y2)` and `angleOf(x1, y1, x2, y2)`
    Geometry {
        function: GeometryFunction,
        arguments: Box<[Expression; 4]>,
    },
    Pi,
    Dt,
    Record(Vec<FieldAssignment>),
    FieldAccess {
        record: Box<Expression>,
        field: String,
    },
    Call {
        function: String,
        arguments: Vec<Expression>,
    },
    Let {
        bindings: Vec<LetBinding>,
        body: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Minus => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Protected division: a zero divisor yields zero.
    ZeroDivide,
    Modulo,
    Power,
    And,
    Or,
    Implies,
}

impl BinaryOperator {
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Implies
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::ZeroDivide => write!(f, "//"),
            BinaryOperator::Modulo => write!(f, "%"),
            BinaryOperator::Power => write!(f, "^"),
            BinaryOperator::And => write!(f, "&&"),
            BinaryOperator::Or => write!(f, "||"),
            BinaryOperator::Implies => write!(f, "->"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl RelationOperator {
    pub fn test<T: PartialOrd>(&self, left: &T, right: &T) -> bool {
        match self {
            RelationOperator::Equal => left == right,
            RelationOperator::NotEqual => left != right,
            RelationOperator::LessThan => left < right,
            RelationOperator::LessThanEqual => left <= right,
            RelationOperator::GreaterThan => left > right,
            RelationOperator::GreaterThanEqual => left >= right,
        }
    }
}

impl fmt::Display for RelationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationOperator::Equal => write!(f, "=="),
            RelationOperator::NotEqual => write!(f, "!="),
            RelationOperator::LessThan => write!(f, "<"),
            RelationOperator::LessThanEqual => write!(f, "<="),
            RelationOperator::GreaterThan => write!(f, ">"),
            RelationOperator::GreaterThanEqual => write!(f, ">="),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum GroupOperator {
    Min,
    Max,
    Mean,
    Sum,
    Count,
    Exists,
    ForAll,
}

impl GroupOperator {
    pub fn takes_value(&self) -> bool {
        !matches!(self, GroupOperator::Count)
    }

    pub fn is_quantifier(&self) -> bool {
        matches!(self, GroupOperator::Exists | GroupOperator::ForAll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MathFunction {
    Abs,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Exp,
    Log,
    Log10,
    Floor,
    Ceil,
}

impl MathFunction {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            MathFunction::Abs => x.abs(),
            MathFunction::Sin => x.sin(),
            MathFunction::Cos => x.cos(),
            MathFunction::Tan => x.tan(),
            MathFunction::Asin => x.asin(),
            MathFunction::Acos => x.acos(),
            MathFunction::Atan => x.atan(),
            MathFunction::Sinh => x.sinh(),
            MathFunction::Cosh => x.cosh(),
            MathFunction::Tanh => x.tanh(),
            MathFunction::Sqrt => x.sqrt(),
            MathFunction::Exp => x.exp(),
            MathFunction::Log => x.ln(),
            MathFunction::Log10 => x.log10(),
            MathFunction::Floor => x.floor(),
            MathFunction::Ceil => x.ceil(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum GeometryFunction {
    #[strum(serialize = "distance")]
    Distance,
    #[strum(serialize = "angleOf")]
    AngleOf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    pub name: String,
    pub value: Expression,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub name: String,
    pub value: Expression,
    pub location: Location,
}

// Constructors used by parsers and tests.
impl Expression {
    pub fn new(kind: ExpressionKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub fn at(self, line: usize, column: usize) -> Self {
        Self {
            location: Location::new(line, column),
            ..self
        }
    }

    fn of(kind: ExpressionKind) -> Self {
        Self::new(kind, Location::default())
    }

    pub fn integer(value: i64) -> Self {
        Self::of(ExpressionKind::Literal(Literal::Integer(value)))
    }

    pub fn real(value: f64) -> Self {
        Self::of(ExpressionKind::Literal(Literal::Real(value)))
    }

    pub fn boolean(value: bool) -> Self {
        Self::of(ExpressionKind::Literal(Literal::Boolean(value)))
    }

    pub fn reference(name: &str) -> Self {
        Self::of(ExpressionKind::Reference(name.to_string()))
    }

    pub fn it(name: &str) -> Self {
        Self::of(ExpressionKind::It(name.to_string()))
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Self::of(ExpressionKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::of(ExpressionKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn relation(op: RelationOperator, left: Expression, right: Expression) -> Self {
        Self::of(ExpressionKind::Relation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn conditional(guard: Expression, then_branch: Expression, else_branch: Expression) -> Self {
        Self::of(ExpressionKind::Conditional {
            guard: Box::new(guard),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn group(
        op: GroupOperator,
        group: Option<&str>,
        guard: Option<Expression>,
        value: Option<Expression>,
    ) -> Self {
        Self::of(ExpressionKind::Group {
            op,
            group: group.map(str::to_string),
            guard: guard.map(Box::new),
            value: value.map(Box::new),
        })
    }

    pub fn random() -> Self {
        Self::of(ExpressionKind::Random)
    }

    pub fn weighted_random(min: Expression, max: Expression) -> Self {
        Self::of(ExpressionKind::WeightedRandom {
            min: Box::new(min),
            max: Box::new(max),
        })
    }

    pub fn math(function: MathFunction, argument: Expression) -> Self {
        Self::of(ExpressionKind::Math {
            function,
            argument: Box::new(argument),
        })
    }

    pub fn atan2(y: Expression, x: Expression) -> Self {
        Self::of(ExpressionKind::Atan2 {
            y: Box::new(y),
            x: Box::new(x),
        })
    }

    pub fn geometry(function: GeometryFunction, arguments: [Expression; 4]) -> Self {
        Self::of(ExpressionKind::Geometry {
            function,
            arguments: Box::new(arguments),
        })
    }

    pub fn pi() -> Self {
        Self::of(ExpressionKind::Pi)
    }

    pub fn dt() -> Self {
        Self::of(ExpressionKind::Dt)
    }

    pub fn record(fields: Vec<(&str, Expression)>) -> Self {
        Self::of(ExpressionKind::Record(
            fields
                .into_iter()
                .map(|(name, value)| FieldAssignment {
                    name: name.to_string(),
                    location: value.location,
                    value,
                })
                .collect(),
        ))
    }

    pub fn field(record: Expression, field: &str) -> Self {
        Self::of(ExpressionKind::FieldAccess {
            record: Box::new(record),
            field: field.to_string(),
        })
    }

    pub fn call(function: &str, arguments: Vec<Expression>) -> Self {
        Self::of(ExpressionKind::Call {
            function: function.to_string(),
            arguments,
        })
    }

    pub fn let_in(bindings: Vec<(&str, Expression)>, body: Expression) -> Self {
        Self::of(ExpressionKind::Let {
            bindings: bindings
                .into_iter()
                .map(|(name, value)| LetBinding {
                    name: name.to_string(),
                    location: value.location,
                    value,
                })
                .collect(),
            body: Box::new(body),
        })
    }
}

/// A named, typed declaration with a source position.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedName {
    pub name: String,
    pub ty: Type,
    pub location: Location,
}

impl TypedName {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            location: Location::default(),
        }
    }

    pub fn at(self, line: usize, column: usize) -> Self {
        Self {
            location: Location::new(line, column),
            ..self
        }
    }
}

/// `const name = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDecl {
    pub name: String,
    pub value: Expression,
    pub location: Location,
}

/// `param name = default;` Parameters are real valued and may be overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDecl {
    pub name: String,
    pub value: Expression,
    pub location: Location,
}

/// `type name = [field: T; ...];`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<TypedName>,
    pub location: Location,
}

/// `fun name(p: T, ...): R = body;`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub parameters: Vec<TypedName>,
    pub return_type: Type,
    pub body: Expression,
    pub location: Location,
}

/// An element kind. Agents carry state and observations, scene elements only environmental
/// attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementDecl {
    pub name: String,
    pub is_agent: bool,
    pub environment: Vec<TypedName>,
    pub state: Vec<TypedName>,
    pub observations: Vec<TypedName>,
    pub location: Location,
}

/// `group name = { kind, ... };`
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDecl {
    pub name: String,
    pub members: Vec<String>,
    pub location: Location,
}
