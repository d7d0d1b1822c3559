//! Compiles expressions into [`Evaluator`] closures.
//!
//! Names are resolved once, here: a reference becomes a captured constant, a local slot
//! read or an attribute read, and a group name becomes a frozen [`Group`]. Evaluating the
//! result never walks the tree again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::ast::{
    Expression, ExpressionKind, FunctionDecl, GeometryFunction, LetBinding, Literal,
    UnaryOperator,
};
use crate::core::registry::{ElementNameRegistry, Group, VariableRegistry};
use crate::core::value::Value;

use super::context::{FunctionCallContext, GroupSelection, LetContext};
use super::error::{Capability, CompileError};
use super::evaluator::Evaluator;

pub type CompileResult<T> = Result<T, CompileError>;

/// A compiled function body; parameters occupy the first local slots.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub name: String,
    pub arity: usize,
    pub body: Evaluator,
}

/// Local names in view, mapped to their slots.
#[derive(Debug, Clone, Default)]
struct LocalFrame {
    slots: HashMap<String, usize>,
    next: usize,
}

impl LocalFrame {
    fn with_parameters<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::default().extend(names).0
    }

    /// Allocates fresh slots for `names`, returning the new frame and the slots in order.
    fn extend<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> (Self, Vec<usize>) {
        let mut frame = self.clone();
        let mut slots = Vec::new();
        for name in names {
            let slot = frame.next;
            frame.next += 1;
            frame.slots.insert(name.to_string(), slot);
            slots.push(slot);
        }
        (frame, slots)
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }
}

/// Turns a context operation into a value; unsupported operations evaluate to `Error`.
fn supported(result: Capability) -> Value {
    result.unwrap_or_else(|unsupported| {
        tracing::trace!("{}", unsupported);
        Value::Error
    })
}

pub struct ExpressionCompiler<'a> {
    variables: &'a VariableRegistry,
    elements: &'a ElementNameRegistry,
    constants: &'a HashMap<String, Value>,
    functions: &'a HashMap<String, CompiledFunction>,
}

impl<'a> ExpressionCompiler<'a> {
    pub fn new(
        variables: &'a VariableRegistry,
        elements: &'a ElementNameRegistry,
        constants: &'a HashMap<String, Value>,
        functions: &'a HashMap<String, CompiledFunction>,
    ) -> Self {
        Self {
            variables,
            elements,
            constants,
            functions,
        }
    }

    pub fn compile(&self, expr: &Expression) -> CompileResult<Evaluator> {
        self.compile_in(expr, &LocalFrame::default())
    }

    /// Compiles a function body against the functions compiled so far; a body cannot
    /// call its own function.
    pub fn compile_function(&self, decl: &FunctionDecl) -> CompileResult<CompiledFunction> {
        let frame = LocalFrame::with_parameters(decl.parameters.iter().map(|p| p.name.as_str()));
        let body = self.compile_in(&decl.body, &frame)?;
        tracing::debug!("Compiled function {}/{}", decl.name, decl.parameters.len());
        Ok(CompiledFunction {
            name: decl.name.clone(),
            arity: decl.parameters.len(),
            body,
        })
    }

    fn compile_in(&self, expr: &Expression, frame: &LocalFrame) -> CompileResult<Evaluator> {
        let evaluator = match &expr.kind {
            ExpressionKind::Literal(literal) => Evaluator::constant(match literal {
                Literal::Integer(v) => Value::Integer(*v),
                Literal::Real(v) => Value::Real(*v),
                Literal::Boolean(v) => Value::Boolean(*v),
            }),
            ExpressionKind::Reference(name) => self.compile_reference(name, frame)?,
            ExpressionKind::It(name) => {
                let variable = self
                    .variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CompileError::UnknownSymbol(name.clone()))?;
                Evaluator::new(move |ctx| supported(ctx.it(&variable)))
            }
            ExpressionKind::Unary { op, operand } => {
                let operand = self.compile_in(operand, frame)?;
                let op = *op;
                Evaluator::new(move |ctx| {
                    let value = operand.evaluate(ctx);
                    match op {
                        UnaryOperator::Plus => Value::plus(&value),
                        UnaryOperator::Minus => Value::minus(&value),
                        UnaryOperator::Not => Value::not(&value),
                    }
                })
            }
            ExpressionKind::Binary { op, left, right } => {
                let left = self.compile_in(left, frame)?;
                let right = self.compile_in(right, frame)?;
                let op = *op;
                Evaluator::new(move |ctx| {
                    Value::apply_binary(op, &left.evaluate(ctx), &right.evaluate(ctx))
                })
            }
            ExpressionKind::Relation { op, left, right } => {
                let left = self.compile_in(left, frame)?;
                let right = self.compile_in(right, frame)?;
                let op = *op;
                Evaluator::new(move |ctx| {
                    Value::compare(op, &left.evaluate(ctx), &right.evaluate(ctx))
                })
            }
            ExpressionKind::Conditional {
                guard,
                then_branch,
                else_branch,
            } => {
                let guard = self.compile_in(guard, frame)?;
                let then_branch = self.compile_in(then_branch, frame)?;
                let else_branch = self.compile_in(else_branch, frame)?;
                Evaluator::new(move |ctx| match guard.evaluate(ctx).to_bool() {
                    Some(true) => then_branch.evaluate(ctx),
                    Some(false) => else_branch.evaluate(ctx),
                    None => Value::Error,
                })
            }
            ExpressionKind::Group {
                op,
                group,
                guard,
                value,
            } => {
                if op.takes_value() != value.is_some() {
                    return Err(CompileError::MalformedGroupExpression {
                        operator: op.to_string(),
                        message: if op.takes_value() {
                            "a value expression is required".to_string()
                        } else {
                            "no value expression is expected".to_string()
                        },
                    });
                }
                let group: Option<Group> = match group {
                    Some(name) => Some(
                        self.elements
                            .resolve_group(name)
                            .ok_or_else(|| CompileError::UnknownGroup(name.clone()))?,
                    ),
                    None => None,
                };
                let guard = guard
                    .as_deref()
                    .map(|g| self.compile_in(g, frame))
                    .transpose()?;
                let value = value
                    .as_deref()
                    .map(|v| self.compile_in(v, frame))
                    .transpose()?;
                let op = *op;
                Evaluator::new(move |ctx| {
                    let selection = GroupSelection {
                        op,
                        group: group.as_ref(),
                        guard: guard.as_ref(),
                        value: value.as_ref(),
                    };
                    supported(ctx.aggregate(ctx, &selection))
                })
            }
            ExpressionKind::Random => Evaluator::new(|ctx| supported(ctx.rnd())),
            ExpressionKind::WeightedRandom { min, max } => {
                let min = self.compile_in(min, frame)?;
                let max = self.compile_in(max, frame)?;
                Evaluator::new(move |ctx| {
                    match (min.evaluate(ctx).to_float(), max.evaluate(ctx).to_float()) {
                        (Some(lo), Some(hi)) => supported(ctx.rnd_between(lo, hi)),
                        _ => Value::Error,
                    }
                })
            }
            ExpressionKind::Math { function, argument } => {
                let argument = self.compile_in(argument, frame)?;
                let function = *function;
                Evaluator::new(move |ctx| Value::apply_math(function, &argument.evaluate(ctx)))
            }
            ExpressionKind::Atan2 { y, x } => {
                let y = self.compile_in(y, frame)?;
                let x = self.compile_in(x, frame)?;
                Evaluator::new(move |ctx| Value::atan2(&y.evaluate(ctx), &x.evaluate(ctx)))
            }
            ExpressionKind::Geometry {
                function,
                arguments,
            } => {
                let [x1, y1, x2, y2] = &**arguments;
                let x1 = self.compile_in(x1, frame)?;
                let y1 = self.compile_in(y1, frame)?;
                let x2 = self.compile_in(x2, frame)?;
                let y2 = self.compile_in(y2, frame)?;
                let apply: fn(&Value, &Value, &Value, &Value) -> Value = match function {
                    GeometryFunction::Distance => Value::distance,
                    GeometryFunction::AngleOf => Value::angle_of,
                };
                Evaluator::new(move |ctx| {
                    apply(
                        &x1.evaluate(ctx),
                        &y1.evaluate(ctx),
                        &x2.evaluate(ctx),
                        &y2.evaluate(ctx),
                    )
                })
            }
            ExpressionKind::Pi => Evaluator::constant(Value::Real(std::f64::consts::PI)),
            ExpressionKind::Dt => Evaluator::new(|ctx| supported(ctx.dt())),
            ExpressionKind::Record(fields) => {
                let fields = fields
                    .iter()
                    .map(|f| self.compile_in(&f.value, frame).map(|e| (f.name.clone(), e)))
                    .collect::<CompileResult<Vec<_>>>()?;
                Evaluator::new(move |ctx| {
                    Value::Record(
                        fields
                            .iter()
                            .map(|(name, value)| (name.clone(), value.evaluate(ctx)))
                            .collect::<BTreeMap<_, _>>(),
                    )
                })
            }
            ExpressionKind::FieldAccess { record, field } => {
                let record = self.compile_in(record, frame)?;
                let field = field.clone();
                Evaluator::new(move |ctx| record.evaluate(ctx).field(&field))
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => self.compile_call(function, arguments, frame)?,
            ExpressionKind::Let { bindings, body } => self.compile_let(bindings, body, frame)?,
        };
        Ok(evaluator)
    }

    fn compile_reference(&self, name: &str, frame: &LocalFrame) -> CompileResult<Evaluator> {
        if let Some(slot) = frame.get(name) {
            return Ok(Evaluator::new(move |ctx| supported(ctx.local(slot))));
        }
        if let Some(value) = self.constants.get(name) {
            return Ok(Evaluator::constant(value.clone()));
        }
        let variable = self
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownSymbol(name.to_string()))?;
        Ok(Evaluator::new(move |ctx| supported(ctx.get(&variable))))
    }

    fn compile_call(
        &self,
        function: &str,
        arguments: &[Expression],
        frame: &LocalFrame,
    ) -> CompileResult<Evaluator> {
        let compiled = self
            .functions
            .get(function)
            .ok_or_else(|| CompileError::UnknownFunction(function.to_string()))?;
        if compiled.arity != arguments.len() {
            return Err(CompileError::ArityMismatch {
                function: function.to_string(),
                expected: compiled.arity,
                found: arguments.len(),
            });
        }
        let arguments: Arc<[Evaluator]> = arguments
            .iter()
            .map(|a| self.compile_in(a, frame))
            .collect::<CompileResult<Vec<_>>>()?
            .into();
        let body = compiled.body.clone();
        Ok(Evaluator::new(move |ctx| {
            let values = arguments.iter().map(|a| a.evaluate(ctx)).collect();
            body.evaluate(&FunctionCallContext::new(values))
        }))
    }

    fn compile_let(
        &self,
        bindings: &[LetBinding],
        body: &Expression,
        frame: &LocalFrame,
    ) -> CompileResult<Evaluator> {
        let values = bindings
            .iter()
            .map(|b| self.compile_in(&b.value, frame))
            .collect::<CompileResult<Vec<_>>>()?;
        let (inner, slots) = frame.extend(bindings.iter().map(|b| b.name.as_str()));
        let body = self.compile_in(body, &inner)?;
        let bound: Vec<(usize, Evaluator)> = slots.into_iter().zip(values).collect();
        Ok(Evaluator::new(move |ctx| {
            let values = bound
                .iter()
                .map(|(slot, value)| (*slot, value.evaluate(ctx)))
                .collect();
            let scoped = LetContext::new(ctx, values);
            body.evaluate(&scoped)
        }))
    }
}

/// Evaluates an expression that reads nothing from its context.
pub fn evaluate_constant(evaluator: &Evaluator) -> Value {
    evaluator.evaluate(&FunctionCallContext::new(Vec::new()))
}
