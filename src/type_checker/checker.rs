use std::collections::{BTreeSet, HashMap};

use crate::ast::{Expression, ExpressionKind, FieldAssignment, LetBinding, Literal, Location};
use crate::core::types::Type;

use super::expression::{
    binary_type, group_result_type, group_value_type, math_type, relation_type, unary_type,
};
use super::scope::TypeScope;
use super::symbols::SymbolOracle;
use super::{ErrorSink, TypeCheckError};

/// Infers expression types against a [`SymbolOracle`].
pub struct TypeChecker<'a> {
    symbols: &'a dyn SymbolOracle,
}

impl<'a> TypeChecker<'a> {
    pub fn new(symbols: &'a dyn SymbolOracle) -> Self {
        Self { symbols }
    }

    /// Type of `expr` in `scope`. Errors go to `sink`; the failing node types as `None`.
    pub fn check(&self, expr: &Expression, scope: &TypeScope, sink: &mut dyn ErrorSink) -> Type {
        let location = expr.location;
        match &expr.kind {
            ExpressionKind::Literal(literal) => match literal {
                Literal::Integer(_) => Type::Integer,
                Literal::Real(_) => Type::Real,
                Literal::Boolean(_) => Type::Boolean,
            },
            ExpressionKind::Reference(name) => self.check_reference(name, location, scope, sink),
            ExpressionKind::It(name) => self.check_it(name, location, scope, sink),
            ExpressionKind::Unary { op, operand } => {
                let operand = self.check(operand, scope, sink);
                unary_type(*op, &operand).unwrap_or_else(|| {
                    let expected = match op {
                        crate::ast::UnaryOperator::Not => Type::Boolean,
                        _ => Type::Real,
                    };
                    sink.record(TypeCheckError::type_mismatch(expected, operand, location));
                    Type::None
                })
            }
            ExpressionKind::Binary { op, left, right } => {
                let left = self.check(left, scope, sink);
                let right = self.check(right, scope, sink);
                binary_type(*op, &left, &right).unwrap_or_else(|| {
                    sink.record(TypeCheckError::invalid_operator(op, left, right, location));
                    Type::None
                })
            }
            ExpressionKind::Relation { op, left, right } => {
                let left = self.check(left, scope, sink);
                let right = self.check(right, scope, sink);
                relation_type(&left, &right).unwrap_or_else(|| {
                    sink.record(TypeCheckError::invalid_operator(op, left, right, location));
                    Type::None
                })
            }
            ExpressionKind::Conditional {
                guard,
                then_branch,
                else_branch,
            } => {
                let guard_ok = self.expect(guard, &Type::Boolean, scope, sink);
                let then_type = self.check(then_branch, scope, sink);
                let else_type = self.check(else_branch, scope, sink);
                match Type::merge(&then_type, &else_type) {
                    Some(ty) if guard_ok => ty,
                    Some(_) => Type::None,
                    None => {
                        sink.record(TypeCheckError::type_mismatch(
                            then_type,
                            else_type,
                            else_branch.location,
                        ));
                        Type::None
                    }
                }
            }
            ExpressionKind::Group {
                op,
                group,
                guard,
                value,
            } => {
                if !scope.group_expressions_allowed() {
                    sink.record(TypeCheckError::illegal_group_expression(
                        op,
                        "group expressions are not allowed in this scope",
                        location,
                    ));
                    return Type::None;
                }
                let Some(visibility) = self.symbols.group_attributes(group.as_deref()) else {
                    let name = group.as_deref().unwrap_or_default();
                    sink.record(TypeCheckError::unknown_symbol(name, location));
                    return Type::None;
                };
                let inner = scope.enter_group(visibility);
                let mut ok = true;
                if let Some(guard) = guard {
                    ok &= self.expect(guard, &Type::Boolean, &inner, sink);
                }
                match (op.takes_value(), value) {
                    (true, Some(value)) => {
                        ok &= self.expect(value, &group_value_type(*op), &inner, sink);
                    }
                    (true, None) => {
                        sink.record(TypeCheckError::illegal_group_expression(
                            op,
                            "a value expression is required",
                            location,
                        ));
                        ok = false;
                    }
                    (false, Some(value)) => {
                        sink.record(TypeCheckError::illegal_group_expression(
                            op,
                            "no value expression is expected",
                            value.location,
                        ));
                        ok = false;
                    }
                    (false, None) => {}
                }
                if ok {
                    group_result_type(*op)
                } else {
                    Type::None
                }
            }
            ExpressionKind::Random | ExpressionKind::Pi | ExpressionKind::Dt => Type::Real,
            ExpressionKind::WeightedRandom { min, max } => {
                self.expect_all_numeric([min.as_ref(), max.as_ref()], scope, sink)
            }
            ExpressionKind::Math { function, argument } => {
                let argument_type = self.check(argument, scope, sink);
                math_type(*function, &argument_type).unwrap_or_else(|| {
                    sink.record(TypeCheckError::type_mismatch(
                        Type::Real,
                        argument_type,
                        argument.location,
                    ));
                    Type::None
                })
            }
            ExpressionKind::Atan2 { y, x } => {
                self.expect_all_numeric([y.as_ref(), x.as_ref()], scope, sink)
            }
            ExpressionKind::Geometry { arguments, .. } => {
                self.expect_all_numeric(arguments.iter(), scope, sink)
            }
            ExpressionKind::Record(fields) => self.check_record(fields, location, scope, sink),
            ExpressionKind::FieldAccess { record, field } => {
                match self.check(record, scope, sink) {
                    Type::None => Type::None,
                    Type::Record(fields) => fields.get(field).cloned().unwrap_or_else(|| {
                        sink.record(TypeCheckError::UnknownField {
                            field: field.clone(),
                            location,
                        });
                        Type::None
                    }),
                    other => {
                        sink.record(TypeCheckError::type_mismatch(
                            Type::record([(field.as_str(), Type::None)]),
                            other,
                            record.location,
                        ));
                        Type::None
                    }
                }
            }
            ExpressionKind::Call {
                function,
                arguments,
            } => self.check_call(function, arguments, location, scope, sink),
            ExpressionKind::Let { bindings, body } => self.check_let(bindings, body, scope, sink),
        }
    }

    /// Checks `expr` against `expected`, reporting a mismatch. Returns whether it matched.
    fn expect(
        &self,
        expr: &Expression,
        expected: &Type,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> bool {
        let found = self.check(expr, scope, sink);
        if found.is_subtype_of(expected) {
            true
        } else {
            sink.record(TypeCheckError::type_mismatch(
                expected.clone(),
                found,
                expr.location,
            ));
            false
        }
    }

    fn expect_all_numeric<'e>(
        &self,
        exprs: impl IntoIterator<Item = &'e Expression>,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> Type {
        let mut ok = true;
        for expr in exprs {
            ok &= self.expect(expr, &Type::Real, scope, sink);
        }
        if ok {
            Type::Real
        } else {
            Type::None
        }
    }

    fn check_reference(
        &self,
        name: &str,
        location: Location,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> Type {
        if let Some(ty) = scope.local(name) {
            return ty.clone();
        }
        if let Some(ty) = self.symbols.constant(name) {
            return ty;
        }
        match self.symbols.attribute(name) {
            Some(ty) if scope.can_access(name) => ty,
            Some(_) => {
                sink.record(TypeCheckError::illegal_symbol(name, location));
                Type::None
            }
            None => {
                sink.record(TypeCheckError::unknown_symbol(name, location));
                Type::None
            }
        }
    }

    fn check_it(
        &self,
        name: &str,
        location: Location,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> Type {
        match self.symbols.attribute(name) {
            Some(ty) if scope.can_access_it(name) => ty,
            Some(_) => {
                sink.record(TypeCheckError::illegal_symbol(&format!("it.{}", name), location));
                Type::None
            }
            None => {
                sink.record(TypeCheckError::unknown_symbol(name, location));
                Type::None
            }
        }
    }

    fn check_record(
        &self,
        fields: &[FieldAssignment],
        location: Location,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> Type {
        let Some(first) = fields.first() else {
            sink.record(TypeCheckError::UnknownField {
                field: String::new(),
                location,
            });
            return Type::None;
        };
        let Some((record_name, record_type)) = self.symbols.record_of_field(&first.name) else {
            sink.record(TypeCheckError::UnknownField {
                field: first.name.clone(),
                location: first.location,
            });
            for field in fields {
                self.check(&field.value, scope, sink);
            }
            return Type::None;
        };
        let mut ok = true;
        let mut assigned: HashMap<&str, Location> = HashMap::new();
        for field in fields {
            if let Some(previous) = assigned.get(field.name.as_str()) {
                sink.record(TypeCheckError::duplicate_identifier(
                    &field.name,
                    *previous,
                    field.location,
                ));
                ok = false;
                continue;
            }
            assigned.insert(field.name.as_str(), field.location);
            match record_type.field(&field.name) {
                Some(declared) => ok &= self.expect(&field.value, declared, scope, sink),
                None => {
                    self.check(&field.value, scope, sink);
                    sink.record(TypeCheckError::UnknownField {
                        field: field.name.clone(),
                        location: field.location,
                    });
                    ok = false;
                }
            }
        }
        if let Type::Record(declared) = record_type {
            let assigned: BTreeSet<&str> = assigned.keys().copied().collect();
            for missing in declared.keys().filter(|f| !assigned.contains(f.as_str())) {
                sink.record(TypeCheckError::MissingField {
                    record: record_name.to_string(),
                    field: missing.clone(),
                    location,
                });
                ok = false;
            }
        }
        if ok {
            record_type.clone()
        } else {
            Type::None
        }
    }

    fn check_call(
        &self,
        function: &str,
        arguments: &[Expression],
        location: Location,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> Type {
        let Some(signature) = self.symbols.function(function) else {
            sink.record(TypeCheckError::unknown_symbol(function, location));
            for argument in arguments {
                self.check(argument, scope, sink);
            }
            return Type::None;
        };
        if signature.parameters.len() != arguments.len() {
            sink.record(TypeCheckError::ArityMismatch {
                function: function.to_string(),
                expected: signature.parameters.len(),
                found: arguments.len(),
                location,
            });
            return Type::None;
        }
        let mut ok = true;
        for (argument, parameter) in arguments.iter().zip(&signature.parameters) {
            ok &= self.expect(argument, &parameter.ty, scope, sink);
        }
        if ok {
            signature.return_type.clone()
        } else {
            Type::None
        }
    }

    fn check_let(
        &self,
        bindings: &[LetBinding],
        body: &Expression,
        scope: &TypeScope,
        sink: &mut dyn ErrorSink,
    ) -> Type {
        let mut locals: Vec<(&str, Type)> = Vec::with_capacity(bindings.len());
        let mut seen: HashMap<&str, Location> = HashMap::new();
        for binding in bindings {
            let ty = self.check(&binding.value, scope, sink);
            if let Some(first) = seen.get(binding.name.as_str()) {
                sink.record(TypeCheckError::duplicate_identifier(
                    &binding.name,
                    *first,
                    binding.location,
                ));
                continue;
            }
            seen.insert(binding.name.as_str(), binding.location);
            locals.push((binding.name.as_str(), ty));
        }
        self.check(body, &scope.with_locals(locals), sink)
    }
}
