use super::*;
use crate::ast::{
    BinaryOperator, GeometryFunction, GroupOperator, MathFunction, RelationOperator, UnaryOperator,
};
use pretty_assertions::assert_eq;

fn wolf_scope(symbols: &SymbolTable) -> TypeScope {
    symbols.scope_for(ScopeKind::Dynamics, Some("Wolf"))
}

#[test]
fn test_literal_arithmetic() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::Add,
        Expression::integer(1),
        Expression::integer(2),
    );
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::Integer);
    assert!(errors.is_empty());

    let expr = Expression::binary(
        BinaryOperator::Multiply,
        Expression::integer(2),
        Expression::real(0.5),
    );
    assert_eq!(check(&symbols, &expr, &TypeScope::constant()).0, Type::Real);
}

#[test]
fn test_power_is_always_real() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::Power,
        Expression::integer(2),
        Expression::integer(3),
    );
    assert_eq!(check(&symbols, &expr, &TypeScope::constant()).0, Type::Real);
}

#[test]
fn test_conditional_widens_branches() {
    let symbols = predator_prey();
    let expr = Expression::conditional(
        Expression::relation(
            RelationOperator::GreaterThan,
            Expression::reference("hunger"),
            Expression::integer(0),
        ),
        Expression::real(1.0),
        Expression::unary(UnaryOperator::Minus, Expression::real(1.0)),
    );
    let (ty, errors) = check(&symbols, &expr, &wolf_scope(&symbols));
    assert_eq!(ty, Type::Real);
    assert!(errors.is_empty());

    let mixed = Expression::conditional(
        Expression::boolean(true),
        Expression::integer(1),
        Expression::real(2.0),
    );
    assert_eq!(check(&symbols, &mixed, &TypeScope::constant()).0, Type::Real);
}

#[test]
fn test_undeclared_name_reports_once() {
    let symbols = predator_prey();
    let expr = Expression::conditional(
        Expression::relation(
            RelationOperator::GreaterThan,
            Expression::reference("z").at(1, 1),
            Expression::integer(0),
        ),
        Expression::real(1.0),
        Expression::unary(UnaryOperator::Minus, Expression::real(1.0)),
    );
    let (ty, errors) = check(&symbols, &expr, &wolf_scope(&symbols));
    assert_eq!(ty, Type::Real);
    assert_eq!(
        errors,
        vec![TypeCheckError::unknown_symbol("z", Location::new(1, 1))]
    );
}

#[test]
fn test_failed_operand_is_not_reported_again() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::And,
        Expression::binary(
            BinaryOperator::Add,
            Expression::reference("ghost").at(1, 2),
            Expression::integer(1),
        ),
        Expression::boolean(true),
    );
    let (_, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(
        errors,
        vec![TypeCheckError::unknown_symbol("ghost", Location::new(1, 2))]
    );

    let widened = Expression::conditional(
        Expression::boolean(true),
        Expression::reference("ghost").at(2, 8),
        Expression::boolean(false),
    );
    let (ty, errors) = check(&symbols, &widened, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_conditional_branches_must_agree() {
    let symbols = predator_prey();
    let expr = Expression::conditional(
        Expression::boolean(true),
        Expression::integer(1),
        Expression::boolean(false).at(2, 9),
    );
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert_eq!(
        errors,
        vec![TypeCheckError::type_mismatch(
            Type::Integer,
            Type::Boolean,
            Location::new(2, 9)
        )]
    );
}

#[test]
fn test_invalid_operator_operands() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::Add,
        Expression::boolean(true),
        Expression::real(1.0),
    )
    .at(3, 7);
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "3:7: operator + cannot be applied to bool and real"
    );
}

#[test]
fn test_independent_errors_are_all_reported() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::Add,
        Expression::reference("a"),
        Expression::binary(
            BinaryOperator::And,
            Expression::integer(1),
            Expression::reference("b"),
        ),
    );
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    // a, b and the ill-typed conjunction; the outer sum sees `None` and stays quiet.
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_relations_are_numeric() {
    let symbols = predator_prey();
    let expr = Expression::relation(
        RelationOperator::Equal,
        Expression::boolean(true),
        Expression::boolean(true),
    );
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert!(matches!(errors[0], TypeCheckError::InvalidOperatorType { .. }));
}

#[test]
fn test_math_and_geometry() {
    let symbols = predator_prey();
    let scope = wolf_scope(&symbols);
    let abs = Expression::math(MathFunction::Abs, Expression::reference("hunger"));
    assert_eq!(check(&symbols, &abs, &scope).0, Type::Integer);

    let sqrt = Expression::math(MathFunction::Sqrt, Expression::integer(4));
    assert_eq!(check(&symbols, &sqrt, &scope).0, Type::Real);

    let distance = Expression::geometry(
        GeometryFunction::Distance,
        [
            Expression::reference("x"),
            Expression::reference("y"),
            Expression::integer(0),
            Expression::pi(),
        ],
    );
    let (ty, errors) = check(&symbols, &distance, &scope);
    assert_eq!(ty, Type::Real);
    assert!(errors.is_empty());

    let bad = Expression::atan2(Expression::boolean(true), Expression::real(1.0));
    assert_eq!(check(&symbols, &bad, &scope).0, Type::None);
}

#[test]
fn test_random_expressions_are_real() {
    let symbols = predator_prey();
    assert_eq!(
        check(&symbols, &Expression::random(), &TypeScope::constant()).0,
        Type::Real
    );
    let weighted = Expression::weighted_random(Expression::integer(1), Expression::integer(3));
    assert_eq!(check(&symbols, &weighted, &TypeScope::constant()).0, Type::Real);
}

#[test]
fn test_group_result_types() {
    let symbols = predator_prey();
    let scope = symbols.scope_for(ScopeKind::Sensing, Some("Wolf"));
    let near = Expression::relation(
        RelationOperator::LessThan,
        Expression::reference("x"),
        Expression::it("x"),
    );
    let count = Expression::group(GroupOperator::Count, Some("Sheep"), Some(near.clone()), None);
    assert_eq!(check(&symbols, &count, &scope).0, Type::Integer);

    let mean = Expression::group(
        GroupOperator::Mean,
        Some("Sheep"),
        None,
        Some(Expression::reference("energy")),
    );
    assert_eq!(check(&symbols, &mean, &scope).0, Type::Real);

    let exists = Expression::group(GroupOperator::Exists, Some("Animals"), None, Some(near));
    let (ty, errors) = check(&symbols, &exists, &scope);
    assert_eq!(ty, Type::Boolean);
    assert!(errors.is_empty());
}

#[test]
fn test_group_value_presence() {
    let symbols = predator_prey();
    let scope = symbols.scope_for(ScopeKind::Sensing, Some("Wolf"));
    let missing = Expression::group(GroupOperator::Sum, None, None, None);
    let (ty, errors) = check(&symbols, &missing, &scope);
    assert_eq!(ty, Type::None);
    assert!(matches!(errors[0], TypeCheckError::IllegalGroupExpression { .. }));

    let extra = Expression::group(
        GroupOperator::Count,
        None,
        None,
        Some(Expression::integer(1)),
    );
    let (_, errors) = check(&symbols, &extra, &scope);
    assert!(matches!(errors[0], TypeCheckError::IllegalGroupExpression { .. }));
}

#[test]
fn test_group_guard_must_be_boolean() {
    let symbols = predator_prey();
    let scope = symbols.scope_for(ScopeKind::Sensing, Some("Wolf"));
    let expr = Expression::group(
        GroupOperator::Count,
        Some("Sheep"),
        Some(Expression::reference("energy").at(4, 4)),
        None,
    );
    let (ty, errors) = check(&symbols, &expr, &scope);
    assert_eq!(ty, Type::None);
    assert_eq!(
        errors,
        vec![TypeCheckError::type_mismatch(
            Type::Boolean,
            Type::Real,
            Location::new(4, 4)
        )]
    );
}

#[test]
fn test_unknown_group() {
    let symbols = predator_prey();
    let scope = symbols.scope_for(ScopeKind::Sensing, Some("Wolf"));
    let expr = Expression::group(GroupOperator::Count, Some("Plants"), None, None);
    let (_, errors) = check(&symbols, &expr, &scope);
    assert!(matches!(&errors[0], TypeCheckError::UnknownSymbol { name, .. } if name == "Plants"));
}

#[test]
fn test_record_construction_and_access() {
    let symbols = predator_prey();
    let pos = Expression::record(vec![
        ("px", Expression::integer(1)),
        ("py", Expression::real(2.0)),
    ]);
    let (ty, errors) = check(&symbols, &pos, &TypeScope::constant());
    assert!(errors.is_empty());
    assert_eq!(ty, Type::record([("px", Type::Real), ("py", Type::Real)]));

    let access = Expression::field(pos, "py");
    assert_eq!(check(&symbols, &access, &TypeScope::constant()).0, Type::Real);
}

#[test]
fn test_record_missing_and_unknown_fields() {
    let symbols = predator_prey();
    let partial = Expression::record(vec![("px", Expression::integer(1))]);
    let (ty, errors) = check(&symbols, &partial, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert!(matches!(
        &errors[..],
        [TypeCheckError::MissingField { record, field, .. }] if record == "Pos" && field == "py"
    ));

    let unknown = Expression::record(vec![("speed_x", Expression::integer(1))]);
    let (ty, errors) = check(&symbols, &unknown, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert!(matches!(&errors[0], TypeCheckError::UnknownField { field, .. } if field == "speed_x"));

    let access = Expression::field(Expression::integer(3), "px");
    let (ty, errors) = check(&symbols, &access, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert!(matches!(errors[0], TypeCheckError::TypeMismatch { .. }));
}

#[test]
fn test_function_calls() {
    let symbols = predator_prey();
    let call = Expression::call("clamp", vec![Expression::integer(7), Expression::real(5.0)]);
    let (ty, errors) = check(&symbols, &call, &TypeScope::constant());
    assert_eq!(ty, Type::Real);
    assert!(errors.is_empty());

    let short = Expression::call("clamp", vec![Expression::integer(7)]);
    let (ty, errors) = check(&symbols, &short, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert!(matches!(
        errors[0],
        TypeCheckError::ArityMismatch {
            expected: 2,
            found: 1,
            ..
        }
    ));

    let unknown = Expression::call("wander", vec![]);
    let (_, errors) = check(&symbols, &unknown, &TypeScope::constant());
    assert!(matches!(&errors[0], TypeCheckError::UnknownSymbol { name, .. } if name == "wander"));
}

#[test]
fn test_let_bindings() {
    let symbols = predator_prey();
    let expr = Expression::let_in(
        vec![("a", Expression::integer(2)), ("b", Expression::real(0.5))],
        Expression::binary(
            BinaryOperator::Multiply,
            Expression::reference("a"),
            Expression::reference("b"),
        ),
    );
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::Real);
    assert!(errors.is_empty());
}

#[test]
fn test_let_bindings_are_simultaneous() {
    let symbols = predator_prey();
    let expr = Expression::let_in(
        vec![
            ("a", Expression::integer(2)),
            ("b", Expression::reference("a").at(1, 20)),
        ],
        Expression::reference("b"),
    );
    let (_, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(
        errors,
        vec![TypeCheckError::unknown_symbol("a", Location::new(1, 20))]
    );
}

#[test]
fn test_let_does_not_leak_into_siblings() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::Add,
        Expression::let_in(vec![("a", Expression::integer(1))], Expression::reference("a")),
        Expression::reference("a").at(2, 3),
    );
    let (ty, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(ty, Type::None);
    assert_eq!(
        errors,
        vec![TypeCheckError::unknown_symbol("a", Location::new(2, 3))]
    );
}

#[test]
fn test_let_duplicate_binding() {
    let symbols = predator_prey();
    let expr = Expression::let_in(
        vec![
            ("a", Expression::integer(1).at(1, 5)),
            ("a", Expression::integer(2).at(1, 12)),
        ],
        Expression::reference("a"),
    );
    let (_, errors) = check(&symbols, &expr, &TypeScope::constant());
    assert_eq!(
        errors,
        vec![TypeCheckError::duplicate_identifier(
            "a",
            Location::new(1, 5),
            Location::new(1, 12)
        )]
    );
}

#[test]
fn test_constants_are_visible_everywhere() {
    let symbols = predator_prey();
    let expr = Expression::binary(
        BinaryOperator::Multiply,
        Expression::reference("speed"),
        Expression::reference("limit"),
    );
    for scope in [
        TypeScope::constant(),
        symbols.scope_for(ScopeKind::System, None),
        symbols.scope_for(ScopeKind::Behaviour, Some("Sheep")),
    ] {
        let (ty, errors) = check(&symbols, &expr, &scope);
        assert_eq!(ty, Type::Real);
        assert!(errors.is_empty());
    }
}
