mod expression_tests;

use super::*;
use crate::ast::{ElementDecl, Expression, TypedName};
use crate::core::types::Type;

/// Wolves and sheep with positions, plus a `Pos` record type and a few constants.
pub(super) fn predator_prey() -> SymbolTable {
    let mut symbols = SymbolTable::new();
    symbols.add_constant("speed", Type::Real);
    symbols.add_constant("limit", Type::Integer);
    assert!(symbols
        .add_record(
            "Pos",
            &[TypedName::new("px", Type::Real), TypedName::new("py", Type::Real)]
        )
        .is_empty());
    let table = symbols.elements_mut();
    let wolf = ElementDecl {
        name: "Wolf".to_string(),
        is_agent: true,
        environment: vec![TypedName::new("x", Type::Real), TypedName::new("y", Type::Real)],
        state: vec![TypedName::new("hunger", Type::Integer)],
        observations: vec![TypedName::new("prey_near", Type::Boolean)],
        ..Default::default()
    };
    let sheep = ElementDecl {
        name: "Sheep".to_string(),
        is_agent: true,
        environment: vec![TypedName::new("x", Type::Real), TypedName::new("y", Type::Real)],
        state: vec![TypedName::new("energy", Type::Real)],
        ..Default::default()
    };
    assert!(table.add_element(&wolf).is_empty());
    assert!(table.add_element(&sheep).is_empty());
    table
        .add_group(
            "Animals",
            &["Wolf".to_string(), "Sheep".to_string()],
            Location::default(),
        )
        .unwrap();
    symbols.add_function(FunctionSignature {
        name: "clamp".to_string(),
        parameters: vec![
            TypedName::new("v", Type::Real),
            TypedName::new("hi", Type::Real),
        ],
        return_type: Type::Real,
    });
    symbols
}

/// Checks `expr`, returning its type and the errors recorded.
pub(super) fn check(
    symbols: &SymbolTable,
    expr: &Expression,
    scope: &TypeScope,
) -> (Type, Vec<TypeCheckError>) {
    let mut ctx = TypeContext::new();
    let ty = TypeChecker::new(symbols).check(expr, scope, &mut ctx);
    (ty, ctx.take_errors())
}
