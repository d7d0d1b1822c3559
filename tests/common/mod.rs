#![allow(dead_code)]

use agora::ast::{
    BinaryOperator, ConstantDecl, ElementDecl, Expression, FunctionDecl, GroupDecl, Location,
    MathFunction, ParameterDecl, TypedName,
};
use agora::core::{Agent, SceneElement, SystemState, Type, Value};
use agora::{Model, ModelBuilder};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

pub fn wolf() -> ElementDecl {
    ElementDecl {
        name: "Wolf".to_string(),
        is_agent: true,
        environment: vec![TypedName::new("x", Type::Real), TypedName::new("y", Type::Real)],
        state: vec![TypedName::new("hunger", Type::Integer)],
        observations: vec![TypedName::new("prey_near", Type::Boolean)],
        location: Location::new(3, 1),
    }
}

pub fn sheep() -> ElementDecl {
    ElementDecl {
        name: "Sheep".to_string(),
        is_agent: true,
        environment: vec![TypedName::new("x", Type::Real), TypedName::new("y", Type::Real)],
        state: vec![TypedName::new("energy", Type::Real)],
        location: Location::new(4, 1),
        ..Default::default()
    }
}

pub fn grass() -> ElementDecl {
    ElementDecl {
        name: "Grass".to_string(),
        environment: vec![TypedName::new("x", Type::Real), TypedName::new("y", Type::Real)],
        location: Location::new(5, 1),
        ..Default::default()
    }
}

/// `gap(a, b) = abs(a - b)`
pub fn gap() -> FunctionDecl {
    FunctionDecl {
        name: "gap".to_string(),
        parameters: vec![
            TypedName::new("a", Type::Real),
            TypedName::new("b", Type::Real),
        ],
        return_type: Type::Real,
        body: Expression::math(
            MathFunction::Abs,
            Expression::binary(
                BinaryOperator::Subtract,
                Expression::reference("a"),
                Expression::reference("b"),
            ),
        ),
        location: Location::new(7, 1),
    }
}

pub fn predator_prey_builder() -> ModelBuilder {
    let mut builder = ModelBuilder::new();
    builder
        .declare_constant(&ConstantDecl {
            name: "radius".to_string(),
            value: Expression::real(5.0),
            location: Location::new(1, 1),
        })
        .declare_parameter(&ParameterDecl {
            name: "rate".to_string(),
            value: Expression::real(0.5),
            location: Location::new(2, 1),
        })
        .declare_element(&wolf())
        .declare_element(&sheep())
        .declare_element(&grass())
        .declare_group(&GroupDecl {
            name: "Animals".to_string(),
            members: vec!["Wolf".to_string(), "Sheep".to_string()],
            location: Location::new(6, 1),
        })
        .declare_function(&gap());
    builder
}

pub fn predator_prey() -> Model {
    predator_prey_builder()
        .build()
        .expect("predator-prey model should build")
}

/// A hungry wolf at the origin, two sheep on the x axis and a patch of grass.
pub fn population(model: &Model) -> SystemState {
    let kind = |name: &str| model.element(name).expect("declared element");
    let position = |x: f64, y: f64| {
        model
            .mapping([("x", Value::Real(x)), ("y", Value::Real(y))])
            .expect("declared attributes")
    };
    let wolf = Agent::new(0, kind("Wolf"))
        .with_state(model.mapping([("hunger", Value::Integer(3))]).unwrap())
        .with_environment(position(0.0, 0.0))
        .with_observations(model.mapping([("prey_near", Value::Boolean(true))]).unwrap());
    let near_sheep = Agent::new(1, kind("Sheep"))
        .with_state(model.mapping([("energy", Value::Real(2.0))]).unwrap())
        .with_environment(position(1.0, 0.0));
    let far_sheep = Agent::new(2, kind("Sheep"))
        .with_state(model.mapping([("energy", Value::Real(4.0))]).unwrap())
        .with_environment(position(10.0, 0.0));
    let grass = SceneElement::new(3, kind("Grass"), position(2.0, 0.0));
    SystemState::new(vec![wolf, near_sheep, far_sheep], vec![grass])
}
