mod common;

use std::sync::Arc;
use std::thread;

use agora::ast::{Expression, GroupOperator, RelationOperator};
use agora::core::Value;
use agora::eval::{SensingContext, SystemContext};
use agora::type_checker::ScopeKind;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_evaluator_shared_across_threads() {
    let model = common::predator_prey();
    let system = common::population(&model);
    let expr = Expression::group(
        GroupOperator::Sum,
        Some("Sheep"),
        None,
        Some(Expression::reference("energy")),
    );
    let evaluator = model
        .checked_compile(&expr, ScopeKind::System, None)
        .unwrap();

    let results: Vec<Value> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| evaluator.evaluate(&SystemContext::new(&system))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results, vec![Value::Real(6.0); 4]);
}

#[test]
fn test_each_thread_owns_its_random_source() {
    let model = Arc::new(common::predator_prey());
    let system = Arc::new(common::population(&model));
    let expr = Expression::group(
        GroupOperator::Count,
        None,
        Some(Expression::relation(
            RelationOperator::LessThan,
            Expression::random(),
            Expression::real(2.0),
        )),
        None,
    );
    let evaluator = model
        .checked_compile(&expr, ScopeKind::Sensing, Some("Wolf"))
        .unwrap();

    let handles: Vec<_> = (0..4u64)
        .map(|seed| {
            let system = Arc::clone(&system);
            let evaluator = evaluator.clone();
            thread::spawn(move || {
                let wolf = system.agent(0).unwrap();
                let mut rng = StdRng::seed_from_u64(seed);
                let ctx = SensingContext::new(&system, wolf, &mut rng);
                evaluator.evaluate(&ctx)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Value::Integer(3));
    }
}
