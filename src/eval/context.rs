//! Evaluation contexts: the capabilities one evaluator invocation can use.
//!
//! Every operation defaults to [`Unsupported`]; a concrete context implements only the
//! operations that make sense where it is used. Contexts are built per call and never
//! mutated; a `let` is realized by wrapping the current context in a [`LetContext`].
//!
//! | Context | get | it | rnd | aggregates |
//! |---|---|---|---|---|
//! | [`AgentContext`] | state, then environment | self | yes | no |
//! | [`SensingContext`] | state, then environment | self | yes | every other element |
//! | [`SystemContext`] | no | no | no | every element, as its own subject |
//! | [`BehaviourContext`] | state, then observations | self | no | no |
//! | [`DynamicContext`] | state, then environment | self | yes | no |
//! | [`FunctionCallContext`] | no | no | no | no |
//! | [`LetContext`] | wrapped | wrapped | wrapped | wrapped |

use std::cell::RefCell;

use crate::ast::GroupOperator;
use crate::core::registry::{Group, Variable};
use crate::core::state::{Agent, ElementView, SystemState};
use crate::core::value::Value;

use super::error::{Capability, Operation, Unsupported};
use super::evaluator::Evaluator;
use super::random::RandomSource;

/// What an aggregate node asks its context to compute.
#[derive(Debug, Clone, Copy)]
pub struct GroupSelection<'e> {
    pub op: GroupOperator,
    /// Kinds taking part; `None` for the whole population.
    pub group: Option<&'e Group>,
    pub guard: Option<&'e Evaluator>,
    pub value: Option<&'e Evaluator>,
}

pub trait EvaluationContext {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn get(&self, _variable: &Variable) -> Capability {
        Err(Unsupported::new(Operation::Get, self.name()))
    }

    fn it(&self, _variable: &Variable) -> Capability {
        Err(Unsupported::new(Operation::It, self.name()))
    }

    /// Value of a `let` binding or function parameter slot.
    fn local(&self, _slot: usize) -> Capability {
        Err(Unsupported::new(Operation::Local, self.name()))
    }

    fn rnd(&self) -> Capability {
        Err(Unsupported::new(Operation::Random, self.name()))
    }

    fn rnd_between(&self, _min: f64, _max: f64) -> Capability {
        Err(Unsupported::new(Operation::Random, self.name()))
    }

    fn dt(&self) -> Capability {
        Err(Unsupported::new(Operation::Dt, self.name()))
    }

    /// Computes an aggregate. `caller` is the outermost context of the current invocation,
    /// the one guard and value lookups of locals go back to.
    fn aggregate(&self, _caller: &dyn EvaluationContext, _selection: &GroupSelection<'_>) -> Capability {
        Err(Unsupported::new(Operation::Aggregate, self.name()))
    }

    fn min(&self, group: Option<&Group>, guard: Option<&Evaluator>, value: &Evaluator) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::Min, group, guard, Some(value))
    }

    fn max(&self, group: Option<&Group>, guard: Option<&Evaluator>, value: &Evaluator) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::Max, group, guard, Some(value))
    }

    fn mean(&self, group: Option<&Group>, guard: Option<&Evaluator>, value: &Evaluator) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::Mean, group, guard, Some(value))
    }

    fn sum(&self, group: Option<&Group>, guard: Option<&Evaluator>, value: &Evaluator) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::Sum, group, guard, Some(value))
    }

    fn count(&self, group: Option<&Group>, guard: Option<&Evaluator>) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::Count, group, guard, None)
    }

    fn exists(&self, group: Option<&Group>, predicate: &Evaluator) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::Exists, group, None, Some(predicate))
    }

    fn for_all(&self, group: Option<&Group>, predicate: &Evaluator) -> Capability
    where
        Self: Sized,
    {
        self.aggregate_with(GroupOperator::ForAll, group, None, Some(predicate))
    }

    #[doc(hidden)]
    fn aggregate_with(
        &self,
        op: GroupOperator,
        group: Option<&Group>,
        guard: Option<&Evaluator>,
        value: Option<&Evaluator>,
    ) -> Capability
    where
        Self: Sized,
    {
        let selection = GroupSelection {
            op,
            group,
            guard,
            value,
        };
        self.aggregate(self, &selection)
    }
}

/// Aggregates `selection` over `population`.
///
/// Guards and values run in an [`ElementContext`] whose object is the iterated element
/// and whose subject is `subject`, or the element itself when `subject` is `None`.
pub fn aggregate_population<'p>(
    caller: &dyn EvaluationContext,
    subject: Option<&'p dyn ElementView>,
    population: impl Iterator<Item = &'p dyn ElementView>,
    selection: &GroupSelection<'_>,
) -> Value {
    let mut selected = 0i64;
    let mut total = 0.0;
    let mut extremum: Option<f64> = None;
    let mut any = false;
    let mut all = true;
    for element in population {
        if selection.group.is_some_and(|g| !g.contains(element.kind())) {
            continue;
        }
        let context = ElementContext::new(caller, subject.unwrap_or(element), element);
        if let Some(guard) = selection.guard {
            match guard.evaluate(&context).to_bool() {
                Some(true) => {}
                Some(false) => continue,
                None => return Value::Error,
            }
        }
        selected += 1;
        let Some(value) = selection.value else {
            continue;
        };
        let value = value.evaluate(&context);
        match selection.op {
            GroupOperator::Exists | GroupOperator::ForAll => match value.to_bool() {
                Some(v) => {
                    any |= v;
                    all &= v;
                }
                None => return Value::Error,
            },
            GroupOperator::Min | GroupOperator::Max | GroupOperator::Mean | GroupOperator::Sum => {
                let Some(v) = value.to_float() else {
                    return Value::Error;
                };
                total += v;
                extremum = Some(match (extremum, selection.op) {
                    (None, _) => v,
                    (Some(current), GroupOperator::Min) => current.min(v),
                    (Some(current), _) => current.max(v),
                });
            }
            GroupOperator::Count => {}
        }
    }
    match selection.op {
        GroupOperator::Count => Value::Integer(selected),
        GroupOperator::Sum => Value::Real(total),
        GroupOperator::Mean if selected > 0 => Value::Real(total / selected as f64),
        GroupOperator::Min | GroupOperator::Max => extremum.map(Value::Real).unwrap_or(Value::Error),
        GroupOperator::Mean => Value::Error,
        GroupOperator::Exists => Value::Boolean(any),
        GroupOperator::ForAll => Value::Boolean(all),
    }
}

fn lookup(found: Option<Value>) -> Capability {
    Ok(found.unwrap_or(Value::Error))
}

/// Context of an agent updating its own attributes.
pub struct AgentContext<'c> {
    agent: &'c Agent,
    random: RefCell<&'c mut dyn RandomSource>,
}

impl<'c> AgentContext<'c> {
    pub fn new(agent: &'c Agent, random: &'c mut dyn RandomSource) -> Self {
        Self {
            agent,
            random: RefCell::new(random),
        }
    }
}

impl EvaluationContext for AgentContext<'_> {
    fn name(&self) -> &'static str {
        "agent"
    }

    fn get(&self, variable: &Variable) -> Capability {
        lookup(self.agent.attribute(variable))
    }

    fn it(&self, variable: &Variable) -> Capability {
        lookup(self.agent.attribute(variable))
    }

    fn rnd(&self) -> Capability {
        Ok(Value::Real(self.random.borrow_mut().next_float()))
    }

    fn rnd_between(&self, min: f64, max: f64) -> Capability {
        Ok(Value::Real(min + self.random.borrow_mut().next_float() * (max - min)))
    }
}

/// Context of an agent computing its observations from the rest of the system.
pub struct SensingContext<'c> {
    system: &'c SystemState,
    agent: &'c Agent,
    random: RefCell<&'c mut dyn RandomSource>,
}

impl<'c> SensingContext<'c> {
    pub fn new(system: &'c SystemState, agent: &'c Agent, random: &'c mut dyn RandomSource) -> Self {
        Self {
            system,
            agent,
            random: RefCell::new(random),
        }
    }
}

impl EvaluationContext for SensingContext<'_> {
    fn name(&self) -> &'static str {
        "sensing"
    }

    fn get(&self, variable: &Variable) -> Capability {
        lookup(self.agent.attribute(variable))
    }

    fn it(&self, variable: &Variable) -> Capability {
        lookup(self.agent.attribute(variable))
    }

    fn rnd(&self) -> Capability {
        Ok(Value::Real(self.random.borrow_mut().next_float()))
    }

    fn rnd_between(&self, min: f64, max: f64) -> Capability {
        Ok(Value::Real(min + self.random.borrow_mut().next_float() * (max - min)))
    }

    fn aggregate(&self, caller: &dyn EvaluationContext, selection: &GroupSelection<'_>) -> Capability {
        let agent = self.agent;
        Ok(aggregate_population(
            caller,
            Some(agent as &dyn ElementView),
            self.system.others(agent),
            selection,
        ))
    }
}

/// Context of measures and predicates over a whole system state.
pub struct SystemContext<'c> {
    system: &'c SystemState,
}

impl<'c> SystemContext<'c> {
    pub fn new(system: &'c SystemState) -> Self {
        Self { system }
    }
}

impl EvaluationContext for SystemContext<'_> {
    fn name(&self) -> &'static str {
        "system"
    }

    fn aggregate(&self, caller: &dyn EvaluationContext, selection: &GroupSelection<'_>) -> Capability {
        Ok(aggregate_population(
            caller,
            None,
            self.system.population(),
            selection,
        ))
    }
}

/// Context of action selection: the agent reads its state and latest observations.
pub struct BehaviourContext<'c> {
    agent: &'c Agent,
}

impl<'c> BehaviourContext<'c> {
    pub fn new(agent: &'c Agent) -> Self {
        Self { agent }
    }

    fn read(&self, variable: &Variable) -> Capability {
        lookup(
            self.agent
                .state
                .get(variable)
                .or_else(|| self.agent.observations.get(variable))
                .cloned(),
        )
    }
}

impl EvaluationContext for BehaviourContext<'_> {
    fn name(&self) -> &'static str {
        "behaviour"
    }

    fn get(&self, variable: &Variable) -> Capability {
        self.read(variable)
    }

    fn it(&self, variable: &Variable) -> Capability {
        self.read(variable)
    }
}

/// Context of environment updates over one time step.
pub struct DynamicContext<'c> {
    agent: &'c Agent,
    dt: f64,
    random: RefCell<&'c mut dyn RandomSource>,
}

impl<'c> DynamicContext<'c> {
    pub fn new(agent: &'c Agent, dt: f64, random: &'c mut dyn RandomSource) -> Self {
        Self {
            agent,
            dt,
            random: RefCell::new(random),
        }
    }
}

impl EvaluationContext for DynamicContext<'_> {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn get(&self, variable: &Variable) -> Capability {
        lookup(self.agent.attribute(variable))
    }

    fn it(&self, variable: &Variable) -> Capability {
        lookup(self.agent.attribute(variable))
    }

    fn rnd(&self) -> Capability {
        Ok(Value::Real(self.random.borrow_mut().next_float()))
    }

    fn rnd_between(&self, min: f64, max: f64) -> Capability {
        Ok(Value::Real(min + self.random.borrow_mut().next_float() * (max - min)))
    }

    fn dt(&self) -> Capability {
        Ok(Value::Real(self.dt))
    }
}

/// Context of a function body: parameters are the first local slots.
pub struct FunctionCallContext {
    arguments: Vec<Value>,
}

impl FunctionCallContext {
    pub fn new(arguments: Vec<Value>) -> Self {
        Self { arguments }
    }
}

impl EvaluationContext for FunctionCallContext {
    fn name(&self) -> &'static str {
        "function"
    }

    fn local(&self, slot: usize) -> Capability {
        lookup(self.arguments.get(slot).cloned())
    }
}

/// Adds `let` bindings to a wrapped context; everything else is delegated.
pub struct LetContext<'c> {
    inner: &'c dyn EvaluationContext,
    bindings: Vec<(usize, Value)>,
}

impl<'c> LetContext<'c> {
    pub fn new(inner: &'c dyn EvaluationContext, bindings: Vec<(usize, Value)>) -> Self {
        Self { inner, bindings }
    }
}

impl EvaluationContext for LetContext<'_> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn get(&self, variable: &Variable) -> Capability {
        self.inner.get(variable)
    }

    fn it(&self, variable: &Variable) -> Capability {
        self.inner.it(variable)
    }

    fn local(&self, slot: usize) -> Capability {
        match self.bindings.iter().find(|(s, _)| *s == slot) {
            Some((_, value)) => Ok(value.clone()),
            None => self.inner.local(slot),
        }
    }

    fn rnd(&self) -> Capability {
        self.inner.rnd()
    }

    fn rnd_between(&self, min: f64, max: f64) -> Capability {
        self.inner.rnd_between(min, max)
    }

    fn dt(&self) -> Capability {
        self.inner.dt()
    }

    fn aggregate(&self, caller: &dyn EvaluationContext, selection: &GroupSelection<'_>) -> Capability {
        self.inner.aggregate(caller, selection)
    }
}

/// Context of the guard and value of an aggregate, for one element of the population.
///
/// Bare references read the iterated element (`object`), `it` reads the asking entity
/// (`subject`). Locals, randomness and `dt` come from the context the aggregate was
/// evaluated in. Aggregates do not nest.
pub struct ElementContext<'c> {
    caller: &'c dyn EvaluationContext,
    subject: &'c dyn ElementView,
    object: &'c dyn ElementView,
}

impl<'c> ElementContext<'c> {
    pub fn new(
        caller: &'c dyn EvaluationContext,
        subject: &'c dyn ElementView,
        object: &'c dyn ElementView,
    ) -> Self {
        Self {
            caller,
            subject,
            object,
        }
    }
}

impl EvaluationContext for ElementContext<'_> {
    fn name(&self) -> &'static str {
        "element"
    }

    fn get(&self, variable: &Variable) -> Capability {
        lookup(self.object.attribute(variable))
    }

    fn it(&self, variable: &Variable) -> Capability {
        lookup(self.subject.attribute(variable))
    }

    fn local(&self, slot: usize) -> Capability {
        self.caller.local(slot)
    }

    fn rnd(&self) -> Capability {
        self.caller.rnd()
    }

    fn rnd_between(&self, min: f64, max: f64) -> Capability {
        self.caller.rnd_between(min, max)
    }

    fn dt(&self) -> Capability {
        self.caller.dt()
    }
}
