//! Read-only view of a simulation step, as seen by the evaluation contexts.

use super::registry::{ElementName, Variable, VariableMapping};
use super::value::Value;

/// One member of the population: an agent or a passive scene element.
pub trait ElementView {
    fn id(&self) -> usize;

    fn kind(&self) -> ElementName;

    /// Externally observable attribute value.
    fn attribute(&self, variable: &Variable) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: usize,
    pub kind: ElementName,
    /// Agent attributes (knowledge).
    pub state: VariableMapping,
    /// Environmental attributes, updated by the environment dynamics.
    pub environment: VariableMapping,
    /// Latest observations, read by the behaviour.
    pub observations: VariableMapping,
}

impl Agent {
    pub fn new(id: usize, kind: ElementName) -> Self {
        Self {
            id,
            kind,
            state: VariableMapping::default(),
            environment: VariableMapping::default(),
            observations: VariableMapping::default(),
        }
    }

    pub fn with_state(self, state: VariableMapping) -> Self {
        Self { state, ..self }
    }

    pub fn with_environment(self, environment: VariableMapping) -> Self {
        Self {
            environment,
            ..self
        }
    }

    pub fn with_observations(self, observations: VariableMapping) -> Self {
        Self {
            observations,
            ..self
        }
    }
}

impl ElementView for Agent {
    fn id(&self) -> usize {
        self.id
    }

    fn kind(&self) -> ElementName {
        self.kind
    }

    fn attribute(&self, variable: &Variable) -> Option<Value> {
        self.state
            .get(variable)
            .or_else(|| self.environment.get(variable))
            .cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneElement {
    pub id: usize,
    pub kind: ElementName,
    pub attributes: VariableMapping,
}

impl SceneElement {
    pub fn new(id: usize, kind: ElementName, attributes: VariableMapping) -> Self {
        Self {
            id,
            kind,
            attributes,
        }
    }
}

impl ElementView for SceneElement {
    fn id(&self) -> usize {
        self.id
    }

    fn kind(&self) -> ElementName {
        self.kind
    }

    fn attribute(&self, variable: &Variable) -> Option<Value> {
        self.attributes.get(variable).cloned()
    }
}

/// The whole population at one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemState {
    pub agents: Vec<Agent>,
    pub elements: Vec<SceneElement>,
}

impl SystemState {
    pub fn new(agents: Vec<Agent>, elements: Vec<SceneElement>) -> Self {
        Self { agents, elements }
    }

    pub fn agent(&self, id: usize) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Agents first, then scene elements.
    pub fn population(&self) -> impl Iterator<Item = &dyn ElementView> + '_ {
        self.agents
            .iter()
            .map(|a| a as &dyn ElementView)
            .chain(self.elements.iter().map(|e| e as &dyn ElementView))
    }

    /// The population as seen by `asker`: every agent with another id, then every scene
    /// element. Agent and scene element ids are independent.
    pub fn others<'a>(&'a self, asker: &'a Agent) -> impl Iterator<Item = &'a dyn ElementView> + 'a {
        self.agents
            .iter()
            .filter(move |a| a.id != asker.id)
            .map(|a| a as &dyn ElementView)
            .chain(self.elements.iter().map(|e| e as &dyn ElementView))
    }

    pub fn len(&self) -> usize {
        self.agents.len() + self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
