//! Interned names: attribute variables, element kinds and groups.
//!
//! Registries are filled through a builder while the model is loaded and frozen by
//! `build()`. A frozen registry has no writers, so it is shared freely across threads.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::types::Type;
use super::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Variable {name} is already registered with type {existing}, cannot use {requested}")]
    ConflictingType {
        name: String,
        existing: Type,
        requested: Type,
    },
    #[error("Unknown element kind: {0}")]
    UnknownElement(String),
    #[error("Name {0} is already used by an element kind or a group")]
    DuplicateName(String),
}

/// An interned attribute: dense index, name and declared type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    index: usize,
    name: Arc<str>,
    ty: Type,
}

impl Variable {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.name, self.index, self.ty)
    }
}

#[derive(Debug, Default)]
pub struct VariableRegistryBuilder {
    variables: Vec<Variable>,
    by_name: HashMap<Arc<str>, usize>,
}

impl VariableRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable registered for `name`, registering it on first use.
    ///
    /// Re-interning must use the type of the first registration.
    pub fn intern(&mut self, name: &str, ty: Type) -> Result<Variable, RegistryError> {
        if let Some(&index) = self.by_name.get(name) {
            let existing = &self.variables[index];
            if existing.ty != ty {
                return Err(RegistryError::ConflictingType {
                    name: name.to_string(),
                    existing: existing.ty.clone(),
                    requested: ty,
                });
            }
            return Ok(existing.clone());
        }
        let variable = Variable {
            index: self.variables.len(),
            name: Arc::from(name),
            ty,
        };
        self.by_name.insert(variable.name.clone(), variable.index);
        self.variables.push(variable.clone());
        Ok(variable)
    }

    pub fn build(self) -> VariableRegistry {
        tracing::debug!("Variable registry frozen with {} variables", self.variables.len());
        VariableRegistry {
            variables: self.variables.into(),
            by_name: self.by_name,
        }
    }
}

/// Frozen name -> variable table.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: Arc<[Variable]>,
    by_name: HashMap<Arc<str>, usize>,
}

impl VariableRegistry {
    pub fn builder() -> VariableRegistryBuilder {
        VariableRegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).map(|&index| &self.variables[index])
    }

    pub fn by_index(&self, index: usize) -> Option<&Variable> {
        self.variables.get(index)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}

/// Values of one agent or element snapshot, indexed by variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMapping {
    values: Vec<Option<Value>>,
}

impl VariableMapping {
    pub fn builder() -> VariableMappingBuilder {
        VariableMappingBuilder::default()
    }

    pub fn get(&self, variable: &Variable) -> Option<&Value> {
        self.values.get(variable.index()).and_then(Option::as_ref)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.get(variable).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct VariableMappingBuilder {
    values: Vec<Option<Value>>,
}

impl VariableMappingBuilder {
    pub fn set(mut self, variable: &Variable, value: impl Into<Value>) -> Self {
        let index = variable.index();
        if self.values.len() <= index {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value.into());
        self
    }

    pub fn build(self) -> VariableMapping {
        VariableMapping {
            values: self.values,
        }
    }
}

/// Interned element kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementName(u32);

impl ElementName {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A resolved set of element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group(Arc<BTreeSet<ElementName>>);

impl Group {
    pub fn new(members: impl IntoIterator<Item = ElementName>) -> Self {
        Self(Arc::new(members.into_iter().collect()))
    }

    pub fn contains(&self, name: ElementName) -> bool {
        self.0.contains(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementName> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ElementNameRegistryBuilder {
    names: Vec<Arc<str>>,
    by_name: HashMap<Arc<str>, ElementName>,
    groups: HashMap<String, Group>,
}

impl ElementNameRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_element(&mut self, name: &str) -> Result<ElementName, RegistryError> {
        if self.by_name.contains_key(name) || self.groups.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let element = ElementName(self.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        self.names.push(name.clone());
        self.by_name.insert(name, element);
        Ok(element)
    }

    pub fn declare_group(&mut self, name: &str, members: &[String]) -> Result<Group, RegistryError> {
        if self.by_name.contains_key(name) || self.groups.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let members = members
            .iter()
            .map(|member| {
                self.by_name
                    .get(member.as_str())
                    .copied()
                    .ok_or_else(|| RegistryError::UnknownElement(member.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let group = Group::new(members);
        self.groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    pub fn build(self) -> ElementNameRegistry {
        tracing::debug!(
            "Element registry frozen with {} kinds and {} groups",
            self.names.len(),
            self.groups.len()
        );
        let all = Group::new(self.by_name.values().copied());
        ElementNameRegistry {
            names: self.names.into(),
            by_name: self.by_name,
            groups: self.groups,
            all,
        }
    }
}

/// Frozen element kinds and group aliases.
#[derive(Debug, Clone, Default)]
pub struct ElementNameRegistry {
    names: Arc<[Arc<str>]>,
    by_name: HashMap<Arc<str>, ElementName>,
    groups: HashMap<String, Group>,
    all: Group,
}

impl ElementNameRegistry {
    pub fn builder() -> ElementNameRegistryBuilder {
        ElementNameRegistryBuilder::new()
    }

    pub fn element(&self, name: &str) -> Option<ElementName> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, element: ElementName) -> Option<&str> {
        self.names.get(element.index()).map(|n| n.as_ref())
    }

    /// Resolves a group alias, or an element kind as the singleton group of that kind.
    pub fn resolve_group(&self, name: &str) -> Option<Group> {
        self.groups
            .get(name)
            .cloned()
            .or_else(|| self.element(name).map(|e| Group::new([e])))
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Every declared element kind.
    pub fn all(&self) -> &Group {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
