//! Declarations known to the checker: constants, parameters, records, functions and the
//! attributes of each element kind.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use strum::Display;

use crate::ast::{ElementDecl, Location, TypedName};
use crate::core::types::Type;

use super::error::TypeCheckError;
use super::scope::{TypeScope, Visibility};

/// Read-only name and attribute oracle consulted while checking.
pub trait SymbolOracle {
    /// Type of a constant or parameter.
    fn constant(&self, name: &str) -> Option<Type>;

    /// Type of an attribute declared by any element kind.
    fn attribute(&self, name: &str) -> Option<Type>;

    /// Attributes readable on every member of a group; `None` means the whole population.
    /// Returns `None` when the group is unknown.
    fn group_attributes(&self, group: Option<&str>) -> Option<Visibility>;

    /// Record type declaring `field`, with its name.
    fn record_of_field(&self, field: &str) -> Option<(&str, &Type)>;

    fn function(&self, name: &str) -> Option<&FunctionSignature>;

    fn lookup(&self, name: &str) -> Option<Type> {
        self.constant(name).or_else(|| self.attribute(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<TypedName>,
    pub return_type: Type,
}

/// Use sites of expressions, each with its own attribute visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ScopeKind {
    /// Agent attribute updates: the agent's own state.
    Agent,
    /// Observation functions: own state and environment, plus group expressions.
    Sensing,
    /// Action selection: own state and latest observations.
    Behaviour,
    /// Environment updates: own state and environment.
    Dynamics,
    /// Measures and predicates over the whole population.
    System,
    /// Function bodies: parameters only.
    Function,
    /// Constant and parameter initialisers.
    Constant,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementAttributes {
    pub is_agent: bool,
    pub environment: BTreeMap<String, Type>,
    pub state: BTreeMap<String, Type>,
    pub observations: BTreeMap<String, Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Environment,
    State,
    Observations,
}

impl ElementAttributes {
    fn section(&self, section: Section) -> &BTreeMap<String, Type> {
        match section {
            Section::Environment => &self.environment,
            Section::State => &self.state,
            Section::Observations => &self.observations,
        }
    }

    /// Attributes other elements can read on this one.
    pub fn observable(&self) -> BTreeSet<String> {
        self.state
            .keys()
            .chain(self.environment.keys())
            .cloned()
            .collect()
    }
}

/// Attributes of every element kind, and group membership.
#[derive(Debug, Clone, Default)]
pub struct ElementAttributeTable {
    elements: BTreeMap<String, ElementAttributes>,
    groups: BTreeMap<String, BTreeSet<String>>,
    attributes: BTreeMap<String, Type>,
}

impl ElementAttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element kind. Attribute names shared between kinds must be declared with
    /// the same type, so an attribute has one type whichever element it is read on.
    pub fn add_element(&mut self, decl: &ElementDecl) -> Vec<TypeCheckError> {
        let mut errors = Vec::new();
        let mut attributes = ElementAttributes {
            is_agent: decl.is_agent,
            ..Default::default()
        };
        let sections = [
            (&decl.environment, &mut attributes.environment),
            (&decl.state, &mut attributes.state),
            (&decl.observations, &mut attributes.observations),
        ];
        let mut seen: HashMap<&str, Location> = HashMap::new();
        for (declared, target) in sections {
            for attribute in declared.iter() {
                if let Some(first) = seen.get(attribute.name.as_str()) {
                    errors.push(TypeCheckError::duplicate_identifier(
                        &attribute.name,
                        *first,
                        attribute.location,
                    ));
                    continue;
                }
                seen.insert(attribute.name.as_str(), attribute.location);
                match self.attributes.get(&attribute.name) {
                    Some(existing) if existing != &attribute.ty => {
                        errors.push(TypeCheckError::type_mismatch(
                            existing.clone(),
                            attribute.ty.clone(),
                            attribute.location,
                        ));
                        continue;
                    }
                    Some(_) => {}
                    None => {
                        self.attributes
                            .insert(attribute.name.clone(), attribute.ty.clone());
                    }
                }
                target.insert(attribute.name.clone(), attribute.ty.clone());
            }
        }
        self.elements.insert(decl.name.clone(), attributes);
        errors
    }

    pub fn add_group(
        &mut self,
        name: &str,
        members: &[String],
        location: Location,
    ) -> Result<(), TypeCheckError> {
        if let Some(unknown) = members.iter().find(|m| !self.elements.contains_key(*m)) {
            return Err(TypeCheckError::unknown_symbol(unknown, location));
        }
        self.groups
            .insert(name.to_string(), members.iter().cloned().collect());
        Ok(())
    }

    pub fn element(&self, name: &str) -> Option<&ElementAttributes> {
        self.elements.get(name)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&str, &ElementAttributes)> {
        self.elements.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.groups.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn attribute_type(&self, name: &str) -> Option<&Type> {
        self.attributes.get(name)
    }

    fn common_attributes<'a>(&self, members: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
        let mut common: Option<BTreeSet<String>> = None;
        for member in members {
            let observable = self
                .elements
                .get(member)
                .map(ElementAttributes::observable)
                .unwrap_or_default();
            common = Some(match common {
                None => observable,
                Some(current) => current.intersection(&observable).cloned().collect(),
            });
        }
        common.unwrap_or_default()
    }

    /// Attributes readable on every member of `group`. A group alias resolves to its
    /// members, an element kind to itself, `None` to every declared kind.
    pub fn group_attributes(&self, group: Option<&str>) -> Option<BTreeSet<String>> {
        match group {
            None => Some(self.common_attributes(self.elements.keys().map(String::as_str))),
            Some(name) => {
                if let Some(members) = self.groups.get(name) {
                    Some(self.common_attributes(members.iter().map(String::as_str)))
                } else if self.elements.contains_key(name) {
                    Some(self.common_attributes(std::iter::once(name)))
                } else {
                    None
                }
            }
        }
    }

    fn own_attributes(&self, element: Option<&str>, sections: &[Section]) -> Visibility {
        match element.and_then(|name| self.elements.get(name)) {
            Some(attributes) => Visibility::only(
                sections
                    .iter()
                    .flat_map(|section| attributes.section(*section).keys().cloned()),
            ),
            None => Visibility::Nothing,
        }
    }

    /// Scope for expressions attached to `element` at the given use site.
    pub fn scope_for(&self, kind: ScopeKind, element: Option<&str>) -> TypeScope {
        let own = |sections: &[Section]| {
            let visible = self.own_attributes(element, sections);
            TypeScope::new(visible.clone(), visible)
        };
        match kind {
            ScopeKind::Agent => own(&[Section::State]),
            ScopeKind::Sensing => {
                own(&[Section::State, Section::Environment]).allow_group_expressions()
            }
            ScopeKind::Behaviour => own(&[Section::State, Section::Observations]),
            ScopeKind::Dynamics => own(&[Section::State, Section::Environment]),
            ScopeKind::System => TypeScope::new(Visibility::Nothing, Visibility::Nothing)
                .allow_group_expressions()
                .with_element_as_subject(),
            ScopeKind::Function | ScopeKind::Constant => TypeScope::constant(),
        }
    }
}

/// Every declaration of a model, with duplicate detection across all kinds.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    declared: HashMap<String, Location>,
    constants: HashMap<String, Type>,
    records: BTreeMap<String, Type>,
    fields: HashMap<String, (String, Location)>,
    functions: HashMap<String, FunctionSignature>,
    elements: ElementAttributeTable,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `name`, failing when it is already declared.
    pub fn declare(&mut self, name: &str, location: Location) -> Result<(), TypeCheckError> {
        if let Some(first) = self.declared.get(name) {
            return Err(TypeCheckError::duplicate_identifier(name, *first, location));
        }
        self.declared.insert(name.to_string(), location);
        Ok(())
    }

    pub fn declaration(&self, name: &str) -> Option<Location> {
        self.declared.get(name).copied()
    }

    pub fn add_constant(&mut self, name: &str, ty: Type) {
        self.constants.insert(name.to_string(), ty);
    }

    /// Registers a record type; a field may belong to one record type only.
    pub fn add_record(&mut self, name: &str, fields: &[TypedName]) -> Vec<TypeCheckError> {
        let mut errors = Vec::new();
        let mut declared = BTreeMap::new();
        for field in fields {
            if let Some((_, first)) = self.fields.get(&field.name) {
                errors.push(TypeCheckError::duplicate_identifier(
                    &field.name,
                    *first,
                    field.location,
                ));
                continue;
            }
            self.fields
                .insert(field.name.clone(), (name.to_string(), field.location));
            declared.insert(field.name.clone(), field.ty.clone());
        }
        self.records.insert(name.to_string(), Type::Record(declared));
        errors
    }

    pub fn record(&self, name: &str) -> Option<&Type> {
        self.records.get(name)
    }

    pub fn add_function(&mut self, signature: FunctionSignature) {
        self.functions.insert(signature.name.clone(), signature);
    }

    pub fn elements(&self) -> &ElementAttributeTable {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut ElementAttributeTable {
        &mut self.elements
    }

    pub fn scope_for(&self, kind: ScopeKind, element: Option<&str>) -> TypeScope {
        self.elements.scope_for(kind, element)
    }
}

impl SymbolOracle for SymbolTable {
    fn constant(&self, name: &str) -> Option<Type> {
        self.constants.get(name).cloned()
    }

    fn attribute(&self, name: &str) -> Option<Type> {
        self.elements.attribute_type(name).cloned()
    }

    fn group_attributes(&self, group: Option<&str>) -> Option<Visibility> {
        self.elements
            .group_attributes(group)
            .map(Visibility::only)
    }

    fn record_of_field(&self, field: &str) -> Option<(&str, &Type)> {
        let (record, _) = self.fields.get(field)?;
        self.records
            .get_key_value(record)
            .map(|(name, ty)| (name.as_str(), ty))
    }

    fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn predator_prey() -> ElementAttributeTable {
        let mut table = ElementAttributeTable::new();
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
            .add_group("Animals", &["Wolf".to_string(), "Sheep".to_string()], Location::default())
            .unwrap();
        table
    }

    #[test]
    fn test_group_attributes_are_the_intersection() {
        let table = predator_prey();
        let expected: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        assert_eq!(table.group_attributes(Some("Animals")), Some(expected.clone()));
        assert_eq!(table.group_attributes(None), Some(expected));
        assert!(table
            .group_attributes(Some("Sheep"))
            .unwrap()
            .contains("energy"));
        assert_eq!(table.group_attributes(Some("Plants")), None);
    }

    #[test]
    fn test_incompatible_attribute_types() {
        let mut table = predator_prey();
        let grass = ElementDecl {
            name: "Grass".to_string(),
            environment: vec![TypedName::new("x", Type::Boolean).at(4, 2)],
            ..Default::default()
        };
        let errors = table.add_element(&grass);
        assert_eq!(
            errors,
            vec![TypeCheckError::type_mismatch(
                Type::Real,
                Type::Boolean,
                Location::new(4, 2)
            )]
        );
    }

    #[test]
    fn test_shared_attribute_is_not_widened() {
        let mut table = predator_prey();
        let hunter = ElementDecl {
            name: "Hunter".to_string(),
            is_agent: true,
            state: vec![TypedName::new("hunger", Type::Real).at(5, 3)],
            ..Default::default()
        };
        let errors = table.add_element(&hunter);
        assert_eq!(
            errors,
            vec![TypeCheckError::type_mismatch(
                Type::Integer,
                Type::Real,
                Location::new(5, 3)
            )]
        );
        assert_eq!(table.attribute_type("hunger"), Some(&Type::Integer));
    }

    #[test]
    fn test_unknown_group_member() {
        let mut table = predator_prey();
        let error = table
            .add_group("Plants", &["Tree".to_string()], Location::new(9, 1))
            .unwrap_err();
        assert!(matches!(error, TypeCheckError::UnknownSymbol { ref name, .. } if name == "Tree"));
    }

    #[test]
    fn test_scope_visibility_by_use_site() {
        let table = predator_prey();
        let behaviour = table.scope_for(ScopeKind::Behaviour, Some("Wolf"));
        assert!(behaviour.can_access("prey_near"));
        assert!(!behaviour.can_access("x"));
        assert!(!behaviour.group_expressions_allowed());

        let sensing = table.scope_for(ScopeKind::Sensing, Some("Wolf"));
        assert!(sensing.can_access("x"));
        assert!(!sensing.can_access("prey_near"));
        assert!(sensing.group_expressions_allowed());

        let system = table.scope_for(ScopeKind::System, None);
        assert!(!system.can_access("x"));
        assert!(!system.can_access_it("x"));
    }

    #[test]
    fn test_duplicate_declarations() {
        let mut table = SymbolTable::new();
        table.declare("speed", Location::new(1, 1)).unwrap();
        let error = table.declare("speed", Location::new(5, 3)).unwrap_err();
        assert_eq!(
            error,
            TypeCheckError::duplicate_identifier("speed", Location::new(1, 1), Location::new(5, 3))
        );
    }
}
