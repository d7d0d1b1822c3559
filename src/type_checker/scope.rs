use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::core::types::Type;

/// Which attributes a scope may read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Nothing,
    Everything,
    Only(Arc<BTreeSet<String>>),
}

impl Visibility {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Visibility::Only(Arc::new(names.into_iter().map(Into::into).collect()))
    }

    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Visibility::Nothing => false,
            Visibility::Everything => true,
            Visibility::Only(names) => names.contains(name),
        }
    }
}

/// Immutable description of where an expression is checked.
///
/// Nested constructs never mutate a scope: `let` bindings and group expressions derive a
/// new descriptor that is dropped once the nested node has been checked, so nothing leaks
/// into sibling nodes.
#[derive(Debug, Clone, Default)]
pub struct TypeScope {
    attributes: Visibility,
    it_attributes: Visibility,
    group_expressions_allowed: bool,
    element_is_subject: bool,
    locals: Arc<HashMap<String, Type>>,
}

impl TypeScope {
    /// Scope where bare references see `attributes` and `it.` sees `it_attributes`.
    pub fn new(attributes: Visibility, it_attributes: Visibility) -> Self {
        Self {
            attributes,
            it_attributes,
            ..Default::default()
        }
    }

    /// Scope where only constants, parameters and locals are visible.
    pub fn constant() -> Self {
        Self::default()
    }

    pub fn allow_group_expressions(self) -> Self {
        Self {
            group_expressions_allowed: true,
            ..self
        }
    }

    /// Inside group expressions `it` denotes the iterated element itself.
    pub fn with_element_as_subject(self) -> Self {
        Self {
            element_is_subject: true,
            ..self
        }
    }

    /// Derives a scope extended with local bindings, shadowing existing ones.
    pub fn with_locals<'a, I>(&self, locals: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Type)>,
    {
        let mut extended = (*self.locals).clone();
        extended.extend(locals.into_iter().map(|(n, t)| (n.to_string(), t)));
        Self {
            locals: Arc::new(extended),
            ..self.clone()
        }
    }

    /// Derives the scope of the guard and value of a group expression.
    ///
    /// Bare references denote the iterated element and see `group_attributes`; `it` keeps
    /// denoting the asking entity, unless the element is its own subject. Group
    /// expressions cannot be nested.
    pub fn enter_group(&self, group_attributes: Visibility) -> Self {
        let it_attributes = if self.element_is_subject {
            group_attributes.clone()
        } else {
            self.it_attributes.clone()
        };
        Self {
            attributes: group_attributes,
            it_attributes,
            group_expressions_allowed: false,
            element_is_subject: self.element_is_subject,
            locals: self.locals.clone(),
        }
    }

    pub fn local(&self, name: &str) -> Option<&Type> {
        self.locals.get(name)
    }

    pub fn can_access(&self, attribute: &str) -> bool {
        self.attributes.accepts(attribute)
    }

    pub fn can_access_it(&self, attribute: &str) -> bool {
        self.it_attributes.accepts(attribute)
    }

    pub fn group_expressions_allowed(&self) -> bool {
        self.group_expressions_allowed
    }
}
