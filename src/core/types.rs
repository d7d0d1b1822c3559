use std::collections::BTreeMap;
use std::fmt;

/// Static types of the expression language.
///
/// `None` is the absorbing type produced by a failed check: it is a subtype and a
/// supertype of every other type, so one root cause never yields a cascade of errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Type {
    #[default]
    None,
    Integer,
    Real,
    Boolean,
    Char,
    String,
    Record(BTreeMap<String, Type>),
}

impl Type {
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        Type::Record(fields.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Type::None)
    }

    /// `Integer` and `Real` are numeric. `None` is accepted too, so that an operand
    /// that already failed is not reported a second time.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Real | Type::None)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Boolean | Type::None)
    }

    pub fn field(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Record(fields) => fields.get(name),
            _ => None,
        }
    }

    pub fn is_subtype_of(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::None, _) | (_, Type::None) => true,
            (Type::Integer, Type::Real) => true,
            (Type::Char, Type::String) => true,
            (Type::Record(own), Type::Record(theirs)) => {
                own.len() == theirs.len()
                    && own
                        .iter()
                        .all(|(name, ty)| theirs.get(name).is_some_and(|t| ty.is_subtype_of(t)))
            }
            (a, b) => a == b,
        }
    }

    pub fn are_compatible(a: &Type, b: &Type) -> bool {
        a.is_subtype_of(b) || b.is_subtype_of(a)
    }

    /// Least common supertype of two types, if any.
    ///
    /// `None` is absorbing: merging with it yields `None`.
    pub fn merge(a: &Type, b: &Type) -> Option<Type> {
        if a == b {
            return Some(a.clone());
        }
        match (a, b) {
            (Type::None, _) | (_, Type::None) => Some(Type::None),
            (Type::Record(left), Type::Record(right)) => {
                if left.len() != right.len() {
                    return None;
                }
                let mut fields = BTreeMap::new();
                for (name, ty) in left {
                    let merged = Type::merge(ty, right.get(name)?)?;
                    fields.insert(name.clone(), merged);
                }
                Some(Type::Record(fields))
            }
            _ if a.is_subtype_of(b) => Some(b.clone()),
            _ if b.is_subtype_of(a) => Some(a.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::None => write!(f, "none"),
            Type::Integer => write!(f, "int"),
            Type::Real => write!(f, "real"),
            Type::Boolean => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Record(fields) => {
                write!(f, "[")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl std::str::FromStr for Type {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Type::Integer),
            "real" => Ok(Type::Real),
            "bool" => Ok(Type::Boolean),
            "char" => Ok(Type::Char),
            "string" => Ok(Type::String),
            other => Err(format!("Unknown type name: {}", other)),
        }
    }
}
