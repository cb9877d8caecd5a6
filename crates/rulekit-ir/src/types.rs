//! The host-runtime type model (spec §4.2).
//!
//! A conservative, closed view of the embedding host language's types.
//! Pure data: predicates only, no resolution logic (that lives in
//! `rulekit_compiler::resolver`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A primitive host type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Primitive {
    Int,
    Long,
    Double,
    Float,
    Boolean,
    Char,
    Byte,
    Short,
    Void,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Double => "double",
            Primitive::Float => "float",
            Primitive::Boolean => "boolean",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "double" => Primitive::Double,
            "float" => Primitive::Float,
            "boolean" => Primitive::Boolean,
            "char" => Primitive::Char,
            "byte" => Primitive::Byte,
            "short" => Primitive::Short,
            "void" => Primitive::Void,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Primitive::Int
                | Primitive::Long
                | Primitive::Double
                | Primitive::Float
                | Primitive::Byte
                | Primitive::Short
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Primitive::Boolean)
    }
}

/// What structural role a `Class` type plays, driving navigation/codegen
/// lowering decisions (spec §4.3's kind-resolution order).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ClassKind {
    Regular,
    Collection,
    Map,
    BoxedPrimitive,
    BigNumeric,
    String,
}

/// A reference (generic, shallow) host class type.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ClassType {
    pub qualified_name: String,
    pub type_arguments: Vec<Type>,
    pub kind: ClassKind,
    pub is_record: bool,
}

impl ClassType {
    pub fn new(qualified_name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            type_arguments: Vec::new(),
            kind,
            is_record: false,
        }
    }

    pub fn with_args(mut self, args: Vec<Type>) -> Self {
        self.type_arguments = args;
        self
    }

    pub fn record(mut self, is_record: bool) -> Self {
        self.is_record = is_record;
        self
    }

    /// Simple (unqualified) name, e.g. `java.util.List` -> `List`.
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

/// The sealed type-model sum (spec §4.2 table).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Type {
    Primitive(Primitive),
    Class(ClassType),
    Array(Box<Type>),
    /// Resolution failed or was never attempted; `hint` carries a best-effort
    /// description (e.g. the unresolved type name) for diagnostics.
    Unknown(Option<String>),
}

impl Type {
    pub fn unknown() -> Self {
        Type::Unknown(None)
    }

    pub fn unknown_hint(hint: impl Into<String>) -> Self {
        Type::Unknown(Some(hint.into()))
    }

    pub fn void() -> Self {
        Type::Primitive(Primitive::Void)
    }

    pub fn object() -> Self {
        Type::Class(ClassType::new("java.lang.Object", ClassKind::Regular))
    }

    pub fn string() -> Self {
        Type::Class(ClassType::new("java.lang.String", ClassKind::String))
    }

    pub fn boolean() -> Self {
        Type::Primitive(Primitive::Boolean)
    }

    pub fn big_decimal() -> Self {
        Type::Class(ClassType::new("java.math.BigDecimal", ClassKind::BigNumeric))
    }

    pub fn int() -> Self {
        Type::Primitive(Primitive::Int)
    }

    pub fn collection_of(element: Type) -> Self {
        Type::Class(
            ClassType::new("java.util.List", ClassKind::Collection).with_args(vec![element]),
        )
    }

    pub fn map_of(key: Type, value: Type) -> Self {
        Type::Class(
            ClassType::new("java.util.Map", ClassKind::Map).with_args(vec![key, value]),
        )
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Type::Class(ClassType {
                kind: ClassKind::Collection,
                ..
            })
        )
    }

    pub fn is_map(&self) -> bool {
        matches!(
            self,
            Type::Class(ClassType {
                kind: ClassKind::Map,
                ..
            })
        )
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Type::Class(c) if c.is_record)
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            Type::Primitive(p) => p.is_numeric(),
            Type::Class(c) => matches!(c.kind, ClassKind::BigNumeric | ClassKind::BoxedPrimitive),
            _ => false,
        }
    }

    pub fn is_boolean(&self) -> bool {
        match self {
            Type::Primitive(p) => p.is_boolean(),
            Type::Class(c) => c.kind == ClassKind::BoxedPrimitive && c.simple_name() == "Boolean",
            _ => false,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Type::Class(ClassType {
                kind: ClassKind::String,
                ..
            })
        )
    }

    /// Element type for a collection or array; `self` for anything else
    /// (spec §4.2: "self otherwise").
    pub fn element_type(&self) -> Type {
        match self {
            Type::Array(inner) => (**inner).clone(),
            Type::Class(c) if c.kind == ClassKind::Collection => {
                c.type_arguments.first().cloned().unwrap_or(Type::unknown())
            }
            other => other.clone(),
        }
    }

    /// Key type for a map; `Unknown` otherwise.
    pub fn key_type(&self) -> Type {
        match self {
            Type::Class(c) if c.kind == ClassKind::Map => {
                c.type_arguments.first().cloned().unwrap_or(Type::unknown())
            }
            _ => Type::unknown(),
        }
    }

    /// Value type for a map; `Unknown` otherwise.
    pub fn value_type(&self) -> Type {
        match self {
            Type::Class(c) if c.kind == ClassKind::Map => {
                c.type_arguments.get(1).cloned().unwrap_or(Type::unknown())
            }
            _ => Type::unknown(),
        }
    }

    pub fn simple_name(&self) -> String {
        match self {
            Type::Primitive(p) => p.name().to_string(),
            Type::Class(c) => c.simple_name().to_string(),
            Type::Array(inner) => format!("{}[]", inner.simple_name()),
            Type::Unknown(hint) => hint.clone().unwrap_or_else(|| "?".to_string()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_laws_element_type_self_for_scalar() {
        let t = Type::string();
        assert_eq!(t.element_type(), t);
    }

    #[test]
    fn collection_element_type_unwraps() {
        let t = Type::collection_of(Type::string());
        assert_eq!(t.element_type(), Type::string());
    }

    #[test]
    fn empty_collection_element_is_unknown() {
        let t = Type::Class(ClassType::new("java.util.List", ClassKind::Collection));
        assert!(t.element_type().is_unknown());
    }

    #[test]
    fn map_key_value_types() {
        let t = Type::map_of(Type::string(), Type::int());
        assert_eq!(t.key_type(), Type::string());
        assert_eq!(t.value_type(), Type::int());
    }

    #[test]
    fn non_map_key_value_are_unknown() {
        let t = Type::string();
        assert!(t.key_type().is_unknown());
        assert!(t.value_type().is_unknown());
    }

    #[test]
    fn primitive_numeric_and_boolean() {
        assert!(Primitive::Int.is_numeric());
        assert!(!Primitive::Boolean.is_numeric());
        assert!(Primitive::Boolean.is_boolean());
    }
}
