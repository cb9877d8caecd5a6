//! Type resolution against the embedding host runtime (spec §4.3).
//!
//! The resolver turns qualified type names into [`Type`]s and answers
//! property-navigation questions (`owner.property -> Type`) by asking a
//! caller-supplied [`HostClassLoader`] to reflect on the host runtime. All
//! lookups are memoized; nothing here ever recurses through a type it is
//! still in the middle of resolving (a fresh `Type` is cached before its
//! type arguments are resolved, matching the spec's "insert before
//! recursing" rule).

use std::cell::RefCell;
use std::collections::HashMap;

use rulekit_ir::{ClassKind, ClassType, Primitive, Type};

const BIG_NUMERIC_NAMES: &[&str] = &[
    "java.math.BigDecimal",
    "java.math.BigInteger",
    "BigDecimal",
    "BigInteger",
];

const BOXED_PRIMITIVE_NAMES: &[&str] = &[
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Double",
    "java.lang.Float",
    "java.lang.Boolean",
    "java.lang.Character",
    "java.lang.Byte",
    "java.lang.Short",
    "Integer",
    "Long",
    "Double",
    "Float",
    "Boolean",
    "Character",
    "Byte",
    "Short",
];

/// A property's declared host-runtime return type, as reported by a
/// [`HostClassLoader`]: a qualified name plus (shallow) type arguments and
/// array depth, ready for [`Resolver::resolve_type_ref`].
#[derive(Clone, Debug)]
pub struct HostTypeRef {
    pub qualified_name: String,
    pub type_arguments: Vec<String>,
    pub array_depth: usize,
}

impl HostTypeRef {
    pub fn simple(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            type_arguments: Vec::new(),
            array_depth: 0,
        }
    }
}

/// Reflection facility over the embedding host runtime (spec §4.3's
/// "opaque host-runtime hook", realized per §6's `type_class_loader`
/// option). Implementations typically wrap whatever classloading/reflection
/// API the host language exposes; this crate ships no implementation.
pub trait HostClassLoader {
    fn class_exists(&self, qualified_name: &str) -> bool;
    fn is_record(&self, qualified_name: &str) -> bool;
    fn is_assignable_to_collection(&self, qualified_name: &str) -> bool;
    fn is_assignable_to_map(&self, qualified_name: &str) -> bool;

    /// Resolve a zero-arg accessor named `accessor_name` on `owner`, if one
    /// exists, to its declared return type.
    fn resolve_property(&self, owner: &str, accessor_name: &str) -> Option<HostTypeRef>;
}

/// Turns qualified type names and property-navigation questions into
/// [`Type`]s, memoizing every lookup (spec §4.3).
pub struct Resolver<'a> {
    loader: Option<&'a dyn HostClassLoader>,
    type_cache: RefCell<HashMap<String, Type>>,
    property_cache: RefCell<HashMap<(String, String), Type>>,
}

impl<'a> Resolver<'a> {
    /// A resolver with no class loader: every class name resolves to
    /// `Unknown` (spec §6, "absent when type inference is disabled").
    pub fn disabled() -> Self {
        Self {
            loader: None,
            type_cache: RefCell::new(HashMap::new()),
            property_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn new(loader: &'a dyn HostClassLoader) -> Self {
        Self {
            loader: Some(loader),
            type_cache: RefCell::new(HashMap::new()),
            property_cache: RefCell::new(HashMap::new()),
        }
    }

    /// `resolve(name)` (spec §4.3): primitive names resolve directly;
    /// `T[]` suffixes recurse and wrap in `Array`; everything else asks
    /// the loader and is classified by [`classify_kind`].
    pub fn resolve(&self, name: &str) -> Type {
        if let Some(cached) = self.type_cache.borrow().get(name) {
            return cached.clone();
        }
        let resolved = self.resolve_uncached(name, &[]);
        self.type_cache
            .borrow_mut()
            .insert(name.to_string(), resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, name: &str, type_arguments: &[String]) -> Type {
        if let Some(component) = name.strip_suffix("[]") {
            return Type::Array(Box::new(self.resolve(component)));
        }
        if type_arguments.is_empty() {
            if let Some(p) = Primitive::from_name(name) {
                return Type::Primitive(p);
            }
        }

        let Some(loader) = self.loader else {
            return Type::unknown_hint(name);
        };
        if !loader.class_exists(name) {
            return Type::unknown_hint(name);
        }

        let kind = classify_kind(name, loader);
        let is_record = loader.is_record(name);
        // Insert a placeholder before resolving type arguments so a type
        // that (indirectly) refers to itself does not recurse forever.
        let placeholder = Type::Class(
            ClassType::new(name, kind)
                .record(is_record)
                .with_args(Vec::new()),
        );
        self.type_cache
            .borrow_mut()
            .insert(cache_key(name, type_arguments), placeholder);

        let args = type_arguments
            .iter()
            .map(|arg| self.resolve(arg))
            .collect::<Vec<_>>();
        Type::Class(ClassType::new(name, kind).record(is_record).with_args(args))
    }

    /// Resolve a [`HostTypeRef`] reported by the loader into a [`Type`].
    pub fn resolve_type_ref(&self, type_ref: &HostTypeRef) -> Type {
        let mut ty = self.resolve_uncached(&type_ref.qualified_name, &type_ref.type_arguments);
        for _ in 0..type_ref.array_depth {
            ty = Type::Array(Box::new(ty));
        }
        ty
    }

    /// `resolveProperty(ownerType, propertyName)` (spec §4.3).
    pub fn resolve_property(&self, owner: &Type, property_name: &str) -> Type {
        // Collection shorthand: resolve against the element type so that
        // `list.name` means "name of each element" at the type level; the
        // generator is responsible for the actual per-element lowering.
        if owner.is_collection() {
            return self.resolve_property(&owner.element_type(), property_name);
        }

        let Type::Class(class) = owner else {
            return Type::unknown();
        };
        let Some(loader) = self.loader else {
            return Type::unknown();
        };

        let key = (class.qualified_name.clone(), property_name.to_string());
        if let Some(cached) = self.property_cache.borrow().get(&key) {
            return cached.clone();
        }

        let accessor_candidates = accessor_candidates(class.is_record, property_name);
        let found = accessor_candidates
            .iter()
            .find_map(|candidate| loader.resolve_property(&class.qualified_name, candidate));

        let resolved = match found {
            Some(type_ref) => self.resolve_type_ref(&type_ref),
            None => Type::unknown_hint(format!(
                "{}.{}",
                class.simple_name(),
                property_name
            )),
        };
        self.property_cache.borrow_mut().insert(key, resolved.clone());
        resolved
    }
}

fn cache_key(name: &str, type_arguments: &[String]) -> String {
    if type_arguments.is_empty() {
        name.to_string()
    } else {
        format!("{name}<{}>", type_arguments.join(","))
    }
}

/// Kind-classification order (spec §4.3): exact `String`, then the
/// big-number set, then the boxed-primitive set, then Map/Collection
/// assignability, else Regular.
fn classify_kind(qualified_name: &str, loader: &dyn HostClassLoader) -> ClassKind {
    let simple = qualified_name.rsplit(['.', '$']).next().unwrap_or(qualified_name);
    if simple == "String" {
        ClassKind::String
    } else if BIG_NUMERIC_NAMES.contains(&qualified_name) || BIG_NUMERIC_NAMES.contains(&simple) {
        ClassKind::BigNumeric
    } else if BOXED_PRIMITIVE_NAMES.contains(&qualified_name)
        || BOXED_PRIMITIVE_NAMES.contains(&simple)
    {
        ClassKind::BoxedPrimitive
    } else if loader.is_assignable_to_map(qualified_name) {
        ClassKind::Map
    } else if loader.is_assignable_to_collection(qualified_name) {
        ClassKind::Collection
    } else {
        ClassKind::Regular
    }
}

/// Record owners use the exact accessor name; everything else tries, in
/// order, `getFoo`, `isFoo`, `foo` (spec §4.3).
fn accessor_candidates(is_record: bool, property_name: &str) -> Vec<String> {
    if is_record {
        return vec![property_name.to_string()];
    }
    let capitalized = rulekit_ir::capitalize(property_name);
    vec![
        format!("get{capitalized}"),
        format!("is{capitalized}"),
        property_name.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    struct FakeLoader {
        records: Vec<&'static str>,
        collections: Vec<&'static str>,
        maps: Vec<&'static str>,
        properties: Map<(&'static str, &'static str), HostTypeRef>,
    }

    impl HostClassLoader for FakeLoader {
        fn class_exists(&self, qualified_name: &str) -> bool {
            qualified_name != "Bogus"
        }
        fn is_record(&self, qualified_name: &str) -> bool {
            self.records.contains(&qualified_name)
        }
        fn is_assignable_to_collection(&self, qualified_name: &str) -> bool {
            self.collections.contains(&qualified_name)
        }
        fn is_assignable_to_map(&self, qualified_name: &str) -> bool {
            self.maps.contains(&qualified_name)
        }
        fn resolve_property(&self, owner: &str, accessor_name: &str) -> Option<HostTypeRef> {
            self.properties.get(&(owner, accessor_name)).cloned()
        }
    }

    fn loader() -> FakeLoader {
        let mut properties = Map::new();
        properties.insert(("Item", "getType"), HostTypeRef::simple("String"));
        properties.insert(("Item", "active"), HostTypeRef::simple("boolean"));
        FakeLoader {
            records: vec!["Item"],
            collections: vec!["Cart"],
            maps: vec![],
            properties,
        }
    }

    #[test]
    fn resolves_primitive_and_array() {
        let r = Resolver::disabled();
        assert_eq!(r.resolve("int"), Type::Primitive(Primitive::Int));
        assert_eq!(r.resolve("int[]"), Type::Array(Box::new(Type::int())));
    }

    #[test]
    fn unknown_class_without_loader() {
        let r = Resolver::disabled();
        assert!(r.resolve("com.example.Item").is_unknown());
    }

    #[test]
    fn record_property_uses_exact_name() {
        let l = loader();
        let r = Resolver::new(&l);
        let item = r.resolve("Item");
        assert_eq!(r.resolve_property(&item, "active"), Type::boolean());
    }

    #[test]
    fn collection_navigation_resolves_against_element() {
        let l = loader();
        let r = Resolver::new(&l);
        let cart = Type::collection_of(r.resolve("Item"));
        assert_eq!(r.resolve_property(&cart, "active"), Type::boolean());
    }

    #[test]
    fn missing_property_is_unknown_not_panic() {
        let l = loader();
        let r = Resolver::new(&l);
        let item = r.resolve("Item");
        assert!(r.resolve_property(&item, "nonexistent").is_unknown());
    }
}
