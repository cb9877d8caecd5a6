//! Expressions (spec §3, "Expressions").
//!
//! Every node is immutable once built and reference-counted so that later
//! passes can memoize per-expression results by pointer identity rather
//! than deep-comparing trees (spec §9, "Memoization by identity").

use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// A reference-counted, identity-hashable handle to an expression node.
///
/// Cloning an `Expr` is a refcount bump, never a deep copy. Two clones of
/// the same `Expr` compare equal and hash identically; two structurally
/// identical but independently constructed expressions do not — this is
/// what lets the type-inference cache (`rulekit_compiler::infer::Context`)
/// key on expression identity.
#[derive(Clone, Debug)]
pub struct Expr(Rc<ExprKind>);

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr(Rc::new(kind))
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0
    }

    /// Stable identity key, usable wherever a `Hash`/`Eq`-free identifier is
    /// more convenient than the `Expr` handle itself (e.g. debug output).
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl Deref for Expr {
    type Target = ExprKind;
    fn deref(&self) -> &ExprKind {
        &self.0
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Serializes through to the wrapped `ExprKind`; identity (the `Rc`
/// pointer) isn't meaningful data and can't survive a round-trip anyway.
impl Serialize for Expr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ExprKind::deserialize(deserializer).map(Expr::new)
    }
}

/// The sealed expression sum (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ExprKind {
    Identifier(Identifier),
    Literal(Literal),
    MessageSend(MessageSend),
    Binary(Binary),
    Assignment(Assignment),
    Navigation(Navigation),
    Block(Block),
}

/// A bare name. Names starting with `@` denote globals; the `@` is part of
/// `name` so that source text round-trips and the resolver decides the
/// category (spec §3 invariants, §4.4).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_global(&self) -> bool {
        self.name.starts_with('@')
    }

    /// Name with the `@` sigil stripped, for partition lookup.
    pub fn bare_name(&self) -> &str {
        self.name.strip_prefix('@').unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    /// Arbitrary-precision decimal, per spec §3 ("decimal number
    /// (arbitrary-precision)"); canonical string form is what the code
    /// generator re-emits (spec §4.6, "Numbers emit ... from their
    /// canonical string form").
    Number(BigDecimal),
    Boolean(bool),
    Null,
    List(Vec<Expr>),
    Set(Vec<SetElement>),
    Map(Vec<(Expr, Expr)>),
}

/// A set literal element: either a plain expression or a `start to: end`
/// range (spec §4.6, "Set literals with ranges").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SetElement {
    Single(Expr),
    Range { start: Expr, end: Expr },
}

/// Binary operator tag. Numeric-vs-string semantics are decided by the
/// type inferer/generator, not by the tag itself (spec §4.1 edge-case
/// policy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Equals,
    NotEquals,
    Greater,
    GreaterEq,
    Less,
    LessEq,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Greater
                | BinaryOp::GreaterEq
                | BinaryOp::Less
                | BinaryOp::LessEq
                | BinaryOp::Equals
                | BinaryOp::NotEquals
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Binary {
    pub left: Expr,
    pub op: BinaryOp,
    pub right: Expr,
}

/// `target := value`. `target` must be an identifier or a navigation chain
/// (spec §3 invariants); the analyzer enforces which.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Expr,
    pub value: Expr,
}

/// A dotted property-access chain: `receiver.p1.p2...`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Navigation {
    pub receiver: Expr,
    pub path: Vec<String>,
}

/// Smalltalk-style message sends (spec §3, GLOSSARY "Message send").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MessageSend {
    /// `receiver selector`, e.g. `x size`.
    Unary { receiver: Expr, selector: String },
    /// `receiver k1: a1 k2: a2 ...`. Multi-part keywords compose into one
    /// method name by concatenation with inner parts capitalized
    /// (spec §3: `scaleBy:thenAdd:` -> `scaleByThenAdd`).
    Keyword {
        receiver: Expr,
        parts: Vec<(String, Expr)>,
    },
    /// `receiver!`: the `!` suffix invocation of a no-arg functional
    /// receiver.
    Default { receiver: Expr },
}

impl MessageSend {
    pub fn receiver(&self) -> &Expr {
        match self {
            MessageSend::Unary { receiver, .. }
            | MessageSend::Keyword { receiver, .. }
            | MessageSend::Default { receiver } => receiver,
        }
    }

    /// The composed method name the generator would emit for this send,
    /// per spec §3's multi-keyword composition rule.
    pub fn method_name(&self) -> String {
        match self {
            MessageSend::Unary { selector, .. } => selector.clone(),
            MessageSend::Default { .. } => String::new(),
            MessageSend::Keyword { parts, .. } => compose_keyword_name(parts),
        }
    }
}

/// `k1: a1 k2: a2` -> `k1K2`. The first keyword keeps its case; every
/// subsequent keyword is capitalized and appended (spec §3, §4.6).
pub fn compose_keyword_name(parts: &[(String, Expr)]) -> String {
    let mut out = String::new();
    for (i, (keyword, _)) in parts.iter().enumerate() {
        if i == 0 {
            out.push_str(keyword);
        } else {
            out.push_str(&capitalize(keyword));
        }
    }
    out
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// A block / closure: `[:p1 :p2 | stmt*]`.
///
/// Implicit-parameter blocks (`[| active]`) carry `implicit = true`; the
/// generator rewrites their body once, before type inference, so that
/// inferred types and generated code stay consistent (spec §4.6, §9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub params: Vec<String>,
    pub statements: Vec<crate::stmt::Stmt>,
    pub implicit: bool,
}

impl Block {
    /// Synthetic parameter name used by implicit-parameter blocks.
    pub const IMPLICIT_PARAM: &'static str = "it";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_identity_not_structural_equality() {
        let a = Expr::new(ExprKind::Literal(Literal::Boolean(true)));
        let b = Expr::new(ExprKind::Literal(Literal::Boolean(true)));
        assert_ne!(a, b, "structurally-identical but distinct exprs must differ");
        assert_eq!(a.clone(), a, "clones of the same handle are identical");
    }

    #[test]
    fn global_identifier_strips_sigil() {
        let id = Identifier::new("@limit");
        assert!(id.is_global());
        assert_eq!(id.bare_name(), "limit");
    }

    #[test]
    fn multi_keyword_composes_camel_case() {
        let recv = Expr::new(ExprKind::Identifier(Identifier::new("x")));
        let parts = vec![
            ("scaleBy".to_string(), recv.clone()),
            ("thenAdd".to_string(), recv),
        ];
        assert_eq!(compose_keyword_name(&parts), "scaleByThenAdd");
    }

    #[test]
    fn expr_round_trips_through_json_by_structure_not_identity() {
        let original = Expr::new(ExprKind::Binary(Binary {
            left: Expr::new(ExprKind::Identifier(Identifier::new("@limit"))),
            op: BinaryOp::GreaterEq,
            right: Expr::new(ExprKind::Literal(Literal::Number("10".parse().unwrap()))),
        }));
        let json = serde_json::to_string(&original).unwrap();
        let restored: Expr = serde_json::from_str(&json).unwrap();
        assert_ne!(
            original, restored,
            "deserializing builds a fresh node, not the original handle"
        );
        match restored.kind() {
            ExprKind::Binary(bin) => assert_eq!(bin.op, BinaryOp::GreaterEq),
            other => panic!("expected Binary, got {other:?}"),
        }
    }
}
