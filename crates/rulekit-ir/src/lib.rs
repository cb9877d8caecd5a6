//! Sealed intermediate representation for the rulekit business-rules DSL.
//!
//! This crate is pure data: a module tree (`module`), the statement and
//! expression sums that populate it (`stmt`, `expr`), and a conservative
//! model of the embedding host runtime's types (`types`). It carries no
//! pipeline behavior — name resolution, type inference, validation, and
//! code generation all live in `rulekit-compiler`.

pub mod expr;
pub mod module;
pub mod stmt;
pub mod types;

pub use expr::{
    Assignment, Binary, BinaryOp, Block, Expr, ExprKind, Identifier, Literal, MessageSend,
    Navigation, SetElement,
};
pub use module::{
    Cell, CellOp, ColumnRole, DataTable, DecisionColumn, DecisionRow, DecisionTableRule, Fact,
    Global, Import, Output, Rule, RuleModule, SimpleRule, TemplateRule,
};
pub use stmt::Stmt;
pub use types::{ClassKind, ClassType, Primitive, Type};
