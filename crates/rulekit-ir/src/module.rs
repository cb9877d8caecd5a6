//! The module tree (spec §3, "Module tree").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::stmt::Stmt;

/// `import Alias: fully.Qualified.Name`. Unique by alias within a module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Import {
    pub alias: String,
    pub qualified_type_name: String,
}

/// A read-only, property-accessible input object visible to rules by name.
/// Unique by name, never reassigned at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fact {
    pub name: String,
    pub qualified_type_name: String,
    pub description: Option<String>,
}

/// An ambient input referenced with the `@` sigil; otherwise identical to
/// a `Fact`. Unique by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub qualified_type_name: String,
    pub description: Option<String>,
}

/// A named, mutable slot updated by rules and exposed via a getter. Unique
/// by name; initialized once per evaluation from `initial_value` (or the
/// host type's default if absent).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub qualified_type_name: String,
    pub initial_value: Option<Expr>,
    pub description: Option<String>,
}

/// An ordered, named table of expression-valued rows, usable as a
/// dictionary (2 columns) or list-of-rows (N columns) — spec GLOSSARY.
/// Each row is an ordered mapping from column-header string to expression.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataTable {
    pub id: String,
    pub rows: Vec<IndexMap<String, Expr>>,
}

impl DataTable {
    /// Column headers in first-row order; empty if the table has no rows.
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|r| r.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_two_column(&self) -> bool {
        self.columns().len() == 2
    }
}

/// A single ordinary rule: `when ... then ... [else ...]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimpleRule {
    pub id: String,
    pub description: Option<String>,
    pub when: Vec<Stmt>,
    pub then: Vec<Stmt>,
    pub else_: Option<Vec<Stmt>>,
}

/// A rule parameterized by rows of a backing data table, expanded by
/// `rulekit_compiler::expand` to one simple rule per row (spec §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateRule {
    pub id: String,
    pub description: Option<String>,
    pub data_table_id: String,
    pub when: Vec<Stmt>,
    pub then: Vec<Stmt>,
}

/// Comparison operator recognized in a decision-table cell prefix
/// (spec §4.7: `=`, `~=`, `>`, `>=`, `<`, `<=`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CellOp {
    pub fn from_prefix(s: &str) -> Option<(Self, &str)> {
        let table: &[(&str, CellOp)] = &[
            (">=", CellOp::Gte),
            ("<=", CellOp::Lte),
            ("~=", CellOp::NotEq),
            ("=", CellOp::Eq),
            (">", CellOp::Gt),
            ("<", CellOp::Lt),
        ];
        for (prefix, op) in table {
            if let Some(rest) = s.strip_prefix(prefix) {
                return Some((*op, rest));
            }
        }
        None
    }

    pub fn to_binary_op(self) -> crate::expr::BinaryOp {
        use crate::expr::BinaryOp as B;
        match self {
            CellOp::Eq => B::Equals,
            CellOp::NotEq => B::NotEquals,
            CellOp::Gt => B::Greater,
            CellOp::Gte => B::GreaterEq,
            CellOp::Lt => B::Less,
            CellOp::Lte => B::LessEq,
        }
    }
}

/// The content of a single decision-table row cell, pre-expansion
/// (spec §4.7 step 1/2). A column's role (see [`ColumnRole`]) determines
/// how the cell combines with the column's header expression.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Cell {
    /// Cell began with a comparison operator: compose as `header op value`.
    Comparison(CellOp, Expr),
    /// Bare `*`: the column contributes no constraint (spec: "meaning
    /// boolean true").
    Wildcard,
    /// Any other cell content: either the then-column's assignment RHS, or
    /// the sole argument to an alias-reference column.
    Value(Expr),
}

/// How a decision-table column combines with its rows' cells
/// (spec §4.7 steps 1-2). The when/then split is carried on the variant
/// itself (rather than a separate side flag) since an alias-reference
/// column's expansion target — a when-comparison or a then-assignment —
/// depends on which side it sits on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ColumnRole {
    /// WHEN column with a header expression to compare cell values against.
    WhenExpr(Expr),
    /// WHEN column whose header is itself an alias reference (`#name`);
    /// the cell is the alias's sole argument, and the alias body becomes a
    /// when-clause constraint.
    WhenAlias(String),
    /// THEN column whose header is an assignment target (`result :=`); the
    /// cell supplies the right-hand side.
    ThenAssign(Expr),
    /// THEN column whose header is itself an alias reference (`#name`);
    /// the cell is the alias's sole argument, and the alias body becomes a
    /// then-clause effect.
    ThenAlias(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionColumn {
    pub name: String,
    pub role: ColumnRole,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionRow {
    pub id: String,
    /// Cell content keyed by column name; disjoint from [`DecisionColumn`]
    /// only by name lookup, never by position (tables may reorder).
    pub cells: IndexMap<String, Cell>,
}

/// A decision table: many rules, one per row, with WHEN/THEN columns and a
/// `where`-clause alias map providing reusable sub-expressions
/// (spec GLOSSARY, §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTableRule {
    pub id: String,
    pub description: Option<String>,
    pub columns: Vec<DecisionColumn>,
    pub rows: Vec<DecisionRow>,
    /// alias name -> its block expression, from the table's `where` clause.
    pub aliases: IndexMap<String, Expr>,
}

/// The tagged rule sum (spec §3, "Rule").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Rule {
    Simple(SimpleRule),
    Template(TemplateRule),
    DecisionTable(DecisionTableRule),
}

impl Rule {
    pub fn id(&self) -> &str {
        match self {
            Rule::Simple(r) => &r.id,
            Rule::Template(r) => &r.id,
            Rule::DecisionTable(r) => &r.id,
        }
    }
}

/// The parsed rule module: the root of the IR (spec §3).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuleModule {
    pub imports: Vec<Import>,
    pub facts: Vec<Fact>,
    pub globals: Vec<Global>,
    pub outputs: Vec<Output>,
    pub data_tables: Vec<DataTable>,
    pub rules: Vec<Rule>,
}

impl RuleModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_table(&self, id: &str) -> Option<&DataTable> {
        self.data_tables.iter().find(|t| t.id == id)
    }
}
