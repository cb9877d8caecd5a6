//! Statements (spec §3, "Statements").

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// One statement in a when-clause, then-clause, else-clause, or block body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Stmt {
    /// A bare expression; in a when-clause these (after removing lets) form
    /// the boolean precondition (spec §3 invariants).
    Expr(Expr),
    /// `name := bound_expr` introducing a scoped local. Scope is the
    /// enclosing statement list; when declared in a when-clause it leaks
    /// into the rule's then/else clauses (spec §3, §4.4 "Child scopes").
    Let { name: String, value: Expr },
}

impl Stmt {
    pub fn expr(e: Expr) -> Self {
        Stmt::Expr(e)
    }

    pub fn let_binding(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Let {
            name: name.into(),
            value,
        }
    }

    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Stmt::Expr(e) => Some(e),
            Stmt::Let { .. } => None,
        }
    }
}
