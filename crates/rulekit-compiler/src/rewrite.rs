//! Pure IR-to-IR rewriting passes that run before analysis (spec §9,
//! "Implicit-parameter blocks").
//!
//! Today this is a single pass: turning every implicit-parameter block
//! (`[| body]`) into an explicit one-parameter block over a synthetic `it`,
//! with every bare non-global identifier in the body rewritten to
//! `it.<name>`. Doing this once, immutably, up front keeps the type
//! visitor and the generator looking at the same tree.

use rulekit_ir::{
    Assignment, Binary, Block, Cell, ColumnRole, DataTable, DecisionColumn, DecisionRow,
    DecisionTableRule, Expr, ExprKind, Identifier, Literal, MessageSend, Navigation, Output, Rule,
    RuleModule, SetElement, SimpleRule, Stmt, TemplateRule,
};

pub fn rewrite_implicit_blocks(module: &RuleModule) -> RuleModule {
    RuleModule {
        imports: module.imports.clone(),
        facts: module.facts.clone(),
        globals: module.globals.clone(),
        outputs: module
            .outputs
            .iter()
            .map(|o| Output {
                name: o.name.clone(),
                qualified_type_name: o.qualified_type_name.clone(),
                initial_value: o.initial_value.as_ref().map(rewrite_expr),
                description: o.description.clone(),
            })
            .collect(),
        data_tables: rewrite_data_tables(&module.data_tables),
        rules: module.rules.iter().map(rewrite_rule).collect(),
    }
}

fn rewrite_data_tables(tables: &[DataTable]) -> Vec<DataTable> {
    tables
        .iter()
        .map(|t| DataTable {
            id: t.id.clone(),
            rows: t
                .rows
                .iter()
                .map(|row| row.iter().map(|(k, v)| (k.clone(), rewrite_expr(v))).collect())
                .collect(),
        })
        .collect()
}

fn rewrite_rule(rule: &Rule) -> Rule {
    match rule {
        Rule::Simple(r) => Rule::Simple(SimpleRule {
            id: r.id.clone(),
            description: r.description.clone(),
            when: rewrite_stmts(&r.when),
            then: rewrite_stmts(&r.then),
            else_: r.else_.as_ref().map(|e| rewrite_stmts(e)),
        }),
        Rule::Template(r) => Rule::Template(TemplateRule {
            id: r.id.clone(),
            description: r.description.clone(),
            data_table_id: r.data_table_id.clone(),
            when: rewrite_stmts(&r.when),
            then: rewrite_stmts(&r.then),
        }),
        Rule::DecisionTable(r) => Rule::DecisionTable(rewrite_decision_table(r)),
    }
}

fn rewrite_decision_table(r: &DecisionTableRule) -> DecisionTableRule {
    DecisionTableRule {
        id: r.id.clone(),
        description: r.description.clone(),
        columns: r
            .columns
            .iter()
            .map(|c| DecisionColumn {
                name: c.name.clone(),
                role: rewrite_column_role(&c.role),
            })
            .collect(),
        rows: r
            .rows
            .iter()
            .map(|row| DecisionRow {
                id: row.id.clone(),
                cells: row.cells.iter().map(|(k, v)| (k.clone(), rewrite_cell(v))).collect(),
            })
            .collect(),
        aliases: r.aliases.iter().map(|(k, v)| (k.clone(), rewrite_expr(v))).collect(),
    }
}

fn rewrite_column_role(role: &ColumnRole) -> ColumnRole {
    match role {
        ColumnRole::WhenExpr(e) => ColumnRole::WhenExpr(rewrite_expr(e)),
        ColumnRole::ThenAssign(e) => ColumnRole::ThenAssign(rewrite_expr(e)),
        ColumnRole::WhenAlias(n) => ColumnRole::WhenAlias(n.clone()),
        ColumnRole::ThenAlias(n) => ColumnRole::ThenAlias(n.clone()),
    }
}

fn rewrite_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Comparison(op, e) => Cell::Comparison(*op, rewrite_expr(e)),
        Cell::Wildcard => Cell::Wildcard,
        Cell::Value(e) => Cell::Value(rewrite_expr(e)),
    }
}

fn rewrite_stmts(stmts: &[Stmt]) -> Vec<Stmt> {
    stmts
        .iter()
        .map(|s| match s {
            Stmt::Let { name, value } => Stmt::Let {
                name: name.clone(),
                value: rewrite_expr(value),
            },
            Stmt::Expr(e) => Stmt::Expr(rewrite_expr(e)),
        })
        .collect()
}

fn rewrite_expr(expr: &Expr) -> Expr {
    match expr.kind() {
        ExprKind::Identifier(_) => expr.clone(),
        ExprKind::Literal(lit) => Expr::new(ExprKind::Literal(rewrite_literal(lit))),
        ExprKind::Navigation(nav) => Expr::new(ExprKind::Navigation(Navigation {
            receiver: rewrite_expr(&nav.receiver),
            path: nav.path.clone(),
        })),
        ExprKind::Binary(b) => Expr::new(ExprKind::Binary(Binary {
            left: rewrite_expr(&b.left),
            op: b.op,
            right: rewrite_expr(&b.right),
        })),
        ExprKind::Assignment(a) => Expr::new(ExprKind::Assignment(Assignment {
            target: rewrite_expr(&a.target),
            value: rewrite_expr(&a.value),
        })),
        ExprKind::MessageSend(send) => Expr::new(ExprKind::MessageSend(rewrite_message(send))),
        ExprKind::Block(block) => Expr::new(ExprKind::Block(rewrite_block(block))),
    }
}

fn rewrite_literal(lit: &Literal) -> Literal {
    match lit {
        Literal::List(items) => Literal::List(items.iter().map(rewrite_expr).collect()),
        Literal::Set(elements) => Literal::Set(
            elements
                .iter()
                .map(|e| match e {
                    SetElement::Single(e) => SetElement::Single(rewrite_expr(e)),
                    SetElement::Range { start, end } => SetElement::Range {
                        start: rewrite_expr(start),
                        end: rewrite_expr(end),
                    },
                })
                .collect(),
        ),
        Literal::Map(pairs) => {
            Literal::Map(pairs.iter().map(|(k, v)| (rewrite_expr(k), rewrite_expr(v))).collect())
        }
        other @ (Literal::String(_) | Literal::Number(_) | Literal::Boolean(_) | Literal::Null) => {
            other.clone()
        }
    }
}

fn rewrite_message(send: &MessageSend) -> MessageSend {
    match send {
        MessageSend::Unary { receiver, selector } => MessageSend::Unary {
            receiver: rewrite_expr(receiver),
            selector: selector.clone(),
        },
        MessageSend::Keyword { receiver, parts } => MessageSend::Keyword {
            receiver: rewrite_expr(receiver),
            parts: parts.iter().map(|(k, a)| (k.clone(), rewrite_expr(a))).collect(),
        },
        MessageSend::Default { receiver } => MessageSend::Default {
            receiver: rewrite_expr(receiver),
        },
    }
}

fn rewrite_block(block: &Block) -> Block {
    if block.implicit {
        Block {
            params: vec![Block::IMPLICIT_PARAM.to_string()],
            statements: rewrite_implicit_statements(&block.statements),
            implicit: false,
        }
    } else {
        Block {
            params: block.params.clone(),
            statements: rewrite_stmts(&block.statements),
            implicit: false,
        }
    }
}

/// The implicit-block body transform itself: every bare non-global
/// identifier becomes `Navigation(it, [name])`. A nested block is an
/// opaque boundary — it gets the ordinary [`rewrite_block`] treatment
/// (handling its own implicit flag independently), not outer substitution.
fn rewrite_implicit_statements(stmts: &[Stmt]) -> Vec<Stmt> {
    stmts
        .iter()
        .map(|s| match s {
            Stmt::Let { name, value } => Stmt::Let {
                name: name.clone(),
                value: rewrite_implicit_expr(value),
            },
            Stmt::Expr(e) => Stmt::Expr(rewrite_implicit_expr(e)),
        })
        .collect()
}

fn rewrite_implicit_expr(expr: &Expr) -> Expr {
    match expr.kind() {
        ExprKind::Identifier(id) if !id.is_global() => Expr::new(ExprKind::Navigation(Navigation {
            receiver: Expr::new(ExprKind::Identifier(Identifier::new(Block::IMPLICIT_PARAM))),
            path: vec![id.name.clone()],
        })),
        ExprKind::Identifier(_) => expr.clone(),
        ExprKind::Literal(lit) => Expr::new(ExprKind::Literal(rewrite_implicit_literal(lit))),
        ExprKind::Navigation(nav) => Expr::new(ExprKind::Navigation(Navigation {
            receiver: rewrite_implicit_expr(&nav.receiver),
            path: nav.path.clone(),
        })),
        ExprKind::Binary(b) => Expr::new(ExprKind::Binary(Binary {
            left: rewrite_implicit_expr(&b.left),
            op: b.op,
            right: rewrite_implicit_expr(&b.right),
        })),
        ExprKind::Assignment(a) => Expr::new(ExprKind::Assignment(Assignment {
            target: rewrite_implicit_expr(&a.target),
            value: rewrite_implicit_expr(&a.value),
        })),
        ExprKind::MessageSend(send) => Expr::new(ExprKind::MessageSend(match send {
            MessageSend::Unary { receiver, selector } => MessageSend::Unary {
                receiver: rewrite_implicit_expr(receiver),
                selector: selector.clone(),
            },
            MessageSend::Keyword { receiver, parts } => MessageSend::Keyword {
                receiver: rewrite_implicit_expr(receiver),
                parts: parts
                    .iter()
                    .map(|(k, a)| (k.clone(), rewrite_implicit_expr(a)))
                    .collect(),
            },
            MessageSend::Default { receiver } => MessageSend::Default {
                receiver: rewrite_implicit_expr(receiver),
            },
        })),
        ExprKind::Block(block) => Expr::new(ExprKind::Block(rewrite_block(block))),
    }
}

fn rewrite_implicit_literal(lit: &Literal) -> Literal {
    match lit {
        Literal::List(items) => Literal::List(items.iter().map(rewrite_implicit_expr).collect()),
        Literal::Set(elements) => Literal::Set(
            elements
                .iter()
                .map(|e| match e {
                    SetElement::Single(e) => SetElement::Single(rewrite_implicit_expr(e)),
                    SetElement::Range { start, end } => SetElement::Range {
                        start: rewrite_implicit_expr(start),
                        end: rewrite_implicit_expr(end),
                    },
                })
                .collect(),
        ),
        Literal::Map(pairs) => Literal::Map(
            pairs
                .iter()
                .map(|(k, v)| (rewrite_implicit_expr(k), rewrite_implicit_expr(v)))
                .collect(),
        ),
        other @ (Literal::String(_) | Literal::Number(_) | Literal::Boolean(_) | Literal::Null) => {
            other.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_ir::BinaryOp;

    #[test]
    fn implicit_identifier_becomes_it_navigation() {
        let body = vec![Stmt::Expr(Expr::new(ExprKind::Identifier(Identifier::new(
            "active",
        ))))];
        let block = Block {
            params: vec![],
            statements: body,
            implicit: true,
        };
        let rewritten = rewrite_block(&block);
        assert_eq!(rewritten.params, vec!["it".to_string()]);
        match &rewritten.statements[0] {
            Stmt::Expr(e) => match e.kind() {
                ExprKind::Navigation(nav) => {
                    assert_eq!(nav.path, vec!["active".to_string()]);
                    assert!(matches!(nav.receiver.kind(), ExprKind::Identifier(id) if id.name == "it"));
                }
                other => panic!("expected navigation, got {other:?}"),
            },
            other => panic!("expected expr stmt, got {other:?}"),
        }
    }

    #[test]
    fn implicit_binary_rewrites_both_sides() {
        let body = vec![Stmt::Expr(Expr::new(ExprKind::Binary(Binary {
            left: Expr::new(ExprKind::Identifier(Identifier::new("age"))),
            op: BinaryOp::GreaterEq,
            right: Expr::new(ExprKind::Literal(Literal::Number("18".parse().unwrap()))),
        })))];
        let block = Block {
            params: vec![],
            statements: body,
            implicit: true,
        };
        let rewritten = rewrite_block(&block);
        match &rewritten.statements[0] {
            Stmt::Expr(e) => match e.kind() {
                ExprKind::Binary(b) => {
                    assert!(matches!(b.left.kind(), ExprKind::Navigation(_)));
                }
                other => panic!("expected binary, got {other:?}"),
            },
            other => panic!("expected expr stmt, got {other:?}"),
        }
    }

    #[test]
    fn global_identifier_is_untouched() {
        let body = vec![Stmt::Expr(Expr::new(ExprKind::Identifier(Identifier::new(
            "@limit",
        ))))];
        let block = Block {
            params: vec![],
            statements: body,
            implicit: true,
        };
        let rewritten = rewrite_block(&block);
        assert!(matches!(
            rewritten.statements[0],
            Stmt::Expr(ref e) if matches!(e.kind(), ExprKind::Identifier(id) if id.name == "@limit")
        ));
    }
}
