//! Decision-table and template-rule expansion (spec §4.7).
//!
//! Runs after [`crate::analyze::validate_table_structure`] (so structural
//! problems are already diagnosed) and before the general [`crate::analyze::analyze`]
//! pass and type inference, both of which only know how to walk flat
//! `SimpleRule`s. Produces a module where every `Rule::Template` and
//! `Rule::DecisionTable` has been replaced by one `Rule::Simple` per row,
//! in source order.

use rulekit_ir::{
    Assignment, Binary, Block, Cell, ColumnRole, DecisionTableRule, Expr, ExprKind, Literal, Rule,
    RuleModule, SetElement, SimpleRule, Stmt, TemplateRule,
};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

pub fn expand(module: &RuleModule, diagnostics: &mut Diagnostics) -> RuleModule {
    let mut out = RuleModule {
        imports: module.imports.clone(),
        facts: module.facts.clone(),
        globals: module.globals.clone(),
        outputs: module.outputs.clone(),
        data_tables: module.data_tables.clone(),
        rules: Vec::new(),
    };
    for rule in &module.rules {
        match rule {
            Rule::Simple(r) => out.rules.push(Rule::Simple(r.clone())),
            Rule::Template(r) => expand_template_rule(module, r, &mut out.rules),
            Rule::DecisionTable(r) => expand_decision_table(r, diagnostics, &mut out.rules),
        }
    }
    out
}

/// Spec §4.7, "Template-rule expansion": one simple rule per backing row,
/// when/then both prefixed with let-bindings for every column header.
fn expand_template_rule(module: &RuleModule, rule: &TemplateRule, out: &mut Vec<Rule>) {
    let Some(table) = module.data_table(&rule.data_table_id) else {
        return;
    };
    for (i, row) in table.rows.iter().enumerate() {
        let bindings: Vec<Stmt> = row
            .iter()
            .map(|(column, expr)| Stmt::let_binding(column.clone(), expr.clone()))
            .collect();

        let mut when = bindings.clone();
        when.extend(rule.when.iter().cloned());
        let mut then = bindings;
        then.extend(rule.then.iter().cloned());

        out.push(Rule::Simple(SimpleRule {
            id: format!("{}#{i}", rule.id),
            description: rule.description.clone(),
            when,
            then,
            else_: None,
        }));
    }
}

/// Spec §4.7, "Decision-table expansion", steps 1-4. A row missing a
/// declared column, or referencing an alias that fails to inline, is
/// skipped entirely (spec §7: "the affected row is skipped by the
/// expander").
fn expand_decision_table(rule: &DecisionTableRule, diagnostics: &mut Diagnostics, out: &mut Vec<Rule>) {
    'row: for row in &rule.rows {
        let mut when = Vec::new();
        let mut then = Vec::new();

        for column in &rule.columns {
            let Some(cell) = row.cells.get(&column.name) else {
                diagnostics
                    .report(DiagnosticKind::MissingAlias, None)
                    .message(format!(
                        "decision table '{}' row '{}' is missing column '{}'",
                        rule.id, row.id, column.name
                    ))
                    .emit();
                continue 'row;
            };

            match &column.role {
                ColumnRole::WhenExpr(header) => match cell {
                    Cell::Comparison(op, value) => when.push(Stmt::Expr(Expr::new(ExprKind::Binary(Binary {
                        left: header.clone(),
                        op: op.to_binary_op(),
                        right: value.clone(),
                    })))),
                    Cell::Wildcard | Cell::Value(_) => {}
                },
                ColumnRole::ThenAssign(target) => {
                    if let Cell::Value(value) = cell {
                        then.push(Stmt::Expr(Expr::new(ExprKind::Assignment(Assignment {
                            target: target.clone(),
                            value: value.clone(),
                        }))));
                    }
                }
                ColumnRole::WhenAlias(name) => match inline_alias(rule, name, cell, diagnostics) {
                    Some(stmts) => when.extend(stmts),
                    None => continue 'row,
                },
                ColumnRole::ThenAlias(name) => match inline_alias(rule, name, cell, diagnostics) {
                    Some(stmts) => then.extend(stmts),
                    None => continue 'row,
                },
            }
        }

        out.push(Rule::Simple(SimpleRule {
            id: format!("{}#{}", rule.id, row.id),
            description: rule.description.clone(),
            when,
            then,
            else_: None,
        }));
    }
}

/// Spec §4.7 step 3: a parameterless alias expands to its block's
/// statements verbatim; a one-parameter alias substitutes the cell's
/// expression for that parameter throughout the block.
fn inline_alias(
    rule: &DecisionTableRule,
    alias_name: &str,
    cell: &Cell,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<Stmt>> {
    let Some(body) = rule.aliases.get(alias_name) else {
        diagnostics
            .report(DiagnosticKind::MissingAlias, None)
            .message(format!(
                "decision table '{}' references undeclared alias '{alias_name}'",
                rule.id
            ))
            .emit();
        return None;
    };
    let ExprKind::Block(block) = body.kind() else {
        diagnostics
            .report(DiagnosticKind::UnparseableAliasBody, None)
            .message(format!(
                "alias '{alias_name}' in decision table '{}' is not a block expression",
                rule.id
            ))
            .emit();
        return None;
    };

    match block.params.as_slice() {
        [] => Some(block.statements.clone()),
        [param] => {
            let arg = match cell {
                Cell::Value(v) | Cell::Comparison(_, v) => v.clone(),
                Cell::Wildcard => return Some(block.statements.clone()),
            };
            Some(substitute_stmts(&block.statements, param, &arg))
        }
        _ => {
            diagnostics
                .report(DiagnosticKind::UnparseableAliasBody, None)
                .message(format!(
                    "alias '{alias_name}' declares more than one parameter, which is unsupported"
                ))
                .emit();
            None
        }
    }
}

fn substitute_stmts(stmts: &[Stmt], name: &str, replacement: &Expr) -> Vec<Stmt> {
    stmts
        .iter()
        .map(|s| match s {
            Stmt::Let { name: n, value } => Stmt::Let {
                name: n.clone(),
                value: substitute_expr(value, name, replacement),
            },
            Stmt::Expr(e) => Stmt::Expr(substitute_expr(e, name, replacement)),
        })
        .collect()
}

fn substitute_expr(expr: &Expr, name: &str, replacement: &Expr) -> Expr {
    match expr.kind() {
        ExprKind::Identifier(id) if !id.is_global() && id.name == name => replacement.clone(),
        ExprKind::Identifier(_) => expr.clone(),
        ExprKind::Literal(lit) => Expr::new(ExprKind::Literal(substitute_literal(lit, name, replacement))),
        ExprKind::Navigation(nav) => Expr::new(ExprKind::Navigation(rulekit_ir::Navigation {
            receiver: substitute_expr(&nav.receiver, name, replacement),
            path: nav.path.clone(),
        })),
        ExprKind::Binary(b) => Expr::new(ExprKind::Binary(Binary {
            left: substitute_expr(&b.left, name, replacement),
            op: b.op,
            right: substitute_expr(&b.right, name, replacement),
        })),
        ExprKind::Assignment(a) => Expr::new(ExprKind::Assignment(Assignment {
            target: substitute_expr(&a.target, name, replacement),
            value: substitute_expr(&a.value, name, replacement),
        })),
        ExprKind::MessageSend(send) => Expr::new(ExprKind::MessageSend(match send {
            rulekit_ir::MessageSend::Unary { receiver, selector } => rulekit_ir::MessageSend::Unary {
                receiver: substitute_expr(receiver, name, replacement),
                selector: selector.clone(),
            },
            rulekit_ir::MessageSend::Keyword { receiver, parts } => rulekit_ir::MessageSend::Keyword {
                receiver: substitute_expr(receiver, name, replacement),
                parts: parts
                    .iter()
                    .map(|(k, a)| (k.clone(), substitute_expr(a, name, replacement)))
                    .collect(),
            },
            rulekit_ir::MessageSend::Default { receiver } => rulekit_ir::MessageSend::Default {
                receiver: substitute_expr(receiver, name, replacement),
            },
        })),
        ExprKind::Block(block) => {
            if block.params.iter().any(|p| p == name) {
                expr.clone()
            } else {
                Expr::new(ExprKind::Block(Block {
                    params: block.params.clone(),
                    statements: substitute_stmts(&block.statements, name, replacement),
                    implicit: block.implicit,
                }))
            }
        }
    }
}

fn substitute_literal(lit: &Literal, name: &str, replacement: &Expr) -> Literal {
    match lit {
        Literal::List(items) => {
            Literal::List(items.iter().map(|e| substitute_expr(e, name, replacement)).collect())
        }
        Literal::Set(elements) => Literal::Set(
            elements
                .iter()
                .map(|e| match e {
                    SetElement::Single(e) => SetElement::Single(substitute_expr(e, name, replacement)),
                    SetElement::Range { start, end } => SetElement::Range {
                        start: substitute_expr(start, name, replacement),
                        end: substitute_expr(end, name, replacement),
                    },
                })
                .collect(),
        ),
        Literal::Map(pairs) => Literal::Map(
            pairs
                .iter()
                .map(|(k, v)| (substitute_expr(k, name, replacement), substitute_expr(v, name, replacement)))
                .collect(),
        ),
        other @ (Literal::String(_) | Literal::Number(_) | Literal::Boolean(_) | Literal::Null) => {
            other.clone()
        }
    }
}
