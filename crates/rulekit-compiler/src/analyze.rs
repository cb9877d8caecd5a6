//! Semantic analysis (spec §4.5).
//!
//! Two entry points, run at different pipeline stages (documented in
//! `DESIGN.md`):
//!
//! - [`validate_table_structure`] runs *before* decision-table/template-rule
//!   expansion and checks the table-specific hygiene rules (checks 5 and 6)
//!   while the raw column/alias structure is still available.
//! - [`analyze`] runs *after* expansion, once every rule is a flat
//!   `SimpleRule`, and performs duplicate detection, identifier resolution,
//!   assignment legality, and the structural half of when-clause shape
//!   (checks 1 through 4).
//! - [`check_when_clause_types`] performs the remaining, type-dependent half
//!   of check 4 once a [`TypeCache`] is available (type inference runs
//!   after `analyze`, since it needs the fully expanded rule list too).

use std::collections::{HashMap, HashSet};

use rulekit_ir::{ColumnRole, Expr, ExprKind, Literal, Rule, RuleModule, SetElement, Stmt, TemplateRule};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::infer::TypeCache;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    When,
    ThenElse,
}

struct Scope<'m> {
    facts: &'m HashSet<String>,
    outputs: &'m HashSet<String>,
    data_tables: &'m HashSet<String>,
    globals: &'m HashSet<String>,
    locals: HashSet<String>,
}

impl<'m> Scope<'m> {
    fn new(
        facts: &'m HashSet<String>,
        outputs: &'m HashSet<String>,
        data_tables: &'m HashSet<String>,
        globals: &'m HashSet<String>,
    ) -> Self {
        Self {
            facts,
            outputs,
            data_tables,
            globals,
            locals: HashSet::new(),
        }
    }

    fn child(&self) -> Scope<'m> {
        Scope {
            facts: self.facts,
            outputs: self.outputs,
            data_tables: self.data_tables,
            globals: self.globals,
            locals: self.locals.clone(),
        }
    }

    fn resolves(&self, name: &str) -> bool {
        self.locals.contains(name)
            || self.facts.contains(name)
            || self.outputs.contains(name)
            || self.data_tables.contains(name)
    }
}

/// Entry point for the expanded, flat rule set (spec §4.5 checks 1-4).
pub fn analyze(module: &RuleModule) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    check_duplicates(
        module.imports.iter().map(|i| i.alias.as_str()),
        DiagnosticKind::DuplicateImportAlias,
        &mut diagnostics,
    );
    check_duplicates(
        module.facts.iter().map(|f| f.name.as_str()),
        DiagnosticKind::DuplicateFact,
        &mut diagnostics,
    );
    check_duplicates(
        module.globals.iter().map(|g| g.name.as_str()),
        DiagnosticKind::DuplicateGlobal,
        &mut diagnostics,
    );
    check_duplicates(
        module.outputs.iter().map(|o| o.name.as_str()),
        DiagnosticKind::DuplicateOutput,
        &mut diagnostics,
    );
    check_duplicates(
        module.data_tables.iter().map(|t| t.id.as_str()),
        DiagnosticKind::DuplicateDataTable,
        &mut diagnostics,
    );
    check_duplicates(
        module.rules.iter().map(Rule::id),
        DiagnosticKind::DuplicateRule,
        &mut diagnostics,
    );
    for rule in &module.rules {
        if let Rule::DecisionTable(dt) = rule {
            check_duplicates(
                dt.rows.iter().map(|r| r.id.as_str()),
                DiagnosticKind::DuplicateDecisionRow,
                &mut diagnostics,
            );
        }
    }
    check_name_collisions(module, &mut diagnostics);

    let facts: HashSet<String> = module.facts.iter().map(|f| f.name.clone()).collect();
    let outputs: HashSet<String> = module.outputs.iter().map(|o| o.name.clone()).collect();
    let data_tables: HashSet<String> = module.data_tables.iter().map(|t| t.id.clone()).collect();
    let globals: HashSet<String> = module.globals.iter().map(|g| g.name.clone()).collect();

    for rule in &module.rules {
        match rule {
            Rule::Simple(r) => {
                let mut scope = Scope::new(&facts, &outputs, &data_tables, &globals);
                let when_expr_count =
                    walk_statements(&r.when, Section::When, &mut scope, &mut diagnostics);
                if when_expr_count > 1 {
                    diagnostics
                        .report(DiagnosticKind::WhenClauseMultipleBareExpressions, None)
                        .message(format!(
                            "rule '{}' has more than one bare expression statement in its when-clause",
                            r.id
                        ))
                        .emit();
                }
                walk_statements(&r.then, Section::ThenElse, &mut scope, &mut diagnostics);
                if let Some(else_) = &r.else_ {
                    walk_statements(else_, Section::ThenElse, &mut scope, &mut diagnostics);
                }
            }
            // Decision-table and template rules are expected to have been
            // replaced by `expand` before this runs; nothing left to check.
            Rule::Template(_) | Rule::DecisionTable(_) => {}
        }
    }

    diagnostics
}

/// The type-dependent half of when-clause shape checking (spec §4.5 check
/// 4's "single boolean-typed expression"); run once type inference has
/// populated `cache`.
pub fn check_when_clause_types(module: &RuleModule, cache: &TypeCache, diagnostics: &mut Diagnostics) {
    for rule in &module.rules {
        let Rule::Simple(r) = rule else { continue };
        let expr_stmts: Vec<&Expr> = r.when.iter().filter_map(Stmt::as_expr).collect();
        let [only] = expr_stmts[..] else { continue };
        if !cache.type_of(only).is_boolean() {
            diagnostics
                .report(DiagnosticKind::WhenClauseNotBoolean, None)
                .message(format!(
                    "rule '{}' when-clause does not evaluate to a boolean",
                    r.id
                ))
                .emit();
        }
    }
}

fn check_duplicates<'n>(
    names: impl Iterator<Item = &'n str>,
    kind: DiagnosticKind,
    diagnostics: &mut Diagnostics,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            diagnostics
                .report(kind, None)
                .message(format!("duplicate declaration: '{name}'"))
                .emit();
        }
    }
}

fn check_name_collisions(module: &RuleModule, diagnostics: &mut Diagnostics) {
    let mut seen: HashMap<String, &'static str> = HashMap::new();
    let categorized = module
        .facts
        .iter()
        .map(|f| (f.name.clone(), "fact"))
        .chain(module.outputs.iter().map(|o| (o.name.clone(), "output")))
        .chain(module.data_tables.iter().map(|t| (t.id.clone(), "data table")));
    for (name, category) in categorized {
        match seen.get(&name) {
            Some(prev) if *prev != category => {
                diagnostics
                    .report(DiagnosticKind::NameCollision, None)
                    .message(format!(
                        "'{name}' is declared as both a {prev} and a {category}"
                    ))
                    .emit();
            }
            _ => {
                seen.insert(name, category);
            }
        }
    }
}

/// Walks a statement list, checking identifier resolution and assignment
/// legality; returns the count of bare expression statements (used for the
/// when-clause multiplicity check).
fn walk_statements(
    stmts: &[Stmt],
    section: Section,
    scope: &mut Scope<'_>,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut expr_count = 0;
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, value } => {
                walk_expr(value, section, scope, diagnostics);
                scope.locals.insert(name.clone());
            }
            Stmt::Expr(expr) => {
                expr_count += 1;
                walk_expr(expr, section, scope, diagnostics);
            }
        }
    }
    expr_count
}

fn walk_expr(expr: &Expr, section: Section, scope: &mut Scope<'_>, diagnostics: &mut Diagnostics) {
    match expr.kind() {
        ExprKind::Identifier(id) => {
            if id.is_global() {
                if !scope.globals.contains(id.bare_name()) {
                    diagnostics
                        .report(DiagnosticKind::UnresolvedGlobal, None)
                        .message(format!("unresolved global '{}'", id.name))
                        .emit();
                }
            } else if !scope.resolves(&id.name) {
                diagnostics
                    .report(DiagnosticKind::UnresolvedIdentifier, None)
                    .message(format!("unresolved identifier '{}'", id.name))
                    .emit();
            }
        }
        ExprKind::Literal(lit) => walk_literal(lit, section, scope, diagnostics),
        ExprKind::Navigation(nav) => walk_expr(&nav.receiver, section, scope, diagnostics),
        ExprKind::Binary(bin) => {
            walk_expr(&bin.left, section, scope, diagnostics);
            walk_expr(&bin.right, section, scope, diagnostics);
        }
        ExprKind::Assignment(assign) => {
            check_assignment_target(&assign.target, section, scope, diagnostics);
            walk_expr(&assign.value, section, scope, diagnostics);
        }
        ExprKind::MessageSend(send) => {
            walk_expr(send.receiver(), section, scope, diagnostics);
            if let rulekit_ir::MessageSend::Keyword { parts, .. } = send {
                for (_, arg) in parts {
                    walk_expr(arg, section, scope, diagnostics);
                }
            }
        }
        ExprKind::Block(block) => {
            let mut child = scope.child();
            for param in &block.params {
                child.locals.insert(param.clone());
            }
            walk_statements(&block.statements, section, &mut child, diagnostics);
        }
    }
}

fn walk_literal(lit: &Literal, section: Section, scope: &mut Scope<'_>, diagnostics: &mut Diagnostics) {
    match lit {
        Literal::List(items) => {
            for item in items {
                walk_expr(item, section, scope, diagnostics);
            }
        }
        Literal::Set(elements) => {
            for e in elements {
                match e {
                    SetElement::Single(e) => walk_expr(e, section, scope, diagnostics),
                    SetElement::Range { start, end } => {
                        walk_expr(start, section, scope, diagnostics);
                        walk_expr(end, section, scope, diagnostics);
                    }
                }
            }
        }
        Literal::Map(pairs) => {
            for (k, v) in pairs {
                walk_expr(k, section, scope, diagnostics);
                walk_expr(v, section, scope, diagnostics);
            }
        }
        Literal::String(_) | Literal::Number(_) | Literal::Boolean(_) | Literal::Null => {}
    }
}

/// `target := value` legality (spec §4.5 check 3). Navigation assignments
/// are only checked structurally here — whether the chain's root is a
/// fact/output; whether the terminal property actually has a setter is a
/// host-reflection question the generator tolerates best-effort.
fn check_assignment_target(
    target: &Expr,
    section: Section,
    scope: &Scope<'_>,
    diagnostics: &mut Diagnostics,
) {
    match target.kind() {
        ExprKind::Identifier(id) => {
            let legal = match section {
                Section::When => scope.locals.contains(&id.name),
                Section::ThenElse => scope.outputs.contains(&id.name),
            };
            if !legal {
                diagnostics
                    .report(DiagnosticKind::IllegalAssignmentTarget, None)
                    .message(format!(
                        "'{}' is not a legal assignment target in this section",
                        id.name
                    ))
                    .emit();
            }
        }
        ExprKind::Navigation(nav) => {
            if section == Section::When {
                diagnostics
                    .report(DiagnosticKind::IllegalAssignmentTarget, None)
                    .message("navigation assignment is not permitted in a when-clause")
                    .emit();
                return;
            }
            let root_ok = match root_identifier(&nav.receiver) {
                Some(id) => scope.facts.contains(&id.name) || scope.outputs.contains(&id.name),
                None => false,
            };
            if !root_ok {
                diagnostics
                    .report(DiagnosticKind::IllegalAssignmentTarget, None)
                    .message("assignment target's navigation chain is not rooted in a fact or output")
                    .emit();
            }
        }
        _ => {
            diagnostics
                .report(DiagnosticKind::IllegalAssignmentTarget, None)
                .message("assignment target must be an identifier or navigation chain")
                .emit();
        }
    }
}

fn root_identifier(expr: &Expr) -> Option<&rulekit_ir::Identifier> {
    match expr.kind() {
        ExprKind::Identifier(id) => Some(id),
        ExprKind::Navigation(nav) => root_identifier(&nav.receiver),
        _ => None,
    }
}

/// Decision-table alias hygiene and template-rule column hygiene (spec
/// §4.5 checks 5 and 6), run before expansion.
pub fn validate_table_structure(module: &RuleModule, diagnostics: &mut Diagnostics) {
    for rule in &module.rules {
        match rule {
            Rule::DecisionTable(dt) => {
                for column in &dt.columns {
                    let alias_name = match &column.role {
                        ColumnRole::WhenAlias(name) | ColumnRole::ThenAlias(name) => Some(name),
                        ColumnRole::WhenExpr(_) | ColumnRole::ThenAssign(_) => None,
                    };
                    if let Some(name) = alias_name {
                        if !dt.aliases.contains_key(name) {
                            diagnostics
                                .report(DiagnosticKind::MissingAlias, None)
                                .message(format!(
                                    "decision table '{}' references undeclared alias '{name}'",
                                    dt.id
                                ))
                                .emit();
                        }
                    }
                }
                for (name, body) in &dt.aliases {
                    if !matches!(body.kind(), ExprKind::Block(_)) {
                        diagnostics
                            .report(DiagnosticKind::UnparseableAliasBody, None)
                            .message(format!(
                                "alias '{name}' in decision table '{}' is not a block expression",
                                dt.id
                            ))
                            .emit();
                    }
                }
            }
            Rule::Template(t) => validate_template_columns(module, t, diagnostics),
            Rule::Simple(_) => {}
        }
    }
}

fn validate_template_columns(module: &RuleModule, rule: &TemplateRule, diagnostics: &mut Diagnostics) {
    let Some(table) = module.data_table(&rule.data_table_id) else {
        return;
    };
    let header_columns: HashSet<&str> = table.columns().into_iter().collect();

    for (i, row) in table.rows.iter().enumerate() {
        let row_columns: HashSet<&str> = row.keys().map(String::as_str).collect();
        if row_columns != header_columns {
            diagnostics
                .report(DiagnosticKind::TemplateColumnMismatch, None)
                .message(format!(
                    "template rule '{}' row {i} declares a different column set than the table header",
                    rule.id
                ))
                .emit();
        }
    }

    let used = collect_identifier_names(&rule.when)
        .into_iter()
        .chain(collect_identifier_names(&rule.then))
        .collect::<HashSet<_>>();
    for column in header_columns {
        if !used.contains(column) {
            diagnostics
                .report(DiagnosticKind::TemplateColumnNotInScope, None)
                .message(format!(
                    "template rule '{}' column '{column}' is never referenced in its body",
                    rule.id
                ))
                .emit();
        }
    }
}

fn collect_identifier_names(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    fn walk(expr: &Expr, names: &mut HashSet<String>) {
        match expr.kind() {
            ExprKind::Identifier(id) if !id.is_global() => {
                names.insert(id.name.clone());
            }
            ExprKind::Identifier(_) => {}
            ExprKind::Literal(Literal::List(items)) => items.iter().for_each(|e| walk(e, names)),
            ExprKind::Literal(Literal::Set(elements)) => {
                for e in elements {
                    match e {
                        SetElement::Single(e) => walk(e, names),
                        SetElement::Range { start, end } => {
                            walk(start, names);
                            walk(end, names);
                        }
                    }
                }
            }
            ExprKind::Literal(Literal::Map(pairs)) => {
                for (k, v) in pairs {
                    walk(k, names);
                    walk(v, names);
                }
            }
            ExprKind::Literal(_) => {}
            ExprKind::Navigation(nav) => walk(&nav.receiver, names),
            ExprKind::Binary(bin) => {
                walk(&bin.left, names);
                walk(&bin.right, names);
            }
            ExprKind::Assignment(assign) => {
                walk(&assign.target, names);
                walk(&assign.value, names);
            }
            ExprKind::MessageSend(send) => {
                walk(send.receiver(), names);
                if let rulekit_ir::MessageSend::Keyword { parts, .. } = send {
                    for (_, arg) in parts {
                        walk(arg, names);
                    }
                }
            }
            ExprKind::Block(block) => {
                for stmt in &block.statements {
                    match stmt {
                        Stmt::Let { value, .. } => walk(value, names),
                        Stmt::Expr(e) => walk(e, names),
                    }
                }
            }
        }
    }
    for stmt in stmts {
        match stmt {
            Stmt::Let { value, .. } => walk(value, &mut names),
            Stmt::Expr(e) => walk(e, &mut names),
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_ir::{Fact, Identifier, Output, SimpleRule};

    fn module_with_fact_and_output() -> RuleModule {
        let mut m = RuleModule::new();
        m.facts.push(Fact {
            name: "item".to_string(),
            qualified_type_name: "Item".to_string(),
            description: None,
        });
        m.outputs.push(Output {
            name: "discount".to_string(),
            qualified_type_name: "java.math.BigDecimal".to_string(),
            initial_value: None,
            description: None,
        });
        m
    }

    #[test]
    fn detects_duplicate_facts() {
        let mut m = RuleModule::new();
        for _ in 0..2 {
            m.facts.push(Fact {
                name: "item".to_string(),
                qualified_type_name: "Item".to_string(),
                description: None,
            });
        }
        let d = analyze(&m);
        assert!(d.has_errors());
    }

    #[test]
    fn detects_unresolved_identifier() {
        let m = module_with_fact_and_output();
        let mut m = m;
        m.rules.push(Rule::Simple(SimpleRule {
            id: "r1".to_string(),
            description: None,
            when: vec![Stmt::Expr(Expr::new(ExprKind::Identifier(Identifier::new(
                "nope",
            ))))],
            then: vec![],
            else_: None,
        }));
        let d = analyze(&m);
        assert!(d.has_errors());
    }

    #[test]
    fn legal_output_assignment_in_then() {
        let m = module_with_fact_and_output();
        let mut scope = Scope::new(
            &m.facts.iter().map(|f| f.name.clone()).collect(),
            &m.outputs.iter().map(|o| o.name.clone()).collect(),
            &HashSet::new(),
            &HashSet::new(),
        );
        let mut diagnostics = Diagnostics::new();
        let target = Expr::new(ExprKind::Identifier(Identifier::new("discount")));
        check_assignment_target(&target, Section::ThenElse, &mut scope, &mut diagnostics);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn illegal_fact_assignment_in_then() {
        let m = module_with_fact_and_output();
        let scope = Scope::new(
            &m.facts.iter().map(|f| f.name.clone()).collect(),
            &m.outputs.iter().map(|o| o.name.clone()).collect(),
            &HashSet::new(),
            &HashSet::new(),
        );
        let mut diagnostics = Diagnostics::new();
        let target = Expr::new(ExprKind::Identifier(Identifier::new("item")));
        check_assignment_target(&target, Section::ThenElse, &scope, &mut diagnostics);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn when_clause_multiplicity_rejected() {
        let m = module_with_fact_and_output();
        let mut m = m;
        m.rules.push(Rule::Simple(SimpleRule {
            id: "r1".to_string(),
            description: None,
            when: vec![
                Stmt::Expr(Expr::new(ExprKind::Literal(Literal::Boolean(true)))),
                Stmt::Expr(Expr::new(ExprKind::Literal(Literal::Boolean(false)))),
            ],
            then: vec![],
            else_: None,
        }));
        let d = analyze(&m);
        assert!(d.has_errors());
    }
}
