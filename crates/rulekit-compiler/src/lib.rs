//! Semantic analyzer, type resolver, and host-language code generator for
//! the rulekit business-rules DSL (spec §4, §6).
//!
//! [`compile`] wires the whole pipeline over a parsed [`RuleModule`]:
//!
//! ```text
//! rewrite -> validate_table_structure -> expand -> analyze
//!         -> infer -> check_when_clause_types -> codegen
//! ```
//!
//! `rewrite` and `validate_table_structure` run against the as-parsed
//! module, before decision tables and template rules are flattened, because
//! they need the original column/alias/row shape. `expand` then flattens
//! every rule to a [`rulekit_ir::SimpleRule`], at which point `analyze`'s
//! identifier-resolution and assignment-legality checks, and `infer`'s
//! type visitor, both run over a uniform module. `check_when_clause_types`
//! runs last among the checks because it needs `infer`'s `TypeCache`.

pub mod analyze;
pub mod codegen;
pub mod diagnostics;
pub mod expand;
pub mod infer;
pub mod resolver;
pub mod rewrite;

use std::rc::Rc;

use rulekit_ir::RuleModule;

use diagnostics::Diagnostics;
use infer::{InferContext, TypeCache};
use resolver::{HostClassLoader, Resolver};

/// Inputs that shape one compilation (spec §6, "Compile options").
pub struct CompileOptions<'a> {
    /// Name of the generated top-level class.
    pub class_name: String,
    /// Optional package/namespace declaration.
    pub package_name: Option<String>,
    /// Key used for the single output in `Outcome::Success` (spec §6).
    /// Defaults to `<class_name>.java` when unset.
    pub file_path: Option<String>,
    /// When `false`, compilation skips `infer`/`check_when_clause_types`
    /// entirely and the generator never sees host-runtime types — every
    /// navigation and dispatch decision degrades to its `Unknown`-typed
    /// fallback (spec §6, "type_class_loader absent when type inference is
    /// disabled").
    pub type_inference_enabled: bool,
    /// Reflection hook into the embedding host runtime; required when
    /// `type_inference_enabled` is `true`.
    pub type_class_loader: Option<&'a dyn HostClassLoader>,
    /// Emit null-safe `Optional`-chained navigation and warn on setter
    /// chains that can't be made null-safe (spec §4.6, §9 Open Question).
    pub generate_null_checks: bool,
}

impl<'a> CompileOptions<'a> {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            package_name: None,
            file_path: None,
            type_inference_enabled: false,
            type_class_loader: None,
            generate_null_checks: false,
        }
    }

    pub fn with_package(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    pub fn with_type_class_loader(mut self, loader: &'a dyn HostClassLoader) -> Self {
        self.type_inference_enabled = true;
        self.type_class_loader = Some(loader);
        self
    }

    pub fn with_null_checks(mut self, enabled: bool) -> Self {
        self.generate_null_checks = enabled;
        self
    }
}

/// The end result of [`compile`] (spec §6's `Success`/`Failure` sum).
/// Kept as a plain value rather than `Result<_, Error>` since a `Failure`
/// here is an expected, data-carrying outcome (accumulated diagnostics
/// against user-authored rules), not a programmer error.
#[derive(Debug)]
pub enum Outcome {
    Success {
        /// Path-string -> source-text (spec §6); exactly one entry today,
        /// keyed by `CompileOptions::file_path` (or `<class_name>.java`
        /// when unset), since the generator emits a single compilation unit.
        files: std::collections::HashMap<String, String>,
        warnings: Vec<String>,
    },
    Failure {
        errors: Vec<String>,
        warnings: Vec<String>,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Convenience accessor for the generator's single output, since
    /// `codegen::generate` never emits more than one file today.
    pub fn single_source(&self) -> Option<&str> {
        match self {
            Outcome::Success { files, .. } => files.values().next().map(String::as_str),
            Outcome::Failure { .. } => None,
        }
    }
}

/// Fatal, programmer-error conditions that abort compilation before any
/// diagnostic bag could even be built — never raised by malformed rule
/// source, only by misuse of the API itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("type inference is enabled but no type_class_loader was supplied")]
    MissingTypeClassLoader,
    #[error("`{0}` is not a legal host class name")]
    InvalidClassName(String),
    #[error("file_path must not be empty when set")]
    EmptyFilePath,
}

/// Run the full compilation pipeline over `module` (spec §6).
pub fn compile(module: &RuleModule, options: &CompileOptions<'_>) -> Result<Outcome, Error> {
    validate_options(options)?;

    let mut diagnostics = Diagnostics::new();

    let rewritten = rewrite::rewrite_implicit_blocks(module);
    analyze::validate_table_structure(&rewritten, &mut diagnostics);
    let structural = expand::expand(&rewritten, &mut diagnostics);
    diagnostics.extend(analyze::analyze(&structural));

    let resolver = match options.type_class_loader {
        Some(loader) => Resolver::new(loader),
        None => Resolver::disabled(),
    };
    let cache = Rc::new(TypeCache::new());
    if options.type_inference_enabled {
        let mut ctx = InferContext::for_module(&structural, &resolver, Rc::clone(&cache));
        for rule in &structural.rules {
            if let rulekit_ir::Rule::Simple(simple) = rule {
                ctx.infer_statements(&simple.when);
                ctx.infer_statements(&simple.then);
                if let Some(else_) = &simple.else_ {
                    ctx.infer_statements(else_);
                }
            }
        }
        analyze::check_when_clause_types(&structural, &cache, &mut diagnostics);
    }

    // Outputs never referenced by any rule degrade silently to their
    // initial value; flag that so the front-end can decide whether it's
    // dead configuration (spec §7 taxonomy, "UnusedOutput").
    flag_unused_outputs(&structural, &mut diagnostics);

    if diagnostics.has_errors() {
        return Ok(Outcome::Failure {
            errors: diagnostics.to_error_strings(),
            warnings: diagnostics.warnings().map(|d| d.render_line()).collect(),
        });
    }

    let source = codegen::generate(&structural, &resolver, &cache, options, &mut diagnostics);
    let mut files = std::collections::HashMap::new();
    files.insert(output_file_path(options), source);
    Ok(Outcome::Success {
        files,
        warnings: diagnostics.warnings().map(|d| d.render_line()).collect(),
    })
}

/// The key `Outcome::Success` uses for its single output (spec §6,
/// "`file_path`: key used for the single output in `Success`").
fn output_file_path(options: &CompileOptions<'_>) -> String {
    match &options.file_path {
        Some(path) => path.clone(),
        None => format!("{}.java", options.class_name),
    }
}

/// Malformed `CompileOptions` are a caller bug, not a defect in the
/// analyzed rule module, so they're rejected before any pass runs rather
/// than folded into the diagnostic bag (spec §9 "Open Questions" reasoning
/// extended to this supplemental check).
fn validate_options(options: &CompileOptions<'_>) -> Result<(), Error> {
    if options.type_inference_enabled && options.type_class_loader.is_none() {
        return Err(Error::MissingTypeClassLoader);
    }
    let is_legal_identifier = options
        .class_name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && options.class_name.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !is_legal_identifier {
        return Err(Error::InvalidClassName(options.class_name.clone()));
    }
    if options.file_path.as_deref() == Some("") {
        return Err(Error::EmptyFilePath);
    }
    Ok(())
}

fn flag_unused_outputs(module: &RuleModule, diagnostics: &mut Diagnostics) {
    let mut assigned = std::collections::HashSet::new();
    for rule in &module.rules {
        let rulekit_ir::Rule::Simple(simple) = rule else {
            continue;
        };
        collect_assigned_outputs(&simple.then, &mut assigned);
        if let Some(else_) = &simple.else_ {
            collect_assigned_outputs(else_, &mut assigned);
        }
    }
    for output in &module.outputs {
        if !assigned.contains(&output.name) {
            diagnostics
                .report(diagnostics::DiagnosticKind::UnusedOutput, None)
                .message(format!("output `{}` is never assigned by any rule", output.name))
                .emit();
        }
    }
}

fn collect_assigned_outputs(stmts: &[rulekit_ir::Stmt], assigned: &mut std::collections::HashSet<String>) {
    for stmt in stmts {
        if let rulekit_ir::Stmt::Expr(e) = stmt {
            collect_assigned_outputs_expr(e, assigned);
        }
    }
}

fn collect_assigned_outputs_expr(expr: &rulekit_ir::Expr, assigned: &mut std::collections::HashSet<String>) {
    use rulekit_ir::ExprKind;
    if let ExprKind::Assignment(a) = expr.kind() {
        if let ExprKind::Identifier(id) = a.target.kind() {
            assigned.insert(id.bare_name().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_ir::{Expr, ExprKind, Identifier, Literal, Output, Rule, SimpleRule, Stmt};

    fn module_with_one_rule() -> RuleModule {
        let mut m = RuleModule::new();
        m.outputs.push(Output {
            name: "approved".to_string(),
            qualified_type_name: "boolean".to_string(),
            initial_value: Some(Expr::new(ExprKind::Literal(Literal::Boolean(false)))),
            description: None,
        });
        let cond = Expr::new(ExprKind::Literal(Literal::Boolean(true)));
        let assign = Expr::new(ExprKind::Assignment(rulekit_ir::Assignment {
            target: Expr::new(ExprKind::Identifier(Identifier::new("approved"))),
            value: Expr::new(ExprKind::Literal(Literal::Boolean(true))),
        }));
        m.rules.push(Rule::Simple(SimpleRule {
            id: "approve".to_string(),
            description: None,
            when: vec![Stmt::Expr(cond)],
            then: vec![Stmt::Expr(assign)],
            else_: None,
        }));
        m
    }

    #[test]
    fn compiles_simple_module_to_success() {
        let module = module_with_one_rule();
        let options = CompileOptions::new("Approvals");
        let outcome = compile(&module, &options).expect("fatal error");
        match &outcome {
            Outcome::Success { files, .. } => {
                assert!(files.contains_key("Approvals.java"));
                let source = outcome.single_source().unwrap();
                assert!(source.contains("class Approvals"));
                assert!(source.contains("ruleApprove"));
                assert!(source.contains("evaluate"));
            }
            Outcome::Failure { errors, .. } => panic!("expected success, got {errors:?}"),
        }
    }

    #[test]
    fn missing_loader_with_inference_enabled_is_fatal() {
        let module = module_with_one_rule();
        let mut options = CompileOptions::new("Approvals");
        options.type_inference_enabled = true;
        let result = compile(&module, &options);
        assert!(matches!(result, Err(Error::MissingTypeClassLoader)));
    }

    #[test]
    fn illegal_class_name_is_rejected_before_any_pass_runs() {
        let module = module_with_one_rule();
        let options = CompileOptions::new("3Approvals");
        let result = compile(&module, &options);
        assert!(matches!(result, Err(Error::InvalidClassName(_))));
    }

    #[test]
    fn empty_file_path_is_rejected() {
        let module = module_with_one_rule();
        let mut options = CompileOptions::new("Approvals");
        options.file_path = Some(String::new());
        let result = compile(&module, &options);
        assert!(matches!(result, Err(Error::EmptyFilePath)));
    }

    #[test]
    fn unassigned_output_is_flagged_as_a_warning_not_a_failure() {
        let mut module = module_with_one_rule();
        module.outputs.push(Output {
            name: "dormant".to_string(),
            qualified_type_name: "boolean".to_string(),
            initial_value: None,
            description: None,
        });
        let options = CompileOptions::new("Approvals");
        let outcome = compile(&module, &options).expect("fatal error");
        match outcome {
            Outcome::Success { warnings, .. } => {
                assert!(warnings.iter().any(|w| w.contains("dormant")));
            }
            Outcome::Failure { errors, .. } => panic!("expected success, got {errors:?}"),
        }
    }

    #[test]
    fn generated_source_carries_package_fields_and_coerced_assignment() {
        let mut module = RuleModule::new();
        module.facts.push(rulekit_ir::Fact {
            name: "order".to_string(),
            qualified_type_name: "com.example.Order".to_string(),
            description: None,
        });
        module.outputs.push(Output {
            name: "discount".to_string(),
            qualified_type_name: "int".to_string(),
            initial_value: Some(Expr::new(ExprKind::Literal(Literal::Number("0".parse().unwrap())))),
            description: None,
        });
        let cond = Expr::new(ExprKind::Literal(Literal::Boolean(true)));
        let assign = Expr::new(ExprKind::Assignment(rulekit_ir::Assignment {
            target: Expr::new(ExprKind::Identifier(Identifier::new("discount"))),
            value: Expr::new(ExprKind::Literal(Literal::Number("5".parse().unwrap()))),
        }));
        module.rules.push(Rule::Simple(SimpleRule {
            id: "flat-discount".to_string(),
            description: None,
            when: vec![Stmt::Expr(cond)],
            then: vec![Stmt::Expr(assign)],
            else_: None,
        }));

        let mut options = CompileOptions::new("OrderRules").with_package("com.example.generated");
        options.file_path = Some("com/example/generated/OrderRules.java".to_string());
        let outcome = compile(&module, &options).expect("fatal error");
        let Outcome::Success { files, .. } = &outcome else {
            panic!("expected success");
        };
        assert!(files.contains_key("com/example/generated/OrderRules.java"));
        let source = outcome.single_source().unwrap();
        assert!(source.contains("package com.example.generated;"));
        assert!(source.contains("com.example.Order order"));
        assert!(source.contains("this.discount = toInt(new java.math.BigDecimal(\"5\"))"));
        assert!(source.contains("ruleFlatDiscount"));
        assert!(source.contains("public int getDiscount()"));
    }

    /// A module stored as JSON between sessions (e.g. a rule editor saving
    /// drafts) must compile identically to the in-memory module it was
    /// built from.
    #[test]
    fn module_round_tripped_through_json_compiles_to_the_same_source() {
        let module = module_with_one_rule();
        let json = serde_json::to_string(&module).unwrap();
        let restored: RuleModule = serde_json::from_str(&json).unwrap();

        let options = CompileOptions::new("Approvals");
        let original = compile(&module, &options).expect("fatal error");
        let round_tripped = compile(&restored, &options).expect("fatal error");
        assert_eq!(original.single_source(), round_tripped.single_source());
    }
}
