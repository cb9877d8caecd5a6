//! Code generation: lowers a fully analyzed, fully expanded [`RuleModule`]
//! into host-language source text (spec §4.6).
//!
//! By the time [`generate`] runs, every [`Rule`] is a [`SimpleRule`] —
//! templates and decision tables were already flattened by
//! [`crate::expand::expand`] — so this module only has one rule shape to
//! lower. It leans on the same [`Resolver`] and [`TypeCache`] the analyzer
//! built, re-deriving intermediate navigation-step types on the fly since
//! the cache only remembers a navigation's overall result type, not each
//! hop along the way.

mod naming;

use std::collections::HashMap;

use rulekit_ir::{
    Assignment, Binary, BinaryOp, Block, DataTable, Expr, ExprKind, Identifier, Literal,
    MessageSend, Navigation, Output, Primitive, Rule, RuleModule, SetElement, SimpleRule, Stmt,
    Type,
};

use crate::diagnostics::{DiagnosticKind, Diagnostics, Span};
use crate::infer::TypeCache;
use crate::resolver::Resolver;
use crate::CompileOptions;

pub use naming::{escape_string_literal, sanitize_identifier};

/// Lower `module` (already rewritten, validated, expanded, and type-checked)
/// into one host source file's text.
pub fn generate(
    module: &RuleModule,
    resolver: &Resolver<'_>,
    cache: &TypeCache,
    options: &CompileOptions<'_>,
    diagnostics: &mut Diagnostics,
) -> String {
    let mut gen = Generator::new(module, resolver, cache, options, diagnostics);
    gen.generate_module(module)
}

struct Generator<'a> {
    resolver: &'a Resolver<'a>,
    cache: &'a TypeCache,
    options: &'a CompileOptions<'a>,
    diagnostics: &'a mut Diagnostics,
    /// Names backed by an instance field (facts, globals, outputs, data
    /// tables): bare references to these lower to `this.<name>`, everything
    /// else is assumed local (spec §4.6 "Identifiers").
    field_names: std::collections::HashSet<String>,
    outputs: HashMap<String, Type>,
}

impl<'a> Generator<'a> {
    fn new(
        module: &RuleModule,
        resolver: &'a Resolver<'a>,
        cache: &'a TypeCache,
        options: &'a CompileOptions<'a>,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        let mut field_names = std::collections::HashSet::new();
        for f in &module.facts {
            field_names.insert(f.name.clone());
        }
        for g in &module.globals {
            field_names.insert(g.name.clone());
        }
        for o in &module.outputs {
            field_names.insert(o.name.clone());
        }
        for t in &module.data_tables {
            field_names.insert(t.id.clone());
        }
        let outputs = module
            .outputs
            .iter()
            .map(|o| (o.name.clone(), resolver.resolve(&o.qualified_type_name)))
            .collect();

        Self {
            resolver,
            cache,
            options,
            diagnostics,
            field_names,
            outputs,
        }
    }

    fn generate_module(&mut self, module: &RuleModule) -> String {
        let mut out = String::new();
        if let Some(package) = &self.options.package_name {
            out.push_str(&format!("package {package};\n\n"));
        }
        out.push_str("import java.util.Optional;\n\n");
        out.push_str(&format!("public final class {} {{\n", self.options.class_name));

        for f in &module.facts {
            out.push_str(&format!(
                "    private final {} {};\n",
                f.qualified_type_name,
                sanitize_identifier(&f.name)
            ));
        }
        for g in &module.globals {
            out.push_str(&format!(
                "    private final {} {};\n",
                g.qualified_type_name,
                sanitize_identifier(&g.name)
            ));
        }
        for o in &module.outputs {
            let init = match &o.initial_value {
                Some(expr) => self.lower_expr(expr),
                None => default_for_type(self.outputs.get(&o.name).unwrap_or(&Type::Unknown(None))),
            };
            out.push_str(&format!(
                "    private {} {} = {};\n",
                o.qualified_type_name,
                sanitize_identifier(&o.name),
                init
            ));
        }
        for t in &module.data_tables {
            out.push_str(&format!(
                "    private final Object {} = {};\n",
                sanitize_identifier(&t.id),
                self.lower_data_table(t)
            ));
        }
        out.push('\n');

        out.push_str(&self.generate_constructor(module));
        out.push('\n');

        let mut rule_method_names = Vec::new();
        for rule in &module.rules {
            let Rule::Simple(simple) = rule else {
                continue;
            };
            let method_name = format!("rule{}", sanitize_identifier(&capitalize_first(&simple.id)));
            out.push_str(&self.lower_simple_rule(simple, &method_name));
            out.push('\n');
            rule_method_names.push(method_name);
        }

        out.push_str("    public void evaluate() {\n");
        for name in &rule_method_names {
            out.push_str(&format!("        {name}();\n"));
        }
        out.push_str("    }\n\n");

        for o in &module.outputs {
            out.push_str(&self.lower_output_getter(o));
        }

        out.push_str("}\n");
        out
    }

    fn generate_constructor(&self, module: &RuleModule) -> String {
        let mut params = Vec::new();
        for f in &module.facts {
            params.push(format!("{} {}", f.qualified_type_name, sanitize_identifier(&f.name)));
        }
        for g in &module.globals {
            params.push(format!("{} {}", g.qualified_type_name, sanitize_identifier(&g.name)));
        }
        let mut body = String::new();
        for f in &module.facts {
            let n = sanitize_identifier(&f.name);
            body.push_str(&format!("        this.{n} = {n};\n"));
        }
        for g in &module.globals {
            let n = sanitize_identifier(&g.name);
            body.push_str(&format!("        this.{n} = {n};\n"));
        }
        format!(
            "    public {}({}) {{\n{}    }}\n",
            self.options.class_name,
            params.join(", "),
            body
        )
    }

    fn lower_output_getter(&self, output: &Output) -> String {
        format!(
            "    public {} get{}() {{\n        return this.{};\n    }}\n\n",
            output.qualified_type_name,
            rulekit_ir::capitalize(&sanitize_identifier(&output.name)),
            sanitize_identifier(&output.name)
        )
    }

    /// Two-column tables lower to a `Map<String, Object>`; wider tables
    /// lower to a `List<Map<String, Object>>`, one map per row
    /// (spec §4.6 "Data tables", GLOSSARY dictionary-vs-list-of-rows).
    fn lower_data_table(&mut self, table: &DataTable) -> String {
        if table.is_two_column() {
            let columns = table.columns();
            let (key_col, value_col) = (columns[0], columns[1]);
            let pairs: Vec<(String, String)> = table
                .rows
                .iter()
                .map(|row| {
                    let key = row
                        .get(key_col)
                        .map(|e| self.lower_expr(e))
                        .unwrap_or_else(|| "null".to_string());
                    let value = row
                        .get(value_col)
                        .map(|e| self.lower_expr(e))
                        .unwrap_or_else(|| "null".to_string());
                    (key, value)
                })
                .collect();
            if pairs.len() > 10 {
                let entries: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("java.util.Map.entry({key}, {value})"))
                    .collect();
                format!("java.util.Map.ofEntries({})", entries.join(", "))
            } else {
                let flat: Vec<String> = pairs
                    .into_iter()
                    .flat_map(|(key, value)| [key, value])
                    .collect();
                format!("java.util.Map.of({})", flat.join(", "))
            }
        } else {
            let rows: Vec<String> = table
                .rows
                .iter()
                .map(|row| {
                    let entries: Vec<String> = row
                        .iter()
                        .map(|(col, expr)| {
                            let value = self.lower_expr(expr);
                            format!("java.util.Map.entry(\"{}\", {value})", escape_string_literal(col))
                        })
                        .collect();
                    format!("java.util.Map.ofEntries({})", entries.join(", "))
                })
                .collect();
            format!("java.util.List.of({})", rows.join(", "))
        }
    }

    fn lower_simple_rule(&mut self, rule: &SimpleRule, method_name: &str) -> String {
        let mut preamble = String::new();
        let mut condition = None;
        for stmt in &rule.when {
            match stmt {
                Stmt::Let { name, value } => {
                    preamble.push_str(&format!(
                        "        var {} = {};\n",
                        sanitize_identifier(name),
                        self.lower_expr(value)
                    ));
                }
                Stmt::Expr(e) => condition = Some(self.lower_expr(e)),
            }
        }
        let condition = condition.unwrap_or_else(|| "true".to_string());

        let mut body = String::new();
        body.push_str(&preamble);
        body.push_str(&format!("        if ({condition}) {{\n"));
        for line in self.lower_statements(&rule.then) {
            body.push_str(&format!("            {line}\n"));
        }
        body.push_str("        }\n");
        if let Some(else_stmts) = &rule.else_ {
            body.push_str("        else {\n");
            for line in self.lower_statements(else_stmts) {
                body.push_str(&format!("            {line}\n"));
            }
            body.push_str("        }\n");
        }

        format!("    private void {method_name}() {{\n{body}    }}\n")
    }

    fn lower_statements(&mut self, stmts: &[Stmt]) -> Vec<String> {
        stmts
            .iter()
            .map(|stmt| match stmt {
                Stmt::Let { name, value } => {
                    format!("var {} = {};", sanitize_identifier(name), self.lower_expr(value))
                }
                Stmt::Expr(e) => format!("{};", self.lower_expr(e)),
            })
            .collect()
    }

    fn lower_expr(&mut self, expr: &Expr) -> String {
        match expr.kind() {
            ExprKind::Identifier(id) => self.lower_identifier(id),
            ExprKind::Literal(lit) => self.lower_literal(lit),
            ExprKind::Navigation(nav) => self.lower_navigation(nav),
            ExprKind::Binary(bin) => self.lower_binary(bin),
            ExprKind::Assignment(assign) => self.lower_assignment(assign),
            ExprKind::MessageSend(send) => self.lower_message(send),
            ExprKind::Block(block) => self.lower_block(block),
        }
    }

    fn lower_identifier(&self, id: &Identifier) -> String {
        if id.is_global() {
            return format!("this.{}", sanitize_identifier(id.bare_name()));
        }
        if self.field_names.contains(&id.name) {
            format!("this.{}", sanitize_identifier(&id.name))
        } else {
            sanitize_identifier(&id.name)
        }
    }

    fn lower_literal(&mut self, lit: &Literal) -> String {
        match lit {
            Literal::String(s) => format!("\"{}\"", escape_string_literal(s)),
            Literal::Number(n) => format!("new java.math.BigDecimal(\"{n}\")"),
            Literal::Boolean(b) => b.to_string(),
            Literal::Null => "null".to_string(),
            Literal::List(items) => {
                let items: Vec<String> = items.iter().map(|e| self.lower_expr(e)).collect();
                format!("java.util.List.of({})", items.join(", "))
            }
            Literal::Set(elements) => self.lower_set(elements),
            Literal::Map(pairs) => self.lower_map(pairs),
        }
    }

    /// Map literals over ten entries switch from the ten-argument
    /// `Map.of(k, v, ...)` overload (which doesn't exist past ten keys) to
    /// `Map.ofEntries(Map.entry(k, v), ...)` (spec §4.6 "Literals").
    fn lower_map(&mut self, pairs: &[(Expr, Expr)]) -> String {
        if pairs.len() > 10 {
            let entries: Vec<String> = pairs
                .iter()
                .map(|(k, v)| {
                    format!(
                        "java.util.Map.entry({}, {})",
                        self.lower_expr(k),
                        self.lower_expr(v)
                    )
                })
                .collect();
            format!("java.util.Map.ofEntries({})", entries.join(", "))
        } else {
            let flat: Vec<String> = pairs
                .iter()
                .flat_map(|(k, v)| [self.lower_expr(k), self.lower_expr(v)])
                .collect();
            format!("java.util.Map.of({})", flat.join(", "))
        }
    }

    /// Partitions set elements into plain values and `to:` ranges, emitting
    /// `range(start, end)` / `unionSets(a, b)` runtime-helper calls to
    /// combine them (spec §4.6 "Set literals with ranges").
    fn lower_set(&mut self, elements: &[SetElement]) -> String {
        let mut singles = Vec::new();
        let mut ranges = Vec::new();
        for element in elements {
            match element {
                SetElement::Single(e) => singles.push(self.lower_expr(e)),
                SetElement::Range { start, end } => {
                    ranges.push(format!("range({}, {})", self.lower_expr(start), self.lower_expr(end)));
                }
            }
        }
        let singleton_set = format!("java.util.Set.of({})", singles.join(", "));
        if ranges.is_empty() {
            return singleton_set;
        }
        let mut combined = ranges[0].clone();
        for extra in &ranges[1..] {
            combined = format!("unionSets({combined}, {extra})");
        }
        if singles.is_empty() {
            combined
        } else {
            format!("unionSets({combined}, {singleton_set})")
        }
    }

    /// Arithmetic/comparison lowers to the `*Numeric` runtime helpers so
    /// generated code never hand-rolls `BigDecimal` scale handling; `+`
    /// falls back to string concatenation when either operand is
    /// string-typed (spec §4.6 "Binary expressions").
    fn lower_binary(&mut self, bin: &Binary) -> String {
        let left_ty = self.cache.type_of(&bin.left);
        let right_ty = self.cache.type_of(&bin.right);
        let left = self.lower_expr(&bin.left);
        let right = self.lower_expr(&bin.right);
        match bin.op {
            BinaryOp::Plus if left_ty.is_string() || right_ty.is_string() => {
                format!("({left} + {right})")
            }
            BinaryOp::Plus => format!("addNumeric({left}, {right})"),
            BinaryOp::Minus => format!("subtractNumeric({left}, {right})"),
            BinaryOp::Multiply => format!("multiplyNumeric({left}, {right})"),
            BinaryOp::Divide => format!("divideNumeric({left}, {right})"),
            BinaryOp::Equals => format!("equalsNumericAware({left}, {right})"),
            BinaryOp::NotEquals => format!("(!equalsNumericAware({left}, {right}))"),
            BinaryOp::Greater => format!("(compareNumeric({left}, {right}) > 0)"),
            BinaryOp::GreaterEq => format!("(compareNumeric({left}, {right}) >= 0)"),
            BinaryOp::Less => format!("(compareNumeric({left}, {right}) < 0)"),
            BinaryOp::LessEq => format!("(compareNumeric({left}, {right}) <= 0)"),
        }
    }

    fn lower_assignment(&mut self, assign: &Assignment) -> String {
        let value = self.lower_expr(&assign.value);
        match assign.target.kind() {
            ExprKind::Identifier(id) => {
                let value = self.coerce_for_output(id.bare_name(), value);
                format!("{} = {}", self.lower_identifier(id), value)
            }
            ExprKind::Navigation(nav) => self.lower_navigation_assignment(nav, value),
            // The analyzer rejects every other target shape before codegen
            // runs; this is an unreachable fallback, not a silent success path.
            _ => value,
        }
    }

    /// Wraps the assigned value in the matching `toX` runtime coercion when
    /// the output's declared type is numeric (spec §4.6 "Assignment").
    fn coerce_for_output(&self, output_name: &str, value: String) -> String {
        let Some(ty) = self.outputs.get(output_name) else {
            return value;
        };
        let helper = match ty {
            Type::Primitive(Primitive::Int) => Some("toInt"),
            Type::Primitive(Primitive::Long) => Some("toLong"),
            Type::Primitive(Primitive::Float) => Some("toFloat"),
            Type::Primitive(Primitive::Double) => Some("toDouble"),
            Type::Class(c) if c.simple_name() == "BigInteger" => Some("toBigInteger"),
            Type::Class(c) if c.simple_name() == "BigDecimal" => Some("toBigDecimal"),
            _ => None,
        };
        match helper {
            Some(helper) => format!("{helper}({value})"),
            None => value,
        }
    }

    fn accessor_call(&self, owner: &Type, property: &str) -> String {
        let sanitized = sanitize_identifier(property);
        if owner.is_record() {
            format!("{sanitized}()")
        } else {
            format!("get{}()", rulekit_ir::capitalize(&sanitized))
        }
    }

    fn lower_navigation(&mut self, nav: &Navigation) -> String {
        let receiver_ty = self.cache.type_of(&nav.receiver);
        let receiver_code = self.lower_expr(&nav.receiver);
        self.lower_navigation_chain(receiver_code, receiver_ty, &nav.path)
    }

    fn lower_navigation_chain(&mut self, receiver_code: String, receiver_ty: Type, path: &[String]) -> String {
        if path.is_empty() {
            return receiver_code;
        }
        if receiver_ty.is_collection() {
            return self.lower_collection_navigation(receiver_code, receiver_ty.element_type(), path);
        }
        if self.options.generate_null_checks && path.len() > 1 {
            return self.lower_null_safe_navigation(receiver_code, receiver_ty, path);
        }
        let mut code = receiver_code;
        let mut ty = receiver_ty;
        for property in path {
            code = format!("{}.{}", code, self.accessor_call(&ty, property));
            ty = self.resolver.resolve_property(&ty, property);
        }
        code
    }

    /// Lowers collection navigation to a `.stream()` / `.map` / `.flatMap`
    /// chain terminated by `.toList()`, switching to `flatMap` whenever an
    /// intermediate hop is itself a collection (spec §4.6 "Navigation").
    fn lower_collection_navigation(&mut self, receiver_code: String, element_ty: Type, path: &[String]) -> String {
        let mut code = format!("{receiver_code}.stream()");
        let mut ty = element_ty;
        for property in path {
            let prop_ty = self.resolver.resolve_property(&ty, property);
            let accessor = self.accessor_call(&ty, property);
            if prop_ty.is_collection() {
                code = format!("{code}.flatMap(v -> v.{accessor}.stream())");
            } else {
                code = format!("{code}.map(v -> v.{accessor})");
            }
            ty = prop_ty;
        }
        format!("{code}.toList()")
    }

    /// Lowers multi-hop scalar navigation to a null-safe
    /// `Optional.ofNullable(...).map(...).orElse(null)` chain
    /// (spec §4.6 "Navigation", `generate_null_checks`). If an intermediate
    /// hop turns out to be a collection, the remaining suffix switches to
    /// collection lowering wrapped inside the `.map(...)`.
    fn lower_null_safe_navigation(&mut self, receiver_code: String, receiver_ty: Type, path: &[String]) -> String {
        let mut code = format!("java.util.Optional.ofNullable({receiver_code})");
        let mut ty = receiver_ty;
        for (i, property) in path.iter().enumerate() {
            let prop_ty = self.resolver.resolve_property(&ty, property);
            let accessor = self.accessor_call(&ty, property);
            if prop_ty.is_collection() {
                let remaining = &path[i + 1..];
                let inner = self.lower_collection_navigation(format!("v.{accessor}"), prop_ty.element_type(), remaining);
                code = format!("{code}.map(v -> {inner})");
                return format!("{code}.orElse(null)");
            }
            code = format!("{code}.map(v -> v.{accessor})");
            ty = prop_ty;
        }
        format!("{code}.orElse(null)")
    }

    /// Getter-chain-then-setter lowering for `receiver.path := value`
    /// (spec §4.6 "Navigation assignment"). Warns when `generate_null_checks`
    /// is on and the chain has more than one hop: an absent intermediate
    /// would NPE on the final setter call, the one place null-safety can't
    /// help (spec §9 Open Question).
    fn lower_navigation_assignment(&mut self, nav: &Navigation, value_code: String) -> String {
        if self.options.generate_null_checks && nav.path.len() > 1 {
            self.diagnostics
                .report(DiagnosticKind::NullSafeSetterChain, None::<Span>)
                .message(format!(
                    "assignment through `{}` chains {} hops; an absent intermediate will raise a null pointer exception at the final setter",
                    nav.path.join("."),
                    nav.path.len()
                ))
                .emit();
        }
        let receiver_ty = self.cache.type_of(&nav.receiver);
        let mut code = self.lower_expr(&nav.receiver);
        let mut ty = receiver_ty;
        for (i, property) in nav.path.iter().enumerate() {
            if i + 1 == nav.path.len() {
                code = format!(
                    "{code}.set{}({value_code})",
                    rulekit_ir::capitalize(&sanitize_identifier(property))
                );
            } else {
                code = format!("{}.{}", code, self.accessor_call(&ty, property));
                ty = self.resolver.resolve_property(&ty, property);
            }
        }
        code
    }

    fn lower_message(&mut self, send: &MessageSend) -> String {
        match send {
            MessageSend::Unary { receiver, selector } => self.lower_unary(receiver, selector),
            MessageSend::Keyword { receiver, parts } => self.lower_keyword(receiver, parts),
            MessageSend::Default { receiver } => self.lower_default(receiver),
        }
    }

    /// Unary-message dispatch table (spec §4.6 "Unary messages"): the
    /// collection-emptiness pairs special-case to `isEmpty()`-backed code,
    /// `sum` folds with the numeric runtime helper, everything else is a
    /// plain accessor call.
    fn lower_unary(&mut self, receiver: &Expr, selector: &str) -> String {
        let receiver_ty = self.cache.type_of(receiver);
        let receiver_code = self.lower_expr(receiver);
        let is_collection = receiver_ty.is_collection();
        match selector {
            "exists" | "notEmpty" if is_collection => format!("(!{receiver_code}.isEmpty())"),
            "empty" | "doesNotExist" if is_collection => format!("{receiver_code}.isEmpty()"),
            "sum" if is_collection => format!(
                "{receiver_code}.stream().reduce(java.math.BigDecimal.ZERO, (a, b) -> addNumeric(a, b), (a, b) -> addNumeric(a, b))"
            ),
            _ => format!("{receiver_code}.{selector}()"),
        }
    }

    fn lower_keyword(&mut self, receiver: &Expr, parts: &[(String, Expr)]) -> String {
        let receiver_ty = self.cache.type_of(receiver);
        let receiver_code = self.lower_expr(receiver);
        if parts.len() != 1 {
            let args: Vec<String> = parts.iter().map(|(_, a)| self.lower_expr(a)).collect();
            let name = rulekit_ir::compose_keyword_name(parts);
            return format!("{receiver_code}.{name}({})", args.join(", "));
        }

        let (keyword, arg) = &parts[0];
        if keyword == "ifTrue" || keyword == "ifFalse" {
            if let ExprKind::Block(block) = arg.kind() {
                let body = self.lower_block_as_statement(block);
                let condition = if keyword == "ifTrue" {
                    receiver_code
                } else {
                    format!("(!{receiver_code})")
                };
                return format!("if ({condition}) {body}");
            }
        }

        let arg_code = self.lower_expr(arg);
        self.lower_single_keyword(&receiver_code, &receiver_ty, keyword, &arg_code)
    }

    /// Single-keyword dispatch table (spec §4.6 "Keyword messages").
    fn lower_single_keyword(&self, receiver_code: &str, receiver_ty: &Type, keyword: &str, arg_code: &str) -> String {
        let is_collection = receiver_ty.is_collection();
        let is_map = receiver_ty.is_map();
        match keyword {
            "all" if is_collection => format!("{receiver_code}.stream().allMatch({arg_code})"),
            "each" if is_collection => format!("{receiver_code}.forEach({arg_code})"),
            "where" if is_collection => format!("{receiver_code}.stream().filter({arg_code}).toList()"),
            "at" if is_map => format!("{receiver_code}.get({arg_code})"),
            "at" if is_collection => format!("{receiver_code}.get(({arg_code}).intValue())"),
            "contains" if is_map => format!("{receiver_code}.containsKey({arg_code})"),
            "contains" if is_collection => format!("{receiver_code}.contains({arg_code})"),
            "and" => format!("({receiver_code} && {arg_code})"),
            "or" => format!("({receiver_code} || {arg_code})"),
            "to" => format!("range({receiver_code}, {arg_code})"),
            "at" => format!("at({receiver_code}, {arg_code})"),
            _ => format!("{receiver_code}.{keyword}({arg_code})"),
        }
    }

    /// Default-message dispatch (spec §4.6 "Default message", the `!`
    /// suffix invocation): `Supplier`/`Callable` call `.get()`, `Runnable`
    /// calls `.run()`.
    fn lower_default(&mut self, receiver: &Expr) -> String {
        let receiver_ty = self.cache.type_of(receiver);
        let receiver_code = self.lower_expr(receiver);
        let method = match &receiver_ty {
            Type::Class(c) => match c.simple_name() {
                "Runnable" => "run",
                "Callable" => "call",
                _ => "get",
            },
            _ => "get",
        };
        format!("{receiver_code}.{method}()")
    }

    /// Lowers a block to a lambda expression (spec §4.6 "Blocks"): a
    /// single-expression body becomes `params -> expr`, a multi-statement
    /// body becomes `params -> { ...; return last; }`.
    fn lower_block(&mut self, block: &Block) -> String {
        let param_list = self.lambda_param_list(block);
        match block.statements.as_slice() {
            [] => format!("{param_list} -> null"),
            [Stmt::Expr(e)] => format!("{param_list} -> {}", self.lower_expr(e)),
            stmts => {
                let mut body = String::new();
                let last = stmts.len() - 1;
                for (i, stmt) in stmts.iter().enumerate() {
                    match stmt {
                        Stmt::Let { name, value } => {
                            body.push_str(&format!(
                                "    var {} = {};\n",
                                sanitize_identifier(name),
                                self.lower_expr(value)
                            ));
                        }
                        Stmt::Expr(e) if i == last => {
                            body.push_str(&format!("    return {};\n", self.lower_expr(e)));
                        }
                        Stmt::Expr(e) => body.push_str(&format!("    {};\n", self.lower_expr(e))),
                    }
                }
                format!("{param_list} -> {{\n{body}}}")
            }
        }
    }

    fn lower_block_as_statement(&mut self, block: &Block) -> String {
        let lines = self.lower_statements(&block.statements);
        let mut body = String::new();
        for line in lines {
            body.push_str(&format!("    {line}\n"));
        }
        format!("{{\n{body}}}")
    }

    fn lambda_param_list(&self, block: &Block) -> String {
        match block.params.len() {
            0 => "()".to_string(),
            1 => sanitize_identifier(&block.params[0]),
            _ => {
                let names: Vec<String> = block.params.iter().map(|p| sanitize_identifier(p)).collect();
                format!("({})", names.join(", "))
            }
        }
    }
}

fn capitalize_first(id: &str) -> String {
    rulekit_ir::capitalize(id)
}

/// An output with no `initial_value` falls back to its host type's default
/// (GLOSSARY "Output"): the primitive zero value for a primitive-typed
/// output, `null` for anything else, since `= null` against e.g. `int`
/// isn't legal host source.
fn default_for_type(ty: &Type) -> String {
    match ty {
        Type::Primitive(p) => match p {
            Primitive::Int => "0",
            Primitive::Long => "0L",
            Primitive::Double => "0.0",
            Primitive::Float => "0.0f",
            Primitive::Boolean => "false",
            Primitive::Char => "'\\0'",
            Primitive::Byte => "(byte) 0",
            Primitive::Short => "(short) 0",
            Primitive::Void => "null",
        }
        .to_string(),
        _ => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use rulekit_ir::{BinaryOp, Fact, Output};
    use std::rc::Rc;

    fn options() -> CompileOptions<'static> {
        CompileOptions::new("GeneratedRules")
    }

    fn empty_module() -> RuleModule {
        RuleModule::new()
    }

    #[test]
    fn string_literal_escapes() {
        let resolver = Resolver::disabled();
        let cache = TypeCache::new();
        let opts = options();
        let module = empty_module();
        let mut diagnostics = Diagnostics::new();
        let mut gen = Generator::new(&module, &resolver, &cache, &opts, &mut diagnostics);
        let lit = Expr::new(ExprKind::Literal(Literal::String("a\"b".into())));
        assert_eq!(gen.lower_expr(&lit), "\"a\\\"b\"");
    }

    #[test]
    fn number_literal_uses_canonical_bigdecimal_constructor() {
        let resolver = Resolver::disabled();
        let cache = TypeCache::new();
        let opts = options();
        let module = empty_module();
        let mut diagnostics = Diagnostics::new();
        let mut gen = Generator::new(&module, &resolver, &cache, &opts, &mut diagnostics);
        let lit = Expr::new(ExprKind::Literal(Literal::Number("3.50".parse().unwrap())));
        assert_eq!(gen.lower_expr(&lit), "new java.math.BigDecimal(\"3.50\")");
    }

    #[test]
    fn plus_lowers_to_addnumeric_for_numbers() {
        let resolver = Resolver::disabled();
        let cache = TypeCache::new();
        let opts = options();
        let module = empty_module();
        let mut diagnostics = Diagnostics::new();
        let mut gen = Generator::new(&module, &resolver, &cache, &opts, &mut diagnostics);

        let one = Expr::new(ExprKind::Literal(Literal::Number("1".parse().unwrap())));
        let bin = Expr::new(ExprKind::Binary(Binary {
            left: one.clone(),
            op: BinaryOp::Plus,
            right: one,
        }));
        let ExprKind::Binary(b) = bin.kind() else { unreachable!() };
        assert_eq!(gen.lower_binary(b), "addNumeric(new java.math.BigDecimal(\"1\"), new java.math.BigDecimal(\"1\"))");
    }

    #[test]
    fn plus_lowers_to_concatenation_when_cache_says_string() {
        let resolver = Resolver::disabled();
        let opts = options();
        let module = empty_module();
        let mut diagnostics = Diagnostics::new();

        let a = Expr::new(ExprKind::Literal(Literal::String("a".into())));
        let b = Expr::new(ExprKind::Literal(Literal::String("b".into())));
        let bin_expr = Expr::new(ExprKind::Binary(Binary {
            left: a,
            op: BinaryOp::Plus,
            right: b,
        }));

        let mut ctx = crate::infer::InferContext::for_module(&module, &resolver, Rc::new(TypeCache::new()));
        ctx.infer_expr(&bin_expr);
        let cache = ctx.cache();
        let mut gen = Generator::new(&module, &resolver, cache, &opts, &mut diagnostics);
        let ExprKind::Binary(bin) = bin_expr.kind() else {
            unreachable!()
        };
        assert_eq!(gen.lower_binary(bin), "(\"a\" + \"b\")");
    }

    #[test]
    fn identifier_for_fact_lowers_to_field_access() {
        let resolver = Resolver::disabled();
        let cache = TypeCache::new();
        let opts = options();
        let mut module = empty_module();
        module.facts.push(Fact {
            name: "item".into(),
            qualified_type_name: "Item".into(),
            description: None,
        });
        let mut diagnostics = Diagnostics::new();
        let gen = Generator::new(&module, &resolver, &cache, &opts, &mut diagnostics);
        let id = Identifier::new("item");
        assert_eq!(gen.lower_identifier(&id), "this.item");
    }

    #[test]
    fn coerces_output_assignment_to_declared_numeric_type() {
        let resolver = Resolver::disabled();
        let cache = TypeCache::new();
        let opts = options();
        let mut module = empty_module();
        module.outputs.push(Output {
            name: "score".into(),
            qualified_type_name: "int".into(),
            initial_value: None,
            description: None,
        });
        let mut diagnostics = Diagnostics::new();
        let gen = Generator::new(&module, &resolver, &cache, &opts, &mut diagnostics);
        assert_eq!(gen.coerce_for_output("score", "x".into()), "toInt(x)");
    }

    #[test]
    fn set_literal_with_range_calls_range_helper() {
        let resolver = Resolver::disabled();
        let cache = TypeCache::new();
        let opts = options();
        let module = empty_module();
        let mut diagnostics = Diagnostics::new();
        let mut gen = Generator::new(&module, &resolver, &cache, &opts, &mut diagnostics);
        let start = Expr::new(ExprKind::Literal(Literal::Number("1".parse().unwrap())));
        let end = Expr::new(ExprKind::Literal(Literal::Number("3".parse().unwrap())));
        let code = gen.lower_set(&[SetElement::Range { start, end }]);
        assert!(code.starts_with("range("));
    }
}
