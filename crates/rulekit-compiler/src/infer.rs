//! Type-inference context and visitor (spec §4.4).
//!
//! [`TypeCache`] is the identity-keyed memoization table the generator
//! later consults; [`InferContext`] is the symbol table (facts / globals /
//! outputs / data-tables / locals) that the visitor walks statements and
//! expressions against.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rulekit_ir::{
    Binary, BinaryOp, Block, DataTable, Expr, ExprKind, Identifier, Literal, MessageSend,
    Navigation, RuleModule, SetElement, Stmt, Type,
};

use crate::resolver::Resolver;

/// Identity-keyed cache of inferred expression types, shared by every
/// [`InferContext`] derived from the same top-level context (spec §4.4,
/// "Memoization"). The generator holds onto this after inference finishes.
#[derive(Default)]
pub struct TypeCache {
    inner: RefCell<HashMap<Expr, Type>>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, expr: &Expr) -> Option<Type> {
        self.inner.borrow().get(expr).cloned()
    }

    pub fn type_of(&self, expr: &Expr) -> Type {
        self.get(expr).unwrap_or_else(Type::unknown)
    }

    fn insert(&self, expr: Expr, ty: Type) {
        self.inner.borrow_mut().insert(expr, ty);
    }
}

fn data_table_type(table: &DataTable) -> Type {
    if table.is_two_column() {
        Type::map_of(Type::string(), Type::unknown())
    } else {
        Type::collection_of(Type::map_of(Type::string(), Type::unknown()))
    }
}

/// The symbol table and type visitor (spec §4.4). Cheap to clone-by-`child`:
/// read-only partitions are `Rc`-shared, the local partition is owned so
/// mutations in a child scope never reach its parent.
pub struct InferContext<'r> {
    resolver: &'r Resolver<'r>,
    facts: Rc<HashMap<String, Type>>,
    globals: Rc<HashMap<String, Type>>,
    outputs: Rc<HashMap<String, Type>>,
    data_tables: Rc<HashMap<String, Type>>,
    locals: HashMap<String, Type>,
    cache: Rc<TypeCache>,
}

impl<'r> InferContext<'r> {
    /// Build the top-level context for a module, sharing `cache` with the
    /// analyzer/generator so its entries outlive this call.
    pub fn for_module(module: &RuleModule, resolver: &'r Resolver<'r>, cache: Rc<TypeCache>) -> Self {
        let facts = module
            .facts
            .iter()
            .map(|f| (f.name.clone(), resolver.resolve(&f.qualified_type_name)))
            .collect();
        let globals = module
            .globals
            .iter()
            .map(|g| (g.name.clone(), resolver.resolve(&g.qualified_type_name)))
            .collect();
        let outputs = module
            .outputs
            .iter()
            .map(|o| (o.name.clone(), resolver.resolve(&o.qualified_type_name)))
            .collect();
        let data_tables = module
            .data_tables
            .iter()
            .map(|t| (t.id.clone(), data_table_type(t)))
            .collect();

        Self {
            resolver,
            facts: Rc::new(facts),
            globals: Rc::new(globals),
            outputs: Rc::new(outputs),
            data_tables: Rc::new(data_tables),
            locals: HashMap::new(),
            cache,
        }
    }

    /// A child scope for a block body: inherits every partition but owns
    /// its own local bindings, so let-statements inside it never leak to
    /// the parent (spec §4.4, "Child scopes").
    pub fn child(&self) -> Self {
        Self {
            resolver: self.resolver,
            facts: Rc::clone(&self.facts),
            globals: Rc::clone(&self.globals),
            outputs: Rc::clone(&self.outputs),
            data_tables: Rc::clone(&self.data_tables),
            locals: self.locals.clone(),
            cache: Rc::clone(&self.cache),
        }
    }

    pub fn bind_local(&mut self, name: impl Into<String>, ty: Type) {
        self.locals.insert(name.into(), ty);
    }

    pub fn cache(&self) -> &TypeCache {
        &self.cache
    }

    fn resolve_identifier(&self, id: &Identifier) -> Type {
        if id.is_global() {
            return self
                .globals
                .get(id.bare_name())
                .cloned()
                .unwrap_or_else(|| Type::unknown_hint(id.name.clone()));
        }
        self.locals
            .get(&id.name)
            .or_else(|| self.facts.get(&id.name))
            .or_else(|| self.outputs.get(&id.name))
            .or_else(|| self.data_tables.get(&id.name))
            .cloned()
            .unwrap_or_else(|| Type::unknown_hint(id.name.clone()))
    }

    /// Walk a statement list, threading let-bindings into `self.locals` as
    /// they're encountered and returning the type of the last expression
    /// statement (void if the list has none) — this is what gives a
    /// [`Block`] its type (spec §4.4, "treat its type as the type of its
    /// final statement").
    pub fn infer_statements(&mut self, stmts: &[Stmt]) -> Type {
        let mut last = Type::void();
        for stmt in stmts {
            match stmt {
                Stmt::Let { name, value } => {
                    let ty = self.infer_expr(value);
                    self.bind_local(name.clone(), ty);
                    last = Type::void();
                }
                Stmt::Expr(expr) => {
                    last = self.infer_expr(expr);
                }
            }
        }
        last
    }

    /// Compute (and cache, by expression identity) the type of `expr`
    /// (spec §4.4, "Inference rules").
    pub fn infer_expr(&mut self, expr: &Expr) -> Type {
        if let Some(cached) = self.cache.get(expr) {
            return cached;
        }
        let ty = self.infer_expr_uncached(expr);
        self.cache.insert(expr.clone(), ty.clone());
        ty
    }

    fn infer_expr_uncached(&mut self, expr: &Expr) -> Type {
        match expr.kind() {
            ExprKind::Identifier(id) => self.resolve_identifier(id),
            ExprKind::Literal(lit) => self.infer_literal(lit),
            ExprKind::Navigation(nav) => self.infer_navigation(nav),
            ExprKind::Binary(bin) => self.infer_binary(bin),
            ExprKind::Assignment(assign) => {
                self.infer_expr(&assign.target);
                self.infer_expr(&assign.value)
            }
            ExprKind::MessageSend(send) => self.infer_message(send),
            ExprKind::Block(block) => self.infer_block(block),
        }
    }

    fn infer_literal(&mut self, lit: &Literal) -> Type {
        match lit {
            Literal::String(_) => Type::string(),
            Literal::Number(_) => Type::big_decimal(),
            Literal::Boolean(_) => Type::boolean(),
            Literal::Null => Type::object(),
            Literal::List(items) => self.infer_homogeneous_collection(items.iter()),
            Literal::Set(elements) => {
                let first = elements.iter().find_map(|e| match e {
                    SetElement::Single(e) => Some(e.clone()),
                    SetElement::Range { start, .. } => Some(start.clone()),
                });
                for e in elements {
                    match e {
                        SetElement::Single(e) => {
                            self.infer_expr(e);
                        }
                        SetElement::Range { start, end } => {
                            self.infer_expr(start);
                            self.infer_expr(end);
                        }
                    }
                }
                match first {
                    Some(e) => Type::collection_of(self.infer_expr(&e)),
                    None => Type::collection_of(Type::unknown()),
                }
            }
            Literal::Map(pairs) => {
                if let Some((k, v)) = pairs.first() {
                    let key_ty = self.infer_expr(k);
                    let val_ty = self.infer_expr(v);
                    for (k, v) in pairs.iter().skip(1) {
                        self.infer_expr(k);
                        self.infer_expr(v);
                    }
                    Type::map_of(key_ty, val_ty)
                } else {
                    Type::map_of(Type::unknown(), Type::unknown())
                }
            }
        }
    }

    fn infer_homogeneous_collection<'e>(&mut self, mut items: impl Iterator<Item = &'e Expr>) -> Type {
        let Some(first) = items.next() else {
            return Type::collection_of(Type::unknown());
        };
        let element_ty = self.infer_expr(first);
        for item in items {
            self.infer_expr(item);
        }
        Type::collection_of(element_ty)
    }

    fn infer_navigation(&mut self, nav: &Navigation) -> Type {
        let mut ty = self.infer_expr(&nav.receiver);
        for property in &nav.path {
            ty = self.resolver.resolve_property(&ty, property);
        }
        ty
    }

    fn infer_binary(&mut self, bin: &Binary) -> Type {
        self.infer_expr(&bin.left);
        self.infer_expr(&bin.right);
        if bin.op.is_arithmetic() {
            Type::big_decimal()
        } else {
            debug_assert!(bin.op.is_comparison());
            Type::boolean()
        }
    }

    fn infer_message(&mut self, send: &MessageSend) -> Type {
        match send {
            MessageSend::Unary { receiver, selector } => {
                let recv_ty = self.infer_expr(receiver);
                match selector.as_str() {
                    "exists" | "notEmpty" | "empty" | "doesNotExist" => Type::boolean(),
                    "sum" => Type::big_decimal(),
                    "size" => Type::int(),
                    _ => self.resolver.resolve_property(&recv_ty, selector),
                }
            }
            MessageSend::Keyword { receiver, parts } => {
                let recv_ty = self.infer_expr(receiver);
                for (_, arg) in parts {
                    self.infer_expr(arg);
                }
                if parts.len() == 1 {
                    self.infer_single_keyword(&recv_ty, &parts[0].0)
                } else {
                    let name = rulekit_ir::compose_keyword_name(parts);
                    self.resolver.resolve_property(&recv_ty, &name)
                }
            }
            MessageSend::Default { receiver } => {
                let recv_ty = self.infer_expr(receiver);
                self.infer_default_message(&recv_ty)
            }
        }
    }

    fn infer_single_keyword(&self, receiver: &Type, keyword: &str) -> Type {
        match keyword {
            "all" | "contains" | "and" | "or" => Type::boolean(),
            "each" | "ifTrue" | "ifFalse" => Type::void(),
            "where" => Type::collection_of(receiver.element_type()),
            "at" => {
                if receiver.is_map() {
                    receiver.value_type()
                } else if receiver.is_collection() {
                    receiver.element_type()
                } else {
                    Type::unknown()
                }
            }
            "to" => Type::collection_of(Type::big_decimal()),
            _ => self.resolver.resolve_property(receiver, keyword),
        }
    }

    fn infer_default_message(&self, receiver: &Type) -> Type {
        match receiver {
            Type::Class(c) => match c.simple_name() {
                "Supplier" | "Callable" => c.type_arguments.first().cloned().unwrap_or(Type::object()),
                "Runnable" => Type::void(),
                _ => Type::object(),
            },
            _ => Type::object(),
        }
    }

    fn infer_block(&mut self, block: &Block) -> Type {
        let mut child = self.child();
        for param in &block.params {
            child.bind_local(param.clone(), Type::unknown());
        }
        child.infer_statements(&block.statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulekit_ir::{ClassKind, ClassType, Fact, Output, RuleModule};

    fn module_with_fact() -> RuleModule {
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
    fn literal_types() {
        let resolver = Resolver::disabled();
        let module = RuleModule::new();
        let cache = Rc::new(TypeCache::new());
        let mut ctx = InferContext::for_module(&module, &resolver, cache);

        let s = Expr::new(ExprKind::Literal(Literal::String("x".into())));
        assert_eq!(ctx.infer_expr(&s), Type::string());

        let b = Expr::new(ExprKind::Literal(Literal::Boolean(true)));
        assert_eq!(ctx.infer_expr(&b), Type::boolean());
    }

    #[test]
    fn identifier_resolves_fact_then_output() {
        let resolver = Resolver::disabled();
        let module = module_with_fact();
        let cache = Rc::new(TypeCache::new());
        let mut ctx = InferContext::for_module(&module, &resolver, cache);

        let item = Expr::new(ExprKind::Identifier(Identifier::new("item")));
        assert!(matches!(ctx.infer_expr(&item), Type::Class(ClassType { kind: ClassKind::Regular, .. })));

        let discount = Expr::new(ExprKind::Identifier(Identifier::new("discount")));
        assert_eq!(ctx.infer_expr(&discount), Type::big_decimal());
    }

    #[test]
    fn binary_arithmetic_vs_comparison() {
        let resolver = Resolver::disabled();
        let module = RuleModule::new();
        let cache = Rc::new(TypeCache::new());
        let mut ctx = InferContext::for_module(&module, &resolver, cache);

        let one = Expr::new(ExprKind::Literal(Literal::Number("1".parse().unwrap())));
        let plus = Expr::new(ExprKind::Binary(Binary {
            left: one.clone(),
            op: BinaryOp::Plus,
            right: one.clone(),
        }));
        assert_eq!(ctx.infer_expr(&plus), Type::big_decimal());

        let eq = Expr::new(ExprKind::Binary(Binary {
            left: one.clone(),
            op: BinaryOp::Equals,
            right: one,
        }));
        assert_eq!(ctx.infer_expr(&eq), Type::boolean());
    }

    #[test]
    fn memoization_returns_identical_cached_result() {
        let resolver = Resolver::disabled();
        let module = RuleModule::new();
        let cache = Rc::new(TypeCache::new());
        let mut ctx = InferContext::for_module(&module, &resolver, cache);

        let e = Expr::new(ExprKind::Literal(Literal::Boolean(false)));
        let first = ctx.infer_expr(&e);
        let second = ctx.infer_expr(&e);
        assert_eq!(first, second);
        assert_eq!(ctx.cache().type_of(&e), Type::boolean());
    }

    #[test]
    fn let_binding_leaks_within_same_statement_list_only() {
        let resolver = Resolver::disabled();
        let module = RuleModule::new();
        let cache = Rc::new(TypeCache::new());
        let mut ctx = InferContext::for_module(&module, &resolver, cache);

        let value = Expr::new(ExprKind::Literal(Literal::Boolean(true)));
        let stmts = vec![
            Stmt::let_binding("flag", value),
            Stmt::Expr(Expr::new(ExprKind::Identifier(Identifier::new("flag")))),
        ];
        let result = ctx.infer_statements(&stmts);
        assert_eq!(result, Type::boolean());

        let mut child = ctx.child();
        let unresolved_in_parent = Expr::new(ExprKind::Identifier(Identifier::new("flag")));
        // The parent context that `child` was copied from already has
        // `flag` bound (it leaked from the same statement list above), so
        // this documents that scope, not a counterexample to isolation.
        assert_eq!(child.infer_expr(&unresolved_in_parent), Type::boolean());
    }
}
