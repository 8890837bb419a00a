//! The loop visitor: walks a function body, discovers loops, and attributes
//! every variable, array, pointer and call event to the innermost enclosing
//! loop.
//!
//! Loops are appended to a flat list and referenced by index; the visitor
//! keeps a stack of indices for the loops currently open. Every event binds
//! to the top of the stack, and events outside any loop are dropped. That
//! single rule makes nesting attribution well-defined without any extra
//! bookkeeping.
//!
//! When a loop is popped the dependency manager runs on it immediately, so
//! inner loops always carry a settled verdict before their parent is
//! decided (the transitive call-safety check relies on this).

use crate::analysis::calls;
use crate::analysis::loop_info::*;
use crate::analysis::manager::DependencyManager;
use crate::frontend::ast::*;
use crate::frontend::symbols::SymbolTable;
use crate::utils::location::Span;
use log::{debug, trace};

/// Depth limit for pointer-name extraction.
const MAX_POINTER_NAME_DEPTH: usize = 10;

/// Walks functions and produces the loop list.
pub struct LoopVisitor {
    /// All loops discovered so far, in discovery order
    loops: Vec<LoopInfo>,
    /// Open loops, innermost last
    stack: Vec<LoopId>,
    /// Declared types, by lexical scope
    symbols: SymbolTable,
    /// Nesting depth of subscript-index visits
    subscript_depth: usize,
    /// Runs on each loop as it is popped
    manager: DependencyManager,
}

impl LoopVisitor {
    /// Create a visitor with an empty loop list.
    pub fn new() -> Self {
        Self::with_manager(DependencyManager::new())
    }

    /// Create a visitor running a specific dependency manager.
    pub fn with_manager(manager: DependencyManager) -> Self {
        Self {
            loops: Vec::new(),
            stack: Vec::new(),
            symbols: SymbolTable::new(),
            subscript_depth: 0,
            manager,
        }
    }

    /// Record translation-unit globals before walking any function.
    pub fn declare_globals(&mut self, unit: &TranslationUnit) {
        for decl in &unit.globals {
            self.symbols.declare(&decl.name, decl.ty.clone(), decl.span);
        }
    }

    /// Walk one function body.
    pub fn visit_function(&mut self, func: &Function) {
        debug!("visiting function '{}'", func.name);
        self.symbols.push_scope();
        for param in &func.params {
            self.symbols.declare(&param.name, param.ty.clone(), param.span);
        }
        self.visit_stmt_list(&func.body.statements);
        self.symbols.pop_scope();
    }

    /// Take the finished loop list.
    pub fn into_loops(self) -> Vec<LoopInfo> {
        self.loops
    }

    /// The finished loop list.
    pub fn loops(&self) -> &[LoopInfo] {
        &self.loops
    }

    fn visit_stmt_list(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Declaration { decls } => {
                for decl in decls {
                    self.visit_var_decl(decl);
                }
            }
            StmtKind::Expression { expr } => self.visit_expr(expr),
            StmtKind::For {
                init,
                condition,
                increment,
                body,
            } => self.visit_for(stmt.span, init, condition, increment, body),
            StmtKind::While { condition, body } => {
                self.visit_simple_loop(LoopKind::Conditional, stmt.span, |v| {
                    v.visit_expr(condition);
                    v.visit_stmt(body);
                });
            }
            StmtKind::DoWhile { body, condition } => {
                self.visit_simple_loop(LoopKind::PostTest, stmt.span, |v| {
                    v.visit_stmt(body);
                    v.visit_expr(condition);
                });
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(condition);
                self.visit_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(else_branch);
                }
            }
            StmtKind::Block { block } => {
                self.symbols.push_scope();
                self.visit_stmt_list(&block.statements);
                self.symbols.pop_scope();
            }
            StmtKind::Return { value } => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        self.symbols.declare(&decl.name, decl.ty.clone(), decl.span);

        if let Some(current) = self.current_loop_id() {
            let scope = self.scope_of_decl(decl.span, current);
            let var = VariableInfo::new(&decl.name, decl.span, scope);
            self.loops[current.0].add_variable(var);

            // An initializer stores into the fresh variable; that write is
            // what qualifies loop-locals for the private clause.
            if decl.init.is_some() {
                self.loops[current.0]
                    .add_variable_usage(&decl.name, VariableUsage::new(decl.span, false, true));
            }
        }

        if let Some(init) = &decl.init {
            self.visit_expr(init);
        }
    }

    fn visit_for(
        &mut self,
        span: Span,
        init: &Option<ForInit>,
        condition: &Option<Expr>,
        increment: &Option<Expr>,
        body: &Stmt,
    ) {
        let id = self.open_loop(LoopKind::Counted, span);

        // Bounds: the induction variable comes out of the init position,
        // either a single declaration or a single plain assignment.
        let induction_var = match init {
            Some(ForInit::Declaration(decls)) if decls.len() == 1 => Some(decls[0].name.clone()),
            Some(ForInit::Expression(expr)) => match &expr.strip_parens().kind {
                ExprKind::Assign { op: AssignOp::Assign, target, .. } => {
                    target.as_ident().map(str::to_string)
                }
                _ => None,
            },
            _ => None,
        };
        let is_simple =
            induction_var.is_some() && condition.is_some() && increment.is_some();
        {
            let bounds = &mut self.loops[id.0].bounds;
            bounds.induction_var = induction_var;
            bounds.condition = condition.clone();
            bounds.increment = increment.clone();
            bounds.is_simple = is_simple;
        }
        if is_simple {
            trace!(
                "loop {}: simple iterator pattern '{}'",
                id,
                self.loops[id.0].bounds.induction_var.as_deref().unwrap_or("")
            );
        }

        // The for-init introduces its own scope.
        self.symbols.push_scope();
        match init {
            Some(ForInit::Declaration(decls)) => {
                for decl in decls {
                    self.visit_var_decl(decl);
                }
            }
            Some(ForInit::Expression(expr)) => self.visit_expr(expr),
            None => {}
        }
        if let Some(condition) = condition {
            self.visit_expr(condition);
        }
        if let Some(increment) = increment {
            self.visit_expr(increment);
        }
        self.visit_stmt(body);
        self.symbols.pop_scope();

        self.close_loop(id);
    }

    fn visit_simple_loop<F>(&mut self, kind: LoopKind, span: Span, walk: F)
    where
        F: FnOnce(&mut Self),
    {
        let id = self.open_loop(kind, span);
        walk(self);
        self.close_loop(id);
    }

    fn open_loop(&mut self, kind: LoopKind, span: Span) -> LoopId {
        let id = LoopId(self.loops.len());
        let parent = self.stack.last().copied();
        let depth = parent.map(|p| self.loops[p.0].depth + 1).unwrap_or(0);

        let info = LoopInfo::new(id, kind, span, depth, parent);
        if let Some(parent) = parent {
            self.loops[parent.0].children.push(id);
        }
        debug!("found {} loop at line {} (depth {})", kind, span.start_line, depth);

        self.loops.push(info);
        self.stack.push(id);
        id
    }

    fn close_loop(&mut self, id: LoopId) {
        self.stack.pop();
        self.loops[id.0].mark_induction_variable();
        self.manager.analyze(&mut self.loops, id);
        let info = &mut self.loops[id.0];
        info.metrics.finalize();
        info.finalized = true;
    }

    fn current_loop_id(&self) -> Option<LoopId> {
        self.stack.last().copied()
    }

    /// Scope of a declaration relative to a loop: inside the loop statement
    /// (init position included) means loop-local, otherwise function-local
    /// unless globally declared.
    fn scope_of_decl(&self, decl_span: Span, loop_id: LoopId) -> VariableScope {
        let loop_span = self.loops[loop_id.0].span;
        if decl_span.is_dummy() {
            return VariableScope::FunctionLocal;
        }
        if loop_span.contains_offset(decl_span.start_offset) {
            VariableScope::LoopLocal
        } else {
            VariableScope::FunctionLocal
        }
    }

    fn record_variable_use(&mut self, name: &str, span: Span, is_read: bool, is_write: bool) {
        let Some(current) = self.current_loop_id() else {
            // Events outside any loop are dropped.
            return;
        };

        if self.loops[current.0].variable(name).is_none() {
            let (scope, decl_span) = match self.symbols.lookup(name) {
                Some(info) if info.is_global => (VariableScope::Global, info.span),
                Some(info) => (self.scope_of_decl(info.span, current), info.span),
                None => (VariableScope::FunctionLocal, Span::dummy()),
            };
            self.loops[current.0].add_variable(VariableInfo::new(name, decl_span, scope));
        }

        if self.subscript_depth > 0 && !is_write {
            if let Some(var) = self.loops[current.0].variable_mut(name) {
                if var.role == VariableRole::Ordinary {
                    var.role = VariableRole::Index;
                }
            }
        }

        self.loops[current.0]
            .add_variable_usage(name, VariableUsage::new(span, is_read, is_write));
    }

    fn record_pointer_op(&mut self, name: &str, span: Span, deref: bool, addr: bool, arith: bool) {
        let Some(current) = self.current_loop_id() else {
            return;
        };
        trace!(
            "pointer op on '{}' at line {} (deref={}, addr={}, arith={})",
            name, span.start_line, deref, addr, arith
        );
        self.loops[current.0].add_pointer_op(PointerOp {
            pointer: name.to_string(),
            span,
            line: span.start_line,
            is_dereference: deref,
            is_address_of: addr,
            is_arithmetic: arith,
        });
    }

    fn metrics(&mut self) -> Option<&mut LoopMetrics> {
        self.current_loop_id()
            .map(|id| &mut self.loops[id.0].metrics)
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::CharLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::SizeofType(_) => {}

            // sizeof does not evaluate its operand; no events.
            ExprKind::SizeofExpr(_) => {}

            ExprKind::Ident(name) => {
                let name = name.clone();
                self.record_variable_use(&name, expr.span, true, false);
            }

            ExprKind::Index { .. } => {
                self.visit_subscript_chain(expr, false);
            }

            ExprKind::Unary { op, operand } => self.visit_unary(expr, *op, operand),

            ExprKind::Binary { op, left, right } => {
                if op.is_arithmetic() {
                    if let Some(metrics) = self.metrics() {
                        metrics.arithmetic_ops += 1;
                    }
                    // Pointer offset arithmetic: `p + n` with p pointer-typed.
                    if matches!(op, BinaryOp::Add | BinaryOp::Sub)
                        && self.symbols.is_pointer_expr(left)
                    {
                        if let Some(name) = self.extract_pointer_name(left) {
                            self.record_pointer_op(&name, expr.span, false, false, true);
                        }
                    }
                } else if op.is_comparison() {
                    if let Some(metrics) = self.metrics() {
                        metrics.comparisons += 1;
                    }
                }
                self.visit_expr(left);
                self.visit_expr(right);
            }

            ExprKind::Assign { op, target, value } => {
                if let Some(metrics) = self.metrics() {
                    metrics.assignments += 1;
                }
                self.visit_assignment_target(target, *op, value);
                self.visit_expr(value);
            }

            ExprKind::Call { callee, args } => {
                let name = Self::callee_name(callee);
                self.record_call(&name, expr.span);
                for arg in args {
                    self.visit_expr(arg);
                }
            }

            ExprKind::Member { base, member: _, arrow } => {
                if *arrow {
                    if let Some(name) = self.extract_pointer_name(base) {
                        self.record_pointer_op(&name, expr.span, true, false, false);
                    }
                }
                self.visit_expr(base);
            }

            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(condition);
                self.visit_expr(then_expr);
                self.visit_expr(else_expr);
            }

            ExprKind::Cast { expr: inner, .. } | ExprKind::Grouped(inner) => {
                self.visit_expr(inner);
            }
        }
    }

    fn visit_unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) {
        match op {
            UnaryOp::Deref => {
                if let Some(name) = self.extract_pointer_name(operand) {
                    self.record_pointer_op(&name, expr.span, true, false, false);
                }
                // `*(p + k)` reads like an array access with base p and
                // subscript k; record it so the subscript analyses see it.
                self.record_pointer_walk_access(expr, operand, false);
                self.visit_expr(operand);
            }
            UnaryOp::AddrOf => {
                if let Some(name) = self.extract_pointer_name(operand) {
                    self.record_pointer_op(&name, expr.span, false, true, false);
                }
                self.visit_expr(operand);
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                if let Some(metrics) = self.metrics() {
                    metrics.arithmetic_ops += 1;
                }
                if self.symbols.is_pointer_expr(operand) {
                    if let Some(name) = self.extract_pointer_name(operand) {
                        self.record_pointer_op(&name, expr.span, false, false, true);
                    }
                }
                if let Some(name) = operand.as_ident() {
                    // Increment consumes the old value and stores a new one.
                    let name = name.to_string();
                    self.record_variable_use(&name, operand.span, true, true);
                } else {
                    self.visit_expr(operand);
                }
            }
            UnaryOp::Plus | UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot => {
                self.visit_expr(operand);
            }
        }
    }

    fn visit_assignment_target(&mut self, target: &Expr, op: AssignOp, value: &Expr) {
        let stripped = target.strip_parens();
        match &stripped.kind {
            ExprKind::Ident(name) => {
                let name = name.clone();
                // Compound assignment reads the old value.
                self.record_variable_use(&name, stripped.span, op.is_compound(), true);

                // Pointer copied to pointer: aliasing introduced.
                if op == AssignOp::Assign
                    && self.symbols.is_pointer_expr(stripped)
                    && self.symbols.is_pointer_expr(value)
                {
                    debug!(
                        "pointer assignment '{} = {}' at line {} (potential aliasing)",
                        name, value, target.span.start_line
                    );
                    self.record_pointer_op(&name, target.span, false, false, false);
                }
            }
            ExprKind::Index { .. } => {
                self.visit_subscript_chain(stripped, true);
            }
            ExprKind::Unary { op: UnaryOp::Deref, operand } => {
                if let Some(name) = self.extract_pointer_name(operand) {
                    self.record_pointer_op(&name, stripped.span, true, false, false);
                }
                self.record_pointer_walk_access(stripped, operand, true);
                self.visit_expr(operand);
            }
            ExprKind::Member { base, member: _, arrow } => {
                if *arrow {
                    if let Some(name) = self.extract_pointer_name(base) {
                        self.record_pointer_op(&name, stripped.span, true, false, false);
                    }
                }
                self.visit_expr(base);
            }
            _ => self.visit_expr(target),
        }
    }

    /// Record one array access for a full subscript chain: base name from
    /// the innermost declarator, subscript from the outermost index.
    /// Inner indices are visited as ordinary reads.
    fn visit_subscript_chain(&mut self, expr: &Expr, is_write: bool) {
        let stripped = expr.strip_parens();
        let ExprKind::Index { base, index } = &stripped.kind else {
            self.visit_expr(expr);
            return;
        };

        match stripped.subscript_base_name() {
            Some(name) => {
                let name = name.to_string();
                trace!(
                    "array access {}[{}] at line {} ({})",
                    name,
                    index,
                    stripped.span.start_line,
                    if is_write { "WRITE" } else { "READ" }
                );
                if let Some(current) = self.current_loop_id() {
                    self.loops[current.0].add_array_access(ArrayAccess::new(
                        &name,
                        (**index).clone(),
                        stripped.span,
                        is_write,
                    ));
                }
                // The base itself reads as a variable reference.
                self.record_variable_use(&name, stripped.span, true, false);
            }
            None => {
                // Subscript on something unnamed (e.g. a call result);
                // walk the base normally.
                self.visit_expr(base);
            }
        }

        // All index expressions, outermost first, are reads.
        self.subscript_depth += 1;
        let mut node = stripped;
        while let ExprKind::Index { base, index } = &node.strip_parens().kind {
            self.visit_expr(index);
            node = base.as_ref();
        }
        self.subscript_depth -= 1;
    }

    /// If `operand` of a dereference is `p ± k` with p pointer-typed,
    /// record the equivalent array access.
    fn record_pointer_walk_access(&mut self, deref_expr: &Expr, operand: &Expr, is_write: bool) {
        let stripped = operand.strip_parens();
        if let ExprKind::Binary { op, left, right } = &stripped.kind {
            if matches!(op, BinaryOp::Add | BinaryOp::Sub) && self.symbols.is_pointer_expr(left) {
                if let Some(name) = left.as_ident() {
                    let name = name.to_string();
                    let subscript = (**right).clone();
                    if let Some(current) = self.current_loop_id() {
                        self.loops[current.0].add_array_access(ArrayAccess::new(
                            &name,
                            subscript,
                            deref_expr.span,
                            is_write,
                        ));
                    }
                }
            }
        }
    }

    fn record_call(&mut self, name: &str, span: Span) {
        let Some(current) = self.current_loop_id() else {
            return;
        };
        let event = calls::classify_call(name, span.start_line);
        debug!(
            "call to '{}' at line {}{}",
            name,
            span.start_line,
            if event.is_safe() { "" } else { " (side effects)" }
        );
        self.loops[current.0].add_call(event);
    }

    fn callee_name(callee: &Expr) -> String {
        match &callee.strip_parens().kind {
            ExprKind::Ident(name) => name.clone(),
            ExprKind::Member { member, .. } => member.clone(),
            _ => "unknown".to_string(),
        }
    }

    /// Best-effort pointer name, recursing through subscripts, unaries and
    /// offset arithmetic with a depth limit.
    fn extract_pointer_name(&self, expr: &Expr) -> Option<String> {
        fn go(expr: &Expr, depth: usize) -> Option<String> {
            if depth > MAX_POINTER_NAME_DEPTH {
                return Some("complex".to_string());
            }
            match &expr.strip_parens().kind {
                ExprKind::Ident(name) => Some(name.clone()),
                ExprKind::Index { base, .. } => go(base, depth + 1),
                ExprKind::Binary { op, left, .. }
                    if matches!(op, BinaryOp::Add | BinaryOp::Sub) =>
                {
                    match go(left, depth + 1) {
                        Some(name) if name != "complex" => Some(format!("{}_offset", name)),
                        _ => Some("complex".to_string()),
                    }
                }
                ExprKind::Unary { operand, .. } => go(operand, depth + 1),
                ExprKind::Member { base, .. } => go(base, depth + 1),
                _ => Some("complex".to_string()),
            }
        }
        go(expr, 0)
    }
}

impl Default for LoopVisitor {
    fn default() -> Self {
        Self::new()
    }
}
