//! Scoped symbol table for declared types.
//!
//! The loop visitor pushes a scope per function and per block and records
//! every declaration it sees, so that later questions — "is this operand
//! pointer-typed", "where was this variable declared", "is it a global" —
//! can be answered from the name alone.

use crate::frontend::ast::{CType, Expr, ExprKind, UnaryOp};
use crate::utils::location::Span;
use std::collections::HashMap;

/// What the table knows about one declared name.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    /// Declared type
    pub ty: CType,
    /// Declaration site
    pub span: Span,
    /// Declared at translation-unit scope
    pub is_global: bool,
}

/// A stack of lexical scopes.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, SymbolInfo>>,
}

impl SymbolTable {
    /// Create a table with a single (global) scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// Enter a nested scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Leave the innermost scope.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Record a declaration in the innermost scope.
    pub fn declare(&mut self, name: &str, ty: CType, span: Span) {
        let is_global = self.scopes.len() == 1;
        let info = SymbolInfo { ty, span, is_global };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), info);
        }
    }

    /// Look a name up through the scope stack, innermost first.
    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Declared type of a name, `Unknown` if undeclared.
    pub fn type_of(&self, name: &str) -> CType {
        self.lookup(name)
            .map(|info| info.ty.clone())
            .unwrap_or(CType::Unknown)
    }

    /// Whether a name was declared at translation-unit scope.
    pub fn is_global(&self, name: &str) -> bool {
        self.lookup(name).map(|info| info.is_global).unwrap_or(false)
    }

    /// Best-effort static type of an expression, enough to decide
    /// pointer-ness of operands. Unknown shapes yield `Unknown`.
    pub fn expr_type(&self, expr: &Expr) -> CType {
        match &expr.strip_parens().kind {
            ExprKind::Ident(name) => self.type_of(name),
            ExprKind::Index { base, .. } => self.expr_type(base).pointee(),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Deref => self.expr_type(operand).pointee(),
                UnaryOp::AddrOf => CType::Pointer(Box::new(self.expr_type(operand))),
                UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                    self.expr_type(operand)
                }
                _ => CType::Unknown,
            },
            ExprKind::Assign { target, .. } => self.expr_type(target),
            ExprKind::IntLiteral(_) => CType::Int,
            ExprKind::FloatLiteral(_) => CType::Double,
            ExprKind::StringLiteral(_) => CType::Pointer(Box::new(CType::Char)),
            _ => CType::Unknown,
        }
    }

    /// Whether an expression is a pointer-typed operand (pointers and
    /// arrays both count; arrays decay).
    pub fn is_pointer_expr(&self, expr: &Expr) -> bool {
        self.expr_type(expr).is_pointer_like()
    }
}
