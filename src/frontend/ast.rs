//! Abstract Syntax Tree for the C subset.
//!
//! The AST preserves the structure the loop analyzer cares about: loops,
//! declarations, assignments, subscripts, calls and pointer operations.
//! Expressions keep their source spans so every analysis fact can be tied
//! back to a line.

use crate::utils::location::Span;
use serde::{Serialize, Deserialize};
use std::fmt;

/// A parsed translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Function definitions
    pub functions: Vec<Function>,
    /// File-scope variable declarations
    pub globals: Vec<VarDecl>,
    /// Source span
    pub span: Span,
}

impl TranslationUnit {
    /// Create a new empty translation unit.
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            globals: Vec::new(),
            span: Span::dummy(),
        }
    }

    /// Find a function by name.
    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

impl Default for TranslationUnit {
    fn default() -> Self {
        Self::new()
    }
}

/// A C type, as far as the analyzer needs to know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CType {
    /// `void`
    Void,
    /// `char` (signedness ignored)
    Char,
    /// Any integer flavor: `short`, `int`, `long`, `unsigned ...`
    Int,
    /// `float`
    Float,
    /// `double`
    Double,
    /// A struct by tag name
    Struct(String),
    /// Pointer to another type
    Pointer(Box<CType>),
    /// Array of another type, with an optional constant size
    Array {
        element: Box<CType>,
        size: Option<i64>,
    },
    /// Not known (undeclared identifiers)
    Unknown,
}

impl CType {
    /// Pointer-like types: real pointers and arrays (which decay).
    pub fn is_pointer_like(&self) -> bool {
        matches!(self, CType::Pointer(_) | CType::Array { .. })
    }

    /// The type obtained by dereferencing or subscripting this one.
    pub fn pointee(&self) -> CType {
        match self {
            CType::Pointer(inner) => (**inner).clone(),
            CType::Array { element, .. } => (**element).clone(),
            _ => CType::Unknown,
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Void => write!(f, "void"),
            CType::Char => write!(f, "char"),
            CType::Int => write!(f, "int"),
            CType::Float => write!(f, "float"),
            CType::Double => write!(f, "double"),
            CType::Struct(tag) => write!(f, "struct {}", tag),
            CType::Pointer(inner) => write!(f, "{}*", inner),
            CType::Array { element, size } => match size {
                Some(n) => write!(f, "{}[{}]", element, n),
                None => write!(f, "{}[]", element),
            },
            CType::Unknown => write!(f, "?"),
        }
    }
}

/// A function definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Return type
    pub return_type: CType,
    /// Parameters
    pub params: Vec<Param>,
    /// Function body
    pub body: Block,
    /// Source span
    pub span: Span,
}

/// A function parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: CType,
    /// Source span
    pub span: Span,
}

/// A single declarator from a declaration statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// Full type after applying pointer/array declarators
    pub ty: CType,
    /// Initializer, if present
    pub init: Option<Expr>,
    /// Source span of the declarator
    pub span: Span,
}

/// A block of statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Statements in the block
    pub statements: Vec<Stmt>,
    /// Source span
    pub span: Span,
}

impl Block {
    /// Create an empty block.
    pub fn empty() -> Self {
        Self {
            statements: Vec::new(),
            span: Span::dummy(),
        }
    }
}

/// A statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    /// The kind of statement
    pub kind: StmtKind,
    /// Source span
    pub span: Span,
}

/// The kind of a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    /// Declaration: `int x = 0, *p;`
    Declaration {
        decls: Vec<VarDecl>,
    },

    /// Expression statement: `expr;`
    Expression {
        expr: Expr,
    },

    /// Counted loop: `for (init; cond; inc) body`
    For {
        init: Option<ForInit>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    /// Conditional loop: `while (cond) body`
    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Post-test loop: `do body while (cond);`
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },

    /// `if (cond) then else else`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// Compound statement: `{ stmts }`
    Block {
        block: Block,
    },

    /// `return expr;`
    Return {
        value: Option<Expr>,
    },

    /// `break;`
    Break,

    /// `continue;`
    Continue,

    /// Bare `;`
    Empty,
}

/// The init position of a `for` loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ForInit {
    /// `for (int i = 0; ...)`
    Declaration(Vec<VarDecl>),
    /// `for (i = 0; ...)`
    Expression(Expr),
}

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    /// The kind of expression
    pub kind: ExprKind,
    /// Source span
    pub span: Span,
}

impl Expr {
    /// Create a new expression.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create an integer literal.
    pub fn int_lit(value: i64, span: Span) -> Self {
        Self::new(ExprKind::IntLiteral(value), span)
    }

    /// Create an identifier reference.
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Ident(name.into()), span)
    }

    /// Strip grouping parentheses and casts, the way index comparison
    /// wants to see an expression.
    pub fn strip_parens(&self) -> &Expr {
        match &self.kind {
            ExprKind::Grouped(inner) => inner.strip_parens(),
            ExprKind::Cast { expr, .. } => expr.strip_parens(),
            _ => self,
        }
    }

    /// The identifier name, if this (after stripping) is a bare reference.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.strip_parens().kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// The integer value, if this (after stripping) is an integer literal,
    /// possibly negated.
    pub fn as_int_literal(&self) -> Option<i64> {
        match &self.strip_parens().kind {
            ExprKind::IntLiteral(v) => Some(*v),
            ExprKind::Unary { op: UnaryOp::Neg, operand } => {
                operand.as_int_literal().map(|v| -v)
            }
            _ => None,
        }
    }

    /// The innermost base name of a (possibly nested) subscript chain,
    /// e.g. `M` for `M[i][j]`.
    pub fn subscript_base_name(&self) -> Option<&str> {
        match &self.strip_parens().kind {
            ExprKind::Index { base, .. } => base.subscript_base_name(),
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    /// Render a canonical text form, used for "textually identical" index
    /// comparison and for hazard descriptions. Shapes the analyzer cannot
    /// describe render as `<complex>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::IntLiteral(v) => write!(f, "{}", v),
            ExprKind::FloatLiteral(v) => write!(f, "{}", v),
            ExprKind::CharLiteral(c) => write!(f, "'{}'", c),
            ExprKind::StringLiteral(s) => write!(f, "\"{}\"", s),
            ExprKind::Ident(name) => write!(f, "{}", name),
            ExprKind::Index { base, index } => write!(f, "{}[{}]", base, index),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::PostInc => write!(f, "{}++", operand),
                UnaryOp::PostDec => write!(f, "{}--", operand),
                _ => write!(f, "{}{}", op, operand),
            },
            ExprKind::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            ExprKind::Assign { op, target, value } => write!(f, "{} {} {}", target, op, value),
            ExprKind::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprKind::Member { base, member, arrow } => {
                write!(f, "{}{}{}", base, if *arrow { "->" } else { "." }, member)
            }
            ExprKind::Grouped(inner) => write!(f, "({})", inner),
            ExprKind::Cast { expr, .. } => write!(f, "{}", expr),
            _ => write!(f, "<complex>"),
        }
    }
}

/// The kind of an expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    IntLiteral(i64),
    /// Floating-point literal
    FloatLiteral(f64),
    /// Character literal (raw text between the quotes)
    CharLiteral(String),
    /// String literal
    StringLiteral(String),

    /// Identifier reference
    Ident(String),

    /// Single-level subscript: `a[i]`; `a[i][j]` nests
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    /// Function call: `f(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Member access: `s.m` or `p->m`
    Member {
        base: Box<Expr>,
        member: String,
        arrow: bool,
    },

    /// Unary operation
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Assignment (plain or compound); in C this is an expression
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Ternary conditional: `cond ? a : b`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Cast: `(type) expr`
    Cast {
        ty: CType,
        expr: Box<Expr>,
    },

    /// `sizeof(type)`
    SizeofType(CType),

    /// `sizeof expr`
    SizeofExpr(Box<Expr>),

    /// Parenthesized expression
    Grouped(Box<Expr>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `*p`
    Deref,
    /// `&x`
    AddrOf,
    /// `+x`
    Plus,
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
    /// `++x`
    PreInc,
    /// `--x`
    PreDec,
    /// `x++`
    PostInc,
    /// `x--`
    PostDec,
}

impl UnaryOp {
    /// Increment/decrement in either position.
    pub fn is_inc_dec(&self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Deref => write!(f, "*"),
            UnaryOp::AddrOf => write!(f, "&"),
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::BitNot => write!(f, "~"),
            UnaryOp::PreInc | UnaryOp::PostInc => write!(f, "++"),
            UnaryOp::PreDec | UnaryOp::PostDec => write!(f, "--"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Additive or multiplicative, the operators the metrics count.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    /// Comparison operators.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        };
        write!(f, "{}", s)
    }
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,
}

impl AssignOp {
    /// Compound assignments read the target before writing it.
    pub fn is_compound(&self) -> bool {
        !matches!(self, AssignOp::Assign)
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(CType::Int.to_string(), "int");
        assert_eq!(CType::Pointer(Box::new(CType::Double)).to_string(), "double*");

        let arr = CType::Array {
            element: Box::new(CType::Int),
            size: Some(10),
        };
        assert_eq!(arr.to_string(), "int[10]");
    }

    #[test]
    fn test_pointer_like() {
        assert!(CType::Pointer(Box::new(CType::Int)).is_pointer_like());
        assert!(CType::Array { element: Box::new(CType::Int), size: None }.is_pointer_like());
        assert!(!CType::Int.is_pointer_like());
    }

    #[test]
    fn test_strip_parens() {
        let inner = Expr::ident("i", Span::dummy());
        let grouped = Expr::new(ExprKind::Grouped(Box::new(inner)), Span::dummy());
        let cast = Expr::new(
            ExprKind::Cast { ty: CType::Int, expr: Box::new(grouped) },
            Span::dummy(),
        );
        assert_eq!(cast.as_ident(), Some("i"));
    }

    #[test]
    fn test_negative_literal() {
        let lit = Expr::int_lit(3, Span::dummy());
        let neg = Expr::new(
            ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(lit) },
            Span::dummy(),
        );
        assert_eq!(neg.as_int_literal(), Some(-3));
    }

    #[test]
    fn test_subscript_base_name() {
        let span = Span::dummy();
        let m = Expr::ident("M", span);
        let inner = Expr::new(
            ExprKind::Index { base: Box::new(m), index: Box::new(Expr::ident("i", span)) },
            span,
        );
        let outer = Expr::new(
            ExprKind::Index { base: Box::new(inner), index: Box::new(Expr::ident("j", span)) },
            span,
        );
        assert_eq!(outer.subscript_base_name(), Some("M"));
    }

    #[test]
    fn test_index_rendering() {
        let span = Span::dummy();
        let idx = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::ident("i", span)),
                right: Box::new(Expr::int_lit(1, span)),
            },
            span,
        );
        assert_eq!(idx.to_string(), "i - 1");
    }
}
