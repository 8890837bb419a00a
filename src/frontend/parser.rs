//! Parser for the C subset.
//!
//! A recursive descent parser producing the analyzer's AST. It covers the
//! part of C the loop analyzer reasons about: functions, declarations with
//! pointer and array declarators, the three loop forms, and the full
//! expression grammar including assignment, casts and pointer operators.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{ParseError, ParseErrorKind};
use crate::utils::location::Span;
use anyhow::{anyhow, bail, Result};

/// A parser for the C subset.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    peeked: Option<Token>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// Create a new parser from a lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let first_token = lexer
            .next_token()
            .map_err(|e| anyhow!("Lexer error: {}", e))?;

        Ok(Self {
            lexer,
            current: first_token.clone(),
            previous: first_token,
            peeked: None,
            errors: Vec::new(),
        })
    }

    /// Parse a complete translation unit.
    pub fn parse_translation_unit(&mut self) -> Result<TranslationUnit> {
        let start = self.current.span;
        let mut unit = TranslationUnit::new();

        while !self.is_at_end() {
            match self.parse_top_level() {
                Ok(TopLevel::Function(func)) => unit.functions.push(func),
                Ok(TopLevel::Globals(decls)) => unit.globals.extend(decls),
                Err(e) => {
                    self.errors.push(self.make_parse_error(&e.to_string()));
                    self.synchronize_top_level();
                }
            }
        }

        unit.span = start.merge(&self.previous.span);

        if !self.errors.is_empty() {
            bail!(
                "{} parse error(s), first: {}",
                self.errors.len(),
                self.errors[0]
            );
        }

        Ok(unit)
    }

    fn parse_top_level(&mut self) -> Result<TopLevel> {
        let start = self.current.span;
        let base = self.parse_type_specifier()?;
        let (name, ty) = self.parse_declarator_head(&base)?;

        if self.check(TokenKind::LeftParen) {
            let func = self.parse_function_rest(name, ty, start)?;
            return Ok(TopLevel::Function(func));
        }

        let decls = self.parse_declarator_rest(name, ty, &base, start)?;
        Ok(TopLevel::Globals(decls))
    }

    /// Parse a type specifier: qualifiers plus one base type.
    fn parse_type_specifier(&mut self) -> Result<CType> {
        let mut base: Option<CType> = None;
        let mut saw_specifier = false;

        loop {
            match self.current.kind {
                TokenKind::Const | TokenKind::Static => {
                    self.advance()?;
                }
                TokenKind::Unsigned | TokenKind::Signed => {
                    saw_specifier = true;
                    base.get_or_insert(CType::Int);
                    self.advance()?;
                }
                TokenKind::Void => {
                    saw_specifier = true;
                    base = Some(CType::Void);
                    self.advance()?;
                }
                TokenKind::CharType => {
                    saw_specifier = true;
                    base = Some(CType::Char);
                    self.advance()?;
                }
                TokenKind::Short | TokenKind::Int | TokenKind::Long => {
                    saw_specifier = true;
                    base = Some(CType::Int);
                    self.advance()?;
                }
                TokenKind::FloatType => {
                    saw_specifier = true;
                    base = Some(CType::Float);
                    self.advance()?;
                }
                TokenKind::Double => {
                    saw_specifier = true;
                    base = Some(CType::Double);
                    self.advance()?;
                }
                TokenKind::Struct => {
                    saw_specifier = true;
                    self.advance()?;
                    let tag = self.consume_identifier("Expected struct tag")?;
                    base = Some(CType::Struct(tag));
                }
                _ => break,
            }
        }

        if !saw_specifier {
            bail!("Expected type specifier, found {:?}", self.current.kind);
        }
        Ok(base.unwrap_or(CType::Int))
    }

    /// Parse pointer stars and the declarator name.
    fn parse_declarator_head(&mut self, base: &CType) -> Result<(String, CType)> {
        let mut ty = base.clone();
        while self.match_token(TokenKind::Star)? {
            ty = CType::Pointer(Box::new(ty));
        }
        let name = self.consume_identifier("Expected declarator name")?;
        Ok((name, ty))
    }

    /// Parse array suffixes on a declarator.
    fn parse_array_suffixes(&mut self, mut ty: CType) -> Result<CType> {
        let mut dims = Vec::new();
        while self.match_token(TokenKind::LeftBracket)? {
            if self.check(TokenKind::RightBracket) {
                dims.push(None);
            } else if self.check(TokenKind::Integer) {
                let size: i64 = self
                    .current
                    .lexeme
                    .trim_end_matches(['u', 'U', 'l', 'L'])
                    .parse()
                    .map_err(|_| anyhow!("Invalid array size"))?;
                self.advance()?;
                dims.push(Some(size));
            } else {
                // Symbolic size (a macro that did not expand, etc.)
                let _ = self.parse_expression()?;
                dims.push(None);
            }
            self.consume(TokenKind::RightBracket, "Expected ']' after array size")?;
        }
        for size in dims.into_iter().rev() {
            ty = CType::Array { element: Box::new(ty), size };
        }
        Ok(ty)
    }

    /// Finish a declaration statement whose first declarator head was
    /// already consumed.
    fn parse_declarator_rest(
        &mut self,
        first_name: String,
        first_ty: CType,
        base: &CType,
        start: Span,
    ) -> Result<Vec<VarDecl>> {
        let mut decls = Vec::new();

        let ty = self.parse_array_suffixes(first_ty)?;
        let init = if self.match_token(TokenKind::Equal)? {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        decls.push(VarDecl {
            name: first_name,
            ty,
            init,
            span: start.merge(&self.previous.span),
        });

        while self.match_token(TokenKind::Comma)? {
            let decl_start = self.current.span;
            let (name, head_ty) = self.parse_declarator_head(base)?;
            let ty = self.parse_array_suffixes(head_ty)?;
            let init = if self.match_token(TokenKind::Equal)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            decls.push(VarDecl {
                name,
                ty,
                init,
                span: decl_start.merge(&self.previous.span),
            });
        }

        self.consume(TokenKind::Semicolon, "Expected ';' after declaration")?;
        Ok(decls)
    }

    fn parse_function_rest(
        &mut self,
        name: String,
        return_type: CType,
        start: Span,
    ) -> Result<Function> {
        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;
        let params = self.parse_parameters()?;
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        // Forward declaration: `int f(...);`
        if self.match_token(TokenKind::Semicolon)? {
            return Ok(Function {
                name,
                return_type,
                params,
                body: Block::empty(),
                span: start.merge(&self.previous.span),
            });
        }

        let body = self.parse_block()?;

        Ok(Function {
            name,
            return_type,
            params,
            body,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Param>> {
        let mut params = Vec::new();

        if self.check(TokenKind::Void) && self.peek_kind()? == TokenKind::RightParen {
            self.advance()?;
            return Ok(params);
        }

        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.parse_parameter()?);
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
        }

        Ok(params)
    }

    fn parse_parameter(&mut self) -> Result<Param> {
        let start = self.current.span;
        let base = self.parse_type_specifier()?;
        let (name, head_ty) = self.parse_declarator_head(&base)?;
        let ty = self.parse_array_suffixes(head_ty)?;

        Ok(Param {
            name,
            ty,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current.span;
        self.consume(TokenKind::LeftBrace, "Expected '{'")?;

        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.consume(TokenKind::RightBrace, "Expected '}'")?;

        Ok(Block {
            statements,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.current.span;

        let kind = match self.current.kind {
            k if k.is_type_keyword() => self.parse_declaration_stmt()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Do => self.parse_do_while_statement()?,
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Break => {
                self.advance()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after break")?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after continue")?;
                StmtKind::Continue
            }
            TokenKind::LeftBrace => StmtKind::Block {
                block: self.parse_block()?,
            },
            TokenKind::Semicolon => {
                self.advance()?;
                StmtKind::Empty
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
                StmtKind::Expression { expr }
            }
        };

        Ok(Stmt {
            kind,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_declaration_stmt(&mut self) -> Result<StmtKind> {
        let start = self.current.span;
        let base = self.parse_type_specifier()?;
        let (name, ty) = self.parse_declarator_head(&base)?;
        let decls = self.parse_declarator_rest(name, ty, &base, start)?;
        Ok(StmtKind::Declaration { decls })
    }

    fn parse_for_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::For, "Expected 'for'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        let init = if self.match_token(TokenKind::Semicolon)? {
            None
        } else if self.current.kind.is_type_keyword() {
            let start = self.current.span;
            let base = self.parse_type_specifier()?;
            let (name, ty) = self.parse_declarator_head(&base)?;
            let decls = self.parse_declarator_rest(name, ty, &base, start)?;
            Some(ForInit::Declaration(decls))
        } else {
            let expr = self.parse_expression()?;
            self.consume(TokenKind::Semicolon, "Expected ';' after for-init")?;
            Some(ForInit::Expression(expr))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after for-condition")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::RightParen, "Expected ')' after for-increment")?;

        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            condition,
            increment,
            body,
        })
    }

    fn parse_while_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::While, "Expected 'while'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::While { condition, body })
    }

    fn parse_do_while_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Do, "Expected 'do'")?;
        let body = Box::new(self.parse_statement()?);
        self.consume(TokenKind::While, "Expected 'while' after do-body")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        self.consume(TokenKind::Semicolon, "Expected ';' after do-while")?;
        Ok(StmtKind::DoWhile { body, condition })
    }

    fn parse_if_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::If, "Expected 'if'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_return_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Return, "Expected 'return'")?;
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after return")?;
        Ok(StmtKind::Return { value })
    }

    // Expression parsing, C precedence, assignment lowest.
    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment_expr()
    }

    fn parse_assignment_expr(&mut self) -> Result<Expr> {
        let expr = self.parse_ternary_expr()?;

        let op = match self.current.kind {
            TokenKind::Equal => Some(AssignOp::Assign),
            TokenKind::PlusEqual => Some(AssignOp::AddAssign),
            TokenKind::MinusEqual => Some(AssignOp::SubAssign),
            TokenKind::StarEqual => Some(AssignOp::MulAssign),
            TokenKind::SlashEqual => Some(AssignOp::DivAssign),
            TokenKind::PercentEqual => Some(AssignOp::ModAssign),
            _ => None,
        };

        if let Some(op) = op {
            self.advance()?;
            let value = self.parse_assignment_expr()?;
            let span = expr.span.merge(&value.span);
            return Ok(Expr::new(
                ExprKind::Assign {
                    op,
                    target: Box::new(expr),
                    value: Box::new(value),
                },
                span,
            ));
        }

        Ok(expr)
    }

    fn parse_ternary_expr(&mut self) -> Result<Expr> {
        let condition = self.parse_or_expr()?;
        if self.match_token(TokenKind::Question)? {
            let then_expr = self.parse_expression()?;
            self.consume(TokenKind::Colon, "Expected ':' in conditional expression")?;
            let else_expr = self.parse_assignment_expr()?;
            let span = condition.span.merge(&else_expr.span);
            return Ok(Expr::new(
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ));
        }
        Ok(condition)
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.match_token(TokenKind::PipePipe)? {
            let right = self.parse_and_expr()?;
            left = Self::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_bitor_expr()?;
        while self.match_token(TokenKind::AmpAmp)? {
            let right = self.parse_bitor_expr()?;
            left = Self::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_bitor_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_bitxor_expr()?;
        while self.match_token(TokenKind::Pipe)? {
            let right = self.parse_bitxor_expr()?;
            left = Self::binary(BinaryOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn parse_bitxor_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_bitand_expr()?;
        while self.match_token(TokenKind::Caret)? {
            let right = self.parse_bitand_expr()?;
            left = Self::binary(BinaryOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn parse_bitand_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality_expr()?;
        while self.check(TokenKind::Amp) {
            self.advance()?;
            let right = self.parse_equality_expr()?;
            left = Self::binary(BinaryOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Ne,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expr()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_shift_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_shift_expr()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_shift_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::LessLess => BinaryOp::Shl,
                TokenKind::GreaterGreater => BinaryOp::Shr,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expr()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expr()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expr()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let start = self.current.span;

        let op = match self.current.kind {
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Amp => Some(UnaryOp::AddrOf),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::PlusPlus => Some(UnaryOp::PreInc),
            TokenKind::MinusMinus => Some(UnaryOp::PreDec),
            _ => None,
        };

        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary_expr()?;
            let span = start.merge(&operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        if self.check(TokenKind::Sizeof) {
            return self.parse_sizeof_expr();
        }

        // Cast: '(' type ')' unary-expr
        if self.check(TokenKind::LeftParen) && self.peek_kind()?.is_type_keyword() {
            self.advance()?; // '('
            let base = self.parse_type_specifier()?;
            let mut ty = base;
            while self.match_token(TokenKind::Star)? {
                ty = CType::Pointer(Box::new(ty));
            }
            self.consume(TokenKind::RightParen, "Expected ')' after cast type")?;
            let expr = self.parse_unary_expr()?;
            let span = start.merge(&expr.span);
            return Ok(Expr::new(
                ExprKind::Cast {
                    ty,
                    expr: Box::new(expr),
                },
                span,
            ));
        }

        self.parse_postfix_expr()
    }

    fn parse_sizeof_expr(&mut self) -> Result<Expr> {
        let start = self.current.span;
        self.consume(TokenKind::Sizeof, "Expected 'sizeof'")?;

        if self.check(TokenKind::LeftParen) && self.peek_kind()?.is_type_keyword() {
            self.advance()?; // '('
            let base = self.parse_type_specifier()?;
            let mut ty = base;
            while self.match_token(TokenKind::Star)? {
                ty = CType::Pointer(Box::new(ty));
            }
            self.consume(TokenKind::RightParen, "Expected ')' after sizeof type")?;
            return Ok(Expr::new(
                ExprKind::SizeofType(ty),
                start.merge(&self.previous.span),
            ));
        }

        let operand = self.parse_unary_expr()?;
        let span = start.merge(&operand.span);
        Ok(Expr::new(ExprKind::SizeofExpr(Box::new(operand)), span))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary_expr()?;

        loop {
            match self.current.kind {
                TokenKind::LeftBracket => {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RightBracket, "Expected ']' after subscript")?;
                    let span = expr.span.merge(&self.previous.span);
                    expr = Expr::new(
                        ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LeftParen => {
                    self.advance()?;
                    let args = self.parse_args()?;
                    self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
                    let span = expr.span.merge(&self.previous.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let arrow = self.current.kind == TokenKind::Arrow;
                    self.advance()?;
                    let member = self.consume_identifier("Expected member name")?;
                    let span = expr.span.merge(&self.previous.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            base: Box::new(expr),
                            member,
                            arrow,
                        },
                        span,
                    );
                }
                TokenKind::PlusPlus => {
                    self.advance()?;
                    let span = expr.span.merge(&self.previous.span);
                    expr = Expr::new(
                        ExprKind::Unary {
                            op: UnaryOp::PostInc,
                            operand: Box::new(expr),
                        },
                        span,
                    );
                }
                TokenKind::MinusMinus => {
                    self.advance()?;
                    let span = expr.span.merge(&self.previous.span);
                    expr = Expr::new(
                        ExprKind::Unary {
                            op: UnaryOp::PostDec,
                            operand: Box::new(expr),
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let start = self.current.span;

        match self.current.kind {
            TokenKind::Integer => {
                let digits = self
                    .current
                    .lexeme
                    .trim_end_matches(['u', 'U', 'l', 'L']);
                let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
                    i64::from_str_radix(hex, 16).map_err(|_| anyhow!("Invalid integer literal"))?
                } else {
                    digits.parse().map_err(|_| anyhow!("Invalid integer literal"))?
                };
                self.advance()?;
                Ok(Expr::int_lit(value, start))
            }
            TokenKind::Float => {
                let text = self.current.lexeme.trim_end_matches(['f', 'F', 'l', 'L']);
                let value: f64 = text.parse().map_err(|_| anyhow!("Invalid float literal"))?;
                self.advance()?;
                Ok(Expr::new(ExprKind::FloatLiteral(value), start))
            }
            TokenKind::Char => {
                let inner = self.current.lexeme[1..self.current.lexeme.len() - 1].to_string();
                self.advance()?;
                Ok(Expr::new(ExprKind::CharLiteral(inner), start))
            }
            TokenKind::String => {
                let inner = self.current.lexeme[1..self.current.lexeme.len() - 1].to_string();
                self.advance()?;
                Ok(Expr::new(ExprKind::StringLiteral(inner), start))
            }
            TokenKind::Identifier => {
                let name = self.current.lexeme.clone();
                self.advance()?;
                Ok(Expr::ident(name, start))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')'")?;
                Ok(Expr::new(
                    ExprKind::Grouped(Box::new(inner)),
                    start.merge(&self.previous.span),
                ))
            }
            _ => bail!("Expected expression, found {:?}", self.current.kind),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_assignment_expr()?);
                if !self.match_token(TokenKind::Comma)? {
                    break;
                }
            }
        }
        Ok(args)
    }

    // Helper methods
    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(&right.span);
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Result<&Token> {
        self.previous = self.current.clone();
        self.current = match self.peeked.take() {
            Some(token) => token,
            None => self
                .lexer
                .next_token()
                .map_err(|e| anyhow!("Lexer error: {}", e))?,
        };
        Ok(&self.previous)
    }

    /// Look one token past the current one.
    fn peek_kind(&mut self) -> Result<TokenKind> {
        if self.peeked.is_none() {
            self.peeked = Some(
                self.lexer
                    .next_token()
                    .map_err(|e| anyhow!("Lexer error: {}", e))?,
            );
        }
        Ok(self.peeked.as_ref().unwrap().kind)
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            self.advance()
        } else {
            bail!(
                "{}: expected {:?}, found {:?}",
                message,
                kind,
                self.current.kind
            )
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<String> {
        if self.check(TokenKind::Identifier) {
            let name = self.current.lexeme.clone();
            self.advance()?;
            Ok(name)
        } else {
            bail!(
                "{}: expected identifier, found {:?}",
                message,
                self.current.kind
            )
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> Result<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn make_parse_error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: self.current.span,
            kind: ParseErrorKind::UnexpectedToken,
            found: Some(format!("{:?}", self.current.kind)),
        }
    }

    fn synchronize_top_level(&mut self) {
        if !self.is_at_end() {
            let _ = self.advance();
        }
        while !self.is_at_end() {
            if self.previous.kind == TokenKind::Semicolon
                || self.previous.kind == TokenKind::RightBrace
            {
                return;
            }
            if self.current.kind.is_type_keyword() {
                return;
            }
            let _ = self.advance();
        }
    }
}

enum TopLevel {
    Function(Function),
    Globals(Vec<VarDecl>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<TranslationUnit> {
        let lexer = Lexer::new(source);
        let mut parser = Parser::new(lexer)?;
        parser.parse_translation_unit()
    }

    #[test]
    fn test_empty_function() {
        let unit = parse("void f(void) {}").unwrap();
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].name, "f");
        assert!(unit.functions[0].params.is_empty());
    }

    #[test]
    fn test_params() {
        let unit = parse("void f(double *A, int n, float B[100]) {}").unwrap();
        let params = &unit.functions[0].params;
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].ty, CType::Pointer(Box::new(CType::Double)));
        assert_eq!(params[1].ty, CType::Int);
        assert!(params[2].ty.is_pointer_like());
    }

    #[test]
    fn test_globals() {
        let unit = parse("int counter; double data[100];").unwrap();
        assert_eq!(unit.globals.len(), 2);
        assert_eq!(unit.globals[0].name, "counter");
        assert!(unit.globals[1].ty.is_pointer_like());
    }

    #[test]
    fn test_for_loop() {
        let unit = parse(
            "void f(int *A, int n) { for (int i = 0; i < n; i++) { A[i] = i; } }",
        )
        .unwrap();
        let body = &unit.functions[0].body;
        assert!(matches!(body.statements[0].kind, StmtKind::For { .. }));
        if let StmtKind::For { init, condition, increment, .. } = &body.statements[0].kind {
            assert!(matches!(init, Some(ForInit::Declaration(_))));
            assert!(condition.is_some());
            assert!(increment.is_some());
        }
    }

    #[test]
    fn test_for_with_assignment_init() {
        let unit = parse("void f(int n) { int i; for (i = 0; i < n; i++) {} }").unwrap();
        let body = &unit.functions[0].body;
        if let StmtKind::For { init, .. } = &body.statements[1].kind {
            assert!(matches!(init, Some(ForInit::Expression(_))));
        } else {
            panic!("expected for loop");
        }
    }

    #[test]
    fn test_while_and_do_while() {
        let unit = parse(
            "void f(int n) { while (n > 0) { n--; } do { n++; } while (n < 10); }",
        )
        .unwrap();
        let stmts = &unit.functions[0].body.statements;
        assert!(matches!(stmts[0].kind, StmtKind::While { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::DoWhile { .. }));
    }

    #[test]
    fn test_compound_assignment() {
        let unit = parse("void f(int x) { x += 2; }").unwrap();
        let stmts = &unit.functions[0].body.statements;
        if let StmtKind::Expression { expr } = &stmts[0].kind {
            assert!(matches!(
                expr.kind,
                ExprKind::Assign { op: AssignOp::AddAssign, .. }
            ));
        } else {
            panic!("expected expression statement");
        }
    }

    #[test]
    fn test_pointer_expressions() {
        let unit = parse("void f(int *p, int x) { *p = x; p++; int *q = &x; }").unwrap();
        assert_eq!(unit.functions[0].body.statements.len(), 3);
    }

    #[test]
    fn test_nested_subscripts() {
        let unit = parse("void f(int M[10][10]) { M[1][2] = 3; }").unwrap();
        if let StmtKind::Expression { expr } = &unit.functions[0].body.statements[0].kind {
            if let ExprKind::Assign { target, .. } = &expr.kind {
                assert_eq!(target.subscript_base_name(), Some("M"));
            } else {
                panic!("expected assignment");
            }
        }
    }

    #[test]
    fn test_cast_expression() {
        let unit = parse("void f(double d) { int x = (int) d; }").unwrap();
        assert_eq!(unit.functions.len(), 1);
    }

    #[test]
    fn test_call_and_member() {
        let unit = parse("void f(struct node *n) { g(n->value, 1); }").unwrap();
        assert_eq!(unit.functions.len(), 1);
    }

    #[test]
    fn test_multi_declarator() {
        let unit = parse("void f(void) { int a = 1, *p, b[4]; }").unwrap();
        if let StmtKind::Declaration { decls } = &unit.functions[0].body.statements[0].kind {
            assert_eq!(decls.len(), 3);
            assert_eq!(decls[1].ty, CType::Pointer(Box::new(CType::Int)));
            assert!(decls[2].ty.is_pointer_like());
        } else {
            panic!("expected declaration");
        }
    }

    #[test]
    fn test_ternary_and_sizeof() {
        let unit = parse("void f(int a) { int b = a > 0 ? a : -a; int s = sizeof(int); }").unwrap();
        assert_eq!(unit.functions.len(), 1);
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(parse("void f( { }").is_err());
    }
}
