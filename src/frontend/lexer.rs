//! Lexer for the C subset.
//!
//! The lexer converts source text into a stream of tokens. It also carries
//! a small preprocessor layer: object-like `#define` macros are recorded
//! and expanded inline (expanded tokens keep their spelling span at the
//! definition site and are flagged with the expansion line), `#undef`
//! removes a macro, and every other directive line — `#include`,
//! `#pragma`, conditionals — is skipped to end of line. Skipping `#pragma`
//! is what makes analysis of an already-annotated file reproduce the
//! original verdicts.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, Span};
use unicode_xid::UnicodeXID;
use std::collections::{HashMap, VecDeque};
use std::iter::Peekable;
use std::str::Chars;

/// Maximum nesting of macro-in-macro expansion.
const MAX_MACRO_DEPTH: usize = 8;

/// An object-like macro recorded from a `#define` line.
#[derive(Debug, Clone)]
struct MacroDef {
    /// Raw body text (single line)
    body: String,
    /// Line of the definition body
    line: usize,
}

/// A lexer for tokenizing C source code.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// True once a non-directive token has been produced on the current line
    line_has_token: bool,
    /// Recorded object-like macros
    macros: HashMap<String, MacroDef>,
    /// Tokens queued by macro expansion
    pending: VecDeque<Token>,
    /// Whether we've hit EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            line_has_token: false,
            macros: HashMap::new(),
            pending: VecDeque::new(),
            at_eof: false,
        }
    }

    /// Get the current location.
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    /// Mark the start of a new token.
    fn mark_token_start(&mut self) {
        self.token_start = self.current_location();
    }

    /// Create a span from token start to current location.
    fn make_span(&self) -> Span {
        Span::from_locations(self.token_start, self.current_location())
    }

    /// Peek at the current character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek at the next character (one ahead).
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    /// Consume and return the current character.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_has_token = false;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the current character if it matches.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace, comments and preprocessor directive lines.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('#') if !self.line_has_token => {
                    self.consume_directive();
                }
                Some('/') => {
                    if self.peek_next() == Some('/') {
                        while self.peek().is_some() && self.peek() != Some('\n') {
                            self.advance();
                        }
                    } else if self.peek_next() == Some('*') {
                        self.advance(); // /
                        self.advance(); // *
                        loop {
                            match self.advance() {
                                Some('*') if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                None => break,
                                _ => {}
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Handle a preprocessor directive starting at `#`.
    fn consume_directive(&mut self) {
        self.advance(); // '#'
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }

        let mut directive = String::new();
        while self.peek().map(|c| c.is_ascii_alphabetic()).unwrap_or(false) {
            directive.push(self.advance().unwrap());
        }

        match directive.as_str() {
            "define" => self.consume_define(),
            "undef" => {
                let name = self.read_directive_identifier();
                if !name.is_empty() {
                    self.macros.remove(&name);
                }
                self.skip_to_line_end();
            }
            _ => self.skip_to_line_end(),
        }
    }

    /// Record an object-like `#define NAME body` macro.
    ///
    /// Function-like macros (`#define NAME(...)`) are not expanded; their
    /// uses parse as ordinary call expressions and fall to the call-effect
    /// analyzer's unknown-callee rule.
    fn consume_define(&mut self) {
        let name = self.read_directive_identifier();
        if name.is_empty() {
            self.skip_to_line_end();
            return;
        }

        if self.peek() == Some('(') {
            self.skip_to_line_end();
            return;
        }

        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }

        let body_line = self.line;
        let body_start = self.offset;
        self.skip_to_line_end();
        let body = self.source[body_start..self.offset]
            .trim_end_matches(['\r', '\n'])
            .trim_end()
            .to_string();

        self.macros.insert(name, MacroDef { body, line: body_line });
    }

    fn read_directive_identifier(&mut self) -> String {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }
        let mut name = String::new();
        while self
            .peek()
            .map(|c| c.is_xid_continue() || c == '_')
            .unwrap_or(false)
        {
            name.push(self.advance().unwrap());
        }
        name
    }

    fn skip_to_line_end(&mut self) {
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.advance();
        }
    }

    /// Create a token with the given kind.
    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = self.source[span.start_offset..span.end_offset].to_string();
        Token::new(kind, span, lexeme)
    }

    /// Create an error.
    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    /// Scan a number literal (decimal, hex, octal, or floating point).
    fn scan_number(&mut self, first: char) -> Result<Token, LexerError> {
        // hex
        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            if !self.peek().map(|c| c.is_ascii_hexdigit()).unwrap_or(false) {
                return Err(self.make_error("Invalid hex literal", LexerErrorKind::InvalidNumber));
            }
            while self.peek().map(|c| c.is_ascii_hexdigit()).unwrap_or(false) {
                self.advance();
            }
            self.consume_int_suffix();
            return Ok(self.make_token(TokenKind::Integer));
        }

        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
        }

        let mut is_float = false;

        if self.peek() == Some('.') && self.peek_next().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            is_float = true;
            self.advance(); // '.'
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            if !self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                return Err(self.make_error(
                    "Invalid floating-point exponent",
                    LexerErrorKind::InvalidNumber,
                ));
            }
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
        }

        if is_float {
            if matches!(self.peek(), Some('f') | Some('F') | Some('l') | Some('L')) {
                self.advance();
            }
            Ok(self.make_token(TokenKind::Float))
        } else {
            self.consume_int_suffix();
            Ok(self.make_token(TokenKind::Integer))
        }
    }

    fn consume_int_suffix(&mut self) {
        while matches!(self.peek(), Some('u') | Some('U') | Some('l') | Some('L')) {
            self.advance();
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .map(|c| c.is_xid_continue() || c == '_')
            .unwrap_or(false)
        {
            self.advance();
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start_offset..span.end_offset];

        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, span, lexeme.to_string())
    }

    /// Scan a string literal (opening quote already consumed).
    fn scan_string(&mut self) -> Result<Token, LexerError> {
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(self.make_error(
                            "Unterminated string literal",
                            LexerErrorKind::UnterminatedString,
                        ));
                    }
                }
                Some('\n') | None => {
                    return Err(self.make_error(
                        "Unterminated string literal",
                        LexerErrorKind::UnterminatedString,
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(self.make_token(TokenKind::String))
    }

    /// Scan a character literal (opening quote already consumed).
    fn scan_char(&mut self) -> Result<Token, LexerError> {
        loop {
            match self.advance() {
                Some('\'') => break,
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(self.make_error(
                            "Unterminated character literal",
                            LexerErrorKind::UnterminatedChar,
                        ));
                    }
                }
                Some('\n') | None => {
                    return Err(self.make_error(
                        "Unterminated character literal",
                        LexerErrorKind::UnterminatedChar,
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(self.make_token(TokenKind::Char))
    }

    /// Scan the next raw token, before macro expansion.
    fn next_raw_token(&mut self) -> Result<Token, LexerError> {
        self.skip_trivia();
        self.mark_token_start();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };
        self.line_has_token = true;

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            '?' => Ok(self.make_token(TokenKind::Question)),
            '.' => Ok(self.make_token(TokenKind::Dot)),
            '~' => Ok(self.make_token(TokenKind::Tilde)),

            '+' => {
                if self.match_char('+') {
                    Ok(self.make_token(TokenKind::PlusPlus))
                } else if self.match_char('=') {
                    Ok(self.make_token(TokenKind::PlusEqual))
                } else {
                    Ok(self.make_token(TokenKind::Plus))
                }
            }
            '-' => {
                if self.match_char('-') {
                    Ok(self.make_token(TokenKind::MinusMinus))
                } else if self.match_char('=') {
                    Ok(self.make_token(TokenKind::MinusEqual))
                } else if self.match_char('>') {
                    Ok(self.make_token(TokenKind::Arrow))
                } else {
                    Ok(self.make_token(TokenKind::Minus))
                }
            }
            '*' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::StarEqual))
                } else {
                    Ok(self.make_token(TokenKind::Star))
                }
            }
            '/' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::SlashEqual))
                } else {
                    Ok(self.make_token(TokenKind::Slash))
                }
            }
            '%' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::PercentEqual))
                } else {
                    Ok(self.make_token(TokenKind::Percent))
                }
            }

            '=' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::EqualEqual))
                } else {
                    Ok(self.make_token(TokenKind::Equal))
                }
            }
            '!' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::BangEqual))
                } else {
                    Ok(self.make_token(TokenKind::Bang))
                }
            }
            '<' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::LessEqual))
                } else if self.match_char('<') {
                    Ok(self.make_token(TokenKind::LessLess))
                } else {
                    Ok(self.make_token(TokenKind::Less))
                }
            }
            '>' => {
                if self.match_char('=') {
                    Ok(self.make_token(TokenKind::GreaterEqual))
                } else if self.match_char('>') {
                    Ok(self.make_token(TokenKind::GreaterGreater))
                } else {
                    Ok(self.make_token(TokenKind::Greater))
                }
            }
            '&' => {
                if self.match_char('&') {
                    Ok(self.make_token(TokenKind::AmpAmp))
                } else {
                    Ok(self.make_token(TokenKind::Amp))
                }
            }
            '|' => {
                if self.match_char('|') {
                    Ok(self.make_token(TokenKind::PipePipe))
                } else {
                    Ok(self.make_token(TokenKind::Pipe))
                }
            }
            '^' => Ok(self.make_token(TokenKind::Caret)),

            '"' => self.scan_string(),
            '\'' => self.scan_char(),

            c if c.is_ascii_digit() => self.scan_number(c),
            c if c.is_xid_start() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(self.make_error(
                &format!("Unexpected character: '{}'", c),
                LexerErrorKind::UnexpectedChar,
            )),
        }
    }

    /// Expand a macro use into its body tokens.
    ///
    /// Every expanded token is positioned at the use site (the macro name's
    /// span) and carries the definition line as its spelling line, the way
    /// a compiler reports expansion locations.
    fn expand_macro(
        &self,
        name: &str,
        use_span: Span,
        depth: usize,
        out: &mut Vec<Token>,
    ) -> Result<(), LexerError> {
        if depth > MAX_MACRO_DEPTH {
            return Err(LexerError {
                message: format!("Macro expansion too deep for '{}'", name),
                span: use_span,
                kind: LexerErrorKind::MacroDepthExceeded,
            });
        }

        let def = match self.macros.get(name) {
            Some(def) => def.clone(),
            None => return Ok(()),
        };

        let mut sub = Lexer::new(&def.body);
        loop {
            let mut token = sub.next_raw_token()?;
            if token.is_eof() {
                break;
            }
            token.span = use_span.with_spelling(def.line);

            if token.kind == TokenKind::Identifier && self.macros.contains_key(&token.lexeme) {
                self.expand_macro(&token.lexeme.clone(), use_span, depth + 1, out)?;
            } else {
                out.push(token);
            }
        }
        Ok(())
    }

    /// Scan the next token, with macro expansion applied.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }

            let token = self.next_raw_token()?;
            if token.kind == TokenKind::Identifier && self.macros.contains_key(&token.lexeme) {
                let mut expanded = Vec::new();
                self.expand_macro(&token.lexeme, token.span, 0, &mut expanded)?;
                // An empty body expands to nothing; continue with the
                // following token.
                self.pending.extend(expanded);
                continue;
            }
            return Ok(token);
        }
    }

    /// Check if we've reached EOF.
    pub fn is_at_end(&self) -> bool {
        self.at_eof && self.pending.is_empty()
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_at_end() {
            None
        } else {
            let result = self.next_token();
            Some(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().unwrap()
    }

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_keywords() {
        let kinds = token_kinds("for while do if else return int double");
        assert_eq!(
            kinds,
            vec![
                TokenKind::For,
                TokenKind::While,
                TokenKind::Do,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Return,
                TokenKind::Int,
                TokenKind::Double,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("foo bar _tmp x123");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "foo");
        assert_eq!(tokens[2].lexeme, "_tmp");
        assert_eq!(tokens[3].lexeme, "x123");
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("123 45.67 1e10 0x1F 100UL 3.0f");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[2].kind, TokenKind::Float);
        assert_eq!(tokens[3].kind, TokenKind::Integer);
        assert_eq!(tokens[4].kind, TokenKind::Integer);
        assert_eq!(tokens[5].kind, TokenKind::Float);
    }

    #[test]
    fn test_operators() {
        let kinds = token_kinds("++ -- -> += *= && || << >> & |");
        assert_eq!(kinds[0], TokenKind::PlusPlus);
        assert_eq!(kinds[1], TokenKind::MinusMinus);
        assert_eq!(kinds[2], TokenKind::Arrow);
        assert_eq!(kinds[3], TokenKind::PlusEqual);
        assert_eq!(kinds[4], TokenKind::StarEqual);
        assert_eq!(kinds[5], TokenKind::AmpAmp);
        assert_eq!(kinds[6], TokenKind::PipePipe);
        assert_eq!(kinds[7], TokenKind::LessLess);
        assert_eq!(kinds[8], TokenKind::GreaterGreater);
        assert_eq!(kinds[9], TokenKind::Amp);
        assert_eq!(kinds[10], TokenKind::Pipe);
    }

    #[test]
    fn test_comments() {
        let tokens = lex("foo // comment\nbar /* block */ baz");
        assert_eq!(tokens[0].lexeme, "foo");
        assert_eq!(tokens[1].lexeme, "bar");
        assert_eq!(tokens[2].lexeme, "baz");
    }

    #[test]
    fn test_char_and_string() {
        let tokens = lex(r#"'a' '\n' "hello\n""#);
        assert_eq!(tokens[0].kind, TokenKind::Char);
        assert_eq!(tokens[1].kind, TokenKind::Char);
        assert_eq!(tokens[2].kind, TokenKind::String);
    }

    #[test]
    fn test_directives_skipped() {
        let tokens = lex("#include <stdio.h>\n#pragma omp parallel for\nint x;");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[1].lexeme, "x");
    }

    #[test]
    fn test_object_macro_expansion() {
        let tokens = lex("#define N 100\nint a[N];");
        let n = tokens.iter().find(|t| t.lexeme == "100").unwrap();
        assert_eq!(n.kind, TokenKind::Integer);
        assert!(n.span.from_macro);
        assert_eq!(n.span.start_line, 2);
        assert_eq!(n.span.spelling_line, 1);
    }

    #[test]
    fn test_nested_macro_expansion() {
        let tokens = lex("#define A 1\n#define B A + A\nint x = B;");
        let ones: Vec<_> = tokens.iter().filter(|t| t.lexeme == "1").collect();
        assert_eq!(ones.len(), 2);
    }

    #[test]
    fn test_undef() {
        let tokens = lex("#define N 100\n#undef N\nint a[N];");
        assert!(tokens.iter().any(|t| t.lexeme == "N"));
        assert!(!tokens.iter().any(|t| t.lexeme == "100"));
    }

    #[test]
    fn test_function_like_macro_not_expanded() {
        let tokens = lex("#define SQ(x) ((x)*(x))\nint y = SQ(3);");
        assert!(tokens.iter().any(|t| t.lexeme == "SQ"));
    }

    #[test]
    fn test_location_tracking() {
        let tokens = lex("foo\nbar");
        assert_eq!(tokens[0].span.start_line, 1);
        assert_eq!(tokens[1].span.start_line, 2);
    }

    #[test]
    fn test_hash_not_at_line_start_is_error() {
        let result = Lexer::new("int x; #foo").tokenize();
        assert!(result.is_err());
    }

    #[test]
    fn test_full_c_loop() {
        let source = r#"
            void scale(double *A, double *B, int n) {
                for (int i = 0; i < n; i++) {
                    B[i] = A[i] * 2.0;
                }
            }
        "#;
        assert!(Lexer::new(source).tokenize().is_ok());
    }
}
