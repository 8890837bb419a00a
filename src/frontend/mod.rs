//! Front-end: lexer, parser and AST for the analyzed C subset.
//!
//! The analyzer does not need all of C. The front-end covers the part the
//! dependency analyses reason about — functions, declarations, the three
//! loop forms, subscripts, calls and pointer operators — plus a small
//! preprocessor layer for object-like macros, so that macro-expanded loops
//! can be recognized and skipped at pragma-insertion time.

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod symbols;

// Re-exports
pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use symbols::{SymbolInfo, SymbolTable};
pub use token::{Token, TokenKind};

use anyhow::Result;

/// Parse C source code into a translation unit.
pub fn parse(source: &str) -> Result<ast::TranslationUnit> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer)?;
    parser.parse_translation_unit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let source = r#"
            void init(int *A, int n) {
                for (int i = 0; i < n; i++) {
                    A[i] = i;
                }
            }
        "#;
        let unit = parse(source).unwrap();
        assert_eq!(unit.functions.len(), 1);
    }
}
