pub mod lexer;
pub mod sexp;

// Re-export for convenience
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use sexp::{
    format_number, is_bare_symbol, parse_forms, quote_if_needed, SExp, SExpParser,
    MAX_DEPTH,
};
