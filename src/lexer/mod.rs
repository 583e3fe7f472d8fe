//! The lexical front end: turns source bytes into a one-token-lookahead
//! stream the expression/statement parser drives (spec.md section 4.2).
//!
//! Grounded on `jerry_lexer` (original_source): a single current/lookahead
//! token, no token buffer, no separate tokenize-then-parse phase.

pub mod lexer;
pub mod token;

pub use lexer::{decode_string_escapes, number_value, Lexer, SlashContext};
pub use token::{Keyword, NumberKind, Punct, ReservedWord, Token, TokenKind};
