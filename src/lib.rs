//! compactjs — a compact ES5.1 parser and byte-code generator for
//! memory-constrained hosts (spec.md section 1).
//!
//! This crate owns the lexer, the literal store, the parser/byte-code
//! emitter, and the post-processor that turns a parse into a finished
//! [`bytecode::CompiledCode`]. The VM that would execute that byte code is
//! an external consumer and is not part of this crate (spec.md section 1,
//! "the VM itself... is treated as an external consumer").

pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod literals;
pub mod parser;

pub use bytecode::CompiledCode;
pub use error::{Error, ErrorKind, Result, Span};
pub use lexer::{Lexer, Token, TokenKind};
pub use literals::LiteralStore;
pub use parser::{parse_eval, parse_function, parse_script, ParseOutput};

/// Crate version, exposed for host diagnostics (`--version`, error banners).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
