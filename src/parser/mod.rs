//! Recursive-descent statement parser driving a precedence-climbing
//! expression compiler, both emitting directly to byte code — no
//! intermediate AST (spec.md section 4).
//!
//! Grounded on the single-pass architecture `js-parser.c` uses: one
//! current/lookahead token from the lexer, one [`FunctionContext`] per
//! function body on a stack, and statements that emit as they're
//! recognized rather than after a separate tree-build pass.

pub mod context;
pub mod expressions;
pub mod function;
pub mod statements;

pub use function::FunctionContext;

use crate::bytecode::compiled_code::FunctionKind;
use crate::bytecode::postprocess::{self, RawFunction};
use crate::bytecode::{CompiledCode, LiteralPoolEntry};
use crate::error::{Error, ErrorKind, Result, Span};
use crate::lexer::{Lexer, SlashContext, Token, TokenKind};
use crate::literals::LiteralStore;

use context::FrameStack;

/// One function body's worth of parsing state: its scratch
/// [`FunctionContext`], its break/continue/label bookkeeping.
struct Scope {
    func: FunctionContext,
    frames: FrameStack,
}

/// Ties the lexer, the shared literal store, and the function-scope stack
/// together. One `Parser` compiles exactly one top-level unit (a script, a
/// standalone function body, or an `eval` string); nested function
/// expressions/declarations push and pop their own [`Scope`] on
/// `self.scopes` as they're encountered.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    store: &'a mut LiteralStore,
    scopes: Vec<Scope>,
    /// Finished nested functions, in discovery order; a parent function's
    /// `Other` literal-pool entries index into this.
    functions: Vec<CompiledCode>,
    slash_ctx: SlashContext,
}

/// The result of parsing one compilation unit: the top-level compiled code
/// plus every nested function discovered while parsing it, in the order a
/// `Function` literal-pool entry's index expects.
#[derive(Debug)]
pub struct ParseOutput {
    pub top_level: CompiledCode,
    pub functions: Vec<CompiledCode>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, store: &'a mut LiteralStore) -> Result<Self> {
        let lexer = Lexer::new(source)?;
        Ok(Parser { lexer, store, scopes: Vec::new(), functions: Vec::new(), slash_ctx: SlashContext::RegexpAllowed })
    }

    fn current(&self) -> Token {
        self.lexer.current()
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn text(&self, span: Span) -> &'a str {
        self.lexer.text(span)
    }

    /// Advance the lexer, telling it whether a `/` right after the token we
    /// just consumed could start a regexp (spec.md section 4.2, point 6).
    fn bump(&mut self, next_ctx: SlashContext) -> Result<Token> {
        let tok = self.lexer.advance(self.slash_ctx)?;
        self.slash_ctx = next_ctx;
        Ok(tok)
    }

    fn expect_punct(&mut self, punct: crate::lexer::Punct, kind: ErrorKind) -> Result<Span> {
        match self.current().kind {
            TokenKind::Punct(p) if p == punct => Ok(self.bump(SlashContext::RegexpAllowed)?.span),
            _ => Err(Error::parse(kind, self.current_span())),
        }
    }

    fn at_punct(&self, punct: crate::lexer::Punct) -> bool {
        matches!(self.current().kind, TokenKind::Punct(p) if p == punct)
    }

    fn at_keyword(&self, kw: crate::lexer::Keyword) -> bool {
        matches!(self.current().kind, TokenKind::Keyword(k) if k == kw)
    }

    fn eat_punct(&mut self, punct: crate::lexer::Punct, next_ctx: SlashContext) -> Result<bool> {
        if self.at_punct(punct) {
            self.bump(next_ctx)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn scope(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("no active function scope")
    }

    fn store(&mut self) -> &mut LiteralStore {
        self.store
    }

    fn stream_offset(&mut self) -> crate::bytecode::page::StreamOffset {
        self.scope().func.emitter.stream().len()
    }

    fn push_scope(&mut self, kind: FunctionKind, argument_count: u16, strict: bool) {
        self.scopes.push(Scope { func: FunctionContext::new(kind, argument_count, strict), frames: FrameStack::new() });
    }

    fn pop_scope(&mut self, source_range: (u32, u32)) -> RawFunction {
        let scope = self.scopes.pop().expect("pop_scope without a matching push");
        scope.func.finish(source_range)
    }

    fn strict(&self) -> bool {
        self.scopes.last().map(|s| s.func.strict).unwrap_or(false)
    }

    /// Register a just-finished nested function in the parent's literal
    /// pool, returning the provisional literal the caller should emit a
    /// closure-creation push for.
    fn finish_nested_function(&mut self, raw: RawFunction) -> crate::bytecode::ProvisionalLiteral {
        let compiled = postprocess::finish(raw);
        let index = self.functions.len() as u16;
        self.functions.push(compiled);
        self.scope().func.nested_function_literal(LiteralPoolEntry::Function(index))
    }
}

fn finish_top_level(mut parser: Parser<'_>, source_len: usize) -> ParseOutput {
    parser.scope().func.emitter.emit_barrier(crate::bytecode::Opcode::CbcReturnWithUndefined, crate::bytecode::emitter::Operand::None);
    let raw = parser.pop_scope((0, source_len as u32));
    let top_level = postprocess::finish(raw);
    ParseOutput { top_level, functions: parser.functions }
}

/// Parse a full program: statements run in the global scope, `this` is the
/// global object.
pub fn parse_script(source: &str, store: &mut LiteralStore) -> Result<ParseOutput> {
    let mut parser = Parser::new(source, store)?;
    parser.push_scope(FunctionKind::Script, 0, false);
    let strict = parser.parse_directive_prologue()?;
    parser.scope().func.strict = strict;
    if strict {
        parser.scope().func.status_flags |= crate::bytecode::compiled_code::status_flags::STRICT_MODE;
    }
    parser.parse_statement_list_until_eof()?;
    Ok(finish_top_level(parser, source.len()))
}

/// Parse the body of a single function given its already-known parameter
/// names, as if compiling `Function(params..., body)` — the host's
/// `new Function(...)` entry point (spec.md section 6).
pub fn parse_function(params: &[&str], body: &str, store: &mut LiteralStore) -> Result<ParseOutput> {
    let mut parser = Parser::new(body, store)?;
    parser.push_scope(FunctionKind::Function, params.len() as u16, false);
    for name in params {
        let ptr = parser.store.find_or_create_from_utf8(name.as_bytes(), Span::default())?;
        parser.scope().func.ident_literal(ptr);
    }
    let strict = parser.parse_directive_prologue()?;
    parser.scope().func.strict = strict;
    if strict {
        parser.scope().func.status_flags |= crate::bytecode::compiled_code::status_flags::STRICT_MODE;
    }
    parser.parse_statement_list_until_eof()?;
    Ok(finish_top_level(parser, body.len()))
}

/// Parse an `eval` string in the caller's strict-mode setting; spec.md's
/// scope excludes eval's separate-scope/direct-vs-indirect distinction, so
/// this is otherwise identical to [`parse_script`] with the strictness
/// forced by the caller rather than (re-)detected from a directive prologue.
pub fn parse_eval(source: &str, caller_is_strict: bool, store: &mut LiteralStore) -> Result<ParseOutput> {
    let mut parser = Parser::new(source, store)?;
    parser.push_scope(FunctionKind::Script, 0, caller_is_strict);
    parser.scope().func.status_flags |= crate::bytecode::compiled_code::status_flags::DIRECT_EVAL;
    if caller_is_strict {
        parser.scope().func.status_flags |= crate::bytecode::compiled_code::status_flags::STRICT_MODE;
    }
    parser.parse_statement_list_until_eof()?;
    Ok(finish_top_level(parser, source.len()))
}
