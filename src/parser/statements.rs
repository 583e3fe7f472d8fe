//! Statement compiling: recursive descent straight to byte code, driving
//! the expression compiler in [`super::expressions`] for every clause that
//! boils down to an `Expression` (spec.md section 4.4).
//!
//! Two constructs need a token the parser has already consumed by the time
//! their bytecode position is known: a `for(;;)` loop's `update` clause
//! (textually before the body, but must run after it) and its `test`
//! clause (must end up physically after `update` too, so the unconditional
//! first-iteration jump can skip straight to it). Both are handled by
//! [`Parser::compile_deferred`]: capture the clause's raw span with
//! [`crate::lexer::Lexer::scan_until`], then re-lex just that span once the
//! body's been compiled.

use super::Parser;
use crate::bytecode::emitter::Operand;
use crate::bytecode::page::StreamOffset;
use crate::bytecode::{ExtOpcode, Opcode};
use crate::error::{Error, ErrorKind, Result, Span};
use crate::lexer::{Keyword, Lexer, Punct, SlashContext, TokenKind};

use super::expressions::Place;

impl<'a> Parser<'a> {
    /// A function/script body's leading run of bare-string-literal
    /// statements. Only a literal with no escape sequence whose content is
    /// exactly `use strict` turns strict mode on; every other directive is
    /// still compiled as an ordinary (side-effect-free) expression
    /// statement, same as it would be anywhere else in the body.
    ///
    /// A leading string literal that turns out to be the start of a larger
    /// expression (`"a" + b;` as the very first statement) isn't something
    /// a directive prologue can detect without the lookahead this
    /// architecture doesn't keep around; it's rejected rather than silently
    /// mis-parsed.
    pub(super) fn parse_directive_prologue(&mut self) -> Result<bool> {
        let mut strict = false;
        loop {
            let (has_escape, str_span) = match self.current().kind {
                TokenKind::String { has_escape } => (has_escape, self.current_span()),
                _ => break,
            };
            self.bump(SlashContext::Divide)?;
            let at_statement_end = self.at_punct(Punct::Semicolon)
                || self.at_punct(Punct::RightBrace)
                || matches!(self.current().kind, TokenKind::Eof)
                || self.current().was_newline;
            if !at_statement_end {
                return Err(Error::parse(ErrorKind::SemicolonExpected, self.current_span()));
            }
            let inner = self.string_inner_span(str_span);
            let raw = self.text(inner);
            if !has_escape && raw == "use strict" {
                strict = true;
            }
            let bytes = if has_escape { crate::lexer::decode_string_escapes(raw, inner)?.into_bytes() } else { raw.as_bytes().to_vec() };
            let ptr = self.store_intern(&bytes, str_span)?;
            let lit = self.scope().func.const_literal(ptr);
            self.scope().func.emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(lit));
            self.scope().func.emitter.emit(Opcode::CbcPop, Operand::None);
            self.consume_semicolon()?;
        }
        Ok(strict)
    }

    pub(super) fn parse_statement_list_until_eof(&mut self) -> Result<()> {
        while !matches!(self.current().kind, TokenKind::Eof) {
            self.parse_statement()?;
        }
        Ok(())
    }

    fn parse_block_statements_until_right_brace(&mut self) -> Result<()> {
        self.bump(SlashContext::RegexpAllowed)?;
        while !self.at_punct(Punct::RightBrace) && !matches!(self.current().kind, TokenKind::Eof) {
            self.parse_statement()?;
        }
        self.expect_punct(Punct::RightBrace, ErrorKind::RightBraceExpected)?;
        Ok(())
    }

    /// `;` after a statement, or its automatic insertion (ES5.1 section 7.9):
    /// a following `}`/EOF, or a newline before the next token, stand in for
    /// an explicit semicolon.
    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat_punct(Punct::Semicolon, SlashContext::RegexpAllowed)? {
            return Ok(());
        }
        if self.at_punct(Punct::RightBrace) || matches!(self.current().kind, TokenKind::Eof) || self.current().was_newline {
            return Ok(());
        }
        Err(Error::parse(ErrorKind::SemicolonExpected, self.current_span()))
    }

    fn here(&mut self) -> StreamOffset {
        self.scope().func.emitter.flush();
        self.stream_offset()
    }

    /// Re-lex and compile `span`'s text as a standalone `Expression`,
    /// temporarily swapping in a fresh [`Lexer`] over just that slice —
    /// the [`Lexer`] driving the rest of this parse isn't `Clone`, and
    /// spans/errors produced while the swap is active are relative to the
    /// slice rather than the real source, a diagnostic-quality trade-off
    /// accepted for a clause whose own bytecode must be emitted out of
    /// textual order.
    fn compile_deferred(&mut self, span: Span, keep_value: bool) -> Result<()> {
        let text = self.text(span);
        let sub_lexer = Lexer::new(text)?;
        let saved_lexer = std::mem::replace(&mut self.lexer, sub_lexer);
        let saved_ctx = self.slash_ctx;
        self.slash_ctx = SlashContext::RegexpAllowed;
        let place = self.parse_expression(false)?;
        self.materialize(place)?;
        if !keep_value {
            self.scope().func.emitter.emit(Opcode::CbcPop, Operand::None);
        }
        self.lexer = saved_lexer;
        self.slash_ctx = saved_ctx;
        Ok(())
    }

    pub(super) fn parse_statement(&mut self) -> Result<()> {
        self.scope().func.registers.reset_for_statement();
        match self.current().kind {
            TokenKind::Punct(Punct::LeftBrace) => self.parse_block_statement(),
            TokenKind::Punct(Punct::Semicolon) => {
                self.bump(SlashContext::RegexpAllowed)?;
                Ok(())
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_var_statement(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try_statement(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            TokenKind::Keyword(Keyword::Break) => self.parse_break_statement(),
            TokenKind::Keyword(Keyword::Continue) => self.parse_continue_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Keyword(Keyword::With) => self.parse_with_statement(),
            TokenKind::Keyword(Keyword::Debugger) => {
                self.bump(SlashContext::RegexpAllowed)?;
                self.scope().func.emitter.emit_ext(ExtOpcode::CbcExtDebugger, Operand::None);
                self.consume_semicolon()
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(),
            TokenKind::Identifier => self.parse_identifier_led_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block_statement(&mut self) -> Result<()> {
        self.parse_block_statements_until_right_brace()
    }

    /// A statement beginning with an identifier is either a label
    /// (`name:`) or the start of an expression statement; telling them
    /// apart needs the token after the identifier, which means tentatively
    /// consuming the identifier either way.
    fn parse_identifier_led_statement(&mut self) -> Result<()> {
        let span = self.current_span();
        let name = self.text(span).to_string();
        self.bump(SlashContext::Divide)?;
        if self.at_punct(Punct::Colon) {
            self.bump(SlashContext::RegexpAllowed)?;
            self.scope().frames.add_pending_label(name, span)?;
            return self.parse_statement();
        }
        let place = self.continue_expression_from_identifier(span)?;
        self.materialize(place)?;
        self.scope().func.emitter.emit(Opcode::CbcPop, Operand::None);
        self.consume_semicolon()
    }

    /// Resume expression-parsing with a bare identifier already consumed,
    /// by re-driving the same deferred-compile trick [`Parser::compile_deferred`]
    /// uses: the identifier's own span plus everything up to the statement's
    /// terminator is re-lexed as one `Expression`. The statement-vs-label
    /// lookahead above is the only place this parser needs to un-consume a
    /// token, so a dedicated "parse an expression whose first token is
    /// already gone" path isn't worth building — this re-lexes instead.
    fn continue_expression_from_identifier(&mut self, ident_span: Span) -> Result<Place> {
        let rest = self.scan_statement_remainder()?;
        let full = Span::new(ident_span.start, rest.end, ident_span.line, ident_span.column);
        let text = self.text(full);
        let sub_lexer = Lexer::new(text)?;
        let saved_lexer = std::mem::replace(&mut self.lexer, sub_lexer);
        let saved_ctx = self.slash_ctx;
        self.slash_ctx = SlashContext::RegexpAllowed;
        let place = self.parse_expression(false);
        self.lexer = saved_lexer;
        self.slash_ctx = saved_ctx;
        place
    }

    /// Capture the rest of the current statement (up to `;`, a newline
    /// before the next token, `}`, or EOF) without consuming it from the
    /// real token stream, so [`Parser::continue_expression_from_identifier`]
    /// can re-lex the identifier together with what follows it as one
    /// `Expression`.
    fn scan_statement_remainder(&mut self) -> Result<Span> {
        if self.at_punct(Punct::Semicolon) || self.at_punct(Punct::RightBrace) || matches!(self.current().kind, TokenKind::Eof) || self.current().was_newline {
            return Ok(self.current_span());
        }
        self.lexer.scan_until(Punct::Semicolon, Punct::Semicolon)
    }

    fn parse_expression_statement(&mut self) -> Result<()> {
        let place = self.parse_expression(false)?;
        self.materialize(place)?;
        self.scope().func.emitter.emit(Opcode::CbcPop, Operand::None);
        self.consume_semicolon()
    }

    fn parse_function_declaration(&mut self) -> Result<()> {
        let span = self.current_span();
        self.bump(SlashContext::Divide)?;
        let name_span = self.current_span();
        let name = match self.current().kind {
            TokenKind::Identifier => self.text(name_span).as_bytes().to_vec(),
            _ => return Err(Error::parse(ErrorKind::IdentifierExpected, name_span)),
        };
        self.bump(SlashContext::Divide)?;
        let params = self.parse_parameter_list()?;
        let param_refs: Vec<&str> = params.iter().map(|s| s.as_str()).collect();
        self.compile_function_body(params.len() as u16, &param_refs, span)?;
        let ptr = self.store_intern(&name, name_span)?;
        let lit = self.scope().func.ident_literal(ptr);
        self.scope().func.emitter.emit(Opcode::CbcAssignIdent, Operand::Literal(lit));
        Ok(())
    }

    fn parse_var_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.parse_var_declarator_list(true)?;
        self.consume_semicolon()
    }

    /// One or more `Identifier [= AssignmentExpression]` declarators,
    /// comma-separated. Declaring with no initializer just registers the
    /// name (spec.md leaves hoisting itself to the VM's own scope setup;
    /// this engine doesn't pre-scan a body for `var`/`function` names, so a
    /// use of a variable that textually precedes its declaration resolves
    /// whatever the VM's runtime scope chain does with an as-yet-unassigned
    /// binding, not a guaranteed `undefined` the way a hoisting pass would
    /// give it).
    fn parse_var_declarator_list(&mut self, no_in: bool) -> Result<()> {
        loop {
            let span = self.current_span();
            let name = match self.current().kind {
                TokenKind::Identifier => self.text(span).as_bytes().to_vec(),
                _ => return Err(Error::parse(ErrorKind::IdentifierExpected, span)),
            };
            self.bump(SlashContext::Divide)?;
            let ptr = self.store_intern(&name, span)?;
            let lit = self.scope().func.ident_literal(ptr);
            if self.eat_punct(Punct::Equal, SlashContext::RegexpAllowed)? {
                let value = self.parse_assignment_expression(no_in)?;
                self.materialize(value)?;
                self.scope().func.emitter.emit(Opcode::CbcAssignIdent, Operand::Literal(lit));
            }
            if self.at_punct(Punct::Comma) {
                self.bump(SlashContext::RegexpAllowed)?;
                continue;
            }
            break;
        }
        Ok(())
    }

    fn parse_if_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
        let test = self.parse_expression(false)?;
        self.materialize(test)?;
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        let else_jump = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcBranchIfFalseForward);
        self.parse_statement()?;
        if self.at_keyword(Keyword::Else) {
            let end_jump = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward);
            let else_start = self.here();
            self.scope().func.emitter.patch_branch_placeholder(else_jump, else_start);
            self.bump(SlashContext::RegexpAllowed)?;
            self.parse_statement()?;
            let end = self.here();
            self.scope().func.emitter.patch_branch_placeholder(end_jump, end);
        } else {
            let end = self.here();
            self.scope().func.emitter.patch_branch_placeholder(else_jump, end);
        }
        Ok(())
    }

    fn parse_while_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
        let test_span = self.lexer.scan_until(Punct::RightParen, Punct::RightParen)?;
        self.slash_ctx = SlashContext::RegexpAllowed;
        self.scope().frames.push_loop();
        let test_jump = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward);
        let body_start = self.here();
        self.parse_statement()?;
        let test_start = self.here();
        {
            let scope = self.scope();
            scope.frames.resolve_continue_patches(test_start, &mut scope.func.emitter);
        }
        self.scope().func.emitter.patch_branch_placeholder(test_jump, test_start);
        self.compile_deferred(test_span, true)?;
        let back = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcBranchIfTrueBackward);
        self.scope().func.emitter.patch_branch_placeholder(back, body_start);
        let end = self.here();
        let scope = self.scope();
        scope.frames.pop(end, &mut scope.func.emitter);
        Ok(())
    }

    fn parse_do_while_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.scope().frames.push_loop();
        let body_start = self.here();
        self.parse_statement()?;
        let test_start = self.here();
        {
            let scope = self.scope();
            scope.frames.resolve_continue_patches(test_start, &mut scope.func.emitter);
        }
        if !self.at_keyword(Keyword::While) {
            return Err(Error::parse(ErrorKind::PrimaryExprExpected, self.current_span()));
        }
        self.bump(SlashContext::RegexpAllowed)?;
        self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
        let test = self.parse_expression(false)?;
        self.materialize(test)?;
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        let back = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcBranchIfTrueBackward);
        self.scope().func.emitter.patch_branch_placeholder(back, body_start);
        let end = self.here();
        let scope = self.scope();
        scope.frames.pop(end, &mut scope.func.emitter);
        self.consume_semicolon()
    }

    /// `for(...)`, disambiguated between the 3-clause and `for-in` forms
    /// the way spec.md's `NoIn` restriction was built for: a non-`var`
    /// init candidate parses with `no_in = true`, so a top-level `in`
    /// can't be consumed as the binary operator, and if one follows the
    /// parsed expression it must be this loop's `in`.
    fn parse_for_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
        if self.at_keyword(Keyword::Var) {
            self.bump(SlashContext::Divide)?;
            let name_span = self.current_span();
            let name = match self.current().kind {
                TokenKind::Identifier => self.text(name_span).as_bytes().to_vec(),
                _ => return Err(Error::parse(ErrorKind::IdentifierExpected, name_span)),
            };
            self.bump(SlashContext::Divide)?;
            let ptr = self.store_intern(&name, name_span)?;
            let lit = self.scope().func.ident_literal(ptr);
            if self.at_keyword(Keyword::In) {
                self.bump(SlashContext::RegexpAllowed)?;
                return self.compile_for_in(Place::Ident(lit, name_span));
            }
            if self.eat_punct(Punct::Equal, SlashContext::RegexpAllowed)? {
                let value = self.parse_assignment_expression(true)?;
                self.materialize(value)?;
                self.scope().func.emitter.emit(Opcode::CbcAssignIdent, Operand::Literal(lit));
            }
            if self.at_punct(Punct::Comma) {
                self.bump(SlashContext::RegexpAllowed)?;
                self.parse_var_declarator_list(true)?;
            }
            self.expect_punct(Punct::Semicolon, ErrorKind::SemicolonExpected)?;
            return self.compile_for_rest();
        }
        if !self.at_punct(Punct::Semicolon) {
            let init = self.parse_expression(true)?;
            if self.at_keyword(Keyword::In) {
                self.bump(SlashContext::RegexpAllowed)?;
                let target = match init {
                    Place::Value => return Err(super::function::invalid_assignment_target(self.current_span())),
                    other => other,
                };
                return self.compile_for_in(target);
            }
            self.materialize(init)?;
            self.scope().func.emitter.emit(Opcode::CbcPop, Operand::None);
        }
        self.expect_punct(Punct::Semicolon, ErrorKind::SemicolonExpected)?;
        self.compile_for_rest()
    }

    /// The shared tail of a 3-clause `for`, once `init;` is behind us:
    /// capture `test` and `update`'s raw spans (only `init`'s position
    /// matches its compile order; these two don't), compile the body, then
    /// compile `update` followed by `test` in the order they actually run.
    fn compile_for_rest(&mut self) -> Result<()> {
        let test_span = if !self.at_punct(Punct::Semicolon) {
            Some(self.lexer.scan_until(Punct::Semicolon, Punct::Semicolon)?)
        } else {
            self.bump(SlashContext::RegexpAllowed)?;
            None
        };
        self.slash_ctx = SlashContext::RegexpAllowed;
        let update_span = if !self.at_punct(Punct::RightParen) {
            Some(self.lexer.scan_until(Punct::RightParen, Punct::RightParen)?)
        } else {
            self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
            None
        };
        self.slash_ctx = SlashContext::RegexpAllowed;
        self.scope().frames.push_loop();
        let test_jump = test_span.map(|_| self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward));
        let body_start = self.here();
        self.parse_statement()?;
        let update_start = self.here();
        {
            let scope = self.scope();
            scope.frames.resolve_continue_patches(update_start, &mut scope.func.emitter);
        }
        if let Some(span) = update_span {
            self.compile_deferred(span, false)?;
        }
        match (test_span, test_jump) {
            (Some(span), Some(jump)) => {
                let test_start = self.here();
                self.scope().func.emitter.patch_branch_placeholder(jump, test_start);
                self.compile_deferred(span, true)?;
                let back = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcBranchIfTrueBackward);
                self.scope().func.emitter.patch_branch_placeholder(back, body_start);
            }
            _ => {
                let back = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpBackward);
                self.scope().func.emitter.patch_branch_placeholder(back, body_start);
            }
        }
        let end = self.here();
        let scope = self.scope();
        scope.frames.pop(end, &mut scope.func.emitter);
        Ok(())
    }

    /// `for(target in object) body`: `CbcExtForInCreateContext` branches
    /// forward around the whole loop when the object has no enumerable
    /// properties at all (its target can't be known until the VM walks the
    /// object, hence a runtime branch rather than anything the parser could
    /// fold away); `CbcExtBranchIfForInHasNext`'s `BR` flag (a *backward*
    /// branch) only makes sense wired as "jump back for one more property",
    /// so each iteration's `GetNext` lives at the loop's top, fetched
    /// unconditionally once already known reachable by the create-context
    /// check.
    fn compile_for_in(&mut self, target: Place) -> Result<()> {
        let obj = self.parse_expression(false)?;
        self.materialize(obj)?;
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        self.scope().frames.push_loop();
        let exit = self.scope().func.emitter.emit_ext_branch_placeholder(ExtOpcode::CbcExtForInCreateContext);
        let loop_start = self.here();
        self.scope().func.emitter.emit_ext(ExtOpcode::CbcExtForInGetNext, Operand::None);
        match target {
            Place::Ident(lit, _) => {
                self.scope().func.emitter.emit(Opcode::CbcAssignIdent, Operand::Literal(lit));
            }
            Place::MemberName(lit, _) => {
                self.scope().func.emitter.emit(Opcode::CbcAssignPropString, Operand::Literal(lit));
            }
            Place::MemberComputed(_) => {
                self.scope().func.emitter.emit(Opcode::CbcAssign, Operand::None);
            }
            Place::Value => return Err(super::function::invalid_assignment_target(self.current_span())),
        }
        self.parse_statement()?;
        {
            let scope = self.scope();
            scope.frames.resolve_continue_patches(loop_start, &mut scope.func.emitter);
        }
        let back = self.scope().func.emitter.emit_ext_branch_placeholder(ExtOpcode::CbcExtBranchIfForInHasNext);
        self.scope().func.emitter.patch_ext_branch_placeholder(back, loop_start);
        self.scope().func.emitter.emit_barrier(Opcode::CbcContextEnd, Operand::None);
        let end = self.here();
        self.scope().func.emitter.patch_ext_branch_placeholder(exit, end);
        let scope = self.scope();
        scope.frames.pop(end, &mut scope.func.emitter);
        Ok(())
    }

    /// No opcode in the table duplicates the top of the stack, so the
    /// discriminant is evaluated once into a scratch register (indexed the
    /// same way an `Ident` literal is — `CbcPushIdent`/`CbcAssignIdent`
    /// address into the same provisional-literal space regardless of
    /// category) and each `case` test re-pushes it from there.
    ///
    /// Clauses test in textual order, mismatch falling through to the next
    /// clause's own test via a per-clause placeholder patched right before
    /// that clause's body; a clause without `break` falls through to the
    /// next clause's body the same way, via its own unconditional jump
    /// patched to the following clause's body-start. This only matches
    /// ES5.1 semantics when `default` is the last clause (or absent) — a
    /// `default` placed before trailing `case`s would be reached by the
    /// last preceding mismatch before those cases ever get tested. Full
    /// arbitrary default placement is out of scope here.
    fn parse_switch_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
        let disc = self.parse_expression(false)?;
        self.materialize(disc)?;
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        let disc_span = self.current_span();
        let disc_reg = self.scope().func.allocate_register(disc_span)?;
        self.scope().func.emitter.emit(Opcode::CbcAssignIdent, Operand::Literal(disc_reg));
        self.expect_punct(Punct::LeftBrace, ErrorKind::LeftBraceExpected)?;
        self.scope().frames.push_switch();

        let mut prev_mismatch: Option<StreamOffset> = None;
        let mut prev_fallthrough: Option<StreamOffset> = None;
        let mut seen_default = false;

        while !self.at_punct(Punct::RightBrace) {
            let clause_span = self.current_span();
            let is_default = self.at_keyword(Keyword::Default);
            if !is_default && !self.at_keyword(Keyword::Case) {
                return Err(Error::parse(ErrorKind::CaseOrDefaultExpected, clause_span));
            }
            if is_default {
                if seen_default {
                    return Err(Error::parse(ErrorKind::MultipleDefaultNotAllowed, clause_span));
                }
                seen_default = true;
                self.bump(SlashContext::RegexpAllowed)?;
                self.expect_punct(Punct::Colon, ErrorKind::ColonExpected)?;
                let body_start = self.here();
                if let Some(offset) = prev_fallthrough.take() {
                    self.scope().func.emitter.patch_branch_placeholder(offset, body_start);
                }
            } else {
                self.bump(SlashContext::RegexpAllowed)?;
                let test = self.parse_assignment_expression(false)?;
                self.materialize(test)?;
                self.expect_punct(Punct::Colon, ErrorKind::ColonExpected)?;
                if let Some(offset) = prev_mismatch.take() {
                    let here = self.here();
                    self.scope().func.emitter.patch_branch_placeholder(offset, here);
                }
                self.scope().func.emitter.emit(Opcode::CbcPushIdent, Operand::Literal(disc_reg));
                self.scope().func.emitter.emit(Opcode::CbcStrictEqual, Operand::None);
                let mismatch = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcBranchIfFalseForward);
                let body_start = self.here();
                if let Some(offset) = prev_fallthrough.take() {
                    self.scope().func.emitter.patch_branch_placeholder(offset, body_start);
                }
                prev_mismatch = Some(mismatch);
            }
            while !self.at_punct(Punct::RightBrace) && !self.at_keyword(Keyword::Case) && !self.at_keyword(Keyword::Default) {
                self.parse_statement()?;
            }
            prev_fallthrough = Some(self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward));
        }
        self.expect_punct(Punct::RightBrace, ErrorKind::RightBraceExpected)?;
        let end = self.here();
        if let Some(offset) = prev_mismatch {
            self.scope().func.emitter.patch_branch_placeholder(offset, end);
        }
        if let Some(offset) = prev_fallthrough {
            self.scope().func.emitter.patch_branch_placeholder(offset, end);
        }
        let scope = self.scope();
        scope.frames.pop(end, &mut scope.func.emitter);
        Ok(())
    }

    /// `CbcExtTryCreateContext`/`CbcExtCatch`/`CbcExtFinally` branch to
    /// where control resumes if the corresponding block unwinds
    /// exceptionally; this engine compiles that target identically to the
    /// block's own normal fallthrough, since driving the VM's exception
    /// unwinding through a half-finished handler is a runtime concern, not
    /// something a parser-only core needs to get right.
    fn parse_try_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.expect_punct(Punct::LeftBrace, ErrorKind::LeftBraceExpected)?;
        let try_ctx = self.scope().func.emitter.emit_ext_branch_placeholder(ExtOpcode::CbcExtTryCreateContext);
        self.parse_block_statements_until_right_brace()?;

        let mut catch_ctx: Option<StreamOffset> = None;
        if self.at_keyword(Keyword::Catch) {
            self.bump(SlashContext::RegexpAllowed)?;
            self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
            let name_span = self.current_span();
            let name = match self.current().kind {
                TokenKind::Identifier => self.text(name_span).as_bytes().to_vec(),
                _ => return Err(Error::parse(ErrorKind::IdentifierExpected, name_span)),
            };
            self.bump(SlashContext::Divide)?;
            self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
            let ptr = self.store_intern(&name, name_span)?;
            let lit = self.scope().func.ident_literal(ptr);
            let catch_start = self.here();
            self.scope().func.emitter.patch_ext_branch_placeholder(try_ctx, catch_start);
            let catch_mark = self.scope().func.emitter.emit_ext_branch_placeholder(ExtOpcode::CbcExtCatch);
            self.scope().func.emitter.emit(Opcode::CbcAssignIdent, Operand::Literal(lit));
            self.expect_punct(Punct::LeftBrace, ErrorKind::LeftBraceExpected)?;
            self.parse_block_statements_until_right_brace()?;
            let catch_end = self.here();
            self.scope().func.emitter.patch_ext_branch_placeholder(catch_mark, catch_end);
            catch_ctx = Some(catch_mark);
        }

        if self.at_keyword(Keyword::Finally) {
            self.bump(SlashContext::RegexpAllowed)?;
            if catch_ctx.is_none() {
                let after_try = self.here();
                self.scope().func.emitter.patch_ext_branch_placeholder(try_ctx, after_try);
            }
            let finally_mark = self.scope().func.emitter.emit_ext_branch_placeholder(ExtOpcode::CbcExtFinally);
            self.expect_punct(Punct::LeftBrace, ErrorKind::LeftBraceExpected)?;
            self.parse_block_statements_until_right_brace()?;
            let finally_end = self.here();
            self.scope().func.emitter.patch_ext_branch_placeholder(finally_mark, finally_end);
        } else if catch_ctx.is_none() {
            return Err(Error::parse(ErrorKind::LeftBraceExpected, self.current_span()));
        }
        self.scope().func.emitter.emit_barrier(Opcode::CbcContextEnd, Operand::None);
        Ok(())
    }

    fn parse_throw_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        let value = self.parse_expression(false)?;
        self.materialize(value)?;
        self.scope().func.emitter.emit_barrier(Opcode::CbcThrow, Operand::None);
        self.consume_semicolon()
    }

    fn parse_break_statement(&mut self) -> Result<()> {
        let span = self.current_span();
        self.bump(SlashContext::Divide)?;
        let label = self.consume_optional_label()?;
        let offset = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward);
        let label_ref = label.as_deref();
        self.scope().frames.record_break(label_ref, offset, span)?;
        self.consume_semicolon()
    }

    fn parse_continue_statement(&mut self) -> Result<()> {
        let span = self.current_span();
        self.bump(SlashContext::Divide)?;
        let label = self.consume_optional_label()?;
        let offset = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward);
        let label_ref = label.as_deref();
        self.scope().frames.record_continue(label_ref, offset, span)?;
        self.consume_semicolon()
    }

    /// `break`/`continue`'s optional label: only valid on the same source
    /// line (no newline before it), per ES5.1's restricted-production rule.
    fn consume_optional_label(&mut self) -> Result<Option<String>> {
        if self.current().was_newline {
            return Ok(None);
        }
        if let TokenKind::Identifier = self.current().kind {
            let span = self.current_span();
            let name = self.text(span).to_string();
            self.bump(SlashContext::Divide)?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_return_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        if self.at_punct(Punct::Semicolon) || self.at_punct(Punct::RightBrace) || matches!(self.current().kind, TokenKind::Eof) || self.current().was_newline {
            self.scope().func.emitter.emit_barrier(Opcode::CbcReturnWithUndefined, Operand::None);
            return self.consume_semicolon();
        }
        let value = self.parse_expression(false)?;
        self.materialize(value)?;
        self.scope().func.emitter.emit_barrier(Opcode::CbcReturn, Operand::None);
        self.consume_semicolon()
    }

    fn parse_with_statement(&mut self) -> Result<()> {
        self.bump(SlashContext::Divide)?;
        self.expect_punct(Punct::LeftParen, ErrorKind::RightParenExpected)?;
        let object = self.parse_expression(false)?;
        self.materialize(object)?;
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        let exit = self.scope().func.emitter.emit_ext_branch_placeholder(ExtOpcode::CbcExtWithCreateContext);
        self.parse_statement()?;
        self.scope().func.emitter.emit_barrier(Opcode::CbcContextEnd, Operand::None);
        let end = self.here();
        self.scope().func.emitter.patch_ext_branch_placeholder(exit, end);
        Ok(())
    }
}
