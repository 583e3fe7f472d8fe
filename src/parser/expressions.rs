//! Expression compiling: precedence climbing straight to byte code, no
//! intermediate AST (spec.md section 4.4/4.5).
//!
//! The leaves of an expression (a bare identifier, `obj.prop`, `obj[key]`)
//! are carried upward as a [`Place`] rather than immediately materialized,
//! so an assignment or `delete`/`++`/`--` can retarget the opcode it emits
//! (ident-form, prop-string-form, or the generic computed form) instead of
//! always loading the current value first.

use super::Parser;
use crate::bytecode::emitter::{push_result_form, unary_lvalue_ident_form, unary_lvalue_prop_string_form, Operand};
use crate::bytecode::{ExtOpcode, Opcode};
use crate::error::{Error, ErrorKind, Result, Span};
use crate::lexer::{Keyword, Punct, SlashContext, TokenKind};
use crate::literals::CompressedPointer;

/// The not-yet-materialized result of compiling an expression. Anything
/// other than `Value` still needs a load emitted before it can be used as
/// an operand; kept distinct so assignment/increment/delete can retarget
/// to the matching ident-/prop-string-specific opcode instead of a generic
/// load-then-store sequence.
#[derive(Debug, Clone, Copy)]
pub enum Place {
    /// Already sitting on top of the operand stack.
    Value,
    Ident(crate::bytecode::ProvisionalLiteral, Span),
    /// `object.name`: `object` already pushed, `name` is a const-literal
    /// string operand (dotted access never evaluates the key at runtime).
    MemberName(crate::bytecode::ProvisionalLiteral, Span),
    /// `object[key]`: both already pushed, object under key.
    MemberComputed(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompoundOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    UnsRightShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl CompoundOp {
    fn from_punct(p: Punct) -> Option<Self> {
        use CompoundOp::*;
        Some(match p {
            Punct::Equal => Assign,
            Punct::PlusEqual => Add,
            Punct::MinusEqual => Subtract,
            Punct::StarEqual => Multiply,
            Punct::SlashEqual => Divide,
            Punct::PercentEqual => Modulo,
            Punct::LeftShiftEqual => LeftShift,
            Punct::RightShiftEqual => RightShift,
            Punct::UnsignedRightShiftEqual => UnsRightShift,
            Punct::AmpEqual => BitAnd,
            Punct::PipeEqual => BitOr,
            Punct::CaretEqual => BitXor,
            _ => return None,
        })
    }

    /// The generic (computed-member) form: consumes object+key+value,
    /// leaves nothing — spec.md's documented simplification is that an
    /// assignment is compiled with the `_PushResult` extended-opcode
    /// family throughout (see [`Parser::emit_compound_assign`]), so the
    /// assigned value stays on the stack the same way every other
    /// expression form leaves exactly one value behind, instead of the
    /// discard-only plain family used when an assignment's value is known
    /// to be unused.
    fn generic_push_result(self) -> ExtOpcode {
        use CompoundOp::*;
        use ExtOpcode::*;
        match self {
            Assign => CbcExtAssignPushResult,
            Add => CbcExtAssignAddPushResult,
            Subtract => CbcExtAssignSubtractPushResult,
            Multiply => CbcExtAssignMultiplyPushResult,
            Divide => CbcExtAssignDividePushResult,
            Modulo => CbcExtAssignModuloPushResult,
            LeftShift => CbcExtAssignLeftShiftPushResult,
            RightShift => CbcExtAssignRightShiftPushResult,
            UnsRightShift => CbcExtAssignUnsRightShiftPushResult,
            BitAnd => CbcExtAssignBitAndPushResult,
            BitOr => CbcExtAssignBitOrPushResult,
            BitXor => CbcExtAssignBitXorPushResult,
        }
    }

    fn ident_push_result(self) -> ExtOpcode {
        use CompoundOp::*;
        use ExtOpcode::*;
        match self {
            Assign => CbcExtAssignIdentPushResult,
            Add => CbcExtAssignAddIdentPushResult,
            Subtract => CbcExtAssignSubtractIdentPushResult,
            Multiply => CbcExtAssignMultiplyIdentPushResult,
            Divide => CbcExtAssignDivideIdentPushResult,
            Modulo => CbcExtAssignModuloIdentPushResult,
            LeftShift => CbcExtAssignLeftShiftIdentPushResult,
            RightShift => CbcExtAssignRightShiftIdentPushResult,
            UnsRightShift => CbcExtAssignUnsRightShiftIdentPushResult,
            BitAnd => CbcExtAssignBitAndIdentPushResult,
            BitOr => CbcExtAssignBitOrIdentPushResult,
            BitXor => CbcExtAssignBitXorIdentPushResult,
        }
    }

    fn prop_string_push_result(self) -> ExtOpcode {
        use CompoundOp::*;
        use ExtOpcode::*;
        match self {
            Assign => CbcExtAssignPropStringPushResult,
            Add => CbcExtAssignAddPropStringPushResult,
            Subtract => CbcExtAssignSubtractPropStringPushResult,
            Multiply => CbcExtAssignMultiplyPropStringPushResult,
            Divide => CbcExtAssignDividePropStringPushResult,
            Modulo => CbcExtAssignModuloPropStringPushResult,
            LeftShift => CbcExtAssignLeftShiftPropStringPushResult,
            RightShift => CbcExtAssignRightShiftPropStringPushResult,
            UnsRightShift => CbcExtAssignUnsRightShiftPropStringPushResult,
            BitAnd => CbcExtAssignBitAndPropStringPushResult,
            BitOr => CbcExtAssignBitOrPropStringPushResult,
            BitXor => CbcExtAssignBitXorPropStringPushResult,
        }
    }
}

/// Binary operator precedence, tightest last; `in` is omitted whenever the
/// caller is compiling a `for(...)` header's init clause (spec.md's
/// NoIn restriction).
fn binary_info(kind: TokenKind, no_in: bool) -> Option<(u8, Opcode)> {
    use Opcode::*;
    use Punct::*;
    let (prec, op) = match kind {
        TokenKind::Punct(Pipe) => (3, CbcBitOr),
        TokenKind::Punct(Caret) => (4, CbcBitXor),
        TokenKind::Punct(Amp) => (5, CbcBitAnd),
        TokenKind::Punct(EqualEqual) => (6, CbcEqual),
        TokenKind::Punct(NotEqual) => (6, CbcNotEqual),
        TokenKind::Punct(StrictEqual) => (6, CbcStrictEqual),
        TokenKind::Punct(StrictNotEqual) => (6, CbcStrictNotEqual),
        TokenKind::Punct(Less) => (7, CbcLess),
        TokenKind::Punct(Greater) => (7, CbcGreater),
        TokenKind::Punct(LessEqual) => (7, CbcLessEqual),
        TokenKind::Punct(GreaterEqual) => (7, CbcGreaterEqual),
        TokenKind::Keyword(Keyword::Instanceof) => (7, CbcInstanceof),
        TokenKind::Keyword(Keyword::In) if !no_in => (7, CbcIn),
        TokenKind::Punct(LeftShift) => (8, CbcLeftShift),
        TokenKind::Punct(RightShift) => (8, CbcRightShift),
        TokenKind::Punct(UnsignedRightShift) => (8, CbcUnsRightShift),
        TokenKind::Punct(Plus) => (9, CbcAdd),
        TokenKind::Punct(Minus) => (9, CbcSubtract),
        TokenKind::Punct(Star) => (10, CbcMultiply),
        TokenKind::Punct(Slash) => (10, CbcDivide),
        TokenKind::Punct(Percent) => (10, CbcModulo),
        _ => return None,
    };
    Some((prec, op))
}

impl<'a> Parser<'a> {
    /// `Expression` (the comma operator): one or more `AssignmentExpression`s,
    /// each evaluated for its side effect except the last.
    pub(super) fn parse_expression(&mut self, no_in: bool) -> Result<Place> {
        let mut place = self.parse_assignment_expression(no_in)?;
        while self.at_punct(Punct::Comma) {
            self.materialize(place)?;
            self.scope().func.emitter.emit(Opcode::CbcPop, Operand::None);
            self.bump(SlashContext::RegexpAllowed)?;
            place = self.parse_assignment_expression(no_in)?;
        }
        Ok(place)
    }

    pub(super) fn parse_assignment_expression(&mut self, no_in: bool) -> Result<Place> {
        let left_span = self.current_span();
        let left = self.parse_conditional_expression(no_in)?;
        let op = match self.current().kind {
            TokenKind::Punct(p) => CompoundOp::from_punct(p),
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };
        self.check_assignment_target(left, left_span)?;
        self.bump(SlashContext::RegexpAllowed)?;
        let right = self.parse_assignment_expression(no_in)?;
        self.materialize(right)?;
        self.emit_compound_assign(op, left)?;
        Ok(Place::Value)
    }

    fn check_assignment_target(&self, place: Place, span: Span) -> Result<()> {
        match place {
            Place::Ident(_, ident_span) => {
                if self.strict() {
                    let text = self.text(ident_span);
                    if text == "eval" {
                        return Err(Error::parse(ErrorKind::EvalCannotBeAssigned, span));
                    }
                    if text == "arguments" {
                        return Err(Error::parse(ErrorKind::ArgumentsCannotBeAssigned, span));
                    }
                }
                Ok(())
            }
            Place::MemberName(_, _) | Place::MemberComputed(_) => Ok(()),
            Place::Value => Err(super::function::invalid_assignment_target(span)),
        }
    }

    /// Store `right` (already materialized) into `target`, using the
    /// `_PushResult` extended-opcode family so the stored value is left on
    /// the stack, same as every other expression form.
    fn emit_compound_assign(&mut self, op: CompoundOp, target: Place) -> Result<()> {
        let scope = self.scope();
        match target {
            Place::Ident(lit, _) => {
                scope.func.emitter.emit_ext(op.ident_push_result(), Operand::Literal(lit));
            }
            Place::MemberName(lit, _) => {
                scope.func.emitter.emit_ext(op.prop_string_push_result(), Operand::Literal(lit));
            }
            Place::MemberComputed(_) => {
                scope.func.emitter.emit_ext(op.generic_push_result(), Operand::None);
            }
            Place::Value => unreachable!("checked by check_assignment_target"),
        }
        Ok(())
    }

    /// `ConditionalExpression`: `test ? consequent : alternate`.
    fn parse_conditional_expression(&mut self, no_in: bool) -> Result<Place> {
        let test = self.parse_binary_expression(1, no_in)?;
        if !self.at_punct(Punct::Question) {
            return Ok(test);
        }
        self.materialize(test)?;
        let false_patch = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcBranchIfFalseForward);
        self.bump(SlashContext::RegexpAllowed)?;
        let consequent = self.parse_assignment_expression(false)?;
        self.materialize(consequent)?;
        let end_patch = self.scope().func.emitter.emit_branch_placeholder(Opcode::CbcJumpForward);
        let alt_start = self.stream_offset();
        self.scope().func.emitter.patch_branch_placeholder(false_patch, alt_start);
        self.expect_punct(Punct::Colon, ErrorKind::ColonForConditionalExpected)?;
        let alternate = self.parse_assignment_expression(no_in)?;
        self.materialize(alternate)?;
        let end = self.stream_offset();
        self.scope().func.emitter.patch_branch_placeholder(end_patch, end);
        Ok(Place::Value)
    }

    /// Precedence-climbing binary-operator parse, with `&&`/`||` special-cased
    /// to their short-circuit branch opcodes instead of a plain binary emit.
    fn parse_binary_expression(&mut self, min_prec: u8, no_in: bool) -> Result<Place> {
        let mut left = self.parse_unary_expression()?;
        loop {
            if self.at_punct(Punct::OrOr) {
                if min_prec > 1 {
                    break;
                }
                left = self.parse_logical(left, Opcode::CbcBranchIfLogicalTrue, 2, no_in)?;
                continue;
            }
            if self.at_punct(Punct::AndAnd) {
                if min_prec > 2 {
                    break;
                }
                left = self.parse_logical(left, Opcode::CbcBranchIfLogicalFalse, 3, no_in)?;
                continue;
            }
            let Some((prec, op)) = binary_info(self.current().kind, no_in) else { break };
            if prec < min_prec {
                break;
            }
            self.materialize(left)?;
            self.bump(SlashContext::RegexpAllowed)?;
            let right = self.parse_binary_expression(prec + 1, no_in)?;
            self.materialize(right)?;
            self.scope().func.emitter.emit(op, Operand::None);
            left = Place::Value;
        }
        Ok(left)
    }

    /// `a || b` / `a && b`: the short-circuit branch leaves `a` on the
    /// stack and jumps past `b` when the branch condition holds, otherwise
    /// pops `a` and falls through to evaluate `b`.
    fn parse_logical(&mut self, left: Place, branch_op: Opcode, next_min_prec: u8, no_in: bool) -> Result<Place> {
        self.materialize(left)?;
        let patch = self.scope().func.emitter.emit_branch_placeholder(branch_op);
        self.bump(SlashContext::RegexpAllowed)?;
        let right = self.parse_binary_expression(next_min_prec, no_in)?;
        self.materialize(right)?;
        let end = self.stream_offset();
        self.scope().func.emitter.patch_branch_placeholder(patch, end);
        Ok(Place::Value)
    }

    /// `UnaryExpression`: prefix `delete`/`void`/`typeof`/`++`/`--`/`+`/`-`/`~`/`!`,
    /// otherwise falls through to a left-hand-side expression.
    fn parse_unary_expression(&mut self) -> Result<Place> {
        let span = self.current_span();
        match self.current().kind {
            TokenKind::Keyword(Keyword::Delete) => {
                self.bump(SlashContext::RegexpAllowed)?;
                let target = self.parse_unary_expression()?;
                self.compile_delete(target)
            }
            TokenKind::Keyword(Keyword::Void) => {
                self.bump(SlashContext::RegexpAllowed)?;
                let operand = self.parse_unary_expression()?;
                self.materialize(operand)?;
                self.scope().func.emitter.emit(Opcode::CbcVoid, Operand::None);
                Ok(Place::Value)
            }
            TokenKind::Keyword(Keyword::Typeof) => {
                self.bump(SlashContext::RegexpAllowed)?;
                let operand = self.parse_unary_expression()?;
                self.materialize(operand)?;
                self.scope().func.emitter.emit(Opcode::CbcTypeof, Operand::None);
                Ok(Place::Value)
            }
            TokenKind::Punct(Punct::PlusPlus) => {
                self.bump(SlashContext::RegexpAllowed)?;
                let target = self.parse_unary_expression()?;
                self.check_assignment_target(target, span)?;
                self.emit_unary_lvalue(Opcode::CbcPreIncr, target, span)
            }
            TokenKind::Punct(Punct::MinusMinus) => {
                self.bump(SlashContext::RegexpAllowed)?;
                let target = self.parse_unary_expression()?;
                self.check_assignment_target(target, span)?;
                self.emit_unary_lvalue(Opcode::CbcPreDecr, target, span)
            }
            TokenKind::Punct(Punct::Plus) => self.parse_simple_unary(Opcode::CbcPlus),
            TokenKind::Punct(Punct::Minus) => self.parse_simple_unary(Opcode::CbcNegate),
            TokenKind::Punct(Punct::Tilde) => self.parse_simple_unary(Opcode::CbcBitNot),
            TokenKind::Punct(Punct::Not) => self.parse_simple_unary(Opcode::CbcLogicalNot),
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_simple_unary(&mut self, op: Opcode) -> Result<Place> {
        self.bump(SlashContext::RegexpAllowed)?;
        let operand = self.parse_unary_expression()?;
        self.materialize(operand)?;
        self.scope().func.emitter.emit(op, Operand::None);
        Ok(Place::Value)
    }

    /// `delete` accepts any `UnaryExpression`; when the operand isn't a
    /// reference (e.g. `delete (1 + 1)`), ES5.1 just discards the already
    /// evaluated value and the expression is `true`.
    fn compile_delete(&mut self, target: Place) -> Result<Place> {
        let scope = self.scope();
        match target {
            Place::Ident(lit, _) => {
                scope.func.emitter.emit(push_result_form(Opcode::CbcDeleteIdent), Operand::Literal(lit));
            }
            Place::MemberName(lit, _) => {
                scope.func.emitter.emit(push_result_form(Opcode::CbcDeletePropString), Operand::Literal(lit));
            }
            Place::MemberComputed(_) => {
                scope.func.emitter.emit(push_result_form(Opcode::CbcDelete), Operand::None);
            }
            Place::Value => {
                scope.func.emitter.emit(Opcode::CbcPop, Operand::None);
                scope.func.emitter.emit(Opcode::CbcPushTrue, Operand::None);
            }
        }
        Ok(Place::Value)
    }

    /// `PostfixExpression`: a left-hand-side expression optionally followed
    /// by `++`/`--` with no line terminator in between (ASI, spec.md
    /// section 4.2's `was_newline`).
    fn parse_postfix_expression(&mut self) -> Result<Place> {
        let span = self.current_span();
        let place = self.parse_lhs_expression()?;
        let op = match self.current().kind {
            TokenKind::Punct(Punct::PlusPlus) if !self.current().was_newline => Some(Opcode::CbcPostIncr),
            TokenKind::Punct(Punct::MinusMinus) if !self.current().was_newline => Some(Opcode::CbcPostDecr),
            _ => None,
        };
        let Some(op) = op else { return Ok(place) };
        self.check_assignment_target(place, span)?;
        self.bump(SlashContext::Divide)?;
        self.emit_unary_lvalue(op, place, span)
    }

    /// Retarget a unary-lvalue opcode (pre/post incr/decr) to its
    /// ident-/prop-string-/generic form and emit its push-result variant,
    /// since every caller here uses the operator as a value. `target` is
    /// already known to be a valid reference (checked by the caller).
    fn emit_unary_lvalue(&mut self, plain: Opcode, target: Place, span: Span) -> Result<Place> {
        let scope = self.scope();
        match target {
            Place::Ident(lit, _) => {
                let op = unary_lvalue_ident_form(plain).expect("unary-lvalue opcode");
                scope.func.emitter.emit(push_result_form(op), Operand::Literal(lit));
            }
            Place::MemberName(lit, _) => {
                let op = unary_lvalue_prop_string_form(plain).expect("unary-lvalue opcode");
                scope.func.emitter.emit(push_result_form(op), Operand::Literal(lit));
            }
            Place::MemberComputed(_) => {
                scope.func.emitter.emit(push_result_form(plain), Operand::None);
            }
            Place::Value => return Err(super::function::invalid_assignment_target(span)),
        }
        Ok(Place::Value)
    }

    /// `LeftHandSideExpression`: `NewExpression` or `CallExpression`, with
    /// `.`/`[...]`/`(...)` chained on afterward.
    fn parse_lhs_expression(&mut self) -> Result<Place> {
        let mut place = if self.at_keyword(Keyword::New) { self.parse_new_expression()? } else { self.parse_primary_expression()? };
        loop {
            match self.current().kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.materialize(place)?;
                    self.bump(SlashContext::Divide)?;
                    let span = self.current_span();
                    let name = self.expect_property_name_identifier()?;
                    let lit = self.scope().func.ident_literal(name);
                    place = Place::MemberName(lit, span);
                }
                TokenKind::Punct(Punct::LeftBracket) => {
                    self.materialize(place)?;
                    let span = self.current_span();
                    self.bump(SlashContext::RegexpAllowed)?;
                    let key = self.parse_expression(false)?;
                    self.materialize(key)?;
                    self.expect_punct(Punct::RightBracket, ErrorKind::RightSquareExpected)?;
                    place = Place::MemberComputed(span);
                }
                TokenKind::Punct(Punct::LeftParen) => {
                    place = self.compile_call(place)?;
                }
                _ => break,
            }
        }
        Ok(place)
    }

    /// An identifier-spelled token used as a property name (`.foo`, or a
    /// getter/setter/plain key in an object literal): keywords and reserved
    /// words are valid here even though they aren't valid bindings.
    fn expect_property_name_identifier(&mut self) -> Result<CompressedPointer> {
        let span = self.current_span();
        let text = match self.current().kind {
            TokenKind::Identifier => self.text(span),
            TokenKind::Keyword(k) => k.as_str(),
            TokenKind::ReservedWord(r) => r.as_str(),
            _ => return Err(Error::parse(ErrorKind::IdentifierExpected, span)),
        };
        let bytes = text.as_bytes().to_vec();
        self.bump(SlashContext::Divide)?;
        self.store_intern(&bytes, span)
    }

    pub(super) fn store_intern(&mut self, bytes: &[u8], span: Span) -> Result<CompressedPointer> {
        self.store().find_or_create_from_utf8(bytes, span)
    }

    /// A string token's span covers the text including its quotes; this is
    /// the span of just the content between them.
    pub(super) fn string_inner_span(&self, span: Span) -> Span {
        Span::new(span.start + 1, span.end - 1, span.line, span.column)
    }

    fn parse_new_expression(&mut self) -> Result<Place> {
        self.bump(SlashContext::RegexpAllowed)?;
        let mut callee = if self.at_keyword(Keyword::New) { self.parse_new_expression()? } else { self.parse_primary_expression()? };
        loop {
            match self.current().kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.materialize(callee)?;
                    self.bump(SlashContext::Divide)?;
                    let span = self.current_span();
                    let name = self.expect_property_name_identifier()?;
                    let lit = self.scope().func.ident_literal(name);
                    callee = Place::MemberName(lit, span);
                }
                TokenKind::Punct(Punct::LeftBracket) => {
                    self.materialize(callee)?;
                    let span = self.current_span();
                    self.bump(SlashContext::RegexpAllowed)?;
                    let key = self.parse_expression(false)?;
                    self.materialize(key)?;
                    self.expect_punct(Punct::RightBracket, ErrorKind::RightSquareExpected)?;
                    callee = Place::MemberComputed(span);
                }
                _ => break,
            }
        }
        let argc = if self.at_punct(Punct::LeftParen) { self.compile_arguments()? } else { 0 };
        match callee {
            Place::Ident(lit, _) => {
                self.scope().func.emitter.emit(Opcode::CbcNewIdent, Operand::LiteralAndByte(lit, argc));
            }
            _ => {
                self.materialize(callee)?;
                self.scope().func.emitter.emit(Opcode::CbcNew, Operand::Byte(argc));
            }
        }
        Ok(Place::Value)
    }

    /// `(args)` right after an expression: dispatch on the callee's shape
    /// so member/ident calls bind `this` the way the corresponding opcode
    /// expects, instead of always materializing to a plain value call.
    fn compile_call(&mut self, callee: Place) -> Result<Place> {
        match callee {
            Place::Ident(lit, _) => {
                let argc = self.compile_arguments()?;
                self.scope().func.emitter.emit(push_result_form(Opcode::CbcCallIdent), Operand::LiteralAndByte(lit, argc));
            }
            Place::MemberName(lit, _) => {
                let argc = self.compile_arguments()?;
                self.scope().func.emitter.emit(push_result_form(Opcode::CbcCallPropString), Operand::LiteralAndByte(lit, argc));
            }
            Place::MemberComputed(_) => {
                let argc = self.compile_arguments()?;
                self.scope().func.emitter.emit(push_result_form(Opcode::CbcCallProp), Operand::Byte(argc));
            }
            Place::Value => {
                // general expression callee: `this` is undefined.
                self.scope().func.emitter.emit_ext(ExtOpcode::CbcExtPushUndefinedBase, Operand::None);
                let argc = self.compile_arguments()?;
                self.scope().func.emitter.emit(push_result_form(Opcode::CbcCall), Operand::Byte(argc));
            }
        }
        Ok(Place::Value)
    }

    /// Compiles the argument list already sitting behind `(`, returning the
    /// argument count encoded as the call opcode's byte operand.
    fn compile_arguments(&mut self) -> Result<u8> {
        self.expect_punct(Punct::LeftParen, ErrorKind::ArgumentListExpected)?;
        let mut count: u32 = 0;
        while !self.at_punct(Punct::RightParen) {
            let arg = self.parse_assignment_expression(false)?;
            self.materialize(arg)?;
            count += 1;
            if self.at_punct(Punct::Comma) {
                self.bump(SlashContext::RegexpAllowed)?;
            } else {
                break;
            }
        }
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        if count > u8::MAX as u32 {
            return Err(Error::parse(ErrorKind::ArgumentLimitReached, self.current_span()));
        }
        Ok(count as u8)
    }

    fn parse_primary_expression(&mut self) -> Result<Place> {
        let span = self.current_span();
        match self.current().kind {
            TokenKind::Keyword(Keyword::This) => {
                self.bump(SlashContext::Divide)?;
                self.scope().func.emitter.emit(Opcode::CbcPushThis, Operand::None);
                Ok(Place::Value)
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump(SlashContext::Divide)?;
                self.scope().func.emitter.emit(Opcode::CbcPushNull, Operand::None);
                Ok(Place::Value)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump(SlashContext::Divide)?;
                self.scope().func.emitter.emit(Opcode::CbcPushTrue, Operand::None);
                Ok(Place::Value)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump(SlashContext::Divide)?;
                self.scope().func.emitter.emit(Opcode::CbcPushFalse, Operand::None);
                Ok(Place::Value)
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_expression(),
            TokenKind::Identifier => {
                let text = self.text(span).as_bytes().to_vec();
                self.bump(SlashContext::Divide)?;
                let ptr = self.store_intern(&text, span)?;
                let lit = self.scope().func.ident_literal(ptr);
                Ok(Place::Ident(lit, span))
            }
            TokenKind::ReservedWord(_) => Err(Error::parse(ErrorKind::KeywordUsedAsIdentifier, span)),
            TokenKind::Number(kind) => {
                let text = self.text(span);
                let value = crate::lexer::number_value(text, kind);
                self.bump(SlashContext::Divide)?;
                let ptr = self.store().find_or_create_from_number(value, span)?;
                let lit = self.scope().func.const_literal(ptr);
                self.scope().func.emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(lit));
                Ok(Place::Value)
            }
            TokenKind::String { has_escape } => {
                let inner = self.string_inner_span(span);
                let raw = self.text(inner);
                let bytes = if has_escape { crate::lexer::decode_string_escapes(raw, inner)?.into_bytes() } else { raw.as_bytes().to_vec() };
                self.bump(SlashContext::Divide)?;
                let ptr = self.store_intern(&bytes, span)?;
                let lit = self.scope().func.const_literal(ptr);
                self.scope().func.emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(lit));
                Ok(Place::Value)
            }
            TokenKind::Regexp => {
                // spec.md's scope stops at literal capture: the VM is
                // responsible for recognizing this string as regexp source
                // and constructing the object.
                let text = self.text(span).as_bytes().to_vec();
                self.bump(SlashContext::Divide)?;
                let ptr = self.store_intern(&text, span)?;
                let lit = self.scope().func.const_literal(ptr);
                self.scope().func.emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(lit));
                Ok(Place::Value)
            }
            TokenKind::Punct(Punct::LeftParen) => {
                self.bump(SlashContext::RegexpAllowed)?;
                let inner = self.parse_expression(false)?;
                self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
                Ok(inner)
            }
            TokenKind::Punct(Punct::LeftBracket) => self.parse_array_literal(),
            TokenKind::Punct(Punct::LeftBrace) => self.parse_object_literal(),
            _ => Err(Error::parse(ErrorKind::PrimaryExprExpected, span)),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Place> {
        self.bump(SlashContext::RegexpAllowed)?;
        self.scope().func.emitter.emit_barrier(Opcode::CbcCreateArray, Operand::None);
        let mut pending: u32 = 0;
        loop {
            if self.at_punct(Punct::RightBracket) {
                break;
            }
            if self.at_punct(Punct::Comma) {
                self.scope().func.emitter.emit(Opcode::CbcPushElision, Operand::None);
                pending += 1;
                if pending == u8::MAX as u32 {
                    self.scope().func.emitter.emit(Opcode::CbcArrayAppend, Operand::Byte(pending as u8));
                    pending = 0;
                }
                self.bump(SlashContext::RegexpAllowed)?;
                continue;
            }
            let element = self.parse_assignment_expression(false)?;
            self.materialize(element)?;
            pending += 1;
            if pending == u8::MAX as u32 {
                self.scope().func.emitter.emit(Opcode::CbcArrayAppend, Operand::Byte(pending as u8));
                pending = 0;
            }
            if self.at_punct(Punct::Comma) {
                self.bump(SlashContext::RegexpAllowed)?;
                continue;
            }
            break;
        }
        if pending > 0 {
            self.scope().func.emitter.emit(Opcode::CbcArrayAppend, Operand::Byte(pending as u8));
        }
        self.expect_punct(Punct::RightBracket, ErrorKind::RightSquareExpected)?;
        Ok(Place::Value)
    }

    fn parse_object_literal(&mut self) -> Result<Place> {
        self.bump(SlashContext::RegexpAllowed)?;
        self.scope().func.emitter.emit_barrier(Opcode::CbcCreateObject, Operand::None);
        loop {
            if self.at_punct(Punct::RightBrace) {
                break;
            }
            self.parse_object_property()?;
            if self.at_punct(Punct::Comma) {
                self.bump(SlashContext::RegexpAllowed)?;
                continue;
            }
            break;
        }
        self.expect_punct(Punct::RightBrace, ErrorKind::RightBraceExpected)?;
        Ok(Place::Value)
    }

    /// One `PropertyAssignment`. ES5.1 has no shorthand data property, so a
    /// non-accessor entry is always `PropertyName : AssignmentExpression`;
    /// a property name token NOT followed by `:` can only be the `get`/`set`
    /// accessor introducer, disambiguated without a second token of
    /// lookahead by re-dispatching on the name just consumed.
    fn parse_object_property(&mut self) -> Result<()> {
        let (first, first_span) = self.parse_property_name()?;
        if self.eat_punct(Punct::Colon, SlashContext::RegexpAllowed)? {
            let value = self.parse_assignment_expression(false)?;
            self.materialize(value)?;
            let lit = self.scope().func.const_literal(first);
            self.scope().func.emitter.emit(Opcode::CbcSetProperty, Operand::Literal(lit));
            return Ok(());
        }
        let word = self.text(first_span);
        let is_getter = word == "get";
        let is_setter = word == "set";
        if !is_getter && !is_setter {
            return Err(Error::parse(ErrorKind::ColonExpected, self.current_span()));
        }
        let (name, _) = self.parse_property_name()?;
        self.compile_accessor_function(is_getter, name, first_span)
    }

    fn compile_accessor_function(&mut self, is_getter: bool, name: CompressedPointer, span: Span) -> Result<()> {
        let params = self.parse_parameter_list()?;
        if is_getter && !params.is_empty() {
            return Err(Error::parse(ErrorKind::NoArgumentsExpected, span));
        }
        if !is_getter && params.len() != 1 {
            return Err(Error::parse(ErrorKind::OneArgumentExpected, span));
        }
        let param_refs: Vec<&str> = params.iter().map(|s| s.as_str()).collect();
        self.compile_function_body(params.len() as u16, &param_refs, span)?;
        let lit = self.scope().func.const_literal(name);
        let ext = if is_getter { ExtOpcode::CbcExtSetGetter } else { ExtOpcode::CbcExtSetSetter };
        self.scope().func.emitter.emit_ext(ext, Operand::Literal(lit));
        Ok(())
    }

    fn parse_property_name(&mut self) -> Result<(CompressedPointer, Span)> {
        let span = self.current_span();
        match self.current().kind {
            TokenKind::Identifier => {
                let bytes = self.text(span).as_bytes().to_vec();
                self.bump(SlashContext::Divide)?;
                Ok((self.store_intern(&bytes, span)?, span))
            }
            TokenKind::Keyword(k) => {
                let bytes = k.as_str().as_bytes().to_vec();
                self.bump(SlashContext::Divide)?;
                Ok((self.store_intern(&bytes, span)?, span))
            }
            TokenKind::ReservedWord(r) => {
                let bytes = r.as_str().as_bytes().to_vec();
                self.bump(SlashContext::Divide)?;
                Ok((self.store_intern(&bytes, span)?, span))
            }
            TokenKind::String { has_escape } => {
                let inner = self.string_inner_span(span);
                let raw = self.text(inner);
                let bytes = if has_escape { crate::lexer::decode_string_escapes(raw, inner)?.into_bytes() } else { raw.as_bytes().to_vec() };
                self.bump(SlashContext::Divide)?;
                Ok((self.store_intern(&bytes, span)?, span))
            }
            TokenKind::Number(kind) => {
                let text = self.text(span);
                let value = crate::lexer::number_value(text, kind);
                self.bump(SlashContext::Divide)?;
                let name = crate::literals::store::format_number(value);
                Ok((self.store_intern(name.as_bytes(), span)?, span))
            }
            _ => Err(Error::parse(ErrorKind::IdentifierExpected, span)),
        }
    }

    /// A `function` used as a primary expression: `function [name](params) {body}`.
    fn parse_function_expression(&mut self) -> Result<Place> {
        let span = self.current_span();
        self.bump(SlashContext::Divide)?;
        if let TokenKind::Identifier = self.current().kind {
            self.bump(SlashContext::Divide)?;
        }
        let params = self.parse_parameter_list()?;
        let param_refs: Vec<&str> = params.iter().map(|s| s.as_str()).collect();
        self.compile_function_body(params.len() as u16, &param_refs, span)?;
        Ok(Place::Value)
    }

    pub(super) fn parse_parameter_list(&mut self) -> Result<Vec<String>> {
        self.expect_punct(Punct::LeftParen, ErrorKind::ArgumentListExpected)?;
        let mut params = Vec::new();
        while !self.at_punct(Punct::RightParen) {
            let span = self.current_span();
            match self.current().kind {
                TokenKind::Identifier => {
                    params.push(self.text(span).to_string());
                    self.bump(SlashContext::Divide)?;
                }
                _ => return Err(Error::parse(ErrorKind::IdentifierExpected, span)),
            }
            if self.at_punct(Punct::Comma) {
                self.bump(SlashContext::RegexpAllowed)?;
            } else {
                break;
            }
        }
        self.expect_punct(Punct::RightParen, ErrorKind::RightParenExpected)?;
        if params.len() > u8::MAX as usize {
            return Err(Error::parse(ErrorKind::ArgumentLimitReached, self.current_span()));
        }
        Ok(params)
    }

    /// Compiles `{ body }` as a nested function, pushing the resulting
    /// closure onto the enclosing expression's stack.
    pub(super) fn compile_function_body(&mut self, argument_count: u16, params: &[&str], span: Span) -> Result<()> {
        self.expect_punct(Punct::LeftBrace, ErrorKind::LeftBraceExpected)?;
        let body_start = span.start;
        self.push_scope(crate::bytecode::FunctionKind::Function, argument_count, self.strict());
        for name in params {
            let bytes = name.as_bytes().to_vec();
            let ptr = self.store_intern(&bytes, span)?;
            self.scope().func.ident_literal(ptr);
        }
        let prologue_strict = self.parse_directive_prologue()?;
        let strict = prologue_strict || self.strict();
        self.scope().func.strict = strict;
        if strict {
            self.scope().func.status_flags |= crate::bytecode::compiled_code::status_flags::STRICT_MODE;
        }
        while !self.at_punct(Punct::RightBrace) && !matches!(self.current().kind, TokenKind::Eof) {
            self.parse_statement()?;
        }
        let body_end = self.current_span().end;
        self.expect_punct(Punct::RightBrace, ErrorKind::RightBraceExpected)?;
        self.scope().func.emitter.emit_barrier(Opcode::CbcReturnWithUndefined, Operand::None);
        let raw = self.pop_scope((body_start as u32, body_end as u32));
        let lit = self.finish_nested_function(raw);
        self.scope().func.emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(lit));
        Ok(())
    }

    /// Push the value a [`Place`] refers to onto the stack; a no-op when
    /// it's already there.
    pub(super) fn materialize(&mut self, place: Place) -> Result<()> {
        match place {
            Place::Value => {}
            Place::Ident(lit, _) => {
                self.scope().func.emitter.emit(Opcode::CbcPushIdent, Operand::Literal(lit));
            }
            Place::MemberName(lit, _) => {
                self.scope().func.emitter.emit(Opcode::CbcPropStringGet, Operand::Literal(lit));
            }
            Place::MemberComputed(_) => {
                self.scope().func.emitter.emit(Opcode::CbcPropGet, Operand::None);
            }
        }
        Ok(())
    }
}
