//! The byte-code emitter: turns opcode + operand requests from the
//! expression/statement parsers into bytes in a [`PageList`], performing
//! in-place peephole fusion via the *last-emit cache* (spec.md section 4.3)
//! and tracking register allocation (section 4.5).

use crate::bytecode::opcode::{ExtOpcode, Opcode};
use crate::bytecode::page::{PageList, StreamOffset};
use crate::error::{Error, ErrorKind, Result, Span};
use crate::literals::CompressedPointer;

/// Which of the five fixed literal-index groups (spec.md section 4.5,
/// phase 1) a literal operand provisionally belongs to. The parser assigns
/// indices local to each category as it discovers them; the post-processor
/// adds each category's fixed base offset once every category's final size
/// is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralCategory {
    Argument,
    Register,
    Ident,
    ConstLiteral,
    Other,
}

/// A literal operand before post-processing has assigned it a final index:
/// which category it falls in, plus its index within that category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionalLiteral {
    pub category: LiteralCategory,
    pub local_index: u16,
}

/// A single emitted operand, recorded alongside the opcode so the last-emit
/// cache can inspect it when deciding whether the next emit fuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Literal(ProvisionalLiteral),
    TwoLiterals(ProvisionalLiteral, ProvisionalLiteral),
    Byte(u8),
    /// A literal operand followed by a byte operand, for the `CbcCallIdent`/
    /// `CbcCallPropString`/`CbcNewIdent` family, whose opcode flags set both
    /// `HAS_LITERAL_ARG` and `HAS_BYTE_ARG` at once.
    LiteralAndByte(ProvisionalLiteral, u8),
}

/// What the emitter remembers about the most recently emitted instruction,
/// so a following emit can rewrite it in place instead of appending.
/// spec.md section 4.3: "the parser remembers the last emitted opcode and
/// its literal arguments".
#[derive(Debug, Clone, Copy)]
struct CachedEmit {
    opcode: Opcode,
    operand: Operand,
    offset: StreamOffset,
}

/// Hard ceiling on live registers in one function, per spec.md section 4.5.
pub const REGISTER_LIMIT: u16 = 128;

/// Monotonically increasing temporary-register counter, reset at the start
/// of each statement; tracks the function-wide high-water mark that ends
/// up as `register_end`.
#[derive(Debug, Clone, Default)]
pub struct RegisterAllocator {
    current: u16,
    high_water: u16,
}

impl RegisterAllocator {
    pub fn new() -> RegisterAllocator {
        RegisterAllocator::default()
    }

    /// Called at the start of each statement: temporaries from the
    /// previous statement are all dead by then.
    pub fn reset_for_statement(&mut self) {
        self.current = 0;
    }

    pub fn allocate(&mut self, span: Span) -> Result<u16> {
        if self.current >= REGISTER_LIMIT {
            return Err(Error::parse(ErrorKind::RegisterLimitReached, span));
        }
        let reg = self.current;
        self.current += 1;
        self.high_water = self.high_water.max(self.current);
        Ok(reg)
    }

    pub fn high_water_mark(&self) -> u16 {
        self.high_water
    }
}

/// Wraps a [`PageList`] with the last-emit cache and literal-encoding
/// bookkeeping the parser needs while it still operates on raw opcodes
/// (before the post-processor assigns final literal indices).
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    stream: PageList,
    cache: Option<CachedEmit>,
    /// Where each literal operand lives in the raw stream and which
    /// provisional category/index it names — the post-processor's phase 1
    /// (index computation) and phase 4 (copy & rewrite) consult this
    /// instead of re-deriving operand positions from opcode flags.
    fixups: Vec<(StreamOffset, ProvisionalLiteral)>,
}

impl Emitter {
    pub fn new() -> Emitter {
        Emitter::default()
    }

    pub fn stream(&self) -> &PageList {
        &self.stream
    }

    pub fn fixups(&self) -> &[(StreamOffset, ProvisionalLiteral)] {
        &self.fixups
    }

    pub fn into_parts(self) -> (PageList, Vec<(StreamOffset, ProvisionalLiteral)>) {
        (self.stream, self.fixups)
    }

    pub fn into_stream(self) -> PageList {
        self.stream
    }

    /// Flush any cached instruction into the stream unconditionally. Must
    /// be called before any control-flow join point (branch target,
    /// statement boundary) since the cache may only rewrite the
    /// *immediately preceding* instruction (spec.md section 4.5: "Once any
    /// other emit intervenes, the previous instruction is immutable").
    pub fn flush(&mut self) {
        if let Some(cached) = self.cache.take() {
            self.write_raw(cached.opcode, cached.operand);
        }
    }

    fn write_raw(&mut self, opcode: Opcode, operand: Operand) -> StreamOffset {
        let start = self.stream.push(opcode as u8);
        match operand {
            Operand::None => {}
            Operand::Byte(b) => {
                self.stream.push(b);
            }
            Operand::Literal(idx) => {
                self.push_literal_index(idx);
            }
            Operand::TwoLiterals(a, b) => {
                self.push_literal_index(a);
                self.push_literal_index(b);
            }
            Operand::LiteralAndByte(idx, b) => {
                self.push_literal_index(idx);
                self.stream.push(b);
            }
        }
        start
    }

    /// Literals are pushed two-byte-wide here (the value itself doesn't
    /// matter since the side-table fixup is authoritative); the
    /// post-processor's copy pass compresses to the small/full encoding
    /// once the final literal count is known.
    fn push_literal_index(&mut self, literal: ProvisionalLiteral) {
        let offset = self.stream.len();
        self.stream.push_slice(&[0, 0]);
        self.fixups.push((offset, literal));
    }

    /// Emit an opcode with no operand, attempting cache-based fusion first.
    pub fn emit(&mut self, opcode: Opcode, operand: Operand) -> StreamOffset {
        if let Some(fused) = self.try_fuse(opcode, operand) {
            return fused;
        }
        self.flush();
        let offset = self.offset_after_flush();
        self.cache = Some(CachedEmit { opcode, operand, offset });
        offset
    }

    fn offset_after_flush(&self) -> StreamOffset {
        self.stream.len()
    }

    /// Emit an instruction that must never be fused into (a branch target,
    /// or anything the post-processor treats as a join point).
    pub fn emit_barrier(&mut self, opcode: Opcode, operand: Operand) -> StreamOffset {
        self.flush();
        self.write_raw(opcode, operand)
    }

    pub fn emit_ext(&mut self, ext: ExtOpcode, operand: Operand) -> StreamOffset {
        self.flush();
        let start = self.stream.push(Opcode::CbcExtOpcode as u8);
        self.stream.push(ext as u8);
        match operand {
            Operand::None => {}
            Operand::Byte(b) => {
                self.stream.push(b);
            }
            Operand::Literal(idx) => self.push_literal_index(idx),
            Operand::TwoLiterals(a, b) => {
                self.push_literal_index(a);
                self.push_literal_index(b);
            }
            Operand::LiteralAndByte(idx, b) => {
                self.push_literal_index(idx);
                self.stream.push(b);
            }
        }
        start
    }

    /// Reserve space for a branch instruction whose target isn't known yet;
    /// returns the offset to patch once the target is. Always a barrier,
    /// since branch instructions are join points.
    pub fn emit_branch_placeholder(&mut self, opcode: Opcode) -> StreamOffset {
        self.flush();
        let start = self.stream.push(opcode as u8);
        // Reserve the widest (3-byte) offset; the post-processor narrows it.
        self.stream.push_slice(&[0, 0, 0]);
        start
    }

    pub fn patch_branch_placeholder(&mut self, at: StreamOffset, target: StreamOffset) {
        let delta = target as i64 - at as i64;
        let bytes = (delta as i32).to_be_bytes();
        self.stream.patch(at + 1, bytes[1]);
        self.stream.patch(at + 2, bytes[2]);
        self.stream.patch(at + 3, bytes[3]);
    }

    /// Like [`Emitter::emit_branch_placeholder`] for the `CbcExt*CreateContext`/
    /// `CbcExtCatch`/`CbcExtFinally` family, whose branch offset sits after the
    /// extra `CbcExtOpcode` marker byte and the ext-opcode byte.
    pub fn emit_ext_branch_placeholder(&mut self, ext: ExtOpcode) -> StreamOffset {
        self.flush();
        let start = self.stream.push(Opcode::CbcExtOpcode as u8);
        self.stream.push(ext as u8);
        self.stream.push_slice(&[0, 0, 0]);
        start
    }

    pub fn patch_ext_branch_placeholder(&mut self, at: StreamOffset, target: StreamOffset) {
        let delta = target as i64 - at as i64;
        let bytes = (delta as i32).to_be_bytes();
        self.stream.patch(at + 2, bytes[1]);
        self.stream.patch(at + 3, bytes[2]);
        self.stream.patch(at + 4, bytes[3]);
    }

    /// Attempt one of the fusion rules spec.md section 4.3 lists. Returns
    /// `Some(offset)` of the rewritten instruction if fusion applied.
    fn try_fuse(&mut self, opcode: Opcode, operand: Operand) -> Option<StreamOffset> {
        let cached = self.cache?;
        match (cached.opcode, cached.operand, opcode, operand) {
            // PUSH_LITERAL, PUSH_LITERAL -> PUSH_TWO_LITERALS
            (Opcode::CbcPushLiteral, Operand::Literal(a), Opcode::CbcPushLiteral, Operand::Literal(b)) => {
                Some(self.rewrite_cached(Opcode::CbcPushTwoLiterals, Operand::TwoLiterals(a, b)))
            }
            // PUSH_LITERAL followed by a binary op -> *_RIGHT_LITERAL
            (Opcode::CbcPushLiteral, Operand::Literal(lit), binop, Operand::None) => {
                right_literal_form(binop).map(|fused| self.rewrite_cached(fused, Operand::Literal(lit)))
            }
            // PUSH_TWO_LITERALS followed by a binary op -> *_TWO_LITERALS,
            // for `<literal> <op> <literal>` where both sides already fused
            // into one push.
            (Opcode::CbcPushTwoLiterals, Operand::TwoLiterals(a, b), binop, Operand::None) => {
                right_literal_form(binop)
                    .and_then(two_literals_form)
                    .map(|fused| self.rewrite_cached(fused, Operand::TwoLiterals(a, b)))
            }
            // PROP_GET followed immediately by an assignment store of the
            // same target collapses to a single property-set instruction.
            // The statement/expression parser passes PropSetter explicitly
            // rather than this emitter inferring it from a generic store,
            // since "the same target" requires identity the emitter alone
            // can't observe.
            _ => None,
        }
    }

    fn rewrite_cached(&mut self, opcode: Opcode, operand: Operand) -> StreamOffset {
        let offset = self.cache.take().expect("rewrite_cached without a cached emit").offset;
        self.stream.truncate(offset);
        self.cache = Some(CachedEmit { opcode, operand, offset });
        offset
    }
}

/// Maps a plain binary opcode to its `_RIGHT_LITERAL` form, one step in the
/// last-emit fusion table.
fn right_literal_form(op: Opcode) -> Option<Opcode> {
    use Opcode::*;
    Some(match op {
        // Unary ops: a literal operand immediately followed by the unary
        // op fuses the same way a binary right-hand literal does.
        CbcPlus => CbcPlusLiteral,
        CbcNegate => CbcNegateLiteral,
        CbcLogicalNot => CbcLogicalNotLiteral,
        CbcBitNot => CbcBitNotLiteral,
        CbcVoid => CbcVoidLiteral,
        CbcTypeof => CbcTypeofLiteral,
        CbcBitOr => CbcBitOrRightLiteral,
        CbcBitXor => CbcBitXorRightLiteral,
        CbcBitAnd => CbcBitAndRightLiteral,
        CbcEqual => CbcEqualRightLiteral,
        CbcNotEqual => CbcNotEqualRightLiteral,
        CbcStrictEqual => CbcStrictEqualRightLiteral,
        CbcStrictNotEqual => CbcStrictNotEqualRightLiteral,
        CbcLess => CbcLessRightLiteral,
        CbcGreater => CbcGreaterRightLiteral,
        CbcLessEqual => CbcLessEqualRightLiteral,
        CbcGreaterEqual => CbcGreaterEqualRightLiteral,
        CbcIn => CbcInRightLiteral,
        CbcInstanceof => CbcInstanceofRightLiteral,
        CbcLeftShift => CbcLeftShiftRightLiteral,
        CbcRightShift => CbcRightShiftRightLiteral,
        CbcUnsRightShift => CbcUnsRightShiftRightLiteral,
        CbcAdd => CbcAddRightLiteral,
        CbcSubtract => CbcSubtractRightLiteral,
        CbcMultiply => CbcMultiplyRightLiteral,
        CbcDivide => CbcDivideRightLiteral,
        CbcModulo => CbcModuloRightLiteral,
        _ => return None,
    })
}

/// Maps a `_RIGHT_LITERAL` opcode to its `_TWO_LITERALS` form, for
/// `try_fuse`'s `PUSH_TWO_LITERALS, binop` case: both operands are already
/// known constants by the time the binary op is emitted.
fn two_literals_form(right_literal_op: Opcode) -> Option<Opcode> {
    use Opcode::*;
    Some(match right_literal_op {
        CbcBitOrRightLiteral => CbcBitOrTwoLiterals,
        CbcBitXorRightLiteral => CbcBitXorTwoLiterals,
        CbcBitAndRightLiteral => CbcBitAndTwoLiterals,
        CbcEqualRightLiteral => CbcEqualTwoLiterals,
        CbcNotEqualRightLiteral => CbcNotEqualTwoLiterals,
        CbcStrictEqualRightLiteral => CbcStrictEqualTwoLiterals,
        CbcStrictNotEqualRightLiteral => CbcStrictNotEqualTwoLiterals,
        CbcLessRightLiteral => CbcLessTwoLiterals,
        CbcGreaterRightLiteral => CbcGreaterTwoLiterals,
        CbcLessEqualRightLiteral => CbcLessEqualTwoLiterals,
        CbcGreaterEqualRightLiteral => CbcGreaterEqualTwoLiterals,
        CbcInRightLiteral => CbcInTwoLiterals,
        CbcInstanceofRightLiteral => CbcInstanceofTwoLiterals,
        CbcLeftShiftRightLiteral => CbcLeftShiftTwoLiterals,
        CbcRightShiftRightLiteral => CbcRightShiftTwoLiterals,
        CbcUnsRightShiftRightLiteral => CbcUnsRightShiftTwoLiterals,
        CbcAddRightLiteral => CbcAddTwoLiterals,
        CbcSubtractRightLiteral => CbcSubtractTwoLiterals,
        CbcMultiplyRightLiteral => CbcMultiplyTwoLiterals,
        CbcDivideRightLiteral => CbcDivideTwoLiterals,
        CbcModuloRightLiteral => CbcModuloTwoLiterals,
        _ => return None,
    })
}

/// Retarget a unary-lvalue opcode's plain form to its ident- or
/// prop-string-targeted form, per spec.md's "Unary-LValue sequences
/// (pre/post increment, delete): retarget to the ident-/prop-variant
/// opcodes" rule.
pub fn unary_lvalue_ident_form(plain: Opcode) -> Option<Opcode> {
    use Opcode::*;
    Some(match plain {
        CbcDelete => CbcDeleteIdent,
        CbcPreIncr => CbcPreIncrIdent,
        CbcPreDecr => CbcPreDecrIdent,
        CbcPostIncr => CbcPostIncrIdent,
        CbcPostDecr => CbcPostDecrIdent,
        _ => return None,
    })
}

pub fn unary_lvalue_prop_string_form(plain: Opcode) -> Option<Opcode> {
    use Opcode::*;
    Some(match plain {
        CbcDelete => CbcDeletePropString,
        CbcPreIncr => CbcPreIncrPropString,
        CbcPreDecr => CbcPreDecrPropString,
        CbcPostIncr => CbcPostIncrPropString,
        CbcPostDecr => CbcPostDecrPropString,
        _ => return None,
    })
}

/// `_PUSH_RESULT` is always one past the plain form in both the call
/// family and the unary-lvalue ident/prop-string families — spec.md
/// section 4.3's "adding 1 to the opcode" rule.
pub fn push_result_form(plain: Opcode) -> Opcode {
    Opcode::from_u8(plain as u8 + 1).unwrap_or(plain)
}

/// Stand-in for a decompressed literal value, used only to decide which
/// constant-folding path applies; the real value lives in the literal
/// store and this is just the parser-local view of it.
#[derive(Debug, Clone, Copy)]
pub enum ConstValue {
    Number(f64),
    StringRef(CompressedPointer),
    Boolean(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn const_literal(local_index: u16) -> ProvisionalLiteral {
        ProvisionalLiteral { category: LiteralCategory::ConstLiteral, local_index }
    }

    #[test]
    fn two_push_literals_fuse() {
        let mut emitter = Emitter::new();
        emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(const_literal(3)));
        emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(const_literal(7)));
        emitter.flush();
        let bytes = emitter.into_stream().to_vec();
        assert_eq!(bytes[0], Opcode::CbcPushTwoLiterals as u8);
    }

    #[test]
    fn literal_then_binop_fuses_to_right_literal() {
        let mut emitter = Emitter::new();
        emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(const_literal(5)));
        emitter.emit(Opcode::CbcAdd, Operand::None);
        emitter.flush();
        let bytes = emitter.into_stream().to_vec();
        assert_eq!(bytes[0], Opcode::CbcAddRightLiteral as u8);
    }

    #[test]
    fn two_literals_then_binop_fuses_to_two_literals() {
        let mut emitter = Emitter::new();
        emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(const_literal(3)));
        emitter.emit(Opcode::CbcPushLiteral, Operand::Literal(const_literal(7)));
        emitter.emit(Opcode::CbcAdd, Operand::None);
        emitter.flush();
        let bytes = emitter.into_stream().to_vec();
        assert_eq!(bytes[0], Opcode::CbcAddTwoLiterals as u8);
    }

    #[test]
    fn unrelated_emits_do_not_fuse() {
        let mut emitter = Emitter::new();
        emitter.emit(Opcode::CbcPushThis, Operand::None);
        emitter.emit(Opcode::CbcPushUndefined, Operand::None);
        emitter.flush();
        let bytes = emitter.into_stream().to_vec();
        assert_eq!(bytes, vec![Opcode::CbcPushThis as u8, Opcode::CbcPushUndefined as u8]);
    }

    #[test]
    fn register_allocator_enforces_ceiling() {
        let mut alloc = RegisterAllocator::new();
        let span = Span::default();
        for _ in 0..REGISTER_LIMIT {
            alloc.allocate(span).unwrap();
        }
        assert!(alloc.allocate(span).is_err());
    }

    #[test]
    fn register_allocator_resets_per_statement() {
        let mut alloc = RegisterAllocator::new();
        let span = Span::default();
        alloc.allocate(span).unwrap();
        alloc.allocate(span).unwrap();
        assert_eq!(alloc.high_water_mark(), 2);
        alloc.reset_for_statement();
        alloc.allocate(span).unwrap();
        assert_eq!(alloc.high_water_mark(), 2);
    }
}
