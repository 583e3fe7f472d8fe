//! The four-phase post-processing pipeline that turns a parsed function's
//! scratch state (page-chunked byte-code plus provisional literal
//! references) into a finished [`CompiledCode`] — spec.md section 4.5.

use std::collections::HashMap;

use crate::bytecode::compiled_code::{CompiledCode, FunctionKind, LiteralGroups, LiteralPoolEntry};
use crate::bytecode::emitter::{Emitter, LiteralCategory, ProvisionalLiteral};
use crate::bytecode::opcode::{BranchWidth, Opcode};
use crate::bytecode::page::{PageList, StreamOffset};
use crate::literals::CompressedPointer;

/// Everything a [`FunctionContext`](crate::parser::function::FunctionContext)
/// accumulates during parsing and hands to [`finish`] once the function
/// body is fully parsed.
pub struct RawFunction {
    pub kind: FunctionKind,
    pub emitter: Emitter,
    pub argument_count: u16,
    pub register_count: u16,
    /// Literal-store pointer behind each `Ident` provisional index, in
    /// discovery order.
    pub idents: Vec<CompressedPointer>,
    /// Literal-store pointer behind each `ConstLiteral` provisional index.
    pub const_literals: Vec<CompressedPointer>,
    /// Non-literal-store entries (nested functions, by index into the
    /// parser's function table) behind each `Other` provisional index.
    pub other_literals: Vec<LiteralPoolEntry>,
    pub source_range: (u32, u32),
    pub status_flags: u16,
}

/// Phase 1: bucket provisional literal references into their five final
/// groups and compute each group's base offset, per spec.md's fixed order
/// (arguments, registers, identifiers, const-literals, other).
fn compute_groups(raw: &RawFunction) -> LiteralGroups {
    let argument_end = raw.argument_count;
    let register_end = argument_end + raw.register_count;
    let ident_end = register_end + raw.idents.len() as u16;
    let const_literal_end = ident_end + raw.const_literals.len() as u16;
    let literal_end = const_literal_end + raw.other_literals.len() as u16;
    LiteralGroups { argument_end, register_end, ident_end, const_literal_end, literal_end }
}

fn final_index(groups: &LiteralGroups, lit: ProvisionalLiteral) -> u16 {
    match lit.category {
        LiteralCategory::Argument => lit.local_index,
        LiteralCategory::Register => groups.argument_end + lit.local_index,
        LiteralCategory::Ident => groups.register_end + lit.local_index,
        LiteralCategory::ConstLiteral => groups.ident_end + lit.local_index,
        LiteralCategory::Other => groups.const_literal_end + lit.local_index,
    }
}

/// Small/full literal-index encoding, spec.md section 4.5. Small: indices
/// <= 254 are one byte, 255 signals a two-byte form. Full: indices <= 127
/// are one byte, the top bit set signals the two-byte form.
fn encode_literal_index(index: u16, full: bool) -> Vec<u8> {
    if full {
        if index <= 0x7F {
            vec![index as u8]
        } else {
            vec![0x80 | ((index >> 8) as u8 & 0x7F), (index & 0xFF) as u8]
        }
    } else if index <= 254 {
        vec![index as u8]
    } else {
        vec![255, (index & 0xFF) as u8]
    }
}

/// One decoded instruction from the raw (pre-post-process) stream: enough
/// to know its total width and whether it's a dead zero-distance jump.
struct DecodedInstruction {
    start: StreamOffset,
    opcode: Opcode,
    /// Byte length in the *raw* stream (always the widest encodings).
    raw_len: usize,
    is_branch: bool,
    /// Raw stream offset of the 3-byte placeholder branch target, if any.
    branch_target_field: Option<StreamOffset>,
    dead: bool,
}

/// Walk the raw stream opcode-by-opcode using [`Opcode::flags`] to know
/// each instruction's shape, matching phase 2's "length pass" scan.
fn decode_instructions(stream: &PageList) -> Vec<DecodedInstruction> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    let len = stream.len();
    while offset < len {
        let start = offset;
        let raw_opcode = stream.get(offset);
        offset += 1;
        let (opcode, raw_len, is_branch, branch_target_field) = if raw_opcode == Opcode::CbcExtOpcode as u8 {
            // Extended opcode: one extra opcode byte, no branch/literal
            // decoding needed at this layer since phase 2 only measures
            // raw width here; the copy pass re-reads ext flags directly.
            let ext_len = 1;
            offset += ext_len;
            (Opcode::CbcExtOpcode, 1 + ext_len, false, None)
        } else {
            let opcode = Opcode::from_u8(raw_opcode).expect("decode: opcode byte out of range");
            let flags = opcode.flags();
            let mut len = 1usize;
            if flags & crate::bytecode::opcode::HAS_BYTE_ARG != 0 {
                len += 1;
                offset += 1;
            }
            if flags & crate::bytecode::opcode::HAS_LITERAL_ARG != 0 {
                len += 2;
                offset += 2;
            }
            if flags & crate::bytecode::opcode::HAS_LITERAL_ARG2 != 0 {
                len += 2;
                offset += 2;
            }
            let branch_field = if flags & crate::bytecode::opcode::HAS_BRANCH_ARG != 0 {
                let field = offset;
                len += 3;
                offset += 3;
                Some(field)
            } else {
                None
            };
            (opcode, len, branch_field.is_some(), branch_field)
        };
        out.push(DecodedInstruction {
            start,
            opcode,
            raw_len,
            is_branch,
            branch_target_field,
            dead: false,
        });
    }
    out
}

/// Run all four phases and produce the finished compiled-code object.
pub fn finish(raw: RawFunction) -> CompiledCode {
    // Phase 1: index computation.
    let groups = compute_groups(&raw);

    let literal_pool = build_literal_pool(&raw, &groups);

    let (stream, fixups) = raw.emitter.into_parts();
    let fixup_map: HashMap<StreamOffset, ProvisionalLiteral> = fixups.into_iter().collect();

    // Phase 2: length pass. Decode instructions, mark zero-distance
    // unconditional forward jumps dead, and compute this function's
    // literal encoding mode from its total literal count.
    let mut instructions = decode_instructions(&stream);
    for inst in &mut instructions {
        if inst.opcode == Opcode::CbcJumpForward {
            if let Some(field) = inst.branch_target_field {
                let delta = read_be24(&stream, field);
                if delta == inst.raw_len as i32 {
                    inst.dead = true;
                }
            }
        }
    }

    let full_encoding = groups.literal_end > crate::bytecode::compiled_code::LiteralEncoding::SMALL_LIMIT;

    // Branch widths start at the worst case (3 bytes) and only ever shrink
    // as the relaxation loop below discovers tighter final distances —
    // the classic assembler fixed-point: a narrower encoding can only
    // bring targets closer together, never push them further apart, so
    // this is guaranteed to converge.
    let mut branch_width = vec![BranchWidth::Three; instructions.len()];
    let final_offset_of = loop {
        let mut offsets = HashMap::new();
        let mut cursor = 0u32;
        for (i, inst) in instructions.iter().enumerate() {
            offsets.insert(inst.start, cursor);
            if !inst.dead {
                cursor += base_width(inst, &fixup_map, &groups, full_encoding) as u32;
                if inst.is_branch {
                    cursor += branch_width[i].bytes() as u32;
                }
            }
        }
        offsets.insert(stream.len(), cursor);

        let mut changed = false;
        for (i, inst) in instructions.iter().enumerate() {
            if inst.dead || !inst.is_branch {
                continue;
            }
            let field = inst.branch_target_field.unwrap();
            let raw_delta = read_be24(&stream, field);
            let target_raw = (inst.start as i64 + raw_delta as i64) as usize;
            let source_final = *offsets.get(&inst.start).unwrap() as i64;
            let target_final = *offsets.get(&target_raw).unwrap_or(&(source_final as u32)) as i64;
            let needed = required_branch_width(target_final - source_final);
            if needed.bytes() < branch_width[i].bytes() {
                branch_width[i] = needed;
                changed = true;
            }
        }
        if !changed {
            break offsets;
        }
    };

    // Phase 4: copy & branch rewrite (phase 3's prologue synthesis is the
    // caller's responsibility via `prepend_prologue`, since it needs
    // information — which locals are initialized, with what — that lives
    // in the statement parser, not here).
    let final_len = *final_offset_of.get(&stream.len()).unwrap();
    let mut out = Vec::with_capacity(final_len as usize);
    for (i, inst) in instructions.iter().enumerate() {
        if inst.dead {
            continue;
        }
        copy_instruction(inst, branch_width[i], &stream, &fixup_map, &groups, full_encoding, &final_offset_of, &mut out);
    }

    CompiledCode {
        kind: raw.kind,
        status_flags: raw.status_flags | if full_encoding { crate::bytecode::compiled_code::status_flags::FULL_LITERAL_ENCODING } else { 0 },
        stack_limit: compute_stack_limit(&instructions),
        groups,
        literal_pool,
        byte_code: out,
        source_range: raw.source_range,
    }
}

fn read_be24(stream: &PageList, at: StreamOffset) -> i32 {
    let bytes = [stream.get(at), stream.get(at + 1), stream.get(at + 2)];
    i32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

/// Width of everything but a trailing branch offset: opcode byte, byte
/// arg, and literal args at their final (possibly narrowed) encoding.
fn base_width(
    inst: &DecodedInstruction,
    fixups: &HashMap<StreamOffset, ProvisionalLiteral>,
    groups: &LiteralGroups,
    full_encoding: bool,
) -> usize {
    if inst.opcode == Opcode::CbcExtOpcode {
        return inst.raw_len;
    }
    let flags = inst.opcode.flags();
    let mut width = 1usize;
    let mut offset = inst.start + 1;
    if flags & crate::bytecode::opcode::HAS_BYTE_ARG != 0 {
        width += 1;
        offset += 1;
    }
    for has_arg in [
        flags & crate::bytecode::opcode::HAS_LITERAL_ARG != 0,
        flags & crate::bytecode::opcode::HAS_LITERAL_ARG2 != 0,
    ] {
        if has_arg {
            if let Some(lit) = fixups.get(&offset) {
                width += encode_literal_index(final_index(groups, *lit), full_encoding).len();
            } else {
                width += if full_encoding { 2 } else { 1 };
            }
            offset += 2;
        }
    }
    width
}

/// Narrowest width that can represent `delta` as a signed magnitude,
/// matching the branch family's `[fwd_1B, fwd_2B, fwd_3B]` /
/// `[back_1B, back_2B, back_3B]` slots.
fn required_branch_width(delta: i64) -> BranchWidth {
    let magnitude = delta.unsigned_abs();
    if magnitude <= 0xFF {
        BranchWidth::One
    } else if magnitude <= 0xFFFF {
        BranchWidth::Two
    } else {
        BranchWidth::Three
    }
}

fn copy_instruction(
    inst: &DecodedInstruction,
    width: BranchWidth,
    stream: &PageList,
    fixups: &HashMap<StreamOffset, ProvisionalLiteral>,
    groups: &LiteralGroups,
    full_encoding: bool,
    final_offset_of: &HashMap<StreamOffset, u32>,
    out: &mut Vec<u8>,
) {
    if inst.opcode == Opcode::CbcExtOpcode {
        for i in 0..inst.raw_len {
            out.push(stream.get(inst.start + i));
        }
        return;
    }

    let flags = inst.opcode.flags();
    out.push(inst.opcode as u8);
    let mut offset = inst.start + 1;

    if flags & crate::bytecode::opcode::HAS_BYTE_ARG != 0 {
        out.push(stream.get(offset));
        offset += 1;
    }
    for has_arg in [
        flags & crate::bytecode::opcode::HAS_LITERAL_ARG != 0,
        flags & crate::bytecode::opcode::HAS_LITERAL_ARG2 != 0,
    ] {
        if has_arg {
            let index = fixups.get(&offset).map(|lit| final_index(groups, *lit)).unwrap_or(0);
            out.extend(encode_literal_index(index, full_encoding));
            offset += 2;
        }
    }

    if inst.is_branch {
        let field = inst.branch_target_field.expect("branch instruction missing target field");
        let raw_delta = read_be24(stream, field);
        let target_raw = (inst.start as i64) + (raw_delta as i64);
        let source_final = *final_offset_of.get(&inst.start).unwrap() as i64;
        let target_final = *final_offset_of.get(&(target_raw as usize)).unwrap_or(&(source_final as u32)) as i64;
        let delta = target_final - source_final;
        let narrowed = narrow_branch_opcode(inst.opcode, width);
        *out.last_mut().unwrap() = narrowed as u8;
        out.extend(encode_branch_offset_fixed(delta, width));
    }
}

/// Within a branch group of 8 (`[unused, fwd1, fwd2, fwd3, unused, back1,
/// back2, back3]`), pick the slot for `width`, keeping the original
/// opcode's forward/backward direction.
fn narrow_branch_opcode(opcode: Opcode, width: BranchWidth) -> Opcode {
    let raw = opcode as u8;
    let base = raw - (raw % 8);
    let is_backward = raw % 8 >= 5;
    let slot = match width {
        BranchWidth::One => 1,
        BranchWidth::Two => 2,
        BranchWidth::Three => 3,
    };
    let group_offset = if is_backward { slot + 4 } else { slot };
    Opcode::from_u8(base + group_offset).unwrap_or(opcode)
}

/// Encode `delta`'s magnitude in exactly `width` big-endian bytes.
fn encode_branch_offset_fixed(delta: i64, width: BranchWidth) -> Vec<u8> {
    let magnitude = delta.unsigned_abs() as u32;
    match width {
        BranchWidth::One => vec![(magnitude & 0xFF) as u8],
        BranchWidth::Two => vec![((magnitude >> 8) & 0xFF) as u8, (magnitude & 0xFF) as u8],
        BranchWidth::Three => {
            vec![((magnitude >> 16) & 0xFF) as u8, ((magnitude >> 8) & 0xFF) as u8, (magnitude & 0xFF) as u8]
        }
    }
}

fn compute_stack_limit(instructions: &[DecodedInstruction]) -> u16 {
    let mut depth: i32 = 0;
    let mut max_depth: i32 = 0;
    for inst in instructions {
        if inst.dead {
            continue;
        }
        depth += inst.opcode.stack_adjust() as i32;
        max_depth = max_depth.max(depth);
    }
    max_depth.max(0) as u16
}

fn build_literal_pool(raw: &RawFunction, groups: &LiteralGroups) -> Vec<LiteralPoolEntry> {
    let mut pool = vec![LiteralPoolEntry::Slot; groups.register_end as usize];
    for ptr in &raw.idents {
        pool.push(LiteralPoolEntry::Pointer(*ptr));
    }
    for ptr in &raw.const_literals {
        pool.push(LiteralPoolEntry::Pointer(*ptr));
    }
    pool.extend(raw.other_literals.iter().copied());
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::emitter::Operand;
    use crate::error::Span;
    use crate::literals::LiteralStore;

    fn const_lit(i: u16) -> ProvisionalLiteral {
        ProvisionalLiteral { category: LiteralCategory::ConstLiteral, local_index: i }
    }

    #[test]
    fn empty_function_compiles_to_return_with_undefined() {
        let mut emitter = Emitter::new();
        emitter.emit_barrier(Opcode::CbcReturnWithUndefined, Operand::None);
        let raw = RawFunction {
            kind: FunctionKind::Script,
            emitter,
            argument_count: 0,
            register_count: 0,
            idents: Vec::new(),
            const_literals: Vec::new(),
            other_literals: Vec::new(),
            source_range: (0, 0),
            status_flags: 0,
        };
        let compiled = finish(raw);
        assert_eq!(compiled.byte_code, vec![Opcode::CbcReturnWithUndefined as u8]);
        assert_eq!(compiled.groups.argument_end, 0);
        assert_eq!(compiled.groups.literal_end, 0);
    }

    #[test]
    fn dead_zero_distance_jump_is_elided() {
        let mut store = LiteralStore::new();
        let ptr = store.find_or_create_from_number(1.0, Span::default()).unwrap();
        let mut emitter = Emitter::new();
        let at = emitter.emit_branch_placeholder(Opcode::CbcJumpForward);
        emitter.patch_branch_placeholder(at, at + 4);
        emitter.emit_barrier(Opcode::CbcPushLiteral, Operand::Literal(const_lit(0)));
        emitter.emit_barrier(Opcode::CbcReturn, Operand::None);
        let raw = RawFunction {
            kind: FunctionKind::Script,
            emitter,
            argument_count: 0,
            register_count: 0,
            idents: Vec::new(),
            const_literals: vec![ptr],
            other_literals: Vec::new(),
            source_range: (0, 0),
            status_flags: 0,
        };
        let compiled = finish(raw);
        assert_eq!(compiled.byte_code[0], Opcode::CbcPushLiteral as u8);
    }

    #[test]
    fn literal_index_offsets_by_group_base() {
        let mut emitter = Emitter::new();
        emitter.emit_barrier(
            Opcode::CbcPushIdent,
            Operand::Literal(ProvisionalLiteral { category: LiteralCategory::Ident, local_index: 0 }),
        );
        let raw = RawFunction {
            kind: FunctionKind::Function,
            emitter,
            argument_count: 2,
            register_count: 1,
            idents: vec![CompressedPointer::compress(0, 0).unwrap()],
            const_literals: Vec::new(),
            other_literals: Vec::new(),
            source_range: (0, 0),
            status_flags: 0,
        };
        let compiled = finish(raw);
        // argument_end=2, register_end=3, so ident 0 -> final index 3. Total
        // literal count (4) stays within the small-encoding limit, so the
        // index is a single byte.
        assert_eq!(compiled.byte_code.len(), 2);
        assert_eq!(compiled.byte_code[1], 3);
    }
}
