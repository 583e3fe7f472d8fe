//! Disassembler for finished [`CompiledCode`] objects: decodes a byte-code
//! stream back into mnemonics, reachable only through `--debug-bytecode`
//! (spec.md section 6). Carries no semantic weight — nothing in the parser
//! or post-processor depends on this module.

use std::fmt::Write;

use crate::bytecode::compiled_code::{CompiledCode, LiteralEncoding, LiteralPoolEntry};
use crate::bytecode::opcode::{
    BranchWidth, ExtOpcode, Opcode, HAS_BRANCH_ARG, HAS_BYTE_ARG, HAS_LITERAL_ARG, HAS_LITERAL_ARG2,
};
use crate::literals::LiteralStore;

#[derive(Debug, Clone)]
pub struct DisassemblyOptions {
    /// Resolve literal-pool indices to their stored string/number values.
    pub show_constant_values: bool,
    /// Annotate each line with its net stack-height change.
    pub show_analysis: bool,
    /// Label branch targets as `L<offset>:` and reference them by label.
    pub show_jump_labels: bool,
}

impl Default for DisassemblyOptions {
    fn default() -> Self {
        DisassemblyOptions { show_constant_values: true, show_analysis: false, show_jump_labels: true }
    }
}

pub struct Disassembler {
    options: DisassemblyOptions,
}

impl Disassembler {
    pub fn new() -> Disassembler {
        Disassembler { options: DisassemblyOptions::default() }
    }

    pub fn with_options(options: DisassemblyOptions) -> Disassembler {
        Disassembler { options }
    }

    pub fn set_options(&mut self, options: DisassemblyOptions) {
        self.options = options;
    }

    /// Disassemble a whole compiled-code object to a formatted string.
    /// `store` resolves literal-pool pointers to their stored values.
    pub fn disassemble_function(&self, code: &CompiledCode, store: &LiteralStore) -> String {
        let mut out = String::new();
        writeln!(out, "=== {:?} ===", code.kind).unwrap();
        writeln!(out, "stack_limit: {}", code.stack_limit).unwrap();
        writeln!(
            out,
            "literals: {} args, {} regs, {} idents, {} const, {} other ({:?} encoding)",
            code.groups.argument_count(),
            code.groups.register_count(),
            code.groups.ident_count(),
            code.groups.const_literal_count(),
            code.groups.other_literal_count(),
            code.literal_encoding(),
        )
        .unwrap();
        writeln!(out).unwrap();

        let instructions = decode(code);
        let jump_targets = if self.options.show_jump_labels {
            instructions.iter().filter_map(|i| i.branch_target).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        writeln!(out, "Bytecode:").unwrap();
        for inst in &instructions {
            if jump_targets.contains(&inst.start) {
                writeln!(out, "L{}:", inst.start).unwrap();
            }
            writeln!(out, "{}", self.format_instruction(inst, code, store)).unwrap();
        }
        out
    }

    fn format_instruction(&self, inst: &DecodedInstruction, code: &CompiledCode, store: &LiteralStore) -> String {
        let mut line = format!("  {:4}: {}", inst.start, inst.op.name());

        if let Some(b) = inst.byte_arg {
            write!(line, " {}", b).unwrap();
        }
        if let Some(idx) = inst.literal_index {
            write!(line, " {}", self.format_literal(idx, code, store)).unwrap();
        }
        if let Some(idx) = inst.literal_index2 {
            write!(line, " {}", self.format_literal(idx, code, store)).unwrap();
        }
        if let Some(target) = inst.branch_target {
            if self.options.show_jump_labels {
                write!(line, " L{}", target).unwrap();
            } else {
                write!(line, " {:+}", target as i64 - inst.start as i64).unwrap();
            }
        }

        if self.options.show_analysis {
            let adjust = inst.op.stack_adjust();
            if adjust != 0 {
                write!(line, "  ; stack {:+}", adjust).unwrap();
            }
        }

        line
    }

    fn format_literal(&self, idx: u16, code: &CompiledCode, store: &LiteralStore) -> String {
        if code.groups.is_slot_index(idx) {
            if idx < code.groups.argument_end {
                return format!("arg{}", idx);
            }
            return format!("r{}", idx - code.groups.argument_end);
        }
        if !self.options.show_constant_values {
            return format!("#{}", idx);
        }
        match code.literal_pool.get(idx as usize) {
            Some(LiteralPoolEntry::Pointer(ptr)) => match store.to_utf8(*ptr) {
                Some(bytes) => format!("#{} ({:?})", idx, String::from_utf8_lossy(&bytes)),
                None => format!("#{}", idx),
            },
            Some(LiteralPoolEntry::Function(f)) => format!("#{} (function {})", idx, f),
            _ => format!("#{}", idx),
        }
    }
}

impl Default for Disassembler {
    fn default() -> Self {
        Disassembler::new()
    }
}

/// Either of the two opcode tables, carrying only what the disassembler
/// needs once decoding has already dispatched on the `CbcExtOpcode` prefix.
#[derive(Debug, Clone, Copy)]
enum DecodedOp {
    Plain(Opcode),
    Ext(ExtOpcode),
}

impl DecodedOp {
    fn name(self) -> &'static str {
        match self {
            DecodedOp::Plain(op) => op.name(),
            DecodedOp::Ext(op) => op.name(),
        }
    }

    fn flags(self) -> u8 {
        match self {
            DecodedOp::Plain(op) => op.flags(),
            DecodedOp::Ext(op) => op.flags(),
        }
    }

    fn stack_adjust(self) -> i8 {
        match self {
            DecodedOp::Plain(op) => op.stack_adjust(),
            DecodedOp::Ext(op) => op.stack_adjust(),
        }
    }
}

struct DecodedInstruction {
    start: usize,
    op: DecodedOp,
    byte_arg: Option<u8>,
    literal_index: Option<u16>,
    literal_index2: Option<u16>,
    branch_target: Option<usize>,
}

/// Read a literal index at `offset` under the function's chosen encoding,
/// returning the value and the number of bytes it occupied. Mirrors
/// `postprocess::encode_literal_index` in reverse.
fn read_literal_index(bytes: &[u8], offset: usize, full: bool) -> (u16, usize) {
    if full {
        let first = bytes[offset];
        if first & 0x80 != 0 {
            (((first & 0x7F) as u16) << 8 | bytes[offset + 1] as u16, 2)
        } else {
            (first as u16, 1)
        }
    } else {
        let first = bytes[offset];
        if first == 255 {
            (bytes[offset + 1] as u16, 2)
        } else {
            (first as u16, 1)
        }
    }
}

/// Recover a branch opcode's direction and width from its group-of-8 slot,
/// the inverse of `postprocess::narrow_branch_opcode`.
fn branch_slot(raw: u8) -> (bool, BranchWidth) {
    match raw % 8 {
        1 => (false, BranchWidth::One),
        2 => (false, BranchWidth::Two),
        3 => (false, BranchWidth::Three),
        5 => (true, BranchWidth::One),
        6 => (true, BranchWidth::Two),
        _ => (true, BranchWidth::Three),
    }
}

fn read_branch_magnitude(bytes: &[u8], offset: usize, width: BranchWidth) -> u32 {
    match width {
        BranchWidth::One => bytes[offset] as u32,
        BranchWidth::Two => (bytes[offset] as u32) << 8 | bytes[offset + 1] as u32,
        BranchWidth::Three => {
            (bytes[offset] as u32) << 16 | (bytes[offset + 1] as u32) << 8 | bytes[offset + 2] as u32
        }
    }
}

fn decode(code: &CompiledCode) -> Vec<DecodedInstruction> {
    let bytes = &code.byte_code;
    let full = code.literal_encoding() == LiteralEncoding::Full;
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let start = offset;
        let raw = bytes[offset];
        offset += 1;

        if raw == Opcode::CbcExtOpcode as u8 {
            let ext_raw = bytes[offset];
            offset += 1;
            let ext = ExtOpcode::from_u8(ext_raw).expect("disassemble: ext opcode out of range");
            let inst = decode_operands(DecodedOp::Ext(ext), bytes, start, &mut offset, full);
            out.push(inst);
            continue;
        }

        let opcode = Opcode::from_u8(raw).expect("disassemble: opcode out of range");
        let inst = decode_operands(DecodedOp::Plain(opcode), bytes, start, &mut offset, full);
        out.push(inst);
    }
    out
}

fn decode_operands(
    op: DecodedOp,
    bytes: &[u8],
    start: usize,
    offset: &mut usize,
    full: bool,
) -> DecodedInstruction {
    let flags = op.flags();
    let mut byte_arg = None;
    let mut literal_index = None;
    let mut literal_index2 = None;
    let mut branch_target = None;

    if flags & HAS_BYTE_ARG != 0 {
        byte_arg = Some(bytes[*offset]);
        *offset += 1;
    }
    if flags & HAS_LITERAL_ARG != 0 {
        let (value, consumed) = read_literal_index(bytes, *offset, full);
        literal_index = Some(value);
        *offset += consumed;
    }
    if flags & HAS_LITERAL_ARG2 != 0 {
        let (value, consumed) = read_literal_index(bytes, *offset, full);
        literal_index2 = Some(value);
        *offset += consumed;
    }
    if flags & HAS_BRANCH_ARG != 0 {
        let (is_backward, width) = branch_slot(bytes[start]);
        let magnitude = read_branch_magnitude(bytes, *offset, width) as i64;
        *offset += width.bytes() as usize;
        let target = if is_backward { start as i64 - magnitude } else { start as i64 + magnitude };
        branch_target = Some(target as usize);
    }

    DecodedInstruction { start, op, byte_arg, literal_index, literal_index2, branch_target }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::compiled_code::FunctionKind;
    use crate::bytecode::emitter::{Emitter, LiteralCategory, Operand, ProvisionalLiteral};
    use crate::bytecode::postprocess::{self, RawFunction};
    use crate::error::Span;

    fn const_lit(i: u16) -> ProvisionalLiteral {
        ProvisionalLiteral { category: LiteralCategory::ConstLiteral, local_index: i }
    }

    #[test]
    fn disassembles_push_literal_and_return() {
        let mut store = LiteralStore::new();
        let ptr = store.find_or_create_from_number(42.0, Span::default()).unwrap();

        let mut emitter = Emitter::new();
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
        let compiled = postprocess::finish(raw);

        let text = Disassembler::new().disassemble_function(&compiled, &store);
        assert!(text.contains("CbcPushLiteral"));
        assert!(text.contains("42"));
        assert!(text.contains("CbcReturn"));
    }

    #[test]
    fn labels_branch_targets() {
        let mut emitter = Emitter::new();
        let at = emitter.emit_branch_placeholder(Opcode::CbcBranchIfFalseForward);
        emitter.emit_barrier(Opcode::CbcPushUndefined, Operand::None);
        let target = emitter.stream().len();
        emitter.patch_branch_placeholder(at, target);
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
        let compiled = postprocess::finish(raw);
        let store = LiteralStore::new();

        let text = Disassembler::new().disassemble_function(&compiled, &store);
        assert!(text.contains("CbcBranchIfFalseForward"));
        assert!(text.contains('L'));
    }
}
