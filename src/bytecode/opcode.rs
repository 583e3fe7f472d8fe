//! The Compact Byte Code (CBC) opcode tables.
//!
//! Transcribed from `byte-code.h`'s `CBC_OPCODE_LIST` / `CBC_EXT_OPCODE_LIST`:
//! the two enums below are ordered exactly as the original preprocessor
//! expansion produces them, since opcode *value* is positional and the
//! branch-group-of-8 encoding (see [`BranchWidth`]) depends on opcodes
//! staying in that order. Where the original's `CBC_FOO_OPERATION` macros
//! expanded a single named operation into several related opcodes (plain,
//! `_LITERAL`, `_RIGHT_LITERAL`, `_IDENT`, ...), this file spells out each
//! resulting opcode as its own enum variant rather than trying to recreate
//! C-preprocessor-style macro composition in Rust.

/// No operand beyond the opcode byte itself.
pub const NO_FLAG: u8 = 0x00;
/// One-byte operand (call arity, array-append batch count, ...).
pub const HAS_BYTE_ARG: u8 = 0x01;
/// One literal-index operand.
pub const HAS_LITERAL_ARG: u8 = 0x02;
/// A second literal-index operand.
pub const HAS_LITERAL_ARG2: u8 = 0x04;
/// A branch offset operand (1-3 bytes, see [`BranchWidth`]).
pub const HAS_BRANCH_ARG: u8 = 0x08;
/// Shared bit: marks a branch as forward, or (on non-branch opcodes) marks
/// the byte argument as a pop count rather than a plain count.
pub const FORWARD_BRANCH_ARG: u8 = 0x10;
pub const POP_STACK_BYTE_ARG: u8 = 0x10;
pub const HAS_POP_STACK_BYTE_ARG: u8 = HAS_BYTE_ARG | POP_STACK_BYTE_ARG;

const BR: u8 = HAS_BRANCH_ARG;
const BRF: u8 = HAS_BRANCH_ARG | FORWARD_BRANCH_ARG;
const LIT: u8 = HAS_LITERAL_ARG;
const LIT2: u8 = HAS_LITERAL_ARG | HAS_LITERAL_ARG2;
const POPB: u8 = HAS_POP_STACK_BYTE_ARG;
const NO: u8 = NO_FLAG;

/// Context-stack cells a `with`/`for-in`/`try` context-creation opcode
/// reserves; these mirror the constants `js-parser-limits.h` names rather
/// than being independently chosen here.
const WITH_CONTEXT_STACK_ALLOCATION: i8 = 2;
const FOR_IN_CONTEXT_STACK_ALLOCATION: i8 = 2;
const TRY_CONTEXT_STACK_ALLOCATION: i8 = 3;

/// Stack-adjust bias: a signed adjustment in `-3..=4` is packed into the
/// opcode byte's upper three bits as `adjust + CBC_STACK_ADJUST_BASE`.
pub const STACK_ADJUST_BASE: i8 = 3;
pub const STACK_ADJUST_SHIFT: u8 = 5;

/// Recover the signed stack adjustment from a packed opcode byte.
pub fn stack_adjust_value(packed: u8) -> i8 {
    ((packed >> STACK_ADJUST_SHIFT) as i8) - STACK_ADJUST_BASE
}

/// Pack a stack adjustment into the upper three bits of an opcode byte.
pub fn pack_stack_adjust(adjust: i8) -> u8 {
    ((adjust + STACK_ADJUST_BASE) as u8) << STACK_ADJUST_SHIFT
}

macro_rules! define_opcode_table {
    ($enum_name:ident, $total_const:ident; $($name:ident : $flags:expr, $stack:expr;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $enum_name {
            $($name,)*
        }

        impl $enum_name {
            /// Argument-kind / pop-count flags, matching `cbc_flags`/`cbc_ext_flags`.
            pub fn flags(self) -> u8 {
                const TABLE: &[u8] = &[$($flags),*];
                TABLE[self as usize]
            }

            /// Net operand-stack height change this opcode causes.
            pub fn stack_adjust(self) -> i8 {
                const TABLE: &[i8] = &[$($stack),*];
                TABLE[self as usize]
            }

            /// Debug name, matching `cbc_names`/`cbc_ext_names`.
            pub fn name(self) -> &'static str {
                const TABLE: &[&str] = &[$(stringify!($name)),*];
                TABLE[self as usize]
            }

            pub fn from_u8(value: u8) -> Option<$enum_name> {
                if (value as usize) < $total_const {
                    // Safety: repr(u8) enum with no gaps, bounds-checked above.
                    Some(unsafe { std::mem::transmute::<u8, $enum_name>(value) })
                } else {
                    None
                }
            }

            pub fn has_byte_arg(self) -> bool {
                self.flags() & HAS_BYTE_ARG != 0
            }
            pub fn has_literal_arg(self) -> bool {
                self.flags() & HAS_LITERAL_ARG != 0
            }
            pub fn has_literal_arg2(self) -> bool {
                self.flags() & HAS_LITERAL_ARG2 != 0
            }
            pub fn has_branch_arg(self) -> bool {
                self.flags() & HAS_BRANCH_ARG != 0
            }
            pub fn is_forward_branch(self) -> bool {
                self.has_branch_arg() && (self.flags() & FORWARD_BRANCH_ARG != 0)
            }
        }

        pub const $total_const: usize = { const N: &[&str] = &[$(stringify!($name)),*]; N.len() };
    };
}

define_opcode_table! { Opcode, OPCODE_COUNT;
    // Branch opcodes first; some non-branch opcodes are interleaved,
    // matching the original layout exactly.
    CbcExtOpcode: NO, 0;
    CbcJumpForward: BRF, 0;
    CbcJumpForward2: BRF, 0;
    CbcJumpForward3: BRF, 0;
    CbcPop: NO, -1;
    CbcJumpBackward: BR, 0;
    CbcJumpBackward2: BR, 0;
    CbcJumpBackward3: BR, 0;
    CbcPopBlock: NO, -1;
    CbcBranchIfTrueForward: BRF, -1;
    CbcBranchIfTrueForward2: BRF, -1;
    CbcBranchIfTrueForward3: BRF, -1;
    CbcReturn: NO, -1;
    CbcBranchIfTrueBackward: BR, -1;
    CbcBranchIfTrueBackward2: BR, -1;
    CbcBranchIfTrueBackward3: BR, -1;
    CbcReturnWithUndefined: NO, 0;
    CbcBranchIfFalseForward: BRF, -1;
    CbcBranchIfFalseForward2: BRF, -1;
    CbcBranchIfFalseForward3: BRF, -1;
    CbcCreateObject: NO, 1;
    CbcBranchIfFalseBackward: BR, -1;
    CbcBranchIfFalseBackward2: BR, -1;
    CbcBranchIfFalseBackward3: BR, -1;
    CbcSetProperty: LIT, -1;
    CbcJumpForwardExitContext: BRF, 0;
    CbcJumpForwardExitContext2: BRF, 0;
    CbcJumpForwardExitContext3: BRF, 0;
    CbcCreateArray: NO, 1;
    CbcBranchIfLogicalTrue: BRF, -1;
    CbcBranchIfLogicalTrue2: BRF, -1;
    CbcBranchIfLogicalTrue3: BRF, -1;
    CbcArrayAppend: POPB, 0;
    CbcBranchIfLogicalFalse: BRF, -1;
    CbcBranchIfLogicalFalse2: BRF, -1;
    CbcBranchIfLogicalFalse3: BRF, -1;
    CbcPushElision: NO, 1;
    CbcBranchIfStrictEqual: BRF, -1;
    CbcBranchIfStrictEqual2: BRF, -1;
    CbcBranchIfStrictEqual3: BRF, -1;

    // Basic opcodes.
    CbcPushIdent: LIT, 1;
    CbcPushLiteral: LIT, 1;
    CbcPushTwoLiterals: LIT2, 2;
    CbcPushUndefined: NO, 1;
    CbcPushTrue: NO, 1;
    CbcPushFalse: NO, 1;
    CbcPushNull: NO, 1;
    CbcPushThis: NO, 1;
    CbcPropGet: NO, -1;
    CbcPropStringGet: LIT, 0;
    CbcNew: POPB, 0;
    CbcNewIdent: LIT | POPB, 1;
    CbcDefineVars: LIT, 0;
    CbcInitializeVar: LIT2, 0;
    CbcContextEnd: NO, 0;
    CbcThrow: NO, -1;

    // Unary opcodes: plain form, and a form that takes its operand as a literal.
    CbcPlus: NO, 0;
    CbcPlusLiteral: LIT, 1;
    CbcNegate: NO, 0;
    CbcNegateLiteral: LIT, 1;
    CbcLogicalNot: NO, 0;
    CbcLogicalNotLiteral: LIT, 1;
    CbcBitNot: NO, 0;
    CbcBitNotLiteral: LIT, 1;
    CbcVoid: NO, 0;
    CbcVoidLiteral: LIT, 1;
    CbcTypeof: NO, 0;
    CbcTypeofLiteral: LIT, 1;

    // Binary opcodes: plain (both operands on the stack), right-literal
    // (right operand folded into the opcode), two-literals (both folded).
    CbcBitOr: NO, -1;
    CbcBitOrRightLiteral: LIT, 0;
    CbcBitOrTwoLiterals: LIT2, 1;
    CbcBitXor: NO, -1;
    CbcBitXorRightLiteral: LIT, 0;
    CbcBitXorTwoLiterals: LIT2, 1;
    CbcBitAnd: NO, -1;
    CbcBitAndRightLiteral: LIT, 0;
    CbcBitAndTwoLiterals: LIT2, 1;
    CbcEqual: NO, -1;
    CbcEqualRightLiteral: LIT, 0;
    CbcEqualTwoLiterals: LIT2, 1;
    CbcNotEqual: NO, -1;
    CbcNotEqualRightLiteral: LIT, 0;
    CbcNotEqualTwoLiterals: LIT2, 1;
    CbcStrictEqual: NO, -1;
    CbcStrictEqualRightLiteral: LIT, 0;
    CbcStrictEqualTwoLiterals: LIT2, 1;
    CbcStrictNotEqual: NO, -1;
    CbcStrictNotEqualRightLiteral: LIT, 0;
    CbcStrictNotEqualTwoLiterals: LIT2, 1;
    CbcLess: NO, -1;
    CbcLessRightLiteral: LIT, 0;
    CbcLessTwoLiterals: LIT2, 1;
    CbcGreater: NO, -1;
    CbcGreaterRightLiteral: LIT, 0;
    CbcGreaterTwoLiterals: LIT2, 1;
    CbcLessEqual: NO, -1;
    CbcLessEqualRightLiteral: LIT, 0;
    CbcLessEqualTwoLiterals: LIT2, 1;
    CbcGreaterEqual: NO, -1;
    CbcGreaterEqualRightLiteral: LIT, 0;
    CbcGreaterEqualTwoLiterals: LIT2, 1;
    CbcIn: NO, -1;
    CbcInRightLiteral: LIT, 0;
    CbcInTwoLiterals: LIT2, 1;
    CbcInstanceof: NO, -1;
    CbcInstanceofRightLiteral: LIT, 0;
    CbcInstanceofTwoLiterals: LIT2, 1;
    CbcLeftShift: NO, -1;
    CbcLeftShiftRightLiteral: LIT, 0;
    CbcLeftShiftTwoLiterals: LIT2, 1;
    CbcRightShift: NO, -1;
    CbcRightShiftRightLiteral: LIT, 0;
    CbcRightShiftTwoLiterals: LIT2, 1;
    CbcUnsRightShift: NO, -1;
    CbcUnsRightShiftRightLiteral: LIT, 0;
    CbcUnsRightShiftTwoLiterals: LIT2, 1;
    CbcAdd: NO, -1;
    CbcAddRightLiteral: LIT, 0;
    CbcAddTwoLiterals: LIT2, 1;
    CbcSubtract: NO, -1;
    CbcSubtractRightLiteral: LIT, 0;
    CbcSubtractTwoLiterals: LIT2, 1;
    CbcMultiply: NO, -1;
    CbcMultiplyRightLiteral: LIT, 0;
    CbcMultiplyTwoLiterals: LIT2, 1;
    CbcDivide: NO, -1;
    CbcDivideRightLiteral: LIT, 0;
    CbcDivideTwoLiterals: LIT2, 1;
    CbcModulo: NO, -1;
    CbcModuloRightLiteral: LIT, 0;
    CbcModuloTwoLiterals: LIT2, 1;

    // Unary lvalue opcodes: plain, push-result, ident-targeted (x2), and
    // prop-string-targeted (x2).
    CbcDelete: NO, -2;
    CbcDeletePushResult: NO, -1;
    CbcDeleteIdent: LIT, 0;
    CbcDeleteIdentPushResult: LIT, 1;
    CbcDeletePropString: LIT, -1;
    CbcDeletePropStringPushResult: LIT, 0;
    CbcPreIncr: NO, -2;
    CbcPreIncrPushResult: NO, -1;
    CbcPreIncrIdent: LIT, 0;
    CbcPreIncrIdentPushResult: LIT, 1;
    CbcPreIncrPropString: LIT, -1;
    CbcPreIncrPropStringPushResult: LIT, 0;
    CbcPreDecr: NO, -2;
    CbcPreDecrPushResult: NO, -1;
    CbcPreDecrIdent: LIT, 0;
    CbcPreDecrIdentPushResult: LIT, 1;
    CbcPreDecrPropString: LIT, -1;
    CbcPreDecrPropStringPushResult: LIT, 0;
    CbcPostIncr: NO, -2;
    CbcPostIncrPushResult: NO, -1;
    CbcPostIncrIdent: LIT, 0;
    CbcPostIncrIdentPushResult: LIT, 1;
    CbcPostIncrPropString: LIT, -1;
    CbcPostIncrPropStringPushResult: LIT, 0;
    CbcPostDecr: NO, -2;
    CbcPostDecrPushResult: NO, -1;
    CbcPostDecrIdent: LIT, 0;
    CbcPostDecrIdentPushResult: LIT, 1;
    CbcPostDecrPropString: LIT, -1;
    CbcPostDecrPropStringPushResult: LIT, 0;

    // Call opcodes.
    CbcCall: POPB, -1;
    CbcCallPushResult: POPB, 0;
    CbcCallIdent: LIT | POPB, 0;
    CbcCallIdentPushResult: LIT | POPB, 1;
    CbcCallProp: POPB, -2;
    CbcCallPropPushResult: POPB, -1;
    CbcCallPropString: LIT | POPB, -1;
    CbcCallPropStringPushResult: LIT | POPB, 0;

    // Binary lvalue (assignment) opcodes: plain, ident-targeted,
    // ident+literal-targeted, and prop-string-targeted.
    CbcAssign: NO, -3;
    CbcAssignIdent: LIT, -1;
    CbcAssignIdentLiteral: LIT2, 0;
    CbcAssignPropString: LIT, -2;
    CbcAssignAdd: NO, -3;
    CbcAssignAddIdent: LIT, -1;
    CbcAssignAddIdentLiteral: LIT2, 0;
    CbcAssignAddPropString: LIT, -2;
    CbcAssignSubtract: NO, -3;
    CbcAssignSubtractIdent: LIT, -1;
    CbcAssignSubtractIdentLiteral: LIT2, 0;
    CbcAssignSubtractPropString: LIT, -2;
    CbcAssignMultiply: NO, -3;
    CbcAssignMultiplyIdent: LIT, -1;
    CbcAssignMultiplyIdentLiteral: LIT2, 0;
    CbcAssignMultiplyPropString: LIT, -2;
    CbcAssignDivide: NO, -3;
    CbcAssignDivideIdent: LIT, -1;
    CbcAssignDivideIdentLiteral: LIT2, 0;
    CbcAssignDividePropString: LIT, -2;
    CbcAssignModulo: NO, -3;
    CbcAssignModuloIdent: LIT, -1;
    CbcAssignModuloIdentLiteral: LIT2, 0;
    CbcAssignModuloPropString: LIT, -2;
    CbcAssignLeftShift: NO, -3;
    CbcAssignLeftShiftIdent: LIT, -1;
    CbcAssignLeftShiftIdentLiteral: LIT2, 0;
    CbcAssignLeftShiftPropString: LIT, -2;
    CbcAssignRightShift: NO, -3;
    CbcAssignRightShiftIdent: LIT, -1;
    CbcAssignRightShiftIdentLiteral: LIT2, 0;
    CbcAssignRightShiftPropString: LIT, -2;
    CbcAssignUnsRightShift: NO, -3;
    CbcAssignUnsRightShiftIdent: LIT, -1;
    CbcAssignUnsRightShiftIdentLiteral: LIT2, 0;
    CbcAssignUnsRightShiftPropString: LIT, -2;
    CbcAssignBitAnd: NO, -3;
    CbcAssignBitAndIdent: LIT, -1;
    CbcAssignBitAndIdentLiteral: LIT2, 0;
    CbcAssignBitAndPropString: LIT, -2;
    CbcAssignBitOr: NO, -3;
    CbcAssignBitOrIdent: LIT, -1;
    CbcAssignBitOrIdentLiteral: LIT2, 0;
    CbcAssignBitOrPropString: LIT, -2;
    CbcAssignBitXor: NO, -3;
    CbcAssignBitXorIdent: LIT, -1;
    CbcAssignBitXorIdentLiteral: LIT2, 0;
    CbcAssignBitXorPropString: LIT, -2;

    // Sentinel; not a real opcode.
    CbcEnd: NO, 0;
}

define_opcode_table! { ExtOpcode, EXT_OPCODE_COUNT;
    CbcExtNop: NO, 0;
    CbcExtWithCreateContext: BRF, -1 + WITH_CONTEXT_STACK_ALLOCATION;
    CbcExtWithCreateContext2: BRF, -1 + WITH_CONTEXT_STACK_ALLOCATION;
    CbcExtWithCreateContext3: BRF, -1 + WITH_CONTEXT_STACK_ALLOCATION;
    CbcExtForInGetNext: NO, 1;
    CbcExtForInCreateContext: BRF, -1 + FOR_IN_CONTEXT_STACK_ALLOCATION;
    CbcExtForInCreateContext2: BRF, -1 + FOR_IN_CONTEXT_STACK_ALLOCATION;
    CbcExtForInCreateContext3: BRF, -1 + FOR_IN_CONTEXT_STACK_ALLOCATION;
    CbcExtSetGetter: LIT, -1;
    CbcExtBranchIfForInHasNext: BR, 0;
    CbcExtBranchIfForInHasNext2: BR, 0;
    CbcExtBranchIfForInHasNext3: BR, 0;
    CbcExtSetSetter: LIT, -1;
    CbcExtTryCreateContext: BRF, TRY_CONTEXT_STACK_ALLOCATION;
    CbcExtTryCreateContext2: BRF, TRY_CONTEXT_STACK_ALLOCATION;
    CbcExtTryCreateContext3: BRF, TRY_CONTEXT_STACK_ALLOCATION;
    CbcExtPushUndefinedBase: NO, 1;
    CbcExtCatch: BRF, 1;
    CbcExtCatch2: BRF, 1;
    CbcExtCatch3: BRF, 1;
    CbcExtDebugger: NO, 0;
    CbcExtFinally: BRF, 0;
    CbcExtFinally2: BRF, 0;
    CbcExtFinally3: BRF, 0;

    CbcExtCallEval: POPB, 0;
    CbcExtCallEvalPushResult: POPB, 1;

    // Binary lvalue opcodes that always push their result.
    CbcExtAssignPushResult: NO, -2;
    CbcExtAssignIdentPushResult: LIT, 0;
    CbcExtAssignIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignPropStringPushResult: LIT, -1;
    CbcExtAssignAddPushResult: NO, -2;
    CbcExtAssignAddIdentPushResult: LIT, 0;
    CbcExtAssignAddIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignAddPropStringPushResult: LIT, -1;
    CbcExtAssignSubtractPushResult: NO, -2;
    CbcExtAssignSubtractIdentPushResult: LIT, 0;
    CbcExtAssignSubtractIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignSubtractPropStringPushResult: LIT, -1;
    CbcExtAssignMultiplyPushResult: NO, -2;
    CbcExtAssignMultiplyIdentPushResult: LIT, 0;
    CbcExtAssignMultiplyIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignMultiplyPropStringPushResult: LIT, -1;
    CbcExtAssignDividePushResult: NO, -2;
    CbcExtAssignDivideIdentPushResult: LIT, 0;
    CbcExtAssignDivideIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignDividePropStringPushResult: LIT, -1;
    CbcExtAssignModuloPushResult: NO, -2;
    CbcExtAssignModuloIdentPushResult: LIT, 0;
    CbcExtAssignModuloIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignModuloPropStringPushResult: LIT, -1;
    CbcExtAssignLeftShiftPushResult: NO, -2;
    CbcExtAssignLeftShiftIdentPushResult: LIT, 0;
    CbcExtAssignLeftShiftIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignLeftShiftPropStringPushResult: LIT, -1;
    CbcExtAssignRightShiftPushResult: NO, -2;
    CbcExtAssignRightShiftIdentPushResult: LIT, 0;
    CbcExtAssignRightShiftIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignRightShiftPropStringPushResult: LIT, -1;
    CbcExtAssignUnsRightShiftPushResult: NO, -2;
    CbcExtAssignUnsRightShiftIdentPushResult: LIT, 0;
    CbcExtAssignUnsRightShiftIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignUnsRightShiftPropStringPushResult: LIT, -1;
    CbcExtAssignBitAndPushResult: NO, -2;
    CbcExtAssignBitAndIdentPushResult: LIT, 0;
    CbcExtAssignBitAndIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignBitAndPropStringPushResult: LIT, -1;
    CbcExtAssignBitOrPushResult: NO, -2;
    CbcExtAssignBitOrIdentPushResult: LIT, 0;
    CbcExtAssignBitOrIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignBitOrPropStringPushResult: LIT, -1;
    CbcExtAssignBitXorPushResult: NO, -2;
    CbcExtAssignBitXorIdentPushResult: LIT, 0;
    CbcExtAssignBitXorIdentLiteralPushResult: LIT2, 1;
    CbcExtAssignBitXorPropStringPushResult: LIT, -1;

    // Same opcodes again, but keeping the previous value on the stack
    // (used when an assignment expression's result feeds a larger one).
    CbcExtAssignBlock: NO, -3;
    CbcExtAssignIdentBlock: LIT, -1;
    CbcExtAssignIdentLiteralBlock: LIT2, 0;
    CbcExtAssignPropStringBlock: LIT, -2;
    CbcExtAssignAddBlock: NO, -3;
    CbcExtAssignAddIdentBlock: LIT, -1;
    CbcExtAssignAddIdentLiteralBlock: LIT2, 0;
    CbcExtAssignAddPropStringBlock: LIT, -2;
    CbcExtAssignSubtractBlock: NO, -3;
    CbcExtAssignSubtractIdentBlock: LIT, -1;
    CbcExtAssignSubtractIdentLiteralBlock: LIT2, 0;
    CbcExtAssignSubtractPropStringBlock: LIT, -2;
    CbcExtAssignMultiplyBlock: NO, -3;
    CbcExtAssignMultiplyIdentBlock: LIT, -1;
    CbcExtAssignMultiplyIdentLiteralBlock: LIT2, 0;
    CbcExtAssignMultiplyPropStringBlock: LIT, -2;
    CbcExtAssignDivideBlock: NO, -3;
    CbcExtAssignDivideIdentBlock: LIT, -1;
    CbcExtAssignDivideIdentLiteralBlock: LIT2, 0;
    CbcExtAssignDividePropStringBlock: LIT, -2;
    CbcExtAssignModuloBlock: NO, -3;
    CbcExtAssignModuloIdentBlock: LIT, -1;
    CbcExtAssignModuloIdentLiteralBlock: LIT2, 0;
    CbcExtAssignModuloPropStringBlock: LIT, -2;
    CbcExtAssignLeftShiftBlock: NO, -3;
    CbcExtAssignLeftShiftIdentBlock: LIT, -1;
    CbcExtAssignLeftShiftIdentLiteralBlock: LIT2, 0;
    CbcExtAssignLeftShiftPropStringBlock: LIT, -2;
    CbcExtAssignRightShiftBlock: NO, -3;
    CbcExtAssignRightShiftIdentBlock: LIT, -1;
    CbcExtAssignRightShiftIdentLiteralBlock: LIT2, 0;
    CbcExtAssignRightShiftPropStringBlock: LIT, -2;
    CbcExtAssignUnsRightShiftBlock: NO, -3;
    CbcExtAssignUnsRightShiftIdentBlock: LIT, -1;
    CbcExtAssignUnsRightShiftIdentLiteralBlock: LIT2, 0;
    CbcExtAssignUnsRightShiftPropStringBlock: LIT, -2;
    CbcExtAssignBitAndBlock: NO, -3;
    CbcExtAssignBitAndIdentBlock: LIT, -1;
    CbcExtAssignBitAndIdentLiteralBlock: LIT2, 0;
    CbcExtAssignBitAndPropStringBlock: LIT, -2;
    CbcExtAssignBitOrBlock: NO, -3;
    CbcExtAssignBitOrIdentBlock: LIT, -1;
    CbcExtAssignBitOrIdentLiteralBlock: LIT2, 0;
    CbcExtAssignBitOrPropStringBlock: LIT, -2;
    CbcExtAssignBitXorBlock: NO, -3;
    CbcExtAssignBitXorIdentBlock: LIT, -1;
    CbcExtAssignBitXorIdentLiteralBlock: LIT2, 0;
    CbcExtAssignBitXorPropStringBlock: LIT, -2;

    CbcExtEnd: NO, 0;
}

/// Branch instructions come in groups of 8: `[unused, fwd1, fwd2, fwd3,
/// unused, back1, back2, back3]`. The low two bits of the group-relative
/// opcode give the offset width in bytes; bit 0x4 distinguishes forward
/// from backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchWidth {
    One,
    Two,
    Three,
}

impl BranchWidth {
    pub fn bytes(self) -> u8 {
        match self {
            BranchWidth::One => 1,
            BranchWidth::Two => 2,
            BranchWidth::Three => 3,
        }
    }

    pub fn from_bytes(n: u8) -> BranchWidth {
        match n {
            1 => BranchWidth::One,
            2 => BranchWidth::Two,
            _ => BranchWidth::Three,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_adjust_round_trips_within_range() {
        for adjust in -3..=4i8 {
            let packed = pack_stack_adjust(adjust);
            assert_eq!(stack_adjust_value(packed), adjust);
        }
    }

    #[test]
    fn opcode_from_u8_round_trips() {
        for raw in 0..OPCODE_COUNT as u8 {
            let op = Opcode::from_u8(raw).unwrap();
            assert_eq!(op as u8, raw);
        }
        assert!(Opcode::from_u8(OPCODE_COUNT as u8).is_none());
    }

    #[test]
    fn ext_opcode_from_u8_round_trips() {
        for raw in 0..EXT_OPCODE_COUNT as u8 {
            let op = ExtOpcode::from_u8(raw).unwrap();
            assert_eq!(op as u8, raw);
        }
    }

    #[test]
    fn branch_opcodes_are_grouped_in_eights() {
        assert!(Opcode::CbcJumpForward.has_branch_arg());
        assert!(Opcode::CbcJumpForward.is_forward_branch());
        assert!(Opcode::CbcJumpBackward.has_branch_arg());
        assert!(!Opcode::CbcJumpBackward.is_forward_branch());
    }

    #[test]
    fn call_opcode_plus_one_is_push_result_form() {
        assert_eq!(Opcode::CbcCall as u8 + 1, Opcode::CbcCallPushResult as u8);
        assert_eq!(Opcode::CbcCallIdent as u8 + 1, Opcode::CbcCallIdentPushResult as u8);
    }
}
