//! Compact Byte Code (CBC): a variable-width stack-machine instruction
//! encoding produced by a single-pass parse (spec.md section 3 and 4).
//!
//! # Pipeline
//!
//! - [`emitter`]: the last-emit cache and register allocator the parser
//!   drives while it still operates on provisional literal indices.
//! - [`postprocess`]: the four-phase pass that turns a parsed function's
//!   scratch state into a finished [`compiled_code::CompiledCode`] — literal
//!   index assignment, dead-branch elision, branch-width relaxation, and the
//!   final copy.
//! - [`page`]: the page-chunked scratch buffer the emitter appends into.
//! - [`opcode`]: the `Opcode`/`ExtOpcode` tables themselves.
//! - [`disassembler`]: `--debug-bytecode` support, not on any hot path.

pub mod compiled_code;
pub mod disassembler;
pub mod emitter;
pub mod opcode;
pub mod page;
pub mod postprocess;

pub use compiled_code::{CompiledCode, FunctionKind, LiteralEncoding, LiteralGroups, LiteralPoolEntry};
pub use disassembler::{Disassembler, DisassemblyOptions};
pub use emitter::{Emitter, LiteralCategory, Operand, ProvisionalLiteral, RegisterAllocator};
pub use opcode::{BranchWidth, ExtOpcode, Opcode};
pub use postprocess::RawFunction;
