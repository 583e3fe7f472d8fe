//! Per-function scratch state the statement/expression parsers accumulate
//! into while compiling one function body, handed to
//! [`postprocess::finish`](crate::bytecode::postprocess::finish) once the
//! body is fully parsed.
//!
//! Grounded on spec.md section 4.5's five-group literal model: this is
//! where a name or constant first gets a *provisional* index, local to its
//! category, before the post-processor knows every category's final size.

use std::collections::HashMap;

use crate::bytecode::compiled_code::{FunctionKind, LiteralPoolEntry};
use crate::bytecode::emitter::{Emitter, LiteralCategory, ProvisionalLiteral, RegisterAllocator};
use crate::bytecode::postprocess::RawFunction;
use crate::error::{Error, ErrorKind, Result, Span};
use crate::literals::{CompressedPointer, LiteralStore};

pub struct FunctionContext {
    pub emitter: Emitter,
    pub registers: RegisterAllocator,
    pub kind: FunctionKind,
    pub argument_count: u16,
    pub strict: bool,
    idents: Vec<CompressedPointer>,
    ident_index: HashMap<CompressedPointer, u16>,
    const_literals: Vec<CompressedPointer>,
    const_index: HashMap<CompressedPointer, u16>,
    other_literals: Vec<LiteralPoolEntry>,
    pub status_flags: u16,
}

impl FunctionContext {
    pub fn new(kind: FunctionKind, argument_count: u16, strict: bool) -> Self {
        FunctionContext {
            emitter: Emitter::new(),
            registers: RegisterAllocator::new(),
            kind,
            argument_count,
            strict,
            idents: Vec::new(),
            ident_index: HashMap::new(),
            const_literals: Vec::new(),
            const_index: HashMap::new(),
            other_literals: Vec::new(),
            status_flags: 0,
        }
    }

    /// One of the function's own declared parameters, by declaration order.
    pub fn argument_literal(&self, index: u16) -> ProvisionalLiteral {
        ProvisionalLiteral { category: LiteralCategory::Argument, local_index: index }
    }

    /// A name reference (variable, property-get-by-string key, function
    /// name): deduplicated per function, since the same identifier is
    /// almost always mentioned more than once in a body.
    pub fn ident_literal(&mut self, ptr: CompressedPointer) -> ProvisionalLiteral {
        if let Some(&idx) = self.ident_index.get(&ptr) {
            return ProvisionalLiteral { category: LiteralCategory::Ident, local_index: idx };
        }
        let idx = self.idents.len() as u16;
        self.idents.push(ptr);
        self.ident_index.insert(ptr, idx);
        ProvisionalLiteral { category: LiteralCategory::Ident, local_index: idx }
    }

    /// A constant value (string or number literal), deduplicated the same
    /// way as idents but kept in its own group since the post-processor
    /// gives constants and identifiers separate index ranges.
    pub fn const_literal(&mut self, ptr: CompressedPointer) -> ProvisionalLiteral {
        if let Some(&idx) = self.const_index.get(&ptr) {
            return ProvisionalLiteral { category: LiteralCategory::ConstLiteral, local_index: idx };
        }
        let idx = self.const_literals.len() as u16;
        self.const_literals.push(ptr);
        self.const_index.insert(ptr, idx);
        ProvisionalLiteral { category: LiteralCategory::ConstLiteral, local_index: idx }
    }

    /// A nested function, referenced by its index in the enclosing parser's
    /// compiled-function table. Never deduplicated: two `function` literals
    /// with identical source text are still distinct closures.
    pub fn nested_function_literal(&mut self, entry: LiteralPoolEntry) -> ProvisionalLiteral {
        let idx = self.other_literals.len() as u16;
        self.other_literals.push(entry);
        ProvisionalLiteral { category: LiteralCategory::Other, local_index: idx }
    }

    /// Allocate a scratch register for an expression-evaluation temporary
    /// (e.g. holding a computed member base so a compound assignment
    /// doesn't re-evaluate it). Not used for variable bindings — those
    /// always go through [`FunctionContext::ident_literal`], resolved by
    /// the VM's own scope chain.
    pub fn allocate_register(&mut self, span: Span) -> Result<ProvisionalLiteral> {
        let reg = self.registers.allocate(span)?;
        Ok(ProvisionalLiteral { category: LiteralCategory::Register, local_index: reg })
    }

    /// Intern a string and return its const-literal operand in one step —
    /// the common case for a push-literal of a string constant.
    pub fn const_string(&mut self, store: &mut LiteralStore, bytes: &[u8], span: Span) -> Result<ProvisionalLiteral> {
        let ptr = store.find_or_create_from_utf8(bytes, span)?;
        Ok(self.const_literal(ptr))
    }

    pub fn const_number(&mut self, store: &mut LiteralStore, value: f64, span: Span) -> Result<ProvisionalLiteral> {
        let ptr = store.find_or_create_from_number(value, span)?;
        Ok(self.const_literal(ptr))
    }

    pub fn ident_name(&mut self, store: &mut LiteralStore, bytes: &[u8], span: Span) -> Result<ProvisionalLiteral> {
        let ptr = store.find_or_create_from_utf8(bytes, span)?;
        Ok(self.ident_literal(ptr))
    }

    pub fn finish(self, source_range: (u32, u32)) -> RawFunction {
        RawFunction {
            kind: self.kind,
            register_count: self.registers.high_water_mark(),
            argument_count: self.argument_count,
            idents: self.idents,
            const_literals: self.const_literals,
            other_literals: self.other_literals,
            source_range,
            status_flags: self.status_flags,
            emitter: self.emitter,
        }
    }
}

/// Raised when a binding target (assignment left-hand side, `for-in`
/// target, increment/decrement operand) isn't a valid reference —
/// spec.md's strict-mode `eval`/`arguments` checks live one level up,
/// in the statement/expression parser, since they need the actual name.
pub fn invalid_assignment_target(span: Span) -> Error {
    Error::parse(ErrorKind::PrimaryExprExpected, span)
}
