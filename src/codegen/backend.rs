// This module binds generic operation emission to one concrete architecture. The
// Backend trait is the strategy seam the compiler drives: a reset hook for ordering
// state accumulated by a previous pass, plus the single emission call. BackendX64
// is the only binding implemented: it owns the Total Store Order model and forwards
// to Operation::emit_x86_64, which both produces bytes and feeds the model the
// ordering its instructions imply.

//! Architecture backends.

use crate::codegen::assembler::AssemblerState;
use crate::codegen::error::EmitResult;
use crate::codegen::operation::Operation;
use crate::memmodel::{ArchTso, Architecture};
use crate::types::InstPtr;

/// Strategy binding operation emission to one architecture.
pub trait Backend {
    /// Clear architecture-model ordering state from a previous compilation.
    fn reset(&mut self);

    /// Called before each thread's operation sequence is emitted. Ordering
    /// state carried within a thread must not leak into the next one.
    fn begin_thread(&mut self);

    /// Emit `op` at `start` into `code`; returns the byte count.
    fn emit(
        &mut self,
        start: InstPtr,
        op: &mut dyn Operation,
        asms: &mut AssemblerState,
        code: &mut [u8],
    ) -> EmitResult<usize>;
}

/// x86-64 backend under Total Store Order.
#[derive(Debug, Default)]
pub struct BackendX64 {
    arch: ArchTso,
}

impl BackendX64 {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordering model fed during emission.
    pub fn arch(&self) -> &ArchTso {
        &self.arch
    }
}

impl Backend for BackendX64 {
    fn reset(&mut self) {
        self.arch.clear();
    }

    fn begin_thread(&mut self) {
        // A fence trailing the previous thread must not order into this one.
        self.arch.discard_pending();
    }

    fn emit(
        &mut self,
        start: InstPtr,
        op: &mut dyn Operation,
        asms: &mut AssemblerState,
        code: &mut [u8],
    ) -> EmitResult<usize> {
        op.emit_x86_64(start, asms, &mut self.arch, code)
    }
}
