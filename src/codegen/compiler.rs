// This module implements the orchestrating compiler. For each thread's operation
// sequence it establishes static program order, drives the backend to produce
// machine code and architecture orderings, and records the instruction-pointer
// range every operation occupies. That reverse index is what makes the compile-now/
// observe-later split work: when the compiled program runs on real hardware and a
// load traps with the identifier it observed, ip_to_op routes the report back to
// the operation that generated the instruction, which resolves it into dynamic
// read-from or coherence edges. Compilation is single-threaded and sequential; the
// allocator, backend and witness are owned by exactly one Compiler instance so the
// global identifier namespace has a single authority.

//! The orchestrating compiler.

use std::collections::BTreeMap;

use crate::codegen::assembler::AssemblerState;
use crate::codegen::backend::Backend;
use crate::codegen::error::EmitResult;
use crate::codegen::operation::{OperationPtr, Threads};
use crate::memmodel::ExecWitness;
use crate::types::{Addr, InstPtr, Pid, WriteId};

/// Compiles per-thread operation sequences into one code image while building
/// the static portion of the execution witness, and stays queryable afterwards
/// for the dynamic (runtime-feedback) portion.
pub struct Compiler<B: Backend> {
    asms: AssemblerState,
    backend: B,
    ew: ExecWitness,
    threads: Option<Threads>,
    // Base IP of each emitted operation to (end IP, operation). Each modeled
    // processor executes unique code, so base IPs are globally unique.
    ip_to_op: BTreeMap<InstPtr, (InstPtr, OperationPtr)>,
    // Set when a backend emission fails. The witness already holds events for
    // the failed operation at that point, so the pass cannot continue and must
    // be reset.
    poisoned: bool,
}

impl<B: Backend> Compiler<B> {
    pub fn new(backend: B, threads: Option<Threads>) -> Self {
        let mut compiler = Self {
            asms: AssemblerState::new(),
            backend,
            ew: ExecWitness::new(),
            threads: None,
            ip_to_op: BTreeMap::new(),
            poisoned: false,
        };
        compiler.reset(threads);
        compiler
    }

    /// Reset every operation in `threads`, the allocator, the backend, the
    /// witness and the address index. Must run before reusing the compiler
    /// for a new compilation pass.
    pub fn reset(&mut self, threads: Option<Threads>) {
        self.threads = threads;

        if let Some(threads) = &self.threads {
            for ops in threads.values() {
                for op in ops {
                    op.borrow_mut().reset();
                }
            }
        }

        self.asms.reset();
        self.backend.reset();
        self.ew.clear();
        self.ip_to_op.clear();
        self.poisoned = false;
    }

    pub fn threads(&self) -> Option<&Threads> {
        self.threads.as_ref()
    }

    pub fn asms(&self) -> &AssemblerState {
        &self.asms
    }

    /// The execution witness built so far.
    pub fn witness(&self) -> &ExecWitness {
        &self.ew
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Emit a single operation at `base`.
    ///
    /// `last_op` threads program order across calls: it is read as the
    /// predecessor and updated to `op` once emission proceeds. A refusal from
    /// `enable_emit` skips the operation and returns zero bytes.
    ///
    /// An `Err` poisons the pass: the operation's events were already minted
    /// into the witness when the backend failed, so the only way forward is
    /// `reset()`. Emitting on a poisoned compiler is a contract violation.
    pub fn emit(
        &mut self,
        base: InstPtr,
        op: &OperationPtr,
        code: &mut [u8],
        last_op: &mut Option<OperationPtr>,
    ) -> EmitResult<usize> {
        assert!(
            !self.poisoned,
            "a previous emission failed; reset() before emitting again"
        );

        let mut op_mut = op.borrow_mut();

        if !op_mut.enable_emit(&mut self.asms) {
            return Ok(0);
        }

        // Generate program order against the previous operation.
        match last_op {
            Some(prev) => {
                let prev_ref = prev.borrow();
                op_mut.insert_po(Some(&*prev_ref), &mut self.asms, &mut self.ew);
            }
            None => op_mut.insert_po(None, &mut self.asms, &mut self.ew),
        }
        *last_op = Some(op.clone());

        // Generate code and architecture-specific ordering relations.
        let op_len = match self.backend.emit(base, &mut *op_mut, &mut self.asms, code) {
            Ok(len) => len,
            Err(err) => {
                self.poisoned = true;
                return Err(err);
            }
        };
        assert!(
            op_len != 0,
            "operation accepted emission but produced no code"
        );

        drop(op_mut);

        // Base IP must be unique.
        let previous = self
            .ip_to_op
            .insert(base, (base + op_len as InstPtr, op.clone()));
        assert!(previous.is_none(), "base IP {base:#x} already registered");

        Ok(op_len)
    }

    /// Emit one thread's whole operation sequence starting at `base`,
    /// preserving program order across the thread. Returns total bytes.
    ///
    /// The output buffer is re-sliced per step, so the cumulative length is
    /// bounded as well as each individual operation's.
    pub fn emit_thread(&mut self, pid: Pid, base: InstPtr, code: &mut [u8]) -> EmitResult<usize> {
        let ops = {
            let threads = self.threads.as_ref().expect("no threads to compile");
            match threads.get(&pid) {
                Some(ops) => ops.clone(),
                None => return Ok(0),
            }
        };

        self.backend.begin_thread();

        let mut emit_len = 0;
        let mut last_op = None;

        for op in &ops {
            let op_len = self.emit(
                base + emit_len as InstPtr,
                op,
                &mut code[emit_len..],
                &mut last_op,
            )?;
            emit_len += op_len;
        }

        Ok(emit_len)
    }

    /// Route a runtime observation to the operation owning `ip`.
    ///
    /// Returns `false` when no emitted operation covers `ip`; this is legal
    /// before any code has been emitted and lets the host distinguish "not our
    /// instruction" from a hard error.
    pub fn insert_from(&mut self, ip: InstPtr, addr: Addr, from_id: &[WriteId]) -> bool {
        let Some(op) = self.ip_to_op(ip) else {
            return false;
        };

        let consumed = op
            .borrow_mut()
            .insert_from(ip, addr, from_id, &mut self.asms, &mut self.ew);
        consumed
    }

    /// Find the operation whose emitted range `[base, end)` covers `ip`.
    pub fn ip_to_op(&self, ip: InstPtr) -> Option<OperationPtr> {
        let (base, (end, op)) = self.ip_to_op.range(..=ip).next_back()?;
        if !(*base <= ip && ip < *end) {
            return None;
        }
        Some(op.clone())
    }
}
