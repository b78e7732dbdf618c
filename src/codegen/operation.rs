// This module defines the Operation trait — the polymorphic unit of per-thread work
// the compiler emits — together with the shared-handle and thread-grouping types
// built on it. An operation knows how to prepare itself for emission, wire itself
// into program order, emit architecture-specific bytes, and, once the compiled
// program has run, turn a reported observed value into dynamic ordering edges.
// Operations carry emit-time state (the events they produced), so two logical
// program positions must never alias one instance; extract_threads enforces that by
// cloning any handle it has already seen in the pass. Handles are Rc<RefCell<..>>
// because the compiler's instruction-pointer index keeps referring to emitted
// operations for runtime feedback long after the emission loop ended.

//! The operation abstraction and thread grouping helpers.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};

use crate::codegen::assembler::AssemblerState;
use crate::codegen::error::EmitResult;
use crate::memmodel::{ArchTso, Event, ExecWitness};
use crate::types::{Addr, InstPtr, Pid, WriteId};

/// Shared handle to an operation.
pub type OperationPtr = Rc<RefCell<dyn Operation>>;

/// Per-thread grouping of an operation sequence.
pub type Threads = HashMap<Pid, Vec<OperationPtr>>;

/// One static instruction-level memory operation.
///
/// Lifecycle per instance: fresh after construction or [`reset`](Self::reset),
/// enabled after [`enable_emit`](Self::enable_emit) accepted, emitted after
/// [`emit_x86_64`](Self::emit_x86_64). A clone starts fresh regardless of the
/// source's state.
pub trait Operation {
    /// Thread this operation belongs to.
    fn pid(&self) -> Pid;

    fn set_pid(&mut self, pid: Pid);

    /// Produce an independent copy suitable for a different program position.
    fn clone_op(&self) -> OperationPtr;

    /// Return to the state held immediately after construction, discarding
    /// events and addresses recorded by a previous emission.
    fn reset(&mut self);

    /// Prepare for emission. Returning `false` is a policy refusal, not an
    /// error: the compiler skips the operation without effect.
    fn enable_emit(&mut self, asms: &mut AssemblerState) -> bool;

    /// Create this operation's events and wire the first of them as
    /// program-order successor of `before`'s last event, if any.
    fn insert_po(
        &mut self,
        before: Option<&dyn Operation>,
        asms: &mut AssemblerState,
        ew: &mut ExecWitness,
    );

    /// Emit x86-64 machine code into `code` and register any
    /// architecture-specific ordering the instructions imply.
    ///
    /// The default emits nothing: not every logical operation needs a
    /// representation on every architecture.
    fn emit_x86_64(
        &mut self,
        _start: InstPtr,
        _asms: &mut AssemblerState,
        _arch: &mut ArchTso,
        _code: &mut [u8],
    ) -> EmitResult<usize> {
        Ok(0)
    }

    /// This operation's program-order-last event, or `None` if it owns no
    /// events. `next` is the first event of the following operation; event-less
    /// operations use it to splice ordering through themselves.
    fn last_event(&self, next: Option<&Event>) -> Option<Event>;

    /// Runtime-feedback entry point: the instruction at `ip` observed
    /// `from_id` at `addr`. Resolves the ids and inserts the resulting dynamic
    /// edges (read-from, coherence order). Returns whether the report was
    /// consumed.
    fn insert_from(
        &mut self,
        ip: InstPtr,
        addr: Addr,
        from_id: &[WriteId],
        asms: &mut AssemblerState,
        ew: &mut ExecWitness,
    ) -> bool;
}

/// Group a flat operation sequence by thread id.
///
/// A handle that already appeared earlier in the sequence is cloned before
/// being added again: two program positions must never share one mutable
/// operation instance.
pub fn extract_threads<I>(operations: I) -> Threads
where
    I: IntoIterator<Item = OperationPtr>,
{
    let mut seen: HashSet<usize> = HashSet::new();
    let mut threads = Threads::new();

    for op in operations {
        let op = if seen.insert(Rc::as_ptr(&op) as *const () as usize) {
            op
        } else {
            op.borrow().clone_op()
        };

        let pid = op.borrow().pid();
        threads.entry(pid).or_default().push(op);
    }

    threads
}

/// Total operation count across all threads.
pub fn count_operations(threads: &Threads) -> usize {
    threads.values().map(Vec::len).sum()
}
