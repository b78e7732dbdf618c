// This module defines the architecture-model side of the backend seam. The code
// generator treats an architecture model as an opaque ordering-rule object with a
// clear() reset hook; the only model implemented is x86-64 under Total Store
// Order. ArchTso collects the ordering a fence instruction implies: when a
// fence is emitted it latches the last event before it, and the first event emitted
// after it seals an mfence edge from that event. Consecutive fences collapse onto
// the latest latch, a fence at the head of a thread orders nothing, and a fence at
// the tail of a thread is discarded at the next thread boundary so it never orders
// into another thread. The mfence relation is handed to the external checker
// together with the witness.

//! Target architecture ordering models.

use crate::memmodel::{Event, EventRel};

/// Reset hook every architecture ordering model provides.
pub trait Architecture {
    /// Discard ordering state accumulated from a previous compilation.
    fn clear(&mut self);
}

/// x86-64 Total Store Order model state.
#[derive(Debug, Default)]
pub struct ArchTso {
    pending_fence: Option<Event>,
    mfence: EventRel,
}

impl ArchTso {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a fence is emitted: `before` is the last event in program
    /// order preceding the fence, if any.
    pub fn fence_before(&mut self, before: Option<Event>) {
        self.pending_fence = before;
    }

    /// Called for the first event of every emitted memory operation; completes
    /// a pending fence into an mfence ordering edge.
    pub fn apply_fence(&mut self, next: Event) {
        if let Some(before) = self.pending_fence.take() {
            self.mfence.insert(before, next);
        }
    }

    /// Called at a thread boundary: a fence still pending from the previous
    /// thread trails its thread and orders nothing.
    pub fn discard_pending(&mut self) {
        self.pending_fence = None;
    }

    /// Ordering edges implied by emitted mfence instructions.
    pub fn mfence(&self) -> &EventRel {
        &self.mfence
    }
}

impl Architecture for ArchTso {
    fn clear(&mut self) {
        self.pending_fence = None;
        self.mfence.clear();
    }
}
