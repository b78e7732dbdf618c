// This module defines the formal event vocabulary of the execution witness: Iiid
// (instruction-instance identifier, a thread id plus a sequence number) and Event
// (a read or write of one memory word). Events are small Copy values compared and
// hashed by value; the witness's event set and the allocator's write-id table both
// store them directly, so no reference into the witness can dangle across a clear.
// For write events the sequence number is the minted WriteId, for read events a
// read-sequence counter from a disjoint range, and for initial-value events the
// address itself, which keeps initial events per-location unique.

//! Events and instruction-instance identity.

use crate::types::{Addr, Pid, Poi};

/// Instruction-instance identifier: one dynamic event is named by the thread
/// that issued it and a program-wide sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Iiid {
    pub pid: Pid,
    pub poi: Poi,
}

impl Iiid {
    pub fn new(pid: Pid, poi: Poi) -> Self {
        Self { pid, poi }
    }
}

/// Direction of a memory event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Read,
    Write,
}

/// One formal memory event: a read or write of a single word at `addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventKind,
    pub addr: Addr,
    pub iiid: Iiid,
}

impl Event {
    pub fn new(kind: EventKind, addr: Addr, iiid: Iiid) -> Self {
        Self { kind, addr, iiid }
    }

    /// The event modelling the architecturally-defined initial value of `addr`.
    pub fn initial(addr: Addr) -> Self {
        Self::new(EventKind::Write, addr, Iiid::new(crate::types::INIT_PID, addr))
    }

    pub fn is_read(&self) -> bool {
        self.kind == EventKind::Read
    }

    pub fn is_write(&self) -> bool {
        self.kind == EventKind::Write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_events_are_per_address() {
        let a = Event::initial(0x10);
        let b = Event::initial(0x10);
        let c = Event::initial(0x18);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_write());
        assert_eq!(a.iiid.pid, crate::types::INIT_PID);
    }
}
