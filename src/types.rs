// This module defines the fixed-width scalar types shared by the code generator and
// the execution-witness data model. The widths are architecture-facing constants:
// WriteId must fit in the byte range a store physically writes into one memory word,
// so that the value a load later observes can be mapped back to the producing write
// event; Addr and InstPtr are 64-bit because the only emission target is x86-64.
// INIT_PID is the thread-id sentinel for the architecturally-defined initial value
// of a location and is distinct from every real thread id.

//! Scalar types used throughout the crate.

/// Identifies one logical thread (process) of a litmus test.
pub type Pid = i32;

/// Thread-id sentinel for architecturally-initial values. Never a real thread.
pub const INIT_PID: Pid = -1;

/// A byte address in the target's data memory.
pub type Addr = u64;

/// An address in the emitted code image.
pub type InstPtr = u64;

/// Compact identifier a store physically writes into one memory word.
///
/// Deliberately narrow: the generated code stores this value literally, so the
/// identifier space is the byte range minus reserved headroom.
pub type WriteId = u8;

/// Program-order-index counter identifying one load for event-identity purposes.
/// Drawn from a numeric range disjoint from [`WriteId`].
pub type Poi = u64;
