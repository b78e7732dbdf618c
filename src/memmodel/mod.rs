// This module serves as the hub for the execution-witness data model consumed by an
// external axiomatic memory-consistency checker. It exports the event vocabulary
// (Event, Iiid, EventKind), the witness containers (EventSet, EventRel, ExecWitness)
// and the architecture ordering models (Architecture trait, ArchTso). The code
// generator only ever writes into these structures; all relation algebra lives in
// the downstream checker.

//! Execution-witness data model.
//!
//! # Key components
//!
//! - [`Event`] / [`Iiid`]: formal memory events with instruction-instance identity.
//! - [`ExecWitness`]: events plus program-order, read-from and coherence-order
//!   relations, populated incrementally during and after code emission.
//! - [`ArchTso`]: the x86-64 Total Store Order ordering model the backend feeds.

pub mod arch;
pub mod event;
pub mod witness;

pub use arch::{ArchTso, Architecture};
pub use event::{Event, EventKind, Iiid};
pub use witness::{EventRel, EventSet, ExecWitness};
