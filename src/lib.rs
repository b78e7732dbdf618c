//! litmus-codegen — self-describing litmus-test compilation.
//!
//! This crate compiles abstract per-thread memory-operation programs (litmus
//! tests) into x86-64 machine code while simultaneously constructing the formal
//! execution witness — events plus program-order, read-from and coherence-order
//! relations — that an external axiomatic memory-consistency checker validates.
//! Every emitted store physically writes a compact one-byte identifier into
//! memory, so when the compiled program later runs on real hardware the value a
//! load observes can be traced back to the formal event that produced it,
//! without any other tracing mechanism.
//!
//! # Primary usage
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use litmus_codegen::codegen::{extract_threads, BackendX64, Compiler, OperationPtr};
//! use litmus_codegen::codegen::ops::{Load, Store};
//!
//! let ops: Vec<OperationPtr> = vec![
//!     Rc::new(RefCell::new(Store::new(0, 0x2000))),
//!     Rc::new(RefCell::new(Load::new(1, 0x2000))),
//! ];
//! let mut compiler = Compiler::new(BackendX64::new(), Some(extract_threads(ops)));
//!
//! let mut code0 = [0u8; 128];
//! let mut code1 = [0u8; 128];
//! compiler.emit_thread(0, 0x1000, &mut code0).unwrap();
//! compiler.emit_thread(1, 0x3000, &mut code1).unwrap();
//! // After the code has run, observed values flow back via insert_from and
//! // complete the witness with read-from edges.
//! ```
//!
//! # Architecture
//!
//! - [`codegen`] - allocator, operations, backend and the orchestrating compiler
//! - [`memmodel`] - execution-witness types consumed by the external checker
//! - [`types`] - fixed-width scalar types and sentinels

pub mod codegen;
pub mod memmodel;
pub mod types;

pub use codegen::{
    count_operations, extract_threads, AssemblerState, Backend, BackendX64, Compiler, EmitError,
    EmitResult, Operation, OperationPtr, Threads,
};
pub use memmodel::{ArchTso, Architecture, Event, EventKind, EventRel, EventSet, ExecWitness, Iiid};
pub use types::{Addr, InstPtr, Pid, Poi, WriteId, INIT_PID};
