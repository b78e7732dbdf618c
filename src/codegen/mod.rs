// This module is the hub of the code-generation core: the identifier/event
// allocator that makes emitted code self-describing, the Operation contract and its
// concrete x86-64 implementations, the backend seam binding emission to one
// architecture, and the compiler that orchestrates per-thread emission and routes
// runtime feedback back to the operations that generated the code.

//! Code generation for litmus tests.
//!
//! # Key components
//!
//! - [`AssemblerState`]: mints globally unique write/read identifiers and
//!   resolves observed write ids back to their producing events.
//! - [`Operation`]: the per-thread unit of work, with the emission and
//!   runtime-feedback lifecycle.
//! - [`Backend`] / [`BackendX64`]: architecture binding (x86-64 under TSO).
//! - [`Compiler`]: per-thread emission, program order, and the
//!   instruction-pointer-to-operation index.
//! - [`ops`]: concrete stores, loads, fences and delays.

pub mod assembler;
pub mod backend;
pub mod compiler;
pub mod error;
pub mod operation;
pub mod ops;

pub use assembler::AssemblerState;
pub use backend::{Backend, BackendX64};
pub use compiler::Compiler;
pub use error::{EmitError, EmitResult};
pub use operation::{count_operations, extract_threads, Operation, OperationPtr, Threads};
