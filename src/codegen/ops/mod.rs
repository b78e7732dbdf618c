// Architecture-specific operation sets. Only the x86-64 path is implemented; the
// generic Operation contract lives one level up so new targets can add their own
// module here without touching the compiler.

//! Concrete operation implementations.

pub mod x86_64;

pub use x86_64::{Delay, Fence, Load, Store};
