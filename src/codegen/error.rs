// This module defines the error types of the code generator using the thiserror
// crate. EmitError covers the data-level failures of the emission path: an
// instruction the encoder cannot express (e.g. an absolute address outside the
// disp32 range) and an output buffer too small for the bytes an operation needs.
// Either poisons the compilation pass, since the failed operation's events are
// already in the witness; the caller recovers by fixing the input and calling
// Compiler::reset before starting over.
// Contract violations — identifier exhaustion, duplicate base instruction pointers,
// a zero-length emission after an operation accepted — are not represented here;
// those indicate bugs in the compiler or an operation and abort the compilation
// pass via assertions.

//! Error types for code emission.

use thiserror::Error;

/// Failures while emitting an operation. Any of these poisons the current
/// compilation pass until the compiler is reset.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("instruction encoding failed: {0}")]
    Encoding(String),

    #[error("code buffer too small: need {need} bytes, have {have}")]
    BufferTooSmall { need: usize, have: usize },
}

impl From<iced_x86::IcedError> for EmitError {
    fn from(err: iced_x86::IcedError) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Result type alias for emission operations.
pub type EmitResult<T> = Result<T, EmitError>;
