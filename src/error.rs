//! Interpreter result and error types.
//!
//! A tiny `Copy` discriminant carries the outcome through the hot path,
//! while a richer owned value carries the formatted diagnostic at the
//! boundary, so the cheap type stays cheap while still composing with
//! `std::error::Error`.

use std::fmt;

/// Outcome of [`crate::vm::Vm::interpret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretResult {
    /// Conventional process exit code for this result.
    pub fn exit_code(self) -> i32 {
        match self {
            InterpretResult::Ok => 0,
            InterpretResult::CompileError => 65,
            InterpretResult::RuntimeError => 70,
        }
    }
}

/// A fully-formatted interpreter error, for callers that want the message
/// rather than just the `InterpretResult` discriminant.
#[derive(Debug, Clone)]
pub struct InterpretError {
    pub result: InterpretResult,
    pub message: String,
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InterpretError {}
