//! A bytecode compiler and stack-based virtual machine for a small
//! dynamically-typed scripting language.
//!
//! The pipeline is source text -> [`scanner::Scanner`] -> [`compiler::compile`]
//! -> [`chunk::Chunk`] -> [`vm::Vm`]. Heap objects (strings, functions,
//! closures, natives) live in [`gc::Gc`]'s arenas and are collected by a
//! stop-the-world mark-sweep pass triggered from inside the VM.

pub mod chunk;
pub mod compiler;
#[cfg(any(debug_assertions, feature = "trace_execution", feature = "print_code"))]
pub mod debug;
#[cfg(not(any(debug_assertions, feature = "trace_execution", feature = "print_code")))]
mod debug {
    //! Disassembly is compiled out entirely in a release build with no
    //! debug features enabled, so it costs nothing in the hot path.
}
pub mod error;
pub mod gc;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

pub use error::{InterpretError, InterpretResult};
pub use vm::VmConfig;

/// Compile and run `source`, writing any `print` output to `out` and any
/// diagnostics to the process's stderr. Thin wrapper over [`vm::interpret`]
/// kept at the crate root so embedders don't need to know the module
/// layout.
pub fn run(source: &str, out: &mut dyn std::io::Write) -> InterpretResult {
    vm::interpret(source, out, &mut std::io::stderr())
}

/// Like [`run`], but with an explicit [`VmConfig`] (stack/frame caps,
/// `stress_gc`) instead of the defaults.
pub fn run_with_config(source: &str, out: &mut dyn std::io::Write, config: VmConfig) -> InterpretResult {
    vm::interpret_with_config(source, out, &mut std::io::stderr(), config)
}

/// Like [`run`], but captures diagnostics into an [`InterpretError`] instead
/// of writing them to stderr, for embedders that want the formatted message
/// so it composes with `?` rather than just the bare discriminant.
pub fn try_run(source: &str, out: &mut dyn std::io::Write) -> Result<(), InterpretError> {
    try_run_with_config(source, out, VmConfig::default())
}

/// Like [`try_run`], but with an explicit [`VmConfig`].
pub fn try_run_with_config(
    source: &str,
    out: &mut dyn std::io::Write,
    config: VmConfig,
) -> Result<(), InterpretError> {
    let mut err_buf = Vec::new();
    let result = vm::interpret_with_config(source, out, &mut err_buf, config);
    match result {
        InterpretResult::Ok => Ok(()),
        _ => Err(InterpretError {
            result,
            message: String::from_utf8_lossy(&err_buf).into_owned(),
        }),
    }
}
