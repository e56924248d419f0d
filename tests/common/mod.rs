//! Shared test harness: compile-and-run a program, capturing its `print`
//! output as a `String` instead of letting it hit the real stdout.

use rulox::{InterpretResult, VmConfig};

/// Run `source` to completion and return `(stdout, result)`.
pub fn run(source: &str) -> (String, InterpretResult) {
    let mut out = Vec::new();
    let result = rulox::run(source, &mut out);
    (String::from_utf8(out).expect("program output is valid UTF-8"), result)
}

/// Like [`run`], but forces a GC cycle at every allocation growth point so
/// any collector unsoundness shows up as a wrong answer or a panic instead
/// of hiding behind a heap that never got big enough to collect.
pub fn run_stress_gc(source: &str) -> (String, InterpretResult) {
    let mut out = Vec::new();
    let config = VmConfig {
        stress_gc: true,
        ..VmConfig::default()
    };
    let result = rulox::run_with_config(source, &mut out, config);
    (String::from_utf8(out).expect("program output is valid UTF-8"), result)
}

/// Run `source` and assert it completed with [`InterpretResult::Ok`],
/// returning its captured stdout.
#[track_caller]
pub fn run_ok(source: &str) -> String {
    let (out, result) = run(source);
    assert_eq!(result, InterpretResult::Ok, "program did not run to completion:\n{out}");
    out
}

#[track_caller]
pub fn run_ok_stress_gc(source: &str) -> String {
    let (out, result) = run_stress_gc(source);
    assert_eq!(result, InterpretResult::Ok, "program did not run to completion:\n{out}");
    out
}

#[track_caller]
pub fn assert_lines(out: &str, expected: &[&str]) {
    let got: Vec<&str> = out.lines().collect();
    assert_eq!(got, expected);
}
