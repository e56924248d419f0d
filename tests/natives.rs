//! The one built-in native function, `clock`.

mod common;
use common::run_ok;
use rulox::InterpretResult;

#[test]
fn clock_returns_a_number() {
    let out = run_ok("print clock() >= 0;");
    assert_eq!(out.trim(), "true");
}

#[test]
fn clock_rejects_arguments() {
    let (_out, result) = common::run("clock(1);");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn clock_can_be_stored_and_called_indirectly() {
    let out = run_ok(
        r#"
        var f = clock;
        print f() >= 0;
        "#,
    );
    assert_eq!(out.trim(), "true");
}
