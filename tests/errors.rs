//! Compile-time and runtime fault surfaces (spec scenarios 3, 7, 8 and
//! section 7's error taxonomy).

mod common;
use common::run;
use rulox::InterpretResult;

#[test]
fn undefined_global_assignment_is_a_runtime_error() {
    // Spec scenario 3: `a = 1;` with no prior `var a;` compiles fine (it's
    // just a `SET_GLOBAL`) but faults at runtime since assignment must not
    // create a binding.
    let (out, result) = run("a = 1;");
    assert_eq!(result, InterpretResult::RuntimeError);
    assert!(out.is_empty());
}

#[test]
fn undefined_global_read_is_a_runtime_error() {
    let (_out, result) = run("print doesNotExist;");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn self_referential_initializer_is_a_compile_error() {
    // Spec scenario 7.
    let (_out, result) = run("{ var x = x; }");
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    // Spec scenario 8.
    let (_out, result) = run(
        r#"
        fun f(a, b) { return a + b; }
        f(1);
        "#,
    );
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn calling_a_non_callable_value_is_a_runtime_error() {
    let (_out, result) = run(
        r#"
        var notAFunction = 1;
        notAFunction();
        "#,
    );
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn adding_a_number_to_a_string_is_a_runtime_error() {
    let (_out, result) = run(r#"print 1 + "one";"#);
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn comparing_non_numbers_is_a_runtime_error() {
    let (_out, result) = run(r#"print "a" < 1;"#);
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn return_at_top_level_is_a_compile_error() {
    let (_out, result) = run("return 1;");
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn duplicate_local_in_same_scope_is_a_compile_error() {
    let (_out, result) = run("{ var a = 1; var a = 2; }");
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn invalid_assignment_target_is_a_compile_error() {
    let (_out, result) = run("1 + 2 = 3;");
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn compile_error_produces_no_side_effects() {
    // Testable property: if compilation fails, nothing executed -- so a
    // `print` placed before the offending statement must not have run.
    let (out, result) = run(
        r#"
        print "should never print";
        1 + 2 = 3;
        "#,
    );
    assert_eq!(result, InterpretResult::CompileError);
    assert!(out.is_empty(), "no bytecode should have run, but stdout was {out:?}");
}

#[test]
fn compiler_recovers_after_first_error_and_reports_more() {
    // Panic-mode synchronization: a missing semicolon should not swallow a
    // completely separate later error in the same file. We only assert the
    // overall result here; `synchronize`'s statement-boundary recovery is
    // what keeps the second statement's own error reachable at all instead
    // of being masked as a single cascading failure.
    let (_out, result) = run(
        r#"
        var a = 1
        var b = ;
        "#,
    );
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn too_many_arguments_is_a_compile_error() {
    let mut args = String::new();
    for i in 0..256 {
        if i > 0 {
            args.push(',');
        }
        args.push('1');
    }
    let source = format!("fun f() {{}} f({args});");
    let (_out, result) = run(&source);
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn stack_overflow_from_unbounded_recursion_is_a_runtime_error() {
    let (_out, result) = run(
        r#"
        fun recurse() { return recurse(); }
        recurse();
        "#,
    );
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn unterminated_string_is_a_compile_error() {
    let (_out, result) = run(r#"print "unterminated;"#);
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn unknown_character_is_a_compile_error() {
    let (_out, result) = run("var a = 1 @ 2;");
    assert_eq!(result, InterpretResult::CompileError);
}

#[test]
fn try_run_returns_ok_for_a_well_behaved_program() {
    let mut out = Vec::new();
    let result = rulox::try_run("print 1 + 1;", &mut out);
    assert!(result.is_ok());
    assert_eq!(String::from_utf8(out).unwrap().trim(), "2");
}

#[test]
fn try_run_carries_the_formatted_diagnostic_on_a_runtime_error() {
    let mut out = Vec::new();
    let err = rulox::try_run("print doesNotExist;", &mut out).unwrap_err();
    assert_eq!(err.result, InterpretResult::RuntimeError);
    assert!(
        err.message.contains("Undefined variable"),
        "expected an undefined-variable diagnostic, got {:?}",
        err.message
    );
    // `InterpretError` composes with `?` like any other `std::error::Error`.
    fn as_boxed_error(e: rulox::InterpretError) -> Box<dyn std::error::Error> {
        Box::new(e)
    }
    let _: Box<dyn std::error::Error> = as_boxed_error(err);
}

#[test]
fn try_run_with_config_reports_a_compile_error() {
    let mut out = Vec::new();
    let err = rulox::try_run_with_config("{ var x = x; }", &mut out, rulox::VmConfig::default())
        .unwrap_err();
    assert_eq!(err.result, InterpretResult::CompileError);
    assert!(!err.message.is_empty());
}
