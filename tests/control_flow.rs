//! `if`/`while`/`for`, short-circuit `and`/`or`, and scoping rules.

mod common;
use common::{assert_lines, run_ok};

#[test]
fn if_else_picks_the_right_branch() {
    let out = run_ok(
        r#"
        if (1 < 2) { print "yes"; } else { print "no"; }
        if (1 > 2) { print "yes"; } else { print "no"; }
        "#,
    );
    assert_lines(&out, &["yes", "no"]);
}

#[test]
fn if_with_no_else_falls_through() {
    let out = run_ok(r#"if (false) { print "unreachable"; } print "after";"#);
    assert_lines(&out, &["after"]);
}

#[test]
fn while_loop_counts_up() {
    let out = run_ok(
        r#"
        var i = 0;
        while (i < 3) { print i; i = i + 1; }
        "#,
    );
    assert_lines(&out, &["0", "1", "2"]);
}

#[test]
fn for_loop_desugaring_sums_one_through_five() {
    let out = run_ok(
        r#"
        var s = 0;
        for (var i = 1; i <= 5; i = i + 1) s = s + i;
        print s;
        "#,
    );
    assert_lines(&out, &["15"]);
}

#[test]
fn for_loop_with_omitted_initializer_and_increment() {
    // All three clauses of a `for` are optional; the condition alone must
    // still terminate the loop.
    let out = run_ok(
        r#"
        var i = 0;
        for (; i < 3;) {
            print i;
            i = i + 1;
        }
        "#,
    );
    assert_lines(&out, &["0", "1", "2"]);
}

#[test]
fn nested_for_loops_share_no_state() {
    let out = run_ok(
        r#"
        for (var i = 0; i < 2; i = i + 1) {
            for (var j = 0; j < 2; j = j + 1) {
                print i * 10 + j;
            }
        }
        "#,
    );
    assert_lines(&out, &["0", "1", "10", "11"]);
}

#[test]
fn scope_law_shadowing_a_global_does_not_mutate_it() {
    let out = run_ok(
        r#"
        var a = "global";
        {
            var a = "local";
            print a;
        }
        print a;
        "#,
    );
    assert_lines(&out, &["local", "global"]);
}

#[test]
fn local_invisible_after_its_block() {
    // `b` only exists inside the block; referencing it afterward as a
    // global must fail at runtime with an undefined-variable error, proving
    // the block's `POP`s actually removed it rather than leaking it as a
    // global.
    let (_out, result) = common::run(
        r#"
        { var b = 1; }
        print b;
        "#,
    );
    assert_eq!(result, rulox::InterpretResult::RuntimeError);
}

#[test]
fn and_short_circuits_without_evaluating_right_side() {
    let out = run_ok(
        r#"
        fun sideEffect() { print "called"; return true; }
        print false and sideEffect();
        "#,
    );
    assert_lines(&out, &["false"]);
}

#[test]
fn or_short_circuits_without_evaluating_right_side() {
    let out = run_ok(
        r#"
        fun sideEffect() { print "called"; return true; }
        print true or sideEffect();
        "#,
    );
    assert_lines(&out, &["true"]);
}

#[test]
fn and_or_evaluate_right_side_when_needed() {
    let out = run_ok(
        r#"
        print true and "right and";
        print false or "right or";
        "#,
    );
    assert_lines(&out, &["right and", "right or"]);
}
