//! End-to-end try/catch/finally scenarios: parse -> compile -> run.

use quill_core::compiler::{Compiler, NullResolver};
use quill_core::fileset::FileSet;
use quill_core::value::Value;
use quill_core::vm::Vm;

fn run(source: &str) -> Result<Value, quill_core::VmError> {
    let mut file_set = FileSet::new();
    let handle = file_set.add_file("test.ql", source);
    let file = quill_syntax::parse(source).expect("source parses");
    let resolver = NullResolver;
    let compiler = Compiler::new(&file_set, handle, "test.ql", &[], &resolver);
    let bytecode = compiler.compile_script(&file).expect("source compiles");
    Vm::new(&bytecode, Vec::new()).run()
}

#[test]
fn catch_binds_thrown_string() {
    let value = run(
        r#"
        try {
            throw "boom"
        } catch e {
            return e
        }
        "#,
    )
    .expect("catch clause handles the thrown value");
    // `str(e)` isn't available here (no stdlib builtins registered), so
    // the rendered form is checked directly against `RuntimeErrorData`'s
    // `Display`, which is what a future `str()` would delegate to.
    match value {
        Value::RuntimeError(e) => {
            let rendered = e.to_string();
            assert!(rendered.starts_with("error:"), "rendered form was {rendered:?}");
            assert!(rendered.contains("boom"), "rendered form was {rendered:?}");
        }
        other => panic!("expected a caught RuntimeError value, got {other:?}"),
    }
}

#[test]
fn catch_without_builtins_still_binds_error_value() {
    let value = run(
        r#"
        var caught = nil
        try {
            throw "boom"
        } catch e {
            caught = e
        }
        return caught
        "#,
    )
    .expect("catch clause handles the thrown value");
    match value {
        Value::RuntimeError(e) => assert_eq!(e.error.message, "boom"),
        other => panic!("expected a caught RuntimeError value, got {other:?}"),
    }
}

#[test]
fn finally_runs_before_return_and_mutates_visible_state() {
    let value = run(
        r#"
        var a = 1
        try {
            return a
        } finally {
            a = 2
        }
        "#,
    )
    .expect("script runs to completion");
    assert!(matches!(value, Value::Int(1)), "return captures the value before finally mutates it");
}

#[test]
fn finally_runs_once_per_continue_in_a_loop() {
    let value = run(
        r#"
        var x = 0
        for i = 0; i < 5; i += 1 {
            try {
                continue
            } finally {
                x = x + 1
            }
        }
        return x
        "#,
    )
    .expect("loop runs to completion");
    assert!(matches!(value, Value::Int(5)), "finally must run exactly once per loop iteration");
}

#[test]
fn division_by_zero_is_uncaught_without_a_handler() {
    let err = run("return 1 / 0").expect_err("division by zero must not silently succeed");
    match err {
        quill_core::VmError::User(Value::RuntimeError(e)) => {
            assert_eq!(e.error.name, "ZeroDivisionError");
            assert_eq!(e.trace.len(), 1, "the error must carry exactly one trace frame: the top-level script");
        }
        other => panic!("expected an uncaught ZeroDivisionError, got {other:?}"),
    }
}

#[test]
fn bare_try_with_no_catch_or_finally_does_not_swallow_the_error() {
    let err = run(
        r#"
        try {
            throw "boom"
        }
        return nil
        "#,
    )
    .expect_err("a try with neither catch nor finally must let the error propagate");
    assert!(matches!(err, quill_core::VmError::User(Value::RuntimeError(_))));
}

#[test]
fn catch_can_rethrow_and_finally_still_runs() {
    let value = run(
        r#"
        var ran_finally = false
        try {
            try {
                throw "inner"
            } catch e {
                throw e
            } finally {
                ran_finally = true
            }
        } catch outer {
            return [ran_finally, outer]
        }
        "#,
    )
    .expect("outer catch should observe the rethrown inner error");
    let Value::Array(elements) = value else {
        panic!("expected an array, got {value:?}");
    };
    let elements = elements.borrow();
    assert!(matches!(elements[0], Value::Bool(true)), "inner finally must run before the rethrow escapes it");
    match &elements[1] {
        Value::RuntimeError(e) => assert_eq!(e.error.message, "inner"),
        other => panic!("expected the rethrown RuntimeError, got {other:?}"),
    }
}
