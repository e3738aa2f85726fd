//! Parse -> compile -> run scenarios for calling-convention and object
//! interaction semantics that aren't covered by try/catch/finally.

use quill_core::compiler::{Compiler, NullResolver};
use quill_core::fileset::FileSet;
use quill_core::value::Value;
use quill_core::vm::Vm;
use quill_core::VmError;

fn run(source: &str) -> Result<Value, VmError> {
    let mut file_set = FileSet::new();
    let handle = file_set.add_file("test.ql", source);
    let file = quill_syntax::parse(source).expect("source parses");
    let resolver = NullResolver;
    let compiler = Compiler::new(&file_set, handle, "test.ql", &[], &resolver);
    let bytecode = compiler.compile_script(&file).expect("source compiles");
    Vm::new(&bytecode, Vec::new()).run()
}

fn compile(source: &str) -> Result<quill_core::Bytecode, quill_core::CompileError> {
    let mut file_set = FileSet::new();
    let handle = file_set.add_file("test.ql", source);
    let file = quill_syntax::parse(source).expect("source parses");
    let resolver = NullResolver;
    let compiler = Compiler::new(&file_set, handle, "test.ql", &[], &resolver);
    compiler.compile_script(&file)
}

#[test]
fn closure_upvalue_is_shared_and_mutated_across_calls() {
    let value = run(
        r#"
        var make_counter = func() {
            var x = 0
            return func() {
                x = x + 1
                return x
            }
        }
        var counter = make_counter()
        var first = counter()
        var second = counter()
        return [first, second]
        "#,
    )
    .expect("script runs to completion");
    let Value::Array(elements) = value else {
        panic!("expected an array, got {value:?}");
    };
    let elements = elements.borrow();
    assert!(matches!(elements[0], Value::Int(1)));
    assert!(matches!(elements[1], Value::Int(2)), "the second call must see the first call's mutation");
}

#[test]
fn two_counters_from_the_same_maker_have_independent_state() {
    let value = run(
        r#"
        var make_counter = func() {
            var x = 0
            return func() {
                x = x + 1
                return x
            }
        }
        var a = make_counter()
        var b = make_counter()
        a()
        a()
        return b()
        "#,
    )
    .expect("script runs to completion");
    assert!(matches!(value, Value::Int(1)), "each make_counter() call must capture its own x");
}

#[test]
fn self_recursive_tail_call_does_not_grow_the_frame_stack() {
    let value = run(
        r#"
        var sum = nil
        sum = func(n, acc) {
            if n == 0 {
                return acc
            }
            return sum(n - 1, acc + n)
        }
        return sum(100000, 0)
        "#,
    )
    .expect("a tail-recursive call must not overflow the frame stack");
    assert!(matches!(value, Value::Int(5000050000)), "sum(1..=100000) should be 5000050000, got {value:?}");
}

#[test]
fn non_tail_recursion_still_works_for_shallow_depths() {
    let value = run(
        r#"
        var fact = nil
        fact = func(n) {
            if n == 0 {
                return 1
            }
            return n * fact(n - 1)
        }
        return fact(10)
        "#,
    )
    .expect("non-tail recursion at a shallow depth must still succeed");
    assert!(matches!(value, Value::Int(3628800)));
}

#[test]
fn unexpected_named_argument_is_rejected() {
    let err = run(
        r#"
        var f = func(x; y = 1) {
            return x
        }
        return f(1, z: 2)
        "#,
    )
    .expect_err("a named argument the function never declared must be rejected");
    match err {
        VmError::User(Value::RuntimeError(e)) => {
            assert_eq!(e.error.name, "UnexpectedNamedArgError");
            assert!(e.error.message.contains('z'), "message should reference the rejected key, got {:?}", e.error.message);
        }
        other => panic!("expected an uncaught UnexpectedNamedArgError, got {other:?}"),
    }
}

#[test]
fn missing_required_positional_argument_is_rejected() {
    let err = run(
        r#"
        var f = func(x, y) {
            return x + y
        }
        return f(1)
        "#,
    )
    .expect_err("omitting a required positional argument must be rejected");
    match err {
        VmError::User(Value::RuntimeError(e)) => {
            assert_eq!(e.error.name, "WrongNumberOfArgumentsError");
        }
        other => panic!("expected an uncaught WrongNumberOfArgumentsError, got {other:?}"),
    }
}

#[test]
fn a_default_parameter_may_still_be_omitted() {
    let value = run(
        r#"
        var f = func(x, y = 2) {
            return x + y
        }
        return f(1)
        "#,
    )
    .expect("a parameter with a default must not count as required");
    assert!(matches!(value, Value::Int(3)));
}

#[test]
fn redeclaring_a_name_in_the_same_block_is_a_compile_error() {
    let err = compile(
        r#"
        var x = 1
        var x = 2
        return x
        "#,
    )
    .expect_err("redeclaring a name already bound in the same block must fail to compile");
    assert!(err.message.contains('x'), "message should reference the redeclared name, got {:?}", err.message);
}

#[test]
fn redeclaring_a_name_in_a_nested_block_shadows_instead_of_erroring() {
    let value = run(
        r#"
        var x = 1
        if true {
            var x = 2
            x = x + 1
        }
        return x
        "#,
    )
    .expect("a nested block may shadow an outer name with its own local");
    assert!(matches!(value, Value::Int(1)));
}

#[test]
fn declared_named_argument_overrides_its_default() {
    let value = run(
        r#"
        var f = func(x; y = 1) {
            return x + y
        }
        return f(10, y: 5)
        "#,
    )
    .expect("a declared named argument must bind normally");
    assert!(matches!(value, Value::Int(15)));
}

#[test]
fn compound_index_assignment_reads_then_writes_the_same_slot() {
    let value = run(
        r#"
        var arr = [1, 2, 3]
        arr[1] += 10
        return arr
        "#,
    )
    .expect("script runs to completion");
    let Value::Array(elements) = value else {
        panic!("expected an array, got {value:?}");
    };
    let elements = elements.borrow();
    assert!(matches!(elements[0], Value::Int(1)));
    assert!(matches!(elements[1], Value::Int(12)));
    assert!(matches!(elements[2], Value::Int(3)));
}

#[test]
fn nullish_selector_short_circuits_on_nil_target() {
    let value = run(
        r#"
        var d = nil
        return d?.missing
        "#,
    )
    .expect("a nullish selector on nil must not raise");
    assert!(matches!(value, Value::Nil));
}

#[test]
fn nullish_selector_reads_through_a_present_target() {
    let value = run(
        r#"
        var d = {"name": "quill"}
        return d?.name
        "#,
    )
    .expect("script runs to completion");
    match value {
        Value::String(s) => assert_eq!(&*s, "quill"),
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn for_in_over_an_array_sums_its_elements() {
    let value = run(
        r#"
        var total = 0
        for v in [1, 2, 3, 4] {
            total += v
        }
        return total
        "#,
    )
    .expect("script runs to completion");
    assert!(matches!(value, Value::Int(10)));
}

#[test]
fn for_in_with_key_and_value_counts_indices() {
    let value = run(
        r#"
        var last_key = nil
        for k, v in [10, 20, 30] {
            last_key = k
        }
        return last_key
        "#,
    )
    .expect("script runs to completion");
    assert!(matches!(value, Value::Int(2)), "the last index into a 3-element array is 2, got {value:?}");
}

#[test]
fn break_exits_a_for_in_loop_early() {
    let value = run(
        r#"
        var seen = 0
        for v in [1, 2, 3, 4, 5] {
            if v == 3 {
                break
            }
            seen += 1
        }
        return seen
        "#,
    )
    .expect("script runs to completion");
    assert!(matches!(value, Value::Int(2)));
}
