//! `import` semantics: every distinct module name is materialized once
//! and re-imports hand back the same value, not a fresh copy.

use quill_core::compiler::{Compiler, ModuleResolver};
use quill_core::fileset::FileSet;
use quill_core::value::Value;
use quill_core::vm::Vm;
use quill_syntax::ast;

/// Resolves every import path to the same fixed module source, regardless
/// of how many times it's asked -- standing in for a host that reads a
/// file or fetches a module over a network and hands the parsed result
/// to the compiler.
struct FixedModuleResolver {
    module_name: String,
    source: String,
}

impl ModuleResolver for FixedModuleResolver {
    fn resolve(&self, _importing_file: &str, _path: &str) -> Result<(String, ast::File), String> {
        let file = quill_syntax::parse(&self.source).map_err(|e| format!("{e:?}"))?;
        Ok((self.module_name.clone(), file))
    }
}

fn run(source: &str, resolver: &dyn ModuleResolver) -> Value {
    let mut file_set = FileSet::new();
    let handle = file_set.add_file("test.ql", source);
    let file = quill_syntax::parse(source).expect("source parses");
    let compiler = Compiler::new(&file_set, handle, "test.ql", &[], resolver);
    let bytecode = compiler.compile_script(&file).expect("source compiles");
    Vm::new(&bytecode, Vec::new())
        .run()
        .expect("script runs to completion")
}

#[test]
fn importing_the_same_module_twice_shares_the_same_materialized_value() {
    let resolver = FixedModuleResolver {
        module_name: "counter".to_string(),
        source: r#"
            var store = [0]
            export store
        "#
        .to_string(),
    };
    let value = run(
        r#"
        var first = import("counter")
        var second = import("counter")
        first["store"][0] = 99
        return second["store"][0]
        "#,
        &resolver,
    );
    assert!(
        matches!(value, Value::Int(99)),
        "the second import must hand back the exact same array the first import did, got {value:?}"
    );
}

#[test]
fn a_module_with_no_export_statement_still_caches_its_tail_value() {
    let resolver = FixedModuleResolver {
        module_name: "plain".to_string(),
        source: "1 + 1".to_string(),
    };
    let value = run(
        r#"
        var a = import("plain")
        var b = import("plain")
        return [a, b]
        "#,
        &resolver,
    );
    let Value::Array(elements) = value else {
        panic!("expected an array, got {value:?}");
    };
    let elements = elements.borrow();
    assert!(matches!(elements[0], Value::Int(2)));
    assert!(matches!(elements[1], Value::Int(2)));
}
