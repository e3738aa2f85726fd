//! Command-line driver for the compiler and virtual machine.
//!
//! This binary exists to exercise the core as a host embedding it would:
//! parse a source file, compile it, run it on a fresh `Vm`, print the
//! result. It carries no standard library, no REPL syntax highlighting
//! and none of the other host-side surfaces the core hands off to its
//! collaborators -- a real embedder supplies those itself.

mod repl;

use std::env;
use std::fs;
use std::process::ExitCode;

use quill_core::compiler::{Compiler, NullResolver};
use quill_core::fileset::FileSet;
use quill_core::value::Value;
use quill_core::vm::Vm;
use quill_core::{CompileError, VmError};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => repl::run(),
        Some("-e") => match args.get(1) {
            Some(source) => run_source(source, "<-e>"),
            None => {
                eprintln!("Error: -e requires a code argument");
                ExitCode::FAILURE
            }
        },
        Some("-h") | Some("--help") => {
            print_usage();
            ExitCode::SUCCESS
        }
        Some(path) => {
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("Error reading file '{path}': {e}");
                    return ExitCode::FAILURE;
                }
            };
            run_source(&source, path)
        }
    }
}

fn print_usage() {
    println!("usage:");
    println!("  quill                 start a read-eval-print loop");
    println!("  quill <file>          run a script file");
    println!("  quill -e <code>       run a single line of code");
}

/// Parses, compiles and runs `source` as a standalone script, printing its
/// result or a formatted compile/runtime error to stderr. `name` is the
/// label attached to diagnostics (a file path, or a synthetic name for a
/// REPL line / `-e` snippet).
pub(crate) fn run_source(source: &str, name: &str) -> ExitCode {
    let mut file_set = FileSet::new();
    let handle = file_set.add_file(name, source);

    let file = match quill_syntax::parse(source) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("{name}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let resolver = NullResolver;
    let compiler = Compiler::new(&file_set, handle, name, &[], &resolver);
    let bytecode = match compiler.compile_script(&file) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("{}", format_compile_error(&file_set, &e));
            return ExitCode::FAILURE;
        }
    };

    let mut vm = Vm::new(&bytecode, Vec::new());
    match vm.run() {
        Ok(value) => {
            print_value(&value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", format_vm_error(&file_set, &e));
            ExitCode::FAILURE
        }
    }
}

fn format_compile_error(file_set: &FileSet, e: &CompileError) -> String {
    match file_set.resolve(e.pos) {
        Some(resolved) => format!("{resolved}: {e}"),
        None => e.to_string(),
    }
}

fn format_vm_error(file_set: &FileSet, e: &VmError) -> String {
    let VmError::User(Value::RuntimeError(err)) = e else {
        return format!("uncaught error: {e}");
    };
    let mut out = format!("uncaught {}", err.error);
    for pos in &err.trace {
        if let Some(resolved) = file_set.resolve(*pos) {
            out.push_str(&format!("\n  at {resolved}"));
        }
    }
    out
}

fn print_value(value: &Value) {
    if !matches!(value, Value::Nil) {
        println!("{}", value.to_repr());
    }
}
