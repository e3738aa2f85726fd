//! A bare read-eval-print loop.
//!
//! Each line compiles and runs as its own isolated script: the compiler
//! has no notion of resuming a partially built symbol table across calls,
//! so there is no variable persistence between lines. A real embedder
//! wanting that would keep its own top-level bindings and splice them
//! into a persistent global table itself.

use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::run_source;

pub fn run() -> ExitCode {
    println!("quill {} -- compiler/VM core demo shell", env!("CARGO_PKG_VERSION"));
    println!("Ctrl-D to exit.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: failed to start line editor: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut line_no = 0usize;
    loop {
        match rl.readline("quill> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                line_no += 1;
                run_source(&line, &format!("<repl:{line_no}>"));
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }
    ExitCode::SUCCESS
}
