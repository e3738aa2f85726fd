//! Compiler and bytecode virtual machine for the Quill embeddable
//! scripting language: turns a parsed [`quill_syntax::ast::File`] into a
//! byte-encoded instruction stream and executes it.

pub mod bytecode;
pub mod compiler;
pub mod error;
pub mod fileset;
pub mod instr;
pub mod symtab;
pub mod value;
pub mod vm;

pub use bytecode::Bytecode;
pub use error::{CompileError, VmError};
pub use value::Value;
