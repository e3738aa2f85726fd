//! Lexer, parser and AST definitions for the Quill scripting language.
//!
//! This crate is the compiler's external collaborator: it owns source text,
//! tokenization and the concrete grammar, and exposes only the AST in
//! [`ast`] as its contract with `quill-core`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;

pub use error::{ParseError, ParseResult};
pub use parser::parse;
pub use span::{SourceMap, Span};
