//! The user-visible `Error`/`RuntimeError` value kinds.
//!
//! These are distinct from [`crate::error::VmError`]: `VmError` is the
//! internal Rust-level signal the opcode loop uses to start unwinding;
//! `ErrorData`/`RuntimeErrorData` are what a script actually sees when it
//! catches the resulting value.

use super::Value;
use crate::fileset::Pos;

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorData {
    pub name: String,
    pub message: String,
    pub cause: Option<Value>,
}

impl ErrorData {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Walks the cause chain looking for an error with the given name,
    /// matching the sentinel-identity semantics `isError(e, kind)` needs.
    pub fn is_kind(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }
        match &self.cause {
            Some(Value::Error(e)) => e.is_kind(name),
            Some(Value::RuntimeError(e)) => e.error.is_kind(name),
            _ => false,
        }
    }
}

impl std::fmt::Display for ErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeErrorData {
    pub error: std::rc::Rc<ErrorData>,
    /// Source positions appended as the error unwound through each frame,
    /// innermost first.
    pub trace: Vec<Pos>,
}

impl RuntimeErrorData {
    pub fn new(error: ErrorData) -> Self {
        Self {
            error: std::rc::Rc::new(error),
            trace: Vec::new(),
        }
    }

    pub fn push_trace(&mut self, pos: Pos) {
        self.trace.push(pos);
    }
}

impl std::fmt::Display for RuntimeErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {}", self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_begins_with_error_and_carries_the_message() {
        let caught = RuntimeErrorData::new(ErrorData::new("Error", "boom"));
        let rendered = caught.to_string();
        assert!(rendered.starts_with("error:"));
        assert!(rendered.contains("boom"), "rendered form was {rendered:?}");
    }

    #[test]
    fn is_kind_walks_the_cause_chain() {
        let root = ErrorData::new("ZeroDivisionError", "division by zero");
        let wrapped = ErrorData::new("Error", "retry failed").with_cause(Value::Error(std::rc::Rc::new(root)));
        assert!(wrapped.is_kind("ZeroDivisionError"));
        assert!(!wrapped.is_kind("TypeError"));
    }
}
