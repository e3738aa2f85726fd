//! Compile-time and run-time error types.
//!
//! Mirrors the host crate's split: compile errors are plain data collected
//! by the compiler and returned to the caller, while `VmError` is the
//! internal signal the opcode loop raises to start unwinding -- it is
//! never shown to scripts directly (see [`crate::value::ErrorData`] for
//! the value a `catch` block actually binds).

use crate::fileset::Pos;
use crate::value::ValueKind;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub pos: Pos,
}

impl CompileError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compile error: {}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Internal VM fault raised by an opcode handler. Every variant that can
/// be caught by script-level `try`/`catch` is converted to a
/// [`crate::value::ErrorData`] at the unwind boundary; [`VmError::Aborted`]
/// and [`VmError::StackOverflow`] instead terminate the running program.
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    WrongNumberOfArguments { want: String, got: usize },
    ArgumentTypeError { name: String, want: String, got: ValueKind },
    UnexpectedNamedArgument { name: String },
    NotIndexable { kind: ValueKind },
    NotIndexAssignable { kind: ValueKind },
    IndexOutOfBounds { index: i64, len: usize },
    InvalidIndex { kind: ValueKind },
    InvalidOperator { op: String, kind: ValueKind },
    OperandTypeError { op: String, left: ValueKind, right: ValueKind },
    ZeroDivision,
    TypeError { message: String },
    NotCallable { kind: ValueKind },
    NotIterable { kind: ValueKind },
    NotImplemented { what: String },
    StackOverflow,
    Aborted { reason: String },
    SymbolLimit { limit: usize },
    /// A script-level `throw expr` or a propagating user `Error`/
    /// `RuntimeError` value, carried through as-is.
    User(crate::value::Value),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::WrongNumberOfArguments { want, got } => {
                write!(f, "wrong number of arguments: want {want}, got {got}")
            }
            VmError::ArgumentTypeError { name, want, got } => {
                write!(f, "invalid type for argument '{name}': expected {want}, got {got:?}")
            }
            VmError::UnexpectedNamedArgument { name } => {
                write!(f, "unexpected named argument '{name}'")
            }
            VmError::NotIndexable { kind } => write!(f, "not indexable: {kind:?}"),
            VmError::NotIndexAssignable { kind } => write!(f, "not index-assignable: {kind:?}"),
            VmError::IndexOutOfBounds { index, len } => {
                write!(f, "index out of bounds: {index} (len {len})")
            }
            VmError::InvalidIndex { kind } => write!(f, "invalid index type: {kind:?}"),
            VmError::InvalidOperator { op, kind } => {
                write!(f, "invalid operator '{op}' for type {kind:?}")
            }
            VmError::OperandTypeError { op, left, right } => {
                write!(f, "type mismatch: {left:?} {op} {right:?}")
            }
            VmError::ZeroDivision => write!(f, "division by zero"),
            VmError::TypeError { message } => write!(f, "type error: {message}"),
            VmError::NotCallable { kind } => write!(f, "not callable: {kind:?}"),
            VmError::NotIterable { kind } => write!(f, "not iterable: {kind:?}"),
            VmError::NotImplemented { what } => write!(f, "not implemented: {what}"),
            VmError::StackOverflow => write!(f, "stack overflow"),
            VmError::Aborted { reason } => write!(f, "aborted: {reason}"),
            VmError::SymbolLimit { limit } => write!(f, "symbol limit exceeded: {limit}"),
            VmError::User(v) => write!(f, "{v}"),
        }
    }
}

impl std::error::Error for VmError {}

impl VmError {
    /// Error name as it appears in the `name` field of the `ErrorData`
    /// a `catch` block observes, e.g. for `isError(e, "TypeError")`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            VmError::WrongNumberOfArguments { .. } => "WrongNumberOfArgumentsError",
            VmError::ArgumentTypeError { .. } => "ArgumentTypeError",
            VmError::UnexpectedNamedArgument { .. } => "UnexpectedNamedArgError",
            VmError::NotIndexable { .. } => "NotIndexableError",
            VmError::NotIndexAssignable { .. } => "NotIndexAssignableError",
            VmError::IndexOutOfBounds { .. } => "IndexOutOfBoundsError",
            VmError::InvalidIndex { .. } => "InvalidIndexError",
            VmError::InvalidOperator { .. } => "InvalidOperatorError",
            VmError::OperandTypeError { .. } => "OperandTypeError",
            VmError::ZeroDivision => "ZeroDivisionError",
            VmError::TypeError { .. } => "TypeError",
            VmError::NotCallable { .. } => "NotCallableError",
            VmError::NotIterable { .. } => "NotIterableError",
            VmError::NotImplemented { .. } => "NotImplementedError",
            VmError::StackOverflow => "StackOverflowError",
            VmError::Aborted { .. } => "VMAbortedError",
            VmError::SymbolLimit { .. } => "SymbolLimitError",
            VmError::User(_) => "Error",
        }
    }

    /// Whether script-level `try`/`catch` can intercept this fault, or
    /// whether it always propagates to the host.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, VmError::Aborted { .. } | VmError::StackOverflow)
    }

    /// Builds the `ErrorData` a catch block binds, carrying the user value
    /// through unchanged for `VmError::User`.
    pub fn into_error_data(self) -> crate::value::ErrorData {
        match self {
            VmError::User(crate::value::Value::Error(e)) => (*e).clone(),
            VmError::User(crate::value::Value::RuntimeError(e)) => (*e.error).clone(),
            VmError::User(other) => crate::value::ErrorData::new("Error", other.to_string()),
            other => {
                let message = other.to_string();
                crate::value::ErrorData::new(other.kind_name(), message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_round_trips_through_error_data() {
        let err = crate::value::ErrorData::new("CustomError", "boom");
        let vm_err = VmError::User(crate::value::Value::Error(std::rc::Rc::new(err.clone())));
        assert_eq!(vm_err.into_error_data(), err);
    }

    #[test]
    fn stack_overflow_is_not_catchable() {
        assert!(!VmError::StackOverflow.is_catchable());
        assert!(VmError::ZeroDivision.is_catchable());
    }
}
