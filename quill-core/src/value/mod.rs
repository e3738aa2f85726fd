//! The dynamic value representation every compiled function, object
//! collaborator, and opcode operates on.
//!
//! Primitives live inline in the enum; composites are reference-counted so
//! that assignment and argument passing are cheap pointer copies, and so
//! that closures can share captured variables through [`Value::ObjectPtr`].

pub mod callable;
pub mod closure;
pub mod decimal;
pub mod dict;
pub mod error_value;

pub use callable::{CallArgs, CallWrapperData, NativeFnBody, NativeFunctionData, ObjectTypeData};
pub use closure::ClosureData;
pub use decimal::Decimal;
pub use dict::OrderedDict;
pub use error_value::{ErrorData, RuntimeErrorData};

use crate::bytecode::CompiledFunction;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    /// The `yes`/`no` alternate boolean literal domain; distinct from
    /// `Bool` so that `typeName` distinguishes them, but falsy/equality
    /// treat them like ordinary booleans.
    Flag(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    String(Rc<str>),
    RawString(Rc<str>),
    Bytes(Rc<Vec<u8>>),
    Decimal(Rc<Decimal>),
    Array(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<OrderedDict>>),
    /// A `Dict` shared across VM instances in a pool, guarded by a
    /// reader-writer lock instead of a `RefCell`.
    SyncDict(Arc<RwLock<OrderedDict>>),
    KeyValue(Rc<(Value, Value)>),
    KeyValueArray(Rc<RefCell<Vec<(Value, Value)>>>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<ClosureData>),
    /// Builtins resolved through `GetBuiltin`.
    BuiltinFunction(Rc<NativeFunctionData>),
    /// Host-embedder-registered callables, reachable like any other value.
    Function(Rc<NativeFunctionData>),
    CallWrapper(Rc<CallWrapperData>),
    /// A boxed upvalue cell: the heap slot a closure's `Free` variable
    /// indirects through, shared between the defining frame and every
    /// closure that captured it.
    ObjectPtr(Rc<RefCell<Value>>),
    Error(Rc<ErrorData>),
    RuntimeError(Rc<RuntimeErrorData>),
    ObjectType(Rc<ObjectTypeData>),
}

/// The bare type discriminant, independent of payload -- used wherever code
/// needs to group or dispatch on "what kind of value is this" without
/// matching the full enum (e.g. error messages naming the offending type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Bool,
    Flag,
    Int,
    Uint,
    Float,
    Char,
    String,
    RawString,
    Bytes,
    Decimal,
    Array,
    Dict,
    SyncDict,
    KeyValue,
    KeyValueArray,
    CompiledFunction,
    Closure,
    BuiltinFunction,
    Function,
    CallWrapper,
    ObjectPtr,
    Error,
    RuntimeError,
    ObjectType,
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn dict(dict: OrderedDict) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Bool(_) => ValueKind::Bool,
            Value::Flag(_) => ValueKind::Flag,
            Value::Int(_) => ValueKind::Int,
            Value::Uint(_) => ValueKind::Uint,
            Value::Float(_) => ValueKind::Float,
            Value::Char(_) => ValueKind::Char,
            Value::String(_) => ValueKind::String,
            Value::RawString(_) => ValueKind::RawString,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Array(_) => ValueKind::Array,
            Value::Dict(_) => ValueKind::Dict,
            Value::SyncDict(_) => ValueKind::SyncDict,
            Value::KeyValue(_) => ValueKind::KeyValue,
            Value::KeyValueArray(_) => ValueKind::KeyValueArray,
            Value::CompiledFunction(_) => ValueKind::CompiledFunction,
            Value::Closure(_) => ValueKind::Closure,
            Value::BuiltinFunction(_) => ValueKind::BuiltinFunction,
            Value::Function(_) => ValueKind::Function,
            Value::CallWrapper(_) => ValueKind::CallWrapper,
            Value::ObjectPtr(_) => ValueKind::ObjectPtr,
            Value::Error(_) => ValueKind::Error,
            Value::RuntimeError(_) => ValueKind::RuntimeError,
            Value::ObjectType(_) => ValueKind::ObjectType,
        }
    }

    /// The name a script-visible `typeName(v)` call would report.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Flag(_) => "flag",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::RawString(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Decimal(_) => "decimal",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::SyncDict(_) => "syncDict",
            Value::KeyValue(_) => "keyValue",
            Value::KeyValueArray(_) => "keyValueArray",
            Value::CompiledFunction(_) => "compiledFunction",
            Value::Closure(_) => "compiledFunction",
            Value::BuiltinFunction(_) => "builtinFunction",
            Value::Function(_) => "function",
            Value::CallWrapper(_) => "callWrapper",
            Value::ObjectPtr(inner) => inner.borrow().type_name(),
            Value::Error(_) => "error",
            Value::RuntimeError(_) => "error",
            Value::ObjectType(_) => "objectType",
        }
    }

    /// Resolves through an `ObjectPtr` cell to the underlying value,
    /// leaving any other value untouched. `GetLocalPtr`/`GetFreePtr`
    /// read the cell itself; every other read dereferences it first.
    pub fn deref_ptr(&self) -> Value {
        match self {
            Value::ObjectPtr(cell) => cell.borrow().deref_ptr(),
            other => other.clone(),
        }
    }

    /// Truthiness per §4 of the calling/condition contracts: `nil`, `false`,
    /// zero numerics, and empty strings/bytes/arrays/dicts are falsy;
    /// everything else -- including `0.0` negative zero -- is truthy only
    /// if it isn't exactly the numeric zero.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Flag(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Char(c) => *c == '\0',
            Value::String(s) => s.is_empty(),
            Value::RawString(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Decimal(d) => d.is_zero(),
            Value::Array(a) => a.borrow().is_empty(),
            Value::Dict(d) => d.borrow().is_empty(),
            Value::SyncDict(d) => d.read().expect("syncDict lock poisoned").is_empty(),
            Value::KeyValue(_) => false,
            Value::KeyValueArray(a) => a.borrow().is_empty(),
            Value::ObjectPtr(cell) => cell.borrow().is_falsy(),
            _ => false,
        }
    }

    /// Deep structural equality with cross-numeric-type comparison
    /// (`1 == 1.0 == 1u`), matching the language's single `==` operator
    /// rather than Rust's derive-based identity equality.
    pub fn equal(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (ObjectPtr(a), _) => a.borrow().equal(other),
            (_, ObjectPtr(b)) => self.equal(&b.borrow()),
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Flag(a), Flag(b)) => a == b,
            (Bool(a), Flag(b)) | (Flag(b), Bool(a)) => a == b,
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) => a == b,
            (RawString(a), RawString(b)) => a == b,
            (String(a), RawString(b)) | (RawString(b), String(a)) => a.as_ref() == b.as_ref(),
            (Bytes(a), Bytes(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Uint(a), Uint(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Uint(b)) | (Uint(b), Int(a)) => i128::from(*a) == i128::from(*b),
            (Int(a), Float(b)) | (Float(b), Int(a)) => *a as f64 == *b,
            (Uint(a), Float(b)) | (Float(b), Uint(a)) => *a as f64 == *b,
            (Array(a), Array(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equal(y))
            }
            (Dict(a), Dict(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|bv| v.equal(bv)))
            }
            (KeyValue(a), KeyValue(b)) => a.0.equal(&b.0) && a.1.equal(&b.1),
            (KeyValueArray(a), KeyValueArray(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x.0.equal(&y.0) && x.1.equal(&y.1))
            }
            (Error(a), Error(b)) => Rc::ptr_eq(a, b),
            (RuntimeError(a), RuntimeError(b)) => Rc::ptr_eq(a, b),
            (CompiledFunction(a), CompiledFunction(b)) => Rc::ptr_eq(a, b),
            (Closure(a), Closure(b)) => Rc::ptr_eq(a, b),
            (BuiltinFunction(a), BuiltinFunction(b)) => Rc::ptr_eq(a, b),
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            (ObjectType(a), ObjectType(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The `repr`-style representation used by a debug/print collaborator,
    /// distinct from the plain `Display` form (e.g. strings are quoted).
    pub fn to_repr(&self) -> String {
        match self {
            Value::String(s) | Value::RawString(s) => format!("{s:?}"),
            Value::Char(c) => format!("{c:?}"),
            other => format!("{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equal(other)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.type_name(), self)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Flag(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::String(s) => write!(f, "{s}"),
            Value::RawString(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "{b:?}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.to_repr())?;
                }
                write!(f, "]")
            }
            Value::Dict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {}", v.to_repr())?;
                }
                write!(f, "}}")
            }
            Value::SyncDict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.read().expect("syncDict lock poisoned").iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {}", v.to_repr())?;
                }
                write!(f, "}}")
            }
            Value::KeyValue(kv) => write!(f, "{}: {}", kv.0, kv.1),
            Value::KeyValueArray(a) => {
                write!(f, "[")?;
                for (i, (k, v)) in a.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {}", v.to_repr())?;
                }
                write!(f, "]")
            }
            Value::CompiledFunction(_) => write!(f, "<compiled function>"),
            Value::Closure(_) => write!(f, "<compiled function>"),
            Value::BuiltinFunction(n) => write!(f, "<builtin {}>", n.name),
            Value::Function(n) => write!(f, "<function {}>", n.name),
            Value::CallWrapper(_) => write!(f, "<bound function>"),
            Value::ObjectPtr(cell) => write!(f, "{}", cell.borrow()),
            Value::Error(e) => write!(f, "{e}"),
            Value::RuntimeError(e) => write!(f, "{e}"),
            Value::ObjectType(t) => write!(f, "<type {}>", t.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_numeric_equality() {
        assert!(Value::Int(1).equal(&Value::Float(1.0)));
        assert!(Value::Uint(2).equal(&Value::Int(2)));
        assert!(!Value::Int(1).equal(&Value::Int(2)));
    }

    #[test]
    fn falsy_covers_zero_and_empty() {
        assert!(Value::Int(0).is_falsy());
        assert!(Value::string("").is_falsy());
        assert!(!Value::string("a").is_falsy());
        assert!(Value::array(vec![]).is_falsy());
        assert!(!Value::array(vec![Value::Nil]).is_falsy());
    }

    #[test]
    fn object_ptr_transparent_to_equality_and_falsy() {
        let cell = Value::ObjectPtr(Rc::new(RefCell::new(Value::Int(0))));
        assert!(cell.is_falsy());
        assert!(cell.equal(&Value::Int(0)));
    }

    #[test]
    fn flag_and_bool_compare_equal() {
        assert!(Value::Bool(true).equal(&Value::Flag(true)));
    }

    #[test]
    fn array_equality_is_structural() {
        let a = Value::array(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert!(a.equal(&b));
    }
}
