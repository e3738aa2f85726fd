//! Runtime iterator state for the `Iter*` opcode family. Iterators live on
//! a side stack per frame rather than as a `Value` variant -- scripts never
//! hold an iterator as a first-class value, only the compiler-generated
//! `for`/`for-in` bodies and builtins that walk the iterator protocol do.

use crate::error::VmError;
use crate::value::Value;

#[derive(Debug)]
pub enum IterState {
    Array { items: Vec<Value>, idx: usize },
    Dict { entries: Vec<(String, Value)>, idx: usize },
    KeyValueArray { items: Vec<(Value, Value)>, idx: usize },
    Bytes { data: std::rc::Rc<Vec<u8>>, idx: usize },
    Str { chars: Vec<char>, idx: usize },
}

impl IterState {
    /// Snapshots `value`'s current elements into a fresh iterator. Taken
    /// eagerly so that mutating the collection mid-loop can't invalidate
    /// indices the way a live borrow would.
    pub fn from_value(value: &Value) -> Result<Self, VmError> {
        match value.deref_ptr() {
            Value::Array(items) => Ok(IterState::Array {
                items: items.borrow().clone(),
                idx: 0,
            }),
            Value::Dict(dict) => Ok(IterState::Dict {
                entries: dict.borrow().entries().to_vec(),
                idx: 0,
            }),
            Value::SyncDict(dict) => Ok(IterState::Dict {
                entries: dict
                    .read()
                    .expect("syncDict lock poisoned")
                    .entries()
                    .to_vec(),
                idx: 0,
            }),
            Value::KeyValueArray(items) => Ok(IterState::KeyValueArray {
                items: items.borrow().clone(),
                idx: 0,
            }),
            Value::Bytes(data) => Ok(IterState::Bytes { data, idx: 0 }),
            Value::String(s) | Value::RawString(s) => Ok(IterState::Str {
                chars: s.chars().collect(),
                idx: 0,
            }),
            other => Err(VmError::NotIterable { kind: other.kind() }),
        }
    }

    pub fn has_next(&self) -> bool {
        match self {
            IterState::Array { items, idx } => *idx < items.len(),
            IterState::Dict { entries, idx } => *idx < entries.len(),
            IterState::KeyValueArray { items, idx } => *idx < items.len(),
            IterState::Bytes { data, idx } => *idx < data.len(),
            IterState::Str { chars, idx } => *idx < chars.len(),
        }
    }

    pub fn advance(&mut self) {
        match self {
            IterState::Array { idx, .. }
            | IterState::Dict { idx, .. }
            | IterState::KeyValueArray { idx, .. }
            | IterState::Bytes { idx, .. }
            | IterState::Str { idx, .. } => *idx += 1,
        }
    }

    /// The key/index exposed to `for key, value in ...`.
    pub fn key(&self) -> Value {
        match self {
            IterState::Array { idx, .. }
            | IterState::Bytes { idx, .. }
            | IterState::Str { idx, .. } => Value::Int(*idx as i64),
            IterState::Dict { entries, idx } => Value::string(entries[*idx].0.clone()),
            IterState::KeyValueArray { items, idx } => items[*idx].0.clone(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            IterState::Array { items, idx } => items[*idx].clone(),
            IterState::Dict { entries, idx } => entries[*idx].1.clone(),
            IterState::KeyValueArray { items, idx } => items[*idx].1.clone(),
            IterState::Bytes { data, idx } => Value::Int(data[*idx] as i64),
            IterState::Str { chars, idx } => Value::Char(chars[*idx]),
        }
    }
}
