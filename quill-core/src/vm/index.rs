//! `GetIndex`/`SetIndex`/`SliceIndex` opcode semantics, shared by every
//! indexable `Value` kind.

use crate::error::VmError;
use crate::value::Value;

fn normalize_index(index: i64, len: usize) -> Result<usize, VmError> {
    let idx = if index < 0 { index + len as i64 } else { index };
    if idx < 0 || idx as usize >= len {
        return Err(VmError::IndexOutOfBounds { index, len });
    }
    Ok(idx as usize)
}

fn index_once(target: &Value, index: &Value) -> Result<Value, VmError> {
    match target.deref_ptr() {
        Value::Array(items) => {
            let items = items.borrow();
            let i = match index {
                Value::Int(i) => *i,
                Value::Uint(u) => *u as i64,
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            let i = normalize_index(i, items.len())?;
            Ok(items[i].clone())
        }
        Value::Bytes(data) => {
            let i = match index {
                Value::Int(i) => *i,
                Value::Uint(u) => *u as i64,
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            let i = normalize_index(i, data.len())?;
            Ok(Value::Int(data[i] as i64))
        }
        Value::String(s) | Value::RawString(s) => {
            let i = match index {
                Value::Int(i) => *i,
                Value::Uint(u) => *u as i64,
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(i, chars.len())?;
            Ok(Value::Char(chars[i]))
        }
        Value::Dict(dict) => {
            let key = match index {
                Value::String(s) | Value::RawString(s) => s.to_string(),
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            Ok(dict.borrow().get(&key).cloned().unwrap_or(Value::Nil))
        }
        Value::SyncDict(dict) => {
            let key = match index {
                Value::String(s) | Value::RawString(s) => s.to_string(),
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            Ok(dict
                .read()
                .expect("syncDict lock poisoned")
                .get(&key)
                .cloned()
                .unwrap_or(Value::Nil))
        }
        Value::KeyValueArray(items) => {
            let items = items.borrow();
            let i = match index {
                Value::Int(i) => *i,
                Value::Uint(u) => *u as i64,
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            let i = normalize_index(i, items.len())?;
            let (k, v) = items[i].clone();
            Ok(Value::KeyValue(std::rc::Rc::new((k, v))))
        }
        Value::KeyValue(kv) => match index {
            Value::Int(0) => Ok(kv.0.clone()),
            Value::Int(1) => Ok(kv.1.clone()),
            other => Err(VmError::InvalidIndex { kind: other.kind() }),
        },
        other => Err(VmError::NotIndexable { kind: other.kind() }),
    }
}

/// Applies each index in `indices` in turn, so `a[i, j]` means `(a[i])[j]`.
pub fn get_index(target: Value, indices: &[Value]) -> Result<Value, VmError> {
    let mut current = target;
    for index in indices {
        current = index_once(&current, index)?;
    }
    Ok(current)
}

pub fn set_index(target: &Value, index: &Value, value: Value) -> Result<(), VmError> {
    match target.deref_ptr() {
        Value::Array(items) => {
            let i = match index {
                Value::Int(i) => *i,
                Value::Uint(u) => *u as i64,
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            let len = items.borrow().len();
            let i = normalize_index(i, len).map_err(|_| VmError::IndexOutOfBounds { index: i, len })?;
            items.borrow_mut()[i] = value;
            Ok(())
        }
        Value::Dict(dict) => {
            let key = match index {
                Value::String(s) | Value::RawString(s) => s.to_string(),
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            dict.borrow_mut().insert(key, value);
            Ok(())
        }
        Value::SyncDict(dict) => {
            let key = match index {
                Value::String(s) | Value::RawString(s) => s.to_string(),
                other => return Err(VmError::InvalidIndex { kind: other.kind() }),
            };
            dict.write().expect("syncDict lock poisoned").insert(key, value);
            Ok(())
        }
        other => Err(VmError::NotIndexAssignable { kind: other.kind() }),
    }
}

fn slice_bounds(len: usize, low: &Value, high: &Value) -> Result<(usize, usize), VmError> {
    let low = match low {
        Value::Nil => 0,
        Value::Int(i) => {
            let v = if *i < 0 { i + len as i64 } else { *i };
            v.clamp(0, len as i64) as usize
        }
        other => return Err(VmError::InvalidIndex { kind: other.kind() }),
    };
    let high = match high {
        Value::Nil => len,
        Value::Int(i) => {
            let v = if *i < 0 { i + len as i64 } else { *i };
            v.clamp(0, len as i64) as usize
        }
        other => return Err(VmError::InvalidIndex { kind: other.kind() }),
    };
    if low > high {
        return Err(VmError::InvalidIndex { kind: crate::value::ValueKind::Int });
    }
    Ok((low, high))
}

pub fn slice_index(target: Value, low: Value, high: Value) -> Result<Value, VmError> {
    match target.deref_ptr() {
        Value::Array(items) => {
            let items = items.borrow();
            let (lo, hi) = slice_bounds(items.len(), &low, &high)?;
            Ok(Value::array(items[lo..hi].to_vec()))
        }
        Value::String(s) | Value::RawString(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (lo, hi) = slice_bounds(chars.len(), &low, &high)?;
            Ok(Value::string(chars[lo..hi].iter().collect::<String>()))
        }
        Value::Bytes(data) => {
            let (lo, hi) = slice_bounds(data.len(), &low, &high)?;
            Ok(Value::Bytes(std::rc::Rc::new(data[lo..hi].to_vec())))
        }
        other => Err(VmError::NotIndexable { kind: other.kind() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_index_wraps() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let v = get_index(arr, &[Value::Int(-1)]).unwrap();
        assert_eq!(v, Value::Int(3));
    }

    #[test]
    fn out_of_bounds_errors() {
        let arr = Value::array(vec![Value::Int(1)]);
        assert!(get_index(arr, &[Value::Int(5)]).is_err());
    }

    #[test]
    fn slice_clamps_bounds() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let v = slice_index(arr, Value::Nil, Value::Int(2)).unwrap();
        assert_eq!(v, Value::array(vec![Value::Int(1), Value::Int(2)]));
    }
}
