//! Insertion-ordered string-keyed map backing `Dict` and `SyncDict` values.

use super::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct OrderedDict {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl OrderedDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Inserts, preserving the original slot of `key` if it already exists.
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        if let Some(&i) = self.index.get(&key) {
            Some(std::mem::replace(&mut self.entries[i].1, value))
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
            None
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for idx in self.index.values_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        Some(value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut d = OrderedDict::new();
        d.insert("b".into(), Value::Int(2));
        d.insert("a".into(), Value::Int(1));
        let keys: Vec<_> = d.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn reinsert_keeps_original_slot() {
        let mut d = OrderedDict::new();
        d.insert("a".into(), Value::Int(1));
        d.insert("b".into(), Value::Int(2));
        d.insert("a".into(), Value::Int(3));
        let keys: Vec<_> = d.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(d.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn remove_shifts_index() {
        let mut d = OrderedDict::new();
        d.insert("a".into(), Value::Int(1));
        d.insert("b".into(), Value::Int(2));
        d.insert("c".into(), Value::Int(3));
        d.remove("a");
        assert_eq!(d.get("b"), Some(&Value::Int(2)));
        assert_eq!(d.get("c"), Some(&Value::Int(3)));
    }
}
