//! Module cache: memoizes each imported module's export value by name and
//! detects import cycles.
//!
//! A module's compiled body ends with `StoreModule` right before its
//! final `Return`, so the first successful run of a module caches its own
//! export as a side effect; every subsequent `LoadModule` for that name is
//! then a cache hit and the module body never runs again.

use crate::error::VmError;
use crate::value::Value;
use std::collections::HashMap;

enum ModuleState {
    /// Currently executing -- seeing this again means an import cycle.
    Loading,
    Loaded(Value),
}

#[derive(Default)]
pub struct ModuleCache {
    modules: HashMap<String, ModuleState>,
}

pub enum LoadAction {
    UseCached(Value),
    Proceed,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self, name: &str) -> Result<LoadAction, VmError> {
        match self.modules.get(name) {
            Some(ModuleState::Loaded(v)) => Ok(LoadAction::UseCached(v.clone())),
            Some(ModuleState::Loading) => Err(VmError::NotImplemented {
                what: format!("cyclic module import: '{name}'"),
            }),
            None => {
                self.modules.insert(name.to_string(), ModuleState::Loading);
                Ok(LoadAction::Proceed)
            }
        }
    }

    pub fn store(&mut self, name: &str, value: Value) {
        self.modules
            .insert(name.to_string(), ModuleState::Loaded(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_load_is_cached() {
        let mut cache = ModuleCache::new();
        assert!(matches!(cache.begin_load("a").unwrap(), LoadAction::Proceed));
        cache.store("a", Value::Int(1));
        match cache.begin_load("a").unwrap() {
            LoadAction::UseCached(Value::Int(1)) => {}
            _ => panic!("expected cached value"),
        }
    }

    #[test]
    fn reentrant_load_is_a_cycle_error() {
        let mut cache = ModuleCache::new();
        cache.begin_load("a").unwrap();
        assert!(cache.begin_load("a").is_err());
    }
}
