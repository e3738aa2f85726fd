//! Symbol resolution: maps names to `(scope, index)` pairs across nested
//! function scopes, promoting captured outer locals to `Free` symbols as
//! the compiler walks into a closure body.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
    Free,
    Builtin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub scope: Scope,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: std::collections::HashMap<String, Symbol>,
    num_definitions: usize,
    /// Free variables this scope captured from an enclosing scope, in the
    /// order they were first referenced -- the order the compiler must
    /// emit `GetLocalPtr`/`GetFreePtr` instructions in before `Closure`.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Pushes a scope for a `{ }` block: nested inside the current one,
    /// but continuing the same local-slot numbering rather than starting
    /// over at zero -- a block doesn't get its own frame the way a
    /// function body does, so its locals still land in the enclosing
    /// function's flat local array.
    pub fn new_block(outer: SymbolTable) -> Self {
        let num_definitions = outer.num_definitions;
        Self {
            outer: Some(Box::new(outer)),
            num_definitions,
            ..Self::default()
        }
    }

    /// Discards the innermost scope, returning the enclosing one -- used
    /// when the compiler finishes a function body.
    pub fn pop(self) -> Option<SymbolTable> {
        self.outer.map(|o| *o)
    }

    /// Pops a scope pushed by `new_block`, carrying the local-slot count
    /// it consumed back into the enclosing scope so a later sibling block
    /// keeps numbering from there instead of reusing a slot.
    pub fn pop_block(self) -> SymbolTable {
        let mut outer = *self.outer.expect("block scope underflow");
        outer.num_definitions = self.num_definitions;
        outer
    }

    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Defines `name` in this scope's own store. Returns `None` if `name`
    /// is already defined here -- redeclaring in the *same* block is a
    /// compile error, but shadowing a name from an enclosing scope (a
    /// nested block, or a nested function) is fine and gets its own slot.
    pub fn define(&mut self, name: &str) -> Option<Symbol> {
        if self.store.contains_key(name) {
            return None;
        }
        let scope = if self.is_global() {
            Scope::Global
        } else {
            Scope::Local
        };
        let symbol = Symbol {
            scope,
            index: self.num_definitions,
        };
        self.store.insert(name.to_string(), symbol);
        self.num_definitions += 1;
        Some(symbol)
    }

    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            scope: Scope::Builtin,
            index,
        };
        self.store.insert(name.to_string(), symbol);
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        self.free_symbols.push(original);
        let symbol = Symbol {
            scope: Scope::Free,
            index: self.free_symbols.len() - 1,
        };
        symbol
    }

    /// Resolves `name`, recursing into enclosing scopes and promoting any
    /// outer `Local`/`Free` hit to a `Free` symbol in every scope between
    /// here and there so each intermediate closure also knows to forward
    /// the capture.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(&sym) = self.store.get(name) {
            return Some(sym);
        }
        let outer = self.outer.as_mut()?;
        let outer_sym = outer.resolve(name)?;
        if matches!(outer_sym.scope, Scope::Global | Scope::Builtin) {
            return Some(outer_sym);
        }
        let free = self.define_free(outer_sym);
        self.store.insert(name.to_string(), free);
        Some(free)
    }

    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_global_and_local() {
        let mut global = SymbolTable::new();
        let g = global.define("a").unwrap();
        assert_eq!(g.scope, Scope::Global);

        let mut local = SymbolTable::new_enclosed(global);
        let l = local.define("b").unwrap();
        assert_eq!(l.scope, Scope::Local);
        assert_eq!(local.resolve("a").unwrap().scope, Scope::Global);
        assert_eq!(local.resolve("b").unwrap().scope, Scope::Local);
    }

    #[test]
    fn redefining_a_name_in_the_same_scope_fails() {
        let mut scope = SymbolTable::new();
        assert!(scope.define("x").is_some());
        assert!(scope.define("x").is_none());
    }

    #[test]
    fn a_nested_block_may_shadow_an_outer_name() {
        let mut outer = SymbolTable::new();
        outer.define("x");
        let mut block = SymbolTable::new_block(outer);
        assert!(block.define("x").is_some());
    }

    #[test]
    fn a_block_scope_continues_the_enclosing_slot_numbering() {
        let mut outer = SymbolTable::new();
        outer.define("a");
        let mut block = SymbolTable::new_block(outer);
        let b = block.define("b").unwrap();
        assert_eq!(b.index, 1);
        let outer = block.pop_block();
        assert_eq!(outer.num_definitions(), 2);
    }

    #[test]
    fn promotes_outer_local_to_free() {
        let mut global = SymbolTable::new();
        global.define("g");

        let mut outer = SymbolTable::new_enclosed(global);
        outer.define("x");

        let mut inner = SymbolTable::new_enclosed(outer);
        let resolved = inner.resolve("x").unwrap();
        assert_eq!(resolved.scope, Scope::Free);
        assert_eq!(inner.free_symbols.len(), 1);
    }

    #[test]
    fn builtin_resolves_without_promotion() {
        let mut global = SymbolTable::new();
        global.define_builtin(0, "len");
        let mut local = SymbolTable::new_enclosed(global);
        assert_eq!(local.resolve("len").unwrap().scope, Scope::Builtin);
        assert!(local.free_symbols.is_empty());
    }

    #[test]
    fn nested_capture_chains_through_intermediate_scope() {
        let mut global = SymbolTable::new();
        global.define("g");
        let mut outer = SymbolTable::new_enclosed(global);
        outer.define("x");
        let mut middle = SymbolTable::new_enclosed(outer);
        middle.resolve("x");
        let mut inner = SymbolTable::new_enclosed(middle);
        let resolved = inner.resolve("x").unwrap();
        assert_eq!(resolved.scope, Scope::Free);
    }
}
