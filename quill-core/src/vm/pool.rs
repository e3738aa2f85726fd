//! Reusable `Vm` instances for a host that calls back into the same
//! compiled program repeatedly (a long-lived embedder invoking a handler
//! function per request, say) without paying frame/stack allocation cost
//! on every call.
//!
//! `Vm` itself stays `!Send`/`!Sync` (its `Value` graph is `Rc`-rooted),
//! so a pool only helps a single-threaded host amortize allocation; it
//! does not make the VM safe to share across threads. A host that does
//! need cross-thread sharing stores state behind [`crate::value::Value::SyncDict`]
//! and runs one `Vm` per thread.

use super::Vm;
use crate::bytecode::Bytecode;
use crate::value::NativeFunctionData;
use std::cell::RefCell;
use std::rc::Rc;

pub struct VmPool {
    bytecode: Rc<Bytecode>,
    builtins: Rc<Vec<Rc<NativeFunctionData>>>,
    globals: Rc<RefCell<Vec<crate::value::Value>>>,
    idle: RefCell<Vec<Vm>>,
}

impl VmPool {
    pub fn new(bytecode: Bytecode, builtins: Vec<Rc<NativeFunctionData>>) -> Self {
        let bytecode = Rc::new(bytecode);
        let globals = Rc::new(RefCell::new(vec![
            crate::value::Value::Nil;
            bytecode.num_globals
        ]));
        Self {
            bytecode,
            builtins: Rc::new(builtins),
            globals,
            idle: RefCell::new(Vec::new()),
        }
    }

    /// Hands out an idle `Vm` if one is sitting in the pool, or builds a
    /// fresh one sharing this pool's globals and constant pool. The
    /// module cache is NOT shared across checkouts -- each checkout gets
    /// its own, since a module's top-level side effects should only run
    /// once per logical invocation, not once ever across the pool's life.
    pub fn checkout(&self) -> Vm {
        if let Some(mut vm) = self.idle.borrow_mut().pop() {
            vm.reset_for_reuse();
            return vm;
        }
        Vm::with_globals_rc(
            self.bytecode.clone(),
            self.builtins.clone(),
            self.globals.clone(),
        )
    }

    /// Returns a `Vm` to the pool for a later checkout. Callers that hit
    /// an unrecoverable `Aborted`/`StackOverflow` should drop the `Vm`
    /// instead of checking it back in, since its frame stack may be left
    /// in a state the next checkout's `reset_for_reuse` can't repair.
    pub fn checkin(&self, vm: Vm) {
        self.idle.borrow_mut().push(vm);
    }

    pub fn globals(&self) -> Rc<RefCell<Vec<crate::value::Value>>> {
        self.globals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::CompiledFunction;

    fn trivial_bytecode() -> Bytecode {
        Bytecode::new(CompiledFunction::new(vec![], 0, 0), Vec::new(), 1)
    }

    #[test]
    fn checkin_then_checkout_reuses_same_instance() {
        let pool = VmPool::new(trivial_bytecode(), Vec::new());
        let vm = pool.checkout();
        let ptr_before = &vm as *const Vm;
        pool.checkin(vm);
        let vm2 = pool.checkout();
        // Not a strict pointer identity guarantee across moves, but the
        // pool should not have allocated a second idle slot.
        assert_eq!(pool.idle.borrow().len(), 0);
        let _ = ptr_before;
        drop(vm2);
    }
}
