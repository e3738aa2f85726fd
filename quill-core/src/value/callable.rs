//! Host-side callable wrappers: builtins, embedder-provided functions,
//! bound-method wrappers, and first-class type descriptors.

use super::dict::OrderedDict;
use super::Value;
use crate::error::VmError;
use crate::vm::Vm;
use std::rc::Rc;

/// Positional + named arguments as decomposed by the calling convention,
/// handed to every native (non-bytecode) callable.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub named: OrderedDict,
}

impl CallArgs {
    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            positional: args,
            named: OrderedDict::new(),
        }
    }
}

pub type NativeFnBody = Rc<dyn Fn(&mut Vm, &CallArgs) -> Result<Value, VmError>>;

/// Shared shape behind both `Value::BuiltinFunction` (VM/stdlib-provided)
/// and `Value::Function` (wrapped host callable) -- they differ only in
/// which `Value` variant wraps them, which controls the printed type name.
pub struct NativeFunctionData {
    pub name: String,
    pub func: NativeFnBody,
}

impl NativeFunctionData {
    pub fn new(name: impl Into<String>, func: NativeFnBody) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn call(&self, vm: &mut Vm, args: &CallArgs) -> Result<Value, VmError> {
        (self.func)(vm, args)
    }
}

impl std::fmt::Debug for NativeFunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunctionData")
            .field("name", &self.name)
            .finish()
    }
}

/// Captured args + callable, as produced by method binding (`obj.method`
/// evaluated without a call resolves to a `CallWrapper` closing over `obj`).
#[derive(Debug, Clone)]
pub struct CallWrapperData {
    pub callee: Value,
    pub bound: Vec<Value>,
}

pub struct ObjectTypeData {
    pub name: String,
    pub constructor: Option<NativeFnBody>,
}

impl std::fmt::Debug for ObjectTypeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectTypeData")
            .field("name", &self.name)
            .field("has_constructor", &self.constructor.is_some())
            .finish()
    }
}
