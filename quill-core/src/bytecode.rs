//! Compiled output: a function's instruction stream plus the constant
//! pool and entry point a `Bytecode` container bundles for the VM.

use crate::fileset::Pos;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// One compiled function body. Free variables aren't listed here --
/// the compiler emits a `GetLocalPtr`/`GetFreePtr` per free variable
/// immediately before the `Closure` instruction that turns this constant
/// into a [`crate::value::ClosureData`], so the shape of the capture list
/// lives in the *caller's* instruction stream, not the callee's.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_parameters: usize,
    /// Positional parameters a caller must supply -- those declared
    /// before the first one with a default. A non-variadic call short of
    /// this many positional arguments is a `WrongNumberOfArguments`
    /// error rather than silently filling the missing slots with `Nil`.
    pub num_required_parameters: usize,
    pub variadic: bool,
    pub num_named_parameters: usize,
    pub variadic_named: bool,
    /// Positional parameter names in declaration order (the trailing
    /// variadic parameter's name, if any, is not included here).
    pub param_names: Vec<String>,
    /// Named parameter names in declaration order, used to bind a call's
    /// named arguments to the right local slot.
    pub named_param_names: Vec<String>,
    /// Name used in stack traces; `"?"` for anonymous function literals.
    pub name: String,
    pub source_file: Option<std::rc::Rc<str>>,
    /// Sparse `(instruction offset, source position)` pairs in ascending
    /// offset order, recorded only at instructions that can fault or
    /// appear in a trace (calls, indexing, throws, operators). The VM
    /// finds the nearest entry at or before the faulting `ip` with a
    /// binary search rather than carrying a position on every byte.
    pub source_map: Vec<(usize, Pos)>,
}

impl CompiledFunction {
    pub fn new(instructions: Vec<u8>, num_locals: usize, num_parameters: usize) -> Self {
        Self {
            instructions,
            num_locals,
            num_parameters,
            num_required_parameters: num_parameters,
            variadic: false,
            num_named_parameters: 0,
            variadic_named: false,
            param_names: Vec::new(),
            named_param_names: Vec::new(),
            name: "?".to_string(),
            source_file: None,
            source_map: Vec::new(),
        }
    }

    /// FNV-1a over the instruction bytes, used to dedup structurally
    /// identical function literals in the constant pool (e.g. two empty
    /// closures compiled from different call sites).
    pub fn fingerprint(&self) -> u64 {
        fnv1a(&self.instructions)
    }

    /// The source position nearest at-or-before `ip`, for trace entries.
    pub fn pos_at(&self, ip: usize) -> Option<Pos> {
        match self.source_map.binary_search_by_key(&ip, |&(offset, _)| offset) {
            Ok(i) => Some(self.source_map[i].1),
            Err(0) => None,
            Err(i) => Some(self.source_map[i - 1].1),
        }
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The compiler's output for a whole source file or module: the top-level
/// instruction stream, its constant pool, and how many globals it defines.
/// Serializable for the on-disk bytecode file layout.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub main: Rc<CompiledFunction>,
    pub constants: Vec<Value>,
    pub num_globals: usize,
}

impl Bytecode {
    pub fn new(main: CompiledFunction, constants: Vec<Value>, num_globals: usize) -> Self {
        Self {
            main: Rc::new(main),
            constants,
            num_globals,
        }
    }
}

/// Serialization-only mirror of `CompiledFunction` -- the runtime struct
/// carries an `Rc<str>` and other non-`serde` fields, so the on-disk
/// layout goes through this plain-data shape instead of deriving directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_parameters: usize,
    pub num_required_parameters: usize,
    pub variadic: bool,
    pub num_named_parameters: usize,
    pub variadic_named: bool,
    pub param_names: Vec<String>,
    pub named_param_names: Vec<String>,
    pub name: String,
    pub source_file: Option<String>,
    pub source_map: Vec<(usize, u32)>,
}

impl From<&CompiledFunction> for EncodedFunction {
    fn from(f: &CompiledFunction) -> Self {
        Self {
            instructions: f.instructions.clone(),
            num_locals: f.num_locals,
            num_parameters: f.num_parameters,
            num_required_parameters: f.num_required_parameters,
            variadic: f.variadic,
            num_named_parameters: f.num_named_parameters,
            variadic_named: f.variadic_named,
            param_names: f.param_names.clone(),
            named_param_names: f.named_param_names.clone(),
            name: f.name.clone(),
            source_file: f.source_file.as_ref().map(|s| s.to_string()),
            source_map: f.source_map.iter().map(|&(ip, pos)| (ip, pos.0)).collect(),
        }
    }
}

impl From<EncodedFunction> for CompiledFunction {
    fn from(f: EncodedFunction) -> Self {
        Self {
            instructions: f.instructions,
            num_locals: f.num_locals,
            num_parameters: f.num_parameters,
            num_required_parameters: f.num_required_parameters,
            variadic: f.variadic,
            num_named_parameters: f.num_named_parameters,
            variadic_named: f.variadic_named,
            param_names: f.param_names,
            named_param_names: f.named_param_names,
            name: f.name,
            source_file: f.source_file.map(|s| Rc::from(s.as_str())),
            source_map: f.source_map.into_iter().map(|(ip, pos)| (ip, Pos(pos))).collect(),
        }
    }
}

/// On-disk layout for a compiled bytecode file: a magic/version header
/// followed by the bincode-encoded body. Only constants representable
/// without a running VM (numbers, strings, bytes, nested functions) are
/// carried; anything else is rejected at serialize time by the compiler
/// never placing it in the constant pool to begin with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedBytecode {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub main: EncodedFunction,
    pub constants: Vec<EncodedConstant>,
    pub num_globals: usize,
}

pub const BYTECODE_MAGIC: [u8; 4] = *b"QLBC";
pub const BYTECODE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EncodedConstant {
    Nil,
    Bool(bool),
    Flag(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    String(String),
    RawString(String),
    Bytes(Vec<u8>),
    Decimal(String),
    CompiledFunction(EncodedFunction),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = CompiledFunction::new(vec![1, 2, 3], 0, 0);
        let b = CompiledFunction::new(vec![1, 2, 3], 0, 0);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_bodies() {
        let a = CompiledFunction::new(vec![1, 2, 3], 0, 0);
        let b = CompiledFunction::new(vec![1, 2, 4], 0, 0);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn encoded_function_round_trips() {
        let mut f = CompiledFunction::new(vec![9, 9], 2, 1);
        f.name = "f".to_string();
        let encoded = EncodedFunction::from(&f);
        let decoded: CompiledFunction = encoded.into();
        assert_eq!(decoded.instructions, f.instructions);
        assert_eq!(decoded.name, f.name);
    }
}
