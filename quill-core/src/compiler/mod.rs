//! AST to bytecode compiler.
//!
//! Tracks a stack of [`CompilationScope`]s (one per function body being
//! compiled, innermost last) alongside the matching [`SymbolTable`] chain,
//! a constant pool with dedup for simple literals and structurally
//! identical function bodies, and two compile-time-only bookkeeping
//! stacks: open loops (`continue`/`break` targets) and open `try` blocks
//! (for the finally-inlining scheme described on [`TryCtx`]).

mod expr;
mod stmt;

use crate::bytecode::{Bytecode, CompiledFunction};
use crate::error::{CompileError, VmError};
use crate::fileset::{FileHandle, FileSet, Pos};
use crate::instr::{self, op};
use crate::symtab::{Scope, SymbolTable};
use crate::value::Value;
use quill_syntax::ast;
use std::collections::HashMap;
use std::rc::Rc;

/// Looks up (and parses, if necessary) the module a script `import`s.
/// Kept as a trait rather than baked into the compiler so that where a
/// module's source comes from -- disk, an embedded bundle, a network
/// fetch -- stays a decision for the host, not the compiler.
pub trait ModuleResolver {
    fn resolve(&self, importing_file: &str, path: &str) -> Result<(String, ast::File), String>;
}

/// `GetLocal`/`SetLocal`/`DefineLocal` address a local with a one-byte
/// operand, so a single function body can't define more locals than this.
const MAX_LOCALS: usize = 256;

/// A resolver that never finds anything, for compiling scripts known to
/// have no imports (tests, single-file snippets).
#[derive(Debug, Default)]
pub struct NullResolver;

impl ModuleResolver for NullResolver {
    fn resolve(&self, _importing_file: &str, path: &str) -> Result<(String, ast::File), String> {
        Err(format!("no module resolver configured for import '{path}'"))
    }
}

/// Per-function compilation state: the instruction buffer under
/// construction plus the last two emitted opcodes, which a handful of
/// peephole adjustments (dropping a trailing `Pop` before an implicit
/// `Nil` return) need to see.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    source_map: Vec<(usize, Pos)>,
    last: Option<(u8, usize)>,
    previous: Option<(u8, usize)>,
}

impl CompilationScope {
    fn emit(&mut self, opcode: u8, operands: &[usize]) -> usize {
        let pos = self.instructions.len();
        self.instructions
            .extend(instr::make_instruction(opcode, operands));
        self.previous = self.last;
        self.last = Some((opcode, pos));
        pos
    }

    fn last_is(&self, opcode: u8) -> bool {
        matches!(self.last, Some((op, _)) if op == opcode)
    }
}

/// One open `for`/`for-in` loop, tracked so `break`/`continue` can patch
/// their jump targets and know which [`TryCtx`]es opened after the loop
/// started need their finally blocks inlined before branching out.
struct LoopCtx {
    /// `continue`'s jump target isn't known until the loop's post-body
    /// code (a `for` loop's increment step, a `for-in`'s next-element
    /// check) has actually been compiled, so every `continue` just emits
    /// a placeholder jump here and all of them get patched together once
    /// that position is known.
    continue_jumps: Vec<usize>,
    break_jumps: Vec<usize>,
    tries_at_entry: usize,
}

/// One open `try` statement. Always pushed, even for a `try` with no
/// `finally` clause, so `break`/`continue` crossing it still pops the
/// runtime handler [`crate::instr::op::SETUP_TRY`] installed -- without
/// that pop a handler for a try block that already exited normally would
/// linger on the frame and could catch an unrelated later exception.
struct TryCtx {
    finally_block: Option<ast::BlockStmt>,
}

/// Hashable key for constant-pool dedup of simple (non-function) values.
#[derive(PartialEq, Eq, Hash)]
enum ConstKey {
    Nil,
    Bool(bool),
    Flag(bool),
    Int(i64),
    Uint(u64),
    FloatBits(u64),
    Char(char),
    String(String),
    RawString(String),
}

pub struct Compiler<'a> {
    constants: Vec<Value>,
    const_index: HashMap<ConstKey, usize>,
    fn_fingerprints: HashMap<u64, usize>,
    scopes: Vec<CompilationScope>,
    symtab: SymbolTable,
    loops: Vec<LoopCtx>,
    tries: Vec<TryCtx>,
    /// The name each currently-open function literal was directly bound
    /// to (`var name = func...` / `name = func...`), innermost last, or
    /// `None` when the literal wasn't bound that way (an argument, a
    /// return value) -- the only shape `Expr::Call` can syntactically
    /// recognize as calling "this same function" for tail-call reuse.
    self_name: Vec<Option<String>>,
    /// `tries.len()` at the start of each currently-open function body, so
    /// a `return` only inlines the tries open in *its own* frame, never
    /// ones belonging to an enclosing function (those live in a different
    /// call frame with its own handler stack).
    try_base: Vec<usize>,
    file_set: &'a FileSet,
    file: FileHandle,
    file_name: String,
    resolver: &'a dyn ModuleResolver,
    builtin_names: Vec<String>,
    next_temp: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(
        file_set: &'a FileSet,
        file: FileHandle,
        file_name: impl Into<String>,
        builtins: &[&str],
        resolver: &'a dyn ModuleResolver,
    ) -> Self {
        let mut symtab = SymbolTable::new();
        for (i, name) in builtins.iter().enumerate() {
            symtab.define_builtin(i, name);
        }
        Self {
            constants: Vec::new(),
            const_index: HashMap::new(),
            fn_fingerprints: HashMap::new(),
            scopes: vec![CompilationScope::default()],
            symtab,
            loops: Vec::new(),
            tries: Vec::new(),
            self_name: Vec::new(),
            try_base: vec![0],
            file_set,
            file,
            file_name: file_name.into(),
            resolver,
            builtin_names: builtins.iter().map(|s| s.to_string()).collect(),
            next_temp: 0,
        }
    }

    /// A fresh root symbol table carrying the same builtins as this
    /// compiler's own root -- used for a module body, which sees the
    /// host's builtins but not the importing script's globals or locals.
    fn fresh_root_symtab(&self) -> SymbolTable {
        let mut symtab = SymbolTable::new();
        for (i, name) in self.builtin_names.iter().enumerate() {
            symtab.define_builtin(i, name);
        }
        symtab
    }

    /// A synthetic local name no source identifier can collide with,
    /// used to stash a subexpression's value across a short-circuit
    /// branch (nullish selector access) without a `Dup` opcode.
    fn temp_name(&mut self) -> String {
        let n = self.next_temp;
        self.next_temp += 1;
        format!(" t{n}")
    }

    /// Compiles a top-level script: the implicit result is whatever the
    /// last statement's expression evaluated to (if the file's last
    /// statement is a bare expression), falling back to `nil`. This is
    /// the entry point for a REPL line or a `run` command, not for a
    /// module loaded by `import` -- see [`Self::compile_module`].
    pub fn compile_script(mut self, file: &ast::File) -> Result<Bytecode, CompileError> {
        self.compile_stmts_with_tail(&file.stmts)?;
        self.emit(op::RETURN, &[1]);
        self.finish()
    }

    /// Compiles a file as an importable module: its body runs once, then
    /// an export dict (built from any `export` statement) or the last
    /// statement's value is cached under `module_name` via `StoreModule`
    /// before returning.
    pub fn compile_module(
        mut self,
        file: &ast::File,
        module_name: &str,
    ) -> Result<Bytecode, CompileError> {
        let mut exports: Option<Vec<String>> = None;
        for s in &file.stmts {
            if let ast::Stmt::Export(e) = s {
                exports = Some(e.names.clone());
            }
        }
        self.compile_stmts_with_tail(&file.stmts)?;
        if let Some(names) = exports {
            // The tail already left a value (nil, absent an exports
            // clause fallback); an explicit `export` list replaces it.
            self.emit(op::POP, &[]);
            self.emit_export_dict(&names)?;
        }
        let name_idx = self.add_string_const(module_name, false);
        self.emit(op::STORE_MODULE, &[name_idx]);
        self.emit(op::RETURN, &[1]);
        self.finish()
    }

    fn emit_export_dict(&mut self, names: &[String]) -> Result<(), CompileError> {
        for name in names {
            let key_idx = self.add_string_const(name, false);
            self.emit(op::CONSTANT, &[key_idx]);
            let symbol = self
                .symtab
                .resolve(name)
                .ok_or_else(|| CompileError::new(format!("export of undefined name '{name}'"), Pos(0)))?;
            self.emit_get(symbol);
        }
        self.emit(op::DICT, &[names.len()]);
        Ok(())
    }

    /// Compiles `file` as a module body reachable via `import`, in the
    /// *same* constant pool as the importing compile unit (so its
    /// `LoadModule` can reference the result directly), and registers it
    /// as a function constant. Returns that constant's index.
    ///
    /// The module body gets an isolated symbol table seeded only with
    /// builtins: it cannot see the importing script's globals or locals,
    /// matching the host's own module boundary.
    fn compile_imported_module(
        &mut self,
        file: &ast::File,
        module_name: &str,
    ) -> Result<usize, CompileError> {
        let mut exports: Option<Vec<String>> = None;
        for s in &file.stmts {
            if let ast::Stmt::Export(e) = s {
                exports = Some(e.names.clone());
            }
        }
        let fresh_symtab = self.fresh_root_symtab();
        let outer_symtab = std::mem::replace(&mut self.symtab, fresh_symtab);
        self.scopes.push(CompilationScope::default());
        self.try_base.push(self.tries.len());
        let result = (|| -> Result<(), CompileError> {
            self.compile_stmts_with_tail(&file.stmts)?;
            if let Some(names) = exports {
                self.emit(op::POP, &[]);
                self.emit_export_dict(&names)?;
            }
            let name_idx = self.add_string_const(module_name, false);
            self.emit(op::STORE_MODULE, &[name_idx]);
            self.emit(op::RETURN, &[1]);
            Ok(())
        })();
        let num_locals = self.symtab.num_definitions();
        self.symtab = outer_symtab;
        let scope = self.scopes.pop().expect("module scope underflow");
        self.try_base.pop().expect("module scope underflow");
        result?;
        let mut f = CompiledFunction::new(scope.instructions, num_locals, 0);
        f.source_map = scope.source_map;
        f.name = module_name.to_string();
        Ok(self.add_function_const(f))
    }

    fn finish(mut self) -> Result<Bytecode, CompileError> {
        let scope = self.scopes.pop().expect("root scope missing");
        let mut main = CompiledFunction::new(scope.instructions, self.symtab.num_definitions(), 0);
        main.source_map = scope.source_map;
        main.name = "main".to_string();
        main.source_file = Some(Rc::from(self.file_name.as_str()));
        let num_globals = self.symtab.num_definitions();
        Ok(Bytecode::new(main, self.constants, num_globals))
    }

    /// Compiles every statement in `stmts`, skipping the trailing `Pop`
    /// for a final bare expression statement so its value survives to
    /// become the block's result -- used both for the top-level script
    /// result and for a function body's implicit-`nil` fallthrough.
    fn compile_stmts_with_tail(&mut self, stmts: &[ast::Stmt]) -> Result<(), CompileError> {
        for (i, stmt) in stmts.iter().enumerate() {
            let is_tail = i + 1 == stmts.len();
            if is_tail {
                if let ast::Stmt::Expr(e) = stmt {
                    self.compile_tail_value(&e.expr)?;
                    return Ok(());
                }
            }
            self.compile_stmt(stmt)?;
        }
        self.emit(op::NIL, &[]);
        Ok(())
    }

    /// Compiles an expression sitting directly in front of a `Return`
    /// with no other opcode between it and that `Return` -- the one spot
    /// a self-recursive call can be recognized and flagged for the VM to
    /// reuse the current frame instead of pushing a new one. Anything
    /// that isn't a call to the function's own binding name compiles
    /// exactly as it would anywhere else.
    fn compile_tail_value(&mut self, e: &ast::Expr) -> Result<(), CompileError> {
        if let ast::Expr::Call(call) = e {
            if self.is_self_tail_call(&call.callee) {
                return self.compile_call(call, true);
            }
        }
        self.compile_expr(e)
    }

    fn is_self_tail_call(&self, callee: &ast::Expr) -> bool {
        matches!(
            (callee, self.self_name.last()),
            (ast::Expr::Ident(ident), Some(Some(name))) if &ident.name == name
        )
    }

    fn current(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("scope stack underflow")
    }

    fn emit(&mut self, opcode: u8, operands: &[usize]) -> usize {
        self.current().emit(opcode, operands)
    }

    fn pos_of(&self, span: quill_syntax::span::Span) -> Pos {
        Pos(self.file_set.base_of(self.file) + span.start as u32)
    }

    fn emit_traced(&mut self, opcode: u8, operands: &[usize], span: quill_syntax::span::Span) {
        let pos = self.pos_of(span);
        let ip = self.emit(opcode, operands);
        self.current().source_map.push((ip, pos));
    }

    fn len(&mut self) -> usize {
        self.current().instructions.len()
    }

    fn patch_jump(&mut self, pos: usize, target: usize) {
        instr::patch_operand(&mut self.current().instructions, pos, 0, target);
    }

    fn add_constant(&mut self, value: Value, key: Option<ConstKey>) -> usize {
        if let Some(key) = key {
            if let Some(&idx) = self.const_index.get(&key) {
                return idx;
            }
            let idx = self.constants.len();
            self.constants.push(value);
            self.const_index.insert(key, idx);
            idx
        } else {
            let idx = self.constants.len();
            self.constants.push(value);
            idx
        }
    }

    fn add_string_const(&mut self, s: &str, raw: bool) -> usize {
        let key = if raw {
            ConstKey::RawString(s.to_string())
        } else {
            ConstKey::String(s.to_string())
        };
        let value = if raw {
            Value::RawString(Rc::from(s))
        } else {
            Value::String(Rc::from(s))
        };
        self.add_constant(value, Some(key))
    }

    /// Registers a compiled function body, deduping against any prior
    /// function with an identical instruction fingerprint (two empty
    /// closures compiled from different call sites, say).
    fn add_function_const(&mut self, f: CompiledFunction) -> usize {
        let fp = f.fingerprint();
        if let Some(&idx) = self.fn_fingerprints.get(&fp) {
            return idx;
        }
        let idx = self.constants.len();
        self.fn_fingerprints.insert(fp, idx);
        self.constants.push(Value::CompiledFunction(Rc::new(f)));
        idx
    }

    fn enter_function_scope(&mut self, self_name: Option<String>) {
        let outer = std::mem::replace(&mut self.symtab, SymbolTable::new());
        self.symtab = SymbolTable::new_enclosed(outer);
        self.scopes.push(CompilationScope::default());
        self.try_base.push(self.tries.len());
        self.self_name.push(self_name);
    }

    /// Leaves the current function scope, returning its compiled body
    /// (locals count, free-variable symbols to capture) to the caller,
    /// which still needs to emit the `GetLocalPtr`/`GetFreePtr` +
    /// `Closure` sequence in the *enclosing* scope. Fails if the body
    /// defined more locals than a `GetLocal`/`SetLocal`/`DefineLocal`
    /// operand (one byte) can address, before this function ever reaches
    /// the constant pool the VM would run it from.
    fn leave_function_scope(
        &mut self,
        pos: Pos,
    ) -> Result<(CompiledFunction, Vec<crate::symtab::Symbol>), CompileError> {
        let num_locals = self.symtab.num_definitions();
        if num_locals > MAX_LOCALS {
            return Err(CompileError::new(
                VmError::SymbolLimit { limit: MAX_LOCALS }.to_string(),
                pos,
            ));
        }
        let free_symbols = std::mem::take(&mut self.symtab.free_symbols);
        let outer = std::mem::replace(&mut self.symtab, SymbolTable::new());
        self.symtab = outer.pop().expect("function scope underflow");
        let scope = self.scopes.pop().expect("function scope underflow");
        self.try_base.pop().expect("function scope underflow");
        self.self_name.pop().expect("function scope underflow");
        let mut f = CompiledFunction::new(scope.instructions, num_locals, 0);
        f.source_map = scope.source_map;
        Ok((f, free_symbols))
    }

    /// Pushes a `{ }` block scope: its locals still land in the enclosing
    /// function's flat local array (see [`SymbolTable::new_block`]), but
    /// redeclaring a name already bound *in this block* is a compile
    /// error while a nested block may shadow it freely.
    fn enter_block_scope(&mut self) {
        let outer = std::mem::take(&mut self.symtab);
        self.symtab = SymbolTable::new_block(outer);
    }

    fn leave_block_scope(&mut self) {
        let inner = std::mem::take(&mut self.symtab);
        self.symtab = inner.pop_block();
    }

    fn emit_get(&mut self, symbol: crate::symtab::Symbol) {
        match symbol.scope {
            Scope::Global => self.emit(op::GET_GLOBAL, &[symbol.index]),
            Scope::Local => self.emit(op::GET_LOCAL, &[symbol.index]),
            Scope::Free => self.emit(op::GET_FREE, &[symbol.index]),
            Scope::Builtin => self.emit(op::GET_BUILTIN, &[symbol.index]),
        };
    }

    fn emit_set(&mut self, symbol: crate::symtab::Symbol) -> Result<(), CompileError> {
        match symbol.scope {
            Scope::Global => {
                self.emit(op::SET_GLOBAL, &[symbol.index]);
            }
            Scope::Local => {
                self.emit(op::SET_LOCAL, &[symbol.index]);
            }
            Scope::Free => {
                self.emit(op::SET_FREE, &[symbol.index]);
            }
            Scope::Builtin => {
                return Err(CompileError::new("cannot assign to a builtin", Pos(0)));
            }
        }
        Ok(())
    }

    fn emit_define(&mut self, symbol: crate::symtab::Symbol) {
        match symbol.scope {
            Scope::Global => self.emit(op::SET_GLOBAL, &[symbol.index]),
            Scope::Local => self.emit(op::DEFINE_LOCAL, &[symbol.index]),
            _ => unreachable!("define only targets Global/Local"),
        };
    }

    /// Recompiles `finally`'s AST fresh at a normal exit point (in the
    /// teacher's source these would be multiple textual copies; here the
    /// compiler generates them instead of the author). Always followed
    /// by a `Finalizer(NORMAL)` to discard the handler `SetupTry` pushed,
    /// whether or not this particular try had a finally clause.
    fn inline_finally(&mut self, ctx_index: usize) -> Result<(), CompileError> {
        let finally = self.tries[ctx_index].finally_block.clone();
        if let Some(block) = finally {
            self.compile_block(&block)?;
        }
        self.emit(op::FINALIZER, &[crate::instr::finalizer_mode::NORMAL as usize]);
        Ok(())
    }

    /// Inlines every open try's finally from innermost out to (but not
    /// including) `down_to`, used by `return` (down_to = 0, the whole
    /// stack) and by `break`/`continue` (down_to = the target loop's
    /// `tries_at_entry`).
    fn inline_open_tries(&mut self, down_to: usize) -> Result<(), CompileError> {
        for i in (down_to..self.tries.len()).rev() {
            self.inline_finally(i)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileset::FileSet;

    fn compile(src: &str) -> Bytecode {
        let mut fs = FileSet::new();
        let handle = fs.add_file("t.ql", src);
        let file = quill_syntax::parse(src).expect("parse failed");
        let resolver = NullResolver;
        let compiler = Compiler::new(&fs, handle, "t.ql", &[], &resolver);
        compiler.compile_script(&file).expect("compile failed")
    }

    #[test]
    fn compiles_arithmetic_expression_statement() {
        let bc = compile("1 + 2;");
        assert!(!bc.main.instructions.is_empty());
    }

    #[test]
    fn compiles_var_decl_and_reference() {
        let bc = compile("var x = 1; x + 1;");
        assert_eq!(bc.num_globals, 1);
    }

    #[test]
    fn dedups_identical_integer_constants() {
        let bc = compile("1; 1; 1;");
        let int_constants = bc
            .constants
            .iter()
            .filter(|v| matches!(v, Value::Int(1)))
            .count();
        assert_eq!(int_constants, 1);
    }

    #[test]
    fn dedups_structurally_identical_function_bodies() {
        let bc = compile(
            r#"
            var a = func() { return 1 + 1 }
            var b = func() { return 1 + 1 }
            "#,
        );
        let functions: Vec<&CompiledFunction> = bc
            .constants
            .iter()
            .filter_map(|v| match v {
                Value::CompiledFunction(f) => Some(f.as_ref()),
                _ => None,
            })
            .collect();
        assert_eq!(functions.len(), 1, "two empty-capture literals with identical bodies must share one constant slot");
        // Confirmed structurally, not just by slot count: the kept body's
        // instructions must be exactly what either literal would have
        // compiled to on its own.
        let solo = compile("func() { return 1 + 1 }");
        let expected = solo
            .constants
            .iter()
            .find_map(|v| match v {
                Value::CompiledFunction(f) => Some(&f.instructions),
                _ => None,
            })
            .expect("solo compile must produce a function constant");
        pretty_assertions::assert_eq!(&functions[0].instructions, expected);
    }

    fn try_compile(src: &str) -> Result<Bytecode, CompileError> {
        let mut fs = FileSet::new();
        let handle = fs.add_file("t.ql", src);
        let file = quill_syntax::parse(src).expect("parse failed");
        let resolver = NullResolver;
        let compiler = Compiler::new(&fs, handle, "t.ql", &[], &resolver);
        compiler.compile_script(&file)
    }

    #[test]
    fn a_function_with_more_than_256_locals_fails_to_compile() {
        let params: Vec<String> = (0..=MAX_LOCALS).map(|i| format!("p{i}")).collect();
        let src = format!("var f = func({}) {{ return p0 }}", params.join(", "));
        let err = try_compile(&src).expect_err("a local count past the one-byte operand width must be rejected");
        assert!(err.message.contains("symbol limit"), "got {:?}", err.message);
    }

    #[test]
    fn a_function_with_exactly_256_locals_still_compiles() {
        let params: Vec<String> = (0..MAX_LOCALS).map(|i| format!("p{i}")).collect();
        let src = format!("var f = func({}) {{ return p0 }}", params.join(", "));
        try_compile(&src).expect("256 locals fits the one-byte operand width exactly");
    }
}
