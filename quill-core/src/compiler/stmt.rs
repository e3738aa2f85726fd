//! Statement lowering. Every `compile_stmt` call leaves the operand stack
//! at the depth it found it -- only expressions leave a residual value,
//! and whatever opcode follows them consumes it immediately. That
//! invariant is what lets `return`/`break`/`continue` splice an inlined
//! finally block in front of themselves without disturbing a value
//! already sitting on the stack underneath (a pending return value, say).

use super::{Compiler, LoopCtx, TryCtx};
use crate::error::CompileError;
use crate::instr::{finalizer_mode, op, NO_TARGET};
use quill_syntax::ast::{self, AssignOp, BranchKind, Expr, Stmt};

/// Normalized assignment target: either a plain name, or a container plus
/// the single index/key expression written into it. `arr[i][j] = x` isn't
/// representable here -- only the last `[...]` step of a target can be an
/// assignment; anything deeper must already have produced the container
/// being indexed.
enum AssignTarget<'e> {
    Ident(&'e ast::IdentExpr),
    Indexed { base: &'e Expr, index: IndexSource<'e> },
}

enum IndexSource<'e> {
    Expr(&'e Expr),
    Field(&'e str),
}

impl<'a> Compiler<'a> {
    pub(super) fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(s) => {
                self.compile_expr(&s.expr)?;
                self.emit(op::POP, &[]);
            }
            Stmt::Decl(s) => {
                match &s.value {
                    Some(v) => self.compile_func_lit_value(v, &s.name)?,
                    None => {
                        self.emit(op::NIL, &[]);
                    }
                }
                let symbol = self.symtab.define(&s.name).ok_or_else(|| {
                    CompileError::new(format!("'{}' is already defined in this scope", s.name), self.pos_of(s.span))
                })?;
                self.emit_define(symbol);
            }
            Stmt::Assign(s) => self.compile_assign(s)?,
            Stmt::If(s) => self.compile_if(s)?,
            Stmt::For(s) => self.compile_for(s)?,
            Stmt::ForIn(s) => self.compile_for_in(s)?,
            Stmt::Return(s) => {
                let base = *self.try_base.last().unwrap_or(&0);
                let no_finally_to_run = self.tries.len() <= base;
                match &s.value {
                    Some(v) if no_finally_to_run => self.compile_tail_value(v)?,
                    Some(v) => self.compile_expr(v)?,
                    None => {
                        self.emit(op::NIL, &[]);
                    }
                }
                self.inline_open_tries(base)?;
                self.emit(op::RETURN, &[1]);
            }
            Stmt::Branch(s) => self.compile_branch(s)?,
            Stmt::Block(s) => self.compile_block(s)?,
            Stmt::Try(s) => self.compile_try(s)?,
            Stmt::Export(_) => {
                // Exported names are collected by a prior scan of the
                // file's top-level statements (see `compile_module`); the
                // statement itself has no runtime effect where it sits.
            }
        }
        Ok(())
    }

    pub(super) fn compile_block(&mut self, block: &ast::BlockStmt) -> Result<(), CompileError> {
        self.enter_block_scope();
        let result = (|| -> Result<(), CompileError> {
            for stmt in &block.stmts {
                self.compile_stmt(stmt)?;
            }
            Ok(())
        })();
        self.leave_block_scope();
        result
    }

    /// Compiles the right-hand side of a `var name = ...` / `name = ...`,
    /// passing `name` down as the function's own binding name when the
    /// value is directly a function literal -- the hook that lets a call
    /// to that name from inside the literal's own body be recognized as
    /// tail-recursive. Anything else compiles exactly as it would anywhere.
    fn compile_func_lit_value(&mut self, value: &Expr, name: &str) -> Result<(), CompileError> {
        match value {
            Expr::FuncLit(f) => self.compile_func_lit(f, false, Some(name)),
            Expr::ClosureLit(f) => self.compile_func_lit(f, true, Some(name)),
            other => self.compile_expr(other),
        }
    }

    fn assign_target<'e>(&self, target: &'e Expr) -> Result<AssignTarget<'e>, CompileError> {
        match target {
            Expr::Ident(e) => Ok(AssignTarget::Ident(e)),
            Expr::Index(e) => {
                if e.indices.len() != 1 {
                    return Err(CompileError::new(
                        "an assignment target takes exactly one index",
                        self.pos_of(e.span),
                    ));
                }
                Ok(AssignTarget::Indexed {
                    base: &e.target,
                    index: IndexSource::Expr(&e.indices[0]),
                })
            }
            Expr::Selector(e) => Ok(AssignTarget::Indexed {
                base: &e.target,
                index: IndexSource::Field(&e.field),
            }),
            other => Err(CompileError::new("invalid assignment target", self.pos_of(other.span()))),
        }
    }

    fn compile_assign(&mut self, s: &ast::AssignStmt) -> Result<(), CompileError> {
        let target = self.assign_target(&s.target)?;
        match target {
            AssignTarget::Ident(e) => {
                let symbol = self
                    .symtab
                    .resolve(&e.name)
                    .ok_or_else(|| CompileError::new(format!("undefined name '{}'", e.name), self.pos_of(e.span)))?;
                if s.op == AssignOp::Assign {
                    self.compile_func_lit_value(&s.value, &e.name)?;
                } else {
                    self.emit_get(symbol);
                    self.compile_expr(&s.value)?;
                    self.emit(op::BINARY_OP, &[assign_op_code(s.op)]);
                }
                self.emit_set(symbol)?;
                self.emit(op::POP, &[]);
            }
            AssignTarget::Indexed { base, index } => {
                self.compile_indexed_assign(base, &index, s)?;
            }
        }
        Ok(())
    }

    /// `target[index] = value` or `target.field = value`, including the
    /// compound forms (`+=` and friends). Plain assignment just recompiles
    /// target/index and pushes the new value in the `[target, index,
    /// value]` order `SetIndex` expects. The compound case has to read the
    /// current value first (`GetIndex`), which leaves nothing on the stack
    /// to reuse for the write -- there's no `Dup`/`Swap` to recover
    /// target/index from underneath it, so the new value is stashed in a
    /// synthetic local while target and index are evaluated a second time.
    fn compile_indexed_assign(
        &mut self,
        base: &Expr,
        index: &IndexSource,
        s: &ast::AssignStmt,
    ) -> Result<(), CompileError> {
        if s.op == AssignOp::Assign {
            self.compile_expr(base)?;
            self.compile_index_key(index)?;
            self.compile_expr(&s.value)?;
            self.emit_traced(op::SET_INDEX, &[], s.span);
            return Ok(());
        }

        self.compile_expr(base)?;
        self.compile_index_key(index)?;
        self.emit_traced(op::GET_INDEX, &[1], s.span);
        self.compile_expr(&s.value)?;
        self.emit(op::BINARY_OP, &[assign_op_code(s.op)]);

        let temp_name = self.temp_name();
        let temp = self.symtab.define(&temp_name).expect("synthetic temp name cannot collide");
        self.emit_define(temp);

        self.compile_expr(base)?;
        self.compile_index_key(index)?;
        self.emit_get(temp);
        self.emit_traced(op::SET_INDEX, &[], s.span);
        Ok(())
    }

    fn compile_index_key(&mut self, index: &IndexSource) -> Result<(), CompileError> {
        match index {
            IndexSource::Expr(e) => self.compile_expr(e)?,
            IndexSource::Field(name) => {
                let idx = self.add_string_const(name, false);
                self.emit(op::CONSTANT, &[idx]);
            }
        }
        Ok(())
    }

    fn compile_if(&mut self, s: &ast::IfStmt) -> Result<(), CompileError> {
        self.compile_expr(&s.cond)?;
        let jump_falsy_pos = self.emit(op::JUMP_FALSY, &[0]);
        self.compile_block(&s.then_block)?;
        match &s.else_stmt {
            Some(else_stmt) => {
                let jump_end_pos = self.emit(op::JUMP, &[0]);
                let else_start = self.len();
                self.patch_jump(jump_falsy_pos, else_start);
                self.compile_stmt(else_stmt)?;
                let end = self.len();
                self.patch_jump(jump_end_pos, end);
            }
            None => {
                let end = self.len();
                self.patch_jump(jump_falsy_pos, end);
            }
        }
        Ok(())
    }

    /// The loop header (init variable, key/value bindings) and the body
    /// share one block scope: a `for`/`for-in` re-declaring its own
    /// induction variable every iteration is fine since it's all one
    /// compile-time pass, but this keeps two *sibling* loops reusing the
    /// same variable name from aliasing each other's slot, and lets the
    /// redeclaration check still catch `for (var i = 0; ; ) { var i = 1 }`.
    fn compile_for(&mut self, s: &ast::ForStmt) -> Result<(), CompileError> {
        self.enter_block_scope();
        let result = self.compile_for_inner(s);
        self.leave_block_scope();
        result
    }

    fn compile_for_inner(&mut self, s: &ast::ForStmt) -> Result<(), CompileError> {
        if let Some(init) = &s.init {
            self.compile_stmt(init)?;
        }
        let cond_start = self.len();
        let jump_falsy_pos = match &s.cond {
            Some(cond) => {
                self.compile_expr(cond)?;
                Some(self.emit(op::JUMP_FALSY, &[0]))
            }
            None => None,
        };

        self.loops.push(LoopCtx {
            continue_jumps: Vec::new(),
            break_jumps: Vec::new(),
            tries_at_entry: self.tries.len(),
        });
        self.compile_block(&s.body)?;
        let loop_ctx = self.loops.pop().expect("loop stack underflow");

        let post_start = self.len();
        for pos in loop_ctx.continue_jumps {
            self.patch_jump(pos, post_start);
        }
        if let Some(post) = &s.post {
            self.compile_stmt(post)?;
        }
        self.emit(op::JUMP, &[cond_start]);

        let end = self.len();
        if let Some(pos) = jump_falsy_pos {
            self.patch_jump(pos, end);
        }
        for pos in loop_ctx.break_jumps {
            self.patch_jump(pos, end);
        }
        Ok(())
    }

    fn compile_for_in(&mut self, s: &ast::ForInStmt) -> Result<(), CompileError> {
        self.enter_block_scope();
        let result = self.compile_for_in_inner(s);
        self.leave_block_scope();
        result
    }

    fn compile_for_in_inner(&mut self, s: &ast::ForInStmt) -> Result<(), CompileError> {
        self.compile_expr(&s.iterable)?;
        self.emit_traced(op::ITER_INIT, &[], s.span);

        let header = self.len();
        let next_else_pos = self.emit(op::ITER_NEXT_ELSE, &[0, 0]);
        let body_start = self.len();

        if let Some(key_name) = &s.key {
            self.emit(op::ITER_KEY, &[]);
            let symbol = self.symtab.define(key_name).ok_or_else(|| {
                CompileError::new(format!("'{key_name}' is already defined in this scope"), self.pos_of(s.span))
            })?;
            self.emit_define(symbol);
        }
        self.emit(op::ITER_VALUE, &[]);
        let value_symbol = self.symtab.define(&s.value).ok_or_else(|| {
            CompileError::new(format!("'{}' is already defined in this scope", s.value), self.pos_of(s.span))
        })?;
        self.emit_define(value_symbol);

        self.loops.push(LoopCtx {
            continue_jumps: Vec::new(),
            break_jumps: Vec::new(),
            tries_at_entry: self.tries.len(),
        });
        self.compile_block(&s.body)?;
        let loop_ctx = self.loops.pop().expect("loop stack underflow");

        for pos in loop_ctx.continue_jumps {
            self.patch_jump(pos, header);
        }
        self.emit(op::JUMP, &[header]);

        let done = self.len();
        crate::instr::patch_operand(&mut self.current().instructions, next_else_pos, 0, body_start);
        crate::instr::patch_operand(&mut self.current().instructions, next_else_pos, 1, done);
        for pos in loop_ctx.break_jumps {
            self.patch_jump(pos, done);
        }
        Ok(())
    }

    fn compile_branch(&mut self, s: &ast::BranchStmt) -> Result<(), CompileError> {
        let tries_at_entry = self
            .loops
            .last()
            .map(|l| l.tries_at_entry)
            .ok_or_else(|| CompileError::new("break/continue outside of a loop", self.pos_of(s.span)))?;
        self.inline_open_tries(tries_at_entry)?;
        let pos = self.emit(op::JUMP, &[0]);
        let loop_ctx = self.loops.last_mut().expect("checked above");
        match s.kind {
            BranchKind::Break => loop_ctx.break_jumps.push(pos),
            BranchKind::Continue => loop_ctx.continue_jumps.push(pos),
        }
        Ok(())
    }

    /// `try`/`catch`/`finally` compiles down to one runtime handler push
    /// (`SetupTry`) plus the finally block inlined at every exit this
    /// statement's body or catch block can take -- normal fallthrough,
    /// `return`, `break`/`continue` (handled by `inline_open_tries` at
    /// those sites via the pushed [`TryCtx`]) -- and a final copy reachable
    /// only by the VM jumping in mid-unwind, which re-raises afterward.
    ///
    /// The catch block only needs its own finally-pop-and-inline on normal
    /// completion when a finally clause exists: `Vm::propagate` only
    /// pushes a replacement finally-only handler before jumping to
    /// `catch_ip` when the original handler carried one, so when there is
    /// no finally, nothing was pushed for the catch block to pop.
    fn compile_try(&mut self, s: &ast::TryStmt) -> Result<(), CompileError> {
        let setup_pos = self.emit(op::SETUP_TRY, &[0, 0]);

        self.tries.push(TryCtx {
            finally_block: s.finally_block.clone(),
        });
        self.compile_block(&s.body)?;
        self.tries.pop().expect("try stack underflow");
        self.emit(op::FINALIZER, &[finalizer_mode::NORMAL as usize]);
        if let Some(finally) = &s.finally_block {
            self.compile_block(finally)?;
        }
        let mut end_jumps = vec![self.emit(op::JUMP, &[0])];

        let catch_target = if let Some(catch_block) = &s.catch_block {
            self.enter_block_scope();
            let result = (|| -> Result<usize, CompileError> {
                let catch_pos = self.len();
                self.emit(op::SETUP_CATCH, &[]);
                match &s.catch_var {
                    Some(name) => {
                        let symbol = self.symtab.define(name).ok_or_else(|| {
                            CompileError::new(format!("'{name}' is already defined in this scope"), self.pos_of(s.span))
                        })?;
                        self.emit_define(symbol);
                    }
                    None => {
                        self.emit(op::POP, &[]);
                    }
                }

                let has_finally = s.finally_block.is_some();
                if has_finally {
                    self.tries.push(TryCtx {
                        finally_block: s.finally_block.clone(),
                    });
                }
                self.compile_block(catch_block)?;
                if has_finally {
                    self.tries.pop().expect("try stack underflow");
                    self.emit(op::FINALIZER, &[finalizer_mode::NORMAL as usize]);
                    if let Some(finally) = &s.finally_block {
                        self.compile_block(finally)?;
                    }
                }
                Ok(catch_pos)
            })();
            self.leave_block_scope();
            let catch_pos = result?;
            end_jumps.push(self.emit(op::JUMP, &[0]));
            Some(catch_pos)
        } else {
            None
        };

        let finally_target = if let Some(finally) = &s.finally_block {
            let finally_pos = self.len();
            self.emit(op::SETUP_FINALLY, &[]);
            self.compile_block(finally)?;
            // Reached only via `Vm::propagate` mid-unwind, which has
            // already stashed the in-flight error in `pending_rethrow`;
            // `Finalizer(RERAISE)` re-raises it once this block finishes.
            self.emit(op::FINALIZER, &[finalizer_mode::RERAISE as usize]);
            Some(finally_pos)
        } else {
            None
        };

        crate::instr::patch_operand(
            &mut self.current().instructions,
            setup_pos,
            0,
            catch_target.unwrap_or(NO_TARGET as usize),
        );
        crate::instr::patch_operand(
            &mut self.current().instructions,
            setup_pos,
            1,
            finally_target.unwrap_or(NO_TARGET as usize),
        );

        let end = self.len();
        for pos in end_jumps.drain(..) {
            self.patch_jump(pos, end);
        }
        Ok(())
    }
}

fn assign_op_code(op: AssignOp) -> usize {
    use crate::instr::bin_op;
    (match op {
        AssignOp::Assign => unreachable!("plain assignment has no binary op"),
        AssignOp::Add => bin_op::ADD,
        AssignOp::Sub => bin_op::SUB,
        AssignOp::Mul => bin_op::MUL,
        AssignOp::Div => bin_op::DIV,
        AssignOp::Mod => bin_op::MOD,
    }) as usize
}
