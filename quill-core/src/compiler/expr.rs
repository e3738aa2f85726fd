//! Expression lowering: one `compile_expr` arm per [`ast::Expr`] variant.

use super::{Compiler, ConstKey};
use crate::error::CompileError;
use crate::instr::{bin_op, call_flag, op, throw_mode, un_op};
use quill_syntax::ast::{self, Arg, BinaryToken, Expr, UnaryToken};

impl<'a> Compiler<'a> {
    pub(super) fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Ident(e) => {
                let symbol = self
                    .symtab
                    .resolve(&e.name)
                    .ok_or_else(|| CompileError::new(format!("undefined name '{}'", e.name), self.pos_of(e.span)))?;
                self.emit_get(symbol);
            }
            Expr::IntLit(e) => {
                let idx = self.add_constant(crate::value::Value::Int(e.value), Some(ConstKey::Int(e.value)));
                self.emit(op::CONSTANT, &[idx]);
            }
            Expr::UintLit(e) => {
                let idx = self.add_constant(crate::value::Value::Uint(e.value), Some(ConstKey::Uint(e.value)));
                self.emit(op::CONSTANT, &[idx]);
            }
            Expr::FloatLit(e) => {
                let idx = self.add_constant(
                    crate::value::Value::Float(e.value),
                    Some(ConstKey::FloatBits(e.value.to_bits())),
                );
                self.emit(op::CONSTANT, &[idx]);
            }
            Expr::BoolLit(e) => {
                self.emit(if e.value { op::TRUE } else { op::FALSE }, &[]);
            }
            Expr::FlagLit(e) => {
                self.emit(if e.value { op::YES } else { op::NO }, &[]);
            }
            Expr::CharLit(e) => {
                let idx = self.add_constant(crate::value::Value::Char(e.value), Some(ConstKey::Char(e.value)));
                self.emit(op::CONSTANT, &[idx]);
            }
            Expr::StringLit(e) => {
                let idx = self.add_string_const(&e.value, false);
                self.emit(op::CONSTANT, &[idx]);
            }
            Expr::RawStringLit(e) => {
                let idx = self.add_string_const(&e.value, true);
                self.emit(op::CONSTANT, &[idx]);
            }
            Expr::NilLit(_) => {
                self.emit(op::NIL, &[]);
            }
            Expr::ArrayLit(e) => {
                for element in &e.elements {
                    self.compile_expr(element)?;
                }
                self.emit(op::ARRAY, &[e.elements.len()]);
            }
            Expr::DictLit(e) => {
                for (k, v) in &e.entries {
                    self.compile_expr(k)?;
                    self.compile_expr(v)?;
                }
                self.emit(op::DICT, &[e.entries.len()]);
            }
            Expr::KeyValueLit(e) => {
                self.compile_expr(&e.key)?;
                match &e.value {
                    Some(v) => self.compile_expr(v)?,
                    None => {
                        self.emit(op::NIL, &[]);
                    }
                }
                self.emit(op::KEY_VALUE, &[]);
            }
            Expr::Binary(e) => self.compile_binary(e)?,
            Expr::Unary(e) => {
                self.compile_expr(&e.operand)?;
                let code = match e.op {
                    UnaryToken::Neg => un_op::NEG,
                    UnaryToken::Not => un_op::NOT,
                };
                self.emit_traced(op::UNARY, &[code as usize], e.span);
            }
            Expr::Paren(e) => self.compile_expr(&e.inner)?,
            Expr::Index(e) => {
                self.compile_expr(&e.target)?;
                for index in &e.indices {
                    self.compile_expr(index)?;
                }
                self.emit_traced(op::GET_INDEX, &[e.indices.len()], e.span);
            }
            Expr::Slice(e) => {
                self.compile_expr(&e.target)?;
                match &e.low {
                    Some(lo) => self.compile_expr(lo)?,
                    None => {
                        self.emit(op::NIL, &[]);
                    }
                }
                match &e.high {
                    Some(hi) => self.compile_expr(hi)?,
                    None => {
                        self.emit(op::NIL, &[]);
                    }
                }
                self.emit_traced(op::SLICE_INDEX, &[], e.span);
            }
            Expr::Selector(e) => {
                self.compile_expr(&e.target)?;
                let key_idx = self.add_string_const(&e.field, false);
                self.emit(op::CONSTANT, &[key_idx]);
                self.emit_traced(op::GET_INDEX, &[1], e.span);
            }
            Expr::NullishSelector(e) => self.compile_nullish_selector(e)?,
            Expr::Call(e) => self.compile_call(e, false)?,
            Expr::FuncLit(f) => self.compile_func_lit(f, false, None)?,
            Expr::ClosureLit(f) => self.compile_func_lit(f, true, None)?,
            Expr::Cond(e) => {
                self.compile_expr(&e.cond)?;
                let jump_falsy_pos = self.emit(op::JUMP_FALSY, &[0]);
                self.compile_expr(&e.then_expr)?;
                let jump_end_pos = self.emit(op::JUMP, &[0]);
                let else_start = self.len();
                self.patch_jump(jump_falsy_pos, else_start);
                self.compile_expr(&e.else_expr)?;
                let end = self.len();
                self.patch_jump(jump_end_pos, end);
            }
            Expr::Import(e) => self.compile_import(e)?,
            Expr::Throw(e) => {
                self.compile_expr(&e.value)?;
                self.emit_traced(op::THROW, &[throw_mode::VALUE as usize], e.span);
            }
        }
        Ok(())
    }

    fn compile_binary(&mut self, e: &ast::BinaryExpr) -> Result<(), CompileError> {
        match e.op {
            BinaryToken::And => {
                self.compile_expr(&e.lhs)?;
                let jump_pos = self.emit(op::AND_JUMP, &[0]);
                self.compile_expr(&e.rhs)?;
                let end = self.len();
                self.patch_jump(jump_pos, end);
                return Ok(());
            }
            BinaryToken::Or => {
                self.compile_expr(&e.lhs)?;
                let jump_pos = self.emit(op::OR_JUMP, &[0]);
                self.compile_expr(&e.rhs)?;
                let end = self.len();
                self.patch_jump(jump_pos, end);
                return Ok(());
            }
            BinaryToken::NullCoalesce => {
                self.compile_expr(&e.lhs)?;
                let jump_pos = self.emit(op::JUMP_NOT_NIL, &[0]);
                self.compile_expr(&e.rhs)?;
                let end = self.len();
                self.patch_jump(jump_pos, end);
                return Ok(());
            }
            _ => {}
        }
        self.compile_expr(&e.lhs)?;
        self.compile_expr(&e.rhs)?;
        match e.op {
            BinaryToken::Eq => {
                self.emit_traced(op::EQUAL, &[], e.span);
            }
            BinaryToken::NotEq => {
                self.emit_traced(op::NOT_EQUAL, &[], e.span);
            }
            _ => {
                let code = match e.op {
                    BinaryToken::Add => bin_op::ADD,
                    BinaryToken::Sub => bin_op::SUB,
                    BinaryToken::Mul => bin_op::MUL,
                    BinaryToken::Div => bin_op::DIV,
                    BinaryToken::Mod => bin_op::MOD,
                    BinaryToken::Lt => bin_op::LT,
                    BinaryToken::Gt => bin_op::GT,
                    BinaryToken::LtEq => bin_op::LT_EQ,
                    BinaryToken::GtEq => bin_op::GT_EQ,
                    BinaryToken::And | BinaryToken::Or | BinaryToken::NullCoalesce => unreachable!(),
                    BinaryToken::Eq | BinaryToken::NotEq => unreachable!(),
                };
                self.emit_traced(op::BINARY_OP, &[code as usize], e.span);
            }
        }
        Ok(())
    }

    /// `a?.b`: short-circuits to `nil` without evaluating the selector if
    /// `a` is `nil`. Since there's no `Dup` opcode, `a`'s value is stashed
    /// in a synthetic local across the check so it's available for the
    /// actual field read on the non-nil path without recomputing `a`
    /// (which could have side effects).
    fn compile_nullish_selector(&mut self, e: &ast::NullishSelectorExpr) -> Result<(), CompileError> {
        self.compile_expr(&e.target)?;
        let temp_name = self.temp_name();
        let temp = self.symtab.define(&temp_name).expect("synthetic temp name cannot collide");
        self.emit_define(temp);
        self.emit_get(temp);
        let jump_nil_pos = self.emit(op::JUMP_NIL, &[0]);
        self.emit_get(temp);
        let key_idx = self.add_string_const(&e.field, false);
        self.emit(op::CONSTANT, &[key_idx]);
        self.emit_traced(op::GET_INDEX, &[1], e.span);
        let end = self.len();
        self.patch_jump(jump_nil_pos, end);
        Ok(())
    }

    pub(super) fn compile_call(&mut self, e: &ast::CallExpr, tail: bool) -> Result<(), CompileError> {
        self.compile_expr(&e.callee)?;

        let named_pairs: Vec<(&String, &Expr)> = e
            .args
            .iter()
            .filter_map(|a| match a {
                Arg::Named(name, expr) => Some((name, expr)),
                _ => None,
            })
            .collect();
        let named_spread = e.args.iter().find_map(|a| match a {
            Arg::NamedSpread(expr) => Some(expr),
            _ => None,
        });
        if named_spread.is_some() && !named_pairs.is_empty() {
            return Err(CompileError::new(
                "cannot mix named arguments with a named spread in the same call",
                self.pos_of(e.span),
            ));
        }
        let positional_count = e
            .args
            .iter()
            .filter(|a| matches!(a, Arg::Positional(_) | Arg::Spread(_)))
            .count();

        let mut flags = 0u8;
        let mut num_fixed_positional = 0usize;
        for (i, arg) in e.args.iter().enumerate() {
            match arg {
                Arg::Positional(expr) => {
                    self.compile_expr(expr)?;
                    num_fixed_positional += 1;
                }
                Arg::Spread(expr) => {
                    let is_last_positional = e.args[i + 1..]
                        .iter()
                        .all(|a| matches!(a, Arg::Named(..) | Arg::NamedSpread(_)));
                    if !is_last_positional || num_fixed_positional + 1 != positional_count {
                        return Err(CompileError::new(
                            "a spread argument must be the last positional argument",
                            self.pos_of(e.span),
                        ));
                    }
                    self.compile_expr(expr)?;
                    flags |= call_flag::VAR_ARGS;
                }
                Arg::Named(_, _) | Arg::NamedSpread(_) => {}
            }
        }

        if let Some(spread) = named_spread {
            self.compile_expr(spread)?;
            flags |= call_flag::NAMED_ARGS;
        } else if !named_pairs.is_empty() {
            for (name, value) in &named_pairs {
                let key_idx = self.add_string_const(name, false);
                self.emit(op::CONSTANT, &[key_idx]);
                self.compile_expr(value)?;
            }
            self.emit(op::DICT, &[named_pairs.len()]);
            flags |= call_flag::NAMED_ARGS;
        }

        if tail {
            flags |= call_flag::TAIL;
        }
        self.emit_traced(op::CALL, &[num_fixed_positional, flags as usize], e.span);
        Ok(())
    }

    pub(super) fn compile_func_lit(
        &mut self,
        f: &ast::FuncLit,
        _is_closure_hint: bool,
        self_name: Option<&str>,
    ) -> Result<(), CompileError> {
        self.enter_function_scope(self_name.map(str::to_string));
        for param in &f.params {
            self.symtab.define(&param.name).ok_or_else(|| {
                CompileError::new(format!("duplicate parameter name '{}'", param.name), self.pos_of(f.span))
            })?;
        }
        if f.variadic {
            // The trailing variadic parameter collects overflow into an
            // array at the VM's `push_call_frame`; it still needs a named
            // local slot to read it back from.
        }
        for named in &f.named_params {
            self.symtab.define(&named.name).ok_or_else(|| {
                CompileError::new(format!("duplicate parameter name '{}'", named.name), self.pos_of(f.span))
            })?;
        }
        if f.variadic_named {
            // ditto for the variadic named-argument dict slot.
        }

        // Positional defaults: `if local_is_nil { local = default }` for
        // every parameter with a default, emitted before the body so a
        // caller who omitted the argument sees it filled in.
        for (i, param) in f.params.iter().enumerate() {
            if let Some(default) = &param.default {
                let symbol = self.symtab.resolve(&param.name).expect("just defined");
                self.emit_get(symbol);
                let jump_not_nil = self.emit(op::JUMP_NOT_NIL, &[0]);
                self.compile_expr(default)?;
                self.emit_set(symbol)?;
                let after = self.len();
                self.patch_jump(jump_not_nil, after);
                let _ = i;
            }
        }
        for named in &f.named_params {
            if let Some(default) = &named.default {
                let symbol = self.symtab.resolve(&named.name).expect("just defined");
                self.emit_get(symbol);
                let jump_not_nil = self.emit(op::JUMP_NOT_NIL, &[0]);
                self.compile_expr(default)?;
                self.emit_set(symbol)?;
                let after = self.len();
                self.patch_jump(jump_not_nil, after);
            }
        }

        self.compile_stmts_with_tail(&f.body.stmts)?;
        self.emit(op::RETURN, &[1]);

        let pos = self.pos_of(f.span);
        let (mut compiled, free_symbols) = self.leave_function_scope(pos)?;
        compiled.num_parameters = f.params.len();
        compiled.num_required_parameters =
            f.params.iter().take_while(|p| p.default.is_none()).count();
        compiled.variadic = f.variadic;
        compiled.param_names = f.params.iter().map(|p| p.name.clone()).collect();
        compiled.named_param_names = f.named_params.iter().map(|p| p.name.clone()).collect();
        compiled.num_named_parameters = f.named_params.len();
        compiled.variadic_named = f.variadic_named;
        compiled.source_file = Some(std::rc::Rc::from(self.file_name.as_str()));

        for symbol in &free_symbols {
            match symbol.scope {
                crate::symtab::Scope::Local => {
                    self.emit(op::GET_LOCAL_PTR, &[symbol.index]);
                }
                crate::symtab::Scope::Free => {
                    self.emit(op::GET_FREE_PTR, &[symbol.index]);
                }
                other => unreachable!("free variable cannot resolve to {other:?}"),
            }
        }
        let const_idx = self.add_function_const(compiled);
        self.emit(op::CLOSURE, &[const_idx, free_symbols.len()]);
        Ok(())
    }

    fn compile_import(&mut self, e: &ast::ImportExpr) -> Result<(), CompileError> {
        let (module_name, file) = self
            .resolver
            .resolve(&self.file_name, &e.path)
            .map_err(|msg| CompileError::new(msg, self.pos_of(e.span)))?;
        let fn_idx = self.compile_imported_module(&file, &module_name)?;
        let name_idx = self.add_string_const(&module_name, false);
        self.emit_traced(op::LOAD_MODULE, &[name_idx, fn_idx], e.span);
        Ok(())
    }
}
