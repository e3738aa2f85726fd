use super::Parser;
use crate::ast::*;
use crate::error::ParseResult;
use crate::token::Token;

impl<'a> Parser<'a> {
    pub(super) fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let stmt = match self.current.token {
            Token::KwVar => self.parse_decl_stmt()?,
            Token::KwIf => self.parse_if_stmt()?,
            Token::KwFor => self.parse_for_stmt()?,
            Token::KwReturn => self.parse_return_stmt()?,
            Token::KwBreak => {
                let span = self.span();
                self.bump()?;
                Stmt::Branch(BranchStmt {
                    kind: BranchKind::Break,
                    span,
                })
            }
            Token::KwContinue => {
                let span = self.span();
                self.bump()?;
                Stmt::Branch(BranchStmt {
                    kind: BranchKind::Continue,
                    span,
                })
            }
            Token::KwTry => self.parse_try_stmt()?,
            Token::KwExport => self.parse_export_stmt()?,
            Token::LBrace => Stmt::Block(self.parse_block()?),
            _ => self.parse_simple_stmt()?,
        };
        self.eat(Token::Semi)?;
        Ok(stmt)
    }

    pub(super) fn parse_block(&mut self) -> ParseResult<BlockStmt> {
        let start = self.expect(Token::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(Token::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(Token::RBrace)?;
        Ok(BlockStmt {
            stmts,
            span: start.span.merge(&end.span),
        })
    }

    fn parse_decl_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Token::KwVar)?;
        let (name, name_span) = self.expect_ident()?;
        let (value, span) = if self.eat(Token::Eq)? {
            let value = self.parse_expr()?;
            let span = start.span.merge(&value.span());
            (Some(value), span)
        } else {
            (None, start.span.merge(&name_span))
        };
        Ok(Stmt::Decl(DeclStmt { name, value, span }))
    }

    fn parse_if_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Token::KwIf)?;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let mut span = start.span.merge(&then_block.span);
        let else_stmt = if self.eat(Token::KwElse)? {
            let stmt = if self.at(Token::KwIf) {
                self.parse_if_stmt()?
            } else {
                Stmt::Block(self.parse_block()?)
            };
            span = span.merge(&stmt_span(&stmt));
            Some(Box::new(stmt))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            cond,
            then_block,
            else_stmt,
            span,
        }))
    }

    fn parse_for_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Token::KwFor)?;
        // for-in: `for x in iterable { }` or `for k, v in iterable { }`
        if self.at(Token::Ident) {
            let checkpoint = self.checkpoint();
            match self.try_parse_for_in_header() {
                Some((key, value)) => {
                    let iterable = self.parse_expr()?;
                    let body = self.parse_block()?;
                    let span = start.span.merge(&body.span);
                    return Ok(Stmt::ForIn(ForInStmt {
                        key,
                        value,
                        iterable,
                        body,
                        span,
                    }));
                }
                None => self.restore(checkpoint),
            }
        }
        // C-style: `for init; cond; post { }`
        let init = if self.at(Token::Semi) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };
        self.expect(Token::Semi)?;
        let cond = if self.at(Token::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(Token::Semi)?;
        let post = if self.at(Token::LBrace) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };
        let body = self.parse_block()?;
        let span = start.span.merge(&body.span);
        Ok(Stmt::For(ForStmt {
            init,
            cond,
            post,
            body,
            span,
        }))
    }

    /// Speculatively reads `ident [, ident] in` ahead of the iterable
    /// expression. Returns `None` (leaving the parser state for the caller
    /// to restore via the checkpoint it took) when this doesn't look like
    /// a for-in header, so the caller can fall back to C-style parsing.
    fn try_parse_for_in_header(&mut self) -> Option<(Option<String>, String)> {
        let (first, _) = self.expect_ident().ok()?;
        if self.eat(Token::Comma).ok()? {
            let (second, _) = self.expect_ident().ok()?;
            self.eat(Token::KwIn).ok()?.then_some(())?;
            return Some((Some(first), second));
        }
        if self.eat(Token::KwIn).ok()? {
            return Some((None, first));
        }
        None
    }

    fn parse_return_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Token::KwReturn)?;
        if self.at(Token::Semi) || self.at(Token::RBrace) {
            return Ok(Stmt::Return(ReturnStmt {
                value: None,
                span: start.span,
            }));
        }
        let value = self.parse_expr()?;
        let span = start.span.merge(&value.span());
        Ok(Stmt::Return(ReturnStmt {
            value: Some(value),
            span,
        }))
    }

    fn parse_try_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Token::KwTry)?;
        let body = self.parse_block()?;
        let mut span = start.span.merge(&body.span);
        let mut catch_var = None;
        let mut catch_block = None;
        if self.eat(Token::KwCatch)? {
            if self.at(Token::Ident) {
                let (name, _) = self.expect_ident()?;
                catch_var = Some(name);
            }
            let block = self.parse_block()?;
            span = span.merge(&block.span);
            catch_block = Some(block);
        }
        let mut finally_block = None;
        if self.eat(Token::KwFinally)? {
            let block = self.parse_block()?;
            span = span.merge(&block.span);
            finally_block = Some(block);
        }
        Ok(Stmt::Try(TryStmt {
            body,
            catch_var,
            catch_block,
            finally_block,
            span,
        }))
    }

    fn parse_export_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Token::KwExport)?;
        let mut names = Vec::new();
        let (name, mut span) = self.expect_ident()?;
        names.push(name);
        span = start.span.merge(&span);
        while self.eat(Token::Comma)? {
            let (name, nspan) = self.expect_ident()?;
            names.push(name);
            span = span.merge(&nspan);
        }
        Ok(Stmt::Export(ExportStmt { names, span }))
    }

    /// Parses an expression statement or an assignment (including
    /// compound assignment and `++`/`--`, which desugar to `+= 1`/`-= 1`).
    pub(super) fn parse_simple_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expr()?;
        let op = match self.current.token {
            Token::Eq => Some(AssignOp::Assign),
            Token::PlusEq => Some(AssignOp::Add),
            Token::MinusEq => Some(AssignOp::Sub),
            Token::StarEq => Some(AssignOp::Mul),
            Token::SlashEq => Some(AssignOp::Div),
            Token::PercentEq => Some(AssignOp::Mod),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let value = self.parse_expr()?;
            let span = expr.span().merge(&value.span());
            return Ok(Stmt::Assign(AssignStmt {
                target: expr,
                op,
                value,
                span,
            }));
        }
        if self.at(Token::PlusPlus) || self.at(Token::MinusMinus) {
            let inc = self.at(Token::PlusPlus);
            let opspan = self.span();
            self.bump()?;
            let span = expr.span().merge(&opspan);
            let one = Expr::IntLit(IntLit { value: 1, span });
            return Ok(Stmt::Assign(AssignStmt {
                target: expr,
                op: if inc { AssignOp::Add } else { AssignOp::Sub },
                value: one,
                span,
            }));
        }
        let span = expr.span();
        Ok(Stmt::Expr(ExprStmt { expr, span }))
    }
}

fn stmt_span(stmt: &Stmt) -> crate::span::Span {
    match stmt {
        Stmt::Expr(s) => s.span,
        Stmt::Decl(s) => s.span,
        Stmt::Assign(s) => s.span,
        Stmt::If(s) => s.span,
        Stmt::For(s) => s.span,
        Stmt::ForIn(s) => s.span,
        Stmt::Return(s) => s.span,
        Stmt::Branch(s) => s.span,
        Stmt::Block(s) => s.span,
        Stmt::Try(s) => s.span,
        Stmt::Export(s) => s.span,
    }
}
