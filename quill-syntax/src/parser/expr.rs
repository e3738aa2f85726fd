use super::Parser;
use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::token::Token;

impl<'a> Parser<'a> {
    pub(super) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_null_coalesce()?;
        if self.eat(Token::Question)? {
            let then_expr = self.parse_expr()?;
            self.expect(Token::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = cond.span().merge(&else_expr.span());
            return Ok(Expr::Cond(Box::new(CondExpr {
                cond,
                then_expr,
                else_expr,
                span,
            })));
        }
        Ok(cond)
    }

    fn parse_null_coalesce(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_or()?;
        while self.at(Token::QuestionQuestion) {
            self.bump()?;
            let rhs = self.parse_or()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr {
                op: BinaryToken::NullCoalesce,
                lhs,
                rhs,
                span,
            }));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at(Token::OrOr) {
            self.bump()?;
            let rhs = self.parse_and()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr {
                op: BinaryToken::Or,
                lhs,
                rhs,
                span,
            }));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.at(Token::AndAnd) {
            self.bump()?;
            let rhs = self.parse_equality()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr {
                op: BinaryToken::And,
                lhs,
                rhs,
                span,
            }));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.current.token {
                Token::EqEq => BinaryToken::Eq,
                Token::NotEq => BinaryToken::NotEq,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_relational()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr { op, lhs, rhs, span }));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.current.token {
                Token::Lt => BinaryToken::Lt,
                Token::Gt => BinaryToken::Gt,
                Token::LtEq => BinaryToken::LtEq,
                Token::GtEq => BinaryToken::GtEq,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_additive()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr { op, lhs, rhs, span }));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current.token {
                Token::Plus => BinaryToken::Add,
                Token::Minus => BinaryToken::Sub,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr { op, lhs, rhs, span }));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current.token {
                Token::Star => BinaryToken::Mul,
                Token::Slash => BinaryToken::Div,
                Token::Percent => BinaryToken::Mod,
                _ => break,
            };
            self.bump()?;
            let rhs = self.parse_unary()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expr::Binary(Box::new(BinaryExpr { op, lhs, rhs, span }));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current.token {
            Token::Minus => Some(UnaryToken::Neg),
            Token::Bang => Some(UnaryToken::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.span();
            self.bump()?;
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span());
            return Ok(Expr::Unary(Box::new(UnaryExpr { op, operand, span })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.token {
                Token::Dot => {
                    self.bump()?;
                    let (field, fspan) = self.expect_ident()?;
                    let span = expr.span().merge(&fspan);
                    expr = Expr::Selector(Box::new(SelectorExpr {
                        target: expr,
                        field,
                        span,
                    }));
                }
                Token::QuestionDot => {
                    self.bump()?;
                    let (field, fspan) = self.expect_ident()?;
                    let span = expr.span().merge(&fspan);
                    expr = Expr::NullishSelector(Box::new(NullishSelectorExpr {
                        target: expr,
                        field,
                        span,
                    }));
                }
                Token::LParen => {
                    let args = self.parse_call_args()?;
                    let end = self.span();
                    let span = expr.span().merge(&end);
                    expr = Expr::Call(Box::new(CallExpr {
                        callee: expr,
                        args,
                        span,
                    }));
                }
                Token::LBracket => {
                    expr = self.parse_index_or_slice(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Arg>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while !self.at(Token::RParen) {
            if self.eat(Token::Ellipsis)? {
                args.push(Arg::Spread(self.parse_expr()?));
            } else if self.at(Token::Ident) && self.peek_is_colon_after_ident() {
                let (name, _) = self.expect_ident()?;
                self.expect(Token::Colon)?;
                args.push(Arg::Named(name, self.parse_expr()?));
            } else {
                args.push(Arg::Positional(self.parse_expr()?));
            }
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    /// Lookahead used only to disambiguate `name: expr` named arguments from
    /// a bare identifier expression; the lexer's one-token peek is enough
    /// here because named args only occur directly inside a call's argument
    /// list, immediately after a comma or the opening paren.
    fn peek_is_colon_after_ident(&mut self) -> bool {
        matches!(self.lexer.peek(), Some(Ok(t)) if t.token == Token::Colon)
    }

    fn parse_index_or_slice(&mut self, target: Expr) -> ParseResult<Expr> {
        self.expect(Token::LBracket)?;
        if self.eat(Token::Colon)? {
            let high = if self.at(Token::RBracket) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let end = self.expect(Token::RBracket)?;
            let span = target.span().merge(&end.span);
            return Ok(Expr::Slice(Box::new(SliceExpr {
                target,
                low: None,
                high,
                span,
            })));
        }
        let first = self.parse_expr()?;
        if self.eat(Token::Colon)? {
            let high = if self.at(Token::RBracket) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let end = self.expect(Token::RBracket)?;
            let span = target.span().merge(&end.span);
            return Ok(Expr::Slice(Box::new(SliceExpr {
                target,
                low: Some(first),
                high,
                span,
            })));
        }
        let mut indices = vec![first];
        while self.eat(Token::Comma)? {
            if self.at(Token::RBracket) {
                break;
            }
            indices.push(self.parse_expr()?);
        }
        let end = self.expect(Token::RBracket)?;
        let span = target.span().merge(&end.span);
        Ok(Expr::Index(Box::new(IndexExpr {
            target,
            indices,
            span,
        })))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let tok = self.current.clone();
        match tok.token {
            Token::Int => {
                self.bump()?;
                let value: i64 = tok.text.parse().map_err(|_| ParseError::InvalidNumber {
                    literal: tok.text.to_string(),
                    span: tok.span,
                })?;
                Ok(Expr::IntLit(IntLit {
                    value,
                    span: tok.span,
                }))
            }
            Token::Float | Token::FloatExp => {
                self.bump()?;
                let value: f64 = tok.text.parse().map_err(|_| ParseError::InvalidNumber {
                    literal: tok.text.to_string(),
                    span: tok.span,
                })?;
                Ok(Expr::FloatLit(FloatLit {
                    value,
                    span: tok.span,
                }))
            }
            Token::Str => {
                self.bump()?;
                Ok(Expr::StringLit(StringLit {
                    value: unescape_string(&tok.text[1..tok.text.len() - 1])?,
                    span: tok.span,
                }))
            }
            Token::RawStr => {
                self.bump()?;
                Ok(Expr::RawStringLit(StringLit {
                    value: tok.text[1..tok.text.len() - 1].to_string(),
                    span: tok.span,
                }))
            }
            Token::Char => {
                self.bump()?;
                let inner = &tok.text[1..tok.text.len() - 1];
                let value = unescape_char(inner, tok.span)?;
                Ok(Expr::CharLit(CharLit {
                    value,
                    span: tok.span,
                }))
            }
            Token::KwTrue => {
                self.bump()?;
                Ok(Expr::BoolLit(BoolLit {
                    value: true,
                    span: tok.span,
                }))
            }
            Token::KwFalse => {
                self.bump()?;
                Ok(Expr::BoolLit(BoolLit {
                    value: false,
                    span: tok.span,
                }))
            }
            Token::KwYes => {
                self.bump()?;
                Ok(Expr::FlagLit(FlagLit {
                    value: true,
                    span: tok.span,
                }))
            }
            Token::KwNo => {
                self.bump()?;
                Ok(Expr::FlagLit(FlagLit {
                    value: false,
                    span: tok.span,
                }))
            }
            Token::KwNil => {
                self.bump()?;
                Ok(Expr::NilLit(tok.span))
            }
            Token::Ident => {
                self.bump()?;
                Ok(Expr::Ident(IdentExpr {
                    name: tok.text.to_string(),
                    span: tok.span,
                }))
            }
            Token::LParen => {
                self.bump()?;
                let inner = self.parse_expr()?;
                let end = self.expect(Token::RParen)?;
                let span = tok.span.merge(&end.span);
                Ok(Expr::Paren(Box::new(ParenExpr { inner, span })))
            }
            Token::LBracket => {
                self.bump()?;
                let mut elements = Vec::new();
                while !self.at(Token::RBracket) {
                    elements.push(self.parse_expr()?);
                    if !self.eat(Token::Comma)? {
                        break;
                    }
                }
                let end = self.expect(Token::RBracket)?;
                let span = tok.span.merge(&end.span);
                Ok(Expr::ArrayLit(ArrayLit { elements, span }))
            }
            Token::LBrace => self.parse_dict_lit(),
            Token::KwFunc => self.parse_func_lit(),
            Token::KwImport => {
                self.bump()?;
                self.expect(Token::LParen)?;
                let path_tok = self.expect(Token::Str)?;
                self.expect(Token::RParen)?;
                let path = unescape_string(&path_tok.text[1..path_tok.text.len() - 1])?;
                let span = tok.span.merge(&path_tok.span);
                Ok(Expr::Import(Box::new(ImportExpr { path, span })))
            }
            Token::KwThrow => {
                self.bump()?;
                let value = self.parse_expr()?;
                let span = tok.span.merge(&value.span());
                Ok(Expr::Throw(Box::new(ThrowExpr { value, span })))
            }
            _ => Err(ParseError::unexpected_token(
                tok.token.describe(),
                "expression",
                tok.span,
            )),
        }
    }

    fn parse_dict_lit(&mut self) -> ParseResult<Expr> {
        let start = self.expect(Token::LBrace)?;
        let mut entries = Vec::new();
        while !self.at(Token::RBrace) {
            let key = self.parse_expr()?;
            if self.eat(Token::FatArrow)? || self.eat(Token::Colon)? {
                let value = self.parse_expr()?;
                entries.push((key, value));
            } else {
                return Err(ParseError::unexpected_token(
                    self.current.token.describe(),
                    "':' or '=>'",
                    self.span(),
                ));
            }
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        let end = self.expect(Token::RBrace)?;
        let span = start.span.merge(&end.span);
        Ok(Expr::DictLit(DictLit { entries, span }))
    }

    fn parse_func_lit(&mut self) -> ParseResult<Expr> {
        let start = self.expect(Token::KwFunc)?;
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        let mut named_params = Vec::new();
        let mut variadic_named = false;
        let mut in_named = false;
        while !self.at(Token::RParen) {
            if self.eat(Token::Semi)? {
                in_named = true;
                continue;
            }
            let is_variadic = self.eat(Token::Ellipsis)?;
            let (name, _) = self.expect_ident()?;
            let default = if self.eat(Token::Eq)? {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let param = Param { name, default };
            if in_named {
                if is_variadic {
                    variadic_named = true;
                }
                named_params.push(param);
            } else {
                if is_variadic {
                    variadic = true;
                }
                params.push(param);
            }
            if !self.eat(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;
        let span = start.span.merge(&body.span);
        Ok(Expr::FuncLit(Box::new(FuncLit {
            params,
            variadic,
            named_params,
            variadic_named,
            body,
            span,
        })))
    }
}

fn unescape_string(raw: &str) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn unescape_char(raw: &str, span: crate::span::Span) -> ParseResult<char> {
    if let Some(stripped) = raw.strip_prefix('\\') {
        let c = match stripped {
            "n" => '\n',
            "t" => '\t',
            "r" => '\r',
            "'" => '\'',
            "\\" => '\\',
            "0" => '\0',
            other => other.chars().next().ok_or(ParseError::InvalidEscape {
                sequence: raw.to_string(),
                span,
            })?,
        };
        Ok(c)
    } else {
        raw.chars().next().ok_or(ParseError::InvalidEscape {
            sequence: raw.to_string(),
            span,
        })
    }
}
