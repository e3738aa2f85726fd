//! Recursive-descent parser producing the AST in [`crate::ast`].

mod expr;
mod stmt;

use crate::ast::File;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, SpannedToken};
use crate::span::{SourceMap, Span};
use crate::token::Token;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: SpannedToken<'a>,
    eof_span: Span,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source);
        let eof_span = {
            let map: &SourceMap = lexer.source_map();
            map.span(source.len(), source.len())
        };
        let current = Self::advance_raw(&mut lexer, eof_span)?;
        Ok(Self {
            lexer,
            current,
            eof_span,
        })
    }

    pub fn parse_file(&mut self) -> ParseResult<File> {
        let mut stmts = Vec::new();
        while !self.at(Token::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(File { stmts })
    }

    fn advance_raw(lexer: &mut Lexer<'a>, eof_span: Span) -> ParseResult<SpannedToken<'a>> {
        match lexer.next_token() {
            Some(res) => res,
            None => Ok(SpannedToken {
                token: Token::Eof,
                span: eof_span,
                text: "",
            }),
        }
    }

    fn bump(&mut self) -> ParseResult<SpannedToken<'a>> {
        let next = Self::advance_raw(&mut self.lexer, self.eof_span)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn at(&self, tok: Token) -> bool {
        self.current.token == tok
    }

    fn span(&self) -> Span {
        self.current.span
    }

    fn expect(&mut self, tok: Token) -> ParseResult<SpannedToken<'a>> {
        if self.current.token == tok {
            self.bump()
        } else {
            Err(ParseError::unexpected_token(
                self.current.token.describe(),
                tok.describe(),
                self.current.span,
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(String, Span)> {
        if self.current.token == Token::Ident {
            let tok = self.bump()?;
            Ok((tok.text.to_string(), tok.span))
        } else {
            Err(ParseError::unexpected_token(
                self.current.token.describe(),
                "identifier",
                self.current.span,
            ))
        }
    }

    fn eat(&mut self, tok: Token) -> ParseResult<bool> {
        if self.at(tok) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Snapshots lexer + lookahead state so speculative parsing (used to
    /// disambiguate `for x in ...` from a C-style `for init; cond; post`)
    /// can be undone.
    fn checkpoint(&self) -> (Lexer<'a>, SpannedToken<'a>) {
        (self.lexer.clone(), self.current.clone())
    }

    fn restore(&mut self, checkpoint: (Lexer<'a>, SpannedToken<'a>)) {
        self.lexer = checkpoint.0;
        self.current = checkpoint.1;
    }
}

/// Parse a complete source file into an AST.
pub fn parse(source: &str) -> ParseResult<File> {
    let mut parser = Parser::new(source)?;
    parser.parse_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_file() {
        let file = parse("").unwrap();
        assert!(file.stmts.is_empty());
    }

    #[test]
    fn parses_var_decl() {
        let file = parse("var x = 1").unwrap();
        assert_eq!(file.stmts.len(), 1);
    }
}
