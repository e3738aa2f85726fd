//! Wraps the logos-generated token stream with span tracking and a
//! one-token lookahead, which the recursive-descent parser relies on.

use logos::Logos;

use crate::error::ParseError;
use crate::span::{SourceMap, Span};
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct SpannedToken<'a> {
    pub token: Token,
    pub span: Span,
    pub text: &'a str,
}

#[derive(Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    source_map: SourceMap,
    peeked: Option<Option<Result<SpannedToken<'a>, ParseError>>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            source_map: SourceMap::new(source),
            peeked: None,
        }
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn peek(&mut self) -> Option<&Result<SpannedToken<'a>, ParseError>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_internal());
        }
        self.peeked.as_ref().unwrap().as_ref()
    }

    pub fn next_token(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }
        self.next_internal()
    }

    fn next_internal(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        let result = self.inner.next()?;
        let span = self.inner.span();
        let text = &self.source[span.start..span.end];
        match result {
            Ok(token) => Some(Ok(SpannedToken {
                token,
                span: self.source_map.span(span.start, span.end),
                text,
            })),
            Err(()) => Some(Err(ParseError::LexerError {
                span: self.source_map.span(span.start, span.end),
            })),
        }
    }
}
