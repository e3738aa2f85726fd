//! Parse error types.

use crate::span::Span;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("unexpected token '{found}' at {span:?}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        span: Span,
    },

    #[error("unexpected end of input at {span:?}, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },

    #[error("invalid escape sequence '{sequence}' at {span:?}")]
    InvalidEscape { sequence: String, span: Span },

    #[error("unterminated string literal starting at {span:?}")]
    UnterminatedString { span: Span },

    #[error("invalid number literal '{literal}' at {span:?}")]
    InvalidNumber { literal: String, span: Span },

    #[error("mismatched brackets: expected '{expected}', found '{found}' at {span:?}")]
    MismatchedBrackets {
        expected: char,
        found: char,
        span: Span,
    },

    #[error("{message} at {span:?}")]
    InvalidSyntax { message: String, span: Span },

    #[error("unrecognized token at {span:?}")]
    LexerError { span: Span },
}

impl ParseError {
    pub fn span(&self) -> Option<&Span> {
        match self {
            ParseError::UnexpectedToken { span, .. } => Some(span),
            ParseError::UnexpectedEof { span, .. } => Some(span),
            ParseError::InvalidEscape { span, .. } => Some(span),
            ParseError::UnterminatedString { span } => Some(span),
            ParseError::InvalidNumber { span, .. } => Some(span),
            ParseError::MismatchedBrackets { span, .. } => Some(span),
            ParseError::InvalidSyntax { span, .. } => Some(span),
            ParseError::LexerError { span } => Some(span),
        }
    }

    pub fn unexpected_token(
        found: impl Into<String>,
        expected: impl Into<String>,
        span: Span,
    ) -> Self {
        ParseError::UnexpectedToken {
            found: found.into(),
            expected: expected.into(),
            span,
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        ParseError::UnexpectedEof {
            expected: expected.into(),
            span,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError::InvalidSyntax {
            message: message.into(),
            span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_token_carries_span() {
        let span = Span::new(0, 5, 1, 1, 1, 6);
        let err = ParseError::unexpected_token("foo", "bar", span);
        assert!(err.span().is_some());
        assert!(err.to_string().contains("foo"));
    }
}
