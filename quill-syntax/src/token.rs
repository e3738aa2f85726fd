//! Token definitions for the Quill lexer.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // ==================== Keywords ====================
    #[token("var")]
    KwVar,
    #[token("func")]
    KwFunc,
    #[token("if")]
    KwIf,
    #[token("else")]
    KwElse,
    #[token("for")]
    KwFor,
    #[token("in")]
    KwIn,
    #[token("break")]
    KwBreak,
    #[token("continue")]
    KwContinue,
    #[token("return")]
    KwReturn,
    #[token("try")]
    KwTry,
    #[token("catch")]
    KwCatch,
    #[token("finally")]
    KwFinally,
    #[token("throw")]
    KwThrow,
    #[token("import")]
    KwImport,
    #[token("nil")]
    KwNil,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,
    #[token("yes")]
    KwYes,
    #[token("no")]
    KwNo,
    #[token("export")]
    KwExport,

    // ==================== Literals ====================
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", priority = 3)]
    Float,
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    FloatExp,
    #[regex(r"[0-9]+", priority = 2)]
    Int,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r"`[^`]*`")]
    RawStr,
    #[regex(r"'([^'\\]|\\.)'")]
    Char,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // ==================== Operators & punctuation ====================
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    QuestionQuestion,
    #[token("?.")]
    QuestionDot,
    #[token("=>")]
    FatArrow,
    #[token("...")]
    Ellipsis,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,

    Eof,
}

impl Token {
    pub fn describe(&self) -> &'static str {
        match self {
            Token::KwVar => "'var'",
            Token::KwFunc => "'func'",
            Token::KwIf => "'if'",
            Token::KwElse => "'else'",
            Token::KwFor => "'for'",
            Token::KwIn => "'in'",
            Token::KwBreak => "'break'",
            Token::KwContinue => "'continue'",
            Token::KwReturn => "'return'",
            Token::KwTry => "'try'",
            Token::KwCatch => "'catch'",
            Token::KwFinally => "'finally'",
            Token::KwThrow => "'throw'",
            Token::KwImport => "'import'",
            Token::KwNil => "'nil'",
            Token::KwTrue => "'true'",
            Token::KwFalse => "'false'",
            Token::KwYes => "'yes'",
            Token::KwNo => "'no'",
            Token::KwExport => "'export'",
            Token::Float | Token::FloatExp => "float literal",
            Token::Int => "int literal",
            Token::Str => "string literal",
            Token::RawStr => "raw string literal",
            Token::Char => "char literal",
            Token::Ident => "identifier",
            Token::Eof => "end of input",
            _ => "operator",
        }
    }
}
