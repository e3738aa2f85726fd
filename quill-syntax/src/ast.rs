//! Abstract syntax tree produced by the parser and consumed by the compiler.
//!
//! The node set here is the contract between the parser (an external
//! collaborator relative to the compiler/VM core) and the compiler: every
//! node the compiler pattern-matches on is defined here, and nowhere else.

use crate::span::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Expr(ExprStmt),
    Decl(DeclStmt),
    Assign(AssignStmt),
    If(IfStmt),
    For(ForStmt),
    ForIn(ForInStmt),
    Return(ReturnStmt),
    Branch(BranchStmt),
    Block(BlockStmt),
    Try(TryStmt),
    Export(ExportStmt),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// `var name = expr` (global-eligible) declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclStmt {
    pub name: String,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: BlockStmt,
    pub else_stmt: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub post: Option<Box<Stmt>>,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForInStmt {
    pub key: Option<String>,
    pub value: String,
    pub iterable: Expr,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    Break,
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchStmt {
    pub kind: BranchKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryStmt {
    pub body: BlockStmt,
    pub catch_var: Option<String>,
    pub catch_block: Option<BlockStmt>,
    pub finally_block: Option<BlockStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStmt {
    pub names: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Ident(IdentExpr),
    IntLit(IntLit),
    UintLit(UintLit),
    FloatLit(FloatLit),
    BoolLit(BoolLit),
    FlagLit(FlagLit),
    CharLit(CharLit),
    StringLit(StringLit),
    RawStringLit(StringLit),
    NilLit(Span),
    ArrayLit(ArrayLit),
    DictLit(DictLit),
    KeyValueLit(Box<KeyValueLit>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Paren(Box<ParenExpr>),
    Index(Box<IndexExpr>),
    Slice(Box<SliceExpr>),
    Selector(Box<SelectorExpr>),
    NullishSelector(Box<NullishSelectorExpr>),
    Call(Box<CallExpr>),
    FuncLit(Box<FuncLit>),
    ClosureLit(Box<FuncLit>),
    Cond(Box<CondExpr>),
    Import(Box<ImportExpr>),
    Throw(Box<ThrowExpr>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(e) => e.span,
            Expr::IntLit(e) => e.span,
            Expr::UintLit(e) => e.span,
            Expr::FloatLit(e) => e.span,
            Expr::BoolLit(e) => e.span,
            Expr::FlagLit(e) => e.span,
            Expr::CharLit(e) => e.span,
            Expr::StringLit(e) => e.span,
            Expr::RawStringLit(e) => e.span,
            Expr::NilLit(s) => *s,
            Expr::ArrayLit(e) => e.span,
            Expr::DictLit(e) => e.span,
            Expr::KeyValueLit(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Paren(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Slice(e) => e.span,
            Expr::Selector(e) => e.span,
            Expr::NullishSelector(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::FuncLit(e) => e.span,
            Expr::ClosureLit(e) => e.span,
            Expr::Cond(e) => e.span,
            Expr::Import(e) => e.span,
            Expr::Throw(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UintLit {
    pub value: u64,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatLit {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

/// The alternate `yes`/`no` singleton boolean domain (see Value::Flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagLit {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharLit {
    pub value: char,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayLit {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictLit {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueLit {
    pub key: Expr,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryToken {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
    NullCoalesce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryToken,
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryToken {
    Neg,
    Not,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryToken,
    pub operand: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParenExpr {
    pub inner: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexExpr {
    pub target: Expr,
    pub indices: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceExpr {
    pub target: Expr,
    pub low: Option<Expr>,
    pub high: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorExpr {
    pub target: Expr,
    pub field: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullishSelectorExpr {
    pub target: Expr,
    pub field: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Arg {
    Positional(Expr),
    /// `name: value`
    Named(String, Expr),
    /// `...expr` splat of the final positional argument.
    Spread(Expr),
    /// `...expr` splat of a dict/named-arg carrier.
    NamedSpread(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Arg>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncLit {
    pub params: Vec<Param>,
    pub variadic: bool,
    pub named_params: Vec<Param>,
    pub variadic_named: bool,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondExpr {
    pub cond: Expr,
    pub then_expr: Expr,
    pub else_expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportExpr {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowExpr {
    pub value: Expr,
    pub span: Span,
}
