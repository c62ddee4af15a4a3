use crate::span::Spanned;
use internment::Intern;
use std::fmt::Display;

pub type ExprNode = Spanned<Expr>;
pub type StmtNode = Spanned<Stmt>;
pub type BlockNode = Spanned<Block>;
pub type DeclarationNode = Spanned<Declaration>;
pub type AssignmentNode = Spanned<Assignment>;
pub type IfNode = Spanned<If>;
pub type WhileNode = Spanned<While>;
pub type ForNode = Spanned<For>;
pub type WriteNode = Spanned<Write>;
pub type ReadNode = Spanned<Read>;
pub type BinaryNode = Spanned<Binary>;
pub type ComparisonNode = Spanned<Comparison>;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<StmtNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Declaration(DeclarationNode),
    Assignment(AssignmentNode),
    If(IfNode),
    While(WhileNode),
    For(ForNode),
    Write(WriteNode),
    Read(ReadNode),
}

/// Identifies an expression or a variable occurrence within one program.
/// Handed out by the parser, used as the key of the analysis side tables.
#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq, Default)]
pub struct NodeId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Hash, Eq)]
pub struct Ident(pub Intern<String>);

impl Ident {
    pub fn new(name: &str) -> Self {
        Self(Intern::new(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A variable name at a binding or assignment site.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Var {
    pub name: Ident,
    pub id: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Decimal,
    Text,
}

impl Type {
    pub fn is_num(&self) -> bool {
        matches!(self, Type::Integer | Type::Decimal)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer => write!(f, "inteiro"),
            Type::Decimal => write!(f, "decimal"),
            Type::Text => write!(f, "texto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind, id: NodeId) -> Self {
        Self { id, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    Lit(Lit),
    Binary(BinaryNode),
    Comparison(ComparisonNode),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Integer(i64),
    /// Kept as written so the generated code reproduces the literal exactly.
    Decimal(Intern<String>),
    Text(String),
}

impl Lit {
    pub fn ty(&self) -> Type {
        match self {
            Lit::Integer(_) => Type::Integer,
            Lit::Decimal(_) => Type::Decimal,
            Lit::Text(_) => Type::Text,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Display for ArithOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    LessThan,
    GreaterThan,
    LessThanEq,
    GreaterThanEq,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::LessThan => write!(f, "<"),
            CompareOp::GreaterThan => write!(f, ">"),
            CompareOp::LessThanEq => write!(f, "<="),
            CompareOp::GreaterThanEq => write!(f, ">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub left: Box<ExprNode>,
    pub op: ArithOp,
    pub right: Box<ExprNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Box<ExprNode>,
    pub op: CompareOp,
    pub right: Box<ExprNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<StmtNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub var: Var,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Var,
    pub value: ExprNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: ExprNode,
    pub then_block: BlockNode,
    pub else_block: Option<BlockNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub cond: ExprNode,
    pub body: BlockNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub init: AssignmentNode,
    pub cond: ExprNode,
    pub step: AssignmentNode,
    pub body: BlockNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub value: ExprNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Read {
    pub target: Var,
}
