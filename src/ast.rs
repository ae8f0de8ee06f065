//! Syntax tree produced by the [`Parser`](crate::parser::Parser).
//!
//! Every node exclusively owns its children, so the tree is a strict
//! hierarchy released recursively when the [`Program`] is dropped.  The one
//! exception is a function declaration: its [`FunctionDecl`] lives behind an
//! `Rc` so the interpreter's function registry can keep the body alive after
//! the program that declared it has finished (REPL sessions rely on this).

use serde::Serialize;
use std::fmt;
use std::rc::Rc;

use crate::token::Operator;

/// 1‑based source position of the token a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Binary operators.  They share a single precedence level and fold left
/// to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Map an operator token to a binary operator.  `=` and `!` are not
    /// binary operators and yield `None`.
    pub fn from_operator(op: Operator) -> Option<Self> {
        let bin = match op {
            Operator::Plus => BinaryOp::Add,
            Operator::Minus => BinaryOp::Sub,
            Operator::Star => BinaryOp::Mul,
            Operator::Slash => BinaryOp::Div,
            Operator::Percent => BinaryOp::Mod,
            Operator::EqualEqual => BinaryOp::Eq,
            Operator::BangEqual => BinaryOp::Ne,
            Operator::Less => BinaryOp::Lt,
            Operator::LessEqual => BinaryOp::Le,
            Operator::Greater => BinaryOp::Gt,
            Operator::GreaterEqual => BinaryOp::Ge,
            Operator::AndAnd => BinaryOp::And,
            Operator::OrOr => BinaryOp::Or,
            Operator::Assign | Operator::Bang => return None,
        };

        Some(bin)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// `-x`
    Negate,

    /// `!x`
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(LiteralValue),

    /// Variable access, resolved through the scope chain at runtime.
    Variable { name: String, position: Position },

    /// `left op right`; `position` is the operator's.
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        position: Position,
        right: Box<Expr>,
    },

    /// Prefix operator expression, e.g. `-42` or `!ready`.
    Unary {
        operator: UnaryOp,
        position: Position,
        operand: Box<Expr>,
    },

    /// `name(arguments…)`.  Callees are always plain names.
    Call {
        name: String,
        position: Position,
        arguments: Vec<Expr>,
    },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// `name = value`
    Assign {
        name: String,
        position: Position,
        value: Box<Expr>,
    },
}

/// A user function as stored in the function registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub position: Position,
}

impl FunctionDecl {
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `输出 expression;`
    Print(Expr),

    /// `变量 name = init;` or `常量 name = init;`
    VarDecl {
        name: String,
        initializer: Expr,
        constant: bool,
        position: Position,
    },

    /// Braced scope `{ … }`.
    Block(Vec<Stmt>),

    /// `如果 (cond) { … } 否则 …`.  The else branch is either a `Block` or
    /// a nested `If` for `否则 如果`.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `循环 (cond) { … }`
    Loop { condition: Expr, body: Box<Stmt> },

    /// `函数 name(params…) { … }`
    Function(Rc<FunctionDecl>),

    /// `返回 value;` or a bare `返回;`
    Return {
        value: Option<Expr>,
        position: Position,
    },
}

/// Root node: the top‑level statements of one source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
