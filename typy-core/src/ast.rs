//! Abstract syntax tree shared by the builder, the type checker and
//! the code generator.
//!
//! The tree is built once per compilation and never mutated
//! afterwards. Every node exclusively owns its children.

use std::fmt;

use crate::builtins::{Builtin1, Builtin2};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Parameter>,
    /// Declared result type; `None` when the definition has no `->`.
    pub ret: Type,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elif {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Else {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign {
        name: String,
        value: Expr,
    },
    /// Evaluated for effect. As the last top-level statement its value
    /// becomes the program result.
    Expr(Expr),
    Define(FunctionDef),
    Return(Expr),
    Pass,
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    If {
        condition: Expr,
        body: Vec<Stmt>,
        elifs: Vec<Elif>,
        orelse: Option<Else>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    IntDiv,
    Mod,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    Is,
}

impl BinOp {
    /// Map operator text to an operator.
    pub fn from_symbol(text: &str) -> Option<BinOp> {
        let op = match text {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "//" => BinOp::IntDiv,
            "%" => BinOp::Mod,
            "==" => BinOp::Eq,
            "!=" => BinOp::Neq,
            "<" => BinOp::Lt,
            ">" => BinOp::Gt,
            "<=" => BinOp::Lte,
            ">=" => BinOp::Gte,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            "is" => BinOp::Is,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::IntDiv => "//",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Lte => "<=",
            BinOp::Gte => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Is => "is",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::IntDiv | BinOp::Mod
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i32),
    Bool(bool),
    None,
    Ident(String),
    /// Call of a user-defined function.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Builtin1 {
        func: Builtin1,
        arg: Box<Expr>,
    },
    Builtin2 {
        func: Builtin2,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// Parenthesized expression, kept for fidelity and erased by codegen.
    Paren(Box<Expr>),
}

impl Expr {
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl Stmt {
    /// Target name if this statement is an assignment.
    pub fn assigned_name(&self) -> Option<&str> {
        match self {
            Stmt::Assign { name, .. } => Some(name),
            _ => None,
        }
    }
}
