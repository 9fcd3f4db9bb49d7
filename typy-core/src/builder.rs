//! Translation of a concrete syntax tree into the AST.
//!
//! Every helper here is entered with the cursor focused on some node N
//! and, when it returns successfully, leaves the cursor focused on N
//! again. Callers iterate siblings with `next_sibling` and rely on
//! this. Descents go through `enter`/`leave`, which count the levels
//! below the starting node; the public entry points use that count to
//! climb back when a helper fails part way down.

use std::cell::Cell;

use crate::ast::{BinOp, Elif, Else, Expr, FunctionDef, Parameter, Stmt};
use crate::builtins::{BuiltinKind, find_builtin};
use crate::error::BuildError;
use crate::syntax::{Keyword, SyntaxKind, TreeCursor};
use crate::types::Type;

/// Deepest tree the builder walks before giving up with
/// [`BuildError::TreeTooDeep`].
pub const MAX_TREE_DEPTH: usize = 512;

/// Build the statements of a whole program.
///
/// `cursor` must be focused on the root (`Script`) node of a tree
/// whose spans index into `source`. The cursor is back on that node
/// when this returns, whether or not building succeeded.
pub fn build_program<C: TreeCursor>(source: &str, cursor: &mut C) -> Result<Vec<Stmt>, BuildError> {
    Builder::new(source).restoring(cursor, |builder, cursor| builder.program(cursor))
}

/// Build a single statement from the node in focus.
pub fn build_stmt<C: TreeCursor>(source: &str, cursor: &mut C) -> Result<Stmt, BuildError> {
    Builder::new(source).restoring(cursor, |builder, cursor| builder.stmt(cursor))
}

/// Build a single expression from the node in focus.
pub fn build_expr<C: TreeCursor>(source: &str, cursor: &mut C) -> Result<Expr, BuildError> {
    Builder::new(source).restoring(cursor, |builder, cursor| builder.expr(cursor))
}

struct Builder<'s> {
    source: &'s str,
    /// Levels the cursor currently sits below the starting node.
    depth: Cell<usize>,
}

impl<'s> Builder<'s> {
    fn new(source: &'s str) -> Self {
        Builder {
            source,
            depth: Cell::new(0),
        }
    }

    /// Run `build`, climbing back to the starting node if it fails.
    fn restoring<C, T>(
        &self,
        cursor: &mut C,
        build: impl FnOnce(&Self, &mut C) -> Result<T, BuildError>,
    ) -> Result<T, BuildError>
    where
        C: TreeCursor,
    {
        let result = build(self, cursor);
        if result.is_err() {
            for _ in 0..self.depth.replace(0) {
                cursor.parent();
            }
        }
        result
    }

    /// Move to the first child, reporting whether there was one.
    fn try_enter<C: TreeCursor>(&self, cursor: &mut C) -> Result<bool, BuildError> {
        let depth = self.depth.get();
        if depth >= MAX_TREE_DEPTH {
            return Err(BuildError::TreeTooDeep {
                limit: MAX_TREE_DEPTH,
                span: cursor.span(),
            });
        }
        let entered = cursor.first_child();
        if entered {
            self.depth.set(depth + 1);
        }
        Ok(entered)
    }

    /// Move to the first child of a node that must have one.
    fn enter<C: TreeCursor>(&self, cursor: &mut C) -> Result<(), BuildError> {
        if self.try_enter(cursor)? {
            Ok(())
        } else {
            Err(Self::unsupported(cursor))
        }
    }

    fn leave<C: TreeCursor>(&self, cursor: &mut C) {
        cursor.parent();
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    fn text<C: TreeCursor>(&self, cursor: &C) -> &'s str {
        cursor.span().text(self.source)
    }

    fn unsupported<C: TreeCursor>(cursor: &C) -> BuildError {
        BuildError::UnsupportedSyntax {
            kind: cursor.kind(),
            span: cursor.span(),
        }
    }

    fn program<C: TreeCursor>(&self, cursor: &mut C) -> Result<Vec<Stmt>, BuildError> {
        let mut stmts = Vec::new();
        if !self.try_enter(cursor)? {
            return Ok(stmts);
        }
        loop {
            stmts.push(self.stmt(cursor)?);
            if !cursor.next_sibling() {
                break;
            }
        }
        self.leave(cursor);
        Ok(stmts)
    }

    fn stmt<C: TreeCursor>(&self, cursor: &mut C) -> Result<Stmt, BuildError> {
        match cursor.kind() {
            SyntaxKind::ReturnStatement => {
                self.enter(cursor)?; // return keyword
                let value = if cursor.next_sibling() {
                    self.expr(cursor)?
                } else {
                    Expr::None
                };
                self.leave(cursor);
                Ok(Stmt::Return(value))
            }
            SyntaxKind::AssignStatement => {
                self.enter(cursor)?;
                let name = self.name(cursor)?;
                cursor.next_sibling();
                if cursor.kind() != SyntaxKind::AssignOp {
                    return Err(Self::unsupported(cursor));
                }
                cursor.next_sibling();
                let value = self.expr(cursor)?;
                self.leave(cursor);
                Ok(Stmt::Assign { name, value })
            }
            SyntaxKind::ExpressionStatement => {
                self.enter(cursor)?;
                let expr = self.expr(cursor)?;
                self.leave(cursor);
                Ok(Stmt::Expr(expr))
            }
            SyntaxKind::FunctionDefinition => {
                self.enter(cursor)?; // def
                cursor.next_sibling();
                let name = self.name(cursor)?;
                cursor.next_sibling();
                let params = self.params(cursor)?;
                cursor.next_sibling();
                let ret = if cursor.kind() == SyntaxKind::TypeDef {
                    let ty = self.type_def(cursor)?;
                    cursor.next_sibling();
                    ty
                } else {
                    Type::None
                };
                let body = self.body(cursor)?;
                self.leave(cursor);
                Ok(Stmt::Define(FunctionDef {
                    name,
                    params,
                    ret,
                    body,
                }))
            }
            SyntaxKind::IfStatement => {
                self.enter(cursor)?; // if
                cursor.next_sibling();
                let condition = self.expr(cursor)?;
                cursor.next_sibling();
                let body = self.body(cursor)?;
                let mut elifs = Vec::new();
                let mut orelse = None;
                while cursor.next_sibling() {
                    match cursor.kind() {
                        SyntaxKind::Keyword(Keyword::Elif) if orelse.is_none() => {
                            cursor.next_sibling();
                            let condition = self.expr(cursor)?;
                            cursor.next_sibling();
                            let body = self.body(cursor)?;
                            elifs.push(Elif { condition, body });
                        }
                        SyntaxKind::Keyword(Keyword::Else) if orelse.is_none() => {
                            cursor.next_sibling();
                            orelse = Some(Else {
                                body: self.body(cursor)?,
                            });
                        }
                        _ => return Err(Self::unsupported(cursor)),
                    }
                }
                self.leave(cursor);
                Ok(Stmt::If {
                    condition,
                    body,
                    elifs,
                    orelse,
                })
            }
            SyntaxKind::WhileStatement => {
                self.enter(cursor)?; // while
                cursor.next_sibling();
                let condition = self.expr(cursor)?;
                cursor.next_sibling();
                let body = self.body(cursor)?;
                if cursor.next_sibling() {
                    // while ... else
                    return Err(Self::unsupported(cursor));
                }
                self.leave(cursor);
                Ok(Stmt::While { condition, body })
            }
            SyntaxKind::PassStatement => Ok(Stmt::Pass),
            _ => Err(Self::unsupported(cursor)),
        }
    }

    /// `Body` node: a `:` followed by the block's statements.
    fn body<C: TreeCursor>(&self, cursor: &mut C) -> Result<Vec<Stmt>, BuildError> {
        if cursor.kind() != SyntaxKind::Body {
            return Err(Self::unsupported(cursor));
        }
        let mut stmts = Vec::new();
        self.enter(cursor)?; // :
        while cursor.next_sibling() {
            stmts.push(self.stmt(cursor)?);
        }
        self.leave(cursor);
        Ok(stmts)
    }

    fn name<C: TreeCursor>(&self, cursor: &C) -> Result<String, BuildError> {
        if cursor.kind() != SyntaxKind::VariableName {
            return Err(Self::unsupported(cursor));
        }
        Ok(self.text(cursor).to_string())
    }

    fn params<C: TreeCursor>(&self, cursor: &mut C) -> Result<Vec<Parameter>, BuildError> {
        if cursor.kind() != SyntaxKind::ParamList {
            return Err(Self::unsupported(cursor));
        }
        let mut params = Vec::new();
        self.enter(cursor)?; // (
        while cursor.next_sibling() {
            match cursor.kind() {
                SyntaxKind::VariableName => {
                    let name = self.text(cursor).to_string();
                    if !cursor.next_sibling() || cursor.kind() != SyntaxKind::TypeDef {
                        return Err(BuildError::MissingTypeAnnotation(name));
                    }
                    let ty = self.type_def(cursor)?;
                    params.push(Parameter { name, ty });
                }
                SyntaxKind::Comma | SyntaxKind::CloseParen => {}
                _ => return Err(Self::unsupported(cursor)),
            }
        }
        self.leave(cursor);
        Ok(params)
    }

    /// `TypeDef` node: `: name` for parameters, `-> name` for results.
    fn type_def<C: TreeCursor>(&self, cursor: &mut C) -> Result<Type, BuildError> {
        self.enter(cursor)?; // : or ->
        cursor.next_sibling();
        let ty = match cursor.kind() {
            SyntaxKind::VariableName | SyntaxKind::None => {
                let name = self.text(cursor);
                Type::from_annotation(name)
                    .ok_or_else(|| BuildError::UnknownType(name.to_string()))?
            }
            _ => return Err(BuildError::UnknownType(self.text(cursor).to_string())),
        };
        self.leave(cursor);
        Ok(ty)
    }

    fn expr<C: TreeCursor>(&self, cursor: &mut C) -> Result<Expr, BuildError> {
        match cursor.kind() {
            SyntaxKind::Number => {
                let text = self.text(cursor);
                let value = text
                    .parse::<i32>()
                    .map_err(|_| BuildError::InvalidNumber(text.to_string()))?;
                Ok(Expr::Number(value))
            }
            SyntaxKind::Boolean => Ok(Expr::Bool(self.text(cursor) == "True")),
            SyntaxKind::None => Ok(Expr::None),
            SyntaxKind::VariableName => Ok(Expr::Ident(self.text(cursor).to_string())),
            SyntaxKind::CallExpression => {
                self.enter(cursor)?;
                let name = self.name(cursor)?;
                cursor.next_sibling();
                let args = self.args(cursor)?;
                self.leave(cursor);
                call(name, args)
            }
            SyntaxKind::BinaryExpression => {
                self.enter(cursor)?;
                let left = self.expr(cursor)?;
                cursor.next_sibling();
                let text = self.text(cursor);
                let op = BinOp::from_symbol(text)
                    .ok_or_else(|| BuildError::UnknownOperator(text.to_string()))?;
                cursor.next_sibling();
                let right = self.expr(cursor)?;
                self.leave(cursor);
                Ok(Expr::binary(op, left, right))
            }
            SyntaxKind::UnaryExpression => {
                self.enter(cursor)?;
                let op = self.text(cursor);
                cursor.next_sibling();
                let expr = match op {
                    "-" if cursor.kind() == SyntaxKind::Number => {
                        let text = self.text(cursor);
                        negated_literal(text)
                            .ok_or_else(|| BuildError::InvalidNumber(format!("-{text}")))?
                    }
                    "-" => Expr::binary(BinOp::Sub, Expr::Number(0), self.expr(cursor)?),
                    "not" => Expr::Not(Box::new(self.expr(cursor)?)),
                    _ => return Err(BuildError::UnknownOperator(op.to_string())),
                };
                self.leave(cursor);
                Ok(expr)
            }
            SyntaxKind::ParenthesizedExpression => {
                self.enter(cursor)?; // (
                cursor.next_sibling();
                let inner = self.expr(cursor)?;
                self.leave(cursor);
                Ok(Expr::Paren(Box::new(inner)))
            }
            _ => Err(Self::unsupported(cursor)),
        }
    }

    fn args<C: TreeCursor>(&self, cursor: &mut C) -> Result<Vec<Expr>, BuildError> {
        if cursor.kind() != SyntaxKind::ArgList {
            return Err(Self::unsupported(cursor));
        }
        let mut args = Vec::new();
        self.enter(cursor)?; // (
        while cursor.next_sibling() {
            match cursor.kind() {
                SyntaxKind::Comma | SyntaxKind::CloseParen => {}
                _ => args.push(self.expr(cursor)?),
            }
        }
        self.leave(cursor);
        Ok(args)
    }
}

/// Classify a call against the builtin table.
fn call(name: String, args: Vec<Expr>) -> Result<Expr, BuildError> {
    let Some(builtin) = find_builtin(&name) else {
        return Ok(Expr::Call { name, args });
    };
    let arity_error = |got: usize| BuildError::BuiltinArity {
        name: builtin.name.to_string(),
        expected: builtin.arity(),
        got,
    };
    let expr = match builtin.kind {
        BuiltinKind::Unary(func) => match <[Expr; 1]>::try_from(args) {
            Ok([arg]) => Expr::Builtin1 {
                func,
                arg: Box::new(arg),
            },
            Err(args) => return Err(arity_error(args.len())),
        },
        BuiltinKind::Binary(func) => match <[Expr; 2]>::try_from(args) {
            Ok([left, right]) => Expr::Builtin2 {
                func,
                left: Box::new(left),
                right: Box::new(right),
            },
            Err(args) => return Err(arity_error(args.len())),
        },
    };
    Ok(expr)
}

/// Fold `-<digits>` into one literal; `-2147483648` is representable
/// even though `2147483648` is not.
fn negated_literal(digits: &str) -> Option<Expr> {
    let value = digits.parse::<i64>().ok()?;
    i32::try_from(-value).ok().map(Expr::Number)
}
