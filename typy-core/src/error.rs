use thiserror::Error;

use crate::ast::BinOp;
use crate::span::Span;
use crate::syntax::SyntaxKind;
use crate::types::Type;

/// Raised by the bundled front end when source text does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at byte {position}: {message}")]
pub struct SyntaxError {
    pub position: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        SyntaxError {
            position,
            message: message.into(),
        }
    }
}

/// The concrete tree contains a shape the builder does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("unsupported syntax {kind} at {span}")]
    UnsupportedSyntax { kind: SyntaxKind, span: Span },
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("parameter '{0}' is missing a type annotation")]
    MissingTypeAnnotation(String),
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("integer literal '{0}' does not fit in i32")]
    InvalidNumber(String),
    #[error("builtin '{name}' expects {expected} arguments but received {got}")]
    BuiltinArity {
        name: String,
        expected: usize,
        got: usize,
    },    #[error("syntax tree is nested more than {limit} levels deep at {span}")]
    TreeTooDeep { limit: usize, span: Span },
}

/// The program is well formed but ill typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("function '{name}' expects {expected} arguments but received {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("argument {position} of '{name}' has type {got}, expected {expected}")]
    ArgumentTypeMismatch {
        name: String,
        position: usize,
        expected: Type,
        got: Type,
    },
    #[error("cannot assign {new} to '{name}' of type {old}")]
    TypeConflict { name: String, old: Type, new: Type },
    #[error("{got} returned but {expected} expected")]
    ReturnTypeMismatch { expected: Type, got: Type },
    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    OperandTypeMismatch { op: BinOp, left: Type, right: Type },
    #[error("'not' cannot be applied to {0}")]
    InvalidNotOperand(Type),
    #[error("condition has type {0}, expected bool")]
    ConditionNotBoolean(Type),
    #[error("'return' outside of a function")]
    ReturnOutsideFunction,
    #[error("function '{0}' must be defined at the top level")]
    NestedFunction(String),
    #[error("function '{0}' is defined twice")]
    DuplicateFunction(String),
    #[error("parameter '{name}' appears twice in '{function}'")]
    DuplicateParameter { function: String, name: String },
    #[error("'{0}' is a reserved name")]
    ReservedName(String),
}

/// The generator was handed an AST it cannot translate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    #[error("operator '{0}' is not supported by the wasm backend")]
    UnsupportedOperator(BinOp),
    #[error("internal codegen error: unresolved name '{0}'")]
    UnresolvedName(String),
    #[error("internal codegen error: nested function '{0}'")]
    NestedFunction(String),
    #[error("internal codegen error: 'return' outside of a function")]
    ReturnOutsideFunction,
    #[error("failed to print module: {0}")]
    Print(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
    #[error("codegen error: {0}")]
    Codegen(#[from] CodegenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = CoreError::from(TypeError::ArityMismatch {
            name: "add".to_string(),
            expected: 2,
            got: 1,
        });
        assert_eq!(
            err.to_string(),
            "type error: function 'add' expects 2 arguments but received 1"
        );

        let err = CoreError::from(BuildError::UnknownType("str".to_string()));
        assert_eq!(err.to_string(), "build error: unknown type 'str'");
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = CoreError::from(SyntaxError::new(7, "unexpected ')'"));
        assert_eq!(err.to_string(), "syntax error at byte 7: unexpected ')'");
    }
}
