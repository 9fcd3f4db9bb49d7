//! Static type checking.
//!
//! Two environments are involved:
//!
//! - the function table, built from every top-level definition
//!   before anything else is checked;
//! - a variable environment per lexical scope. Entering a function,
//!   conditional or loop body *copies* the enclosing environment, so
//!   bindings made inside never escape it.
//!
//! Checking is fail fast: the first error in left-to-right, depth-first
//! order is returned.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::ast::{BinOp, Expr, FunctionDef, Stmt};
use crate::builtins::{Builtin1, is_builtin};
use crate::error::TypeError;
use crate::types::Type;

/// Local reserved by the code generator for expression statements.
pub const SCRATCH_LOCAL: &str = "scratch";

/// Declared signature of a user-defined function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Types known after a successful check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramTypes {
    pub functions: BTreeMap<String, FunctionSignature>,
    /// Bindings of the top-level environment once all statements ran.
    pub globals: BTreeMap<String, Type>,
}

/// Type-check a whole program.
pub fn check_program(program: &[Stmt]) -> Result<ProgramTypes, TypeError> {
    let checker = TypeChecker::new(program)?;
    let mut globals = TypeEnv::default();
    for stmt in program {
        match stmt {
            Stmt::Define(def) => checker.check_function(def, &globals)?,
            other => checker.check_stmt(other, &mut globals, None)?,
        }
    }
    Ok(ProgramTypes {
        functions: checker.functions.into_iter().collect(),
        globals: globals.vars.into_iter().collect(),
    })
}

/// Variable environment of one scope.
///
/// Cloning produces the snapshot used for nested bodies.
#[derive(Debug, Clone, Default)]
struct TypeEnv {
    vars: HashMap<String, Type>,
}

impl TypeEnv {
    fn lookup(&self, name: &str) -> Option<Type> {
        self.vars.get(name).copied()
    }

    fn bind(&mut self, name: &str, ty: Type) {
        self.vars.insert(name.to_string(), ty);
    }
}

struct TypeChecker {
    functions: HashMap<String, FunctionSignature>,
}

impl TypeChecker {
    /// Register every top-level definition.
    fn new(program: &[Stmt]) -> Result<Self, TypeError> {
        let mut functions = HashMap::new();
        for stmt in program {
            let Stmt::Define(def) = stmt else { continue };
            if is_builtin(&def.name) {
                return Err(TypeError::ReservedName(def.name.clone()));
            }
            let signature = FunctionSignature {
                params: def.params.iter().map(|p| p.ty).collect(),
                ret: def.ret,
            };
            if functions.insert(def.name.clone(), signature).is_some() {
                return Err(TypeError::DuplicateFunction(def.name.clone()));
            }
        }
        Ok(TypeChecker { functions })
    }

    fn check_function(&self, def: &FunctionDef, enclosing: &TypeEnv) -> Result<(), TypeError> {
        let mut scope = enclosing.clone();
        let mut seen = Vec::with_capacity(def.params.len());
        for param in &def.params {
            if param.name == SCRATCH_LOCAL {
                return Err(TypeError::ReservedName(param.name.clone()));
            }
            if seen.contains(&param.name.as_str()) {
                return Err(TypeError::DuplicateParameter {
                    function: def.name.clone(),
                    name: param.name.clone(),
                });
            }
            seen.push(param.name.as_str());
            scope.bind(&param.name, param.ty);
        }
        trace!(function = %def.name, "checking function body");
        for stmt in &def.body {
            self.check_stmt(stmt, &mut scope, Some(def.ret))?;
        }
        Ok(())
    }

    /// Check `stmt` in `env`. `expected_return` is `None` outside of
    /// function bodies.
    fn check_stmt(
        &self,
        stmt: &Stmt,
        env: &mut TypeEnv,
        expected_return: Option<Type>,
    ) -> Result<(), TypeError> {
        match stmt {
            Stmt::Assign { name, value } => {
                if name == SCRATCH_LOCAL {
                    return Err(TypeError::ReservedName(name.clone()));
                }
                let new = self.type_of(value, env)?;
                match env.lookup(name) {
                    Some(old) if old != new => Err(TypeError::TypeConflict {
                        name: name.clone(),
                        old,
                        new,
                    }),
                    _ => {
                        env.bind(name, new);
                        Ok(())
                    }
                }
            }
            Stmt::Expr(expr) => self.type_of(expr, env).map(|_| ()),
            Stmt::Define(def) => Err(TypeError::NestedFunction(def.name.clone())),
            Stmt::Return(value) => {
                let expected = expected_return.ok_or(TypeError::ReturnOutsideFunction)?;
                let got = self.type_of(value, env)?;
                if got != expected {
                    return Err(TypeError::ReturnTypeMismatch { expected, got });
                }
                Ok(())
            }
            Stmt::Pass => Ok(()),
            Stmt::While { condition, body } => {
                self.check_condition(condition, env)?;
                self.check_block(body, env, expected_return)
            }
            Stmt::If {
                condition,
                body,
                elifs,
                orelse,
            } => {
                self.check_condition(condition, env)?;
                self.check_block(body, env, expected_return)?;
                for elif in elifs {
                    self.check_condition(&elif.condition, env)?;
                    self.check_block(&elif.body, env, expected_return)?;
                }
                if let Some(orelse) = orelse {
                    self.check_block(&orelse.body, env, expected_return)?;
                }
                Ok(())
            }
        }
    }

    fn check_condition(&self, condition: &Expr, env: &TypeEnv) -> Result<(), TypeError> {
        match self.type_of(condition, env)? {
            Type::Boolean => Ok(()),
            other => Err(TypeError::ConditionNotBoolean(other)),
        }
    }

    /// Check a conditional or loop body in a snapshot of `env`.
    ///
    /// The snapshot is pre-seeded with the types of direct assignments
    /// whose value can be typed without an environment, so statements
    /// in the block may refer to them before the assignment runs.
    fn check_block(
        &self,
        body: &[Stmt],
        env: &TypeEnv,
        expected_return: Option<Type>,
    ) -> Result<(), TypeError> {
        let mut scope = env.clone();
        for stmt in body {
            let Stmt::Assign { name, value } = stmt else { continue };
            if let Some(ty) = self.literal_type(value) {
                scope.vars.entry(name.clone()).or_insert(ty);
            }
        }
        trace!(bindings = scope.vars.len(), "entering block scope");
        for stmt in body {
            self.check_stmt(stmt, &mut scope, expected_return)?;
        }
        Ok(())
    }

    /// Type of literals and user-function calls, without consulting any
    /// variable environment.
    fn literal_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Number(_) => Some(Type::Int),
            Expr::Bool(_) => Some(Type::Boolean),
            Expr::None => Some(Type::None),
            Expr::Call { name, .. } => self.functions.get(name).map(|f| f.ret),
            Expr::Paren(inner) => self.literal_type(inner),
            _ => None,
        }
    }

    fn type_of(&self, expr: &Expr, env: &TypeEnv) -> Result<Type, TypeError> {
        match expr {
            Expr::Number(_) => Ok(Type::Int),
            Expr::Bool(_) => Ok(Type::Boolean),
            Expr::None => Ok(Type::None),
            Expr::Ident(name) => env
                .lookup(name)
                .ok_or_else(|| TypeError::UndefinedVariable(name.clone())),
            Expr::Call { name, args } => {
                let signature = self
                    .functions
                    .get(name)
                    .ok_or_else(|| TypeError::UndefinedFunction(name.clone()))?;
                if signature.params.len() != args.len() {
                    return Err(TypeError::ArityMismatch {
                        name: name.clone(),
                        expected: signature.params.len(),
                        got: args.len(),
                    });
                }
                for (index, (arg, &expected)) in args.iter().zip(&signature.params).enumerate() {
                    let got = self.type_of(arg, env)?;
                    if got != expected {
                        return Err(TypeError::ArgumentTypeMismatch {
                            name: name.clone(),
                            position: index + 1,
                            expected,
                            got,
                        });
                    }
                }
                Ok(signature.ret)
            }
            Expr::Builtin1 { func, arg } => {
                let got = self.type_of(arg, env)?;
                match func {
                    Builtin1::Print => Ok(got),
                    Builtin1::Abs => expect_int(func.name(), 1, got),
                }
            }
            Expr::Builtin2 { func, left, right } => {
                let left = self.type_of(left, env)?;
                expect_int(func.name(), 1, left)?;
                let right = self.type_of(right, env)?;
                expect_int(func.name(), 2, right)
            }
            Expr::Binary { op, left, right } => {
                let left = self.type_of(left, env)?;
                let right = self.type_of(right, env)?;
                binary_type(*op, left, right)
            }
            Expr::Not(operand) => match self.type_of(operand, env)? {
                Type::Boolean => Ok(Type::Boolean),
                other => Err(TypeError::InvalidNotOperand(other)),
            },
            Expr::Paren(inner) => self.type_of(inner, env),
        }
    }
}

fn expect_int(name: &str, position: usize, got: Type) -> Result<Type, TypeError> {
    if got == Type::Int {
        Ok(Type::Int)
    } else {
        Err(TypeError::ArgumentTypeMismatch {
            name: name.to_string(),
            position,
            expected: Type::Int,
            got,
        })
    }
}

/// Result type of a binary operator, comparing operands by their
/// inferred types only.
fn binary_type(op: BinOp, left: Type, right: Type) -> Result<Type, TypeError> {
    let both = |ty: Type| left == ty && right == ty;
    let result = match op {
        _ if op.is_arithmetic() => both(Type::Int).then_some(Type::Int),
        BinOp::Lt | BinOp::Gt | BinOp::Lte | BinOp::Gte => both(Type::Int).then_some(Type::Boolean),
        BinOp::And | BinOp::Or => both(Type::Boolean).then_some(Type::Boolean),
        _ => (left == right).then_some(Type::Boolean),
    };
    result.ok_or(TypeError::OperandTypeMismatch { op, left, right })
}
