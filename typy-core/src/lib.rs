//! Core compiler for typy, a statically typed subset of Python.
//!
//! The pipeline is:
//!
//!   source .py
//!     -> syntax    (concrete syntax tree, lezer-python shaped)
//!     -> builder   (AST, walked through a `TreeCursor`)
//!     -> typecheck (function table + scoped variable environments)
//!     -> codegen_wasm (wasm binary + printed text, builtins imported from the host)
//!
//! Every value is a 32-bit integer at runtime. Higher-level tools (the
//! CLI, test harnesses) should go through [`compile`] or
//! [`compile_tree`] rather than driving the stages by hand.

// ---------------------------------------------------------------------
// Error handling and source locations
// ---------------------------------------------------------------------

pub mod error;
pub mod span;

// ---------------------------------------------------------------------
// Front end: concrete syntax and AST construction
// ---------------------------------------------------------------------

pub mod ast;
pub mod builder;
pub mod syntax;

// ---------------------------------------------------------------------
// Semantic layer: types and checking
// ---------------------------------------------------------------------

pub mod builtins;
pub mod typecheck;
pub mod types;

// ---------------------------------------------------------------------
// Back end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_wasm;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, CompileOptions, compile, compile_tree};
pub use error::CoreError;
