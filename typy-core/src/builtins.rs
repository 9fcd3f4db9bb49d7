//! Host-provided builtin functions.
//!
//! This module defines the primitives that are visible at the
//! language level but implemented by the host runtime. It does
//! **not** perform any I/O itself; the code generator maps these
//! descriptors to wasm imports and the host links them by name.

/// Builtins that take a single argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin1 {
    Abs,
    /// Prints its argument and returns it unchanged.
    Print,
}

/// Builtins that take two arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin2 {
    Max,
    Min,
    Pow,
}

impl Builtin1 {
    pub fn name(self) -> &'static str {
        match self {
            Builtin1::Abs => "abs",
            Builtin1::Print => "print",
        }
    }
}

impl Builtin2 {
    pub fn name(self) -> &'static str {
        match self {
            Builtin2::Max => "max",
            Builtin2::Min => "min",
            Builtin2::Pow => "pow",
        }
    }
}

/// Classification of a callee name against the builtin table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Unary(Builtin1),
    Binary(Builtin2),
}

impl BuiltinKind {
    pub fn arity(self) -> usize {
        match self {
            BuiltinKind::Unary(_) => 1,
            BuiltinKind::Binary(_) => 2,
        }
    }
}

/// Metadata about a single imported host function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name at the language level, also used as the import field name
    /// and as the wasm function identifier (`$name`).
    pub name: &'static str,

    pub kind: BuiltinKind,
}

impl BuiltinDescriptor {
    /// Number of `i32` parameters of the imported function.
    pub fn arity(&self) -> usize {
        self.kind.arity()
    }
}

/// The complete list of builtins, in import order.
///
/// The code generator imports every entry regardless of use, so the
/// host must provide all of them.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    BuiltinDescriptor {
        name: "print",
        kind: BuiltinKind::Unary(Builtin1::Print),
    },
    BuiltinDescriptor {
        name: "abs",
        kind: BuiltinKind::Unary(Builtin1::Abs),
    },
    BuiltinDescriptor {
        name: "max",
        kind: BuiltinKind::Binary(Builtin2::Max),
    },
    BuiltinDescriptor {
        name: "min",
        kind: BuiltinKind::Binary(Builtin2::Min),
    },
    BuiltinDescriptor {
        name: "pow",
        kind: BuiltinKind::Binary(Builtin2::Pow),
    },
];

/// Look up a builtin by its language-level name.
///
/// The search is linear over `BUILTINS` because the table is small.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn is_builtin(name: &str) -> bool {
    find_builtin(name).is_some()
}
