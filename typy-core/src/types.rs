//! Core type system for typy.
//!
//! The language has exactly three value types. All of them are
//! represented as a single `i32` at runtime; the distinction only
//! exists for the type checker.

use std::fmt;

/// Represents the types of values and expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Boolean,
    /// The type of `None` and of functions declared without a result
    /// annotation.
    None,
}

impl Type {
    /// Resolve a type annotation as written in source.
    pub fn from_annotation(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Int),
            "bool" => Some(Type::Boolean),
            "None" => Some(Type::None),
            _ => None,
        }
    }

    /// Source spelling of the type.
    pub fn name(self) -> &'static str {
        match self {
            Type::Int => "int",
            Type::Boolean => "bool",
            Type::None => "None",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_annotations() {
        assert_eq!(Type::from_annotation("int"), Some(Type::Int));
        assert_eq!(Type::from_annotation("bool"), Some(Type::Boolean));
        assert_eq!(Type::from_annotation("None"), Some(Type::None));
        assert_eq!(Type::from_annotation("str"), None);
        assert_eq!(Type::from_annotation("Int"), None);
    }

    #[test]
    fn display_matches_source_spelling() {
        for ty in [Type::Int, Type::Boolean, Type::None] {
            assert_eq!(Type::from_annotation(&ty.to_string()), Some(ty));
        }
    }
}
