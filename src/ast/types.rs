//! # Type Definitions
//!
//! This module defines the set of data types available in the VYL language
//! and implements the compatibility rules used by the type checker and the
//! code generator.

use serde::Serialize;
use std::fmt;

/// Represents a VYL type.
///
/// The language talks about types by their textual names (`int`, `*T`,
/// `T[]`, `(T1, T2)`); `Display` reproduces exactly those spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Type {
    /// 64-bit signed integer.
    Int,
    /// Decimal number. Stored truncated to an integer by the backend.
    Dec,
    /// Boolean, materialized as 0 or 1.
    Bool,
    /// NUL-terminated heap or pooled string.
    Str,
    /// Absence of a value (function without a return).
    Void,
    /// Untyped array as produced by the `Array` builtin.
    Array,
    /// Pointer to another type (`*T`). `*void` is the type of `null`.
    Pointer(Box<Type>),
    /// Typed array (`T[]`), length header preceding the elements.
    ArrayOf(Box<Type>),
    /// Tuple of element types (`(T1, T2, ...)`).
    Tuple(Vec<Type>),
    /// A user-declared struct, enum, or interface name.
    Named(String),
    /// A generic instantiation such as `List<int>`. Recognized by the parser
    /// and rejected by the resolver.
    Generic { base: String, args: Vec<Type> },
}

impl Type {
    /// Maps a primitive type name to a `Type`, falling back to `Named`.
    pub fn from_name(name: &str) -> Type {
        match name {
            "int" => Type::Int,
            "dec" => Type::Dec,
            "bool" => Type::Bool,
            "string" => Type::Str,
            "void" => Type::Void,
            "array" => Type::Array,
            _ => Type::Named(name.to_string()),
        }
    }

    /// True for the numeric types (`int`, `dec`).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Dec)
    }

    /// True for anything indexable: `array` or a typed `T[]`.
    pub fn is_indexable(&self) -> bool {
        matches!(self, Type::Array | Type::ArrayOf(_))
    }

    /// The element type an index expression yields: `T` for `T[]`,
    /// `int` for the untyped `array`.
    pub fn element_type(&self) -> Type {
        match self {
            Type::ArrayOf(inner) => (**inner).clone(),
            _ => Type::Int,
        }
    }

    /// Assignment compatibility: identical types, numeric widening
    /// `int -> dec`, or `*void` into any pointer type.
    pub fn is_assignable_from(&self, actual: &Type) -> bool {
        if self == actual {
            return true;
        }
        if *self == Type::Dec && *actual == Type::Int {
            return true;
        }
        if matches!(self, Type::Pointer(_)) && *actual == Type::Pointer(Box::new(Type::Void)) {
            return true;
        }
        false
    }

    /// Equality comparability: identical types, or `*void` against any `*T`.
    pub fn is_comparable_with(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        let null = Type::Pointer(Box::new(Type::Void));
        (matches!(self, Type::Pointer(_)) && *other == null)
            || (matches!(other, Type::Pointer(_)) && *self == null)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Dec => write!(f, "dec"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Array => write!(f, "array"),
            Type::Pointer(inner) => write!(f, "*{}", inner),
            Type::ArrayOf(inner) => write!(f, "{}[]", inner),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Type::Named(name) => write!(f, "{}", name),
            Type::Generic { base, args } => {
                write!(f, "{}<", base)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_language_spellings() {
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::Pointer(Box::new(Type::Int)).to_string(), "*int");
        assert_eq!(Type::ArrayOf(Box::new(Type::Str)).to_string(), "string[]");
        assert_eq!(
            Type::Tuple(vec![Type::Int, Type::Str]).to_string(),
            "(int, string)"
        );
        assert_eq!(Type::Pointer(Box::new(Type::Void)).to_string(), "*void");
    }

    #[test]
    fn numeric_widening_is_one_way() {
        assert!(Type::Dec.is_assignable_from(&Type::Int));
        assert!(!Type::Int.is_assignable_from(&Type::Dec));
    }

    #[test]
    fn null_assigns_into_any_pointer() {
        let null = Type::Pointer(Box::new(Type::Void));
        let p_int = Type::Pointer(Box::new(Type::Int));
        let p_struct = Type::Pointer(Box::new(Type::Named("Node".into())));
        assert!(p_int.is_assignable_from(&null));
        assert!(p_struct.is_assignable_from(&null));
        assert!(!Type::Int.is_assignable_from(&null));
        assert!(p_int.is_comparable_with(&null));
        assert!(null.is_comparable_with(&p_struct));
    }

    #[test]
    fn indexing_yields_element_type() {
        assert_eq!(
            Type::ArrayOf(Box::new(Type::Str)).element_type(),
            Type::Str
        );
        assert_eq!(Type::Array.element_type(), Type::Int);
        assert!(!Type::Str.is_indexable());
    }
}
