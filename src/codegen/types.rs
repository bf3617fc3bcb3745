//! Type References
//!
//! The textual type system of the model, kept as an enum instead of strings so
//! that pointer stripping, integer widening and base-name extraction are
//! structural operations. `Display` renders the Rust spelling used in model
//! dumps and diagnostics.

use serde::Serialize;
use std::fmt;

use crate::error::{MappingError, Result};

/// Reference to a type in the generated model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum TypeRef {
    Bool,
    /// 32-bit integer, used for scalar `integer` fields
    Int,
    /// 64-bit integer, used for array elements
    Int64,
    Float64,
    String,
    /// `null`
    Nil,
    /// Dynamic value: unions, `{}` schemas, open maps
    Any,
    /// Pointer to a named record
    Pointer(String),
    /// A named record held by value (array elements)
    Named(String),
    Array(Box<TypeRef>),
    /// Map from string keys to the inner type
    Map(Box<TypeRef>),
}

impl TypeRef {
    /// Scalar type for a primitive JSON Schema tag
    pub fn primitive(tag: &str) -> Option<Self> {
        match tag {
            "boolean" => Some(Self::Bool),
            "integer" => Some(Self::Int),
            "number" => Some(Self::Float64),
            "string" => Some(Self::String),
            "null" => Some(Self::Nil),
            _ => None,
        }
    }

    /// Pointer to the record `name`; records are always referenced by pointer.
    pub fn pointer_to(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(MappingError::DegenerateObject);
        }
        Ok(Self::Pointer(name.to_string()))
    }

    /// Array of `item`.
    ///
    /// Integer elements widen to 64 bits and a pointer element is stored by
    /// value; scalar integer fields keep the 32-bit width.
    pub fn array_of(item: TypeRef, array_name: &str) -> Result<Self> {
        let item = match item {
            Self::Int => Self::Int64,
            Self::Pointer(name) | Self::Named(name) if name.is_empty() => {
                return Err(MappingError::DegenerateArray {
                    name: array_name.to_string(),
                })
            }
            Self::Pointer(name) => Self::Named(name),
            other => other,
        };
        Ok(Self::Array(Box::new(item)))
    }

    pub fn map_of(value: TypeRef) -> Self {
        Self::Map(Box::new(value))
    }

    pub fn is_pointer_to(&self, name: &str) -> bool {
        matches!(self, Self::Pointer(n) if n == name)
    }

    /// Innermost type once array layers are peeled off.
    ///
    /// Maps are not peeled: a map never names a record.
    pub fn base(&self) -> &TypeRef {
        match self {
            Self::Array(inner) => inner.base(),
            other => other,
        }
    }

    /// Record named by the base type, if any
    pub fn record_name(&self) -> Option<&str> {
        match self.base() {
            Self::Pointer(name) | Self::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_string_like(&self) -> bool {
        match self {
            Self::String => true,
            Self::Array(inner) => **inner == Self::String,
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("i32"),
            Self::Int64 => f.write_str("i64"),
            Self::Float64 => f.write_str("f64"),
            Self::String => f.write_str("String"),
            Self::Nil => f.write_str("()"),
            Self::Any => f.write_str("serde_json::Value"),
            Self::Pointer(name) => write!(f, "Box<{}>", name),
            Self::Named(name) => f.write_str(name),
            Self::Array(inner) => write!(f, "Vec<{}>", inner),
            Self::Map(inner) => write!(f, "HashMap<String, {}>", inner),
        }
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}
