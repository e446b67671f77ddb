// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value types carried by sockets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type that can flow through a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean value
    Bool,
    /// 32-bit signed integer
    Int,
    /// 64-bit floating point value
    Float,
    /// String value
    String,
}

impl ValueType {
    /// All value types, in declaration order
    pub fn all() -> &'static [ValueType] {
        &[Self::Bool, Self::Int, Self::Float, Self::String]
    }

    /// Check if a link from a socket of this type can feed a socket of `other`.
    ///
    /// Identical types always connect. The only declared conversion is the
    /// lossless `Int -> Float` widening; everything else is a mismatch.
    pub fn can_connect_to(&self, other: ValueType) -> bool {
        *self == other || matches!((self, other), (Self::Int, Self::Float))
    }

    /// The value a socket of this type holds before anything is written.
    pub fn zero(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::String => Value::String(String::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// Value that can be stored in a socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f64),
    /// String
    String(String),
}

impl Value {
    /// Get the value type for this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::String(_) => ValueType::String,
        }
    }

    /// Convert this value for delivery into a socket of type `target`.
    ///
    /// Returns `None` when no conversion is declared between the two types.
    pub fn convert_to(&self, target: ValueType) -> Option<Value> {
        match (self, target) {
            (value, target) if value.value_type() == target => Some(value.clone()),
            (Self::Int(i), ValueType::Float) => Some(Self::Float(f64::from(*i))),
            _ => None,
        }
    }

    /// Equality used to detect whether a pass changed anything.
    ///
    /// Floats compare bitwise so a steady NaN counts as unchanged.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Get the boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer payload
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float payload
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
