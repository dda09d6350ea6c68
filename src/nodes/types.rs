//! Attribute type descriptors
//!
//! Ports declare either a concrete [`ValueType`] or [`DataType::Any`]. A
//! polymorphic port carries an [`AttributeType`] that stays `Unresolved`
//! until a connection hands it a concrete type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplingError};

/// Element category of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    Int,
    Double,
    Bool,
    Token,
}

impl BaseType {
    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Int => "int",
            BaseType::Double => "double",
            BaseType::Bool => "bool",
            BaseType::Token => "token",
        }
    }

    /// Only numeric types come in fixed-width tuples
    pub fn supports_tuples(&self) -> bool {
        matches!(self, BaseType::Int | BaseType::Double)
    }
}

/// Concrete attribute type: base type, tuple width, and whether it is an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueType {
    pub base: BaseType,
    /// Fixed tuple width; `None` for scalars
    pub components: Option<usize>,
    pub is_array: bool,
}

impl ValueType {
    pub const INT: ValueType = ValueType::scalar(BaseType::Int);
    pub const DOUBLE: ValueType = ValueType::scalar(BaseType::Double);
    pub const BOOL: ValueType = ValueType::scalar(BaseType::Bool);
    pub const TOKEN: ValueType = ValueType::scalar(BaseType::Token);

    pub const fn scalar(base: BaseType) -> Self {
        Self {
            base,
            components: None,
            is_array: false,
        }
    }

    pub const fn tuple(base: BaseType, components: usize) -> Self {
        Self {
            base,
            components: Some(components),
            is_array: false,
        }
    }

    /// The array type whose elements are of this type
    pub fn as_array(self) -> Self {
        Self {
            is_array: true,
            ..self
        }
    }

    /// The element type of an array type
    pub fn element(self) -> Self {
        Self {
            is_array: false,
            ..self
        }
    }

    /// Parse a type tag such as `int`, `double3`, `token` or `int2[]`
    pub fn from_tag(tag: &str) -> Result<Self> {
        let (body, is_array) = match tag.strip_suffix("[]") {
            Some(body) => (body, true),
            None => (tag, false),
        };

        let split = body
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(body.len());
        let (name, width) = body.split_at(split);

        let base = match name {
            "int" => BaseType::Int,
            "double" => BaseType::Double,
            "bool" => BaseType::Bool,
            "token" => BaseType::Token,
            _ => {
                return Err(SamplingError::UnsupportedType(format!(
                    "unknown type tag '{}'",
                    tag
                )))
            }
        };

        let components = if width.is_empty() {
            None
        } else {
            if !base.supports_tuples() {
                return Err(SamplingError::UnsupportedType(format!(
                    "'{}' cannot have a tuple width",
                    base.name()
                )));
            }
            let count = width.parse::<usize>().map_err(|_| {
                SamplingError::UnsupportedType(format!("bad tuple width in '{}'", tag))
            })?;
            if count < 2 {
                return Err(SamplingError::UnsupportedType(format!(
                    "tuple width in '{}' must be at least 2",
                    tag
                )));
            }
            Some(count)
        };

        Ok(Self {
            base,
            components,
            is_array,
        })
    }

    pub fn tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base.name())?;
        if let Some(width) = self.components {
            write!(f, "{}", width)?;
        }
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Declared type of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Fixed at declaration
    Concrete(ValueType),
    /// Polymorphic; resolved when connected
    Any,
}

impl DataType {
    /// Check if this data type can connect to another
    pub fn can_connect_to(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Concrete(a), DataType::Concrete(b)) => a == b,
            _ => true,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self, DataType::Any)
    }

    /// The type a freshly created port of this declaration carries
    pub fn initial_resolution(&self) -> AttributeType {
        match self {
            DataType::Concrete(value_type) => AttributeType::Resolved(*value_type),
            DataType::Any => AttributeType::Unresolved,
        }
    }

    pub fn name(&self) -> String {
        match self {
            DataType::Concrete(value_type) => value_type.tag(),
            DataType::Any => "any".to_string(),
        }
    }
}

/// Current resolution state of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttributeType {
    #[default]
    Unresolved,
    Resolved(ValueType),
}

impl AttributeType {
    pub fn is_resolved(&self) -> bool {
        matches!(self, AttributeType::Resolved(_))
    }

    pub fn resolved(&self) -> Option<ValueType> {
        match self {
            AttributeType::Resolved(value_type) => Some(*value_type),
            AttributeType::Unresolved => None,
        }
    }

    /// Two port types are compatible unless both are resolved and differ
    pub fn is_compatible_with(&self, other: &AttributeType) -> bool {
        match (self, other) {
            (AttributeType::Resolved(a), AttributeType::Resolved(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Resolved(value_type) => write!(f, "{}", value_type),
            AttributeType::Unresolved => write!(f, "unresolved"),
        }
    }
}
