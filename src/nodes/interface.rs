//! Values that flow between nodes

use serde::{Deserialize, Serialize};

use crate::error::{Result, SamplingError};
use crate::nodes::types::{BaseType, ValueType};

/// One element of an array attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Int(i64),
    Double(f64),
    Bool(bool),
    Token(String),
    IntTuple(Vec<i64>),
    DoubleTuple(Vec<f64>),
}

impl Element {
    /// Check that this element is a value of the given (non-array) type
    pub fn matches(&self, element_type: &ValueType) -> bool {
        if element_type.is_array {
            return false;
        }
        match (self, element_type.base, element_type.components) {
            (Element::Int(_), BaseType::Int, None) => true,
            (Element::Double(_), BaseType::Double, None) => true,
            (Element::Bool(_), BaseType::Bool, None) => true,
            (Element::Token(_), BaseType::Token, None) => true,
            (Element::IntTuple(v), BaseType::Int, Some(n)) => v.len() == n,
            (Element::DoubleTuple(v), BaseType::Double, Some(n)) => v.len() == n,
            _ => false,
        }
    }
}

/// Homogeneous array value carried by array attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    element_type: ValueType,
    items: Vec<Element>,
}

impl ArrayValue {
    /// Build an array, checking every item against `element_type`
    pub fn new(element_type: ValueType, items: Vec<Element>) -> Result<Self> {
        let element_type = element_type.element();
        if let Some((index, item)) = items
            .iter()
            .enumerate()
            .find(|(_, item)| !item.matches(&element_type))
        {
            return Err(SamplingError::TypeMismatch(format!(
                "element {} ({:?}) is not a {}",
                index, item, element_type
            )));
        }
        Ok(Self {
            element_type,
            items,
        })
    }

    pub fn empty(element_type: ValueType) -> Self {
        Self {
            element_type: element_type.element(),
            items: Vec::new(),
        }
    }

    pub fn element_type(&self) -> ValueType {
        self.element_type
    }

    /// Array type of this value (e.g. `token[]`)
    pub fn value_type(&self) -> ValueType {
        self.element_type.as_array()
    }

    pub fn items(&self) -> &[Element] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Same element type, different items. Callers keep items homogeneous.
    pub(crate) fn with_items(&self, items: Vec<Element>) -> Self {
        Self {
            element_type: self.element_type,
            items,
        }
    }
}

/// Core data types that flow between nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum NodeData {
    Int(i64),
    Token(String),
    Array(ArrayValue),
    /// Empty/null value
    #[default]
    None,
}

impl NodeData {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            NodeData::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            NodeData::Token(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            NodeData::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, NodeData::None)
    }

    /// The concrete type of this value, if it has one
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            NodeData::Int(_) => Some(ValueType::INT),
            NodeData::Token(_) => Some(ValueType::TOKEN),
            NodeData::Array(array) => Some(array.value_type()),
            NodeData::None => None,
        }
    }
}
