//! Element type inference for literal lists
//!
//! Produces the canonical tag (`int`, `double3`, `bool`, `token`, ...) used as
//! the element type of the array literal node.

use crate::distribution::literal::Literal;
use crate::error::{Result, SamplingError};
use crate::nodes::interface::Element;
use crate::nodes::types::{BaseType, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Integer,
    Float,
    Boolean,
    String,
}

impl Category {
    fn of(value: &Literal) -> Result<Self> {
        match value {
            Literal::Int(_) => Ok(Category::Integer),
            Literal::Float(_) => Ok(Category::Float),
            Literal::Bool(_) => Ok(Category::Boolean),
            Literal::Str(_) => Ok(Category::String),
            other => Err(SamplingError::UnsupportedType(format!(
                "{} values are not supported; use strings, bools, ints or floats",
                other.kind()
            ))),
        }
    }

    /// int and float unify to float; every other pair must match
    fn unify(self, other: Category) -> Option<Category> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Category::Integer, Category::Float) | (Category::Float, Category::Integer) => {
                Some(Category::Float)
            }
            _ => None,
        }
    }
}

/// Components of one list element and whether it was a tuple
fn components(value: &Literal) -> (&[Literal], bool) {
    match value {
        Literal::Tuple(items) => (items.as_slice(), true),
        other => (std::slice::from_ref(other), false),
    }
}

/// Canonical element type tag of a homogeneous literal list
pub fn infer_type(values: &[Literal]) -> Result<String> {
    let first = values
        .first()
        .ok_or_else(|| SamplingError::Validation("choices must not be empty".to_string()))?;

    let (first_components, is_tuple) = components(first);
    let width = first_components.len();
    let mut category = match first_components.first() {
        Some(component) => Category::of(component)?,
        None => {
            return Err(SamplingError::UnsupportedType(
                "empty tuples are not supported".to_string(),
            ))
        }
    };

    for (index, value) in values.iter().enumerate() {
        let (items, tuple) = components(value);
        if tuple != is_tuple || items.len() != width {
            return Err(SamplingError::TypeMismatch(format!(
                "element {} has a different shape than the first element",
                index
            )));
        }
        for item in items {
            let current = Category::of(item)?;
            category = category.unify(current).ok_or_else(|| {
                SamplingError::TypeMismatch(
                    "every element in the items provided must be the same type".to_string(),
                )
            })?;
        }
    }

    let suffix = if is_tuple { width.to_string() } else { String::new() };
    match category {
        Category::Integer => Ok(format!("int{}", suffix)),
        Category::Float => Ok(format!("double{}", suffix)),
        Category::Boolean | Category::String if is_tuple => Err(SamplingError::UnsupportedType(
            "tuples of bools or strings are not supported".to_string(),
        )),
        Category::Boolean => Ok("bool".to_string()),
        Category::String => Ok("token".to_string()),
    }
}

/// Convert literals to array elements of `element_type`, promoting ints where needed
pub fn to_elements(values: &[Literal], element_type: ValueType) -> Result<Vec<Element>> {
    values
        .iter()
        .map(|value| to_element(value, element_type))
        .collect()
}

fn to_element(value: &Literal, element_type: ValueType) -> Result<Element> {
    let mismatch = || {
        SamplingError::TypeMismatch(format!("{:?} is not a {}", value, element_type.element()))
    };

    match (value, element_type.base, element_type.components) {
        (Literal::Int(i), BaseType::Int, None) => Ok(Element::Int(*i)),
        (Literal::Int(i), BaseType::Double, None) => Ok(Element::Double(*i as f64)),
        (Literal::Float(f), BaseType::Double, None) => Ok(Element::Double(*f)),
        (Literal::Bool(b), BaseType::Bool, None) => Ok(Element::Bool(*b)),
        (Literal::Str(s), BaseType::Token, None) => Ok(Element::Token(s.clone())),
        (Literal::Tuple(items), BaseType::Int, Some(n)) if items.len() == n => items
            .iter()
            .map(|item| match item {
                Literal::Int(i) => Ok(*i),
                _ => Err(mismatch()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Element::IntTuple),
        (Literal::Tuple(items), BaseType::Double, Some(n)) if items.len() == n => items
            .iter()
            .map(|item| match item {
                Literal::Int(i) => Ok(*i as f64),
                Literal::Float(f) => Ok(*f),
                _ => Err(mismatch()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Element::DoubleTuple),
        _ => Err(mismatch()),
    }
}
