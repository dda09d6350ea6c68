//! Literal values accepted by distribution functions

use std::fmt;

use serde_json::Value;

use crate::error::{Result, SamplingError};

/// A scene path; carried as a plain string once it reaches an array attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenePath(String);

impl ScenePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A dynamically typed value handed to a distribution function
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Path(ScenePath),
    Tuple(Vec<Literal>),
    Null,
}

impl Literal {
    /// Convert a JSON value. Objects have no literal form.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Literal::Null),
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Literal::Int(i)),
                None => n.as_f64().map(Literal::Float).ok_or_else(|| {
                    SamplingError::UnsupportedType(format!("number {} is out of range", n))
                }),
            },
            Value::String(s) => Ok(Literal::Str(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Literal::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Literal::Tuple),
            Value::Object(_) => Err(SamplingError::UnsupportedType(
                "objects cannot be used as distribution values".to_string(),
            )),
        }
    }

    /// Replace scene paths (at any depth) by their string form
    pub fn without_paths(&self) -> Literal {
        match self {
            Literal::Path(path) => Literal::Str(path.as_str().to_string()),
            Literal::Tuple(items) => Literal::Tuple(items.iter().map(Literal::without_paths).collect()),
            other => other.clone(),
        }
    }

    /// Short name of the literal's kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
            Literal::Str(_) => "string",
            Literal::Path(_) => "path",
            Literal::Tuple(_) => "tuple",
            Literal::Null => "null",
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<ScenePath> for Literal {
    fn from(value: ScenePath) -> Self {
        Literal::Path(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(Literal::from_json(&json!(3)).unwrap(), Literal::Int(3));
        assert_eq!(Literal::from_json(&json!(0.5)).unwrap(), Literal::Float(0.5));
        assert_eq!(Literal::from_json(&json!("a")).unwrap(), Literal::Str("a".into()));
        assert_eq!(
            Literal::from_json(&json!([1, 2.5])).unwrap(),
            Literal::Tuple(vec![Literal::Int(1), Literal::Float(2.5)])
        );
        assert_eq!(Literal::from_json(&json!(null)).unwrap(), Literal::Null);
        assert!(Literal::from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_paths_become_strings() {
        let path = Literal::from(ScenePath::new("/World/Cube"));
        assert_eq!(path.without_paths(), Literal::Str("/World/Cube".into()));
        assert_eq!(Literal::Int(1).without_paths(), Literal::Int(1));
    }
}
