//! Error types shared by the graph runtime, the sampling nodes and the
//! distribution bridge

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    /// Malformed distribution arguments (empty choices, non-integer seed, ...)
    #[error("Validation error: {0}")]
    Validation(String),
    /// Elements of a literal list do not share a compatible type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// A literal has a type the array attributes cannot carry
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// A fault raised while a node computed
    #[error("Evaluation fault in {node}: {message}")]
    Evaluation { node: String, message: String },
    /// Structural graph errors: unknown nodes/ports, cycles, bad connections
    #[error("Graph error: {0}")]
    Graph(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SamplingError {
    pub fn evaluation(node: impl Into<String>, message: impl Into<String>) -> Self {
        SamplingError::Evaluation {
            node: node.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SamplingError {
    fn from(err: serde_json::Error) -> Self {
        SamplingError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SamplingError {
    fn from(err: std::io::Error) -> Self {
        SamplingError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SamplingError>;
