//! Node system - core data structures, the execution engine and node implementations

// Core node system modules
pub mod cache;
pub mod execution_engine;
pub mod factory;
pub mod graph;
pub mod hooks;
pub mod interface;
pub mod node;
pub mod port;
pub mod types;

// Node implementations
pub mod data;
pub mod sampling;

// Re-export core types
pub use graph::{Connection, NodeGraph};
pub use node::{Node, NodeId};
pub use port::{Port, PortId, PortType};

// Re-export factory types
pub use factory::{NodeCategory, NodeFactory, NodeMetadata, NodeRegistry, PortDefinition};

pub use hooks::{ComputeContext, ConnectionChange, ConnectionEvent, GraphContext, NodeExecutionHooks};
pub use interface::{ArrayValue, Element, NodeData};
pub use types::{AttributeType, BaseType, DataType, ValueType};

// Re-export execution engine types
pub use execution_engine::{
    EvaluationOutcome, ExecutionStats, NodeGraphEngine, NodeState, SkipReason,
};

pub use data::array::ArrayNode;
pub use sampling::shuffle::SampleShuffleNode;
