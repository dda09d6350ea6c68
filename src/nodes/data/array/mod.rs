//! Array literal node
//!
//! - mod.rs: node metadata and factory implementation
//! - logic.rs: lifecycle hooks (type resolution from `arrayType`, compute)

pub mod logic;

use std::sync::Arc;

use crate::constants::{attributes, node_types};
use crate::nodes::hooks::NodeExecutionHooks;
use crate::nodes::types::{DataType, ValueType};
use crate::nodes::{NodeCategory, NodeFactory, NodeMetadata, PortDefinition};

pub use logic::ArrayHooks;

/// Array node - holds an authored homogeneous array and outputs it every tick
#[derive(Default)]
pub struct ArrayNode;

impl NodeFactory for ArrayNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::ARRAY,
            "Array",
            NodeCategory::data(),
            "Outputs an authored array whose element type is fixed by arrayType",
        )
        .with_inputs(vec![
            // Element type tag such as token, int or double3
            PortDefinition::new(attributes::ARRAY_TYPE, DataType::Concrete(ValueType::TOKEN)),
            PortDefinition::new(attributes::ARRAY, DataType::Any),
        ])
        .with_outputs(vec![PortDefinition::new(attributes::ARRAY, DataType::Any)])
    }

    fn hooks() -> Arc<dyn NodeExecutionHooks> {
        Arc::new(ArrayHooks)
    }
}
