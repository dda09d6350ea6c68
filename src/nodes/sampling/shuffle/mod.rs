//! Shuffling distribution node
//!
//! - mod.rs: node metadata and factory implementation
//! - logic.rs: typed attribute access, lifecycle hooks and type resolution

pub mod logic;

use std::sync::Arc;

use crate::constants::{attributes, node_types, seed};
use crate::nodes::hooks::NodeExecutionHooks;
use crate::nodes::interface::NodeData;
use crate::nodes::types::{DataType, ValueType};
use crate::nodes::{NodeCategory, NodeFactory, NodeMetadata, PortDefinition};

pub use logic::{ShuffleDatabase, ShuffleHooks};

/// Sample shuffle node - emits a fresh permutation of its choices every tick
#[derive(Default)]
pub struct SampleShuffleNode;

impl NodeFactory for SampleShuffleNode {
    fn metadata() -> NodeMetadata {
        NodeMetadata::new(
            node_types::SAMPLE_SHUFFLE,
            "Shuffling Distribution",
            NodeCategory::replicator_core(),
            "Reshuffles the list of choices into a new permutation on every evaluation",
        )
        .with_version(1)
        .with_inputs(vec![
            PortDefinition::new(attributes::CHOICES, DataType::Any),
            // Negative seeds defer to the global seed
            PortDefinition::new(attributes::SEED, DataType::Concrete(ValueType::INT))
                .with_default(NodeData::Int(seed::USE_GLOBAL)),
        ])
        .with_outputs(vec![PortDefinition::new(attributes::SAMPLES, DataType::Any)])
    }

    fn hooks() -> Arc<dyn NodeExecutionHooks> {
        Arc::new(ShuffleHooks)
    }
}
