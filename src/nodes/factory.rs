//! Node factory system with registration and rich metadata

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{Result, SamplingError};
use crate::nodes::hooks::NodeExecutionHooks;
use crate::nodes::interface::NodeData;
use crate::nodes::types::DataType;
use crate::nodes::Node;

/// Hierarchical category system for organizing nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeCategory {
    path: Vec<String>,
}

impl NodeCategory {
    /// Create a new category from path components
    pub fn new(path: &[&str]) -> Self {
        Self {
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Get the full path as a slice
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Get the category name (last component)
    pub fn name(&self) -> &str {
        self.path.last().map(|s| s.as_str()).unwrap_or("")
    }

    /// Get display string for UI
    pub fn display_string(&self) -> String {
        self.path.join(" > ")
    }
}

// Standard categories
impl NodeCategory {
    /// Core sampling/distribution nodes
    pub fn replicator_core() -> Self {
        Self::new(&["Replicator", "Core"])
    }
    /// Data sources such as literal arrays
    pub fn data() -> Self {
        Self::new(&["Data"])
    }
}

/// Port definition for node creation
#[derive(Debug, Clone)]
pub struct PortDefinition {
    pub name: String,
    pub data_type: DataType,
    /// Value authored on new nodes
    pub default_value: Option<NodeData>,
}

impl PortDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: NodeData) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Static description of a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub node_type: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub version: u32,
    pub category: NodeCategory,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
    pub state: Vec<PortDefinition>,
}

impl NodeMetadata {
    /// Create node metadata with sensible defaults
    pub fn new(
        node_type: &'static str,
        display_name: &'static str,
        category: NodeCategory,
        description: &'static str,
    ) -> Self {
        Self {
            node_type,
            display_name,
            description,
            version: 1,
            category,
            inputs: vec![],
            outputs: vec![],
            state: vec![],
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<PortDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PortDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_state(mut self, state: Vec<PortDefinition>) -> Self {
        self.state = state;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn input(&self, name: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|port| port.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|port| port.name == name)
    }
}

/// Node factory trait with rich metadata
pub trait NodeFactory: Send + Sync {
    /// Get comprehensive node metadata
    fn metadata() -> NodeMetadata
    where
        Self: Sized;

    /// Lifecycle callbacks shared by every instance of this node type
    fn hooks() -> Arc<dyn NodeExecutionHooks>
    where
        Self: Sized;

    /// Create a node instance at the given path
    fn create(path: &str) -> Node
    where
        Self: Sized,
    {
        build_node(&Self::metadata(), path)
    }
}

/// Instantiate ports and default values described by `meta`
pub fn build_node(meta: &NodeMetadata, path: &str) -> Node {
    let mut node = Node::new(0, meta.node_type, path);

    for input in &meta.inputs {
        node.add_input(&input.name, input.data_type);
        if let Some(default) = &input.default_value {
            node.set_parameter(&input.name, default.clone());
        }
    }
    for output in &meta.outputs {
        node.add_output(&output.name, output.data_type);
    }
    for state in &meta.state {
        node.add_state(&state.name, state.data_type);
    }

    node
}

/// Function pointer types for creating nodes
type NodeCreator = fn(&str) -> Node;
type MetadataProvider = fn() -> NodeMetadata;

/// Registry for managing node factories
#[derive(Default)]
pub struct NodeRegistry {
    creators: BTreeMap<String, NodeCreator>,
    metadata_providers: BTreeMap<String, MetadataProvider>,
    hooks: BTreeMap<String, Arc<dyn NodeExecutionHooks>>,
    categories: HashMap<NodeCategory, Vec<String>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node factory. Each node type may be registered once.
    pub fn register<T: NodeFactory + 'static>(&mut self) -> Result<()> {
        let metadata = T::metadata();
        let node_type = metadata.node_type.to_string();

        if self.creators.contains_key(&node_type) {
            return Err(SamplingError::Graph(format!(
                "Node type {} is already registered",
                node_type
            )));
        }

        self.creators.insert(node_type.clone(), T::create);
        self.metadata_providers.insert(node_type.clone(), T::metadata);
        self.hooks.insert(node_type.clone(), T::hooks());
        self.categories
            .entry(metadata.category.clone())
            .or_default()
            .push(node_type.clone());

        info!(
            "Registered node type {} (version {})",
            node_type, metadata.version
        );
        Ok(())
    }

    /// Remove a node type. Returns false if it was not registered.
    pub fn deregister(&mut self, node_type: &str) -> bool {
        if self.creators.remove(node_type).is_none() {
            warn!("Cannot deregister unknown node type {}", node_type);
            return false;
        }
        self.metadata_providers.remove(node_type);
        self.hooks.remove(node_type);
        for types in self.categories.values_mut() {
            types.retain(|t| t != node_type);
        }
        self.categories.retain(|_, types| !types.is_empty());

        info!("Deregistered node type {}", node_type);
        true
    }

    /// Create a node by type name together with its hooks
    pub fn create_node(&self, node_type: &str, path: &str) -> Option<(Node, Arc<dyn NodeExecutionHooks>)> {
        let creator = self.creators.get(node_type)?;
        let hooks = self.hooks.get(node_type)?;
        debug!("Creating {} at {}", node_type, path);
        Some((creator(path), Arc::clone(hooks)))
    }

    /// Get metadata for a node type
    pub fn metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.metadata_providers.get(node_type).map(|provider| provider())
    }

    /// Hooks shared by instances of a node type
    pub fn hooks(&self, node_type: &str) -> Option<Arc<dyn NodeExecutionHooks>> {
        self.hooks.get(node_type).cloned()
    }

    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.creators.contains_key(node_type)
    }

    /// Get all available node types
    pub fn node_types(&self) -> Vec<&str> {
        self.creators.keys().map(|s| s.as_str()).collect()
    }

    /// Get nodes in a specific category
    pub fn nodes_in_category(&self, category: &NodeCategory) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|nodes| nodes.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }
}
