//! Node types and core node functionality

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::interface::NodeData;
use super::port::{Port, PortId, PortType};
use super::types::DataType;
use crate::constants;

/// Unique identifier for a node within its graph
pub type NodeId = usize;

/// Core node structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Registered node type (e.g. `nodle.sampling.SampleShuffle`)
    pub type_id: String,
    /// Stable path identity, unique within the graph
    pub path: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub state: Vec<Port>,
    /// Authored input values, used when an input has no upstream connection
    pub parameters: HashMap<String, NodeData>,
}

impl Node {
    /// Creates a new node with the specified type and path
    pub fn new(id: NodeId, type_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            path: path.into(),
            inputs: vec![],
            outputs: vec![],
            state: vec![],
            parameters: HashMap::new(),
        }
    }

    /// Adds an input port to the node
    pub fn add_input(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Self {
        let port_id = self.inputs.len();
        self.inputs.push(Port::new(port_id, name, PortType::Input, data_type));
        self
    }

    /// Adds an output port to the node
    pub fn add_output(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Self {
        let port_id = self.outputs.len();
        self.outputs.push(Port::new(port_id, name, PortType::Output, data_type));
        self
    }

    /// Adds a state attribute to the node
    pub fn add_state(&mut self, name: impl Into<String>, data_type: DataType) -> &mut Self {
        let port_id = self.state.len();
        self.state.push(Port::new(port_id, name, PortType::State, data_type));
        self
    }

    /// Last path component
    pub fn name(&self) -> &str {
        self.path
            .rsplit(constants::graph::SEPARATOR)
            .next()
            .unwrap_or(&self.path)
    }

    pub fn input_index(&self, name: &str) -> Option<PortId> {
        self.inputs.iter().position(|port| port.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<PortId> {
        self.outputs.iter().position(|port| port.name == name)
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|port| port.name == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.inputs.iter_mut().find(|port| port.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|port| port.name == name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.outputs.iter_mut().find(|port| port.name == name)
    }

    /// Author a value on an input
    pub fn set_parameter(&mut self, name: impl Into<String>, value: NodeData) {
        self.parameters.insert(name.into(), value);
    }

    pub fn parameter(&self, name: &str) -> Option<&NodeData> {
        self.parameters.get(name)
    }

    /// Names of polymorphic ports that have not resolved yet
    pub fn unresolved_ports(&self) -> Vec<String> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .chain(self.state.iter())
            .filter(|port| port.is_polymorphic() && !port.is_resolved())
            .map(|port| format!("{:?}:{}", port.port_type, port.name).to_lowercase())
            .collect()
    }
}
