//! Port types and functionality for node connections

use serde::{Deserialize, Serialize};

use crate::nodes::types::{AttributeType, DataType, ValueType};

/// Unique identifier for a port (its index within the node's port list)
pub type PortId = usize;

/// Type of port (input, output, or per-node state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    Input,
    Output,
    State,
}

/// A named, typed attribute slot on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub port_type: PortType,
    /// Declared type
    pub data_type: DataType,
    /// Current resolution; always resolved for concrete declarations
    pub resolved: AttributeType,
}

impl Port {
    /// Creates a new port
    pub fn new(id: PortId, name: impl Into<String>, port_type: PortType, data_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            port_type,
            data_type,
            resolved: data_type.initial_resolution(),
        }
    }

    /// Checks if this port is an input
    pub fn is_input(&self) -> bool {
        matches!(self.port_type, PortType::Input)
    }

    /// Checks if this port is an output
    pub fn is_output(&self) -> bool {
        matches!(self.port_type, PortType::Output)
    }

    pub fn is_polymorphic(&self) -> bool {
        self.data_type.is_polymorphic()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_resolved()
    }

    /// Resolve a polymorphic port. Returns true when the port changed.
    ///
    /// Concrete ports and ports that are already resolved are left alone.
    pub fn resolve(&mut self, attribute_type: AttributeType) -> bool {
        if !self.is_polymorphic() || self.is_resolved() || !attribute_type.is_resolved() {
            return false;
        }
        self.resolved = attribute_type;
        true
    }

    /// Return a polymorphic port to unresolved. Returns true when the port changed.
    pub fn unresolve(&mut self) -> bool {
        if !self.is_polymorphic() || !self.is_resolved() {
            return false;
        }
        self.resolved = AttributeType::Unresolved;
        true
    }

    pub fn resolved_type(&self) -> Option<ValueType> {
        self.resolved.resolved()
    }
}
