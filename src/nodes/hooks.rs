//! Node lifecycle hooks
//!
//! The execution engine drives every node through `initialize`, repeated
//! `compute` calls, connection type resolution, and a final `release`. A
//! node type supplies one hooks object that is shared by all its instances,
//! so per-node state lives in injected services such as the RNG registry.

use std::collections::HashSet;

use crate::error::{Result, SamplingError};
use crate::nodes::interface::NodeData;
use crate::nodes::types::AttributeType;
use crate::nodes::{Node, NodeId};
use crate::random::RngRegistry;

/// Services available to lifecycle callbacks outside of compute
pub struct GraphContext<'a> {
    rng: &'a RngRegistry,
    observers: &'a mut HashSet<NodeId>,
}

impl<'a> GraphContext<'a> {
    pub fn new(rng: &'a RngRegistry, observers: &'a mut HashSet<NodeId>) -> Self {
        Self { rng, observers }
    }

    pub fn rng(&self) -> &RngRegistry {
        self.rng
    }

    /// Ask to be notified whenever a connection on `node_id` changes
    pub fn observe_connections(&mut self, node_id: NodeId) {
        self.observers.insert(node_id);
    }

    pub fn is_observing(&self, node_id: NodeId) -> bool {
        self.observers.contains(&node_id)
    }
}

/// What happened to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    Connected,
    Disconnected,
    /// An endpoint's resolved type changed after the connection was made
    TypeChanged,
}

/// One end of a connection as seen by the resolution callback
#[derive(Debug, Clone, PartialEq)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
    pub resolved: AttributeType,
}

/// Connection change delivered to `on_connection_type_resolve`
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    pub change: ConnectionChange,
    /// Output side
    pub upstream: PortRef,
    /// Input side
    pub downstream: PortRef,
    /// Ports of the notified node that still have a connection after this change
    pub connected_ports: Vec<String>,
}

impl ConnectionEvent {
    pub fn is_connected(&self, port: &str) -> bool {
        self.connected_ports.iter().any(|name| name == port)
    }
}

/// Per-evaluation view of one node's inputs and outputs
pub struct ComputeContext<'a> {
    node: &'a Node,
    inputs: Vec<NodeData>,
    outputs: Vec<NodeData>,
    rng: &'a RngRegistry,
}

impl<'a> ComputeContext<'a> {
    pub fn new(node: &'a Node, inputs: Vec<NodeData>, rng: &'a RngRegistry) -> Self {
        Self {
            node,
            inputs,
            outputs: vec![NodeData::None; node.outputs.len()],
            rng,
        }
    }

    /// Stable identity of the node being evaluated
    pub fn identity(&self) -> &str {
        &self.node.path
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn rng(&self) -> &RngRegistry {
        self.rng
    }

    /// Value of an input; `None` when the input is absent or unset
    pub fn input(&self, name: &str) -> Option<&NodeData> {
        self.node
            .input_index(name)
            .and_then(|index| self.inputs.get(index))
            .filter(|value| !value.is_none())
    }

    pub fn set_output(&mut self, name: &str, value: NodeData) -> Result<()> {
        let index = self.node.output_index(name).ok_or_else(|| {
            SamplingError::evaluation(&self.node.path, format!("no output named '{}'", name))
        })?;
        self.outputs[index] = value;
        Ok(())
    }

    /// Output values by port index; unwritten outputs are `NodeData::None`
    pub fn into_outputs(self) -> Vec<NodeData> {
        self.outputs
    }
}

/// Trait for node-specific lifecycle callbacks
pub trait NodeExecutionHooks: Send + Sync {
    /// Called once after the node is added, before any compute
    fn initialize(&self, _ctx: &mut GraphContext<'_>, _node: &mut Node) -> Result<()> {
        Ok(())
    }

    /// Called once per evaluation. `Ok(false)` withholds output for this tick.
    fn compute(&self, ctx: &mut ComputeContext<'_>) -> Result<bool>;

    /// Called once when the node is removed from the graph
    fn release(&self, _ctx: &mut GraphContext<'_>, _node: &Node) {}

    /// Called for observed nodes when a connection touching them changes.
    /// Returns true if any of the node's port types changed.
    fn on_connection_type_resolve(&self, _node: &mut Node, _event: &ConnectionEvent) -> bool {
        false
    }
}
