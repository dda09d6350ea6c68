//! Node graph data structures and operations

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeId};
use super::port::PortId;
use crate::error::{Result, SamplingError};

/// Represents a connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from_node: NodeId,
    pub from_port: PortId,
    pub to_node: NodeId,
    pub to_port: PortId,
}

impl Connection {
    /// Creates a new connection
    pub fn new(from_node: NodeId, from_port: PortId, to_node: NodeId, to_port: PortId) -> Self {
        Self {
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }
}

/// A graph containing nodes and their connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGraph {
    pub nodes: HashMap<NodeId, Node>,
    pub connections: Vec<Connection>,
    next_node_id: NodeId,
}

impl NodeGraph {
    /// Creates a new empty node graph
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            connections: Vec::new(),
            next_node_id: 0,
        }
    }

    /// Adds a node to the graph and returns its ID
    ///
    /// A path already used by another node gets a numeric suffix (`_01`, `_02`, ...).
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = self.next_node_id;
        node.id = id;
        node.path = self.unique_path(&node.path);
        self.nodes.insert(id, node);
        self.next_node_id += 1;
        id
    }

    /// First free path derived from `requested`
    pub fn unique_path(&self, requested: &str) -> String {
        if self.find_by_path(requested).is_none() {
            return requested.to_string();
        }
        (1..)
            .map(|n| format!("{}_{:02}", requested, n))
            .find(|candidate| self.find_by_path(candidate).is_none())
            .unwrap_or_else(|| requested.to_string())
    }

    /// Removes a node and all its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections
            .retain(|conn| conn.from_node != node_id && conn.to_node != node_id);
        self.nodes.remove(&node_id)
    }

    pub fn node(&self, node_id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&node_id)
            .ok_or_else(|| SamplingError::Graph(format!("Node {} does not exist", node_id)))
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&node_id)
            .ok_or_else(|| SamplingError::Graph(format!("Node {} does not exist", node_id)))
    }

    /// Look up a node by its path identity
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.path == path)
            .map(|node| node.id)
    }

    /// Adds a connection between two ports
    pub fn add_connection(&mut self, connection: Connection) -> Result<()> {
        if connection.from_node == connection.to_node {
            return Err(SamplingError::Graph("Cannot connect a node to itself".to_string()));
        }

        let source = self.node(connection.from_node)?;
        let target = self.node(connection.to_node)?;

        let output = source.outputs.get(connection.from_port).ok_or_else(|| {
            SamplingError::Graph(format!(
                "{} has no output port {}",
                source.path, connection.from_port
            ))
        })?;
        let input = target.inputs.get(connection.to_port).ok_or_else(|| {
            SamplingError::Graph(format!(
                "{} has no input port {}",
                target.path, connection.to_port
            ))
        })?;

        if !output.data_type.can_connect_to(&input.data_type)
            || !output.resolved.is_compatible_with(&input.resolved)
        {
            return Err(SamplingError::Graph(format!(
                "Cannot connect {}.{} ({}) to {}.{} ({})",
                source.path,
                output.name,
                output.resolved,
                target.path,
                input.name,
                input.resolved
            )));
        }

        // An input takes a single upstream value
        if self
            .connections
            .iter()
            .any(|c| c.to_node == connection.to_node && c.to_port == connection.to_port)
        {
            return Err(SamplingError::Graph(format!(
                "{}.{} is already connected",
                target.path, input.name
            )));
        }

        self.connections.push(connection);
        Ok(())
    }

    /// Connect ports by name
    pub fn connect_by_name(
        &mut self,
        from_node: NodeId,
        output: &str,
        to_node: NodeId,
        input: &str,
    ) -> Result<Connection> {
        let connection = self.resolve_connection(from_node, output, to_node, input)?;
        self.add_connection(connection.clone())?;
        Ok(connection)
    }

    /// Build a connection from port names without adding it
    pub fn resolve_connection(
        &self,
        from_node: NodeId,
        output: &str,
        to_node: NodeId,
        input: &str,
    ) -> Result<Connection> {
        let source = self.node(from_node)?;
        let target = self.node(to_node)?;
        let from_port = source.output_index(output).ok_or_else(|| {
            SamplingError::Graph(format!("{} has no output '{}'", source.path, output))
        })?;
        let to_port = target.input_index(input).ok_or_else(|| {
            SamplingError::Graph(format!("{} has no input '{}'", target.path, input))
        })?;
        Ok(Connection::new(from_node, from_port, to_node, to_port))
    }

    /// Removes a connection by index
    pub fn remove_connection(&mut self, index: usize) -> Option<Connection> {
        if index < self.connections.len() {
            Some(self.connections.remove(index))
        } else {
            None
        }
    }

    /// Connections feeding into the given node
    pub fn incoming(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.to_node == node_id)
    }

    /// Connections leaving the given node
    pub fn outgoing(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.from_node == node_id)
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}
