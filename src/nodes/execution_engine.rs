//! Node graph execution engine
//!
//! Owns a [`NodeGraph`] and drives every node through its lifecycle:
//! - initialize on creation, release on removal
//! - connection type resolution and downstream propagation
//! - per-tick evaluation in dependency order, with readiness checks and
//!   fault isolation so one failing node never stops the graph

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::error::{Result, SamplingError};
use crate::nodes::cache::{CacheKey, CacheKeyPattern, OutputCache};
use crate::nodes::factory::NodeRegistry;
use crate::nodes::hooks::{
    ComputeContext, ConnectionChange, ConnectionEvent, GraphContext, NodeExecutionHooks, PortRef,
};
use crate::nodes::interface::NodeData;
use crate::nodes::{Connection, Node, NodeGraph, NodeId};
use crate::random::RngRegistry;

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Uninitialized,
    Initialized,
    Computing,
}

/// Why an evaluation was skipped
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Polymorphic attributes still waiting for a type
    Unresolved(Vec<String>),
}

/// Result of visiting one node during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// Compute succeeded and outputs were committed
    Computed,
    /// Compute ran but produced no output this tick
    NoOutput,
    /// Compute did not run
    Skipped(SkipReason),
    /// Compute raised an error or panicked
    Faulted(SamplingError),
}

/// Counters for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub computed: usize,
    pub no_output: usize,
    pub skipped: usize,
    pub faulted: usize,
}

impl ExecutionStats {
    fn record(&mut self, outcome: &EvaluationOutcome) {
        match outcome {
            EvaluationOutcome::Computed => self.computed += 1,
            EvaluationOutcome::NoOutput => self.no_output += 1,
            EvaluationOutcome::Skipped(_) => self.skipped += 1,
            EvaluationOutcome::Faulted(_) => self.faulted += 1,
        }
    }

    pub fn visited(&self) -> usize {
        self.computed + self.no_output + self.skipped + self.faulted
    }
}

/// Execution engine for node graphs
pub struct NodeGraphEngine {
    graph: NodeGraph,
    rng: Arc<RngRegistry>,
    /// Hooks of each live node, captured from the registry at creation
    hooks: HashMap<NodeId, Arc<dyn NodeExecutionHooks>>,
    node_states: HashMap<NodeId, NodeState>,
    last_outcomes: HashMap<NodeId, EvaluationOutcome>,
    /// Nodes that asked for connection-changed notifications
    observers: HashSet<NodeId>,
    cache: OutputCache,
    /// Execution order cache (invalidated when graph changes)
    execution_order_cache: Option<Vec<NodeId>>,
}

impl NodeGraphEngine {
    /// Create a new execution engine over an empty graph
    pub fn new(rng: Arc<RngRegistry>) -> Self {
        Self {
            graph: NodeGraph::new(),
            rng,
            hooks: HashMap::new(),
            node_states: HashMap::new(),
            last_outcomes: HashMap::new(),
            observers: HashSet::new(),
            cache: OutputCache::new(),
            execution_order_cache: None,
        }
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn rng(&self) -> &Arc<RngRegistry> {
        &self.rng
    }

    pub fn node(&self, node_id: NodeId) -> Result<&Node> {
        self.graph.node(node_id)
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.graph.find_by_path(path)
    }

    /// Lifecycle state; `None` once the node has been released
    pub fn node_state(&self, node_id: NodeId) -> Option<NodeState> {
        self.node_states.get(&node_id).copied()
    }

    /// Outcome of the node's most recent evaluation
    pub fn last_outcome(&self, node_id: NodeId) -> Option<&EvaluationOutcome> {
        self.last_outcomes.get(&node_id)
    }

    /// Create a node of a registered type, author `parameters` on it, and initialize it
    pub fn add_node(
        &mut self,
        registry: &NodeRegistry,
        node_type: &str,
        path: &str,
        parameters: Vec<(&str, NodeData)>,
    ) -> Result<NodeId> {
        let (mut node, hooks) = registry
            .create_node(node_type, path)
            .ok_or_else(|| SamplingError::Graph(format!("Unknown node type {}", node_type)))?;

        for (name, value) in parameters {
            if node.input(name).is_none() {
                return Err(SamplingError::Graph(format!(
                    "{} has no input '{}'",
                    node_type, name
                )));
            }
            node.set_parameter(name, value);
        }

        let node_id = self.graph.add_node(node);
        self.node_states.insert(node_id, NodeState::Uninitialized);
        self.hooks.insert(node_id, Arc::clone(&hooks));
        self.execution_order_cache = None;

        let init_result = {
            let node = self.graph.node_mut(node_id)?;
            let mut ctx = GraphContext::new(&self.rng, &mut self.observers);
            hooks.initialize(&mut ctx, node)
        };

        if let Err(e) = init_result {
            error!("Initialize failed for node {}: {}", node_id, e);
            self.remove_node(node_id)?;
            return Err(e);
        }

        self.node_states.insert(node_id, NodeState::Initialized);
        debug!("Initialized node {} ({})", node_id, self.graph.node(node_id)?.path);
        Ok(node_id)
    }

    /// Release a node and remove it with its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node> {
        let touching: Vec<Connection> = self
            .graph
            .connections
            .iter()
            .filter(|c| c.from_node == node_id || c.to_node == node_id)
            .cloned()
            .collect();
        for connection in &touching {
            if let Some(index) = self.graph.connections.iter().position(|c| c == connection) {
                self.graph.remove_connection(index);
            }
            self.notify_connection(connection, ConnectionChange::Disconnected);
        }

        let node = self
            .graph
            .remove_node(node_id)
            .ok_or_else(|| SamplingError::Graph(format!("Node {} does not exist", node_id)))?;

        if let Some(hooks) = self.hooks.remove(&node_id) {
            let mut ctx = GraphContext::new(&self.rng, &mut self.observers);
            let released = panic::catch_unwind(AssertUnwindSafe(|| hooks.release(&mut ctx, &node)));
            if released.is_err() {
                error!("Release panicked for {}", node.path);
            }
        }

        self.observers.remove(&node_id);
        self.last_outcomes.remove(&node_id);
        self.cache.invalidate(&CacheKeyPattern::Node(node_id));
        self.node_states.remove(&node_id);
        self.execution_order_cache = None;

        debug!("Released node {} ({})", node_id, node.path);
        Ok(node)
    }

    /// Connect an output to an input, then resolve and propagate port types
    pub fn connect(
        &mut self,
        from_node: NodeId,
        output: &str,
        to_node: NodeId,
        input: &str,
    ) -> Result<Connection> {
        let connection = self.graph.connect_by_name(from_node, output, to_node, input)?;
        self.execution_order_cache = None;

        if let Err(e) = self.execution_order() {
            if let Some(index) = self.graph.connections.iter().position(|c| *c == connection) {
                self.graph.remove_connection(index);
            }
            self.execution_order_cache = None;
            return Err(e);
        }

        self.notify_connection(&connection, ConnectionChange::Connected);
        Ok(connection)
    }

    /// Remove a connection; polymorphic ports left without a connection may unresolve
    pub fn disconnect(&mut self, connection: &Connection) -> Result<()> {
        let index = self
            .graph
            .connections
            .iter()
            .position(|c| c == connection)
            .ok_or_else(|| SamplingError::Graph("Connection does not exist".to_string()))?;
        self.graph.remove_connection(index);
        self.execution_order_cache = None;
        self.notify_connection(connection, ConnectionChange::Disconnected);
        Ok(())
    }

    /// Author a value on an input
    pub fn set_input(&mut self, node_id: NodeId, name: &str, value: NodeData) -> Result<()> {
        let node = self.graph.node_mut(node_id)?;
        let port = node
            .input(name)
            .ok_or_else(|| SamplingError::Graph(format!("{} has no input '{}'", node.path, name)))?;

        if let (Some(expected), Some(actual)) = (port.resolved_type(), value.value_type()) {
            if expected != actual {
                return Err(SamplingError::Graph(format!(
                    "{}.{} expects {}, got {}",
                    node.path, name, expected, actual
                )));
            }
        }

        node.set_parameter(name, value);
        Ok(())
    }

    /// Last committed value of an output
    pub fn output(&self, node_id: NodeId, name: &str) -> Option<&NodeData> {
        let node = self.graph.nodes.get(&node_id)?;
        let port = node.output_index(name)?;
        self.cache.get(&CacheKey::new(node_id, port))
    }

    /// Evaluate every node once in dependency order
    pub fn tick(&mut self) -> Result<ExecutionStats> {
        let order = self.execution_order()?;
        let mut stats = ExecutionStats::default();

        for node_id in order {
            if self.node_states.get(&node_id) != Some(&NodeState::Initialized) {
                continue;
            }
            let outcome = self.evaluate_node(node_id);
            stats.record(&outcome);
            self.last_outcomes.insert(node_id, outcome);
        }

        debug!("Tick finished: {:?}", stats);
        Ok(stats)
    }

    /// Release every node, leaving an empty graph
    pub fn shutdown(&mut self) {
        let ids: Vec<NodeId> = self.graph.nodes.keys().copied().collect();
        for node_id in ids {
            if let Err(e) = self.remove_node(node_id) {
                warn!("Failed to release node {} during shutdown: {}", node_id, e);
            }
        }
        info!("Graph shut down");
    }

    /// Get the execution order using topological sort
    pub fn execution_order(&mut self) -> Result<Vec<NodeId>> {
        if let Some(ref order) = self.execution_order_cache {
            return Ok(order.clone());
        }

        let mut in_degree: HashMap<NodeId, usize> =
            self.graph.nodes.keys().map(|id| (*id, 0)).collect();
        let mut adj_list: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for connection in &self.graph.connections {
            adj_list
                .entry(connection.from_node)
                .or_default()
                .push(connection.to_node);
            if let Some(degree) = in_degree.get_mut(&connection.to_node) {
                *degree += 1;
            }
        }

        // Kahn's algorithm; ready nodes are taken in id order
        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut result = Vec::with_capacity(in_degree.len());

        while let Some(node_id) = ready.pop_first() {
            result.push(node_id);
            for neighbor in adj_list.get(&node_id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*neighbor);
                    }
                }
            }
        }

        if result.len() != self.graph.nodes.len() {
            return Err(SamplingError::Graph("Cycle detected in node graph".to_string()));
        }

        self.execution_order_cache = Some(result.clone());
        Ok(result)
    }

    /// Run one node through the readiness check and the guarded compute
    fn evaluate_node(&mut self, node_id: NodeId) -> EvaluationOutcome {
        let Some(node) = self.graph.nodes.get(&node_id) else {
            return EvaluationOutcome::Faulted(SamplingError::Graph(format!(
                "Node {} does not exist",
                node_id
            )));
        };
        let Some(hooks) = self.hooks.get(&node_id).cloned() else {
            return EvaluationOutcome::Faulted(SamplingError::Graph(format!(
                "No hooks for {}",
                node.path
            )));
        };

        let unresolved = node.unresolved_ports();
        if !unresolved.is_empty() {
            for port in &unresolved {
                warn!(
                    "Required extended attribute {} is not resolved on {}, compute skipped",
                    port, node.path
                );
            }
            return EvaluationOutcome::Skipped(SkipReason::Unresolved(unresolved));
        }

        let inputs = self.collect_node_inputs(node);
        self.node_states.insert(node_id, NodeState::Computing);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = ComputeContext::new(node, inputs, &self.rng);
            hooks.compute(&mut ctx).map(|ok| (ok, ctx.into_outputs()))
        }));

        let outcome = match result {
            Ok(Ok((true, outputs))) => match Self::check_outputs(node, &outputs) {
                Ok(()) => {
                    for (port_idx, output) in outputs.into_iter().enumerate() {
                        if !output.is_none() {
                            self.cache.insert(CacheKey::new(node_id, port_idx), output);
                        }
                    }
                    EvaluationOutcome::Computed
                }
                Err(e) => {
                    error!("Compute of {} produced invalid output: {}", node.path, e);
                    EvaluationOutcome::Faulted(e)
                }
            },
            Ok(Ok((false, _))) => {
                debug!("{} produced no output this tick", node.path);
                EvaluationOutcome::NoOutput
            }
            Ok(Err(e)) => {
                error!("Error raised in compute of {}: {}", node.path, e);
                EvaluationOutcome::Faulted(e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Panic raised in compute of {}: {}", node.path, message);
                EvaluationOutcome::Faulted(SamplingError::evaluation(&node.path, message))
            }
        };

        self.node_states.insert(node_id, NodeState::Initialized);
        outcome
    }

    /// Upstream outputs for connected inputs, authored values otherwise
    fn collect_node_inputs(&self, node: &Node) -> Vec<NodeData> {
        let mut inputs: Vec<NodeData> = node
            .inputs
            .iter()
            .map(|port| node.parameter(&port.name).cloned().unwrap_or_default())
            .collect();

        for connection in self.graph.incoming(node.id) {
            if connection.to_port >= inputs.len() {
                continue;
            }
            inputs[connection.to_port] = self
                .cache
                .get(&CacheKey::new(connection.from_node, connection.from_port))
                .cloned()
                .unwrap_or_default();
        }
        inputs
    }

    fn check_outputs(node: &Node, outputs: &[NodeData]) -> Result<()> {
        for (port, value) in node.outputs.iter().zip(outputs) {
            if let (Some(expected), Some(actual)) = (port.resolved_type(), value.value_type()) {
                if expected != actual {
                    return Err(SamplingError::evaluation(
                        &node.path,
                        format!("output {} expects {}, got {}", port.name, expected, actual),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Deliver a connection change to both endpoints, then push any newly
    /// resolved output types further downstream
    fn notify_connection(&mut self, connection: &Connection, change: ConnectionChange) {
        let mut pending = VecDeque::from([(connection.clone(), change)]);
        let mut seen: HashSet<Connection> = HashSet::new();

        while let Some((connection, change)) = pending.pop_front() {
            let Some(base) = self.connection_event(&connection, change) else {
                continue;
            };

            for node_id in [connection.from_node, connection.to_node] {
                if !self.observers.contains(&node_id) {
                    continue;
                }
                let event = ConnectionEvent {
                    connected_ports: self.connected_ports(node_id),
                    ..base.clone()
                };
                let Some(hooks) = self.hooks.get(&node_id).cloned() else {
                    continue;
                };
                let Some(node) = self.graph.nodes.get_mut(&node_id) else {
                    continue;
                };

                let before: Vec<_> = node.outputs.iter().map(|p| p.resolved).collect();
                if !hooks.on_connection_type_resolve(node, &event) {
                    continue;
                }
                debug!("Port types changed on {}", node.path);

                // Outputs that changed notify their consumers
                let changed: Vec<usize> = node
                    .outputs
                    .iter()
                    .zip(before)
                    .enumerate()
                    .filter(|(_, (port, old))| port.resolved != *old)
                    .map(|(index, _)| index)
                    .collect();
                for next in self.graph.outgoing(node_id) {
                    if changed.contains(&next.from_port) && seen.insert(next.clone()) {
                        pending.push_back((next.clone(), ConnectionChange::TypeChanged));
                    }
                }
            }
        }
    }

    fn connection_event(&self, connection: &Connection, change: ConnectionChange) -> Option<ConnectionEvent> {
        let source = self.graph.nodes.get(&connection.from_node)?;
        let target = self.graph.nodes.get(&connection.to_node)?;
        let output = source.outputs.get(connection.from_port)?;
        let input = target.inputs.get(connection.to_port)?;

        Some(ConnectionEvent {
            change,
            upstream: PortRef {
                node: source.id,
                port: output.name.clone(),
                resolved: output.resolved,
            },
            downstream: PortRef {
                node: target.id,
                port: input.name.clone(),
                resolved: input.resolved,
            },
            connected_ports: Vec::new(),
        })
    }

    /// Names of the node's ports that take part in at least one connection
    fn connected_ports(&self, node_id: NodeId) -> Vec<String> {
        let Some(node) = self.graph.nodes.get(&node_id) else {
            return Vec::new();
        };
        let inputs = self
            .graph
            .incoming(node_id)
            .filter_map(|c| node.inputs.get(c.to_port));
        let outputs = self
            .graph
            .outgoing(node_id)
            .filter_map(|c| node.outputs.get(c.from_port));
        inputs.chain(outputs).map(|port| port.name.clone()).collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
