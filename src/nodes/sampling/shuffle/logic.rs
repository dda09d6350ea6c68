//! Shuffle node logic
//!
//! The node keeps no per-instance fields: its generator lives in the shared
//! RNG registry under the node's path, so the hooks object is stateless and
//! shared by every instance.

use log::info;
use rand::seq::SliceRandom;

use crate::constants::attributes;
use crate::error::{Result, SamplingError};
use crate::nodes::hooks::{
    ComputeContext, ConnectionChange, ConnectionEvent, GraphContext, NodeExecutionHooks,
};
use crate::nodes::interface::{ArrayValue, NodeData};
use crate::nodes::types::AttributeType;
use crate::nodes::Node;
use crate::random::{lock_state, RngRegistry};

/// Typed view of the shuffle node's attributes for one evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShuffleDatabase {
    pub choices: Option<ArrayValue>,
    pub seed: Option<i64>,
    pub samples: Option<ArrayValue>,
}

impl ShuffleDatabase {
    /// Read `choices` and `seed` from the evaluation context
    pub fn read(ctx: &ComputeContext<'_>) -> Result<Self> {
        let choices = match ctx.input(attributes::CHOICES) {
            None => None,
            Some(NodeData::Array(array)) => Some(array.clone()),
            Some(other) => {
                return Err(SamplingError::evaluation(
                    ctx.identity(),
                    format!("choices must be an array, got {:?}", other),
                ))
            }
        };
        let seed = match ctx.input(attributes::SEED) {
            None => None,
            Some(NodeData::Int(seed)) => Some(*seed),
            Some(other) => {
                return Err(SamplingError::evaluation(
                    ctx.identity(),
                    format!("seed must be an int, got {:?}", other),
                ))
            }
        };

        Ok(Self {
            choices,
            seed,
            samples: None,
        })
    }

    /// Commit `samples` to the node's output
    pub fn write(self, ctx: &mut ComputeContext<'_>) -> Result<()> {
        if let Some(samples) = self.samples {
            ctx.set_output(attributes::SAMPLES, NodeData::Array(samples))?;
        }
        Ok(())
    }
}

/// Shuffle `db.choices` into `db.samples` with the generator owned by `identity`.
///
/// Returns false, leaving `samples` untouched, when there is nothing to shuffle.
pub fn shuffle_choices(rng: &RngRegistry, identity: &str, db: &mut ShuffleDatabase) -> bool {
    let Some(choices) = db.choices.as_ref().filter(|choices| !choices.is_empty()) else {
        return false;
    };

    if let Some(seed) = db.seed {
        rng.ensure_seeded(identity, seed);
    }

    let mut shuffled = choices.items().to_vec();
    let handle = rng.get_or_create(identity);
    {
        let mut state = lock_state(&handle);
        shuffled.shuffle(state.generator());
    }

    db.samples = Some(choices.with_items(shuffled));
    true
}

/// Lifecycle hooks of the shuffle node
pub struct ShuffleHooks;

impl NodeExecutionHooks for ShuffleHooks {
    fn initialize(&self, ctx: &mut GraphContext<'_>, node: &mut Node) -> Result<()> {
        ctx.observe_connections(node.id);
        Ok(())
    }

    fn compute(&self, ctx: &mut ComputeContext<'_>) -> Result<bool> {
        let mut db = ShuffleDatabase::read(ctx)?;
        let identity = ctx.identity().to_string();

        if !shuffle_choices(ctx.rng(), &identity, &mut db) {
            info!("{} has no choices to shuffle, compute skipped", identity);
            return Ok(false);
        }

        db.write(ctx)?;
        Ok(true)
    }

    fn release(&self, ctx: &mut GraphContext<'_>, node: &Node) {
        ctx.rng().release(&node.path);
    }

    fn on_connection_type_resolve(&self, node: &mut Node, event: &ConnectionEvent) -> bool {
        let mut changed = false;
        let this = node.id;
        let disconnected = event.change == ConnectionChange::Disconnected;

        // choices follows its upstream; it reopens once nothing feeds it
        if event.downstream.node == this && event.downstream.port == attributes::CHOICES {
            if let Some(port) = node.input_mut(attributes::CHOICES) {
                if !disconnected {
                    changed |= port.resolve(event.upstream.resolved);
                } else if !event.is_connected(attributes::CHOICES) {
                    changed |= port.unresolve();
                }
            }
        }

        // samples prefers a concrete consumer, otherwise mirrors choices
        let choices_type = node
            .input(attributes::CHOICES)
            .map(|port| port.resolved)
            .unwrap_or_default();
        let downstream_type = (event.upstream.node == this
            && event.upstream.port == attributes::SAMPLES
            && event.downstream.resolved.is_resolved())
        .then_some(event.downstream.resolved);

        if let Some(port) = node.output_mut(attributes::SAMPLES) {
            if !disconnected {
                let target: AttributeType = downstream_type.unwrap_or(choices_type);
                changed |= port.resolve(target);
            } else if !event.is_connected(attributes::SAMPLES) && port.resolved != choices_type {
                // No consumer left to pin it
                changed |= port.unresolve();
                changed |= port.resolve(choices_type);
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::nodes::hooks::PortRef;
    use crate::nodes::interface::Element;
    use crate::nodes::sampling::shuffle::SampleShuffleNode;
    use crate::nodes::types::{BaseType, ValueType};
    use crate::nodes::NodeFactory;

    fn token_array(values: &[&str]) -> ArrayValue {
        let items = values.iter().map(|v| Element::Token(v.to_string())).collect();
        ArrayValue::new(ValueType::TOKEN, items).unwrap()
    }

    fn int_array(values: std::ops::Range<i64>) -> ArrayValue {
        ArrayValue::new(ValueType::INT, values.map(Element::Int).collect()).unwrap()
    }

    fn db(choices: ArrayValue, seed: Option<i64>) -> ShuffleDatabase {
        ShuffleDatabase {
            choices: Some(choices),
            seed,
            samples: None,
        }
    }

    fn sample(rng: &RngRegistry, identity: &str, choices: &ArrayValue, seed: i64) -> Vec<Element> {
        let mut db = db(choices.clone(), Some(seed));
        assert!(shuffle_choices(rng, identity, &mut db));
        db.samples.unwrap().items().to_vec()
    }

    fn sorted_tokens(items: &[Element]) -> Vec<String> {
        let mut tokens: Vec<String> = items
            .iter()
            .map(|item| match item {
                Element::Token(t) => t.clone(),
                other => panic!("unexpected element {:?}", other),
            })
            .collect();
        tokens.sort();
        tokens
    }

    fn shuffle_node(id: usize) -> Node {
        let mut node = SampleShuffleNode::create("/Replicator/SampleShuffle");
        node.id = id;
        node
    }

    fn port(node: usize, name: &str, resolved: AttributeType) -> PortRef {
        PortRef {
            node,
            port: name.to_string(),
            resolved,
        }
    }

    #[test]
    fn test_samples_are_a_permutation() {
        let rng = RngRegistry::new();
        let choices = token_array(&["a", "b", "c", "d", "e"]);
        let samples = sample(&rng, "/Graph/Shuffle", &choices, 7);
        assert_eq!(samples.len(), 5);
        assert_eq!(sorted_tokens(&samples), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_tuple_elements_move_as_units() {
        let rng = RngRegistry::new();
        let vec2 = ValueType::tuple(BaseType::Double, 2);
        let items: Vec<Element> = (0..6)
            .map(|i| Element::DoubleTuple(vec![i as f64, -(i as f64)]))
            .collect();
        let choices = ArrayValue::new(vec2, items).unwrap();

        for item in sample(&rng, "/Graph/Tuples", &choices, 1) {
            match item {
                Element::DoubleTuple(pair) => assert_eq!(pair[0], -pair[1]),
                other => panic!("unexpected element {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_choices_produce_nothing() {
        let rng = RngRegistry::new();
        let mut empty = db(ArrayValue::empty(ValueType::TOKEN), Some(3));
        assert!(!shuffle_choices(&rng, "/Graph/Empty", &mut empty));
        assert!(empty.samples.is_none());

        let mut missing = ShuffleDatabase::default();
        assert!(!shuffle_choices(&rng, "/Graph/Empty", &mut missing));
        assert!(rng.is_empty());
    }

    #[test]
    fn test_same_seed_and_identity_reproduce() {
        let choices = int_array(0..20);
        let first = sample(&RngRegistry::new(), "/Graph/Shuffle", &choices, 5);
        let second = sample(&RngRegistry::new(), "/Graph/Shuffle", &choices, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_identity_changes_the_sequence() {
        let rng = RngRegistry::new();
        let choices = int_array(0..20);
        let a = sample(&rng, "/Graph/A", &choices, 5);
        let b = sample(&rng, "/Graph/B", &choices, 5);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unchanged_seed_continues_stream() {
        let rng = RngRegistry::new();
        let choices = int_array(0..20);
        let first = sample(&rng, "/Graph/Shuffle", &choices, 5);
        let second = sample(&rng, "/Graph/Shuffle", &choices, 5);
        assert_ne!(first, second);
    }

    #[test]
    fn test_seed_change_reinitializes() {
        let rng = RngRegistry::new();
        let choices = int_array(0..20);
        let first = sample(&rng, "/Graph/Shuffle", &choices, 5);
        sample(&rng, "/Graph/Shuffle", &choices, 6);
        assert_eq!(rng.seed_of("/Graph/Shuffle"), Some(6));
        assert_eq!(sample(&rng, "/Graph/Shuffle", &choices, 5), first);
    }

    #[test]
    fn test_release_then_recreate_starts_fresh() {
        let rng = RngRegistry::new();
        let mut observers = HashSet::new();
        let choices = int_array(0..20);
        let first = sample(&rng, "/Replicator/SampleShuffle", &choices, 5);
        sample(&rng, "/Replicator/SampleShuffle", &choices, 5);

        let node = shuffle_node(0);
        ShuffleHooks.release(&mut GraphContext::new(&rng, &mut observers), &node);
        assert!(!rng.contains("/Replicator/SampleShuffle"));
        // Releasing twice is harmless
        ShuffleHooks.release(&mut GraphContext::new(&rng, &mut observers), &node);

        assert_eq!(sample(&rng, "/Replicator/SampleShuffle", &choices, 5), first);
    }

    #[test]
    fn test_initialize_observes_connections() {
        let rng = RngRegistry::new();
        let mut observers = HashSet::new();
        let mut node = shuffle_node(4);
        let mut ctx = GraphContext::new(&rng, &mut observers);
        ShuffleHooks.initialize(&mut ctx, &mut node).unwrap();
        assert!(ctx.is_observing(4));
    }

    #[test]
    fn test_compute_through_context() {
        let rng = RngRegistry::new();
        let mut node = shuffle_node(0);
        let token_array_type = AttributeType::Resolved(ValueType::TOKEN.as_array());
        node.input_mut("choices").unwrap().resolve(token_array_type);
        node.output_mut("samples").unwrap().resolve(token_array_type);

        let inputs = vec![
            NodeData::Array(token_array(&["x", "y", "z"])),
            NodeData::Int(5),
        ];
        let mut ctx = ComputeContext::new(&node, inputs, &rng);
        assert!(ShuffleHooks.compute(&mut ctx).unwrap());

        let outputs = ctx.into_outputs();
        let samples = outputs[0].as_array().unwrap();
        assert_eq!(sorted_tokens(samples.items()), vec!["x", "y", "z"]);
        assert_eq!(rng.seed_of("/Replicator/SampleShuffle"), Some(5));
    }

    #[test]
    fn test_compute_with_empty_choices_returns_false() {
        let rng = RngRegistry::new();
        let node = shuffle_node(0);
        let inputs = vec![
            NodeData::Array(ArrayValue::empty(ValueType::TOKEN)),
            NodeData::Int(5),
        ];
        let mut ctx = ComputeContext::new(&node, inputs, &rng);
        assert!(!ShuffleHooks.compute(&mut ctx).unwrap());
        assert!(ctx.into_outputs()[0].is_none());
    }

    #[test]
    fn test_compute_rejects_non_array_choices() {
        let rng = RngRegistry::new();
        let node = shuffle_node(0);
        let inputs = vec![NodeData::Int(1), NodeData::Int(5)];
        let mut ctx = ComputeContext::new(&node, inputs, &rng);
        assert!(matches!(
            ShuffleHooks.compute(&mut ctx),
            Err(SamplingError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_choices_adopt_upstream_type() {
        let mut node = shuffle_node(2);
        let ints = AttributeType::Resolved(ValueType::INT.as_array());
        let event = ConnectionEvent {
            change: ConnectionChange::Connected,
            upstream: port(1, "array", ints),
            downstream: port(2, "choices", AttributeType::Unresolved),
            connected_ports: vec![],
        };

        assert!(ShuffleHooks.on_connection_type_resolve(&mut node, &event));
        assert_eq!(node.input("choices").unwrap().resolved, ints);
        // No downstream consumer: samples mirrors choices
        assert_eq!(node.output("samples").unwrap().resolved, ints);
        assert!(node.unresolved_ports().is_empty());

        // Already resolved types never change
        assert!(!ShuffleHooks.on_connection_type_resolve(&mut node, &event));
    }

    #[test]
    fn test_unresolved_upstream_leaves_choices_open() {
        let mut node = shuffle_node(2);
        let event = ConnectionEvent {
            change: ConnectionChange::Connected,
            upstream: port(1, "array", AttributeType::Unresolved),
            downstream: port(2, "choices", AttributeType::Unresolved),
            connected_ports: vec![],
        };

        assert!(!ShuffleHooks.on_connection_type_resolve(&mut node, &event));
        assert_eq!(
            node.unresolved_ports(),
            vec!["input:choices", "output:samples"]
        );
    }

    #[test]
    fn test_samples_prefer_downstream_type() {
        let mut node = shuffle_node(2);
        let doubles = AttributeType::Resolved(ValueType::DOUBLE.as_array());
        let event = ConnectionEvent {
            change: ConnectionChange::Connected,
            upstream: port(2, "samples", AttributeType::Unresolved),
            downstream: port(5, "values", doubles),
            connected_ports: vec![],
        };

        assert!(ShuffleHooks.on_connection_type_resolve(&mut node, &event));
        assert_eq!(node.output("samples").unwrap().resolved, doubles);
        assert!(!node.input("choices").unwrap().is_resolved());
    }

    #[test]
    fn test_disconnect_reopens_choices_and_mirrored_samples() {
        let mut node = shuffle_node(2);
        let tokens = AttributeType::Resolved(ValueType::TOKEN.as_array());
        let connect = ConnectionEvent {
            change: ConnectionChange::Connected,
            upstream: port(1, "array", tokens),
            downstream: port(2, "choices", AttributeType::Unresolved),
            connected_ports: vec!["choices".to_string()],
        };
        assert!(ShuffleHooks.on_connection_type_resolve(&mut node, &connect));

        let disconnect = ConnectionEvent {
            change: ConnectionChange::Disconnected,
            upstream: port(1, "array", tokens),
            downstream: port(2, "choices", tokens),
            connected_ports: vec![],
        };
        assert!(ShuffleHooks.on_connection_type_resolve(&mut node, &disconnect));
        assert_eq!(
            node.unresolved_ports(),
            vec!["input:choices", "output:samples"]
        );

        // A different element type can now be adopted
        let ints = AttributeType::Resolved(ValueType::INT.as_array());
        let reconnect = ConnectionEvent {
            change: ConnectionChange::Connected,
            upstream: port(3, "array", ints),
            downstream: port(2, "choices", AttributeType::Unresolved),
            connected_ports: vec!["choices".to_string()],
        };
        assert!(ShuffleHooks.on_connection_type_resolve(&mut node, &reconnect));
        assert_eq!(node.input("choices").unwrap().resolved, ints);
        assert_eq!(node.output("samples").unwrap().resolved, ints);
    }

    #[test]
    fn test_consumed_samples_keep_their_type() {
        let mut node = shuffle_node(2);
        let tokens = AttributeType::Resolved(ValueType::TOKEN.as_array());
        let connect = ConnectionEvent {
            change: ConnectionChange::Connected,
            upstream: port(1, "array", tokens),
            downstream: port(2, "choices", AttributeType::Unresolved),
            connected_ports: vec!["choices".to_string(), "samples".to_string()],
        };
        ShuffleHooks.on_connection_type_resolve(&mut node, &connect);

        let disconnect = ConnectionEvent {
            change: ConnectionChange::Disconnected,
            upstream: port(1, "array", tokens),
            downstream: port(2, "choices", tokens),
            connected_ports: vec!["samples".to_string()],
        };
        assert!(ShuffleHooks.on_connection_type_resolve(&mut node, &disconnect));
        assert!(!node.input("choices").unwrap().is_resolved());
        assert_eq!(node.output("samples").unwrap().resolved, tokens);
    }

    #[test]
    fn test_disconnect_does_not_resolve_choices() {
        let mut node = shuffle_node(2);
        let ints = AttributeType::Resolved(ValueType::INT.as_array());
        let event = ConnectionEvent {
            change: ConnectionChange::Disconnected,
            upstream: port(1, "array", ints),
            downstream: port(2, "choices", AttributeType::Unresolved),
            connected_ports: vec![],
        };

        assert!(!ShuffleHooks.on_connection_type_resolve(&mut node, &event));
        assert!(!node.input("choices").unwrap().is_resolved());
    }
}
