use std::collections::HashSet;
use std::sync::Arc;

use nodle_sampling::constants::attributes;
use nodle_sampling::nodes::interface::{Element, NodeData};
use nodle_sampling::nodes::NodeId;
use nodle_sampling::{
    DistributionArgs, DistributionContext, DistributionRegistry, EvaluationOutcome, Extension,
    ExtensionHost, Literal, NodeGraphEngine, NodeRegistry, RngRegistry, SamplingConfig,
    SamplingExtension,
};

struct Host {
    node_types: NodeRegistry,
    distributions: DistributionRegistry,
    config: SamplingConfig,
    engine: NodeGraphEngine,
    rng: Arc<RngRegistry>,
}

impl Host {
    fn new(global_seed: Option<u64>) -> Self {
        let mut node_types = NodeRegistry::new();
        let mut distributions = DistributionRegistry::new();
        SamplingExtension::new()
            .on_startup(&mut ExtensionHost::new(&mut node_types, &mut distributions))
            .unwrap();
        let config = SamplingConfig {
            global_seed,
            ..SamplingConfig::default()
        };
        let rng = Arc::new(RngRegistry::from_config(&config));
        Self {
            node_types,
            distributions,
            config,
            engine: NodeGraphEngine::new(Arc::clone(&rng)),
            rng,
        }
    }

    fn shuffle(&mut self, args: &DistributionArgs) -> NodeId {
        let mut ctx = DistributionContext::new(&mut self.engine, &self.node_types, &self.config);
        self.distributions.call("shuffle", &mut ctx, args).unwrap()
    }

    fn sample(&mut self, node: NodeId) -> Vec<Element> {
        self.engine.tick().unwrap();
        assert_eq!(
            self.engine.last_outcome(node),
            Some(&EvaluationOutcome::Computed)
        );
        self.engine
            .output(node, attributes::SAMPLES)
            .and_then(NodeData::as_array)
            .map(|array| array.items().to_vec())
            .unwrap()
    }
}

fn letters(values: &[&str]) -> Vec<Literal> {
    values.iter().map(|v| Literal::from(*v)).collect()
}

fn token_set(items: &[Element]) -> HashSet<String> {
    items
        .iter()
        .map(|item| match item {
            Element::Token(t) => t.clone(),
            other => panic!("unexpected element {:?}", other),
        })
        .collect()
}

#[test]
fn shuffle_reproduces_for_same_identity_after_rebuild() {
    let mut host = Host::new(None);
    let args = DistributionArgs::new(letters(&["a", "b", "c"]))
        .with_seed(5_i64)
        .with_name("Letters");

    let node = host.shuffle(&args);
    let first = host.sample(node);
    assert_eq!(first.len(), 3);
    assert_eq!(
        token_set(&first),
        ["a", "b", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect::<HashSet<String>>()
    );

    // Tear the distribution down and build it again under the same path
    let ids: Vec<NodeId> = host.engine.graph().nodes.keys().copied().collect();
    for id in ids {
        host.engine.remove_node(id).unwrap();
    }
    assert!(host.rng.is_empty());

    let rebuilt = host.shuffle(&args);
    assert_eq!(host.engine.node(rebuilt).unwrap().path, "/Replicator/Letters");
    assert_eq!(host.sample(rebuilt), first);
}

#[test]
fn separate_hosts_agree_on_seeded_sequences() {
    let choices: Vec<Literal> = (0..12).map(Literal::Int).collect();
    let args = DistributionArgs::new(choices).with_seed(11_i64).with_name("Numbers");

    let mut first = Host::new(None);
    let mut second = Host::new(None);
    let a = first.shuffle(&args);
    let b = second.shuffle(&args);

    for _ in 0..3 {
        assert_eq!(first.sample(a), second.sample(b));
    }
}

#[test]
fn consecutive_ticks_continue_the_stream() {
    let mut host = Host::new(None);
    let choices: Vec<Literal> = (0..16).map(Literal::Int).collect();
    let node = host.shuffle(&DistributionArgs::new(choices).with_seed(2_i64).with_name("N"));

    let first = host.sample(node);
    let second = host.sample(node);
    assert_ne!(first, second);

    let mut sorted = second.clone();
    sorted.sort_by_key(|item| match item {
        Element::Int(i) => *i,
        _ => i64::MAX,
    });
    assert_eq!(sorted, (0..16).map(Element::Int).collect::<Vec<_>>());
}

#[test]
fn changing_the_seed_reseeds() {
    let mut host = Host::new(None);
    let choices: Vec<Literal> = (0..16).map(Literal::Int).collect();
    let node = host.shuffle(&DistributionArgs::new(choices).with_seed(4_i64).with_name("N"));
    let path = host.engine.node(node).unwrap().path.clone();

    let at_four = host.sample(node);
    host.engine.set_input(node, "seed", NodeData::Int(8)).unwrap();
    host.sample(node);
    assert_eq!(host.rng.seed_of(&path), Some(8));

    // Going back to the first seed restarts its stream
    host.engine.set_input(node, "seed", NodeData::Int(4)).unwrap();
    assert_eq!(host.sample(node), at_four);
}

#[test]
fn identity_is_mixed_into_the_seed() {
    let mut host = Host::new(None);
    let choices: Vec<Literal> = (0..8).map(Literal::Int).collect();

    // Same seed, many identities: whole permutations should rarely coincide
    let mut permutations = Vec::new();
    for i in 0..24 {
        let name = format!("Node{}", i);
        let args = DistributionArgs::new(choices.clone()).with_seed(1_i64).with_name(&name);
        let node = host.shuffle(&args);
        permutations.push(host.sample(node));
    }

    let mut pairs = 0;
    let mut differing = 0;
    for (i, first) in permutations.iter().enumerate() {
        for second in &permutations[i + 1..] {
            pairs += 1;
            if first != second {
                differing += 1;
            }
        }
    }
    assert_eq!(pairs, 276);
    assert!(differing * 10 >= pairs * 9, "{} of {} pairs differ", differing, pairs);
}

#[test]
fn global_seed_makes_negative_seeds_reproducible() {
    let choices: Vec<Literal> = (0..12).map(Literal::Int).collect();
    let args = DistributionArgs::new(choices).with_name("Global");

    let mut first = Host::new(Some(77));
    let mut second = Host::new(Some(77));
    let a = first.shuffle(&args);
    let b = second.shuffle(&args);
    assert_eq!(first.sample(a), second.sample(b));
}

#[test]
fn empty_array_literal_yields_no_output() {
    let mut host = Host::new(None);
    let args = DistributionArgs::new(letters(&["only"])).with_seed(1_i64).with_name("Single");
    let node = host.shuffle(&args);
    assert_eq!(host.sample(node).len(), 1);

    let array = host.engine.find_by_path("/Replicator/Single_Array").unwrap();
    let empty = NodeData::Array(nodle_sampling::nodes::ArrayValue::empty(
        nodle_sampling::nodes::ValueType::TOKEN,
    ));
    host.engine.set_input(array, "array", empty).unwrap();
    host.engine.tick().unwrap();
    assert_eq!(
        host.engine.last_outcome(node),
        Some(&EvaluationOutcome::NoOutput)
    );
    // The previous samples stay committed
    assert_eq!(
        host.engine
            .output(node, attributes::SAMPLES)
            .and_then(NodeData::as_array)
            .map(|array| array.len()),
        Some(1)
    );
}

#[test]
fn engine_shutdown_releases_rng_state() {
    let mut host = Host::new(None);
    let node = host.shuffle(&DistributionArgs::new(letters(&["x", "y"])).with_name("XY"));
    host.sample(node);

    host.engine.shutdown();
    assert!(host.rng.is_empty());

    let mut extension = SamplingExtension::new();
    let mut ext_host = ExtensionHost::new(&mut host.node_types, &mut host.distributions);
    // A fresh extension instance was never started, so shutdown leaves things alone
    extension.on_shutdown(&mut ext_host);
    assert!(host.distributions.contains("shuffle"));
}
