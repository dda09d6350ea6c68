//! Distribution functions
//!
//! A distribution builds the nodes that sample values for a graph author, so
//! callers ask for "shuffle" instead of wiring array and sampler nodes by hand.

pub mod inference;
pub mod literal;
pub mod shuffle;

use std::collections::BTreeMap;

use log::{debug, info};

use crate::config::SamplingConfig;
use crate::error::{Result, SamplingError};
use crate::nodes::{NodeGraphEngine, NodeId, NodeRegistry};

pub use inference::infer_type;
pub use literal::{Literal, ScenePath};
pub use shuffle::build_shuffle_distribution;

/// What a distribution function needs to create nodes
pub struct DistributionContext<'a> {
    pub engine: &'a mut NodeGraphEngine,
    pub node_types: &'a NodeRegistry,
    pub config: &'a SamplingConfig,
}

impl<'a> DistributionContext<'a> {
    pub fn new(
        engine: &'a mut NodeGraphEngine,
        node_types: &'a NodeRegistry,
        config: &'a SamplingConfig,
    ) -> Self {
        Self {
            engine,
            node_types,
            config,
        }
    }
}

/// Arguments of a dynamic distribution call: `(choices, seed = -1, name = None)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionArgs {
    pub choices: Vec<Literal>,
    pub seed: Option<Literal>,
    pub name: Option<String>,
}

impl DistributionArgs {
    pub fn new(choices: Vec<Literal>) -> Self {
        Self {
            choices,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: impl Into<Literal>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Signature of a registered distribution function
pub type DistributionFn = fn(&mut DistributionContext<'_>, &DistributionArgs) -> Result<NodeId>;

/// Named distribution functions
#[derive(Default)]
pub struct DistributionRegistry {
    functions: BTreeMap<String, DistributionFn>,
}

impl DistributionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under `name`. Each name may be registered once.
    pub fn register(&mut self, name: &str, function: DistributionFn) -> Result<()> {
        if self.functions.contains_key(name) {
            return Err(SamplingError::Graph(format!(
                "Distribution {} is already registered",
                name
            )));
        }
        self.functions.insert(name.to_string(), function);
        info!("Registered distribution {}", name);
        Ok(())
    }

    pub fn deregister(&mut self, name: &str) -> bool {
        let removed = self.functions.remove(name).is_some();
        if removed {
            info!("Deregistered distribution {}", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(|name| name.as_str()).collect()
    }

    /// Call the distribution registered as `name`
    pub fn call(
        &self,
        name: &str,
        ctx: &mut DistributionContext<'_>,
        args: &DistributionArgs,
    ) -> Result<NodeId> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| SamplingError::Graph(format!("Unknown distribution {}", name)))?;
        debug!("Calling distribution {} with {} choices", name, args.choices.len());
        function(ctx, args)
    }
}
