//! Extension lifecycle
//!
//! An extension contributes node types and distribution functions when it is
//! started and takes them back when it is shut down.

use log::{info, warn};

use crate::constants::node_types;
use crate::distribution::{self, DistributionRegistry};
use crate::error::Result;
use crate::nodes::{ArrayNode, NodeRegistry, SampleShuffleNode};

/// Registries an extension contributes to
pub struct ExtensionHost<'a> {
    pub node_types: &'a mut NodeRegistry,
    pub distributions: &'a mut DistributionRegistry,
}

impl<'a> ExtensionHost<'a> {
    pub fn new(node_types: &'a mut NodeRegistry, distributions: &'a mut DistributionRegistry) -> Self {
        Self {
            node_types,
            distributions,
        }
    }
}

/// Startup/shutdown hooks of a loadable extension
pub trait Extension {
    fn name(&self) -> &str;

    fn on_startup(&mut self, host: &mut ExtensionHost<'_>) -> Result<()>;

    fn on_shutdown(&mut self, host: &mut ExtensionHost<'_>);
}

/// Shuffle sampling extension: the shuffle and array node types plus the
/// `shuffle` distribution
#[derive(Debug, Default)]
pub struct SamplingExtension {
    started: bool,
}

impl SamplingExtension {
    pub const DISTRIBUTION: &'static str = "shuffle";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Extension for SamplingExtension {
    fn name(&self) -> &str {
        "nodle.sampling"
    }

    fn on_startup(&mut self, host: &mut ExtensionHost<'_>) -> Result<()> {
        if self.started {
            warn!("{} is already started", self.name());
            return Ok(());
        }

        host.node_types.register::<SampleShuffleNode>()?;
        if let Err(e) = host.node_types.register::<ArrayNode>() {
            host.node_types.deregister(node_types::SAMPLE_SHUFFLE);
            return Err(e);
        }
        if let Err(e) = host
            .distributions
            .register(Self::DISTRIBUTION, distribution::shuffle::shuffle)
        {
            host.node_types.deregister(node_types::ARRAY);
            host.node_types.deregister(node_types::SAMPLE_SHUFFLE);
            return Err(e);
        }

        self.started = true;
        info!("{} started", self.name());
        Ok(())
    }

    fn on_shutdown(&mut self, host: &mut ExtensionHost<'_>) {
        if !self.started {
            return;
        }
        host.distributions.deregister(Self::DISTRIBUTION);
        host.node_types.deregister(node_types::ARRAY);
        host.node_types.deregister(node_types::SAMPLE_SHUFFLE);
        self.started = false;
        info!("{} shut down", self.name());
    }
}
