//! Nodle sampling library
//!
//! A shuffling distribution node for the Nodle dataflow graph, the minimal
//! graph runtime that drives it, and the distribution functions that wire it
//! up for graph authors.

pub mod config;
pub mod constants;
pub mod distribution;
pub mod error;
pub mod nodes;
pub mod plugins;
pub mod random;

// Re-export commonly used types
pub use config::SamplingConfig;
pub use distribution::{
    build_shuffle_distribution, infer_type, DistributionArgs, DistributionContext,
    DistributionRegistry, Literal, ScenePath,
};
pub use error::{Result, SamplingError};
pub use nodes::{EvaluationOutcome, ExecutionStats, NodeGraphEngine, NodeRegistry, NodeState};
pub use plugins::{Extension, ExtensionHost, SamplingExtension};
pub use random::RngRegistry;
