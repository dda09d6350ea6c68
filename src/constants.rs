//! Application-wide constants and default values
//!
//! Centralized location for node type names, attribute names and seeds

/// Node type identifiers
pub mod node_types {
    /// Shuffling distribution node
    pub const SAMPLE_SHUFFLE: &str = "nodle.sampling.SampleShuffle";

    /// Array literal node feeding distribution nodes
    pub const ARRAY: &str = "nodle.sampling.Array";
}

/// Attribute names used by the sampling nodes
pub mod attributes {
    pub const CHOICES: &str = "choices";
    pub const SEED: &str = "seed";
    pub const SAMPLES: &str = "samples";

    /// Array literal value, authored on the array node
    pub const ARRAY: &str = "array";
    /// Element type tag of the array node (e.g. `token`, `double3`)
    pub const ARRAY_TYPE: &str = "arrayType";
}

/// Random seed conventions
pub mod seed {
    /// Seeds below zero defer to the global seed source
    pub const USE_GLOBAL: i64 = -1;
}

/// Graph path defaults
pub mod graph {
    /// Root under which distribution nodes are created
    pub const DEFAULT_ROOT: &str = "/Replicator";

    /// Path separator for node identities
    pub const SEPARATOR: char = '/';
}

/// Environment variables read by the configuration loader
pub mod env {
    pub const GLOBAL_SEED: &str = "NODLE_GLOBAL_SEED";
    pub const GRAPH_ROOT: &str = "NODLE_GRAPH_ROOT";
}
