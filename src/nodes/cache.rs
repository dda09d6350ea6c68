//! Output cache for node execution
//!
//! Holds the last committed value of every output port so downstream nodes
//! can read it during the same or later ticks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::nodes::{interface::NodeData, NodeId};

/// Cache key for one output port
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CacheKey {
    /// The node that produced this cached data
    pub node_id: NodeId,
    /// Output port index
    pub port_index: usize,
}

impl CacheKey {
    pub fn new(node_id: NodeId, port_index: usize) -> Self {
        Self {
            node_id,
            port_index,
        }
    }
}

/// Pattern for matching cache keys during invalidation
#[derive(Debug, Clone)]
pub enum CacheKeyPattern {
    /// Match all outputs for a specific node
    Node(NodeId),
}

impl CacheKeyPattern {
    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            CacheKeyPattern::Node(node_id) => key.node_id == *node_id,
        }
    }
}

/// Committed node outputs
#[derive(Debug, Default)]
pub struct OutputCache {
    entries: HashMap<CacheKey, NodeData>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&NodeData> {
        self.entries.get(key)
    }

    /// Store a committed output, replacing the previous tick's value
    pub fn insert(&mut self, key: CacheKey, data: NodeData) {
        self.entries.insert(key, data);
    }

    /// Remove every entry matching `pattern`; returns how many were removed
    pub fn invalidate(&mut self, pattern: &CacheKeyPattern) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.matches(key));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_node() {
        let mut cache = OutputCache::new();
        cache.insert(CacheKey::new(1, 0), NodeData::Int(1));
        cache.insert(CacheKey::new(1, 1), NodeData::Int(2));
        cache.insert(CacheKey::new(2, 0), NodeData::Int(3));

        assert_eq!(cache.invalidate(&CacheKeyPattern::Node(1)), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&CacheKey::new(2, 0)), Some(&NodeData::Int(3)));
    }
}
