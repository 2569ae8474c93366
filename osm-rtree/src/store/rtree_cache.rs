//! LRU cache of decoded nodes.
//!
//! Nodes are cached only after a walk has asked for them; nothing is
//! preloaded. The store is immutable, so entries never go stale.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::rtree_types::{Node, NodeId};

/// LRU cache for decoded nodes, keyed by node address
pub struct NodeCache {
    nodes: LruCache<NodeId, Node>,
}

impl NodeCache {
    /// Creates a cache holding at most `capacity` nodes.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            nodes: LruCache::new(capacity),
        }
    }

    /// Returns a copy of a cached node, marking it most recently used.
    pub fn get(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).cloned()
    }

    /// Inserts a node, evicting the least recently used one when full.
    pub fn insert(&mut self, id: NodeId, node: Node) {
        self.nodes.put(id, node);
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
