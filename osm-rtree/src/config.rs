//! Configuration for opening a tree store.

use crate::store::rtree_constants::{DEFAULT_CACHE_NODES, DEFAULT_MAX_DEPTH};

/// How a store file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Memory-map the whole file.
    #[default]
    Mmap,
    /// Keep a file handle and issue positioned reads per node.
    Positioned,
}

/// Settings for [`crate::RTreeFile`].
///
/// # Examples
///
/// ```rust
/// use osm_rtree::{Backend, RTreeConfig};
///
/// let config = RTreeConfig::default()
///     .backend(Backend::Positioned)
///     .cache_nodes(0)
///     .max_depth(16);
/// assert_eq!(config.max_depth_limit(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct RTreeConfig {
    backend: Backend,
    cache_nodes: usize,
    max_depth: usize,
}

impl Default for RTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RTreeConfig {
    pub fn new() -> Self {
        Self {
            backend: Backend::default(),
            cache_nodes: DEFAULT_CACHE_NODES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Selects how the file is read.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Capacity of the decoded-node cache. Zero disables caching.
    pub fn cache_nodes(mut self, nodes: usize) -> Self {
        self.cache_nodes = nodes;
        self
    }

    /// Levels a walk may descend before failing with `ExcessiveDepth`.
    /// The root is level one.
    pub fn max_depth(mut self, levels: usize) -> Self {
        self.max_depth = levels;
        self
    }

    pub fn backend_kind(&self) -> Backend {
        self.backend
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_nodes
    }

    pub fn max_depth_limit(&self) -> usize {
        self.max_depth
    }
}
