//! RTreeFile implementation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::json_store::JsonStore;
use super::node_source::{BinaryStore, NodeSource};
use super::rtree_cache::NodeCache;
use super::rtree_storage::{ByteSource, FileBacked, FileSource, MmapSource};
use super::rtree_types::{
    LeafEntry, Node, NodeId, RTreeError, RTreeResult, RTreeStats, StructuralErrorKind, TreeNode,
    VisitedNode,
};
use crate::config::{Backend, RTreeConfig};
use crate::rect::{Point, Rect};

/// A read-only bounding-box tree over a [`NodeSource`].
///
/// Opening a store reads nothing but metadata. Nodes are decoded when a
/// walk reaches them and kept in a small LRU cache. All walks use an
/// explicit stack and remember every node they reached, so cyclic,
/// shared or absurdly deep input ends in a `Structural` error instead of
/// a hang or a stack overflow. No walk reads a node twice.
///
/// The tree owns its source. Dropping it releases the file handle or
/// memory map, whether or not a walk ran to completion.
pub struct RTreeFile<S: NodeSource> {
    source: S,
    cache: Option<Mutex<NodeCache>>,
    config: RTreeConfig,
    stats: RTreeStatistics,
}

/// Internal statistics tracking
struct RTreeStatistics {
    node_reads: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl RTreeStatistics {
    fn new() -> Self {
        Self {
            node_reads: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }
}

impl RTreeFile<BinaryStore<FileBacked>> {
    /// Opens a binary store file with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> RTreeResult<Self> {
        Self::open_with_config(path, RTreeConfig::default())
    }

    /// Opens a binary store file.
    ///
    /// Only the file length is read here; the root offset is checked on
    /// the first walk.
    pub fn open_with_config(path: impl AsRef<Path>, config: RTreeConfig) -> RTreeResult<Self> {
        let path = path.as_ref();
        let bytes = match config.backend_kind() {
            Backend::Mmap => FileBacked::Mmap(MmapSource::open(path)?),
            Backend::Positioned => FileBacked::Positioned(FileSource::open(path)?),
        };
        log::debug!(
            "Opened tree store at {:?} ({:?}, {} bytes)",
            path,
            config.backend_kind(),
            bytes.len()
        );
        Ok(Self::with_source(BinaryStore::new(bytes), config))
    }
}

impl RTreeFile<BinaryStore<Vec<u8>>> {
    /// Wraps an in-memory binary store.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::with_source(BinaryStore::new(bytes), RTreeConfig::default())
    }
}

impl RTreeFile<JsonStore> {
    /// Loads a structured-text store file.
    pub fn open_json(path: impl AsRef<Path>) -> RTreeResult<Self> {
        Ok(Self::with_source(
            JsonStore::open(path)?,
            RTreeConfig::default(),
        ))
    }

    /// Parses a structured-text store held in memory.
    pub fn from_json_str(text: &str) -> RTreeResult<Self> {
        Ok(Self::with_source(
            JsonStore::parse(text)?,
            RTreeConfig::default(),
        ))
    }
}

impl<S: NodeSource> RTreeFile<S> {
    /// Wraps any node source.
    pub fn with_source(source: S, config: RTreeConfig) -> Self {
        let cache = NonZeroUsize::new(config.cache_capacity()).map(|n| Mutex::new(NodeCache::new(n)));
        Self {
            source,
            cache,
            config,
            stats: RTreeStatistics::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RTreeConfig {
        &self.config
    }

    /// Address of the root node.
    pub fn root_id(&self) -> RTreeResult<NodeId> {
        self.source.root_id()
    }

    /// Decodes the root node.
    pub fn root(&self) -> RTreeResult<Node> {
        let id = self.root_id()?;
        self.node(id)
    }

    /// Decodes the node at `id`, from the cache when possible.
    pub fn node(&self, id: NodeId) -> RTreeResult<Node> {
        if let Some(cache) = &self.cache {
            if let Some(node) = cache.lock().get(id) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(node);
            }
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        self.stats.node_reads.fetch_add(1, Ordering::Relaxed);
        let node = self.source.read_node(id)?;

        if let Some(cache) = &self.cache {
            cache.lock().insert(id, node.clone());
        }
        Ok(node)
    }

    /// Lazy pre-order walk over every node, siblings in stored order.
    ///
    /// Each call starts afresh from the root. After an error is yielded
    /// the iterator is finished.
    pub fn traverse(&self) -> Traverse<'_, S> {
        Traverse {
            walk: Walk::new(self, None),
        }
    }

    /// Lazy walk yielding every leaf whose bounds intersect `region`.
    ///
    /// Subtrees whose bounds miss `region` are never read. Leaves come out
    /// in stored order, not sorted.
    pub fn query_intersecting(&self, region: Rect) -> Query<'_, S> {
        Query {
            walk: Walk::new(self, Some(region)),
        }
    }

    /// Lazy walk yielding every leaf whose bounds contain `p`.
    pub fn query_containing_point(&self, p: Point) -> Query<'_, S> {
        self.query_intersecting(Rect::point(p))
    }

    /// Number of nodes reached by [`RTreeFile::traverse`].
    pub fn node_count(&self) -> RTreeResult<usize> {
        self.traverse().try_fold(0, |count, visited| visited.map(|_| count + 1))
    }

    /// Number of leaves reached by [`RTreeFile::traverse`].
    pub fn leaf_count(&self) -> RTreeResult<usize> {
        self.traverse().try_fold(0, |count, visited| {
            visited.map(|v| if v.node.is_leaf() { count + 1 } else { count })
        })
    }

    /// Levels on the longest root-to-leaf path. A lone leaf root has depth 1.
    pub fn depth(&self) -> RTreeResult<usize> {
        self.traverse()
            .try_fold(0, |deepest, visited| visited.map(|v| deepest.max(v.depth + 1)))
    }

    /// Checks the whole tree: every child lies inside its parent, every
    /// node has exactly one parent, and no path is longer than the
    /// configured limit.
    ///
    /// Nodes are checked in pre-order, so the first violation returned is
    /// the outermost one on its path.
    pub fn verify(&self) -> RTreeResult<()> {
        let limit = self.config.max_depth_limit();
        let mut stack: Vec<(NodeId, usize, Option<(NodeId, Rect)>)> =
            vec![(self.root_id()?, 0, None)];
        let mut visits = Visits::default();

        while let Some((id, depth, parent)) = stack.pop() {
            if let Err(e) = visits.enter(id, depth, limit) {
                log::warn!("Tree verification failed: {}", e);
                return Err(e);
            }

            let node = self.node(id)?;
            if let Some((parent_id, parent_bounds)) = parent {
                if !parent_bounds.contains_rect(node.bounds()) {
                    let e = RTreeError::structural(
                        id,
                        StructuralErrorKind::ContainmentViolated {
                            parent: parent_id,
                            parent_bounds,
                            child_bounds: *node.bounds(),
                        },
                    );
                    log::warn!("Tree verification failed: {}", e);
                    return Err(e);
                }
            }

            visits.descend(id);
            let bounds = *node.bounds();
            for child in node.children().iter().rev() {
                stack.push((*child, depth + 1, Some((id, bounds))));
            }
        }
        Ok(())
    }

    /// Decodes the whole tree into memory.
    pub fn load_tree(&self) -> RTreeResult<TreeNode> {
        let mut visits = Visits::default();
        self.materialize(self.root_id()?, 0, &mut visits)
    }

    // Recursion is bounded by the depth limit, which Visits::enter enforces.
    fn materialize(&self, id: NodeId, depth: usize, visits: &mut Visits) -> RTreeResult<TreeNode> {
        visits.enter(id, depth, self.config.max_depth_limit())?;
        match self.node(id)? {
            Node::Leaf { bounds, payload } => Ok(TreeNode::Leaf { bounds, payload }),
            Node::Internal { bounds, children } => {
                visits.descend(id);
                let children = children
                    .into_iter()
                    .map(|child| self.materialize(child, depth + 1, visits))
                    .collect::<RTreeResult<Vec<_>>>()?;
                Ok(TreeNode::Internal { bounds, children })
            }
        }
    }

    /// Get read statistics
    pub fn stats(&self) -> RTreeStats {
        RTreeStats {
            store_len: self.source.store_len(),
            node_reads: self.stats.node_reads.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.stats.cache_misses.load(Ordering::Relaxed),
            cached_nodes: self.cache.as_ref().map_or(0, |c| c.lock().len() as u64),
        }
    }
}

/// Per-walk record of the current root-to-node path and of the parent
/// that first referenced each node reached so far.
///
/// Every node may be entered once, so a walk reads at most as many nodes
/// as the store holds, whatever the pointers say.
#[derive(Default)]
struct Visits {
    path: Vec<NodeId>,
    first_parent: HashMap<NodeId, NodeId>,
}

impl Visits {
    /// Records a step to `id` at `depth`, rejecting it when it would exceed
    /// the depth limit, point back to an ancestor or reach a node a second
    /// time.
    fn enter(&mut self, id: NodeId, depth: usize, limit: usize) -> RTreeResult<()> {
        self.path.truncate(depth);
        if depth >= limit {
            return Err(RTreeError::structural(
                id,
                StructuralErrorKind::ExcessiveDepth { limit },
            ));
        }
        let parent = self.path.last().copied().unwrap_or(id);
        if self.path.contains(&id) {
            return Err(RTreeError::structural(
                parent,
                StructuralErrorKind::Cycle { ancestor: id },
            ));
        }
        match self.first_parent.entry(id) {
            Entry::Occupied(first) => Err(RTreeError::structural(
                parent,
                StructuralErrorKind::SharedChild {
                    child: id,
                    first_parent: *first.get(),
                },
            )),
            Entry::Vacant(slot) => {
                slot.insert(parent);
                Ok(())
            }
        }
    }

    /// Marks `id` as the parent of the steps that follow.
    fn descend(&mut self, id: NodeId) {
        self.path.push(id);
    }
}

// ============================================================================
// Lazy walks
// ============================================================================

/// Explicit-stack pre-order walk shared by traversal and queries.
struct Walk<'a, S: NodeSource> {
    tree: &'a RTreeFile<S>,
    region: Option<Rect>,
    stack: Vec<(NodeId, usize)>,
    visits: Visits,
    started: bool,
    finished: bool,
}

impl<'a, S: NodeSource> Walk<'a, S> {
    fn new(tree: &'a RTreeFile<S>, region: Option<Rect>) -> Self {
        Self {
            tree,
            region,
            stack: Vec::new(),
            visits: Visits::default(),
            started: false,
            finished: false,
        }
    }

    fn fail(&mut self, err: RTreeError) -> Option<RTreeResult<VisitedNode>> {
        self.finished = true;
        self.stack.clear();
        Some(Err(err))
    }

    fn next_node(&mut self) -> Option<RTreeResult<VisitedNode>> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            match self.tree.root_id() {
                Ok(root) => self.stack.push((root, 0)),
                Err(e) => return self.fail(e),
            }
        }

        let limit = self.tree.config.max_depth_limit();
        while let Some((id, depth)) = self.stack.pop() {
            if let Err(e) = self.visits.enter(id, depth, limit) {
                return self.fail(e);
            }
            let node = match self.tree.node(id) {
                Ok(node) => node,
                Err(e) => return self.fail(e),
            };
            if let Some(region) = &self.region {
                if !node.bounds().intersects(region) {
                    continue;
                }
            }

            self.visits.descend(id);
            for child in node.children().iter().rev() {
                self.stack.push((*child, depth + 1));
            }
            return Some(Ok(VisitedNode { id, depth, node }));
        }

        self.finished = true;
        None
    }
}

/// Iterator returned by [`RTreeFile::traverse`].
pub struct Traverse<'a, S: NodeSource> {
    walk: Walk<'a, S>,
}

impl<S: NodeSource> Iterator for Traverse<'_, S> {
    type Item = RTreeResult<VisitedNode>;

    fn next(&mut self) -> Option<Self::Item> {
        self.walk.next_node()
    }
}

/// Iterator returned by [`RTreeFile::query_intersecting`] and
/// [`RTreeFile::query_containing_point`].
pub struct Query<'a, S: NodeSource> {
    walk: Walk<'a, S>,
}

impl<S: NodeSource> Iterator for Query<'_, S> {
    type Item = RTreeResult<LeafEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walk.next_node()? {
                Ok(VisitedNode {
                    id,
                    node: Node::Leaf { bounds, payload },
                    ..
                }) => return Some(Ok(LeafEntry { id, bounds, payload })),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
