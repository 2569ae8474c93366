//! Incremental construction of an in-memory tree ready for writing.
//!
//! Each inserted box becomes a leaf. Insertion descends into the internal
//! child that needs the least area growth; a node that ends up with more
//! than `degree` children is split in two. The result always satisfies
//! the containment invariant, but no balance or query-cost guarantee is
//! made.

use std::path::Path;

use crate::rect::Rect;
use crate::store::rtree_codec::write_tree_file;
use crate::store::rtree_constants::{DEFAULT_DEGREE, MAX_CHILDREN};
use crate::store::rtree_types::{Payload, RTreeError, RTreeResult, TreeNode};

/// Builds a [`TreeNode`] one leaf at a time.
///
/// # Examples
///
/// ```rust
/// use osm_rtree::{Rect, RTreeFile, TreeBuilder, encode_tree};
///
/// let mut builder = TreeBuilder::new();
/// builder.insert(Rect::new(10, 10, 20, 20)?, 7);
/// builder.insert(Rect::new(50, 50, 90, 90)?, 9);
///
/// let tree = builder.finish().expect("two leaves were inserted");
/// let file = RTreeFile::from_bytes(encode_tree(&tree)?);
/// file.verify()?;
/// # Ok::<(), osm_rtree::RTreeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    degree: usize,
    root: Option<TreeNode>,
    len: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Creates a builder with the default fan-out of 32.
    pub fn new() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            root: None,
            len: 0,
        }
    }

    /// Creates a builder with `degree` children per node, between 2 and 255.
    pub fn with_degree(degree: usize) -> RTreeResult<Self> {
        if !(2..=MAX_CHILDREN).contains(&degree) {
            return Err(RTreeError::InvalidOperation(format!(
                "degree must be between 2 and {}, got {}",
                MAX_CHILDREN, degree
            )));
        }
        Ok(Self {
            degree,
            ..Self::new()
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of leaves inserted so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adds one leaf.
    pub fn insert(&mut self, bounds: Rect, payload: Payload) {
        let entry = TreeNode::leaf(bounds, payload);
        self.len += 1;
        self.root = match self.root.take() {
            None => TreeNode::covering(vec![entry]),
            Some(TreeNode::Internal {
                bounds: mut root_bounds,
                children: mut root_children,
            }) => {
                let split = insert_into(&mut root_bounds, &mut root_children, entry, self.degree);
                let root = TreeNode::Internal {
                    bounds: root_bounds,
                    children: root_children,
                };
                match split {
                    Some(sibling) => {
                        log::debug!("Root split after {} leaves, tree grows a level", self.len);
                        TreeNode::covering(vec![root, sibling])
                    }
                    None => Some(root),
                }
            }
            Some(leaf) => TreeNode::covering(vec![leaf, entry]),
        };
    }

    /// Returns the finished tree, or `None` if nothing was inserted.
    pub fn finish(self) -> Option<TreeNode> {
        self.root
    }

    /// Writes the finished tree to `path`, returning the root offset.
    pub fn write_to(self, path: impl AsRef<Path>) -> RTreeResult<u64> {
        let root = self
            .finish()
            .ok_or_else(|| RTreeError::InvalidOperation("cannot write an empty tree".into()))?;
        write_tree_file(path, &root)
    }
}

/// Inserts `entry` below the node described by `bounds`/`children`.
/// Returns the new sibling if the node had to split.
fn insert_into(
    bounds: &mut Rect,
    children: &mut Vec<TreeNode>,
    entry: TreeNode,
    degree: usize,
) -> Option<TreeNode> {
    bounds.expand(entry.bounds());

    let best = children
        .iter()
        .enumerate()
        .filter(|(_, child)| !child.is_leaf())
        .min_by_key(|(i, child)| {
            (
                child.bounds().needed_growth(entry.bounds()),
                child.bounds().area(),
                *i,
            )
        })
        .map(|(i, _)| i);

    let split = match best.and_then(|i| children.get_mut(i)) {
        Some(TreeNode::Internal {
            bounds: child_bounds,
            children: grandchildren,
        }) => insert_into(child_bounds, grandchildren, entry, degree),
        _ => {
            children.push(entry);
            None
        }
    };
    if let Some(sibling) = split {
        children.push(sibling);
    }

    if children.len() > degree {
        split_node(bounds, children)
    } else {
        None
    }
}

#[derive(Default)]
struct Group {
    bounds: Option<Rect>,
    nodes: Vec<TreeNode>,
}

impl Group {
    fn growth(&self, node: &TreeNode) -> u64 {
        self.bounds.map_or(0, |b| b.needed_growth(node.bounds()))
    }

    fn push(&mut self, node: TreeNode) {
        self.bounds = Some(match self.bounds {
            Some(b) => b.union(node.bounds()),
            None => *node.bounds(),
        });
        self.nodes.push(node);
    }
}

/// Splits an overfull node. The first two children seed the two halves;
/// every other child joins the half that grows less (the first on a tie).
/// The node keeps the first half and the second is returned.
fn split_node(bounds: &mut Rect, children: &mut Vec<TreeNode>) -> Option<TreeNode> {
    let mut keep = Group::default();
    let mut moved = Group::default();
    for (i, node) in std::mem::take(children).into_iter().enumerate() {
        let target = match i {
            0 => &mut keep,
            1 => &mut moved,
            _ if keep.growth(&node) > moved.growth(&node) => &mut moved,
            _ => &mut keep,
        };
        target.push(node);
    }

    if let Some(kept) = keep.bounds {
        *bounds = kept;
    }
    *children = keep.nodes;
    TreeNode::covering(moved.nodes)
}
