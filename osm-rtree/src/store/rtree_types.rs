//! Core types for the bounding-box tree store.
//!
//! This module defines the fundamental types used throughout the store:
//! - Error types and result types
//! - Node types (Leaf and Internal), lazy and owned
//! - Statistics structures

use std::io;
use thiserror::Error;

use crate::rect::{Coord, Rect};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading, writing or walking a tree store
#[derive(Debug, Error)]
pub enum RTreeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Format error at offset {offset}: {kind}")]
    Format { offset: NodeId, kind: FormatErrorKind },

    #[error("Structural error at offset {offset}: {kind}")]
    Structural {
        offset: NodeId,
        kind: StructuralErrorKind,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// What was wrong with the bytes at a given offset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("truncated read: needed {needed} bytes, {available} available")]
    Truncated { needed: u64, available: u64 },

    #[error("offset points past end of store (length {len})")]
    OffsetOutOfBounds { len: u64 },

    #[error("inverted rectangle {{{x0}, {y0}, {x1}, {y1}}}")]
    InvertedRect {
        x0: Coord,
        y0: Coord,
        x1: Coord,
        y1: Coord,
    },

    #[error("leaf record has no payload")]
    MissingPayload,

    #[error("coordinate {value} does not fit in 32 bits")]
    CoordinateOutOfRange { value: i64 },

    #[error("malformed document: {0}")]
    Json(String),
}

/// Tree-shape violations found while walking the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralErrorKind {
    #[error("child bounds {child_bounds} escape parent {parent} bounds {parent_bounds}")]
    ContainmentViolated {
        parent: NodeId,
        parent_bounds: Rect,
        child_bounds: Rect,
    },

    /// The error's `offset` is the node holding the pointer back to
    /// `ancestor`. A root that points at itself is its own parent.
    #[error("cycle back to ancestor at offset {ancestor}")]
    Cycle { ancestor: NodeId },

    /// A second reference to a node already reached from `first_parent`.
    /// The error's `offset` is the node holding the second pointer.
    #[error("node {child} already referenced by {first_parent}")]
    SharedChild { child: NodeId, first_parent: NodeId },

    #[error("tree deeper than {limit} levels")]
    ExcessiveDepth { limit: usize },
}

/// Coarse classification used when reporting at a process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Structural,
    InvalidOperation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Io => "IoError",
            ErrorKind::Format => "FormatError",
            ErrorKind::Structural => "StructuralError",
            ErrorKind::InvalidOperation => "InvalidOperation",
        };
        f.write_str(name)
    }
}

impl RTreeError {
    pub(crate) fn format(offset: NodeId, kind: FormatErrorKind) -> Self {
        RTreeError::Format { offset, kind }
    }

    pub(crate) fn structural(offset: NodeId, kind: StructuralErrorKind) -> Self {
        RTreeError::Structural { offset, kind }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RTreeError::Io(_) => ErrorKind::Io,
            RTreeError::Format { .. } => ErrorKind::Format,
            RTreeError::Structural { .. } => ErrorKind::Structural,
            RTreeError::InvalidOperation(_) => ErrorKind::InvalidOperation,
        }
    }

    /// The byte offset (or node id) the error is attached to, if any.
    pub fn offset(&self) -> Option<NodeId> {
        match self {
            RTreeError::Format { offset, .. } | RTreeError::Structural { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

/// Result type for tree store operations
pub type RTreeResult<T> = Result<T, RTreeError>;

/// Opaque reference stored at a leaf (e.g. a way id in an external table)
pub type Payload = u32;

/// Node address: absolute byte offset in the binary store, record index
/// in the JSON variant
pub type NodeId = u64;

// ============================================================================
// Node Types
// ============================================================================

/// A single decoded node. Children of an internal node are addresses,
/// resolved only when a walk reaches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Internal { bounds: Rect, children: Vec<NodeId> },
    Leaf { bounds: Rect, payload: Payload },
}

impl Node {
    pub fn bounds(&self) -> &Rect {
        match self {
            Node::Internal { bounds, .. } | Node::Leaf { bounds, .. } => bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Child addresses in stored order; empty for a leaf.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Internal { children, .. } => children,
            Node::Leaf { .. } => &[],
        }
    }

    pub fn payload(&self) -> Option<Payload> {
        match self {
            Node::Leaf { payload, .. } => Some(*payload),
            Node::Internal { .. } => None,
        }
    }
}

/// A leaf yielded by a spatial query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub id: NodeId,
    pub bounds: Rect,
    pub payload: Payload,
}

/// A node yielded by a pre-order traversal, with its address and depth
/// (the root is at depth 0)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitedNode {
    pub id: NodeId,
    pub depth: usize,
    pub node: Node,
}

/// A fully materialized tree, used for writing and eager loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Internal { bounds: Rect, children: Vec<TreeNode> },
    Leaf { bounds: Rect, payload: Payload },
}

impl TreeNode {
    pub fn leaf(bounds: Rect, payload: Payload) -> Self {
        TreeNode::Leaf { bounds, payload }
    }

    /// An internal node whose bounds are the union of its children.
    ///
    /// Returns `None` for an empty child list, which the format cannot
    /// represent as an internal node.
    pub fn covering(children: Vec<TreeNode>) -> Option<Self> {
        let mut iter = children.iter();
        let mut bounds = *iter.next()?.bounds();
        for child in iter {
            bounds.expand(child.bounds());
        }
        Some(TreeNode::Internal { bounds, children })
    }

    pub fn bounds(&self) -> &Rect {
        match self {
            TreeNode::Internal { bounds, .. } | TreeNode::Leaf { bounds, .. } => bounds,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Internal { children, .. } => children,
            TreeNode::Leaf { .. } => &[],
        }
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(TreeNode::node_count).sum::<usize>()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about store reads
#[derive(Debug, Clone, Default)]
pub struct RTreeStats {
    pub store_len: u64,
    pub node_reads: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached_nodes: u64,
}
