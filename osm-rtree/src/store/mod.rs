//! Storage layer for on-disk bounding-box trees.
//!
//! A tree file is a flat byte array of nodes addressed by byte offset.
//! Nothing is decoded up front; the engine asks a [`NodeSource`] for one
//! node at a time and follows child offsets only when a walk reaches them.
//!
//! # Sources
//!
//! - [`BinaryStore`]: the big-endian layout over any [`ByteSource`]
//!   (memory-mapped file, positioned file reads, or an in-memory buffer)
//! - [`JsonStore`]: the structured-text variant, parsed eagerly
//!
//! # Safety of untrusted input
//!
//! Every read is bounds-checked and every walk tracks its ancestor path,
//! so truncated, cyclic or absurdly deep inputs fail with a typed error
//! instead of panicking or looping.

pub mod json_store;
pub mod node_source;
pub mod rtree_cache;
pub mod rtree_codec;
pub mod rtree_constants;
mod rtree_impl;
pub mod rtree_storage;
pub mod rtree_types;

pub use json_store::JsonStore;
pub use node_source::{BinaryStore, NodeSource};
pub use rtree_codec::{encode_tree, read_node, read_root, read_root_offset, write_tree, write_tree_file};
pub use rtree_impl::{Query, RTreeFile, Traverse};
pub use rtree_storage::{ByteSource, FileBacked, FileSource, MmapSource};
pub use rtree_types::{
    ErrorKind, FormatErrorKind, LeafEntry, Node, NodeId, Payload, RTreeError, RTreeResult,
    RTreeStats, StructuralErrorKind, TreeNode, VisitedNode,
};
