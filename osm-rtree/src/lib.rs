//! # OSM R-Tree - Disk-Resident Bounding-Box Trees
//!
//! Reads, queries and checks R-tree-like spatial indexes stored as a flat
//! binary file. Nodes are decoded lazily by byte offset, so opening a file
//! costs nothing and a query only touches the branches it needs.
//!
//! ## Features
//!
//! - **Lazy Decoding**: a node's children are read only when visited
//! - **Bounded Walks**: cycles and runaway depth are reported, never followed
//! - **Verification**: every parent box must contain its children's boxes
//! - **Two Backends**: memory-mapped or positioned file reads
//! - **Node Cache**: LRU cache of decoded nodes, shared across threads
//! - **Writer & Builder**: produce files the reader accepts
//! - **Structured Text**: the same tree as a JSON document
//!
//! ## Quick Start
//!
//! ```rust
//! use osm_rtree::{Point, Rect, RTreeFile, TreeBuilder, encode_tree};
//!
//! # fn main() -> Result<(), osm_rtree::RTreeError> {
//! let mut builder = TreeBuilder::new();
//! builder.insert(Rect::new(10, 10, 20, 20)?, 7);
//! builder.insert(Rect::new(50, 50, 90, 90)?, 9);
//! let tree = builder.finish().expect("non-empty");
//!
//! let file = RTreeFile::from_bytes(encode_tree(&tree)?);
//! file.verify()?;
//!
//! let hits: Vec<u32> = file
//!     .query_containing_point(Point::new(15, 15))
//!     .map(|leaf| leaf.map(|l| l.payload))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(hits, vec![7]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Opening a file
//!
//! ```rust,no_run
//! use osm_rtree::{Backend, RTreeConfig, RTreeFile, Rect};
//!
//! # fn main() -> Result<(), osm_rtree::RTreeError> {
//! let config = RTreeConfig::default().backend(Backend::Positioned);
//! let file = RTreeFile::open_with_config("ways.rtree", config)?;
//! for leaf in file.query_intersecting(Rect::new(0, 0, 1_000, 1_000)?) {
//!     println!("{}", leaf?.payload);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod rect;
pub mod store;

pub use builder::TreeBuilder;
pub use config::{Backend, RTreeConfig};
pub use rect::{Coord, Point, Rect};
pub use store::{
    encode_tree, read_node, read_root, read_root_offset, write_tree, write_tree_file,
    BinaryStore, ByteSource, ErrorKind, FileBacked, FileSource, FormatErrorKind, JsonStore,
    LeafEntry, MmapSource, Node, NodeId, NodeSource, Payload, Query, RTreeError, RTreeFile,
    RTreeResult, RTreeStats, StructuralErrorKind, Traverse, TreeNode, VisitedNode,
};
pub use store::rtree_constants::{DEFAULT_CACHE_NODES, DEFAULT_DEGREE, DEFAULT_MAX_DEPTH};
