//! Constants for the bounding-box tree store layout.

/// File position of the big-endian `u32` root offset
pub const ROOT_POINTER_POS: u64 = 0;

/// Width of every integer field (root offset, coordinates, child offsets, payload)
pub const FIELD_WIDTH: usize = 4;

/// Node prefix: one `u8` child count followed by four coordinates
pub const NODE_HEADER_LEN: usize = 1 + 4 * FIELD_WIDTH;

/// A leaf is the node prefix plus one payload field
pub const LEAF_NODE_LEN: usize = NODE_HEADER_LEN + FIELD_WIDTH;

/// The child count is a single byte
pub const MAX_CHILDREN: usize = u8::MAX as usize;

/// Default capacity of the decoded-node cache (0 disables it)
pub const DEFAULT_CACHE_NODES: usize = 1024;

/// Default bound on root-to-leaf depth before a walk gives up
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default fan-out used by the incremental builder
pub const DEFAULT_DEGREE: usize = 32;

/// Degrees to fixed-point coordinate scale
pub const FIXED_POINT_SCALE: f64 = 10_000_000.0;
