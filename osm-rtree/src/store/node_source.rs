//! Node sources: where an [`crate::RTreeFile`] gets its nodes from.

use super::rtree_codec;
use super::rtree_storage::ByteSource;
use super::rtree_types::{Node, NodeId, RTreeResult};

/// Decodes nodes on demand by address.
///
/// Implementations must be callable from several threads at once; the
/// tree engine never holds a lock across a call.
pub trait NodeSource: Send + Sync {
    /// Address of the root node.
    fn root_id(&self) -> RTreeResult<NodeId>;

    /// Decodes one node. Child addresses are not followed.
    fn read_node(&self, id: NodeId) -> RTreeResult<Node>;

    /// Size of the backing store in bytes, for diagnostics.
    fn store_len(&self) -> u64;
}

/// The canonical big-endian binary layout over any [`ByteSource`].
pub struct BinaryStore<B: ByteSource> {
    bytes: B,
}

impl<B: ByteSource> BinaryStore<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &B {
        &self.bytes
    }

    pub fn into_inner(self) -> B {
        self.bytes
    }
}

impl<B: ByteSource> NodeSource for BinaryStore<B> {
    fn root_id(&self) -> RTreeResult<NodeId> {
        rtree_codec::read_root_offset(&self.bytes)
    }

    fn read_node(&self, id: NodeId) -> RTreeResult<Node> {
        rtree_codec::read_node(&self.bytes, id)
    }

    fn store_len(&self) -> u64 {
        self.bytes.len()
    }
}
