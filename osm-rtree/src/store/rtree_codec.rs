//! Binary layout of the tree store.
//!
//! ```text
//! offset 0:           root_offset   u32
//! at every node:
//!   +0                child_count   u8
//!   +1  +5  +9  +13   x0 y0 x1 y1   i32 each
//!   +17               payload u32            (child_count == 0)
//!   +17 ..            child_offset[i] u32    (child_count > 0)
//! ```
//!
//! All integers are big-endian. Offsets are absolute byte positions.
//! Decoding is one node at a time: child offsets are returned as-is and
//! only checked when something dereferences them.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::rtree_constants::{FIELD_WIDTH, MAX_CHILDREN, NODE_HEADER_LEN, ROOT_POINTER_POS};
use super::rtree_storage::ByteSource;
use super::rtree_types::{FormatErrorKind, Node, NodeId, RTreeError, RTreeResult, TreeNode};
use crate::rect::Rect;

// ============================================================================
// Decoding
// ============================================================================

/// Reads `buf.len()` bytes at `at`, reporting a short source as a format
/// error against `node`.
fn read_checked<S: ByteSource + ?Sized>(
    source: &S,
    node: NodeId,
    at: u64,
    buf: &mut [u8],
) -> RTreeResult<()> {
    let available = source.len().saturating_sub(at);
    let needed = buf.len() as u64;
    if needed > available {
        return Err(RTreeError::format(
            node,
            FormatErrorKind::Truncated { needed, available },
        ));
    }
    source.read_exact_at(at, buf)?;
    Ok(())
}

/// Reads the root offset stored at position 0.
pub fn read_root_offset<S: ByteSource + ?Sized>(source: &S) -> RTreeResult<NodeId> {
    let mut buf = [0u8; FIELD_WIDTH];
    read_checked(source, ROOT_POINTER_POS, ROOT_POINTER_POS, &mut buf)?;
    let root = BigEndian::read_u32(&buf) as NodeId;
    let len = source.len();
    if root >= len {
        return Err(RTreeError::format(
            ROOT_POINTER_POS,
            FormatErrorKind::OffsetOutOfBounds { len },
        ));
    }
    Ok(root)
}

/// Decodes the root node.
pub fn read_root<S: ByteSource + ?Sized>(source: &S) -> RTreeResult<Node> {
    let root = read_root_offset(source)?;
    read_node(source, root)
}

/// Decodes the single node at `offset`.
pub fn read_node<S: ByteSource + ?Sized>(source: &S, offset: NodeId) -> RTreeResult<Node> {
    let len = source.len();
    if offset >= len {
        return Err(RTreeError::format(
            offset,
            FormatErrorKind::OffsetOutOfBounds { len },
        ));
    }

    let mut header = [0u8; NODE_HEADER_LEN];
    read_checked(source, offset, offset, &mut header)?;
    let count = header[0] as usize;
    let bounds = Rect::decode(
        offset,
        BigEndian::read_i32(&header[1..5]),
        BigEndian::read_i32(&header[5..9]),
        BigEndian::read_i32(&header[9..13]),
        BigEndian::read_i32(&header[13..17]),
    )?;

    let body_at = offset + NODE_HEADER_LEN as u64;
    if count == 0 {
        let mut body = [0u8; FIELD_WIDTH];
        read_checked(source, offset, body_at, &mut body)?;
        return Ok(Node::Leaf {
            bounds,
            payload: BigEndian::read_u32(&body),
        });
    }

    let mut body = vec![0u8; count * FIELD_WIDTH];
    read_checked(source, offset, body_at, &mut body)?;
    let children = body
        .chunks_exact(FIELD_WIDTH)
        .map(|field| BigEndian::read_u32(field) as NodeId)
        .collect();
    Ok(Node::Internal { bounds, children })
}

// ============================================================================
// Encoding
// ============================================================================

fn to_offset(position: u64) -> RTreeResult<u32> {
    u32::try_from(position).map_err(|_| {
        RTreeError::InvalidOperation(format!(
            "node at position {} is beyond the 32-bit offset range",
            position
        ))
    })
}

fn write_rect<W: Write>(w: &mut W, rect: &Rect) -> RTreeResult<()> {
    w.write_i32::<BigEndian>(rect.x0())?;
    w.write_i32::<BigEndian>(rect.y0())?;
    w.write_i32::<BigEndian>(rect.x1())?;
    w.write_i32::<BigEndian>(rect.y1())?;
    Ok(())
}

/// Writes `node` after its subtree, returning the node's own offset.
fn write_node<W: Write + Seek>(w: &mut W, node: &TreeNode) -> RTreeResult<u32> {
    match node {
        TreeNode::Leaf { bounds, payload } => {
            let offset = to_offset(w.stream_position()?)?;
            w.write_u8(0)?;
            write_rect(w, bounds)?;
            w.write_u32::<BigEndian>(*payload)?;
            Ok(offset)
        }
        TreeNode::Internal { bounds, children } => {
            if children.is_empty() {
                return Err(RTreeError::InvalidOperation(
                    "internal node without children would decode as a leaf".into(),
                ));
            }
            if children.len() > MAX_CHILDREN {
                return Err(RTreeError::InvalidOperation(format!(
                    "internal node has {} children, the format allows {}",
                    children.len(),
                    MAX_CHILDREN
                )));
            }
            let offsets = children
                .iter()
                .map(|child| write_node(w, child))
                .collect::<RTreeResult<Vec<u32>>>()?;

            let offset = to_offset(w.stream_position()?)?;
            w.write_u8(offsets.len() as u8)?;
            write_rect(w, bounds)?;
            for child in offsets {
                w.write_u32::<BigEndian>(child)?;
            }
            Ok(offset)
        }
    }
}

/// Serializes a tree, children before parents, then patches the root
/// offset at position 0. Returns the root offset.
///
/// The writer does not check the containment invariant; use
/// [`crate::RTreeFile::verify`] on the result if the input is untrusted.
pub fn write_tree<W: Write + Seek>(w: &mut W, root: &TreeNode) -> RTreeResult<u64> {
    w.seek(SeekFrom::Start(ROOT_POINTER_POS + FIELD_WIDTH as u64))?;
    let root_offset = write_node(w, root)?;
    let end = w.stream_position()?;
    w.seek(SeekFrom::Start(ROOT_POINTER_POS))?;
    w.write_u32::<BigEndian>(root_offset)?;
    w.seek(SeekFrom::Start(end))?;
    Ok(root_offset as u64)
}

/// Serializes a tree into a fresh buffer.
pub fn encode_tree(root: &TreeNode) -> RTreeResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_tree(&mut cursor, root)?;
    Ok(cursor.into_inner())
}

/// Serializes a tree into a new file at `path`, replacing any existing file.
pub fn write_tree_file(path: impl AsRef<Path>, root: &TreeNode) -> RTreeResult<u64> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    let root_offset = write_tree(&mut w, root)?;
    w.flush()?;
    w.get_ref().sync_all()?;
    Ok(root_offset)
}
