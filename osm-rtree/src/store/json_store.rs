//! Structured-text variant of the tree store.
//!
//! One record per node:
//!
//! ```json
//! {"rect": {"x0": 0, "y0": 0, "x1": 100, "y1": 100},
//!  "sub": [{"rect": {"x0": 10, "y0": 10, "x1": 20, "y1": 20}, "payload": 7}]}
//! ```
//!
//! A record with a non-empty `sub` list is an internal node; anything else
//! is a leaf and must carry `payload`. The document is parsed eagerly into
//! an arena. Node ids are pre-order record indices, so the root is 0 and
//! errors report the index of the offending record.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use super::node_source::NodeSource;
use super::rtree_types::{FormatErrorKind, Node, NodeId, RTreeError, RTreeResult};
use crate::rect::{Coord, Rect};

#[derive(Debug, Deserialize)]
struct RectRecord {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

#[derive(Debug, Deserialize)]
struct NodeRecord {
    rect: RectRecord,
    #[serde(default)]
    sub: Vec<NodeRecord>,
    #[serde(default)]
    payload: Option<u32>,
}

/// A fully parsed structured-text tree.
#[derive(Debug)]
pub struct JsonStore {
    nodes: Vec<Node>,
    text_len: u64,
}

impl JsonStore {
    /// Parses a document from a string.
    pub fn parse(text: &str) -> RTreeResult<Self> {
        let record: NodeRecord = serde_json::from_str(text).map_err(json_error)?;
        Self::from_record(record, text.len() as u64)
    }

    /// Parses a document from any reader.
    pub fn from_reader<R: Read>(reader: R) -> RTreeResult<Self> {
        let mut text = String::new();
        BufReader::new(reader).read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// Parses the document at `path`.
    pub fn open(path: impl AsRef<Path>) -> RTreeResult<Self> {
        let store = Self::from_reader(File::open(path.as_ref())?)?;
        log::debug!(
            "Loaded structured-text tree from {:?} ({} nodes)",
            path.as_ref(),
            store.nodes.len()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn from_record(root: NodeRecord, text_len: u64) -> RTreeResult<Self> {
        let mut nodes = Vec::new();
        flatten(root, &mut nodes)?;
        Ok(Self { nodes, text_len })
    }
}

fn json_error(err: serde_json::Error) -> RTreeError {
    RTreeError::format(0, FormatErrorKind::Json(err.to_string()))
}

fn coord(id: NodeId, value: i64) -> RTreeResult<Coord> {
    Coord::try_from(value)
        .map_err(|_| RTreeError::format(id, FormatErrorKind::CoordinateOutOfRange { value }))
}

/// Appends `record` and its subtree in pre-order, returning its id.
///
/// Recursion depth is bounded by serde_json's own nesting limit.
fn flatten(record: NodeRecord, nodes: &mut Vec<Node>) -> RTreeResult<NodeId> {
    let id = nodes.len() as NodeId;
    let r = &record.rect;
    let bounds = Rect::decode(
        id,
        coord(id, r.x0)?,
        coord(id, r.y0)?,
        coord(id, r.x1)?,
        coord(id, r.y1)?,
    )?;

    if record.sub.is_empty() {
        let payload = record
            .payload
            .ok_or_else(|| RTreeError::format(id, FormatErrorKind::MissingPayload))?;
        nodes.push(Node::Leaf { bounds, payload });
        return Ok(id);
    }

    // Reserve the slot so children land after their parent
    nodes.push(Node::Internal {
        bounds,
        children: Vec::new(),
    });
    let children = record
        .sub
        .into_iter()
        .map(|child| flatten(child, nodes))
        .collect::<RTreeResult<Vec<NodeId>>>()?;
    nodes[id as usize] = Node::Internal { bounds, children };
    Ok(id)
}

impl NodeSource for JsonStore {
    fn root_id(&self) -> RTreeResult<NodeId> {
        Ok(0)
    }

    fn read_node(&self, id: NodeId) -> RTreeResult<Node> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.nodes.get(index))
            .cloned()
            .ok_or_else(|| {
                RTreeError::format(
                    id,
                    FormatErrorKind::OffsetOutOfBounds {
                        len: self.nodes.len() as u64,
                    },
                )
            })
    }

    fn store_len(&self) -> u64 {
        self.text_len
    }
}
