use osm_rtree::{
    write_tree_file, Node, Point, RTreeError, RTreeFile, RTreeResult, Rect, TreeBuilder,
    TreeNode,
};
use rand::Rng;
use std::fs;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;

/// Runs `test` between `before` and `after`.
/// `after` always runs, even when the test fails or panics.
pub fn run_test<B, T, A>(before: B, test: T, after: A)
where
    B: FnOnce() -> RTreeResult<TestContext>,
    T: FnOnce(&TestContext) -> RTreeResult<()>,
    A: FnOnce(TestContext) -> RTreeResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let start = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| test(&ctx)));
    log::debug!("Test body took {:?}", start.elapsed());

    let after_result = after(ctx);
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed: {:?}", e),
        Err(panic) => resume_unwind(panic),
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// A scratch directory for tree files, removed on cleanup.
pub struct TestContext {
    dir: TempDir,
}

impl TestContext {
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> RTreeResult<PathBuf> {
        let path = self.path(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn write_tree(&self, name: &str, tree: &TreeNode) -> RTreeResult<PathBuf> {
        let path = self.path(name);
        write_tree_file(&path, tree)?;
        Ok(path)
    }
}

pub fn create_test_context() -> RTreeResult<TestContext> {
    Ok(TestContext {
        dir: tempfile::tempdir()?,
    })
}

pub fn cleanup(ctx: TestContext) -> RTreeResult<()> {
    ctx.dir.close().map_err(RTreeError::from)
}

pub fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Rect {
    Rect::new(x0, y0, x1, y1).unwrap()
}

/// Root at 5: {0,0,100,100} with leaves at 30 (payload 7) and 60 (payload 9).
pub fn scenario_bytes() -> Vec<u8> {
    let mut buf = vec![0u8; 81];
    buf[..4].copy_from_slice(&5u32.to_be_bytes());
    put_node(&mut buf, 5, 2, (0, 0, 100, 100), &[30, 60]);
    put_node(&mut buf, 30, 0, (10, 10, 20, 20), &[7]);
    put_node(&mut buf, 60, 0, (50, 50, 90, 90), &[9]);
    buf
}

/// Writes one raw node record at `at`, growing `buf` as needed.
pub fn put_node(buf: &mut Vec<u8>, at: usize, count: u8, r: (i32, i32, i32, i32), tail: &[u32]) {
    let end = at + 17 + 4 * tail.len();
    if buf.len() < end {
        buf.resize(end, 0);
    }
    buf[at] = count;
    for (i, v) in [r.0, r.1, r.2, r.3].iter().enumerate() {
        buf[at + 1 + 4 * i..at + 5 + 4 * i].copy_from_slice(&v.to_be_bytes());
    }
    for (i, v) in tail.iter().enumerate() {
        buf[at + 17 + 4 * i..at + 21 + 4 * i].copy_from_slice(&v.to_be_bytes());
    }
}

pub fn random_rect_within<R: Rng + ?Sized>(rng: &mut R, outer: &Rect) -> Rect {
    let x0 = rng.random_range(outer.x0()..=outer.x1());
    let x1 = rng.random_range(x0..=outer.x1());
    let y0 = rng.random_range(outer.y0()..=outer.y1());
    let y1 = rng.random_range(y0..=outer.y1());
    rect(x0, y0, x1, y1)
}

pub fn random_point_within<R: Rng + ?Sized>(rng: &mut R, outer: &Rect) -> Point {
    Point::new(
        rng.random_range(outer.x0()..=outer.x1()),
        rng.random_range(outer.y0()..=outer.y1()),
    )
}

/// A random tree of exactly `depth` internal levels whose nodes each have
/// between 1 and `max_branching` children. A `max_branching` of zero
/// yields a single leaf. Payloads are numbered from `next_payload`.
pub fn random_tree<R: Rng + ?Sized>(
    rng: &mut R,
    bounds: Rect,
    depth: u32,
    max_branching: usize,
    next_payload: &mut u32,
) -> TreeNode {
    if depth == 0 || max_branching == 0 {
        let payload = *next_payload;
        *next_payload += 1;
        return TreeNode::leaf(bounds, payload);
    }
    let count = rng.random_range(1..=max_branching);
    let children = (0..count)
        .map(|_| {
            let child_bounds = random_rect_within(rng, &bounds);
            random_tree(rng, child_bounds, depth - 1, max_branching, next_payload)
        })
        .collect();
    TreeNode::Internal { bounds, children }
}

pub fn random_boxes<R: Rng + ?Sized>(rng: &mut R, count: u32, extent: &Rect, max_size: i32) -> Vec<(Rect, u32)> {
    (0..count)
        .map(|payload| {
            let x0 = rng.random_range(extent.x0()..=extent.x1() - max_size);
            let y0 = rng.random_range(extent.y0()..=extent.y1() - max_size);
            let r = rect(
                x0,
                y0,
                x0 + rng.random_range(0..=max_size),
                y0 + rng.random_range(0..=max_size),
            );
            (r, payload)
        })
        .collect()
}

pub fn build_tree(boxes: &[(Rect, u32)], degree: usize) -> RTreeResult<TreeNode> {
    let mut builder = TreeBuilder::with_degree(degree)?;
    for (r, payload) in boxes {
        builder.insert(*r, *payload);
    }
    builder
        .finish()
        .ok_or_else(|| RTreeError::InvalidOperation("no boxes".into()))
}

/// Every leaf of `tree` as (bounds, payload), in pre-order.
pub fn leaves(tree: &TreeNode) -> Vec<(Rect, u32)> {
    let mut out = Vec::new();
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
        match node {
            TreeNode::Leaf { bounds, payload } => out.push((*bounds, *payload)),
            TreeNode::Internal { children, .. } => stack.extend(children.iter().rev()),
        }
    }
    out
}

/// Payloads of all leaves intersecting `region`, sorted.
pub fn brute_force_intersecting(all: &[(Rect, u32)], region: &Rect) -> Vec<u32> {
    let mut hits: Vec<u32> = all
        .iter()
        .filter(|(r, _)| r.intersects(region))
        .map(|(_, p)| *p)
        .collect();
    hits.sort_unstable();
    hits
}

/// Runs a query and returns its payloads sorted, failing on the first error.
pub fn sorted_payloads<I>(query: I) -> RTreeResult<Vec<u32>>
where
    I: Iterator<Item = RTreeResult<osm_rtree::LeafEntry>>,
{
    let mut hits = query
        .map(|leaf| leaf.map(|l| l.payload))
        .collect::<RTreeResult<Vec<u32>>>()?;
    hits.sort_unstable();
    Ok(hits)
}

/// Renders `tree` in the structured-text layout.
pub fn to_json(tree: &TreeNode) -> String {
    let (x0, y0, x1, y1) = tree.bounds().coords();
    let rect = format!(r#""rect":{{"x0":{},"y0":{},"x1":{},"y1":{}}}"#, x0, y0, x1, y1);
    match tree {
        TreeNode::Leaf { payload, .. } => format!(r#"{{{},"payload":{}}}"#, rect, payload),
        TreeNode::Internal { children, .. } => {
            let sub: Vec<String> = children.iter().map(to_json).collect();
            format!(r#"{{{},"sub":[{}]}}"#, rect, sub.join(","))
        }
    }
}

/// Number of distinct nodes reachable from the root of `file`.
pub fn reachable_nodes<S: osm_rtree::NodeSource>(file: &RTreeFile<S>) -> RTreeResult<usize> {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![file.root_id()?];
    while let Some(id) = stack.pop() {
        if seen.insert(id) {
            if let Node::Internal { children, .. } = file.node(id)? {
                stack.extend(children);
            }
        }
    }
    Ok(seen.len())
}
