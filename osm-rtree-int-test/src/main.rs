use osm_rtree::{RTreeConfig, RTreeFile, RTreeResult, Rect};
use osm_rtree_int_test::test_util::{build_tree, cleanup, create_test_context, random_boxes};
use rand::Rng;

fn main() -> RTreeResult<()> {
    println!("Starting stress test...");
    let ctx = create_test_context()?;
    let mut rng = rand::rng();

    let count = 1_000_000;
    let extent = Rect::new(-1_800_000_000, -900_000_000, 1_800_000_000, 900_000_000)?;

    let start = std::time::Instant::now();
    let boxes = random_boxes(&mut rng, count, &extent, 100_000);
    let tree = build_tree(&boxes, 32)?;
    println!("Built {} leaves in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    let path = ctx.write_tree("stress.rtree", &tree)?;
    println!("Wrote {} nodes in {:?}", tree.node_count(), start.elapsed());

    let file = RTreeFile::open_with_config(&path, RTreeConfig::default().cache_nodes(4096))?;

    let start = std::time::Instant::now();
    file.verify()?;
    println!("Verified in {:?}", start.elapsed());

    let start = std::time::Instant::now();
    let mut hits = 0;
    for _ in 0..10_000 {
        let x = rng.random_range(-1_790_000_000..1_790_000_000);
        let y = rng.random_range(-890_000_000..890_000_000);
        let region = Rect::new(x, y, x + 10_000_000, y + 10_000_000)?;
        for leaf in file.query_intersecting(region) {
            leaf?;
            hits += 1;
        }
    }
    println!("Ran 10000 queries ({} hits) in {:?}", hits, start.elapsed());
    println!("{:?}", file.stats());

    drop(file);
    cleanup(ctx)
}
