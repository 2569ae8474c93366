use osm_rtree::{Backend, RTreeConfig, RTreeFile};
use osm_rtree_int_test::test_util::{
    brute_force_intersecting, build_tree, cleanup, create_test_context, leaves, random_boxes,
    random_point_within, random_rect_within, random_tree, rect, run_test, sorted_payloads,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_builder_tree_matches_brute_force() {
    run_test(
        create_test_context,
        |ctx| {
            let mut rng = StdRng::seed_from_u64(42);
            let extent = rect(-10_000_000, -10_000_000, 10_000_000, 10_000_000);
            let boxes = random_boxes(&mut rng, 5_000, &extent, 200_000);
            let tree = build_tree(&boxes, 16)?;
            let path = ctx.write_tree("builder.rtree", &tree)?;

            for backend in [Backend::Mmap, Backend::Positioned] {
                let file = RTreeFile::open_with_config(&path, RTreeConfig::default().backend(backend))?;
                file.verify()?;

                for _ in 0..50 {
                    let region = random_rect_within(&mut rng, &extent);
                    assert_eq!(
                        sorted_payloads(file.query_intersecting(region))?,
                        brute_force_intersecting(&boxes, &region),
                        "region {}",
                        region
                    );

                    let p = random_point_within(&mut rng, &extent);
                    let point_region = osm_rtree::Rect::point(p);
                    assert_eq!(
                        sorted_payloads(file.query_containing_point(p))?,
                        brute_force_intersecting(&boxes, &point_region),
                        "point {}",
                        p
                    );
                }
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_random_tree_matches_brute_force() {
    run_test(
        create_test_context,
        |ctx| {
            let mut rng = StdRng::seed_from_u64(7);
            let extent = rect(-1_000_000, -1_000_000, 1_000_000, 1_000_000);
            let mut next_payload = 0;
            let tree = random_tree(&mut rng, extent, 5, 6, &mut next_payload);
            let all = leaves(&tree);
            let path = ctx.write_tree("random.rtree", &tree)?;
            let file = RTreeFile::open(&path)?;

            file.verify()?;
            assert_eq!(file.leaf_count()?, all.len());
            for _ in 0..100 {
                let region = random_rect_within(&mut rng, &extent);
                assert_eq!(
                    sorted_payloads(file.query_intersecting(region))?,
                    brute_force_intersecting(&all, &region)
                );
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_query_touches_fewer_nodes_than_scan() {
    run_test(
        create_test_context,
        |ctx| {
            let mut rng = StdRng::seed_from_u64(99);
            let extent = rect(0, 0, 1_000_000, 1_000_000);
            let boxes = random_boxes(&mut rng, 2_000, &extent, 1_000);
            let tree = build_tree(&boxes, 8)?;
            let path = ctx.write_tree("pruning.rtree", &tree)?;

            let file = RTreeFile::open_with_config(&path, RTreeConfig::default().cache_nodes(0))?;
            let hits = file.query_intersecting(rect(0, 0, 10_000, 10_000)).count();
            let reads = file.stats().node_reads as usize;
            assert!(hits < boxes.len());
            assert!(reads < tree.node_count(), "{} reads for {} nodes", reads, tree.node_count());
            Ok(())
        },
        cleanup,
    )
}
