use osm_rtree::{
    Backend, ErrorKind, FormatErrorKind, Point, RTreeConfig, RTreeError, RTreeFile,
};
use osm_rtree_int_test::test_util::{
    cleanup, create_test_context, rect, run_test, scenario_bytes, sorted_payloads,
};

const BACKENDS: [Backend; 2] = [Backend::Mmap, Backend::Positioned];

#[test]
fn test_scenario_queries_on_both_backends() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.write_bytes("scenario.rtree", &scenario_bytes())?;
            for backend in BACKENDS {
                let file = RTreeFile::open_with_config(&path, RTreeConfig::default().backend(backend))?;

                assert_eq!(file.root_id()?, 5);
                assert_eq!(sorted_payloads(file.query_intersecting(rect(15, 15, 16, 16)))?, vec![7]);
                assert_eq!(sorted_payloads(file.query_intersecting(rect(0, 0, 100, 100)))?, vec![7, 9]);
                assert_eq!(sorted_payloads(file.query_intersecting(rect(21, 21, 49, 49)))?, Vec::<u32>::new());
                assert_eq!(sorted_payloads(file.query_containing_point(Point::new(95, 95)))?, Vec::<u32>::new());
                // edges are inclusive
                assert_eq!(sorted_payloads(file.query_containing_point(Point::new(20, 10)))?, vec![7]);
                file.verify()?;
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_scenario_traversal_order() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.write_bytes("scenario.rtree", &scenario_bytes())?;
            let file = RTreeFile::open(&path)?;

            let visited = file
                .traverse()
                .map(|v| v.map(|v| (v.id, v.depth)))
                .collect::<Result<Vec<_>, _>>()?;
            assert_eq!(visited, vec![(5, 0), (30, 1), (60, 1)]);
            assert_eq!(file.node_count()?, 3);
            assert_eq!(file.leaf_count()?, 2);
            assert_eq!(file.depth()?, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_degenerate_point_leaf() {
    run_test(
        create_test_context,
        |ctx| {
            let mut bytes = scenario_bytes();
            // leaf at 30 becomes the point {15,15,15,15}
            for i in 0..4 {
                bytes[31 + 4 * i..35 + 4 * i].copy_from_slice(&15i32.to_be_bytes());
            }
            let path = ctx.write_bytes("point.rtree", &bytes)?;
            let file = RTreeFile::open(&path)?;

            file.verify()?;
            assert_eq!(sorted_payloads(file.query_containing_point(Point::new(15, 15)))?, vec![7]);
            assert_eq!(sorted_payloads(file.query_containing_point(Point::new(15, 16)))?, Vec::<u32>::new());
            assert_eq!(sorted_payloads(file.query_intersecting(rect(15, 15, 15, 15)))?, vec![7]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_short_files() {
    run_test(
        create_test_context,
        |ctx| {
            for (name, bytes) in [("empty.rtree", vec![]), ("short.rtree", vec![0, 0, 5])] {
                let path = ctx.write_bytes(name, &bytes)?;
                for backend in BACKENDS {
                    let file = RTreeFile::open_with_config(&path, RTreeConfig::default().backend(backend))?;
                    let err = file.verify().unwrap_err();
                    assert_eq!(err.kind(), ErrorKind::Format);
                    assert!(matches!(
                        err,
                        RTreeError::Format {
                            offset: 0,
                            kind: FormatErrorKind::Truncated { needed: 4, .. }
                        }
                    ));
                    assert!(file.query_intersecting(rect(0, 0, 1, 1)).next().unwrap().is_err());
                }
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_missing_file() {
    run_test(
        create_test_context,
        |ctx| {
            let err = RTreeFile::open(ctx.path("nope.rtree")).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Io);
            assert_eq!(err.offset(), None);
            Ok(())
        },
        cleanup,
    )
}
