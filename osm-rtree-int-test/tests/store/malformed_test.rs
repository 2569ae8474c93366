use osm_rtree::{
    encode_tree, ErrorKind, FormatErrorKind, RTreeConfig, RTreeError, RTreeFile,
    StructuralErrorKind, TreeNode,
};
use osm_rtree_int_test::test_util::{
    cleanup, create_test_context, put_node, random_tree, rect, run_test, scenario_bytes,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_encoded(seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut next_payload = 0;
    let tree = random_tree(&mut rng, rect(0, 0, 10_000, 10_000), 3, 4, &mut next_payload);
    encode_tree(&tree).unwrap()
}

#[test]
fn test_every_truncation_is_a_format_error() {
    let bytes = random_encoded(1);
    for cut in 0..bytes.len() {
        let file = RTreeFile::from_bytes(bytes[..cut].to_vec());
        let err = file.verify().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format, "cut at {}: {}", cut, err);
        assert!(file.load_tree().is_err());
    }
    RTreeFile::from_bytes(bytes).verify().unwrap();
}

#[test]
fn test_truncated_file_on_disk() {
    run_test(
        create_test_context,
        |ctx| {
            let bytes = scenario_bytes();
            // cuts through the leaf at 60, which sits after the root
            let path = ctx.write_bytes("cut.rtree", &bytes[..70])?;
            let file = RTreeFile::open(&path)?;

            let mut query = file.query_intersecting(rect(0, 0, 100, 100));
            assert_eq!(query.next().unwrap()?.payload, 7);
            let err = query.next().unwrap().unwrap_err();
            assert!(matches!(
                err,
                RTreeError::Format {
                    offset: 60,
                    kind: FormatErrorKind::Truncated { .. }
                }
            ));
            assert!(query.next().is_none());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_random_corruption_never_panics() {
    let original = random_encoded(3);
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let mut bytes = original.clone();
        for _ in 0..rng.random_range(1..=4) {
            let at = rng.random_range(0..bytes.len());
            bytes[at] = rng.random();
        }
        let file = RTreeFile::from_bytes(bytes);
        let _ = file.verify();
        let _ = file.query_intersecting(rect(0, 0, 5_000, 5_000)).count();
        let _ = file.traverse().count();
        let _ = file.load_tree();
        // no walk reads a node twice
        assert!(file.stats().node_reads <= 4 * file.stats().store_len);
    }
}

#[test]
fn test_cycle_back_to_root() {
    // root at 4 -> internal at 25 -> back to 4
    let mut bytes = 4u32.to_be_bytes().to_vec();
    put_node(&mut bytes, 4, 1, (0, 0, 10, 10), &[25]);
    put_node(&mut bytes, 25, 1, (0, 0, 10, 10), &[4]);
    let file = RTreeFile::from_bytes(bytes);

    let err = file.verify().unwrap_err();
    assert!(matches!(
        err,
        RTreeError::Structural {
            offset: 25,
            kind: StructuralErrorKind::Cycle { ancestor: 4 }
        }
    ));
    assert!(file.query_intersecting(rect(0, 0, 10, 10)).any(|r| r.is_err()));
    assert_eq!(file.traverse().filter(|v| v.is_err()).count(), 1);
}

#[test]
fn test_doubled_pointer_chain_fails_fast() {
    run_test(
        create_test_context,
        |ctx| {
            // every internal node points twice at the next one
            let levels = 60;
            let mut bytes = 4u32.to_be_bytes().to_vec();
            for level in 0..levels {
                let at = 4 + level * 25;
                let next = (at + 25) as u32;
                put_node(&mut bytes, at, 2, (0, 0, 10, 10), &[next, next]);
            }
            put_node(&mut bytes, 4 + levels * 25, 0, (1, 1, 2, 2), &[9]);
            let path = ctx.write_bytes("doubled.rtree", &bytes)?;

            let config = RTreeConfig::default().cache_nodes(0);
            let file = RTreeFile::open_with_config(&path, config)?;
            let err = file.verify().unwrap_err();
            assert!(matches!(
                err,
                RTreeError::Structural {
                    kind: StructuralErrorKind::SharedChild { .. },
                    ..
                }
            ));
            assert!(file.node_count().is_err());
            assert_eq!(file.traverse().filter(|v| v.is_err()).count(), 1);
            assert!(file.load_tree().is_err());

            let found: Vec<_> = file.query_intersecting(rect(0, 0, 10, 10)).collect();
            assert_eq!(found.len(), 2);
            assert_eq!(found[0].as_ref().unwrap().payload, 9);
            assert!(found[1].is_err());

            assert!(file.stats().node_reads <= 5 * (levels as u64 + 1));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_chain_deeper_than_limit() {
    let mut tree = TreeNode::leaf(rect(0, 0, 1, 1), 1);
    for _ in 0..99 {
        tree = TreeNode::covering(vec![tree]).unwrap();
    }
    let bytes = encode_tree(&tree).unwrap();

    let shallow = RTreeFile::from_bytes(bytes.clone());
    let err = shallow.verify().unwrap_err();
    assert!(matches!(
        err,
        RTreeError::Structural {
            kind: StructuralErrorKind::ExcessiveDepth { limit: 64 },
            ..
        }
    ));

    let deep = RTreeFile::with_source(
        osm_rtree::BinaryStore::new(bytes),
        RTreeConfig::default().max_depth(128),
    );
    deep.verify().unwrap();
    assert_eq!(deep.depth().unwrap(), 100);
}

#[test]
fn test_child_escaping_parent() {
    let mut bytes = scenario_bytes();
    // leaf at 60 grows past its parent to x1 = 150
    bytes[69..73].copy_from_slice(&150i32.to_be_bytes());
    let file = RTreeFile::from_bytes(bytes);

    let err = file.verify().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.offset(), Some(60));
    match err {
        RTreeError::Structural {
            kind: StructuralErrorKind::ContainmentViolated { parent, child_bounds, .. },
            ..
        } => {
            assert_eq!(parent, 5);
            assert_eq!(child_bounds, rect(50, 50, 150, 90));
        }
        other => panic!("unexpected error {:?}", other),
    }
}
