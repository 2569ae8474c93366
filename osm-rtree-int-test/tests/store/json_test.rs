use osm_rtree::{encode_tree, ErrorKind, FormatErrorKind, Point, RTreeError, RTreeFile};
use osm_rtree_int_test::test_util::{
    cleanup, create_test_context, random_rect_within, random_tree, rect, run_test,
    sorted_payloads, to_json,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SCENARIO: &str = r#"{
    "rect": {"x0": 0, "y0": 0, "x1": 100, "y1": 100},
    "sub": [
        {"rect": {"x0": 10, "y0": 10, "x1": 20, "y1": 20}, "payload": 7},
        {"rect": {"x0": 50, "y0": 50, "x1": 90, "y1": 90}, "payload": 9}
    ]
}"#;

#[test]
fn test_json_scenario_from_file() {
    run_test(
        create_test_context,
        |ctx| {
            let path = ctx.write_bytes("scenario.json", SCENARIO.as_bytes())?;
            let file = RTreeFile::open_json(&path)?;

            file.verify()?;
            assert_eq!(file.root_id()?, 0);
            assert_eq!(sorted_payloads(file.query_intersecting(rect(15, 15, 16, 16)))?, vec![7]);
            assert_eq!(sorted_payloads(file.query_containing_point(Point::new(95, 95)))?, Vec::<u32>::new());
            assert_eq!(file.stats().store_len, SCENARIO.len() as u64);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_json_and_binary_answer_alike() {
    run_test(
        create_test_context,
        |ctx| {
            let mut rng = StdRng::seed_from_u64(13);
            let extent = rect(-50_000, -50_000, 50_000, 50_000);
            let mut next_payload = 0;
            let tree = random_tree(&mut rng, extent, 4, 5, &mut next_payload);

            let json_path = ctx.write_bytes("tree.json", to_json(&tree).as_bytes())?;
            let json = RTreeFile::open_json(&json_path)?;
            let binary = RTreeFile::from_bytes(encode_tree(&tree)?);

            for _ in 0..50 {
                let region = random_rect_within(&mut rng, &extent);
                assert_eq!(
                    sorted_payloads(json.query_intersecting(region))?,
                    sorted_payloads(binary.query_intersecting(region))?
                );
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_json_containment_violation_reports_record_index() {
    let text = r#"{"rect": {"x0": 0, "y0": 0, "x1": 10, "y1": 10}, "sub": [
        {"rect": {"x0": 1, "y0": 1, "x1": 2, "y1": 2}, "payload": 1},
        {"rect": {"x0": 5, "y0": 5, "x1": 11, "y1": 6}, "payload": 2}
    ]}"#;
    let file = RTreeFile::from_json_str(text).unwrap();
    let err = file.verify().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.offset(), Some(2));
}

#[test]
fn test_json_malformed_input() {
    let err = RTreeFile::from_json_str(r#"{"rect": {"x0": 0}}"#).err().unwrap();
    assert!(matches!(
        err,
        RTreeError::Format {
            kind: FormatErrorKind::Json(_),
            ..
        }
    ));

    let err = RTreeFile::from_json_str(r#"{"rect": {"x0": 0, "y0": 0, "x1": 1, "y1": 1}}"#)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RTreeError::Format {
            offset: 0,
            kind: FormatErrorKind::MissingPayload
        }
    ));
}
