use mirror_core::{
    CellAddress, ChangeGate, Fingerprinter, GateDecision, LayoutError, PublishLayout, Row, RowSet,
    Sha256Fingerprinter,
};
use pretty_assertions::assert_eq;

fn cell(text: &str) -> CellAddress {
    text.parse().expect("valid cell")
}

fn sample_digest() -> mirror_core::Digest {
    let set: RowSet = vec![Row::new(404, "Not Found"), Row::new(500, "Server Error")].into();
    Sha256Fingerprinter.fingerprint(&set)
}

#[test]
fn equal_stored_digest_skips_publish() {
    mirror_logging::initialize_for_tests();
    let gate = ChangeGate::default();
    let digest = sample_digest();
    assert!(!gate.should_publish(&digest, Some(digest.as_str())));
    assert_eq!(
        gate.decide(&digest, Some(digest.to_string())),
        GateDecision::Unchanged
    );
}

#[test]
fn absent_stored_digest_publishes() {
    let gate = ChangeGate::default();
    let digest = sample_digest();
    assert!(gate.should_publish(&digest, None));
    assert!(gate.should_publish(&digest, Some("")));
    assert_eq!(
        gate.decide(&digest, Some(String::new())),
        GateDecision::Publish { previous: None }
    );
}

#[test]
fn different_stored_digest_publishes_and_reports_previous() {
    let gate = ChangeGate::default();
    let digest = sample_digest();
    assert_eq!(
        gate.decide(&digest, Some("stale".to_string())),
        GateDecision::Publish {
            previous: Some("stale".to_string())
        }
    );
}

#[test]
fn comparison_is_case_sensitive() {
    let gate = ChangeGate::default();
    let digest = sample_digest();
    let upper = digest.as_str().to_ascii_uppercase();
    assert!(gate.should_publish(&digest, Some(&upper)));
}

#[test]
fn default_layout_matches_legacy_sheet() {
    let layout = PublishLayout::default();
    assert_eq!(layout.data_anchor(), cell("A1"));
    assert_eq!(layout.digest_cell(), cell("C1"));
    assert_eq!(layout.data_range(2).map(|r| r.to_string()).as_deref(), Some("A1:B2"));
    assert_eq!(layout.data_range(0), None);
}

#[test]
fn layout_rejects_digest_inside_data_block() {
    let err = PublishLayout::new(cell("A1"), cell("B40")).unwrap_err();
    assert_eq!(
        err,
        LayoutError::DigestInsideData {
            data_anchor: cell("A1"),
            digest_cell: cell("B40"),
        }
    );
    assert!(PublishLayout::new(cell("B3"), cell("C9")).is_err());
    assert!(PublishLayout::new(cell("B3"), cell("C1")).is_ok());
    assert!(PublishLayout::new(cell("B3"), cell("B2")).is_ok());
    assert!(PublishLayout::new(cell("D5"), cell("A1")).is_ok());
}

#[test]
fn layout_range_follows_custom_anchor() {
    let layout = PublishLayout::new(cell("D5"), cell("A1")).unwrap();
    assert_eq!(layout.data_range(3).unwrap().to_string(), "D5:E7");
}
