//! Inspection and run reports

use crate::common::*;
use modelport::testing::sample_aux_entries;
use modelport::{
    backport_stream_to_stream, backport_targets, inspect_package_file, BackportInfo,
    CURRENT_VERSION,
};

#[test]
fn inspect_before_and_after() {
    let ws = Workspace::new();
    let input = ws.file("model.mpkg", &sample_package(9));
    let before = inspect_package_file(&input).unwrap();
    assert_eq!(before.version, CURRENT_VERSION);
    assert_eq!(before.bytecode_records, vec!["bytecode.mpk", "constants.mpk"]);

    let output = ws.path("out.mpkg");
    modelport::backport_file_to_file(&input, &output, v(4)).unwrap();
    let after = inspect_package_file(&output).unwrap();

    assert_eq!(after.version, v(4));
    assert_eq!(after.functions, before.functions);
    assert_eq!(after.auxiliary_entries, before.auxiliary_entries);
    assert_eq!(
        after.bytecode_records,
        vec!["bytecode.mpk", "debug_handles.mpk"]
    );
    // Promoted instructions are operator calls again
    assert!(after.operators.contains(&"aten::format".to_string()));
    assert!(!before.operators.contains(&"aten::format".to_string()));
}

#[test]
fn targets_cover_the_supported_range() {
    let targets = backport_targets(CURRENT_VERSION);
    assert_eq!(targets.first(), Some(&CURRENT_VERSION));
    assert_eq!(targets.last(), Some(&v(4)));
    assert_eq!(targets.len(), 6);
}

#[test]
fn info_round_trips_through_json() {
    let mut output = Vec::new();
    let info = backport_stream_to_stream(&sample_package(8)[..], &mut output, v(6)).unwrap();

    assert_eq!(info.passthrough_entries, sample_aux_entries().len());
    assert_eq!(info.output_size, output.len() as u64);
    assert_eq!(info.checksum.len(), 16);

    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("\"source_version\":8"));
    let parsed: BackportInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, info);
}
