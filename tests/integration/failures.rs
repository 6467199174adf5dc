//! Failed runs and their classification

use crate::common::*;
use modelport::testing::{out_args_after_defaults_model, sample_model, write_package};
use modelport::{
    backport_file_to_file, backport_stream_to_stream, BackportError, ErrorKind, PackageWriter,
    TargetRejection, MIN_SUPPORTED_VERSION,
};
use std::fs;

fn stream_error(source: &[u8], target: u32) -> BackportError {
    let mut output = Vec::new();
    let err = backport_stream_to_stream(source, &mut output, v(target)).unwrap_err();
    assert!(output.is_empty(), "failed run wrote {} bytes", output.len());
    err
}

#[test]
fn garbage_is_unreadable() {
    let err = stream_error(b"definitely not a model package", 5);
    assert_eq!(err.kind(), ErrorKind::UnreadableArchive);
}

#[test]
fn truncated_package_is_unreadable() {
    let source = sample_package(6);
    let err = stream_error(&source[..source.len() / 3], 5);
    assert_eq!(err.kind(), ErrorKind::UnreadableArchive);
}

#[test]
fn missing_version_record_is_unreadable() {
    let mut writer = PackageWriter::new(Vec::new(), 3).unwrap();
    writer.write_record("data/0", &[1, 2, 3]).unwrap();
    let source = writer.finalize().unwrap();

    let err = stream_error(&source, 5);
    assert_eq!(err.kind(), ErrorKind::UnreadableArchive);
}

#[test]
fn future_source_version_is_unreadable() {
    let mut writer = PackageWriter::new(Vec::new(), 3).unwrap();
    writer.write_record("version", b"10\n").unwrap();
    writer.write_record("bytecode.mpk", b"from the future").unwrap();
    let source = writer.finalize().unwrap();

    let err = stream_error(&source, 9);
    assert_eq!(err.kind(), ErrorKind::UnreadableArchive);
}

#[test]
fn upgrade_is_rejected() {
    let err = stream_error(&sample_package(5), 9);
    match err {
        BackportError::UnsupportedTarget {
            source_version,
            target,
            reason,
        } => {
            assert_eq!(source_version, v(5));
            assert_eq!(target, v(9));
            assert_eq!(reason, TargetRejection::Upgrade);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn below_minimum_has_no_path() {
    let err = stream_error(&sample_package(9), MIN_SUPPORTED_VERSION.get() - 1);
    assert!(matches!(err, BackportError::NoDowngradePath { from } if from == MIN_SUPPORTED_VERSION));
}

#[test]
fn step_failure_names_both_versions() {
    let source = write_package(&out_args_after_defaults_model(), &[]).unwrap();
    let err = stream_error(&source, 4);
    assert_eq!(err.kind(), ErrorKind::StepFailure);
    assert!(err.to_string().contains("v7"));
    assert!(err.suggests_other_target());
}

#[test]
fn failed_file_runs_leave_no_trace() {
    let ws = Workspace::new();
    let input = ws.file("model.mpkg", &sample_package(7));
    let output = ws.file("old.mpkg", b"keep me");
    let before = ws.listing();

    for target in [8, 3] {
        assert!(backport_file_to_file(&input, &output, v(target)).is_err());
        assert_eq!(ws.listing(), before);
        assert_eq!(fs::read(&output).unwrap(), b"keep me");
    }

    let bad_input = ws.file(
        "bad.mpkg",
        &write_package(&out_args_after_defaults_model(), &[]).unwrap(),
    );
    let before = ws.listing();
    assert!(backport_file_to_file(&bad_input, &output, v(6)).is_err());
    assert_eq!(ws.listing(), before);
    assert_eq!(fs::read(&output).unwrap(), b"keep me");
}

#[test]
fn source_is_never_modified() {
    let ws = Workspace::new();
    let source = write_package(&sample_model(v(9)), &[]).unwrap();
    let input = ws.file("model.mpkg", &source);

    backport_file_to_file(&input, &ws.path("out.mpkg"), v(5)).unwrap();
    assert_eq!(fs::read(&input).unwrap(), source);
}
