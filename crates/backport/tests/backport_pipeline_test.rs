//! End-to-end backport tests
//!
//! These tests drive whole packages through the public entry points:
//! - Chains of steps produce the natively encoded lower version
//! - Auxiliary entries survive byte for byte and in order
//! - Failed runs leave destinations exactly as they were
//! - Concurrent runs share the global registry

use modelport_archive::{MemoryAdapter, PackageReader, PackageWriter, StagedFile};
use modelport_backport::steps::{v5_to_v4, v6_to_v5, v8_to_v7, v9_to_v8};
use modelport_backport::testing::{
    out_args_after_defaults_model, sample_aux_entries, sample_model, write_package,
};
use modelport_backport::{
    backport_file_to_file, backport_stream_to_stream, get_bytecode_version_from_file,
    open_bytes, BackportConfig, Backporter, StepRegistry,
};
use modelport_bytecode::{decode_model, BytecodeModel, VERSION_RECORD};
use modelport_core::{BackportError, ErrorKind, FormatVersion, TargetRejection};
use std::fs;
use std::thread;
use tempfile::TempDir;

fn v(n: u32) -> FormatVersion {
    FormatVersion::new(n)
}

fn package(version: u32) -> Vec<u8> {
    write_package(&sample_model(v(version)), &sample_aux_entries()).unwrap()
}

fn decode(reader: &PackageReader) -> BytecodeModel {
    let version: FormatVersion = std::str::from_utf8(reader.get_record(VERSION_RECORD).unwrap())
        .unwrap()
        .parse()
        .unwrap();
    decode_model(version, |name| reader.record(name)).unwrap()
}

fn aux_entries(reader: &PackageReader) -> Vec<(String, Vec<u8>)> {
    reader
        .entries()
        .iter()
        .filter(|e| !e.name.ends_with(".mpk") && e.name != VERSION_RECORD)
        .map(|e| (e.name.clone(), e.data.clone()))
        .collect()
}

#[test]
fn test_v6_to_v4_applies_two_steps() {
    let mut output = Vec::new();
    let info = backport_stream_to_stream(&package(6)[..], &mut output, v(4)).unwrap();

    assert_eq!(info.source_version, v(6));
    assert_eq!(info.target_version, v(4));
    assert_eq!(
        info.steps_applied,
        vec![v6_to_v5::STEP.name, v5_to_v4::STEP.name]
    );

    let reader = open_bytes(output).unwrap();
    assert_eq!(reader.get_record(VERSION_RECORD).unwrap(), b"4\n");
    assert_eq!(decode(&reader), sample_model(v(4)));
    assert_eq!(aux_entries(&reader), sample_aux_entries());
}

#[test]
fn test_target_below_minimum_has_no_path() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("model.mpkg");
    let output = temp_dir.path().join("model_v3.mpkg");
    fs::write(&input, package(6)).unwrap();

    let err = backport_file_to_file(&input, &output, v(3)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoDowngradePath);
    assert!(matches!(err, BackportError::NoDowngradePath { from } if from == v(4)));
    assert!(!output.exists());
    assert!(!StagedFile::temp_path_for(&output).exists());
}

#[test]
fn test_upgrade_leaves_destination_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("model.mpkg");
    let output = temp_dir.path().join("existing.mpkg");
    fs::write(&input, package(6)).unwrap();
    fs::write(&output, b"previous contents").unwrap();

    let err = backport_file_to_file(&input, &output, v(7)).unwrap_err();
    assert!(matches!(
        err,
        BackportError::UnsupportedTarget {
            reason: TargetRejection::Upgrade,
            ..
        }
    ));
    assert_eq!(fs::read(&output).unwrap(), b"previous contents");
}

#[test]
fn test_incomplete_registry_is_atomic() {
    // No 7 -> 6 step: a v9 source can reach v7 but not v5
    let registry = StepRegistry::builder()
        .register_all([v9_to_v8::STEP, v8_to_v7::STEP, v6_to_v5::STEP])
        .unwrap()
        .build();
    let backporter =
        Backporter::with_registry(&registry, BackportConfig::for_testing()).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("model.mpkg");
    let existing = temp_dir.path().join("existing.mpkg");
    let absent = temp_dir.path().join("absent.mpkg");
    fs::write(&input, package(9)).unwrap();
    fs::write(&existing, package(5)).unwrap();

    let err = backporter
        .backport_file_to_file(&input, &existing, v(5))
        .unwrap_err();
    assert!(matches!(err, BackportError::NoDowngradePath { from } if from == v(7)));
    assert_eq!(fs::read(&existing).unwrap(), package(5));

    let err = backporter
        .backport_file_to_file(&input, &absent, v(5))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoDowngradePath);
    assert!(!absent.exists());

    // The reachable part of the chain still works
    let info = backporter
        .backport_file_to_file(&input, &absent, v(7))
        .unwrap();
    assert_eq!(info.steps_applied.len(), 2);
    assert_eq!(get_bytecode_version_from_file(&absent).unwrap(), v(7));
}

#[test]
fn test_step_failure_leaves_destination_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("model.mpkg");
    let output = temp_dir.path().join("model_v6.mpkg");
    fs::write(
        &input,
        write_package(&out_args_after_defaults_model(), &sample_aux_entries()).unwrap(),
    )
    .unwrap();

    let err = backport_file_to_file(&input, &output, v(6)).unwrap_err();
    assert!(matches!(err, BackportError::StepFailure { from, to, .. } if from == v(7) && to == v(6)));
    assert!(!output.exists());
}

#[test]
fn test_same_version_is_identity() {
    let source = package(9);
    let mut output = Vec::new();
    let info = backport_stream_to_stream(&source[..], &mut output, v(9)).unwrap();
    assert!(info.steps_applied.is_empty());

    let before = open_bytes(source).unwrap();
    let after = open_bytes(output).unwrap();
    assert_eq!(decode(&after), decode(&before));
    assert_eq!(aux_entries(&after), aux_entries(&before));
}

#[test]
fn test_every_pair_matches_native_encoding() {
    let backporter = Backporter::new(BackportConfig::for_testing()).unwrap();
    for source in FormatVersion::supported() {
        let data = write_package(&sample_model(source), &sample_aux_entries()).unwrap();
        for target in FormatVersion::supported().filter(|t| *t <= source) {
            let writer = PackageWriter::new(Vec::new(), 1).unwrap();
            let (output, info) = backporter
                .backport(&MemoryAdapter::new(data.clone()), writer, target)
                .unwrap();

            assert_eq!(
                info.steps_applied.len(),
                (source.get() - target.get()) as usize
            );
            let reader = open_bytes(output).unwrap();
            assert_eq!(decode(&reader), sample_model(target), "{} -> {}", source, target);
            assert_eq!(aux_entries(&reader), sample_aux_entries());
        }
    }
}

#[test]
fn test_output_is_deterministic() {
    let first = {
        let mut out = Vec::new();
        backport_stream_to_stream(&package(8)[..], &mut out, v(5)).unwrap();
        out
    };
    let mut second = Vec::new();
    let info = backport_stream_to_stream(&package(8)[..], &mut second, v(5)).unwrap();

    assert_eq!(first, second);
    assert_eq!(info.checksum, modelport_archive::xxh3_hex(&second));
}

#[test]
fn test_corrupted_source_is_unreadable() {
    let mut data = package(7);
    let middle = data.len() / 2;
    data[middle] ^= 0xFF;

    let mut output = Vec::new();
    let err = backport_stream_to_stream(&data[..], &mut output, v(6)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnreadableArchive);
    assert!(output.is_empty());
}

#[test]
fn test_concurrent_backports_share_registry() {
    let sources: Vec<Vec<u8>> = FormatVersion::supported().map(|v| package(v.get())).collect();

    thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|data| {
                scope.spawn(move || {
                    let mut output = Vec::new();
                    backport_stream_to_stream(&data[..], &mut output, v(4)).unwrap();
                    decode(&open_bytes(output).unwrap())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), sample_model(v(4)));
        }
    });
}
