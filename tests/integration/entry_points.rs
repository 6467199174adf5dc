//! Stream and path entry points

use crate::common::*;
use modelport::testing::{sample_aux_entries, sample_model};
use modelport::{
    backport, backport_file_to_file, backport_file_to_stream, backport_stream_to_file,
    backport_stream_to_stream, get_bytecode_version, get_bytecode_version_from_file,
    get_bytecode_version_from_reader, MemoryAdapter, PackageWriter,
};
use std::fs;

#[test]
fn all_entry_points_produce_identical_bytes() {
    let ws = Workspace::new();
    let source = sample_package(9);
    let input = ws.file("model.mpkg", &source);
    let target = v(6);

    let (canonical, _) = backport(
        &MemoryAdapter::new(source.clone()),
        PackageWriter::new(Vec::new(), 3).unwrap(),
        target,
    )
    .unwrap();

    let mut stream_to_stream = Vec::new();
    backport_stream_to_stream(&source[..], &mut stream_to_stream, target).unwrap();

    let mut file_to_stream = Vec::new();
    backport_file_to_stream(&input, &mut file_to_stream, target).unwrap();

    let stream_out = ws.path("stream_to_file.mpkg");
    backport_stream_to_file(&source[..], &stream_out, target).unwrap();

    let file_out = ws.path("file_to_file.mpkg");
    backport_file_to_file(&input, &file_out, target).unwrap();

    assert_eq!(stream_to_stream, canonical);
    assert_eq!(file_to_stream, canonical);
    assert_eq!(fs::read(&stream_out).unwrap(), canonical);
    assert_eq!(fs::read(&file_out).unwrap(), canonical);
}

#[test]
fn version_queries_agree() {
    let ws = Workspace::new();
    let source = sample_package(7);
    let path = ws.file("model.mpkg", &source);

    assert_eq!(get_bytecode_version_from_file(&path).unwrap(), v(7));
    assert_eq!(get_bytecode_version_from_reader(&source[..]).unwrap(), v(7));
    assert_eq!(
        get_bytecode_version(&MemoryAdapter::new(source)).unwrap(),
        v(7)
    );
}

#[test]
fn in_place_backport_replaces_file() {
    let ws = Workspace::new();
    let path = ws.file("model.mpkg", &sample_package(8));

    backport_file_to_file(&path, &path, v(4)).unwrap();

    let reader = open_file(&path);
    assert_eq!(decode_package(&reader), sample_model(v(4)));
    assert_eq!(passthrough_entries(&reader), sample_aux_entries());
    assert_eq!(ws.listing(), vec!["model.mpkg"]);
}

#[test]
fn repeated_backports_walk_down_one_version_at_a_time() {
    let ws = Workspace::new();
    let path = ws.file("model.mpkg", &sample_package(9));

    for target in (4..9).rev() {
        let info = backport_file_to_file(&path, &path, v(target)).unwrap();
        assert_eq!(info.steps_applied.len(), 1);
        assert_eq!(get_bytecode_version_from_file(&path).unwrap(), v(target));
    }
    assert_eq!(decode_package(&open_file(&path)), sample_model(v(4)));
}
