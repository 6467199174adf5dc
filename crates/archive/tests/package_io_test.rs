//! Package container tests through the public API
//!
//! - Files written through a staged destination read back identically
//! - Corrupted or truncated packages are rejected
//! - Concurrent readers share one file adapter safely

use modelport_archive::{
    ArchiveError, FileAdapter, MemoryAdapter, PackageReader, PackageWriter, ReadAdapter,
    StagedFile, DEFAULT_COMPRESSION_LEVEL,
};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn sample_entries() -> Vec<(String, Vec<u8>)> {
    vec![
        ("version".to_string(), b"7\n".to_vec()),
        ("bytecode.mpk".to_string(), vec![1, 2, 3, 4]),
        ("data/0".to_string(), (0..=255).collect()),
        ("extra/metadata.json".to_string(), br#"{"producer":"test"}"#.to_vec()),
    ]
}

fn write_package<W: Write>(sink: W) -> W {
    let mut writer = PackageWriter::new(sink, DEFAULT_COMPRESSION_LEVEL).unwrap();
    for (name, data) in sample_entries() {
        writer.write_record(&name, &data).unwrap();
    }
    writer.finalize().unwrap()
}

#[test]
fn test_staged_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("model.mpkg");

    let stage = write_package(StagedFile::create(&path).unwrap());
    stage.commit(true).unwrap();

    let adapter = FileAdapter::open(&path).unwrap();
    let reader = PackageReader::open(&adapter).unwrap();

    let expected = sample_entries();
    assert_eq!(reader.len(), expected.len());
    for (entry, (name, data)) in reader.entries().iter().zip(expected.iter()) {
        assert_eq!(&entry.name, name);
        assert_eq!(&entry.data, data);
    }
}

#[test]
fn test_truncated_package_rejected() {
    let data = write_package(Vec::new());
    let truncated = data[..data.len() / 2].to_vec();

    let result = PackageReader::open(&MemoryAdapter::new(truncated));
    assert!(result.is_err());
}

#[test]
fn test_bit_flip_detected() {
    let mut data = write_package(Vec::new());
    let mid = data.len() / 2;
    data[mid] ^= 0xFF;

    // zstd frame checksums or tar header checksums catch the flip
    let result = PackageReader::open(&MemoryAdapter::new(data));
    assert!(result.is_err());
}

#[test]
fn test_missing_record_lookup() {
    let data = write_package(Vec::new());
    let reader = PackageReader::from_bytes(data).unwrap();
    assert!(matches!(
        reader.get_record("constants.mpk"),
        Err(ArchiveError::MissingRecord(name)) if name == "constants.mpk"
    ));
}

#[test]
fn test_concurrent_readers_share_adapter() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("shared.mpkg");
    let stage = write_package(StagedFile::create(&path).unwrap());
    stage.commit(false).unwrap();

    let adapter: Arc<dyn ReadAdapter> = Arc::new(FileAdapter::open(&path).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let adapter = Arc::clone(&adapter);
            thread::spawn(move || {
                let reader = PackageReader::open(adapter.as_ref()).unwrap();
                reader.get_record("data/0").unwrap().to_vec()
            })
        })
        .collect();

    let expected: Vec<u8> = (0..=255).collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
