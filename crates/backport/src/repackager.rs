//! Repackaging
//!
//! Writes the output package: the version marker first, then the bytecode
//! records encoded at the model's version, then every other source entry
//! verbatim in source order. All records are encoded (and optionally
//! re-decoded) before the first byte reaches the writer.

use crate::config::BackportConfig;
use modelport_archive::{ArchiveError, FinishedPackage, PackageReader, PackageWriter};
use modelport_bytecode::{
    decode_model, encode_model, encode_version_marker, is_reserved_record, BytecodeModel,
    VERSION_RECORD,
};
use modelport_core::{BackportError, FormatVersion, Result};
use std::io::Write;
use tracing::debug;

/// What the repackager wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackageSummary {
    /// Bytecode record names, in write order
    pub bytecode_records: Vec<String>,
    /// Number of entries copied verbatim
    pub passthrough_entries: usize,
}

/// Write `model` plus the passthrough entries of `source` and seal the package
pub fn repackage<W: Write>(
    model: &BytecodeModel,
    source: &PackageReader,
    mut writer: PackageWriter<W>,
    config: &BackportConfig,
) -> Result<(FinishedPackage<W>, RepackageSummary)> {
    let version = model.version;
    let records = encode_model(model)
        .map_err(|e| BackportError::serialization(version, e.to_string()))?;

    if config.verify_output {
        verify_records(version, &records)?;
    }

    writer
        .write_record(VERSION_RECORD, &encode_version_marker(version))
        .map_err(|e| write_error(version, e))?;

    let mut bytecode_records = Vec::with_capacity(records.len());
    for (name, data) in &records {
        writer
            .write_record(name, data)
            .map_err(|e| write_error(version, e))?;
        bytecode_records.push(name.to_string());
    }

    let mut passthrough_entries = 0;
    for entry in source.entries() {
        if is_reserved_record(&entry.name) {
            continue;
        }
        writer
            .write_record(&entry.name, &entry.data)
            .map_err(|e| write_error(version, e))?;
        passthrough_entries += 1;
    }

    let finished = writer.finish().map_err(|e| write_error(version, e))?;
    debug!(
        target: "modelport::backport",
        version = %version,
        records = bytecode_records.len(),
        passthrough_entries,
        size = finished.size,
        "Repackaged"
    );

    Ok((
        finished,
        RepackageSummary {
            bytecode_records,
            passthrough_entries,
        },
    ))
}

/// Decode freshly encoded records to prove they are readable at `version`
fn verify_records(version: FormatVersion, records: &[(&'static str, Vec<u8>)]) -> Result<()> {
    decode_model(version, |name| {
        records
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, data)| data.as_slice())
    })
    .map(|_| ())
    .map_err(|e| BackportError::serialization(version, format!("verification failed: {}", e)))
}

pub(crate) fn write_error(version: FormatVersion, e: ArchiveError) -> BackportError {
    match e {
        ArchiveError::Io(io) => BackportError::Io(io),
        other => BackportError::serialization(version, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_model, write_package};
    use modelport_archive::DEFAULT_COMPRESSION_LEVEL;
    use modelport_core::ErrorKind;

    fn v(n: u32) -> FormatVersion {
        FormatVersion::new(n)
    }

    fn aux() -> Vec<(String, Vec<u8>)> {
        vec![
            ("data/0".to_string(), vec![1, 2, 3]),
            ("extra/metadata.json".to_string(), b"{}".to_vec()),
        ]
    }

    #[test]
    fn test_layout() {
        let data = write_package(&sample_model(v(6)), &aux()).unwrap();
        let source = PackageReader::from_bytes(data).unwrap();
        let model = sample_model(v(6));
        let writer = PackageWriter::new(Vec::new(), DEFAULT_COMPRESSION_LEVEL).unwrap();

        let (finished, summary) =
            repackage(&model, &source, writer, &BackportConfig::for_testing()).unwrap();
        assert_eq!(summary.passthrough_entries, 2);
        assert_eq!(
            summary.bytecode_records,
            vec!["bytecode.mpk", "constants.mpk", "debug_handles.mpk"]
        );

        let output = PackageReader::from_bytes(finished.sink).unwrap();
        let names: Vec<&str> = output.names().collect();
        assert_eq!(
            names,
            vec![
                "version",
                "bytecode.mpk",
                "constants.mpk",
                "debug_handles.mpk",
                "data/0",
                "extra/metadata.json"
            ]
        );
        assert_eq!(output.get_record("version").unwrap(), b"6\n");
    }

    #[test]
    fn test_stale_bytecode_records_not_copied() {
        // Source at v8 has a side table; a v9 model must not inherit it
        let data = write_package(&sample_model(v(8)), &aux()).unwrap();
        let source = PackageReader::from_bytes(data).unwrap();
        assert!(source.has_record("debug_handles.mpk"));

        let writer = PackageWriter::new(Vec::new(), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let (finished, _) = repackage(
            &sample_model(v(9)),
            &source,
            writer,
            &BackportConfig::for_testing(),
        )
        .unwrap();

        let output = PackageReader::from_bytes(finished.sink).unwrap();
        assert!(!output.has_record("debug_handles.mpk"));
    }

    #[test]
    fn test_unencodable_model_is_serialization_error() {
        let data = write_package(&sample_model(v(6)), &[]).unwrap();
        let source = PackageReader::from_bytes(data).unwrap();
        let mut model = sample_model(v(9));
        model.version = v(6);

        let writer = PackageWriter::new(Vec::new(), DEFAULT_COMPRESSION_LEVEL).unwrap();
        let err = repackage(&model, &source, writer, &BackportConfig::for_testing()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SerializationError);
    }

    #[test]
    fn test_verify_records() {
        let records = encode_model(&sample_model(v(7))).unwrap();
        assert!(verify_records(v(7), &records).is_ok());

        let err = verify_records(v(6), &records).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SerializationError);
    }
}
