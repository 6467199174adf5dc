//! Version detection
//!
//! The declared format version of a package is the decimal number in its
//! `version` record. Detection never decodes the bytecode records.

use modelport_archive::{ArchiveError, FileAdapter, MemoryAdapter, PackageReader, ReadAdapter};
use modelport_bytecode::VERSION_RECORD;
use modelport_core::{BackportError, FormatVersion, Result};
use std::io::Read;
use std::path::Path;

/// Open a package, mapping container errors to `UnreadableArchive`
pub fn open_package(adapter: &dyn ReadAdapter) -> Result<PackageReader> {
    PackageReader::open(adapter).map_err(unreadable_archive)
}

/// Declared format version of an opened package
pub fn detect_version(reader: &PackageReader) -> Result<FormatVersion> {
    let data = reader
        .record(VERSION_RECORD)
        .ok_or_else(|| BackportError::unreadable("package has no version record"))?;
    let text = std::str::from_utf8(data)
        .map_err(|_| BackportError::unreadable("version record is not UTF-8"))?;
    text.parse::<FormatVersion>()
        .map_err(|e| BackportError::unreadable(e.to_string()))
}

/// Declared format version of the package behind a read adapter
pub fn get_bytecode_version(adapter: &dyn ReadAdapter) -> Result<FormatVersion> {
    detect_version(&open_package(adapter)?)
}

/// Declared format version of a package file
pub fn get_bytecode_version_from_file(path: &Path) -> Result<FormatVersion> {
    let adapter = FileAdapter::open(path).map_err(|e| {
        BackportError::unreadable(format!("cannot open {}: {}", path.display(), e))
    })?;
    get_bytecode_version(&adapter)
}

/// Declared format version of a package read from a stream
pub fn get_bytecode_version_from_reader<R: Read>(reader: R) -> Result<FormatVersion> {
    let adapter = MemoryAdapter::from_reader(reader)
        .map_err(|e| BackportError::unreadable(format!("cannot read source stream: {}", e)))?;
    get_bytecode_version(&adapter)
}

pub(crate) fn unreadable_archive(e: ArchiveError) -> BackportError {
    BackportError::unreadable(e.to_string())
}
