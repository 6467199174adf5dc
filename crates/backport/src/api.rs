//! Stream and path entry points
//!
//! Thin adapters over [`Backporter::backport`]: each turns its source into a
//! [`ReadAdapter`] and its destination into a [`PackageWriter`].
//!
//! - Stream destinations receive the package in one write after it has been
//!   sealed, so a failed run writes nothing.
//! - Path destinations are staged in a sibling temp file and renamed into
//!   place on success; a failed run leaves an existing file untouched.
//!
//! The free functions use the builtin registry and the default configuration.

use crate::detector::unreadable_archive;
use crate::orchestrator::{BackportInfo, Backporter};
use crate::repackager::write_error;
use modelport_archive::{FileAdapter, MemoryAdapter, PackageWriter, ReadAdapter, StagedFile};
use modelport_core::{BackportError, FormatVersion, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

impl<'r> Backporter<'r> {
    /// Backport a package read from `input` into `output`
    pub fn backport_stream_to_stream<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
        target: FormatVersion,
    ) -> Result<BackportInfo> {
        let source = drain(input)?;
        self.write_stream(&source, output, target)
    }

    /// Backport a package read from `input` into the file at `output`
    pub fn backport_stream_to_file<R: Read>(
        &self,
        input: R,
        output: &Path,
        target: FormatVersion,
    ) -> Result<BackportInfo> {
        let source = drain(input)?;
        self.write_file(&source, output, target)
    }

    /// Backport the package file at `input` into `output`
    pub fn backport_file_to_stream<W: Write>(
        &self,
        input: &Path,
        output: W,
        target: FormatVersion,
    ) -> Result<BackportInfo> {
        let source = open_file(input)?;
        self.write_stream(&source, output, target)
    }

    /// Backport the package file at `input` into the file at `output`
    ///
    /// `input` and `output` may be the same path.
    pub fn backport_file_to_file(
        &self,
        input: &Path,
        output: &Path,
        target: FormatVersion,
    ) -> Result<BackportInfo> {
        let source = open_file(input)?;
        self.write_file(&source, output, target)
    }

    fn write_stream<W: Write>(
        &self,
        source: &dyn ReadAdapter,
        mut output: W,
        target: FormatVersion,
    ) -> Result<BackportInfo> {
        let prepared = self.prepare(source, target)?;
        let writer = PackageWriter::new(Vec::new(), self.config().compression_level)
            .map_err(|e| write_error(target, e))?;
        let (buffer, info) = self.write(prepared, writer)?;

        output.write_all(&buffer)?;
        output.flush()?;
        Ok(info)
    }

    fn write_file(
        &self,
        source: &dyn ReadAdapter,
        output: &Path,
        target: FormatVersion,
    ) -> Result<BackportInfo> {
        let prepared = self.prepare(source, target)?;

        let stage = StagedFile::create(output)?;
        debug!(target: "modelport::backport", path = %stage.temp_path().display(), "Staging output");
        let writer = PackageWriter::new(stage, self.config().compression_level)
            .map_err(|e| write_error(target, e))?;
        let (stage, info) = self.write(prepared, writer)?;

        stage.commit(self.config().sync_on_commit)?;
        Ok(info)
    }
}

fn drain<R: Read>(input: R) -> Result<MemoryAdapter> {
    MemoryAdapter::from_reader(input)
        .map_err(|e| BackportError::unreadable(format!("cannot read source stream: {}", e)))
}

fn open_file(path: &Path) -> Result<FileAdapter> {
    FileAdapter::open(path)
        .map_err(|e| BackportError::unreadable(format!("cannot open {}: {}", path.display(), e)))
}

/// Backport through the canonical adapter/writer interface
pub fn backport<W: Write>(
    source: &dyn ReadAdapter,
    writer: PackageWriter<W>,
    target: FormatVersion,
) -> Result<(W, BackportInfo)> {
    Backporter::default().backport(source, writer, target)
}

/// Backport a package read from `input` into `output`
pub fn backport_stream_to_stream<R: Read, W: Write>(
    input: R,
    output: W,
    target: FormatVersion,
) -> Result<BackportInfo> {
    Backporter::default().backport_stream_to_stream(input, output, target)
}

/// Backport a package read from `input` into the file at `output`
pub fn backport_stream_to_file<R: Read>(
    input: R,
    output: &Path,
    target: FormatVersion,
) -> Result<BackportInfo> {
    Backporter::default().backport_stream_to_file(input, output, target)
}

/// Backport the package file at `input` into `output`
pub fn backport_file_to_stream<W: Write>(
    input: &Path,
    output: W,
    target: FormatVersion,
) -> Result<BackportInfo> {
    Backporter::default().backport_file_to_stream(input, output, target)
}

/// Backport the package file at `input` into the file at `output`
pub fn backport_file_to_file(
    input: &Path,
    output: &Path,
    target: FormatVersion,
) -> Result<BackportInfo> {
    Backporter::default().backport_file_to_file(input, output, target)
}

/// Open an already-read package, for callers holding raw bytes
pub fn open_bytes(data: impl Into<Vec<u8>>) -> Result<modelport_archive::PackageReader> {
    modelport_archive::PackageReader::from_bytes(data).map_err(unreadable_archive)
}
