//! Model package writer
//!
//! Append-only builder for `.tar.zst` packages. Records are written in call
//! order under the `model/` root. [`PackageWriter::finalize`] seals the
//! container (tar trailer + zstd frame end) and hands the sink back; a writer
//! dropped without finalizing leaves an incomplete, unreadable container.
//!
//! The writer hashes the compressed bytes as they reach the sink, so
//! [`PackageWriter::finish`] can report the package size and xxh3 checksum
//! without reading the output back.

use crate::error::{ArchiveError, ArchiveResult};
use crate::{validate_record_name, PACKAGE_ROOT};
use rustc_hash::FxHashSet;
use std::io::{self, Write};
use tar::{Builder, Header};
use xxhash_rust::xxh3::Xxh3;

/// Default zstd compression level for packages
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// A sealed package
#[derive(Debug)]
pub struct FinishedPackage<W> {
    /// The sink the package was written to
    pub sink: W,
    /// Compressed package size in bytes
    pub size: u64,
    /// xxh3 checksum of the compressed package, hex
    pub checksum: String,
}

/// Sink wrapper that counts and hashes everything written through it
struct HashingSink<W> {
    inner: W,
    hasher: Xxh3,
    written: u64,
}

impl<W: Write> Write for HashingSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Append-only package builder over any byte sink
pub struct PackageWriter<W: Write> {
    builder: Builder<zstd::Encoder<'static, HashingSink<W>>>,
    names: FxHashSet<String>,
    order: Vec<String>,
}

impl<W: Write> PackageWriter<W> {
    /// Create a writer with the given zstd compression level
    pub fn new(sink: W, compression_level: i32) -> ArchiveResult<Self> {
        let sink = HashingSink {
            inner: sink,
            hasher: Xxh3::new(),
            written: 0,
        };
        let mut encoder = zstd::Encoder::new(sink, compression_level)
            .map_err(|e| ArchiveError::compression(format!("zstd encoder: {}", e)))?;
        encoder
            .include_checksum(true)
            .map_err(|e| ArchiveError::compression(format!("zstd checksum flag: {}", e)))?;
        Ok(Self {
            builder: Builder::new(encoder),
            names: FxHashSet::default(),
            order: Vec::new(),
        })
    }

    /// Append one record
    ///
    /// Names must be unique within the package.
    pub fn write_record(&mut self, name: &str, data: &[u8]) -> ArchiveResult<()> {
        validate_record_name(name)?;
        if self.names.contains(name) {
            return Err(ArchiveError::DuplicateRecord(name.to_string()));
        }

        let path = format!("{}/{}", PACKAGE_ROOT, name);
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0); // Reproducible builds: zero mtime

        self.builder
            .append_data(&mut header, &path, data)
            .map_err(|e| ArchiveError::archive(format!("append '{}': {}", path, e)))?;

        self.names.insert(name.to_string());
        self.order.push(name.to_string());
        Ok(())
    }

    /// Whether a record with this name has been written
    pub fn has_record(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names written so far, in order
    pub fn written_records(&self) -> &[String] {
        &self.order
    }

    /// Seal the package and return the sink
    pub fn finalize(self) -> ArchiveResult<W> {
        self.finish().map(|finished| finished.sink)
    }

    /// Seal the package and return the sink with the package size and checksum
    pub fn finish(self) -> ArchiveResult<FinishedPackage<W>> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| ArchiveError::archive(format!("tar finish: {}", e)))?;
        let mut sink = encoder
            .finish()
            .map_err(|e| ArchiveError::compression(format!("zstd finish: {}", e)))?;
        sink.flush()?;
        Ok(FinishedPackage {
            size: sink.written,
            checksum: format!("{:016x}", sink.hasher.digest()),
            sink: sink.inner,
        })
    }
}
