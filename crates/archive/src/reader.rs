//! Model package reader
//!
//! Opens a `.tar.zst` package through a [`ReadAdapter`] and indexes its
//! entries by logical name (the path with the `model/` root stripped).
//! Entry order is preserved exactly as stored.
//!
//! Only regular files are package entries. Explicit directory entries carry
//! no data and are skipped; any other entry type, and any entry name that is
//! not valid UTF-8, makes the package unreadable.

use crate::adapter::{MemoryAdapter, ReadAdapter};
use crate::error::{ArchiveError, ArchiveResult};
use crate::{validate_record_name, PACKAGE_ROOT};
use rustc_hash::FxHashMap;
use std::io::Read;
use tar::{Archive, EntryType};
use tracing::debug;

/// One named entry of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Logical name, relative to the package root
    pub name: String,
    /// Raw entry bytes
    pub data: Vec<u8>,
}

/// Read-only view over an opened package
///
/// The reader never mutates the underlying source. All entries are read
/// when the package is opened, so later lookups cannot fail on I/O.
#[derive(Debug)]
pub struct PackageReader {
    entries: Vec<PackageEntry>,
    index: FxHashMap<String, usize>,
    archive_size: u64,
}

impl PackageReader {
    /// Open a package from any random-access source
    pub fn open(adapter: &dyn ReadAdapter) -> ArchiveResult<Self> {
        let raw = adapter.read_all()?;
        let archive_size = raw.len() as u64;

        // Decode the whole frame up front so its content checksum is verified
        let tar_data = zstd::decode_all(&raw[..])
            .map_err(|e| ArchiveError::compression(format!("zstd decode: {}", e)))?;
        let mut archive = Archive::new(&tar_data[..]);
        let prefix = format!("{}/", PACKAGE_ROOT);

        let mut entries = Vec::new();
        let mut index = FxHashMap::default();

        for entry in archive
            .entries()
            .map_err(|e| ArchiveError::archive(e.to_string()))?
        {
            let mut entry = entry.map_err(|e| ArchiveError::archive(e.to_string()))?;
            let entry_type = entry.header().entry_type();
            if entry_type == EntryType::Directory {
                debug!(
                    target: "modelport::archive",
                    path = %String::from_utf8_lossy(&entry.path_bytes()),
                    "Skipping directory entry"
                );
                continue;
            }
            if !matches!(entry_type, EntryType::Regular | EntryType::Continuous) {
                return Err(ArchiveError::archive(format!(
                    "unsupported entry type {:?}",
                    entry_type
                )));
            }

            let entry_path = String::from_utf8(entry.path_bytes().into_owned()).map_err(|e| {
                ArchiveError::InvalidName(String::from_utf8_lossy(e.as_bytes()).into_owned())
            })?;

            let name = entry_path.strip_prefix(&prefix).ok_or_else(|| {
                ArchiveError::archive(format!(
                    "entry {:?} is outside the {}/ root",
                    entry_path, PACKAGE_ROOT
                ))
            })?;
            validate_record_name(name)?;

            if index.contains_key(name) {
                return Err(ArchiveError::DuplicateRecord(name.to_string()));
            }

            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| ArchiveError::archive(format!("read {}: {}", name, e)))?;

            index.insert(name.to_string(), entries.len());
            entries.push(PackageEntry {
                name: name.to_string(),
                data,
            });
        }

        debug!(target: "modelport::archive", entries = entries.len(), archive_size, "Opened package");

        Ok(Self {
            entries,
            index,
            archive_size,
        })
    }

    /// Open a package held in memory
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> ArchiveResult<Self> {
        Self::open(&MemoryAdapter::new(data.into()))
    }

    /// Whether a record with this name exists
    pub fn has_record(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a record's bytes
    pub fn record(&self, name: &str) -> Option<&[u8]> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].data.as_slice())
    }

    /// Look up a record's bytes, failing if absent
    pub fn get_record(&self, name: &str) -> ArchiveResult<&[u8]> {
        self.record(name)
            .ok_or_else(|| ArchiveError::missing_record(name))
    }

    /// Record names in stored order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Entries in stored order
    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the package has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the compressed package in bytes
    pub fn archive_size(&self) -> u64 {
        self.archive_size
    }
}
