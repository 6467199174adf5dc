//! Model package container I/O
//!
//! A model package is a zstd-compressed tar archive whose entries all live
//! under a single `model/` root:
//!
//! ```text
//! package.mpkg (tar.zst)
//! └── model/
//!     ├── version            : format version marker
//!     ├── bytecode.mpk       : bytecode records
//!     ├── ...                : more bytecode records, depending on version
//!     └── data/0, extra/...  : auxiliary entries
//! ```
//!
//! This crate only knows about named byte entries. It does not interpret
//! any of them.
//!
//! - [`ReadAdapter`]: random-access byte source (file, memory, drained stream)
//! - [`PackageReader`]: ordered, indexed view over an opened package
//! - [`PackageWriter`]: append-only builder, sealed by `finalize` or `finish`
//! - [`StagedFile`]: temp file + atomic rename for named destinations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod error;
pub mod reader;
pub mod staged;
pub mod writer;

pub use adapter::{FileAdapter, MemoryAdapter, ReadAdapter};
pub use error::{ArchiveError, ArchiveResult};
pub use reader::{PackageEntry, PackageReader};
pub use staged::StagedFile;
pub use writer::{FinishedPackage, PackageWriter, DEFAULT_COMPRESSION_LEVEL};

/// Root directory of every entry inside the tar
pub const PACKAGE_ROOT: &str = "model";

/// Check that a logical record name is a clean relative path
///
/// Rejects empty names, absolute paths, empty components (`a//b`, `dir/`),
/// and `.`/`..` components.
pub fn validate_record_name(name: &str) -> ArchiveResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('/')
        && !name.contains('\\')
        && name
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidName(name.to_string()))
    }
}

/// Compute xxh3 hash of data and return as hex string
pub fn xxh3_hex(data: &[u8]) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(data))
}
