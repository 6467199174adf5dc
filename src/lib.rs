//! Modelport - backports serialized model packages to older bytecode formats
//!
//! A model package is a compressed archive holding a version marker, the
//! bytecode records, and auxiliary entries (weights, metadata, source). A
//! runtime that only understands an older format version cannot load a
//! package produced by a newer toolchain; backporting rewrites the bytecode
//! records down to the requested version and copies everything else
//! unchanged.
//!
//! # Quick Start
//!
//! ```ignore
//! use modelport::{backport_file_to_file, get_bytecode_version_from_file, FormatVersion};
//!
//! let version = get_bytecode_version_from_file(input)?;
//! let info = backport_file_to_file(input, output, FormatVersion::new(5))?;
//! assert_eq!(info.source_version, version);
//! ```
//!
//! # Architecture
//!
//! - [`modelport_core`]: versions and the error taxonomy
//! - [`modelport_archive`]: package container reading and writing
//! - [`modelport_bytecode`]: the versioned bytecode model and record codec
//! - [`modelport_backport`]: detector, step registry, orchestrator, repackager

pub use modelport_archive::{
    FileAdapter, MemoryAdapter, PackageReader, PackageWriter, ReadAdapter, StagedFile,
};
pub use modelport_backport::*;
pub use modelport_core::{
    BackportError, ErrorKind, FormatVersion, Result, TargetRejection, CURRENT_VERSION,
    MIN_SUPPORTED_VERSION,
};

pub use modelport_archive as archive;
pub use modelport_bytecode as bytecode;
