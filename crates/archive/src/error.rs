//! Archive error types

use std::io;
use thiserror::Error;

/// Errors that can occur while reading or writing a model package
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Tar structure is invalid or an entry could not be read/appended
    #[error("Archive error: {0}")]
    Archive(String),

    /// Compression/decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// Requested record is not in the package
    #[error("Missing record in package: {0}")]
    MissingRecord(String),

    /// A record name appears twice
    #[error("Duplicate record in package: {0}")]
    DuplicateRecord(String),

    /// Record name is empty, absolute, or escapes the package root
    #[error("Invalid record name: {0:?}")]
    InvalidName(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// Create an archive error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a compression error
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a missing record error
    pub fn missing_record(name: impl Into<String>) -> Self {
        Self::MissingRecord(name.into())
    }
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;
