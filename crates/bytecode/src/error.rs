//! Bytecode error types

use modelport_core::FormatVersion;
use thiserror::Error;

/// A model that cannot exist at its declared version
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The model uses a construct the version cannot encode
    #[error("{construct} is not representable at {version}")]
    Unrepresentable {
        /// What was found, with its location
        construct: String,
        /// The model's version
        version: FormatVersion,
    },

    /// The model is internally inconsistent
    #[error("Malformed model: {0}")]
    Malformed(String),

    /// The version is outside the supported range
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(FormatVersion),
}

impl ModelError {
    pub(crate) fn unrepresentable(construct: impl Into<String>, version: FormatVersion) -> Self {
        Self::Unrepresentable {
            construct: construct.into(),
            version,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Errors while encoding or decoding bytecode records
#[derive(Debug, Error)]
pub enum CodecError {
    /// Record framing is broken (bad magic, truncated)
    #[error("Invalid record {record}: {reason}")]
    InvalidFrame {
        /// Record name
        record: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// Record header declares a different version than the package
    #[error("Record {record} is encoded as version {found}, package declares {expected}")]
    VersionMismatch {
        /// Record name
        record: &'static str,
        /// Package version
        expected: FormatVersion,
        /// Version in the record header
        found: u32,
    },

    /// Per-item CRC32 check failed
    #[error("Checksum mismatch in {record} item {index}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Record name
        record: &'static str,
        /// Item index
        index: usize,
        /// Stored CRC
        expected: u32,
        /// Computed CRC
        actual: u32,
    },

    /// MessagePack decode failed
    #[error("Decode error in {record}: {reason}")]
    Decode {
        /// Record name
        record: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// MessagePack encode failed
    #[error("Encode error in {record}: {reason}")]
    Encode {
        /// Record name
        record: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// A record required at this version is absent
    #[error("Missing bytecode record: {0}")]
    MissingRecord(&'static str),

    /// A record that does not exist at this version is present
    #[error("Record {record} is not valid at {version}")]
    UnexpectedRecord {
        /// Record name
        record: &'static str,
        /// Package version
        version: FormatVersion,
    },

    /// The decoded or to-be-encoded model is invalid at its version
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CodecError {
    pub(crate) fn invalid_frame(record: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            record,
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
