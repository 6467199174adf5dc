//! Error types for backport operations
//!
//! Every failure of a backport run is reported as one [`BackportError`].
//! The variants follow the pipeline: the source could not be read, the
//! requested target is not acceptable, the registered step chain has a gap,
//! a step rejected the model, or the final encoding failed.

use crate::version::FormatVersion;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for backport operations
pub type Result<T> = std::result::Result<T, BackportError>;

/// Why a requested target version was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRejection {
    /// The target is newer than the source; only downgrades are supported
    Upgrade,
    /// The target is older than the oldest version this build supports
    BelowMinimum {
        /// Oldest supported version
        minimum: FormatVersion,
    },
}

impl fmt::Display for TargetRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRejection::Upgrade => write!(f, "upgrades are not supported"),
            TargetRejection::BelowMinimum { minimum } => {
                write!(f, "oldest supported version is {}", minimum)
            }
        }
    }
}

/// Error types for backport operations
#[derive(Debug, Error)]
pub enum BackportError {
    /// Source container cannot be opened, has no version marker, or its
    /// bytecode records cannot be decoded
    #[error("Unreadable archive: {reason}")]
    UnreadableArchive {
        /// Description of the problem
        reason: String,
    },

    /// Requested target version is not acceptable for this source
    #[error("Unsupported target {target} for source {source_version}: {reason}")]
    UnsupportedTarget {
        /// Version declared by the source package
        source_version: FormatVersion,
        /// Requested target version
        target: FormatVersion,
        /// Why the target was rejected
        reason: TargetRejection,
    },

    /// No downgrade step is registered for `from -> from-1`
    #[error("No downgrade path: no step registered for {from} -> {}", prev_label(.from))]
    NoDowngradePath {
        /// Input version of the missing step
        from: FormatVersion,
    },

    /// A downgrade step rejected the model
    #[error("Downgrade step {from} -> {to} failed: {reason}")]
    StepFailure {
        /// Input version of the step
        from: FormatVersion,
        /// Output version of the step
        to: FormatVersion,
        /// Construct that has no representation at the lower version
        reason: String,
    },

    /// Final re-encoding at the target version failed
    #[error("Serialization error at {version}: {reason}")]
    SerializationError {
        /// Version being encoded
        version: FormatVersion,
        /// Description of the problem
        reason: String,
    },

    /// Writing the destination failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn prev_label(from: &FormatVersion) -> String {
    from.previous()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// Classification of a [`BackportError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`BackportError::UnreadableArchive`]
    UnreadableArchive,
    /// See [`BackportError::UnsupportedTarget`]
    UnsupportedTarget,
    /// See [`BackportError::NoDowngradePath`]
    NoDowngradePath,
    /// See [`BackportError::StepFailure`]
    StepFailure,
    /// See [`BackportError::SerializationError`]
    SerializationError,
    /// See [`BackportError::Io`]
    Io,
}

impl BackportError {
    /// Create an unreadable archive error
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self::UnreadableArchive {
            reason: reason.into(),
        }
    }

    /// Create a step failure for the step consuming `from`
    pub fn step_failure(from: FormatVersion, reason: impl Into<String>) -> Self {
        Self::StepFailure {
            from,
            to: from.previous().unwrap_or(from),
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(version: FormatVersion, reason: impl Into<String>) -> Self {
        Self::SerializationError {
            version,
            reason: reason.into(),
        }
    }

    /// Error classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackportError::UnreadableArchive { .. } => ErrorKind::UnreadableArchive,
            BackportError::UnsupportedTarget { .. } => ErrorKind::UnsupportedTarget,
            BackportError::NoDowngradePath { .. } => ErrorKind::NoDowngradePath,
            BackportError::StepFailure { .. } => ErrorKind::StepFailure,
            BackportError::SerializationError { .. } => ErrorKind::SerializationError,
            BackportError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether asking for a different target version could succeed.
    ///
    /// True for rejected targets and for step failures (a newer target may
    /// avoid the offending step). A gap in the registry, an unreadable
    /// source, or an encoding failure is a hard failure.
    pub fn suggests_other_target(&self) -> bool {
        matches!(
            self,
            BackportError::UnsupportedTarget { .. } | BackportError::StepFailure { .. }
        )
    }
}
