//! Bytecode format versions
//!
//! A [`FormatVersion`] identifies one on-disk bytecode encoding. Versions are
//! totally ordered; the range this build understands is
//! [`MIN_SUPPORTED_VERSION`]..=[`CURRENT_VERSION`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Oldest format version this build can read or produce
pub const MIN_SUPPORTED_VERSION: FormatVersion = FormatVersion(4);

/// Newest format version this build can read or produce
pub const CURRENT_VERSION: FormatVersion = FormatVersion(9);

/// An on-disk bytecode format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatVersion(u32);

impl FormatVersion {
    /// Wrap a raw version number
    pub const fn new(raw: u32) -> Self {
        FormatVersion(raw)
    }

    /// Raw version number
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The immediately preceding version, or `None` at version 0
    pub fn previous(self) -> Option<FormatVersion> {
        self.0.checked_sub(1).map(FormatVersion)
    }

    /// The immediately following version, or `None` on overflow
    pub fn next(self) -> Option<FormatVersion> {
        self.0.checked_add(1).map(FormatVersion)
    }

    /// Whether this build can read and write this version
    pub fn is_supported(self) -> bool {
        self >= MIN_SUPPORTED_VERSION && self <= CURRENT_VERSION
    }

    /// All supported versions in ascending order
    pub fn supported() -> impl DoubleEndedIterator<Item = FormatVersion> {
        (MIN_SUPPORTED_VERSION.0..=CURRENT_VERSION.0).map(FormatVersion)
    }

    /// Versions strictly between `self` and `target`, walking downwards.
    ///
    /// Yields `self, self-1, ..., target+1`: the input version of every
    /// downgrade step needed to get from `self` to `target`. Empty when
    /// `target >= self`.
    pub fn descending_to(self, target: FormatVersion) -> impl Iterator<Item = FormatVersion> {
        let low = target.0.saturating_add(1);
        (low..=self.0).rev().map(FormatVersion)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for FormatVersion {
    fn from(raw: u32) -> Self {
        FormatVersion(raw)
    }
}

/// Error parsing a version marker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version marker {input:?}: expected a decimal integer")]
pub struct ParseVersionError {
    /// The rejected input (trimmed)
    pub input: String,
}

impl FromStr for FormatVersion {
    type Err = ParseVersionError;

    /// Parses the textual version marker: a decimal integer, optionally
    /// surrounded by ASCII whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseVersionError {
                input: trimmed.to_string(),
            });
        }
        trimmed
            .parse::<u32>()
            .map(FormatVersion)
            .map_err(|_| ParseVersionError {
                input: trimmed.to_string(),
            })
    }
}
