//! Core types for modelport
//!
//! This crate defines the foundational types shared by every other crate:
//! - FormatVersion: ordered bytecode format version and the supported range
//! - BackportError: error taxonomy for backport runs
//! - ErrorKind: coarse classification for callers that branch on failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod version;

pub use error::{BackportError, ErrorKind, Result, TargetRejection};
pub use version::{FormatVersion, ParseVersionError, CURRENT_VERSION, MIN_SUPPORTED_VERSION};
