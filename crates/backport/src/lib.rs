//! Backport pipeline for modelport packages
//!
//! Rewrites a package produced at a newer bytecode format version so that it
//! declares and encodes an older one. Everything except the bytecode records
//! is carried over byte for byte.
//!
//! Components:
//! - detector: reads the declared version of a package
//! - registry: immutable map from version `N` to the `N -> N-1` step
//! - steps: the builtin downgrade steps
//! - orchestrator: plans and folds the steps over a decoded model
//! - repackager: writes the transformed records plus passthrough entries
//! - api: stream and path entry points
//!
//! # Example
//!
//! ```ignore
//! use modelport_backport::backport_file_to_file;
//! use modelport_core::FormatVersion;
//!
//! let info = backport_file_to_file(input, output, FormatVersion::new(6))?;
//! println!("{:?}", info.steps_applied);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod detector;
pub mod inspect;
pub mod orchestrator;
pub mod registry;
pub mod repackager;
pub mod steps;
pub mod testing;

pub use api::{
    backport, backport_file_to_file, backport_file_to_stream, backport_stream_to_file,
    backport_stream_to_stream, open_bytes,
};
pub use config::{BackportConfig, ConfigError};
pub use detector::{
    detect_version, get_bytecode_version, get_bytecode_version_from_file,
    get_bytecode_version_from_reader, open_package,
};
pub use inspect::{backport_targets, inspect_package, inspect_package_file, PackageInfo};
pub use orchestrator::{downgrade, BackportInfo, Backporter, PipelineState, PreparedBackport};
pub use registry::{RegistryError, StepRegistry, StepRegistryBuilder};
pub use repackager::RepackageSummary;
pub use steps::{builtin_steps, DowngradeStep, StepFn};
