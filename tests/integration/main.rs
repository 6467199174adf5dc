//! Integration Tests
//!
//! Whole-package backports through the facade crate:
//! - Entry points: stream and path variants agree with each other
//! - Failures: classified errors, destinations left as they were
//! - Reports: inspection and run reports

#[path = "../common/mod.rs"]
mod common;

mod entry_points;
mod failures;
mod reports;
