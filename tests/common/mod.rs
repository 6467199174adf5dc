//! Shared test utilities for the workspace integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use modelport::bytecode::{decode_model, is_reserved_record, BytecodeModel, VERSION_RECORD};
use modelport::testing::{sample_aux_entries, sample_model, write_package};
use modelport::{FormatVersion, PackageReader};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn v(n: u32) -> FormatVersion {
    FormatVersion::new(n)
}

/// Sample package bytes at `version` with the sample auxiliary entries
pub fn sample_package(version: u32) -> Vec<u8> {
    write_package(&sample_model(v(version)), &sample_aux_entries()).unwrap()
}

/// Declared version and decoded model of a package
pub fn decode_package(reader: &PackageReader) -> BytecodeModel {
    let marker = std::str::from_utf8(reader.get_record(VERSION_RECORD).unwrap()).unwrap();
    let version: FormatVersion = marker.parse().unwrap();
    decode_model(version, |name| reader.record(name)).unwrap()
}

/// Entries a backport must copy verbatim, in stored order
pub fn passthrough_entries(reader: &PackageReader) -> Vec<(String, Vec<u8>)> {
    reader
        .entries()
        .iter()
        .filter(|e| !is_reserved_record(&e.name))
        .map(|e| (e.name.clone(), e.data.clone()))
        .collect()
}

// ============================================================================
// Scratch directory
// ============================================================================

/// Temp directory holding a source package
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `data` to `name` and return its path
    pub fn file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, data).unwrap();
        path
    }

    /// Names of every file in the directory, sorted
    pub fn listing(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn open_file(path: &Path) -> PackageReader {
    modelport::open_bytes(fs::read(path).unwrap()).unwrap()
}
