//! Package inspection

use crate::detector::{detect_version, open_package};
use crate::registry::StepRegistry;
use modelport_archive::{FileAdapter, ReadAdapter};
use modelport_bytecode::{decode_model, is_bytecode_record, VERSION_RECORD};
use modelport_core::{BackportError, FormatVersion, Result};
use serde::Serialize;
use std::path::Path;

/// Summary of a package's contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    /// Declared format version
    pub version: FormatVersion,
    /// Function names, in bytecode order
    pub functions: Vec<String>,
    /// Distinct operator names across all functions, sorted
    pub operators: Vec<String>,
    /// Total instruction count
    pub instruction_count: usize,
    /// Bytecode record names present in the package
    pub bytecode_records: Vec<String>,
    /// Auxiliary entry names, in package order
    pub auxiliary_entries: Vec<String>,
    /// Compressed size of the package
    pub archive_size: u64,
}

/// Decode a package and summarize it
pub fn inspect_package(adapter: &dyn ReadAdapter) -> Result<PackageInfo> {
    let reader = open_package(adapter)?;
    let version = detect_version(&reader)?;
    if !version.is_supported() {
        return Err(BackportError::unreadable(format!(
            "package declares unsupported format version {}",
            version
        )));
    }
    let model = decode_model(version, |name| reader.record(name)).map_err(|e| {
        BackportError::unreadable(format!("cannot decode {} bytecode: {}", version, e))
    })?;

    let (bytecode_records, auxiliary_entries): (Vec<String>, Vec<String>) = reader
        .names()
        .filter(|name| *name != VERSION_RECORD)
        .map(str::to_string)
        .partition(|name| is_bytecode_record(name));

    Ok(PackageInfo {
        version,
        functions: model.functions.iter().map(|f| f.name.clone()).collect(),
        operators: model.operator_names().into_iter().collect(),
        instruction_count: model.instruction_count(),
        bytecode_records,
        auxiliary_entries,
        archive_size: reader.archive_size(),
    })
}

/// Inspect the package file at `path`
pub fn inspect_package_file(path: &Path) -> Result<PackageInfo> {
    let adapter = FileAdapter::open(path).map_err(|e| {
        BackportError::unreadable(format!("cannot open {}: {}", path.display(), e))
    })?;
    inspect_package(&adapter)
}

/// Versions the builtin steps can bring a `version` package down to
///
/// Descending, starting with `version` itself. Empty for versions this
/// build cannot read.
pub fn backport_targets(version: FormatVersion) -> Vec<FormatVersion> {
    if !version.is_supported() {
        return Vec::new();
    }
    StepRegistry::global()
        .reachable_from(version)
        .into_iter()
        .filter(|v| v.is_supported())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_aux_entries, sample_model, write_package};
    use modelport_archive::MemoryAdapter;
    use modelport_core::ErrorKind;

    fn v(n: u32) -> FormatVersion {
        FormatVersion::new(n)
    }

    #[test]
    fn test_inspect_sample() {
        let data = write_package(&sample_model(v(7)), &sample_aux_entries()).unwrap();
        let size = data.len() as u64;
        let info = inspect_package(&MemoryAdapter::new(data)).unwrap();

        assert_eq!(info.version, v(7));
        assert_eq!(info.functions, vec!["forward", "helper"]);
        assert!(info.operators.contains(&"prim::RaiseException".to_string()));
        assert!(info.operators.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(info.instruction_count, 19 + 4);
        assert_eq!(
            info.bytecode_records,
            vec!["bytecode.mpk", "constants.mpk", "debug_handles.mpk"]
        );
        assert_eq!(
            info.auxiliary_entries,
            vec!["data/0", "extra/metadata.json", "code/forward.py"]
        );
        assert_eq!(info.archive_size, size);
    }

    #[test]
    fn test_inspect_serializes() {
        let data = write_package(&sample_model(v(9)), &[]).unwrap();
        let info = inspect_package(&MemoryAdapter::new(data)).unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["functions"][1], "helper");
        assert!(json["auxiliary_entries"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_inspect_garbage() {
        let err = inspect_package(&MemoryAdapter::new(b"not a package".to_vec())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnreadableArchive);
    }

    #[test]
    fn test_backport_targets() {
        let targets: Vec<u32> = backport_targets(v(9))
            .into_iter()
            .map(FormatVersion::get)
            .collect();
        assert_eq!(targets, vec![9, 8, 7, 6, 5, 4]);
        assert_eq!(backport_targets(v(4)), vec![v(4)]);
        assert!(backport_targets(v(3)).is_empty());
        assert!(backport_targets(v(10)).is_empty());
    }
}
