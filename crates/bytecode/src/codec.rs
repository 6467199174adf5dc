//! Bytecode record codec
//!
//! A model is stored as up to three package records, each in the same framed
//! layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (16 bytes)                            │
//! │   Magic: "MPBYTECODE" (10 bytes)             │
//! │   Version: u16 LE (must match the package)   │
//! │   Item count: u32 LE                         │
//! ├──────────────────────────────────────────────┤
//! │ For each item:                               │
//! │   Length: u32 LE                             │
//! │   Data: msgpack (named fields)               │
//! │   CRC32: u32 LE                              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! | Record | Items | Present |
//! |--------|-------|---------|
//! | `bytecode.mpk` | [`Function`] | always |
//! | `constants.mpk` | [`SharedTensor`] | v5+ |
//! | `debug_handles.mpk` | [`DebugHandleTable`] | up to v8, when non-empty |

use crate::constant::TensorData;
use crate::error::{CodecError, CodecResult};
use crate::function::Function;
use crate::model::{BytecodeModel, INLINE_DEBUG_VERSION, SHARED_CONSTANTS_VERSION};
use modelport_core::FormatVersion;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

/// Name of the version marker record
pub const VERSION_RECORD: &str = "version";
/// Functions record
pub const BYTECODE_RECORD: &str = "bytecode.mpk";
/// Shared tensor table record
pub const CONSTANTS_RECORD: &str = "constants.mpk";
/// Debug handle side table record
pub const DEBUG_HANDLES_RECORD: &str = "debug_handles.mpk";

/// Every record name owned by the bytecode codec
pub const BYTECODE_RECORDS: [&str; 3] = [BYTECODE_RECORD, CONSTANTS_RECORD, DEBUG_HANDLES_RECORD];

/// Magic bytes at the start of every bytecode record
pub const RECORD_MAGIC: &[u8; 10] = b"MPBYTECODE";

/// Header size in bytes: magic (10) + version (2) + count (4)
const HEADER_SIZE: usize = 16;

/// Smallest possible item: length (4) + CRC (4)
const MIN_ITEM_SIZE: usize = 8;

/// Whether `name` is a bytecode record
pub fn is_bytecode_record(name: &str) -> bool {
    BYTECODE_RECORDS.contains(&name)
}

/// Whether `name` is rewritten by a backport (version marker or bytecode)
pub fn is_reserved_record(name: &str) -> bool {
    name == VERSION_RECORD || is_bytecode_record(name)
}

/// Render the version marker record
pub fn encode_version_marker(version: FormatVersion) -> Vec<u8> {
    format!("{}\n", version.get()).into_bytes()
}

/// One entry of the shared tensor table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedTensor {
    /// Key referenced by `Constant::TensorRef`
    pub key: String,
    /// Tensor payload
    pub tensor: TensorData,
}

/// Debug handles for one function, one per instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugHandleTable {
    /// Function name
    pub function: String,
    /// Handle per instruction, `-1` when unknown
    pub handles: Vec<i64>,
}

/// Encode a model into its records, in canonical order
///
/// The model is validated first; an invalid model is never encoded.
pub fn encode_model(model: &BytecodeModel) -> CodecResult<Vec<(&'static str, Vec<u8>)>> {
    model.validate()?;
    let version = model.version;

    let mut records = Vec::with_capacity(BYTECODE_RECORDS.len());
    records.push((
        BYTECODE_RECORD,
        write_frame(BYTECODE_RECORD, version, &model.functions)?,
    ));

    if version >= SHARED_CONSTANTS_VERSION {
        let table: Vec<SharedTensor> = model
            .shared_constants
            .iter()
            .map(|(key, tensor)| SharedTensor {
                key: key.clone(),
                tensor: tensor.clone(),
            })
            .collect();
        records.push((
            CONSTANTS_RECORD,
            write_frame(CONSTANTS_RECORD, version, &table)?,
        ));
    }

    if version < INLINE_DEBUG_VERSION && !model.debug_handles.is_empty() {
        let tables: Vec<DebugHandleTable> = model
            .debug_handles
            .iter()
            .map(|(function, handles)| DebugHandleTable {
                function: function.clone(),
                handles: handles.clone(),
            })
            .collect();
        records.push((
            DEBUG_HANDLES_RECORD,
            write_frame(DEBUG_HANDLES_RECORD, version, &tables)?,
        ));
    }

    Ok(records)
}

/// Decode a model from the records of a package declaring `version`
///
/// `record` looks up a record's bytes by name. The decoded model is
/// validated before it is returned.
pub fn decode_model<'a, F>(version: FormatVersion, mut record: F) -> CodecResult<BytecodeModel>
where
    F: FnMut(&str) -> Option<&'a [u8]>,
{
    let mut model = BytecodeModel::new(version);

    let data = record(BYTECODE_RECORD).ok_or(CodecError::MissingRecord(BYTECODE_RECORD))?;
    model.functions = read_frame(BYTECODE_RECORD, version, data)?;

    match (record(CONSTANTS_RECORD), version >= SHARED_CONSTANTS_VERSION) {
        (Some(data), true) => {
            let table: Vec<SharedTensor> = read_frame(CONSTANTS_RECORD, version, data)?;
            for entry in table {
                if model.shared_constants.contains_key(&entry.key) {
                    return Err(CodecError::invalid_frame(
                        CONSTANTS_RECORD,
                        format!("duplicate tensor key {:?}", entry.key),
                    ));
                }
                model.shared_constants.insert(entry.key, entry.tensor);
            }
        }
        (None, true) => return Err(CodecError::MissingRecord(CONSTANTS_RECORD)),
        (Some(_), false) => {
            return Err(CodecError::UnexpectedRecord {
                record: CONSTANTS_RECORD,
                version,
            })
        }
        (None, false) => {}
    }

    if let Some(data) = record(DEBUG_HANDLES_RECORD) {
        if version >= INLINE_DEBUG_VERSION {
            return Err(CodecError::UnexpectedRecord {
                record: DEBUG_HANDLES_RECORD,
                version,
            });
        }
        let tables: Vec<DebugHandleTable> = read_frame(DEBUG_HANDLES_RECORD, version, data)?;
        for table in tables {
            if model.debug_handles.contains_key(&table.function) {
                return Err(CodecError::invalid_frame(
                    DEBUG_HANDLES_RECORD,
                    format!("duplicate table for {:?}", table.function),
                ));
            }
            model.debug_handles.insert(table.function, table.handles);
        }
    }

    model.validate()?;
    Ok(model)
}

/// Write items in the framed record layout
pub fn write_frame<T: Serialize>(
    record: &'static str,
    version: FormatVersion,
    items: &[T],
) -> CodecResult<Vec<u8>> {
    let header_version = u16::try_from(version.get()).map_err(|_| CodecError::Encode {
        record,
        reason: format!("version {} does not fit the record header", version),
    })?;
    let count = u32::try_from(items.len()).map_err(|_| CodecError::Encode {
        record,
        reason: format!("{} items exceed the record limit", items.len()),
    })?;

    let mut buffer = Vec::new();
    buffer.extend_from_slice(RECORD_MAGIC);
    buffer.extend_from_slice(&header_version.to_le_bytes());
    buffer.extend_from_slice(&count.to_le_bytes());

    for item in items {
        let data = rmp_serde::to_vec_named(item).map_err(|e| CodecError::Encode {
            record,
            reason: e.to_string(),
        })?;
        let len = u32::try_from(data.len()).map_err(|_| CodecError::Encode {
            record,
            reason: format!("item of {} bytes exceeds the record limit", data.len()),
        })?;
        let crc = crc32fast::hash(&data);

        buffer.extend_from_slice(&len.to_le_bytes());
        buffer.extend_from_slice(&data);
        buffer.extend_from_slice(&crc.to_le_bytes());
    }

    Ok(buffer)
}

/// Read items from the framed record layout
///
/// Checks the magic, the header version, every item CRC, and that no bytes
/// trail the last item.
pub fn read_frame<T: DeserializeOwned>(
    record: &'static str,
    version: FormatVersion,
    data: &[u8],
) -> CodecResult<Vec<T>> {
    let mut reader = Cursor::new(data);

    let mut header = [0u8; HEADER_SIZE];
    reader
        .read_exact(&mut header)
        .map_err(|e| CodecError::invalid_frame(record, format!("failed to read header: {}", e)))?;

    if &header[0..10] != RECORD_MAGIC {
        return Err(CodecError::invalid_frame(
            record,
            format!("invalid magic {:?}", &header[0..10]),
        ));
    }

    let found = u16::from_le_bytes([header[10], header[11]]);
    if u32::from(found) != version.get() {
        return Err(CodecError::VersionMismatch {
            record,
            expected: version,
            found: u32::from(found),
        });
    }

    let count = u32::from_le_bytes([header[12], header[13], header[14], header[15]]) as usize;
    let remaining = data.len() - HEADER_SIZE;
    if count > remaining / MIN_ITEM_SIZE {
        return Err(CodecError::invalid_frame(
            record,
            format!("{} items cannot fit in {} bytes", count, remaining),
        ));
    }

    let mut items = Vec::with_capacity(count);
    for index in 0..count {
        items.push(read_item(&mut reader, record, index)?);
    }

    if (reader.position() as usize) != data.len() {
        return Err(CodecError::invalid_frame(
            record,
            format!(
                "{} trailing bytes after item {}",
                data.len() - reader.position() as usize,
                count
            ),
        ));
    }

    Ok(items)
}

fn read_item<T: DeserializeOwned>(
    reader: &mut Cursor<&[u8]>,
    record: &'static str,
    index: usize,
) -> CodecResult<T> {
    let truncated =
        |e: std::io::Error| CodecError::invalid_frame(record, format!("item {}: {}", index, e));

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).map_err(truncated)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let remaining = reader.get_ref().len() - reader.position() as usize;
    if len > remaining {
        return Err(CodecError::invalid_frame(
            record,
            format!("item {} length {} exceeds remaining {} bytes", index, len, remaining),
        ));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(truncated)?;

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes).map_err(truncated)?;
    let expected = u32::from_le_bytes(crc_bytes);
    let actual = crc32fast::hash(&data);
    if expected != actual {
        return Err(CodecError::ChecksumMismatch {
            record,
            index,
            expected,
            actual,
        });
    }

    rmp_serde::from_slice(&data).map_err(|e| CodecError::Decode {
        record,
        reason: format!("item {}: {}", index, e),
    })
}
