//! Versioned bytecode model for model packages
//!
//! This crate defines the in-memory form of a package's bytecode records and
//! their encoding:
//! - BytecodeModel: functions, shared tensor table, debug handle side table
//! - Function / Instruction / Operator / Constant: the program itself
//! - validate: what each format version can and cannot represent
//! - codec: framed msgpack records with per-item CRC32
//!
//! A model is tied to exactly one [`FormatVersion`](modelport_core::FormatVersion).
//! Converting between versions is the job of the backport crate; this crate
//! only checks that a model fits its declared version.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod constant;
pub mod error;
pub mod function;
pub mod instruction;
pub mod model;
pub mod operator;

pub use codec::{
    decode_model, encode_model, encode_version_marker, is_bytecode_record, is_reserved_record,
    BYTECODE_RECORD, CONSTANTS_RECORD, DEBUG_HANDLES_RECORD, VERSION_RECORD,
};
pub use constant::{Constant, TensorData};
pub use error::{CodecError, CodecResult, ModelError};
pub use function::Function;
pub use instruction::{Instruction, OpCode};
pub use model::BytecodeModel;
pub use operator::Operator;
