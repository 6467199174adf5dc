//! Fixture builders
//!
//! Produce packages at any supported version for tests and tooling.
//!
//! [`sample_model`] builds the same program at every version, using each
//! version's native encoding: inline debug handles and promoted opcodes where
//! available, elided defaults and out-argument counts where recorded, shared
//! or inline tensors. Backporting `sample_model(v)` to `t` therefore yields
//! exactly `sample_model(t)`.
//!
//! # Example
//!
//! ```ignore
//! use modelport_backport::testing::{sample_model, write_package};
//!
//! let model = sample_model(FormatVersion::new(9));
//! let bytes = write_package(&model, &[("data/0".into(), vec![0; 16])])?;
//! ```

use modelport_archive::{PackageWriter, DEFAULT_COMPRESSION_LEVEL};
use modelport_bytecode::{
    encode_model, encode_version_marker, BytecodeModel, Constant, Function, Instruction, OpCode,
    Operator, TensorData, VERSION_RECORD,
};
use modelport_core::{BackportError, FormatVersion, Result};
use std::collections::BTreeMap;

/// Key of the sample weight in the shared tensor table
pub const SAMPLE_TENSOR_KEY: &str = "0";

/// The sample weight: two f32 values, 1.0 and 2.0
pub fn sample_tensor() -> TensorData {
    TensorData::new("f32", vec![2], vec![0, 0, 128, 63, 0, 0, 0, 64])
}

/// The sample program encoded at `version`
///
/// Versions outside the supported range produce a model that does not
/// validate.
pub fn sample_model(version: FormatVersion) -> BytecodeModel {
    let v = version.get();
    let mut model = BytecodeModel::new(version);

    let forward = sample_forward(v);
    if v < 9 {
        model
            .debug_handles
            .insert(forward.name.clone(), forward_side_table(v));
    }
    model.functions.push(forward);
    model.functions.push(sample_helper());

    if v >= 5 {
        model
            .shared_constants
            .insert(SAMPLE_TENSOR_KEY.to_string(), sample_tensor());
    }
    model
}

/// Debug handle of the v9 instruction at `i`; odd instructions have none
fn forward_handle(i: usize) -> Option<i64> {
    if i % 2 == 0 {
        Some(100 + i as i64)
    } else {
        None
    }
}

/// Index of the `OPN aten::sum` call in the v6+ instruction stream
const SUM_CALL: usize = 7;

fn forward_side_table(v: u32) -> Vec<i64> {
    let mut handles: Vec<i64> = (0..19).map(|i| forward_handle(i).unwrap_or(-1)).collect();
    if v < 6 {
        // The materialized default shares the call's handle
        let handle = handles[SUM_CALL];
        handles.insert(SUM_CALL, handle);
    }
    handles
}

fn sample_forward(v: u32) -> Function {
    let mut f = Function::new("forward");
    f.register_size = 3;
    f.types = vec!["Tensor".to_string(), "Tensor".to_string()];

    f.operators.push(Operator::new("aten::add", "Tensor"));
    let sum = Operator::new("aten::sum", "");
    f.operators.push(if v >= 6 {
        sum.with_defaults(1, vec![Constant::None])
    } else {
        sum
    });
    let relu = Operator::new("aten::relu", "out");
    f.operators.push(if v >= 7 { relu.with_out_args(1) } else { relu });
    if v < 8 {
        f.operators.push(Operator::new("prim::Uninitialized", ""));
        f.operators.push(Operator::new("prim::RaiseException", ""));
        f.operators.push(Operator::new("aten::format", ""));
    }

    f.constants.push(if v >= 5 {
        Constant::TensorRef(SAMPLE_TENSOR_KEY.to_string())
    } else {
        Constant::Tensor(sample_tensor())
    });
    f.constants.push(Constant::Str("{}: {}".to_string()));
    if v < 6 {
        f.constants.push(Constant::None);
    }

    let (uninitialized, raise, format) = if v >= 8 {
        (
            Instruction::new(OpCode::Uninitialized, 0, 0),
            Instruction::new(OpCode::RaiseException, 0, 0),
            Instruction::new(OpCode::Format, 0, 2),
        )
    } else {
        (
            Instruction::new(OpCode::Op, 3, 0),
            Instruction::new(OpCode::Op, 4, 0),
            Instruction::new(OpCode::Opn, 5, 2),
        )
    };

    let mut instructions = vec![
        Instruction::new(OpCode::Load, 1, 0),  // 0
        Instruction::new(OpCode::Loadc, 0, 0), // 1
        Instruction::new(OpCode::Op, 0, 0),    // 2  add
        Instruction::new(OpCode::Store, 2, 0), // 3
        Instruction::new(OpCode::Load, 2, 0),  // 4
        Instruction::new(OpCode::Jf, 4, 0),    // 5  -> 9
        Instruction::new(OpCode::Load, 2, 0),  // 6
        Instruction::new(OpCode::Opn, 1, 1),   // 7  sum
        Instruction::new(OpCode::Jmp, 3, 0),   // 8  -> 11
        uninitialized,                         // 9
        raise,                                 // 10
        Instruction::new(OpCode::Loadc, 1, 0), // 11
        Instruction::new(OpCode::Load, 2, 0),  // 12
        format,                                // 13
        Instruction::new(OpCode::Load, 1, 0),  // 14
        Instruction::new(OpCode::Load, 2, 0),  // 15
        Instruction::new(OpCode::Op, 2, 0),    // 16 relu.out
        Instruction::new(OpCode::Tuple, 0, 2), // 17
        Instruction::new(OpCode::Ret, 0, 0),   // 18
    ];

    if v >= 9 {
        for (i, inst) in instructions.iter_mut().enumerate() {
            inst.debug_handle = forward_handle(i);
        }
    }

    if v < 6 {
        // Default of aten::sum pushed explicitly; the jump into the
        // promoted block moves with it
        instructions[SUM_CALL].n = 2;
        instructions.insert(SUM_CALL, Instruction::new(OpCode::Loadc, 2, 0));
        instructions[5].x = 5;
    }

    f.instructions = instructions;
    f
}

fn sample_helper() -> Function {
    let mut f = Function::new("helper");
    f.register_size = 1;
    f.operators.push(Operator::new("aten::mul", "int"));
    f.constants.push(Constant::Int(2));
    f.instructions = vec![
        Instruction::new(OpCode::Load, 0, 0),
        Instruction::new(OpCode::Loadc, 0, 0),
        Instruction::new(OpCode::Op, 0, 0),
        Instruction::new(OpCode::Ret, 0, 0),
    ];
    f
}

/// A v7 model whose operator has out arguments after elided defaults
///
/// No v6 encoding exists for it, so the v7 -> v6 step rejects it.
pub fn out_args_after_defaults_model() -> BytecodeModel {
    let mut f = Function::new("forward");
    f.register_size = 2;
    f.operators.push(
        Operator::new("aten::sum", "IntList_out")
            .with_defaults(2, vec![Constant::Bool(false)])
            .with_out_args(1),
    );
    f.constants.push(Constant::IntList(vec![0]));
    f.instructions = vec![
        Instruction::new(OpCode::Load, 0, 0),
        Instruction::new(OpCode::Loadc, 0, 0),
        Instruction::new(OpCode::Load, 1, 0),
        Instruction::new(OpCode::Opn, 0, 3),
        Instruction::new(OpCode::Ret, 0, 0),
    ];

    let mut model = BytecodeModel::new(FormatVersion::new(7));
    model.functions.push(f);
    model
}

/// Sample auxiliary entries: weights, metadata and source
pub fn sample_aux_entries() -> Vec<(String, Vec<u8>)> {
    vec![
        ("data/0".to_string(), (0u8..=255).cycle().take(4096).collect()),
        (
            "extra/metadata.json".to_string(),
            br#"{"producer":"fixture","format":"mpkg"}"#.to_vec(),
        ),
        (
            "code/forward.py".to_string(),
            b"def forward(self, x):\n    return x + self.weight\n".to_vec(),
        ),
    ]
}

/// Encode `model` and write it with `aux` entries into a package
///
/// Layout: version marker, bytecode records, then `aux` in the given order.
pub fn write_package(model: &BytecodeModel, aux: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    write_package_with(model, &BTreeMap::new(), aux)
}

/// Like [`write_package`], with raw records overriding or adding to the
/// encoded bytecode records
///
/// Useful for building packages that are broken in a specific way.
pub fn write_package_with(
    model: &BytecodeModel,
    overrides: &BTreeMap<String, Vec<u8>>,
    aux: &[(String, Vec<u8>)],
) -> Result<Vec<u8>> {
    let version = model.version;
    let records = encode_model(model)
        .map_err(|e| BackportError::serialization(version, e.to_string()))?;
    let to_err = |e: modelport_archive::ArchiveError| BackportError::serialization(version, e.to_string());

    let mut writer = PackageWriter::new(Vec::new(), DEFAULT_COMPRESSION_LEVEL).map_err(to_err)?;
    writer
        .write_record(VERSION_RECORD, &encode_version_marker(version))
        .map_err(to_err)?;
    for (name, data) in &records {
        let data = overrides.get(*name).unwrap_or(data);
        writer.write_record(name, data).map_err(to_err)?;
    }
    for (name, data) in overrides {
        if !writer.has_record(name) {
            writer.write_record(name, data).map_err(to_err)?;
        }
    }
    for (name, data) in aux {
        writer.write_record(name, data).map_err(to_err)?;
    }
    writer.finalize().map_err(to_err)
}
