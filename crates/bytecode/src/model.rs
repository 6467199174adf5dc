//! The in-memory bytecode model for one format version
//!
//! A [`BytecodeModel`] holds everything the bytecode records of a package
//! describe. Which fields may be populated depends on `version`;
//! [`BytecodeModel::validate`] enforces that, so a valid model always has an
//! encoding at its version.

use crate::constant::{Constant, TensorData};
use crate::error::ModelError;
use crate::function::Function;
use crate::instruction::OpCode;
use modelport_core::FormatVersion;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// First version with the shared tensor table
pub const SHARED_CONSTANTS_VERSION: FormatVersion = FormatVersion::new(5);
/// First version with operator argument metadata
pub const ARG_METADATA_VERSION: FormatVersion = FormatVersion::new(6);
/// First version with out-argument counts
pub const OUT_ARGS_VERSION: FormatVersion = FormatVersion::new(7);
/// First version with inline debug handles (and without the side table)
pub const INLINE_DEBUG_VERSION: FormatVersion = FormatVersion::new(9);

/// Parsed bytecode records of a package
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeModel {
    /// Format version the model conforms to
    pub version: FormatVersion,
    /// Functions in stored order
    pub functions: Vec<Function>,
    /// Shared tensor table (v5+)
    pub shared_constants: BTreeMap<String, TensorData>,
    /// Per-function debug handle side table (up to v8)
    pub debug_handles: BTreeMap<String, Vec<i64>>,
}

impl BytecodeModel {
    /// Create an empty model
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            functions: Vec::new(),
            shared_constants: BTreeMap::new(),
            debug_handles: BTreeMap::new(),
        }
    }

    /// Look up a function by name
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Distinct operator names across all functions
    pub fn operator_names(&self) -> BTreeSet<String> {
        self.functions
            .iter()
            .flat_map(|f| f.operators.iter().map(|op| op.to_string()))
            .collect()
    }

    /// Total instruction count
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.instructions.len()).sum()
    }

    /// Check that the model is encodable at its version
    pub fn validate(&self) -> Result<(), ModelError> {
        let v = self.version;
        if !v.is_supported() {
            return Err(ModelError::UnsupportedVersion(v));
        }

        if v < SHARED_CONSTANTS_VERSION && !self.shared_constants.is_empty() {
            return Err(ModelError::unrepresentable("shared constant table", v));
        }
        if v >= INLINE_DEBUG_VERSION && !self.debug_handles.is_empty() {
            return Err(ModelError::unrepresentable("debug handle side table", v));
        }

        let mut names = HashSet::new();
        for function in &self.functions {
            if !names.insert(function.name.as_str()) {
                return Err(ModelError::malformed(format!(
                    "duplicate function {:?}",
                    function.name
                )));
            }
            self.validate_function(function)?;
        }

        for (name, handles) in &self.debug_handles {
            let function = self.function(name).ok_or_else(|| {
                ModelError::malformed(format!("debug handles for unknown function {:?}", name))
            })?;
            if handles.len() != function.instructions.len() {
                return Err(ModelError::malformed(format!(
                    "{} debug handles for {} instructions in {:?}",
                    handles.len(),
                    function.instructions.len(),
                    name
                )));
            }
        }

        Ok(())
    }

    fn validate_function(&self, function: &Function) -> Result<(), ModelError> {
        let v = self.version;
        let name = &function.name;

        for (i, op) in function.operators.iter().enumerate() {
            if v < ARG_METADATA_VERSION && op.has_arg_metadata() {
                return Err(ModelError::unrepresentable(
                    format!("argument metadata on operator {} in {}", op, name),
                    v,
                ));
            }
            if v < OUT_ARGS_VERSION && op.num_out_args > 0 {
                return Err(ModelError::unrepresentable(
                    format!("out arguments on operator {} in {}", op, name),
                    v,
                ));
            }
            if !op.default_args.is_empty() && op.num_specified_args.is_none() {
                return Err(ModelError::malformed(format!(
                    "operator {} in {} has defaults but no specified argument count",
                    i, name
                )));
            }
            for constant in &op.default_args {
                self.validate_constant(constant, &format!("default of {} in {}", op, name))?;
            }
        }

        for (i, constant) in function.constants.iter().enumerate() {
            self.validate_constant(constant, &format!("{}.constants[{}]", name, i))?;
        }

        let len = function.instructions.len();
        for (i, inst) in function.instructions.iter().enumerate() {
            let at = || format!("{}[{}]", name, i);

            if inst.op.introduced_in() > v {
                return Err(ModelError::unrepresentable(
                    format!("opcode {} in {}", inst.op, at()),
                    v,
                ));
            }
            if v < INLINE_DEBUG_VERSION && inst.debug_handle.is_some() {
                return Err(ModelError::unrepresentable(
                    format!("inline debug handle in {}", at()),
                    v,
                ));
            }

            let in_range = |idx: i32, bound: usize| idx >= 0 && (idx as usize) < bound;
            if inst.op.calls_operator() && !in_range(inst.x, function.operators.len()) {
                return Err(ModelError::malformed(format!(
                    "operator index {} out of range in {}",
                    inst.x,
                    at()
                )));
            }
            if inst.op == OpCode::Loadc && !in_range(inst.x, function.constants.len()) {
                return Err(ModelError::malformed(format!(
                    "constant index {} out of range in {}",
                    inst.x,
                    at()
                )));
            }
            if inst.op.uses_register() && !in_range(inst.x, function.register_size as usize) {
                return Err(ModelError::malformed(format!(
                    "register {} out of range in {}",
                    inst.x,
                    at()
                )));
            }
            if inst.op.is_variadic() && inst.n < 0 {
                return Err(ModelError::malformed(format!(
                    "negative input count {} in {}",
                    inst.n,
                    at()
                )));
            }
            if let Some(target) = inst.jump_target(i) {
                if target < 0 || target > len as i64 {
                    return Err(ModelError::malformed(format!(
                        "jump to {} leaves function in {}",
                        target,
                        at()
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_constant(&self, constant: &Constant, at: &str) -> Result<(), ModelError> {
        let v = self.version;
        match constant {
            Constant::Tensor(_) if v >= SHARED_CONSTANTS_VERSION => Err(
                ModelError::unrepresentable(format!("inline tensor in {}", at), v),
            ),
            Constant::TensorRef(_) if v < SHARED_CONSTANTS_VERSION => Err(
                ModelError::unrepresentable(format!("tensor reference in {}", at), v),
            ),
            Constant::TensorRef(key) if !self.shared_constants.contains_key(key) => Err(
                ModelError::malformed(format!("unknown tensor key {:?} in {}", key, at)),
            ),
            _ => Ok(()),
        }
    }
}
