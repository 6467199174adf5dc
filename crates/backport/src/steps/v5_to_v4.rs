//! v5 -> v4: inline shared tensors
//!
//! v4 has no shared constant table; every tensor lives in the constant pool
//! of the function that uses it. Each `TensorRef` is replaced with a copy of
//! the tensor it names and the table is dropped.

use super::DowngradeStep;
use modelport_bytecode::{BytecodeModel, Constant};
use modelport_core::{BackportError, FormatVersion, Result};

/// Registry entry
pub const STEP: DowngradeStep =
    DowngradeStep::new(FormatVersion::new(5), "inline shared tensors", downgrade);

/// Apply the step
pub fn downgrade(mut model: BytecodeModel) -> Result<BytecodeModel> {
    let table = std::mem::take(&mut model.shared_constants);

    for function in &mut model.functions {
        for (i, constant) in function.constants.iter_mut().enumerate() {
            let key = match &*constant {
                Constant::TensorRef(key) => key,
                _ => continue,
            };
            let tensor = table.get(key.as_str()).ok_or_else(|| {
                BackportError::step_failure(
                    STEP.from,
                    format!(
                        "{}.constants[{}] refers to missing tensor {:?}",
                        function.name, i, key
                    ),
                )
            })?;
            *constant = Constant::Tensor(tensor.clone());
        }
    }

    model.version = STEP.to();
    Ok(model)
}
