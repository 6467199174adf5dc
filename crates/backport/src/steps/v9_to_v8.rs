//! v9 -> v8: debug handles back into the side table
//!
//! v8 keeps debug handles in a per-function table with one entry per
//! instruction. Functions without any handle get no table; a function with
//! some handles gets `-1` for the instructions that lack one.

use super::DowngradeStep;
use modelport_bytecode::BytecodeModel;
use modelport_core::{FormatVersion, Result};

/// Registry entry
pub const STEP: DowngradeStep = DowngradeStep::new(
    FormatVersion::new(9),
    "debug handles to side table",
    downgrade,
);

/// Handle recorded for instructions without one
pub const UNKNOWN_HANDLE: i64 = -1;

/// Apply the step
pub fn downgrade(mut model: BytecodeModel) -> Result<BytecodeModel> {
    for function in &mut model.functions {
        if !function.has_inline_debug_handles() {
            continue;
        }
        let handles: Vec<i64> = function
            .instructions
            .iter_mut()
            .map(|inst| inst.debug_handle.take().unwrap_or(UNKNOWN_HANDLE))
            .collect();
        model.debug_handles.insert(function.name.clone(), handles);
    }

    model.version = STEP.to();
    Ok(model)
}
