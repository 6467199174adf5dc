//! v7 -> v6: drop out-argument counts
//!
//! v6 call sites already push out arguments as ordinary arguments, so the
//! count is metadata only. The exception is an operator that also elides
//! defaults: in v7 the out arguments follow the defaults, while a v6 runtime
//! appends defaults after everything the call site pushed. That operator has
//! no v6 encoding.

use super::DowngradeStep;
use modelport_bytecode::BytecodeModel;
use modelport_core::{BackportError, FormatVersion, Result};

/// Registry entry
pub const STEP: DowngradeStep =
    DowngradeStep::new(FormatVersion::new(7), "drop out-argument counts", downgrade);

/// Apply the step
pub fn downgrade(mut model: BytecodeModel) -> Result<BytecodeModel> {
    for function in &mut model.functions {
        for op in &mut function.operators {
            if op.num_out_args == 0 {
                continue;
            }
            if !op.default_args.is_empty() {
                return Err(BackportError::step_failure(
                    STEP.from,
                    format!(
                        "operator {} in {} has {} out argument(s) after {} elided default(s)",
                        op,
                        function.name,
                        op.num_out_args,
                        op.default_args.len()
                    ),
                ));
            }
            op.num_out_args = 0;
        }
    }

    model.version = STEP.to();
    Ok(model)
}
