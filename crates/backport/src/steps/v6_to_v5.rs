//! v6 -> v5: materialize elided default arguments
//!
//! A v5 runtime expects every argument on the stack. For each call to an
//! operator with elided defaults, one `LOADC` per default is inserted right
//! before the call and `OPN` input counts grow to match. Relative jumps are
//! relocated; a jump to a call now lands on its first inserted `LOADC`.

use super::relocate::insert_before;
use super::v9_to_v8::UNKNOWN_HANDLE;
use super::DowngradeStep;
use modelport_bytecode::{BytecodeModel, Instruction, OpCode};
use modelport_core::{BackportError, FormatVersion, Result};

/// Registry entry
pub const STEP: DowngradeStep =
    DowngradeStep::new(FormatVersion::new(6), "materialize default arguments", downgrade);

/// Apply the step
pub fn downgrade(mut model: BytecodeModel) -> Result<BytecodeModel> {
    let from = STEP.from;
    for function in &mut model.functions {
        // LOADC prefix per operator index
        let mut loads: Vec<Vec<Instruction>> = Vec::with_capacity(function.operators.len());
        for i in 0..function.operators.len() {
            let defaults = std::mem::take(&mut function.operators[i].default_args);
            let mut prefix = Vec::with_capacity(defaults.len());
            for constant in defaults {
                let index = function.intern_constant(constant);
                let x = i32::try_from(index).map_err(|_| {
                    BackportError::step_failure(
                        from,
                        format!("constant table of {} is too large", function.name),
                    )
                })?;
                prefix.push(Instruction::new(OpCode::Loadc, x, 0));
            }
            function.operators[i].num_specified_args = None;
            loads.push(prefix);
        }

        if loads.iter().all(Vec::is_empty) {
            continue;
        }

        let name = function.name.clone();
        let relocated = insert_before(from, &name, &function.instructions, |i, inst| {
            if !inst.op.calls_operator() {
                return Ok(Vec::new());
            }
            usize::try_from(inst.x)
                .ok()
                .and_then(|x| loads.get(x))
                .cloned()
                .ok_or_else(|| {
                    BackportError::step_failure(
                        from,
                        format!("unknown operator {} at {}[{}]", inst.x, name, i),
                    )
                })
        })?;

        let mut instructions = relocated.instructions;
        for inst in instructions.iter_mut().filter(|i| i.op == OpCode::Opn) {
            // Operator index was checked by the prefix lookup
            let added = loads[inst.x as usize].len() as i32;
            inst.n = inst.n.checked_add(added).ok_or_else(|| {
                BackportError::step_failure(from, format!("input count overflow in {}", name))
            })?;
        }
        function.instructions = instructions;

        if let Some(handles) = model.debug_handles.get_mut(&name) {
            *handles = relocated
                .origin
                .iter()
                .map(|&o| handles.get(o).copied().unwrap_or(UNKNOWN_HANDLE))
                .collect();
        }
    }

    model.version = STEP.to();
    Ok(model)
}
