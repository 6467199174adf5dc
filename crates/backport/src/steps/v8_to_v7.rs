//! v8 -> v7: promoted instructions back to operator calls
//!
//! v8 gave four common operators dedicated opcodes. Before that they were
//! ordinary operator calls, so each is rewritten to `OP` (or `OPN` for the
//! variadic `FORMAT`) against an operator table entry, added on first use.

use super::DowngradeStep;
use modelport_bytecode::{BytecodeModel, Instruction, OpCode};
use modelport_core::{BackportError, FormatVersion, Result};

/// Registry entry
pub const STEP: DowngradeStep = DowngradeStep::new(
    FormatVersion::new(8),
    "promoted instructions to operator calls",
    downgrade,
);

/// Operator each promoted opcode stands for
pub fn operator_for(op: OpCode) -> Option<&'static str> {
    match op {
        OpCode::TupleIndex => Some("prim::TupleIndex"),
        OpCode::RaiseException => Some("prim::RaiseException"),
        OpCode::Uninitialized => Some("prim::Uninitialized"),
        OpCode::Format => Some("aten::format"),
        _ => None,
    }
}

/// Apply the step
pub fn downgrade(mut model: BytecodeModel) -> Result<BytecodeModel> {
    let from = STEP.from;
    for function in &mut model.functions {
        for i in 0..function.instructions.len() {
            let inst = function.instructions[i];
            let name = match operator_for(inst.op) {
                Some(name) => name,
                None => continue,
            };

            let index = function.intern_operator(name, "");
            let x = i32::try_from(index).map_err(|_| {
                BackportError::step_failure(
                    from,
                    format!("operator table of {} is too large", function.name),
                )
            })?;

            let (op, n) = if inst.op == OpCode::Format {
                (OpCode::Opn, inst.n)
            } else {
                (OpCode::Op, 0)
            };
            function.instructions[i] = Instruction {
                op,
                x,
                n,
                debug_handle: inst.debug_handle,
            };
        }
    }

    model.version = STEP.to();
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelport_bytecode::{Function, Operator};

    fn model_with(instructions: Vec<Instruction>) -> BytecodeModel {
        let mut f = Function::new("forward");
        f.register_size = 2;
        f.operators.push(Operator::new("aten::add", "int"));
        f.instructions = instructions;
        let mut model = BytecodeModel::new(FormatVersion::new(8));
        model.functions.push(f);
        model
    }

    #[test]
    fn test_promoted_opcodes_rewritten() {
        let model = model_with(vec![
            Instruction::new(OpCode::Uninitialized, 0, 0),
            Instruction::new(OpCode::Load, 0, 0),
            Instruction::new(OpCode::Load, 1, 0),
            Instruction::new(OpCode::Format, 0, 2),
            Instruction::new(OpCode::TupleIndex, 0, 0),
            Instruction::new(OpCode::RaiseException, 0, 0),
        ]);
        let out = STEP.run(model).unwrap();
        out.validate().unwrap();

        let f = &out.functions[0];
        let names: Vec<String> = f.operators.iter().map(|op| op.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "aten::add.int",
                "prim::Uninitialized",
                "aten::format",
                "prim::TupleIndex",
                "prim::RaiseException",
            ]
        );
        assert_eq!(f.instructions[0], Instruction::new(OpCode::Op, 1, 0));
        assert_eq!(f.instructions[3], Instruction::new(OpCode::Opn, 2, 2));
        assert_eq!(f.instructions[4], Instruction::new(OpCode::Op, 3, 0));
        assert_eq!(f.instructions[5], Instruction::new(OpCode::Op, 4, 0));
    }

    #[test]
    fn test_operator_entry_reused() {
        let model = model_with(vec![
            Instruction::new(OpCode::Uninitialized, 0, 0),
            Instruction::new(OpCode::Uninitialized, 0, 0),
        ]);
        let out = STEP.run(model).unwrap();
        let f = &out.functions[0];
        assert_eq!(f.operators.len(), 2);
        assert_eq!(f.instructions[0], f.instructions[1]);
    }

    #[test]
    fn test_existing_operator_entry_used() {
        let mut model = model_with(vec![Instruction::new(OpCode::TupleIndex, 0, 0)]);
        model.functions[0]
            .operators
            .push(Operator::new("prim::TupleIndex", ""));

        let out = STEP.run(model).unwrap();
        assert_eq!(out.functions[0].operators.len(), 2);
        assert_eq!(out.functions[0].instructions[0].x, 1);
    }
}
