//! Instruction insertion with jump relocation
//!
//! Inserting instructions shifts everything after the insertion point, so
//! every relative jump across it must be rewritten. A jump that targeted an
//! instruction with a prefix now lands on the first instruction of the prefix.

use modelport_bytecode::Instruction;
use modelport_core::{BackportError, FormatVersion, Result};

/// A rewritten instruction stream
#[derive(Debug)]
pub(crate) struct Relocated {
    /// New instruction stream
    pub instructions: Vec<Instruction>,
    /// For each new instruction, the index of the original it came from
    pub origin: Vec<usize>,
}

/// Rebuild `instructions` with `prefix(i, inst)` inserted before each one
pub(crate) fn insert_before<F>(
    step: FormatVersion,
    function: &str,
    instructions: &[Instruction],
    mut prefix: F,
) -> Result<Relocated>
where
    F: FnMut(usize, &Instruction) -> Result<Vec<Instruction>>,
{
    let len = instructions.len();
    let mut out = Vec::with_capacity(len);
    let mut origin = Vec::with_capacity(len);
    // block_start[i]: first new index of original i's block, len entry is the end
    let mut block_start = Vec::with_capacity(len + 1);
    let mut placed = Vec::with_capacity(len);

    for (i, inst) in instructions.iter().enumerate() {
        block_start.push(out.len());
        for extra in prefix(i, inst)? {
            out.push(extra);
            origin.push(i);
        }
        placed.push(out.len());
        out.push(*inst);
        origin.push(i);
    }
    block_start.push(out.len());

    for (i, inst) in instructions.iter().enumerate() {
        let target = match inst.jump_target(i) {
            Some(target) => target,
            None => continue,
        };
        if target < 0 || target > len as i64 {
            return Err(BackportError::step_failure(
                step,
                format!("jump at {}[{}] leaves the function", function, i),
            ));
        }
        let offset = block_start[target as usize] as i64 - placed[i] as i64;
        out[placed[i]].x = i32::try_from(offset).map_err(|_| {
            BackportError::step_failure(
                step,
                format!("relocated jump at {}[{}] does not fit an operand", function, i),
            )
        })?;
    }

    Ok(Relocated {
        instructions: out,
        origin,
    })
}
