//! Functions: instructions plus their operator and constant tables

use crate::constant::Constant;
use crate::instruction::Instruction;
use crate::operator::Operator;
use serde::{Deserialize, Serialize};

/// One compiled method of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Qualified method name, unique within a model
    pub name: String,
    /// Instruction stream
    pub instructions: Vec<Instruction>,
    /// Operators referenced by `OP`/`OPN`
    pub operators: Vec<Operator>,
    /// Constants referenced by `LOADC`
    pub constants: Vec<Constant>,
    /// Type annotations, opaque to the backport pipeline
    #[serde(default)]
    pub types: Vec<String>,
    /// Number of registers
    pub register_size: u32,
}

impl Function {
    /// Create an empty function
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            operators: Vec::new(),
            constants: Vec::new(),
            types: Vec::new(),
            register_size: 0,
        }
    }

    /// Index of an identical constant, appending it if absent
    pub fn intern_constant(&mut self, constant: Constant) -> usize {
        if let Some(i) = self.constants.iter().position(|c| c.is_identical(&constant)) {
            return i;
        }
        self.constants.push(constant);
        self.constants.len() - 1
    }

    /// Index of a plain operator entry for `name.overload`, appending it if absent
    ///
    /// Entries carrying argument metadata are not reused.
    pub fn intern_operator(&mut self, name: &str, overload: &str) -> usize {
        if let Some(i) = self
            .operators
            .iter()
            .position(|op| op.is(name, overload) && !op.has_arg_metadata() && op.num_out_args == 0)
        {
            return i;
        }
        self.operators.push(Operator::new(name, overload));
        self.operators.len() - 1
    }

    /// Whether any instruction carries an inline debug handle
    pub fn has_inline_debug_handles(&self) -> bool {
        self.instructions.iter().any(|i| i.debug_handle.is_some())
    }
}
