//! Instructions and opcodes
//!
//! An instruction is `(op, x, n)` plus, from v9 on, an inline debug handle.
//! The meaning of `x` depends on the opcode:
//!
//! | Opcode | `x` | `n` |
//! |--------|-----|-----|
//! | `OP` | operator index | unused |
//! | `OPN` | operator index | number of inputs |
//! | `LOADC` | constant index | unused |
//! | `LOAD`, `STORE`, `MOVE` | register | unused |
//! | `JF`, `JMP`, `LOOP` | relative offset from this instruction | unused |
//! | `LIST`, `TUPLE`, `FORMAT` | unused | number of inputs |
//!
//! Opcodes are serialized by name so adding one never renumbers the others.

use modelport_core::{FormatVersion, MIN_SUPPORTED_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcode of a bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpCode {
    /// Call operator `x`
    Op,
    /// Call variadic operator `x` with `n` inputs
    Opn,
    /// Push constant `x`
    Loadc,
    /// Push register `x`
    Load,
    /// Pop into register `x`
    Store,
    /// Push register `x` and clear it
    Move,
    /// Pop a bool; jump by `x` if false
    Jf,
    /// Jump by `x`
    Jmp,
    /// Loop back-edge; jump by `x`
    Loop,
    /// Return top of stack
    Ret,
    /// Build a list of `n` values
    List,
    /// Build a tuple of `n` values
    Tuple,
    /// Index into a tuple (v8+)
    TupleIndex,
    /// Raise the exception on top of the stack (v8+)
    RaiseException,
    /// Push an uninitialized placeholder (v8+)
    Uninitialized,
    /// Format `n` values into a string (v8+)
    Format,
}

impl OpCode {
    /// First format version that can encode this opcode
    pub fn introduced_in(self) -> FormatVersion {
        match self {
            OpCode::TupleIndex | OpCode::RaiseException | OpCode::Uninitialized | OpCode::Format => {
                FormatVersion::new(8)
            }
            _ => MIN_SUPPORTED_VERSION,
        }
    }

    /// Whether `x` is a relative jump offset
    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jf | OpCode::Jmp | OpCode::Loop)
    }

    /// Whether `x` indexes the operator table
    pub fn calls_operator(self) -> bool {
        matches!(self, OpCode::Op | OpCode::Opn)
    }

    /// Whether `x` is a register
    pub fn uses_register(self) -> bool {
        matches!(self, OpCode::Load | OpCode::Store | OpCode::Move)
    }

    /// Whether `n` is an input count
    pub fn is_variadic(self) -> bool {
        matches!(
            self,
            OpCode::Opn | OpCode::List | OpCode::Tuple | OpCode::Format
        )
    }

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Op => "OP",
            OpCode::Opn => "OPN",
            OpCode::Loadc => "LOADC",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Move => "MOVE",
            OpCode::Jf => "JF",
            OpCode::Jmp => "JMP",
            OpCode::Loop => "LOOP",
            OpCode::Ret => "RET",
            OpCode::List => "LIST",
            OpCode::Tuple => "TUPLE",
            OpCode::TupleIndex => "TUPLE_INDEX",
            OpCode::RaiseException => "RAISE_EXCEPTION",
            OpCode::Uninitialized => "UNINITIALIZED",
            OpCode::Format => "FORMAT",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Opcode
    pub op: OpCode,
    /// First operand
    pub x: i32,
    /// Second operand
    pub n: i32,
    /// Source-location handle, stored inline from v9 on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_handle: Option<i64>,
}

impl Instruction {
    /// Create an instruction without a debug handle
    pub const fn new(op: OpCode, x: i32, n: i32) -> Self {
        Self {
            op,
            x,
            n,
            debug_handle: None,
        }
    }

    /// Attach an inline debug handle
    pub fn with_debug_handle(mut self, handle: i64) -> Self {
        self.debug_handle = Some(handle);
        self
    }

    /// Absolute jump target for a jump at `index`, if this is a jump
    pub fn jump_target(&self, index: usize) -> Option<i64> {
        if self.op.is_jump() {
            Some(index as i64 + i64::from(self.x))
        } else {
            None
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.op, self.x, self.n)
    }
}
