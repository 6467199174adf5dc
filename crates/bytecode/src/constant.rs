//! Constant pool values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw tensor payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorData {
    /// Element type name, e.g. `"f32"`
    pub dtype: String,
    /// Dimensions
    pub shape: Vec<i64>,
    /// Little-endian element bytes
    pub data: Vec<u8>,
}

impl TensorData {
    /// Create a tensor payload
    pub fn new(dtype: impl Into<String>, shape: Vec<i64>, data: Vec<u8>) -> Self {
        Self {
            dtype: dtype.into(),
            shape,
            data,
        }
    }
}

/// A constant pool entry
///
/// Tensors are stored inline up to v4. From v5 on they live in the
/// package-wide shared table and functions hold a [`Constant::TensorRef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// The `None` value
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    Str(String),
    /// List of integers
    IntList(Vec<i64>),
    /// Inline tensor (v4 only)
    Tensor(TensorData),
    /// Key into the shared tensor table (v5+)
    TensorRef(String),
}

impl Constant {
    /// Short name of the constant's kind
    pub fn kind(&self) -> &'static str {
        match self {
            Constant::None => "none",
            Constant::Bool(_) => "bool",
            Constant::Int(_) => "int",
            Constant::Double(_) => "double",
            Constant::Str(_) => "str",
            Constant::IntList(_) => "int list",
            Constant::Tensor(_) => "inline tensor",
            Constant::TensorRef(_) => "tensor reference",
        }
    }

    /// Bit-exact equality
    ///
    /// Doubles compare by their bit pattern, so `-0.0` and `0.0` differ and a
    /// NaN equals the same NaN.
    pub fn is_identical(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Double(a), Constant::Double(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => write!(f, "None"),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Double(d) => write!(f, "{}", d),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::IntList(l) => write!(f, "{:?}", l),
            Constant::Tensor(t) => write!(f, "tensor<{}>{:?}", t.dtype, t.shape),
            Constant::TensorRef(key) => write!(f, "@{}", key),
        }
    }
}
