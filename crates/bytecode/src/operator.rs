//! Operator table entries

use crate::constant::Constant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An operator referenced by `OP`/`OPN` instructions
///
/// v6 added `num_specified_args` and `default_args`: the call site pushes only
/// the specified arguments and the runtime appends the elided defaults. v7
/// added `num_out_args`, the number of trailing out arguments, which come
/// after the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// Qualified name, e.g. `aten::add`
    pub name: String,
    /// Overload name, possibly empty
    pub overload: String,
    /// Arguments pushed by the call site (v6+)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_specified_args: Option<u32>,
    /// Defaults for the elided trailing arguments (v6+)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_args: Vec<Constant>,
    /// Trailing out arguments (v7+)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub num_out_args: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Operator {
    /// Create a plain operator entry
    pub fn new(name: impl Into<String>, overload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overload: overload.into(),
            num_specified_args: None,
            default_args: Vec::new(),
            num_out_args: 0,
        }
    }

    /// Record elided defaults after `specified` call-site arguments
    pub fn with_defaults(mut self, specified: u32, defaults: Vec<Constant>) -> Self {
        self.num_specified_args = Some(specified);
        self.default_args = defaults;
        self
    }

    /// Record trailing out arguments
    pub fn with_out_args(mut self, count: u32) -> Self {
        self.num_out_args = count;
        self
    }

    /// Whether the entry uses any v6 argument metadata
    pub fn has_arg_metadata(&self) -> bool {
        self.num_specified_args.is_some() || !self.default_args.is_empty()
    }

    /// Whether this entry names `name.overload`
    pub fn is(&self, name: &str, overload: &str) -> bool {
        self.name == name && self.overload == overload
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.overload.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.name, self.overload)
        }
    }
}
