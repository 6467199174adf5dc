//! Downgrade steps
//!
//! Each step rewrites a model at version `N` into an equivalent model at
//! `N - 1`. Steps are plain functions: they own their input, touch nothing
//! else, and only know about their own version pair.
//!
//! | Step | Change |
//! |------|--------|
//! | v9 -> v8 | inline debug handles move to the side table |
//! | v8 -> v7 | promoted instructions become operator calls |
//! | v7 -> v6 | out-argument counts are dropped |
//! | v6 -> v5 | elided defaults are materialized as `LOADC` |
//! | v5 -> v4 | shared tensors are inlined into each function |

mod relocate;
pub mod v5_to_v4;
pub mod v6_to_v5;
pub mod v7_to_v6;
pub mod v8_to_v7;
pub mod v9_to_v8;

use modelport_bytecode::BytecodeModel;
use modelport_core::{BackportError, FormatVersion, Result};
use std::fmt;
use tracing::debug;

/// Function signature for a downgrade step
///
/// Takes a model at the step's input version and returns the equivalent
/// model at the version below, or a `StepFailure` when the input uses a
/// construct the lower version cannot express.
pub type StepFn = fn(BytecodeModel) -> Result<BytecodeModel>;

/// Registry entry for one `from -> from - 1` transformation
#[derive(Clone, Copy)]
pub struct DowngradeStep {
    /// Input version
    pub from: FormatVersion,
    /// Human-readable name for logging
    pub name: &'static str,
    /// Transformation to call
    pub apply: StepFn,
}

impl DowngradeStep {
    /// Create a new step
    pub const fn new(from: FormatVersion, name: &'static str, apply: StepFn) -> Self {
        Self { from, name, apply }
    }

    /// Output version
    pub fn to(&self) -> FormatVersion {
        self.from.previous().unwrap_or(self.from)
    }

    /// Apply the step to a model
    ///
    /// The input must be a valid model at exactly `from`; anything else is
    /// reported as a failure of this step.
    pub fn run(&self, model: BytecodeModel) -> Result<BytecodeModel> {
        if model.version != self.from {
            return Err(BackportError::step_failure(
                self.from,
                format!("expected a {} model, got {}", self.from, model.version),
            ));
        }
        model.validate().map_err(|e| {
            BackportError::step_failure(self.from, format!("invalid input model: {}", e))
        })?;

        debug!(target: "modelport::backport", step = self.name, from = %self.from, to = %self.to(), "Applying downgrade step");
        let output = (self.apply)(model)?;

        if output.version != self.to() {
            return Err(BackportError::step_failure(
                self.from,
                format!("step produced a {} model", output.version),
            ));
        }
        Ok(output)
    }
}

impl fmt::Debug for DowngradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DowngradeStep")
            .field("from", &self.from)
            .field("name", &self.name)
            .finish()
    }
}

/// The fixed table of steps shipped with this build, newest first
pub fn builtin_steps() -> Vec<DowngradeStep> {
    vec![
        v9_to_v8::STEP,
        v8_to_v7::STEP,
        v7_to_v6::STEP,
        v6_to_v5::STEP,
        v5_to_v4::STEP,
    ]
}
