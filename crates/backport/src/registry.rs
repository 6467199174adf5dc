//! Downgrade step registry
//!
//! Maps an input version `N` to the step that produces version `N - 1`.
//! A registry is immutable once built. The process-wide registry holding the
//! builtin steps is built on first use and only ever read afterwards, so
//! concurrent backports share it without locking.
//!
//! Custom registries (for instance one with a deliberate gap) are assembled
//! with [`StepRegistryBuilder`].

use crate::steps::{builtin_steps, DowngradeStep};
use modelport_core::{BackportError, FormatVersion, Result};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

/// Global registry of the builtin steps
static GLOBAL_REGISTRY: Lazy<StepRegistry> = Lazy::new(StepRegistry::builtin);

/// Errors while assembling a registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two steps share an input version
    #[error("Duplicate downgrade step for {from}: {existing:?} and {new:?}")]
    DuplicateStep {
        /// Input version
        from: FormatVersion,
        /// Name of the registered step
        existing: &'static str,
        /// Name of the rejected step
        new: &'static str,
    },

    /// A step cannot go below version 0
    #[error("Downgrade step {0:?} has no previous version")]
    NoPreviousVersion(&'static str),
}

/// Immutable map from input version to downgrade step
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: FxHashMap<FormatVersion, DowngradeStep>,
}

impl StepRegistry {
    /// Start an empty builder
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// Registry holding every builtin step
    pub fn builtin() -> Self {
        let steps = builtin_steps()
            .into_iter()
            .map(|step| (step.from, step))
            .collect();
        StepRegistry { steps }
    }

    /// The process-wide builtin registry
    pub fn global() -> &'static StepRegistry {
        &GLOBAL_REGISTRY
    }

    /// Step consuming `from`, if registered
    ///
    /// Never fails: unknown and out-of-range versions yield `None`.
    #[inline]
    pub fn step_for(&self, from: FormatVersion) -> Option<&DowngradeStep> {
        self.steps.get(&from)
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no step is registered
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Input versions with a registered step, ascending
    pub fn versions(&self) -> Vec<FormatVersion> {
        let mut versions: Vec<FormatVersion> = self.steps.keys().copied().collect();
        versions.sort();
        versions
    }

    /// Ordered steps leading from `source` down to `target`
    ///
    /// Empty when `target >= source`. Fails with `NoDowngradePath` at the
    /// first (highest) version without a step.
    pub fn plan(&self, source: FormatVersion, target: FormatVersion) -> Result<Vec<DowngradeStep>> {
        source
            .descending_to(target)
            .map(|v| {
                self.step_for(v)
                    .copied()
                    .ok_or(BackportError::NoDowngradePath { from: v })
            })
            .collect()
    }

    /// Every version reachable from `source` by zero or more steps, descending
    pub fn reachable_from(&self, source: FormatVersion) -> Vec<FormatVersion> {
        let mut reachable = vec![source];
        let mut current = source;
        while let Some(step) = self.step_for(current) {
            let next = step.to();
            if next == current {
                break;
            }
            reachable.push(next);
            current = next;
        }
        reachable
    }
}

/// Builder for a [`StepRegistry`]
#[derive(Debug, Default)]
pub struct StepRegistryBuilder {
    steps: FxHashMap<FormatVersion, DowngradeStep>,
}

impl StepRegistryBuilder {
    /// Add one step
    pub fn register(mut self, step: DowngradeStep) -> std::result::Result<Self, RegistryError> {
        if step.from.previous().is_none() {
            return Err(RegistryError::NoPreviousVersion(step.name));
        }
        if let Some(existing) = self.steps.get(&step.from) {
            return Err(RegistryError::DuplicateStep {
                from: step.from,
                existing: existing.name,
                new: step.name,
            });
        }
        debug!(target: "modelport::backport", step = step.name, from = %step.from, "Registered downgrade step");
        self.steps.insert(step.from, step);
        Ok(self)
    }

    /// Add several steps
    pub fn register_all(
        self,
        steps: impl IntoIterator<Item = DowngradeStep>,
    ) -> std::result::Result<Self, RegistryError> {
        steps.into_iter().try_fold(self, |builder, step| builder.register(step))
    }

    /// Finish building
    pub fn build(self) -> StepRegistry {
        StepRegistry { steps: self.steps }
    }
}
