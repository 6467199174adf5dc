//! Backport orchestration
//!
//! A run moves through a fixed sequence of states:
//!
//! ```text
//! Detecting -> Validating -> Transforming(source) -> ... -> Transforming(target+1)
//!           -> Repackaging -> Done
//! ```
//!
//! Any failure moves the run to `Failed`, which is terminal. Nothing is
//! retried: every step is a deterministic function of its input.
//!
//! The run is split in two halves. [`Backporter::prepare`] reads the source
//! and applies every step in memory; [`Backporter::write`] emits the result.
//! No destination is touched until the first half has succeeded.

use crate::config::{BackportConfig, ConfigError};
use crate::detector::{detect_version, open_package};
use crate::registry::StepRegistry;
use crate::repackager::repackage;
use crate::steps::DowngradeStep;
use modelport_archive::{PackageReader, PackageWriter, ReadAdapter};
use modelport_bytecode::{decode_model, BytecodeModel};
use modelport_core::{BackportError, FormatVersion, Result, TargetRejection, MIN_SUPPORTED_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use tracing::{debug, info, warn};

/// State of one backport run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Opening the source and reading its version marker
    Detecting,
    /// Checking the requested target and planning the step chain
    Validating,
    /// Applying the step that consumes this version
    Transforming(FormatVersion),
    /// Writing the output package
    Repackaging,
    /// Output sealed
    Done,
    /// Run aborted
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Detecting => write!(f, "detecting"),
            PipelineState::Validating => write!(f, "validating"),
            PipelineState::Transforming(v) => write!(f, "transforming {}", v),
            PipelineState::Repackaging => write!(f, "repackaging"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug)]
struct Pipeline {
    state: PipelineState,
    target: FormatVersion,
}

impl Pipeline {
    fn start(target: FormatVersion) -> Self {
        info!(target: "modelport::backport", target = %target, "Starting backport");
        Pipeline {
            state: PipelineState::Detecting,
            target,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        if self.state == PipelineState::Failed {
            return;
        }
        debug!(target: "modelport::backport", from = %self.state, to = %next, "Pipeline transition");
        self.state = next;
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(
                target: "modelport::backport",
                state = %self.state,
                target_version = %self.target,
                error = %e,
                "Backport failed"
            );
            self.state = PipelineState::Failed;
        }
        result
    }
}

/// Report of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackportInfo {
    /// Version declared by the source
    pub source_version: FormatVersion,
    /// Version declared by the output
    pub target_version: FormatVersion,
    /// Names of the applied steps, in order
    pub steps_applied: Vec<String>,
    /// Bytecode records written
    pub bytecode_records: Vec<String>,
    /// Entries copied verbatim
    pub passthrough_entries: usize,
    /// Output size in bytes
    pub output_size: u64,
    /// xxh3 checksum of the output, hex
    pub checksum: String,
}

/// A source read and transformed in memory, ready to be written
#[derive(Debug)]
pub struct PreparedBackport {
    source: PackageReader,
    source_version: FormatVersion,
    model: BytecodeModel,
    steps_applied: Vec<&'static str>,
    pipeline: Pipeline,
}

impl PreparedBackport {
    /// Version declared by the source
    pub fn source_version(&self) -> FormatVersion {
        self.source_version
    }

    /// Version the output will declare
    pub fn target_version(&self) -> FormatVersion {
        self.model.version
    }

    /// The transformed model
    pub fn model(&self) -> &BytecodeModel {
        &self.model
    }

    /// Names of the applied steps, in order
    pub fn steps_applied(&self) -> &[&'static str] {
        &self.steps_applied
    }
}

/// Runs backports against a step registry
#[derive(Debug, Clone)]
pub struct Backporter<'r> {
    registry: &'r StepRegistry,
    config: BackportConfig,
}

impl Default for Backporter<'static> {
    fn default() -> Self {
        Backporter {
            registry: StepRegistry::global(),
            config: BackportConfig::default(),
        }
    }
}

impl Backporter<'static> {
    /// Backporter over the builtin registry
    pub fn new(config: BackportConfig) -> std::result::Result<Self, ConfigError> {
        Backporter::with_registry(StepRegistry::global(), config)
    }
}

impl<'r> Backporter<'r> {
    /// Backporter over a custom registry
    pub fn with_registry(
        registry: &'r StepRegistry,
        config: BackportConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Backporter { registry, config })
    }

    /// Active configuration
    pub fn config(&self) -> &BackportConfig {
        &self.config
    }

    /// Registry the steps are taken from
    pub fn registry(&self) -> &'r StepRegistry {
        self.registry
    }

    /// Check a request and plan its step chain
    ///
    /// Checks, in order: the source version is one this build can decode,
    /// the target is not an upgrade, every step down to the target is
    /// registered, and the target is not below the oldest supported version.
    pub fn plan(
        &self,
        source_version: FormatVersion,
        target: FormatVersion,
    ) -> Result<Vec<DowngradeStep>> {
        if !source_version.is_supported() {
            return Err(BackportError::unreadable(format!(
                "package declares unsupported format version {}",
                source_version
            )));
        }
        if target > source_version {
            return Err(BackportError::UnsupportedTarget {
                source_version,
                target,
                reason: TargetRejection::Upgrade,
            });
        }
        let steps = self.registry.plan(source_version, target)?;
        if target < MIN_SUPPORTED_VERSION {
            return Err(BackportError::UnsupportedTarget {
                source_version,
                target,
                reason: TargetRejection::BelowMinimum {
                    minimum: MIN_SUPPORTED_VERSION,
                },
            });
        }
        Ok(steps)
    }

    /// Read `source` and bring its bytecode down to `target` in memory
    pub fn prepare(&self, source: &dyn ReadAdapter, target: FormatVersion) -> Result<PreparedBackport> {
        let mut pipeline = Pipeline::start(target);
        let result = self.prepare_inner(source, target, &mut pipeline);
        let (reader, source_version, model, steps_applied) = pipeline.track(result)?;
        Ok(PreparedBackport {
            source: reader,
            source_version,
            model,
            steps_applied,
            pipeline,
        })
    }

    fn prepare_inner(
        &self,
        source: &dyn ReadAdapter,
        target: FormatVersion,
        pipeline: &mut Pipeline,
    ) -> Result<(PackageReader, FormatVersion, BytecodeModel, Vec<&'static str>)> {
        let reader = open_package(source)?;
        let source_version = detect_version(&reader)?;

        pipeline.advance(PipelineState::Validating);
        let plan = self.plan(source_version, target)?;

        let model = decode_model(source_version, |name| reader.record(name)).map_err(|e| {
            BackportError::unreadable(format!("cannot decode {} bytecode: {}", source_version, e))
        })?;

        let mut applied = Vec::with_capacity(plan.len());
        let model = plan.iter().try_fold(model, |model, step| {
            pipeline.advance(PipelineState::Transforming(step.from));
            applied.push(step.name);
            step.run(model)
        })?;

        Ok((reader, source_version, model, applied))
    }

    /// Write a prepared backport and seal the package
    pub fn write<W: Write>(
        &self,
        prepared: PreparedBackport,
        writer: PackageWriter<W>,
    ) -> Result<(W, BackportInfo)> {
        let PreparedBackport {
            source,
            source_version,
            model,
            steps_applied,
            mut pipeline,
        } = prepared;

        pipeline.advance(PipelineState::Repackaging);
        let result = repackage(&model, &source, writer, &self.config);
        let (finished, summary) = pipeline.track(result)?;
        pipeline.advance(PipelineState::Done);

        let info = BackportInfo {
            source_version,
            target_version: model.version,
            steps_applied: steps_applied.iter().map(|s| s.to_string()).collect(),
            bytecode_records: summary.bytecode_records,
            passthrough_entries: summary.passthrough_entries,
            output_size: finished.size,
            checksum: finished.checksum,
        };
        info!(
            target: "modelport::backport",
            from = %info.source_version,
            to = %info.target_version,
            steps = info.steps_applied.len(),
            size = info.output_size,
            "Backport complete"
        );
        Ok((finished.sink, info))
    }

    /// Backport `source` to `target` into `writer`
    ///
    /// The writer is sealed only on success and its sink returned. On
    /// failure before repackaging nothing is written to it.
    pub fn backport<W: Write>(
        &self,
        source: &dyn ReadAdapter,
        writer: PackageWriter<W>,
        target: FormatVersion,
    ) -> Result<(W, BackportInfo)> {
        let prepared = self.prepare(source, target)?;
        self.write(prepared, writer)
    }
}

/// Apply the registered steps to bring `model` down to `target`
///
/// The in-memory counterpart of a backport run, without any container.
pub fn downgrade(
    model: BytecodeModel,
    target: FormatVersion,
    registry: &StepRegistry,
) -> Result<BytecodeModel> {
    let source_version = model.version;
    if target > source_version {
        return Err(BackportError::UnsupportedTarget {
            source_version,
            target,
            reason: TargetRejection::Upgrade,
        });
    }
    registry
        .plan(source_version, target)?
        .iter()
        .try_fold(model, |model, step| step.run(model))
}
