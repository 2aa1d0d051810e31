use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use gsw_core::errors::{ErrorInfo, GswError};
use gsw_core::CancelToken;
use gsw_work::Workspace;
use serde::{Deserialize, Serialize};

use crate::command::{CommandSpec, Vars};
use crate::exec::{invoke, Invocation, InterruptMode, OutputMode};
use crate::result::{PipelineRun, SlotOutcome, StageResult, StageStatus};

/// Name recorded for the generator invocation.
pub const GENERATOR_STAGE: &str = "generator";

/// One analysis step run inside every sub-slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Stage name; also names captured log files.
    pub name: String,
    /// Program run with the slot directory as cwd.
    pub command: CommandSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Kill the stage after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl StageSpec {
    /// Stage without a timeout.
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            timeout_secs: None,
        }
    }

    /// Sets the wall-clock limit.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Generator plus ordered stage list shared by every job of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Program run once per job with the job directory as cwd.
    pub generator: CommandSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Kill the generator after this many seconds.
    pub generator_timeout_secs: Option<u64>,
    /// Stages in execution order.
    pub stages: Vec<StageSpec>,
}

impl PipelineSpec {
    /// Rejects empty programs and duplicate or unusable stage names.
    pub fn validate(&self) -> Result<(), GswError> {
        if self.generator.program.trim().is_empty() {
            return Err(GswError::config(
                "gsw_pipe.generator_program",
                "generator program must not be empty",
            ));
        }
        let mut seen = HashSet::new();
        for stage in &self.stages {
            let bad_name = stage.name.is_empty()
                || stage.name == GENERATOR_STAGE
                || stage.name.contains(['/', '\\']);
            if bad_name {
                return Err(GswError::Configuration(
                    ErrorInfo::new("gsw_pipe.stage_name", "invalid stage name")
                        .with_context("stage", stage.name.clone()),
                ));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(GswError::Configuration(
                    ErrorInfo::new("gsw_pipe.duplicate_stage", "two stages share a name")
                        .with_context("stage", stage.name.clone()),
                ));
            }
            if stage.command.program.trim().is_empty() {
                return Err(GswError::Configuration(
                    ErrorInfo::new("gsw_pipe.stage_program", "stage program must not be empty")
                        .with_context("stage", stage.name.clone()),
                ));
            }
        }
        Ok(())
    }

    /// Anchors path-like programs at the directory holding the plan.
    pub fn resolve_against(&self, base: &Path) -> Self {
        Self {
            generator: self.generator.resolve_against(base),
            generator_timeout_secs: self.generator_timeout_secs,
            stages: self
                .stages
                .iter()
                .map(|stage| StageSpec {
                    command: stage.command.resolve_against(base),
                    ..stage.clone()
                })
                .collect(),
        }
    }
}

/// Options applied to every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunnerOpts {
    /// Where child stdout/stderr go.
    pub output: OutputMode,
    /// Whether running children are killed on interrupt.
    pub on_interrupt: InterruptMode,
}

/// Runs the generator and then every stage of every sub-slot of a job.
///
/// A failing stage never aborts later stages or slots. A failing generator
/// short-circuits the job and every stage is recorded as skipped.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    spec: PipelineSpec,
    opts: RunnerOpts,
    cancel: CancelToken,
}

impl PipelineRunner {
    /// Validates `spec` and binds it to the campaign's cancel token.
    pub fn new(spec: PipelineSpec, opts: RunnerOpts, cancel: CancelToken) -> Result<Self, GswError> {
        spec.validate()?;
        Ok(Self { spec, opts, cancel })
    }

    /// The validated pipeline.
    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// Runs the generator, then every stage of every slot of `ws`.
    pub fn run(&self, ws: &Workspace) -> PipelineRun {
        let job = ws.id.as_str();
        let generator = invoke(
            &Invocation {
                command: &self.spec.generator,
                cwd: &ws.dir,
                vars: Vars {
                    job,
                    slot: None,
                    stage: GENERATOR_STAGE,
                },
                timeout: self.spec.generator_timeout_secs.map(Duration::from_secs),
            },
            self.opts.output,
            self.opts.on_interrupt,
            &self.cancel,
        );
        if !generator.succeeded() {
            tracing::warn!(
                job,
                status = ?generator.status,
                error = generator.error.as_deref().unwrap_or(""),
                "generator failed, skipping stages"
            );
            return PipelineRun {
                generator,
                slots: self.all_skipped(ws),
            };
        }

        let mut slots = Vec::with_capacity(ws.slots.len());
        for (slot, slot_dir) in &ws.slots {
            let mut stages = Vec::with_capacity(self.spec.stages.len());
            for stage in &self.spec.stages {
                if self.should_stop() {
                    stages.push(StageResult::skipped(&stage.name));
                    continue;
                }
                let result = invoke(
                    &Invocation {
                        command: &stage.command,
                        cwd: slot_dir,
                        vars: Vars {
                            job,
                            slot: Some(slot.as_str()),
                            stage: &stage.name,
                        },
                        timeout: stage.timeout_secs.map(Duration::from_secs),
                    },
                    self.opts.output,
                    self.opts.on_interrupt,
                    &self.cancel,
                );
                if result.status != StageStatus::Succeeded {
                    tracing::warn!(
                        job,
                        slot = %slot,
                        stage = %stage.name,
                        status = ?result.status,
                        exit_code = ?result.exit_code,
                        "stage failed"
                    );
                }
                stages.push(result);
            }
            slots.push(SlotOutcome {
                slot: slot.clone(),
                stages,
            });
        }
        PipelineRun { generator, slots }
    }

    fn should_stop(&self) -> bool {
        self.opts.on_interrupt == InterruptMode::Kill && self.cancel.is_cancelled()
    }

    fn all_skipped(&self, ws: &Workspace) -> Vec<SlotOutcome> {
        ws.slots
            .iter()
            .map(|(slot, _)| SlotOutcome {
                slot: slot.clone(),
                stages: self
                    .spec
                    .stages
                    .iter()
                    .map(|stage| StageResult::skipped(&stage.name))
                    .collect(),
            })
            .collect()
    }
}
