use serde::{Deserialize, Serialize};

/// Terminal status of one external invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    /// Exited with status zero.
    Succeeded,
    /// Non-zero exit or termination by signal.
    Failed,
    /// Killed after exceeding its wall-clock timeout.
    TimedOut,
    /// Killed because the campaign was interrupted.
    Interrupted,
    /// The program could not be started at all.
    SpawnFailed,
    /// Never started: generator failed or the job was interrupted first.
    Skipped,
}

/// Outcome of one generator or stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name, or `generator`.
    pub stage: String,
    /// How the invocation ended.
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Exit code when the process exited normally.
    pub exit_code: Option<i32>,
    /// Wall-clock time in milliseconds.
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Diagnostic for anything but success.
    pub error: Option<String>,
}

impl StageResult {
    /// Result for a stage that never started.
    pub fn skipped(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Skipped,
            exit_code: None,
            duration_ms: 0,
            error: None,
        }
    }

    /// True only for [`StageStatus::Succeeded`].
    pub fn succeeded(&self) -> bool {
        self.status == StageStatus::Succeeded
    }
}

/// Stage results of one sub-slot, in declared stage order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOutcome {
    /// Sub-slot name.
    pub slot: String,
    /// One result per declared stage.
    pub stages: Vec<StageResult>,
}

/// Everything the runner observed for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Result of the generator run in the job directory.
    pub generator: StageResult,
    /// Per-slot stage results in slot order.
    pub slots: Vec<SlotOutcome>,
}

impl PipelineRun {
    /// True iff the generator and every stage of every slot succeeded.
    pub fn succeeded(&self) -> bool {
        self.generator.succeeded()
            && self
                .slots
                .iter()
                .all(|slot| slot.stages.iter().all(StageResult::succeeded))
    }

    /// Names of unsuccessful invocations as `generator` or `<slot>/<stage>`.
    pub fn failed_stages(&self) -> Vec<String> {
        if !self.generator.succeeded() {
            return vec![self.generator.stage.clone()];
        }
        self.slots
            .iter()
            .flat_map(|slot| {
                slot.stages
                    .iter()
                    .filter(|stage| !stage.succeeded())
                    .map(move |stage| format!("{}/{}", slot.slot, stage.stage))
            })
            .collect()
    }
}
