use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use gsw_core::errors::{ErrorInfo, GswError};
use gsw_core::params::{ParamEntry, ParameterSet};
use gsw_core::provenance::RunProvenance;
use gsw_grid::JobId;
use gsw_pipe::{PipelineRun, SlotOutcome, StageResult, StageStatus};
use serde::{Deserialize, Serialize};

use crate::canon::{from_json_slice, to_canonical_json_bytes, to_canonical_json_line};
use crate::state::JobState;

/// Append-only campaign log, one outcome per line.
pub const RESULTS_LOG: &str = "results.jsonl";
/// Aggregate report written when the campaign ends.
pub const REPORT_FILE: &str = "campaign_report.json";
/// Per-job copy of the job's outcome.
pub const STATUS_FILE: &str = "status.json";

/// Failure label used when no pipeline stage ran.
pub const PROVISIONING_LABEL: &str = "provisioning";

fn io_error(code: &str, path: &Path, err: impl ToString) -> GswError {
    GswError::Serde(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Everything recorded about one job once it stops moving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Job identifier.
    pub id: JobId,
    /// Position in grid traversal order.
    pub index: usize,
    /// Parameter values the job ran with.
    pub params: Vec<ParamEntry>,
    /// Final lifecycle state.
    pub state: JobState,
    /// True when every invocation succeeded.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Generator result; absent when the pipeline never started.
    pub generator: Option<StageResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Per-slot stage results.
    pub slots: Vec<SlotOutcome>,
    /// Provisioning or internal error that prevented the pipeline from running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Provisioning plus pipeline time in milliseconds.
    pub duration_ms: u64,
}

impl JobOutcome {
    /// Outcome for a job that was never dispatched.
    pub fn pending(index: usize, id: JobId, params: &ParameterSet) -> Self {
        Self {
            id,
            index,
            params: params.entries(),
            state: JobState::Pending,
            success: false,
            generator: None,
            slots: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }

    /// Outcome for a job whose pipeline never started.
    pub fn aborted(
        index: usize,
        id: JobId,
        params: &ParameterSet,
        error: &GswError,
        duration_ms: u64,
    ) -> Self {
        Self {
            state: JobState::Failed,
            error: Some(error.info().clone()),
            duration_ms,
            ..Self::pending(index, id, params)
        }
    }

    /// Outcome for a job that ran its pipeline.
    pub fn from_run(
        index: usize,
        id: JobId,
        params: &ParameterSet,
        run: PipelineRun,
        duration_ms: u64,
    ) -> Self {
        let success = run.succeeded();
        Self {
            state: if success {
                JobState::Succeeded
            } else {
                JobState::Failed
            },
            success,
            generator: Some(run.generator),
            slots: run.slots,
            duration_ms,
            ..Self::pending(index, id, params)
        }
    }

    /// True when an interrupt killed or skipped part of this job's pipeline.
    pub fn cut_short(&self) -> bool {
        let Some(generator) = &self.generator else {
            return false;
        };
        match generator.status {
            StageStatus::Interrupted => true,
            StageStatus::Succeeded => self
                .slots
                .iter()
                .flat_map(|slot| &slot.stages)
                .any(|stage| {
                    matches!(stage.status, StageStatus::Interrupted | StageStatus::Skipped)
                }),
            _ => false,
        }
    }

    /// Names of the failing steps: `provisioning`, `generator` or `<slot>/<stage>`.
    pub fn failed_stages(&self) -> Vec<String> {
        match &self.generator {
            None if self.state == JobState::Failed => vec![PROVISIONING_LABEL.to_string()],
            None => Vec::new(),
            Some(generator) => PipelineRun {
                generator: generator.clone(),
                slots: self.slots.clone(),
            }
            .failed_stages(),
        }
    }
}

/// A failed job and the steps that failed in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedJob {
    /// Job identifier.
    pub id: JobId,
    /// Failing steps, see [`JobOutcome::failed_stages`].
    pub stages: Vec<String>,
}

/// Counts over a set of outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Summary {
    /// Jobs in the campaign.
    pub total: usize,
    /// Jobs whose every invocation succeeded.
    pub succeeded: usize,
    /// Jobs that failed provisioning or any invocation.
    pub failed: usize,
    /// Jobs never dispatched because the campaign was interrupted.
    pub pending: usize,
    /// Failed jobs in traversal order.
    pub failed_jobs: Vec<FailedJob>,
}

impl Summary {
    /// Counts outcomes, keeping their order in `failed_jobs`.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a JobOutcome>) -> Self {
        let mut summary = Summary::default();
        for outcome in outcomes {
            summary.total += 1;
            match outcome.state {
                JobState::Succeeded => summary.succeeded += 1,
                JobState::Failed => {
                    summary.failed += 1;
                    summary.failed_jobs.push(FailedJob {
                        id: outcome.id.clone(),
                        stages: outcome.failed_stages(),
                    });
                }
                _ => summary.pending += 1,
            }
        }
        summary
    }

    /// Multi-line human readable rendering for the console.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "jobs: {} total, {} succeeded, {} failed, {} not started",
            self.total, self.succeeded, self.failed, self.pending
        );
        for job in &self.failed_jobs {
            let _ = writeln!(out, "  FAILED {}: {}", job.id, job.stages.join(", "));
        }
        out
    }
}

/// End-of-campaign report persisted as `campaign_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignReport {
    /// Campaign name from the plan.
    pub name: String,
    /// Aggregate counts.
    pub summary: Summary,
    /// True when an operator interrupt stopped dispatch.
    pub interrupted: bool,
    /// All outcomes in traversal order.
    pub jobs: Vec<JobOutcome>,
    /// Plan hash, creation time and tool version.
    pub provenance: RunProvenance,
}

impl CampaignReport {
    /// Builds the report, stamping the current time.
    pub fn new(name: &str, plan_hash: String, jobs: Vec<JobOutcome>, interrupted: bool) -> Self {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            "gsw-orch".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self {
            name: name.to_string(),
            summary: Summary::from_outcomes(&jobs),
            interrupted,
            jobs,
            provenance: RunProvenance {
                plan_hash,
                created_at: Utc::now().to_rfc3339(),
                tool_versions,
            },
        }
    }

    /// Error describing how the campaign ended, if it did not end cleanly.
    ///
    /// An interrupt takes precedence over job failures.
    pub fn exit_error(&self) -> Option<GswError> {
        if self.interrupted {
            return Some(GswError::Interrupted(
                ErrorInfo::new("gsw_orch.interrupted", "campaign interrupted")
                    .with_context("pending", self.summary.pending.to_string())
                    .with_hint("jobs left pending can be run again with a fresh root"),
            ));
        }
        self.summary.failed_jobs.first().map(|first| {
            GswError::Stage(
                ErrorInfo::new(
                    "gsw_orch.jobs_failed",
                    format!("{} of {} jobs failed", self.summary.failed, self.summary.total),
                )
                .with_context("first", first.id.to_string()),
            )
        })
    }

    /// Writes `campaign_report.json` under `root`.
    pub fn write(&self, root: &Path) -> Result<PathBuf, GswError> {
        let path = root.join(REPORT_FILE);
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(&path, bytes).map_err(|err| io_error("gsw_orch.report_write", &path, err))?;
        Ok(path)
    }
}

/// Loads a previously written campaign report.
pub fn load_report(root: &Path) -> Result<CampaignReport, GswError> {
    let path = root.join(REPORT_FILE);
    let bytes = fs::read(&path).map_err(|err| io_error("gsw_orch.report_read", &path, err))?;
    from_json_slice(&bytes)
}

/// Shared handle to `results.jsonl`; appends are serialized by a mutex.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ResultLog {
    /// Opens `<root>/results.jsonl` for appending, creating it if needed.
    pub fn open(root: &Path) -> Result<Self, GswError> {
        let path = root.join(RESULTS_LOG);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_error("gsw_orch.log_open", &path, err))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one outcome as a single line.
    pub fn append(&self, outcome: &JobOutcome) -> Result<(), GswError> {
        let line = to_canonical_json_line(outcome)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| io_error("gsw_orch.log_poisoned", &self.path, "result log lock poisoned"))?;
        file.write_all(&line)
            .and_then(|_| file.flush())
            .map_err(|err| io_error("gsw_orch.log_write", &self.path, err))
    }
}

/// Reads every outcome recorded in `<root>/results.jsonl`, in append order.
pub fn read_results(root: &Path) -> Result<Vec<JobOutcome>, GswError> {
    let path = root.join(RESULTS_LOG);
    let text = fs::read_to_string(&path).map_err(|err| io_error("gsw_orch.log_read", &path, err))?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| from_json_slice(line.as_bytes()))
        .collect()
}

/// Rebuilds a summary from the result log.
///
/// When a job appears more than once (the root was reused) its last record
/// wins. Jobs are listed in traversal order.
pub fn summarize(root: &Path) -> Result<Summary, GswError> {
    let mut latest: BTreeMap<JobId, JobOutcome> = BTreeMap::new();
    for outcome in read_results(root)? {
        latest.insert(outcome.id.clone(), outcome);
    }
    let mut outcomes: Vec<JobOutcome> = latest.into_values().collect();
    outcomes.sort_by_key(|outcome| outcome.index);
    Ok(Summary::from_outcomes(&outcomes))
}

/// Writes `status.json` into a job directory the campaign created.
pub fn write_status(job_dir: &Path, outcome: &JobOutcome) -> Result<(), GswError> {
    let path = job_dir.join(STATUS_FILE);
    let bytes = to_canonical_json_bytes(outcome)?;
    fs::write(&path, bytes).map_err(|err| io_error("gsw_orch.status_write", &path, err))
}
