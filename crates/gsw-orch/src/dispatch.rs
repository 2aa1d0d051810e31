use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use gsw_core::errors::{ErrorInfo, GswError};
use gsw_core::params::ParameterSet;
use gsw_core::CancelToken;
use gsw_grid::{JobId, ParameterGrid};
use gsw_pipe::{InterruptMode, OutputMode, PipelineRunner, RunnerOpts};
use gsw_work::Provisioner;
use rayon::prelude::*;

use crate::plan::CampaignPlan;
use crate::report::{write_status, CampaignReport, JobOutcome, ResultLog, REPORT_FILE, RESULTS_LOG};
use crate::state::{JobState, JobTracker};

/// Options governing campaign execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOpts {
    /// Fixed size of the worker pool.
    pub workers: usize,
    /// Behaviour of in-flight jobs on interrupt.
    pub on_interrupt: InterruptMode,
    /// Whether child output is discarded or captured to files.
    pub output: OutputMode,
}

impl RunOpts {
    /// Options declared by the plan's scheduler block.
    pub fn from_plan(plan: &CampaignPlan) -> Self {
        Self {
            workers: plan.workers(),
            on_interrupt: plan.scheduler.on_interrupt,
            output: if plan.scheduler.capture_logs {
                OutputMode::Capture
            } else {
                OutputMode::Discard
            },
        }
    }
}

struct Campaign<'a> {
    provisioner: Provisioner,
    runner: PipelineRunner,
    log: ResultLog,
    cancel: &'a CancelToken,
    /// Raised when an interrupt cost at least one job its normal outcome.
    interrupted: AtomicBool,
}

/// Validates the plan, then provisions and runs every job on a bounded pool.
///
/// Configuration problems (bad grid, identifier collisions, missing
/// template, invalid stages) are returned before any job is dispatched.
/// Job failures are recorded in the report and never abort the campaign.
/// A root that already holds a campaign's result log or report is refused.
/// When `cancel` fires, jobs not yet started stay `pending` and the report
/// is flagged as interrupted. An interrupt that arrives once every job has
/// been dispatched in drain mode changes nothing and is not flagged.
pub fn run_campaign(
    plan: &CampaignPlan,
    opts: &RunOpts,
    cancel: &CancelToken,
) -> Result<CampaignReport, GswError> {
    let grid = ParameterGrid::from_space(&plan.space)?;
    let ids = grid.validate_identifiers()?;
    let runner = PipelineRunner::new(
        plan.resolved_pipeline(),
        RunnerOpts {
            output: opts.output,
            on_interrupt: opts.on_interrupt,
        },
        cancel.clone(),
    )?;

    let root = plan.root_path();
    fs::create_dir_all(&root).map_err(|err| {
        GswError::Configuration(
            ErrorInfo::new("gsw_orch.root_dir", err.to_string())
                .with_context("path", root.display().to_string()),
        )
    })?;
    for marker in [RESULTS_LOG, REPORT_FILE] {
        let path = root.join(marker);
        if path.exists() {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_orch.root_in_use", "campaign root already holds a campaign")
                    .with_context("path", path.display().to_string())
                    .with_hint("choose a fresh root; campaigns are never resumed or overwritten"),
            ));
        }
    }
    let provisioner = Provisioner::new(&root, plan.template_path(), plan.slots.clone())?;
    let log = ResultLog::open(&root)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers.max(1))
        .build()
        .map_err(|err| GswError::config("gsw_orch.thread_pool", err.to_string()))?;

    tracing::info!(
        campaign = %plan.name,
        jobs = grid.len(),
        workers = opts.workers,
        root = %root.display(),
        "starting campaign"
    );
    for (name, values) in grid.axis_summary() {
        tracing::info!("provided {name}: {}", values.join(", "));
    }

    let campaign = Campaign {
        provisioner,
        runner,
        log,
        cancel,
        interrupted: AtomicBool::new(false),
    };
    let mut outcomes: Vec<JobOutcome> = pool.install(|| {
        grid.iter()
            .zip(ids)
            .enumerate()
            .par_bridge()
            .map(|(index, (params, id))| campaign.execute(index, id, &params))
            .collect()
    });
    outcomes.sort_by_key(|outcome| outcome.index);

    let interrupted = campaign.interrupted.load(Ordering::SeqCst);
    let report = CampaignReport::new(&plan.name, plan.plan_hash()?, outcomes, interrupted);
    report.write(&root)?;
    let summary = &report.summary;
    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        pending = summary.pending,
        interrupted,
        "campaign finished"
    );
    Ok(report)
}

/// Loads a plan from disk and executes it with the plan's own options.
pub fn run_campaign_from_path(
    plan_path: &Path,
    cancel: &CancelToken,
) -> Result<CampaignReport, GswError> {
    let plan = crate::plan::load_plan(plan_path)?;
    run_campaign(&plan, &RunOpts::from_plan(&plan), cancel)
}

impl Campaign<'_> {
    /// Worker boundary: every job-scoped error becomes a failed outcome.
    fn execute(&self, index: usize, id: JobId, params: &ParameterSet) -> JobOutcome {
        if self.cancel.is_cancelled() {
            self.interrupted.store(true, Ordering::SeqCst);
            return JobOutcome::pending(index, id, params);
        }
        let start = Instant::now();
        let mut tracker = JobTracker::new(id.clone());
        let outcome = match self.drive(&mut tracker, index, &id, params, start) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(job = %id, error = %err, "job aborted");
                if !tracker.state().is_terminal() {
                    let _ = tracker.advance(JobState::Failed);
                }
                JobOutcome::aborted(index, id.clone(), params, &err, elapsed_ms(start))
            }
        };
        if outcome.cut_short() {
            self.interrupted.store(true, Ordering::SeqCst);
        }
        self.record(&outcome);
        outcome
    }

    fn drive(
        &self,
        tracker: &mut JobTracker,
        index: usize,
        id: &JobId,
        params: &ParameterSet,
        start: Instant,
    ) -> Result<JobOutcome, GswError> {
        tracker.advance(JobState::Provisioning)?;
        let ws = self.provisioner.provision(id, params)?;
        tracker.advance(JobState::Running)?;
        let run = self.runner.run(&ws);
        let outcome = JobOutcome::from_run(index, id.clone(), params, run, elapsed_ms(start));
        tracker.advance(outcome.state)?;
        if let Err(err) = write_status(&ws.dir, &outcome) {
            tracing::warn!(job = %id, error = %err, "could not write status file");
        }
        Ok(outcome)
    }

    fn record(&self, outcome: &JobOutcome) {
        // A directory that already existed belongs to someone else; only
        // trees this campaign created get a status file, written in `drive`.
        if outcome.error.is_some() && !self.already_existed(outcome) {
            let dir = self.provisioner.job_dir(&outcome.id);
            if dir.is_dir() {
                if let Err(err) = write_status(&dir, outcome) {
                    tracing::warn!(job = %outcome.id, error = %err, "could not write status file");
                }
            }
        }
        if let Err(err) = self.log.append(outcome) {
            tracing::warn!(job = %outcome.id, error = %err, "could not append to result log");
        }
    }

    fn already_existed(&self, outcome: &JobOutcome) -> bool {
        outcome
            .error
            .as_ref()
            .is_some_and(|info| info.code == gsw_core::ALREADY_EXISTS_CODE)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
