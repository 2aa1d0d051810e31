#![deny(missing_docs)]
#![doc = "Campaign orchestration: plan loading, bounded-parallel job dispatch and aggregate reporting."]

/// Canonical JSON and hashing helpers.
pub mod canon;
/// Worker pool dispatch and the per-job worker boundary.
pub mod dispatch;
/// Campaign plan schema and loading.
pub mod plan;
/// Job outcomes, result log and aggregate reports.
pub mod report;
/// Job lifecycle state machine.
pub mod state;

pub use dispatch::{run_campaign, run_campaign_from_path, RunOpts};
pub use plan::{default_workers, load_plan, parse_plan, CampaignPlan, SchedulerSpec};
pub use report::{
    load_report, read_results, summarize, CampaignReport, FailedJob, JobOutcome, ResultLog,
    Summary, REPORT_FILE, RESULTS_LOG, STATUS_FILE,
};
pub use state::{JobState, JobTracker};
