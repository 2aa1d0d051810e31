use std::fs;
use std::path::{Path, PathBuf};

use gsw_core::errors::{ErrorInfo, GswError};
use gsw_grid::Space;
use gsw_pipe::{InterruptMode, PipelineSpec};
use gsw_work::SlotLayout;
use serde::{Deserialize, Serialize};

use crate::canon::stable_hash_string;

/// Worker pool and interrupt configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchedulerSpec {
    /// Fixed worker count; defaults to the host's available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// What in-flight jobs do when the campaign is interrupted.
    #[serde(default)]
    pub on_interrupt: InterruptMode,
    /// Write child stdout/stderr to `.gsw-logs/` instead of discarding them.
    #[serde(default)]
    pub capture_logs: bool,
}

/// A complete campaign declaration as read from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPlan {
    /// Human readable campaign label.
    pub name: String,
    /// Directory receiving one subdirectory per job.
    pub root: PathBuf,
    /// Template tree copied into every sub-slot.
    pub template: PathBuf,
    /// Sub-slot naming; three slots `sim1..sim3` by default.
    #[serde(default)]
    pub slots: SlotLayout,
    /// Grid axes or a single named scenario.
    pub space: Space,
    /// Generator command and ordered stage list.
    #[serde(flatten)]
    pub pipeline: PipelineSpec,
    /// Worker pool configuration.
    #[serde(default)]
    pub scheduler: SchedulerSpec,
    /// Directory containing the plan on disk (ignored when serializing).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl CampaignPlan {
    /// Returns the deterministic hash associated with the plan contents.
    pub fn plan_hash(&self) -> Result<String, GswError> {
        stable_hash_string(self)
    }

    /// Produces a YAML representation of the plan.
    pub fn to_yaml_string(&self) -> Result<String, GswError> {
        serde_yaml::to_string(self)
            .map_err(|err| GswError::Serde(ErrorInfo::new("yaml_serialize", err.to_string())))
    }

    /// Campaign root resolved against the plan directory.
    pub fn root_path(&self) -> PathBuf {
        self.resolve(&self.root)
    }

    /// Template directory resolved against the plan directory.
    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.template)
    }

    /// Pipeline with path-like programs anchored at the plan directory.
    pub fn resolved_pipeline(&self) -> PipelineSpec {
        self.pipeline.resolve_against(&self.base_dir)
    }

    /// Worker count after applying the host default.
    pub fn workers(&self) -> usize {
        self.scheduler
            .workers
            .unwrap_or_else(default_workers)
            .max(1)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Host core count, or 4 when it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Parses a plan from YAML text. Relative paths resolve against `base_dir`.
pub fn parse_plan(text: &str, base_dir: &Path) -> Result<CampaignPlan, GswError> {
    let mut plan: CampaignPlan = serde_yaml::from_str(text).map_err(|err| {
        GswError::Configuration(
            ErrorInfo::new("gsw_orch.plan_parse", "campaign plan is not valid")
                .with_hint(err.to_string()),
        )
    })?;
    plan.base_dir = base_dir.to_path_buf();
    Ok(plan)
}

/// Loads a plan from disk.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<CampaignPlan, GswError> {
    let plan_path = path.as_ref();
    let text = fs::read_to_string(plan_path).map_err(|err| {
        GswError::Configuration(
            ErrorInfo::new("gsw_orch.plan_read", err.to_string())
                .with_context("path", plan_path.display().to_string()),
        )
    })?;
    let parent = plan_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    // Absolute so that program paths stay valid once children change cwd.
    let base_dir = fs::canonicalize(parent).map_err(|err| {
        GswError::Configuration(
            ErrorInfo::new("gsw_orch.plan_dir", err.to_string())
                .with_context("path", parent.display().to_string()),
        )
    })?;
    parse_plan(&text, &base_dir)
}
