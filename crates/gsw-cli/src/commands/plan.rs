use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use gsw_grid::{Axis, Space};
use gsw_orch::{CampaignPlan, SchedulerSpec};
use gsw_pipe::{CommandSpec, PipelineSpec, StageSpec};
use gsw_work::SlotLayout;

const STAGES: [&str; 4] = ["quali", "call", "compare", "estimate"];

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Destination of the plan file.
    #[arg(long, default_value = "campaign.yaml")]
    pub out: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    if args.out.exists() && !args.force {
        return Err(format!("{} already exists (use --force)", args.out.display()).into());
    }
    let yaml = starter_plan().to_yaml_string()?;
    fs::write(&args.out, format!("# gridsweep campaign plan\n{yaml}"))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

/// Four-axis batch effect sweep rendering one R Markdown report per stage.
pub fn starter_plan() -> CampaignPlan {
    let factors = [0.5, 0.7, 1.0, 1.5];
    CampaignPlan {
        name: "batch-effect-grid".to_string(),
        root: PathBuf::from("runs"),
        template: PathBuf::from("template"),
        slots: SlotLayout::default(),
        space: Space::Grid {
            axes: vec![
                Axis::new("n", vec![50.0, 100.0, 200.0, 300.0]),
                Axis::new("b", factors.to_vec()).with_decimals(1),
                Axis::new("g", factors.to_vec()).with_decimals(1),
                Axis::new("c", vec![0.5, 0.7, 1.0, 1.3]).with_decimals(1),
            ],
        },
        pipeline: PipelineSpec {
            generator: CommandSpec::new("R/generate_datasets.R"),
            generator_timeout_secs: None,
            stages: STAGES
                .iter()
                .map(|stage| {
                    StageSpec::new(
                        *stage,
                        CommandSpec::new("Rscript")
                            .with_args(["-e", "rmarkdown::render(\"{stage}.Rmd\")"]),
                    )
                })
                .collect(),
        },
        scheduler: SchedulerSpec::default(),
        base_dir: PathBuf::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use gsw_grid::ParameterGrid;

    use super::*;

    #[test]
    fn starter_plan_reparses_and_enumerates_256_jobs() {
        let yaml = starter_plan().to_yaml_string().expect("yaml");
        let plan = gsw_orch::parse_plan(&yaml, Path::new("/tmp")).expect("parse");
        let grid = ParameterGrid::from_space(&plan.space).expect("grid");
        let ids = grid.validate_identifiers().expect("ids");
        assert_eq!(ids.len(), 256);
        assert_eq!(ids[0].as_str(), "n50_b0.5_g0.5_c0.5");
        assert_eq!(ids[255].as_str(), "n300_b1.5_g1.5_c1.3");
        assert_eq!(plan.pipeline.stages.len(), 4);
    }
}
