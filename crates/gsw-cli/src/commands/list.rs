use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use gsw_grid::ParameterGrid;
use gsw_orch::load_plan;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Campaign plan (YAML).
    #[arg(long)]
    pub plan: PathBuf,
}

pub fn run(args: &ListArgs) -> Result<(), Box<dyn Error>> {
    let plan = load_plan(&args.plan)?;
    let grid = ParameterGrid::from_space(&plan.space)?;
    for id in grid.validate_identifiers()? {
        println!("{id}");
    }
    Ok(())
}
