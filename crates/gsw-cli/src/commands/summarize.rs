use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use gsw_orch::summarize;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Campaign root containing `results.jsonl`.
    #[arg(long)]
    pub root: PathBuf,
}

pub fn run(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let summary = summarize(&args.root)?;
    print!("{}", summary.render());
    Ok(())
}
