use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    list::{self, ListArgs},
    plan::{self, PlanArgs},
    run::{self, RunArgs},
    summarize::{self, SummarizeArgs},
};

mod commands;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "gsw", version, about = "Parameter grid sweep orchestrator")]
struct Cli {
    /// Raise the default log level to debug.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a starter campaign plan.
    Plan(PlanArgs),
    /// Print job identifiers in enumeration order.
    List(ListArgs),
    /// Provision and run every job of a campaign.
    Run(RunArgs),
    /// Rebuild the aggregate summary from a campaign's result log.
    Summarize(SummarizeArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    match cli.command {
        Command::Plan(args) => plan::run(&args),
        Command::List(args) => list::run(&args),
        Command::Run(args) => run::run(&args),
        Command::Summarize(args) => summarize::run(&args),
    }
}
