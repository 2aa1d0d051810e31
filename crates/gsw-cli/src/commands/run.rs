use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use gsw_core::CancelToken;
use gsw_orch::{load_plan, run_campaign, RunOpts};
use gsw_pipe::{InterruptMode, OutputMode};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Campaign plan (YAML).
    #[arg(long)]
    pub plan: PathBuf,
    /// Worker count, overriding the plan.
    #[arg(long)]
    pub workers: Option<usize>,
    /// Campaign root, overriding the plan. Relative to the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Keep child stdout/stderr under `.gsw-logs/`.
    #[arg(long)]
    pub capture_logs: bool,
    /// What running jobs do on Ctrl-C.
    #[arg(long, value_enum)]
    pub on_interrupt: Option<InterruptArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum InterruptArg {
    Drain,
    Kill,
}

impl From<InterruptArg> for InterruptMode {
    fn from(arg: InterruptArg) -> Self {
        match arg {
            InterruptArg::Drain => InterruptMode::Drain,
            InterruptArg::Kill => InterruptMode::Kill,
        }
    }
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let mut plan = load_plan(&args.plan)?;
    if let Some(root) = &args.root {
        plan.root = std::path::absolute(root)?;
    }
    let mut opts = RunOpts::from_plan(&plan);
    if let Some(workers) = args.workers {
        opts.workers = workers.max(1);
    }
    if args.capture_logs {
        opts.output = OutputMode::Capture;
    }
    if let Some(mode) = args.on_interrupt {
        opts.on_interrupt = mode.into();
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if !handler_token.is_cancelled() {
            tracing::warn!("interrupt received, no new jobs will start");
        }
        handler_token.cancel();
    })?;

    let report = run_campaign(&plan, &opts, &cancel)?;
    print!("{}", report.summary.render());
    match report.exit_error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
