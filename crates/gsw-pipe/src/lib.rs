#![deny(missing_docs)]
//! External process execution for gridsweep jobs.
//!
//! The generator runs once per job with the job directory as cwd; each stage
//! then runs once per sub-slot with the slot directory as cwd. Only exit
//! status is observed. Standard streams are discarded unless log capture is
//! enabled.

mod command;
mod exec;
mod result;
mod runner;

pub use command::CommandSpec;
pub use exec::{InterruptMode, OutputMode, LOG_DIR};
pub use result::{PipelineRun, SlotOutcome, StageResult, StageStatus};
pub use runner::{PipelineRunner, PipelineSpec, RunnerOpts, StageSpec, GENERATOR_STAGE};
