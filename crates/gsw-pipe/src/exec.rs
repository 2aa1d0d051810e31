use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use gsw_core::CancelToken;
use serde::{Deserialize, Serialize};

use crate::command::{CommandSpec, Vars};
use crate::result::{StageResult, StageStatus};

/// Directory, relative to an invocation's cwd, that receives captured logs.
pub const LOG_DIR: &str = ".gsw-logs";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What happens to a child's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Stdout and stderr go to the null device.
    #[default]
    Discard,
    /// Stdout and stderr go to `.gsw-logs/<stage>.stdout|stderr` under the cwd.
    Capture,
}

/// Behaviour of in-flight jobs when the campaign is interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InterruptMode {
    /// Finish every stage of jobs already running.
    #[default]
    Drain,
    /// Kill the running child with its descendants and skip the job's
    /// remaining stages.
    Kill,
}

/// One external program run with an explicit working directory.
///
/// On unix every child leads its own process group, so a terminal interrupt
/// never reaches it directly and `terminate` can take down whatever the
/// child started.
pub(crate) struct Invocation<'a> {
    pub command: &'a CommandSpec,
    pub cwd: &'a Path,
    pub vars: Vars<'a>,
    pub timeout: Option<Duration>,
}

pub(crate) fn invoke(
    inv: &Invocation<'_>,
    output: OutputMode,
    interrupt: InterruptMode,
    cancel: &CancelToken,
) -> StageResult {
    let start = Instant::now();
    let stage = inv.vars.stage.to_string();
    let finish = |status: StageStatus, exit_code: Option<i32>, error: Option<String>| StageResult {
        stage: stage.clone(),
        status,
        exit_code,
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    };

    let mut cmd = match build_command(inv, output) {
        Ok(cmd) => cmd,
        Err(err) => return finish(StageStatus::SpawnFailed, None, Some(err)),
    };
    tracing::debug!(
        program = %inv.command.program,
        cwd = %inv.cwd.display(),
        stage = inv.vars.stage,
        "spawning"
    );
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return finish(
                StageStatus::SpawnFailed,
                None,
                Some(format!("failed to start `{}`: {err}", inv.command.program)),
            )
        }
    };

    let watch_cancel = interrupt == InterruptMode::Kill;
    if inv.timeout.is_none() && !watch_cancel {
        return match child.wait() {
            Ok(status) => from_exit(status, &finish),
            Err(err) => finish(StageStatus::Failed, None, Some(err.to_string())),
        };
    }

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return from_exit(status, &finish),
            Ok(None) => {}
            Err(err) => {
                terminate(&mut child);
                return finish(StageStatus::Failed, None, Some(err.to_string()));
            }
        }
        if let Some(limit) = inv.timeout {
            if start.elapsed() >= limit {
                terminate(&mut child);
                return finish(
                    StageStatus::TimedOut,
                    None,
                    Some(format!("exceeded timeout of {}s", limit.as_secs_f64())),
                );
            }
        }
        if watch_cancel && cancel.is_cancelled() {
            terminate(&mut child);
            return finish(
                StageStatus::Interrupted,
                None,
                Some("killed on campaign interrupt".to_string()),
            );
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn build_command(inv: &Invocation<'_>, output: OutputMode) -> Result<Command, String> {
    let mut cmd = Command::new(&inv.command.program);
    cmd.args(inv.command.args.iter().map(|arg| inv.vars.expand(arg)))
        .envs(
            inv.command
                .env
                .iter()
                .map(|(key, value)| (key.clone(), inv.vars.expand(value))),
        )
        .envs(inv.vars.env())
        .current_dir(inv.cwd)
        .stdin(Stdio::null());
    match output {
        OutputMode::Discard => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        OutputMode::Capture => {
            let dir = inv.cwd.join(LOG_DIR);
            fs::create_dir_all(&dir).map_err(|err| format!("log dir: {err}"))?;
            let stdout = File::create(dir.join(format!("{}.stdout", inv.vars.stage)))
                .map_err(|err| format!("stdout log: {err}"))?;
            let stderr = File::create(dir.join(format!("{}.stderr", inv.vars.stage)))
                .map_err(|err| format!("stderr log: {err}"))?;
            cmd.stdout(stdout).stderr(stderr);
        }
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    Ok(cmd)
}

fn from_exit(
    status: ExitStatus,
    finish: &impl Fn(StageStatus, Option<i32>, Option<String>) -> StageResult,
) -> StageResult {
    if status.success() {
        finish(StageStatus::Succeeded, status.code(), None)
    } else {
        finish(StageStatus::Failed, status.code(), Some(status.to_string()))
    }
}

/// Kills the child's whole process group, then reaps the child.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let signalled = Command::new("kill")
            .args(["-KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !matches!(signalled, Ok(status) if status.success()) {
            tracing::warn!(pid = child.id(), "could not signal process group");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
