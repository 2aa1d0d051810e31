#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use gsw_core::CancelToken;
use gsw_grid::{Axis, ParameterGrid};
use gsw_pipe::{
    CommandSpec, InterruptMode, OutputMode, PipelineRunner, PipelineSpec, RunnerOpts, StageSpec,
    StageStatus, LOG_DIR,
};
use gsw_work::{Provisioner, SlotLayout, Workspace};

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("/bin/sh").with_args(["-c", script])
}

fn workspace(root: &Path) -> Workspace {
    let template = root.join("template");
    fs::create_dir_all(&template).expect("template");
    fs::write(template.join("quali.Rmd"), "# quality").expect("template file");
    let runs = root.join("runs");
    fs::create_dir(&runs).expect("runs");
    let grid = ParameterGrid::grid(&[
        Axis::new("n", vec![50.0]),
        Axis::new("b", vec![0.5]),
    ])
    .expect("grid");
    let (id, params) = grid.jobs().next().expect("job").expect("id");
    Provisioner::new(&runs, &template, SlotLayout::new("sim", 3))
        .expect("provisioner")
        .provision(&id, &params)
        .expect("provision")
}

fn runner(spec: PipelineSpec) -> PipelineRunner {
    PipelineRunner::new(spec, RunnerOpts::default(), CancelToken::new()).expect("runner")
}

fn four_stages(second: &str) -> Vec<StageSpec> {
    vec![
        StageSpec::new("quali", sh("touch quali.done")),
        StageSpec::new("call", sh(second)),
        StageSpec::new("compare", sh("touch compare.done")),
        StageSpec::new("estimate", sh("touch estimate.done")),
    ]
}

#[test]
fn generator_failure_skips_every_stage() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let run = runner(PipelineSpec {
        generator: sh("exit 7"),
        generator_timeout_secs: None,
        stages: four_stages("touch call.done"),
    })
    .run(&ws);

    assert_eq!(run.generator.status, StageStatus::Failed);
    assert_eq!(run.generator.exit_code, Some(7));
    assert!(!run.succeeded());
    assert_eq!(run.failed_stages(), vec!["generator"]);
    assert_eq!(run.slots.len(), 3);
    for slot in &run.slots {
        assert_eq!(slot.stages.len(), 4);
        assert!(slot.stages.iter().all(|s| s.status == StageStatus::Skipped));
    }
    for (_, dir) in &ws.slots {
        assert!(!dir.join("quali.done").exists());
    }
}

#[test]
fn failing_stage_does_not_stop_later_stages() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let run = runner(PipelineSpec {
        generator: sh("true"),
        generator_timeout_secs: None,
        stages: four_stages("exit 3"),
    })
    .run(&ws);

    assert!(run.generator.succeeded());
    assert!(!run.succeeded());
    for slot in &run.slots {
        let statuses: Vec<StageStatus> = slot.stages.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![
                StageStatus::Succeeded,
                StageStatus::Failed,
                StageStatus::Succeeded,
                StageStatus::Succeeded
            ]
        );
        assert_eq!(slot.stages[1].exit_code, Some(3));
    }
    for (_, dir) in &ws.slots {
        for marker in ["quali.done", "compare.done", "estimate.done"] {
            assert!(dir.join(marker).exists(), "{marker} missing in {}", dir.display());
        }
    }
    assert_eq!(run.failed_stages(), vec!["sim1/call", "sim2/call", "sim3/call"]);
}

#[test]
fn stages_run_in_their_slot_with_expanded_templates() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let run = runner(PipelineSpec {
        generator: sh("for d in sim*; do echo generated > \"$d/data.txt\"; done"),
        generator_timeout_secs: None,
        stages: vec![StageSpec::new(
            "render",
            CommandSpec::new("/bin/sh").with_args([
                "-c",
                "test -f data.txt && test -f quali.Rmd && echo \"$GSW_JOB_ID $GSW_SLOT $GSW_STAGE\" > \"$0.txt\"",
                "{slot}-{stage}",
            ]),
        )],
    })
    .run(&ws);

    assert!(run.succeeded(), "{run:?}");
    for (name, dir) in &ws.slots {
        let written = fs::read_to_string(dir.join(format!("{name}-render.txt"))).expect("marker");
        assert_eq!(written.trim(), format!("n50_b0.5 {name} render"));
    }
}

#[test]
fn timed_out_stage_is_a_stage_failure() {
    let temp = tempfile::tempdir().expect("tmp");
    let mut ws = workspace(temp.path());
    ws.slots.truncate(1);
    let started = Instant::now();
    let run = runner(PipelineSpec {
        generator: sh("true"),
        generator_timeout_secs: Some(30),
        stages: vec![
            StageSpec::new("slow", sh("exec sleep 30")).with_timeout_secs(1),
            StageSpec::new("after", sh("touch after.done")),
        ],
    })
    .run(&ws);

    assert!(started.elapsed().as_secs() < 20);
    let stages = &run.slots[0].stages;
    assert_eq!(stages[0].status, StageStatus::TimedOut);
    assert_eq!(stages[1].status, StageStatus::Succeeded);
    assert!(ws.slots[0].1.join("after.done").exists());
}

const NESTED_LATE_WRITER: &str = "sh -c 'sleep 2; touch late.out'; true";

#[test]
fn timeout_kills_the_stage_descendants() {
    let temp = tempfile::tempdir().expect("tmp");
    let mut ws = workspace(temp.path());
    ws.slots.truncate(1);
    let run = runner(PipelineSpec {
        generator: sh("true"),
        generator_timeout_secs: None,
        stages: vec![StageSpec::new("nested", sh(NESTED_LATE_WRITER)).with_timeout_secs(1)],
    })
    .run(&ws);

    assert_eq!(run.slots[0].stages[0].status, StageStatus::TimedOut);
    thread::sleep(Duration::from_secs(3));
    assert!(!ws.slots[0].1.join("late.out").exists());
}

#[test]
fn kill_mode_cancel_takes_down_grandchildren() {
    let temp = tempfile::tempdir().expect("tmp");
    let mut ws = workspace(temp.path());
    ws.slots.truncate(1);
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        trigger.cancel();
    });
    let run = PipelineRunner::new(
        PipelineSpec {
            generator: sh("true"),
            generator_timeout_secs: None,
            stages: vec![
                StageSpec::new("nested", sh(NESTED_LATE_WRITER)),
                StageSpec::new("after", sh("touch after.done")),
            ],
        },
        RunnerOpts {
            on_interrupt: InterruptMode::Kill,
            ..RunnerOpts::default()
        },
        cancel,
    )
    .expect("runner")
    .run(&ws);
    canceller.join().expect("canceller");

    let stages = &run.slots[0].stages;
    assert_eq!(stages[0].status, StageStatus::Interrupted);
    assert_eq!(stages[1].status, StageStatus::Skipped);
    thread::sleep(Duration::from_secs(3));
    assert!(!ws.slots[0].1.join("late.out").exists());
    assert!(!ws.slots[0].1.join("after.done").exists());
}

#[test]
fn missing_program_is_recorded_not_raised() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let run = runner(PipelineSpec {
        generator: sh("true"),
        generator_timeout_secs: None,
        stages: vec![
            StageSpec::new("ghost", CommandSpec::new("/definitely/not/here")),
            StageSpec::new("real", sh("touch real.done")),
        ],
    })
    .run(&ws);

    for slot in &run.slots {
        assert_eq!(slot.stages[0].status, StageStatus::SpawnFailed);
        assert!(slot.stages[0].error.is_some());
        assert_eq!(slot.stages[1].status, StageStatus::Succeeded);
    }
}

#[test]
fn captured_logs_land_next_to_the_slot() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let opts = RunnerOpts {
        output: OutputMode::Capture,
        ..RunnerOpts::default()
    };
    let spec = PipelineSpec {
        generator: sh("echo gen-out; echo gen-err >&2"),
        generator_timeout_secs: None,
        stages: vec![StageSpec::new("quali", sh("echo hello; echo oops >&2; exit 1"))],
    };
    let run = PipelineRunner::new(spec, opts, CancelToken::new())
        .expect("runner")
        .run(&ws);
    assert!(!run.succeeded());

    let gen_logs = ws.dir.join(LOG_DIR);
    assert_eq!(fs::read_to_string(gen_logs.join("generator.stdout")).unwrap(), "gen-out\n");
    assert_eq!(fs::read_to_string(gen_logs.join("generator.stderr")).unwrap(), "gen-err\n");
    for (_, dir) in &ws.slots {
        let logs = dir.join(LOG_DIR);
        assert_eq!(fs::read_to_string(logs.join("quali.stdout")).unwrap(), "hello\n");
        assert_eq!(fs::read_to_string(logs.join("quali.stderr")).unwrap(), "oops\n");
    }
}

#[test]
fn kill_mode_interrupts_running_children() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = RunnerOpts {
        on_interrupt: InterruptMode::Kill,
        ..RunnerOpts::default()
    };
    let started = Instant::now();
    let run = PipelineRunner::new(
        PipelineSpec {
            generator: sh("exec sleep 30"),
            generator_timeout_secs: None,
            stages: four_stages("true"),
        },
        opts,
        cancel,
    )
    .expect("runner")
    .run(&ws);

    assert!(started.elapsed().as_secs() < 20);
    assert_eq!(run.generator.status, StageStatus::Interrupted);
    assert!(run
        .slots
        .iter()
        .flat_map(|slot| &slot.stages)
        .all(|stage| stage.status == StageStatus::Skipped));
}

#[test]
fn drain_mode_finishes_in_flight_jobs() {
    let temp = tempfile::tempdir().expect("tmp");
    let ws = workspace(temp.path());
    let cancel = CancelToken::new();
    cancel.cancel();
    let run = PipelineRunner::new(
        PipelineSpec {
            generator: sh("true"),
            generator_timeout_secs: None,
            stages: four_stages("true"),
        },
        RunnerOpts::default(),
        cancel,
    )
    .expect("runner")
    .run(&ws);
    assert!(run.succeeded());
}

#[test]
fn duplicate_stage_names_are_rejected() {
    let spec = PipelineSpec {
        generator: sh("true"),
        generator_timeout_secs: None,
        stages: vec![
            StageSpec::new("quali", sh("true")),
            StageSpec::new("quali", sh("true")),
        ],
    };
    let err = PipelineRunner::new(spec, RunnerOpts::default(), CancelToken::new())
        .expect_err("duplicate");
    assert_eq!(err.info().code, "gsw_pipe.duplicate_stage");
}

#[test]
fn pipeline_spec_reads_from_yaml() {
    let yaml = r#"
generator:
  program: R/generate_datasets.R
stages:
  - name: quali
    command:
      program: Rscript
      args: ["-e", "rmarkdown::render(\"{stage}.Rmd\")"]
    timeout_secs: 3600
"#;
    let spec: PipelineSpec = serde_yaml::from_str(yaml).expect("yaml");
    let resolved = spec.resolve_against(Path::new("/campaign"));
    assert_eq!(resolved.generator.program, "/campaign/R/generate_datasets.R");
    assert_eq!(resolved.stages[0].command.program, "Rscript");
    assert_eq!(resolved.stages[0].timeout_secs, Some(3600));
}
