use std::fs;
use std::path::Path;

use gsw_grid::Space;
use gsw_orch::{load_plan, parse_plan, RunOpts};
use gsw_pipe::{InterruptMode, OutputMode};

const PLAN: &str = r#"
name: tiny
root: runs
template: template
space:
  type: grid
  axes:
    - name: n
      values: [50, 100]
    - name: b
      values: [0.5, 1.0]
generator:
  program: ./bin/generate.sh
stages:
  - name: quali
    command:
      program: Rscript
      args: ["-e", "rmarkdown::render('quali.Rmd')"]
    timeout_secs: 600
scheduler:
  workers: 2
  on_interrupt: kill
  capture_logs: true
"#;

#[test]
fn defaults_are_filled_in() {
    let plan = parse_plan(
        "name: x\nroot: r\ntemplate: t\nspace: {type: scenario, name: base, parameters: [{name: n, value: 5}]}\ngenerator: {program: gen}\nstages: []\n",
        Path::new("/plans"),
    )
    .expect("plan parses");
    assert_eq!(plan.slots.prefix, "sim");
    assert_eq!(plan.slots.count, 3);
    assert_eq!(plan.scheduler.workers, None);
    assert!(plan.workers() >= 1);
    assert_eq!(plan.scheduler.on_interrupt, InterruptMode::Drain);
    assert!(!plan.scheduler.capture_logs);
    assert!(matches!(plan.space, Space::Scenario { .. }));
}

#[test]
fn scheduler_block_drives_run_options() {
    let plan = parse_plan(PLAN, Path::new("/plans")).expect("plan parses");
    let opts = RunOpts::from_plan(&plan);
    assert_eq!(opts.workers, 2);
    assert_eq!(opts.on_interrupt, InterruptMode::Kill);
    assert_eq!(opts.output, OutputMode::Capture);
    assert_eq!(plan.pipeline.stages[0].timeout_secs, Some(600));
}

#[test]
fn relative_paths_resolve_against_plan_directory() {
    let plan = parse_plan(PLAN, Path::new("/plans")).expect("plan parses");
    assert_eq!(plan.root_path(), Path::new("/plans/runs"));
    assert_eq!(plan.template_path(), Path::new("/plans/template"));
    let pipeline = plan.resolved_pipeline();
    assert_eq!(pipeline.generator.program, "/plans/./bin/generate.sh");
    // Bare program names are left for PATH lookup.
    assert_eq!(pipeline.stages[0].command.program, "Rscript");
}

#[test]
fn load_plan_anchors_at_absolute_parent() {
    let temp = tempfile::tempdir().expect("tmp");
    let path = temp.path().join("campaign.yaml");
    fs::write(&path, PLAN).expect("write plan");
    let plan = load_plan(&path).expect("load");
    assert!(plan.base_dir.is_absolute());
    assert_eq!(
        plan.root_path(),
        fs::canonicalize(temp.path()).expect("canon").join("runs")
    );
}

#[test]
fn yaml_round_trip_preserves_the_plan() {
    let plan = parse_plan(PLAN, Path::new("/plans")).expect("plan parses");
    let text = plan.to_yaml_string().expect("yaml");
    let again = parse_plan(&text, Path::new("/plans")).expect("reparse");
    assert_eq!(plan, again);
    assert_eq!(plan.plan_hash().expect("hash"), again.plan_hash().expect("hash"));
}

#[test]
fn plan_hash_tracks_content() {
    let plan = parse_plan(PLAN, Path::new("/plans")).expect("plan parses");
    let mut edited = plan.clone();
    edited.scheduler.workers = Some(3);
    assert_ne!(plan.plan_hash().expect("hash"), edited.plan_hash().expect("hash"));
}

#[test]
fn malformed_plans_are_configuration_errors() {
    let err = parse_plan("name: x\nroot: r\n", Path::new("/plans")).expect_err("missing fields");
    assert!(err.is_fatal());
    assert_eq!(err.info().code, "gsw_orch.plan_parse");

    let err = load_plan("/definitely/not/here.yaml").expect_err("missing file");
    assert_eq!(err.info().code, "gsw_orch.plan_read");
}
