//! Test utility functions for release-pipeline
#![allow(dead_code)]

use release_pipeline::core::{
    ExitSignal, PipelineRun, ReleaseConfig, ReleaseError, RunStatus, Stage, StageStatus, StepSpec,
};
use release_pipeline::execution::{ReleaseEngine, ReleaseEvent, Reporter, StepRunner};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Runner that records every step and answers from a script
///
/// Steps are matched by description; anything unscripted succeeds.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<StepSpec>>,
    exits: HashMap<String, ExitSignal>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the step with this description end with `exit`
    pub fn exit_with(mut self, description: &str, exit: ExitSignal) -> Self {
        self.exits.insert(description.to_string(), exit);
        self
    }

    /// Make the step with this description fail to start
    pub fn fail_to_start(self, description: &str) -> Self {
        self.exit_with(description, ExitSignal::NotStarted)
    }

    pub fn calls(&self) -> Vec<StepSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Descriptions of every step run, in order
    pub fn descriptions(&self) -> Vec<String> {
        self.calls().into_iter().map(|s| s.description).collect()
    }

    /// Steps whose description starts with `prefix`
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<StepSpec> {
        self.calls()
            .into_iter()
            .filter(|s| s.description.starts_with(prefix))
            .collect()
    }

    /// Package identifiers of publish steps, in order
    pub fn published(&self) -> Vec<String> {
        self.calls_starting_with("publish ")
            .into_iter()
            .filter_map(|s| s.package)
            .collect()
    }

    /// Package identifiers of tag steps, in order
    pub fn tagged(&self) -> Vec<String> {
        self.calls_starting_with("tag ")
            .into_iter()
            .filter_map(|s| s.package)
            .collect()
    }
}

#[async_trait]
impl StepRunner for ScriptedRunner {
    async fn run(&self, step: &StepSpec) -> std::io::Result<ExitSignal> {
        self.calls.lock().unwrap().push(step.clone());
        match self.exits.get(&step.description) {
            Some(ExitSignal::NotStarted) => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: command not found", step.program),
            )),
            Some(exit) => Ok(*exit),
            None => Ok(ExitSignal::Code(0)),
        }
    }
}

/// Reporter that keeps every event
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReleaseEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ReleaseEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn stages_started(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReleaseEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn install_hint(&self) -> Option<String> {
        self.events().into_iter().find_map(|e| match e {
            ReleaseEvent::RunCompleted { install_hint, .. } => Some(install_hint),
            _ => None,
        })
    }

    pub fn untagged(&self) -> Option<Vec<String>> {
        self.events().into_iter().find_map(|e| match e {
            ReleaseEvent::RunFailed { untagged, .. } => Some(untagged),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &ReleaseEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Directory of the fixture monorepo mirroring the curated package list
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/monorepo")
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}

/// A writable copy of the fixture monorepo
pub fn fixture_monorepo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&fixture_root(), dir.path());
    dir
}

/// Write a package manifest under `<root>/packages/<id>`
pub fn write_package(root: &Path, id: &str, manifest: &str) {
    let dir = root.join("packages").join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("package.json"), manifest).unwrap();
}

/// Monorepo with `cli` -> `renderer` -> `bundler`
pub fn three_package_monorepo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_package(
        dir.path(),
        "bundler",
        "{\n  \"name\": \"@reel/bundler\",\n  \"version\": \"4.0.499\"\n}\n",
    );
    write_package(
        dir.path(),
        "renderer",
        r#"{
  "name": "@reel/renderer",
  "version": "4.0.499",
  "dependencies": {
    "@reel/bundler": "workspace:*"
  }
}
"#,
    );
    write_package(
        dir.path(),
        "cli",
        r#"{
  "name": "@reel/cli",
  "version": "4.0.499",
  "dependencies": {
    "@reel/renderer": "workspace:*"
  }
}
"#,
    );
    dir
}

/// Built-in configuration publishing only `order`, without version constants
pub fn config_with_order(order: &[&str]) -> ReleaseConfig {
    let mut config = ReleaseConfig::builtin().unwrap();
    config.publish_order = order.iter().map(|id| id.to_string()).collect();
    config.version_constants.clear();
    config
}

/// Everything a finished test run leaves behind
pub struct ReleaseTestResult {
    pub run: PipelineRun,
    pub result: Result<(), ReleaseError>,
    pub runner: Arc<ScriptedRunner>,
    pub reporter: Arc<RecordingReporter>,
}

/// Run the whole pipeline against `root`
pub async fn run_release(
    root: &Path,
    config: ReleaseConfig,
    input: &str,
    runner: ScriptedRunner,
) -> ReleaseTestResult {
    let runner = Arc::new(runner);
    let reporter = Arc::new(RecordingReporter::default());
    let engine = ReleaseEngine::new(config, root, runner.clone(), reporter.clone());

    let mut run = PipelineRun::new();
    let result = engine.execute(&mut run, input).await;

    ReleaseTestResult {
        run,
        result,
        runner,
        reporter,
    }
}

/// Snapshot of every file under `root`, keyed by relative path
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let relative = path.strip_prefix(base).unwrap().to_path_buf();
                out.push((relative, std::fs::read(&path).unwrap()));
            }
        }
    }
    let mut files = Vec::new();
    walk(root, root, &mut files);
    files.sort();
    files
}

/// Version field of a package manifest
pub fn manifest_version(root: &Path, id: &str) -> String {
    let path = root.join("packages").join(id).join("package.json");
    let content = std::fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    value["version"].as_str().unwrap().to_string()
}

/// Assert the run ended in DONE
pub fn assert_run_completed(result: &ReleaseTestResult) {
    assert!(
        result.result.is_ok(),
        "Run should have completed, but failed with: {:?}",
        result.result
    );
    assert_eq!(result.run.status, RunStatus::Completed);
    assert_eq!(result.run.current_stage, Stage::Done);
}

/// Assert the run halted in `stage`
pub fn assert_run_failed_in(result: &ReleaseTestResult, stage: Stage) {
    assert!(result.result.is_err(), "Run should have failed in {}", stage);
    assert_eq!(result.run.status, RunStatus::Failed);
    assert_eq!(
        result.run.current_stage, stage,
        "Run halted in {} instead of {}",
        result.run.current_stage, stage
    );
    assert!(
        matches!(result.run.stage_status(stage), Some(StageStatus::Failed { .. })),
        "Stage {} should be marked failed",
        stage
    );
}

/// Assert `actual` lists exactly `expected`, in order
pub fn assert_order(actual: &[String], expected: &[&str]) {
    let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
    assert_eq!(actual, expected, "Unexpected order");
}
