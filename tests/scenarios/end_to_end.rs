//! Test: End to end - full runs that reach DONE

use crate::helpers::*;
use release_pipeline::core::{ReleaseConfig, Stage};
use release_pipeline::execution::{DryRunRunner, ReleaseEngine, ReleaseEvent};
use release_pipeline::PipelineRun;
use std::sync::Arc;

/// Three chained packages, every step succeeding
#[tokio::test]
async fn test_three_package_release() {
    let repo = three_package_monorepo();
    let config = config_with_order(&["bundler", "renderer", "cli"]);

    let result = run_release(repo.path(), config, "4.0.500", ScriptedRunner::new()).await;

    assert_run_completed(&result);

    // Publish exactly three times, in dependency order
    let publishes = result.runner.calls_starting_with("publish ");
    assert_eq!(publishes.len(), 3);
    assert_order(&result.runner.published(), &["bundler", "renderer", "cli"]);
    assert_eq!(publishes[0].working_dir, repo.path().join("packages/bundler"));
    assert_eq!(publishes[2].working_dir, repo.path().join("packages/cli"));

    // Tag exactly three times, same order, each naming the version
    let tags = result.runner.calls_starting_with("tag ");
    assert_eq!(tags.len(), 3);
    assert_order(&result.runner.tagged(), &["bundler", "renderer", "cli"]);
    assert_eq!(tags[0].args, vec!["dist-tag", "add", "@reel/bundler@4.0.500", "latest"]);
    assert_eq!(tags[1].args, vec!["dist-tag", "add", "@reel/renderer@4.0.500", "latest"]);
    assert_eq!(tags[2].args, vec!["dist-tag", "add", "@reel/cli@4.0.500", "latest"]);
    assert!(tags.iter().all(|t| t.working_dir == repo.path()));

    // Whole pipeline, in order
    assert_eq!(
        result.runner.descriptions(),
        vec![
            "install dependencies",
            "build packages",
            "publish @reel/bundler",
            "publish @reel/renderer",
            "publish @reel/cli",
            "tag @reel/bundler@4.0.500 as latest",
            "tag @reel/renderer@4.0.500 as latest",
            "tag @reel/cli@4.0.500 as latest",
        ]
    );
    assert_eq!(result.reporter.stages_started(), Stage::ALL[..6].to_vec());

    for id in ["bundler", "renderer", "cli"] {
        assert_eq!(manifest_version(repo.path(), id), "4.0.500");
    }
    assert_order(&result.run.published, &["bundler", "renderer", "cli"]);
    assert_order(&result.run.tagged, &["bundler", "renderer", "cli"]);
    assert!(result.run.warnings.is_empty());
}

/// The curated list against the fixture monorepo
#[tokio::test]
async fn test_full_monorepo_release() {
    let repo = fixture_monorepo();
    let config = ReleaseConfig::builtin().unwrap();
    let curated = config.publish_order.clone();

    let result = run_release(repo.path(), config, "4.0.500", ScriptedRunner::new()).await;

    assert_run_completed(&result);
    assert_eq!(result.runner.published(), curated);
    assert_eq!(result.runner.tagged(), curated);

    // Core publishes under its un-scoped name
    let tags = result.runner.calls_starting_with("tag ");
    assert_eq!(tags[0].args[2], "reel@4.0.500");
    assert_eq!(tags[1].args[2], "@reel/captions@4.0.500");

    assert_eq!(
        result.reporter.install_hint().as_deref(),
        Some("npm install reel@4.0.500")
    );

    let constant = std::fs::read_to_string(repo.path().join("packages/media-utils/src/version.ts")).unwrap();
    assert!(constant.contains("export const VERSION = '4.0.500';"));

    // Private packages outside the order are versioned but never published
    assert_eq!(manifest_version(repo.path(), "it-tests"), "4.0.500");
    assert!(!result.runner.published().contains(&"it-tests".to_string()));
}

/// Dry run reports every step and leaves the tree untouched
#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let repo = fixture_monorepo();
    let before = snapshot(repo.path());

    let reporter = Arc::new(RecordingReporter::default());
    let engine = ReleaseEngine::new(
        ReleaseConfig::builtin().unwrap(),
        repo.path(),
        Arc::new(DryRunRunner),
        reporter.clone(),
    )
    .with_dry_run(true);

    let mut run = PipelineRun::new();
    engine.execute(&mut run, "4.0.500").await.unwrap();

    assert_eq!(run.current_stage, Stage::Done);
    assert_eq!(snapshot(repo.path()), before);

    let report = reporter
        .events()
        .into_iter()
        .find_map(|e| match e {
            ReleaseEvent::PropagationFinished { report } => Some(report),
            _ => None,
        })
        .unwrap();
    assert!(report.dry_run);
    assert_eq!(report.updated.len(), 18);
    assert_eq!(report.excluded.len(), 3);
    assert_eq!(report.constants.len(), 2);
}

/// The plan alone resolves without side effects
#[tokio::test]
async fn test_plan_only() {
    let repo = fixture_monorepo();
    let before = snapshot(repo.path());
    let runner = Arc::new(ScriptedRunner::new());

    let engine = ReleaseEngine::new(
        ReleaseConfig::builtin().unwrap(),
        repo.path(),
        runner.clone(),
        Arc::new(RecordingReporter::default()),
    );
    let (version, plan) = engine.plan("4.0.500").unwrap();

    assert_eq!(version.to_string(), "4.0.500");
    assert_eq!(plan.packages.len(), 17);
    assert!(plan.violations.is_empty());
    assert_eq!(
        plan.excluded,
        vec!["template-blank", "template-hello-world", "template-three"]
    );
    assert!(runner.calls().is_empty());
    assert_eq!(snapshot(repo.path()), before);
}
