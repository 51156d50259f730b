//! Test: Publish order - the curated list against manifest dependencies

use crate::helpers::*;
use release_pipeline::core::{
    DependencyGraph, OrderCheck, PlanError, PublishOrder, PublishPlan, ReleaseConfig, ReleaseError,
    Stage, Workspace,
};

fn discover(root: &std::path::Path, config: &ReleaseConfig) -> Workspace {
    Workspace::discover(
        &config.packages_root(root),
        &config.template_set(),
        &config.naming(),
    )
    .unwrap()
}

/// Every listed package comes after everything it depends on
#[test]
fn test_curated_order_respects_dependencies() {
    let repo = fixture_monorepo();
    let config = ReleaseConfig::builtin().unwrap();
    let workspace = discover(repo.path(), &config);
    let order = PublishOrder::new(config.publish_order.iter().cloned());

    let graph = DependencyGraph::from_workspace(&order, &workspace).unwrap();
    assert!(graph.violations(&order).is_empty());

    for (index, id) in order.ids().iter().enumerate() {
        for dependency in graph.transitive_dependencies(id) {
            let position = order.position(&dependency).unwrap();
            assert!(
                position < index,
                "{} (#{}) must come after {} (#{})",
                id,
                index,
                dependency,
                position
            );
        }
    }

    // The resolved order is the curated one
    let plan = PublishPlan::resolve(&order, &workspace, OrderCheck::Strict).unwrap();
    assert_eq!(plan.ids(), config.publish_order);
}

/// Dev dependencies do not order publishing
#[test]
fn test_dev_dependencies_are_ignored() {
    let repo = fixture_monorepo();
    let config = ReleaseConfig::builtin().unwrap();
    let workspace = discover(repo.path(), &config);
    let order = PublishOrder::new(config.publish_order.iter().cloned());

    let graph = DependencyGraph::from_workspace(&order, &workspace).unwrap();
    assert!(graph.dependencies_of("core").unwrap().is_empty());
}

/// A misordered list is repaired, with a warning, in the default mode
#[tokio::test]
async fn test_misordered_list_is_repaired() {
    let repo = three_package_monorepo();
    let config = config_with_order(&["cli", "bundler", "renderer"]);

    let result = run_release(repo.path(), config, "4.0.500", ScriptedRunner::new()).await;

    assert_run_completed(&result);
    assert_order(&result.runner.published(), &["bundler", "renderer", "cli"]);
    assert_eq!(
        result.run.warnings,
        vec!["Publish order: 'cli' is listed before its dependency 'renderer'"]
    );
}

/// Strict mode refuses the same list before touching anything
#[tokio::test]
async fn test_strict_mode_rejects_misordered_list() {
    let repo = three_package_monorepo();
    let before = snapshot(repo.path());
    let mut config = config_with_order(&["cli", "bundler", "renderer"]);
    config.order_check = OrderCheck::Strict;

    let result = run_release(repo.path(), config, "4.0.500", ScriptedRunner::new()).await;

    assert_run_failed_in(&result, Stage::ValidateVersion);
    assert!(matches!(
        result.result.as_ref().unwrap_err(),
        ReleaseError::Plan(PlanError::OrderViolations(_))
    ));
    assert!(result.runner.calls().is_empty());
    assert_eq!(snapshot(repo.path()), before);
}

/// A publishable dependency missing from the list is an error
#[tokio::test]
async fn test_unlisted_dependency_is_rejected() {
    let repo = three_package_monorepo();
    let config = config_with_order(&["renderer", "cli"]);

    let result = run_release(repo.path(), config, "4.0.500", ScriptedRunner::new()).await;

    assert_run_failed_in(&result, Stage::ValidateVersion);
    match result.result.as_ref().unwrap_err() {
        ReleaseError::Plan(PlanError::UnlistedDependency { package, dependency }) => {
            assert_eq!(package, "renderer");
            assert_eq!(dependency, "bundler");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Listed packages must exist and be publishable
#[tokio::test]
async fn test_unknown_and_private_packages_are_rejected() {
    let repo = three_package_monorepo();
    write_package(
        repo.path(),
        "docs",
        "{\n  \"name\": \"@reel/docs\",\n  \"version\": \"4.0.499\",\n  \"private\": true\n}\n",
    );

    let result = run_release(
        repo.path(),
        config_with_order(&["bundler", "renderer", "cli", "lambda"]),
        "4.0.500",
        ScriptedRunner::new(),
    )
    .await;
    assert!(matches!(
        result.result.as_ref().unwrap_err(),
        ReleaseError::Plan(PlanError::UnknownPackage(id)) if id == "lambda"
    ));

    let result = run_release(
        repo.path(),
        config_with_order(&["bundler", "renderer", "cli", "docs"]),
        "4.0.500",
        ScriptedRunner::new(),
    )
    .await;
    assert!(matches!(
        result.result.as_ref().unwrap_err(),
        ReleaseError::Plan(PlanError::PrivatePackage(id)) if id == "docs"
    ));
}

const CYCLIC_BUNDLER: &str = r#"{
  "name": "@reel/bundler",
  "version": "4.0.499",
  "peerDependencies": {
    "@reel/cli": "workspace:^"
  }
}
"#;

/// Dependency cycles cannot be ordered
#[tokio::test]
async fn test_cycle_is_rejected() {
    let repo = three_package_monorepo();
    write_package(repo.path(), "bundler", CYCLIC_BUNDLER);

    let result = run_release(
        repo.path(),
        config_with_order(&["bundler", "renderer", "cli"]),
        "4.0.500",
        ScriptedRunner::new(),
    )
    .await;

    assert_run_failed_in(&result, Stage::ValidateVersion);
    assert!(matches!(
        result.result.as_ref().unwrap_err(),
        ReleaseError::Plan(PlanError::Cycle(ids)) if ids.len() == 3
    ));
}

/// Strict mode names the cycle, not the order mistakes it implies
#[tokio::test]
async fn test_strict_mode_reports_cycle_first() {
    let repo = three_package_monorepo();
    write_package(repo.path(), "bundler", CYCLIC_BUNDLER);
    let mut config = config_with_order(&["bundler", "renderer", "cli"]);
    config.order_check = OrderCheck::Strict;

    let result = run_release(repo.path(), config, "4.0.500", ScriptedRunner::new()).await;

    assert_run_failed_in(&result, Stage::ValidateVersion);
    match result.result.as_ref().unwrap_err() {
        ReleaseError::Plan(PlanError::Cycle(ids)) => {
            assert_eq!(ids, &vec!["bundler", "renderer", "cli"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
