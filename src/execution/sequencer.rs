//! Per-package publish and tag sequences
//!
//! Both sequences walk a package list in order, one step per package, and
//! stop at the first fatal step.

use crate::{
    core::{
        CommandTemplate, FailurePolicy, PackageDescriptor, RegistryNaming, ReleaseVersion,
        StepResult, StepSpec,
    },
    execution::executor::StepExecutor,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info};

/// The step that halted a sequence
#[derive(Debug, Clone)]
pub struct SequenceFailure {
    pub package: String,
    pub description: String,
    pub result: StepResult,

    /// Packages after the failing one, never attempted
    pub remaining: Vec<String>,
}

/// How far a sequence got
#[derive(Debug, Clone, Default)]
pub struct SequenceOutcome {
    /// Packages whose step succeeded, in order
    pub completed: Vec<String>,
    pub failure: Option<SequenceFailure>,
}

impl SequenceOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

fn variables(
    version: &ReleaseVersion,
    package: &str,
    name: &str,
    tag: &str,
) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("version".to_string(), version.to_string());
    vars.insert("package".to_string(), package.to_string());
    vars.insert("name".to_string(), name.to_string());
    vars.insert("tag".to_string(), tag.to_string());
    vars
}

async fn run_sequence(executor: &StepExecutor, steps: Vec<(String, StepSpec)>) -> SequenceOutcome {
    let mut outcome = SequenceOutcome::default();
    let ids: Vec<String> = steps.iter().map(|(id, _)| id.clone()).collect();

    for (index, (id, step)) in steps.into_iter().enumerate() {
        let result = executor.execute(&step).await;
        if result.is_fatal() {
            let remaining = ids[index + 1..].to_vec();
            error!(
                "{} failed; {} package(s) not attempted",
                step.description,
                remaining.len()
            );
            outcome.failure = Some(SequenceFailure {
                package: id,
                description: step.description,
                result,
                remaining,
            });
            return outcome;
        }
        outcome.completed.push(id);
    }

    outcome
}

/// Publishes packages one at a time, in plan order
pub struct PublishSequencer<'a> {
    executor: &'a StepExecutor,
    command: &'a CommandTemplate,
    dist_tag: &'a str,
    policy: FailurePolicy,
}

impl<'a> PublishSequencer<'a> {
    pub fn new(executor: &'a StepExecutor, command: &'a CommandTemplate, dist_tag: &'a str) -> Self {
        Self {
            executor,
            command,
            dist_tag,
            policy: FailurePolicy::Fatal,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Invoke the publish command in each package directory
    pub async fn publish(&self, packages: &[PackageDescriptor], version: &ReleaseVersion) -> SequenceOutcome {
        info!("Publishing {} packages at {}", packages.len(), version);

        let steps = packages
            .iter()
            .map(|package| {
                let vars = variables(version, &package.id, &package.registry_name, self.dist_tag);
                let step = StepSpec::from_template(
                    self.command,
                    &vars,
                    &package.dir,
                    format!("publish {}", package.registry_name),
                )
                .for_package(&package.id)
                .with_policy(self.policy);
                (package.id.clone(), step)
            })
            .collect();

        run_sequence(self.executor, steps).await
    }
}

/// Attaches the dist-tag to every published package
pub struct TagSequencer<'a> {
    executor: &'a StepExecutor,
    command: &'a CommandTemplate,
    naming: &'a RegistryNaming,
    dist_tag: &'a str,
    root: &'a Path,
    policy: FailurePolicy,
}

impl<'a> TagSequencer<'a> {
    pub fn new(
        executor: &'a StepExecutor,
        command: &'a CommandTemplate,
        naming: &'a RegistryNaming,
        dist_tag: &'a str,
        root: &'a Path,
    ) -> Self {
        Self {
            executor,
            command,
            naming,
            dist_tag,
            root,
            policy: FailurePolicy::Fatal,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Tag `name@version` for each published identifier, in order
    pub async fn tag(&self, published: &[String], version: &ReleaseVersion) -> SequenceOutcome {
        info!("Tagging {} packages as {}", published.len(), self.dist_tag);

        let steps = published
            .iter()
            .map(|id| {
                let name = self.naming.registry_name(id);
                let vars = variables(version, id, &name, self.dist_tag);
                let step = StepSpec::from_template(
                    self.command,
                    &vars,
                    self.root,
                    format!("tag {}@{} as {}", name, version, self.dist_tag),
                )
                .for_package(id)
                .with_policy(self.policy);
                (id.clone(), step)
            })
            .collect();

        run_sequence(self.executor, steps).await
    }
}
