//! Main release engine - drives a run through the fixed stage sequence

use crate::{
    core::{
        CommandTemplate, FailurePolicy, PipelineRun, PublishOrder, PublishPlan, ReleaseConfig,
        ReleaseError, ReleaseVersion, Stage, StepOutcome, StepSpec, Workspace,
    },
    execution::{
        events::{ReleaseEvent, Reporter},
        executor::{StepExecutor, StepRunner},
        propagator::VersionPropagator,
        sequencer::{PublishSequencer, SequenceOutcome, TagSequencer},
    },
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A stage of the pipeline and how its failures are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDefinition {
    pub stage: Stage,
    pub policy: FailurePolicy,
}

/// The release pipeline, in execution order
pub const RELEASE_STAGES: [StageDefinition; 6] = [
    StageDefinition {
        stage: Stage::ValidateVersion,
        policy: FailurePolicy::Fatal,
    },
    StageDefinition {
        stage: Stage::PropagateVersion,
        policy: FailurePolicy::Fatal,
    },
    StageDefinition {
        stage: Stage::InstallDependencies,
        policy: FailurePolicy::Fatal,
    },
    StageDefinition {
        stage: Stage::Build,
        policy: FailurePolicy::Tolerated,
    },
    StageDefinition {
        stage: Stage::PublishAll,
        policy: FailurePolicy::Fatal,
    },
    StageDefinition {
        stage: Stage::TagAll,
        policy: FailurePolicy::Fatal,
    },
];

/// Failure policy of a stage; `Fatal` for anything not defined
pub fn stage_policy(stage: Stage) -> FailurePolicy {
    RELEASE_STAGES
        .iter()
        .find(|def| def.stage == stage)
        .map_or(FailurePolicy::Fatal, |def| def.policy)
}

/// Release pipeline engine
pub struct ReleaseEngine {
    config: ReleaseConfig,
    root: PathBuf,
    executor: StepExecutor,
    reporter: Arc<dyn Reporter>,
    dry_run: bool,
}

impl ReleaseEngine {
    pub fn new(
        config: ReleaseConfig,
        root: impl Into<PathBuf>,
        runner: Arc<dyn StepRunner>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            executor: StepExecutor::new(runner, reporter.clone()),
            config,
            root: root.into(),
            reporter,
            dry_run: false,
        }
    }

    /// Leave files untouched; steps go to whatever runner was given
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the version and resolve the publish plan
    ///
    /// Reads manifests only; nothing is written.
    pub fn plan(&self, input: &str) -> Result<(ReleaseVersion, PublishPlan), ReleaseError> {
        let version = ReleaseVersion::parse(input, &self.config.version)?;

        let workspace = Workspace::discover(
            &self.config.packages_root(&self.root),
            &self.config.template_set(),
            &self.config.naming(),
        )
        .map_err(crate::core::PlanError::from)?;

        let order = PublishOrder::new(self.config.publish_order.iter().cloned());
        let plan = PublishPlan::resolve(&order, &workspace, self.config.order_check)?;
        Ok((version, plan))
    }

    /// Execute the whole pipeline
    ///
    /// On failure the run is left in the stage that halted it.
    pub async fn execute(&self, run: &mut PipelineRun, input: &str) -> Result<(), ReleaseError> {
        info!("Starting release run {} for '{}'", run.run_id, input);
        run.start();
        self.reporter.report(&ReleaseEvent::RunStarted {
            run_id: run.run_id,
            input: input.to_string(),
            dry_run: self.dry_run,
        });

        match self.run_stages(run, input).await {
            Ok(version) => {
                run.complete();
                info!("Release {} completed: {} packages published", version, run.published.len());
                self.reporter.report(&ReleaseEvent::RunCompleted {
                    run_id: run.run_id,
                    version,
                    published: run.published.clone(),
                    warnings: run.warnings.clone(),
                    install_hint: self.install_hint(&version),
                });
                Ok(())
            }
            Err(e) => {
                let stage = run.current_stage;
                error!("Release halted in {}: {}", stage, e);
                run.fail_stage(stage, e.to_string());
                run.fail();
                self.finish_stage(run, stage);
                self.reporter.report(&ReleaseEvent::RunFailed {
                    run_id: run.run_id,
                    stage,
                    package: e.package().map(str::to_string),
                    error: e.to_string(),
                    published: run.published.clone(),
                    untagged: if stage == Stage::TagAll { run.untagged() } else { Vec::new() },
                });
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        run: &mut PipelineRun,
        input: &str,
    ) -> Result<ReleaseVersion, ReleaseError> {
        // VALIDATE_VERSION
        self.begin_stage(run, Stage::ValidateVersion);
        let (version, plan) = self.plan(input)?;
        run.version = Some(version);
        run.packages = plan.ids();
        for violation in &plan.violations {
            run.warnings.push(format!("Publish order: {}", violation));
        }
        self.reporter.report(&ReleaseEvent::PlanResolved {
            version,
            order: plan.ids(),
            violations: plan.violations.clone(),
            excluded: plan.excluded.clone(),
        });
        self.succeed_stage(run, Stage::ValidateVersion);

        // PROPAGATE_VERSION
        self.begin_stage(run, Stage::PropagateVersion);
        let report = VersionPropagator::new(&self.config, &self.root)
            .dry_run(self.dry_run)
            .propagate(&version)?;
        self.reporter.report(&ReleaseEvent::PropagationFinished { report });
        self.succeed_stage(run, Stage::PropagateVersion);

        // INSTALL_DEPENDENCIES
        self.run_root_step(
            run,
            Stage::InstallDependencies,
            &self.config.commands.install,
            &version,
            "install dependencies",
        )
        .await?;

        // BUILD
        self.run_root_step(
            run,
            Stage::Build,
            &self.config.commands.build,
            &version,
            "build packages",
        )
        .await?;

        // PUBLISH_ALL
        self.begin_stage(run, Stage::PublishAll);
        let outcome = PublishSequencer::new(
            &self.executor,
            &self.config.commands.publish,
            &self.config.dist_tag,
        )
        .with_policy(stage_policy(Stage::PublishAll))
        .publish(&plan.packages, &version)
        .await;
        run.published = outcome.completed.clone();
        self.finish_sequence(run, Stage::PublishAll, outcome)?;

        // TAG_ALL
        self.begin_stage(run, Stage::TagAll);
        let naming = self.config.naming();
        let published = run.published.clone();
        let outcome = TagSequencer::new(
            &self.executor,
            &self.config.commands.tag,
            &naming,
            &self.config.dist_tag,
            &self.root,
        )
        .with_policy(stage_policy(Stage::TagAll))
        .tag(&published, &version)
        .await;
        run.tagged = outcome.completed.clone();
        self.finish_sequence(run, Stage::TagAll, outcome)?;

        Ok(version)
    }

    /// Run a single command at the monorepo root under the stage's policy
    async fn run_root_step(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
        command: &CommandTemplate,
        version: &ReleaseVersion,
        description: &str,
    ) -> Result<(), ReleaseError> {
        self.begin_stage(run, stage);

        let mut vars = HashMap::new();
        vars.insert("version".to_string(), version.to_string());
        vars.insert("tag".to_string(), self.config.dist_tag.clone());
        let step = StepSpec::from_template(command, &vars, &self.root, description)
            .with_policy(stage_policy(stage));

        let result = self.executor.execute(&step).await;
        match result.outcome {
            StepOutcome::Success => {
                self.succeed_stage(run, stage);
                Ok(())
            }
            StepOutcome::Tolerated => {
                warn!("{} failed, continuing: {}", stage, result.diagnostic);
                run.tolerate_stage(stage, format!("{}: {}", stage, result.diagnostic));
                self.finish_stage(run, stage);
                Ok(())
            }
            StepOutcome::Fatal => Err(ReleaseError::from_step(stage, None, description, result)),
        }
    }

    fn finish_sequence(
        &self,
        run: &mut PipelineRun,
        stage: Stage,
        outcome: SequenceOutcome,
    ) -> Result<(), ReleaseError> {
        match outcome.failure {
            None => {
                self.succeed_stage(run, stage);
                Ok(())
            }
            Some(failure) => Err(ReleaseError::from_step(
                stage,
                Some(failure.package),
                failure.description,
                failure.result,
            )),
        }
    }

    fn begin_stage(&self, run: &mut PipelineRun, stage: Stage) {
        info!("[{}/{}] {}", stage.number(), RELEASE_STAGES.len(), stage.label());
        run.begin_stage(stage);
        self.reporter.report(&ReleaseEvent::StageStarted { stage });
    }

    fn succeed_stage(&self, run: &mut PipelineRun, stage: Stage) {
        run.succeed_stage(stage);
        self.finish_stage(run, stage);
    }

    fn finish_stage(&self, run: &PipelineRun, stage: Stage) {
        if let Some(status) = run.stage_status(stage) {
            self.reporter.report(&ReleaseEvent::StageFinished {
                stage,
                status: status.clone(),
            });
        }
    }

    fn install_hint(&self, version: &ReleaseVersion) -> String {
        format!("npm install {}@{}", self.config.workspace.core_name, version)
    }
}
