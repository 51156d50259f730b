//! Step executor - runs individual external steps

use crate::{
    core::{ExitSignal, StepOutcome, StepResult, StepSpec},
    execution::events::{ReleaseEvent, Reporter},
};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Starts a step and waits for it to end
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run the step to completion
    ///
    /// An `Err` means the process could not be started at all.
    async fn run(&self, step: &StepSpec) -> std::io::Result<ExitSignal>;
}

/// Runs steps as child processes with inherited standard streams
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl StepRunner for ProcessRunner {
    async fn run(&self, step: &StepSpec) -> std::io::Result<ExitSignal> {
        debug!(
            "Spawning `{}` in {}",
            step.command_line(),
            step.working_dir.display()
        );

        let status = Command::new(&step.program)
            .args(&step.args)
            .current_dir(&step.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await?;

        Ok(match status.code() {
            Some(code) => ExitSignal::Code(code),
            None => ExitSignal::Signal,
        })
    }
}

/// Logs each step and reports success without running anything
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRunner;

#[async_trait]
impl StepRunner for DryRunRunner {
    async fn run(&self, step: &StepSpec) -> std::io::Result<ExitSignal> {
        info!(
            "[dry-run] would run `{}` in {}",
            step.command_line(),
            step.working_dir.display()
        );
        Ok(ExitSignal::Code(0))
    }
}

/// Executes a single step and classifies its outcome
pub struct StepExecutor {
    runner: Arc<dyn StepRunner>,
    reporter: Arc<dyn Reporter>,
}

impl StepExecutor {
    pub fn new(runner: Arc<dyn StepRunner>, reporter: Arc<dyn Reporter>) -> Self {
        Self { runner, reporter }
    }

    /// Execute a step and return the result
    pub async fn execute(&self, step: &StepSpec) -> StepResult {
        let command = step.command_line();
        info!("Executing step: {}", step.description);

        self.reporter.report(&ReleaseEvent::StepStarted {
            description: step.description.clone(),
            command: command.clone(),
            package: step.package.clone(),
        });

        let result = match self.runner.run(step).await {
            Ok(exit) => StepResult::classify(exit, step.policy, &command),
            Err(e) => StepResult::not_started(format!(
                "failed to start `{}` in {}: {}",
                step.program,
                step.working_dir.display(),
                e
            )),
        };

        match result.outcome {
            StepOutcome::Success => info!("Step {} completed successfully", step.description),
            StepOutcome::Tolerated => warn!(
                "Step {} failed (tolerated): {}",
                step.description, result.diagnostic
            ),
            StepOutcome::Fatal => error!("Step {} failed: {}", step.description, result.diagnostic),
        }

        self.reporter.report(&ReleaseEvent::StepFinished {
            description: step.description.clone(),
            package: step.package.clone(),
            result: result.clone(),
        });

        result
    }
}
