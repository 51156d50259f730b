//! Release events and the reporter that receives them

use crate::{
    core::{OrderViolation, ReleaseVersion, Stage, StageStatus, StepResult},
    execution::propagator::PropagationReport,
};
use uuid::Uuid;

/// Events that can occur during a release run
#[derive(Debug, Clone)]
pub enum ReleaseEvent {
    RunStarted {
        run_id: Uuid,
        input: String,
        dry_run: bool,
    },
    StageStarted {
        stage: Stage,
    },
    StageFinished {
        stage: Stage,
        status: StageStatus,
    },
    PlanResolved {
        version: ReleaseVersion,
        order: Vec<String>,
        violations: Vec<OrderViolation>,
        excluded: Vec<String>,
    },
    PropagationFinished {
        report: PropagationReport,
    },
    StepStarted {
        description: String,
        command: String,
        package: Option<String>,
    },
    StepFinished {
        description: String,
        package: Option<String>,
        result: StepResult,
    },
    RunCompleted {
        run_id: Uuid,
        version: ReleaseVersion,
        published: Vec<String>,
        warnings: Vec<String>,
        install_hint: String,
    },
    RunFailed {
        run_id: Uuid,
        stage: Stage,
        package: Option<String>,
        error: String,
        published: Vec<String>,
        untagged: Vec<String>,
    },
}

/// Receives every event of a run
///
/// Reporting never affects control flow.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &ReleaseEvent);
}

impl<F> Reporter for F
where
    F: Fn(&ReleaseEvent) + Send + Sync,
{
    fn report(&self, event: &ReleaseEvent) {
        self(event)
    }
}

/// Reporter that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _event: &ReleaseEvent) {}
}
