//! Execution state models

use crate::core::version::ReleaseVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall release run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Run is currently executing a stage
    Running,
    /// Every stage finished and the run reached DONE
    Completed,
    /// A stage halted the run
    Failed,
}

/// Stages of the release pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    ValidateVersion,
    PropagateVersion,
    InstallDependencies,
    Build,
    PublishAll,
    TagAll,
    Done,
}

impl Stage {
    /// Every stage, terminal state last
    pub const ALL: [Stage; 7] = [
        Stage::ValidateVersion,
        Stage::PropagateVersion,
        Stage::InstallDependencies,
        Stage::Build,
        Stage::PublishAll,
        Stage::TagAll,
        Stage::Done,
    ];

    /// 1-based position in the pipeline
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).map_or(0, |i| i + 1)
    }

    /// Progress label shown to the operator
    pub fn label(&self) -> &'static str {
        match self {
            Stage::ValidateVersion => "Validating version and publish order",
            Stage::PropagateVersion => "Writing version to manifests",
            Stage::InstallDependencies => "Installing dependencies",
            Stage::Build => "Building packages",
            Stage::PublishAll => "Publishing packages",
            Stage::TagAll => "Tagging releases",
            Stage::Done => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ValidateVersion => "VALIDATE_VERSION",
            Stage::PropagateVersion => "PROPAGATE_VERSION",
            Stage::InstallDependencies => "INSTALL_DEPENDENCIES",
            Stage::Build => "BUILD",
            Stage::PublishAll => "PUBLISH_ALL",
            Stage::TagAll => "TAG_ALL",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// State of a single stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running {
        started_at: DateTime<Utc>,
    },
    Succeeded {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Failed under a tolerated policy; the run went on
    Tolerated {
        warning: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
}

impl StageStatus {
    /// Whether the next stage may start
    pub fn allows_transition(&self) -> bool {
        matches!(self, StageStatus::Succeeded { .. } | StageStatus::Tolerated { .. })
    }

    fn started_at(&self) -> DateTime<Utc> {
        match self {
            StageStatus::Running { started_at }
            | StageStatus::Succeeded { started_at, .. }
            | StageStatus::Tolerated { started_at, .. }
            | StageStatus::Failed { started_at, .. } => *started_at,
            StageStatus::Pending => Utc::now(),
        }
    }
}

/// Run-scoped state of one release attempt
///
/// Lives only as long as the process; nothing is persisted between runs.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Correlates log lines of one run
    pub run_id: Uuid,

    pub status: RunStatus,

    /// Accepted version, set once validation passes
    pub version: Option<ReleaseVersion>,

    /// Stage the run is in, or halted in
    pub current_stage: Stage,

    stages: Vec<(Stage, StageStatus)>,

    /// Packages to process, in resolved publish order
    pub packages: Vec<String>,

    /// Packages published so far, in order
    pub published: Vec<String>,

    /// Packages tagged so far, in order
    pub tagged: Vec<String>,

    pub warnings: Vec<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            version: None,
            current_stage: Stage::ValidateVersion,
            stages: Stage::ALL
                .iter()
                .filter(|s| **s != Stage::Done)
                .map(|s| (*s, StageStatus::Pending))
                .collect(),
            packages: Vec::new(),
            published: Vec::new(),
            tagged: Vec::new(),
            warnings: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark run as started
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark run as completed; it rests in DONE
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.current_stage = Stage::Done;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed in its current stage
    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    pub fn begin_stage(&mut self, stage: Stage) {
        self.current_stage = stage;
        self.set_stage(
            stage,
            StageStatus::Running {
                started_at: Utc::now(),
            },
        );
    }

    pub fn succeed_stage(&mut self, stage: Stage) {
        let started_at = self.started_at_of(stage);
        self.set_stage(
            stage,
            StageStatus::Succeeded {
                started_at,
                finished_at: Utc::now(),
            },
        );
    }

    /// Record a tolerated failure; the warning is kept on the run
    pub fn tolerate_stage(&mut self, stage: Stage, warning: String) {
        let started_at = self.started_at_of(stage);
        self.warnings.push(warning.clone());
        self.set_stage(
            stage,
            StageStatus::Tolerated {
                warning,
                started_at,
                finished_at: Utc::now(),
            },
        );
    }

    pub fn fail_stage(&mut self, stage: Stage, error: String) {
        let started_at = self.started_at_of(stage);
        self.current_stage = stage;
        self.set_stage(
            stage,
            StageStatus::Failed {
                error,
                started_at,
                failed_at: Utc::now(),
            },
        );
    }

    pub fn stage_status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.iter().find(|(s, _)| *s == stage).map(|(_, status)| status)
    }

    /// Per-stage status, in pipeline order
    pub fn stages(&self) -> &[(Stage, StageStatus)] {
        &self.stages
    }

    /// Whether the stage was entered at all
    pub fn reached(&self, stage: Stage) -> bool {
        if stage == Stage::Done {
            return self.status == RunStatus::Completed;
        }
        !matches!(self.stage_status(stage), None | Some(StageStatus::Pending))
    }

    /// Published packages that still lack the release tag
    pub fn untagged(&self) -> Vec<String> {
        self.published
            .iter()
            .filter(|id| !self.tagged.contains(id))
            .cloned()
            .collect()
    }

    fn started_at_of(&self, stage: Stage) -> DateTime<Utc> {
        self.stage_status(stage).map_or_else(Utc::now, StageStatus::started_at)
    }

    fn set_stage(&mut self, stage: Stage, status: StageStatus) {
        if let Some(entry) = self.stages.iter_mut().find(|(s, _)| *s == stage) {
            entry.1 = status;
        }
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}
