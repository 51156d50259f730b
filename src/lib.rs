//! release-pipeline - versions, builds, publishes and tags every package of
//! a monorepo in dependency order

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::{
    PipelineRun, PublishPlan, ReleaseConfig, ReleaseError, ReleaseVersion, RunStatus, Stage,
    StageStatus,
};
pub use execution::{
    DryRunRunner, ProcessRunner, ReleaseEngine, ReleaseEvent, Reporter, SilentReporter, StepRunner,
};
