//! Error types for the release pipeline

use crate::core::{
    order::OrderViolation,
    state::Stage,
    step::{ExitSignal, StepResult},
};
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for any fatal halt that has no child exit code to propagate
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for usage and validation failures
pub const EXIT_USAGE: i32 = 2;

/// Errors raised while loading the release configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors raised while reading or writing workspace files
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to list packages in {path}: {source}")]
    ListPackages {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} does not contain a JSON object")]
    NotAnObject(PathBuf),

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while resolving the publish plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Package '{0}' is in the publish order but was not found in the workspace")]
    UnknownPackage(String),

    #[error("Package '{0}' is in the publish order but its manifest is marked private")]
    PrivatePackage(String),

    #[error(
        "Package '{package}' depends on '{dependency}' through a workspace reference, \
         but '{dependency}' is not in the publish order"
    )]
    UnlistedDependency { package: String, dependency: String },

    #[error("Dependency cycle between packages: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error(
        "Publish order does not respect dependencies: {}",
        .0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
    )]
    OrderViolations(Vec<OrderViolation>),
}

/// Version propagation stopped part way through
#[derive(Debug, Error)]
#[error("Version propagation stopped after {updated} of {total} files: {source}")]
pub struct PropagationError {
    /// Files already at the new version when propagation stopped
    pub updated: usize,
    /// Files targeted by propagation
    pub total: usize,
    #[source]
    pub source: WorkspaceError,
}

/// A fatal halt of the release pipeline
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Invalid release version '{input}': expected {expected}")]
    InvalidVersion { input: String, expected: String },

    #[error("Could not resolve the publish plan: {0}")]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error("{stage}: {description} could not be started: {diagnostic}")]
    StepNotStarted {
        stage: Stage,
        package: Option<String>,
        description: String,
        diagnostic: String,
    },

    #[error("{stage}: {description} failed: {diagnostic}")]
    StepFailed {
        stage: Stage,
        package: Option<String>,
        description: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },
}

impl ReleaseError {
    /// Build the error for a fatal step result
    pub fn from_step(
        stage: Stage,
        package: Option<String>,
        description: impl Into<String>,
        result: StepResult,
    ) -> Self {
        let description = description.into();
        match result.exit {
            ExitSignal::NotStarted => ReleaseError::StepNotStarted {
                stage,
                package,
                description,
                diagnostic: result.diagnostic,
            },
            exit => ReleaseError::StepFailed {
                stage,
                package,
                description,
                exit_code: exit.code(),
                diagnostic: result.diagnostic,
            },
        }
    }

    /// Package the failure is attributed to, if any
    pub fn package(&self) -> Option<&str> {
        match self {
            ReleaseError::StepNotStarted { package, .. }
            | ReleaseError::StepFailed { package, .. } => package.as_deref(),
            _ => None,
        }
    }

    /// Process exit code for this failure
    ///
    /// A failing child's own non-zero code is propagated, except
    /// [`EXIT_USAGE`], which is reserved for validation failures and maps
    /// to [`EXIT_FAILURE`] like everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::InvalidVersion { .. } => EXIT_USAGE,
            ReleaseError::StepFailed {
                exit_code: Some(code),
                ..
            } if *code != 0 && *code != EXIT_USAGE => *code,
            _ => EXIT_FAILURE,
        }
    }
}
