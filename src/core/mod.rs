//! Core domain models for the release pipeline
//!
//! This module defines the data the pipeline works on: the accepted
//! version, packages and their publish order, steps and their outcomes,
//! and the state of a run.

pub mod config;
pub mod error;
pub mod order;
pub mod package;
pub mod state;
pub mod step;
pub mod version;

pub use config::{OrderCheck, ReleaseConfig};
pub use error::{ConfigError, PlanError, PropagationError, ReleaseError, WorkspaceError};
pub use order::{DependencyGraph, OrderViolation, PublishOrder, PublishPlan};
pub use package::{PackageDescriptor, PackageManifest, RegistryNaming, Workspace};
pub use state::*;
pub use step::*;
pub use version::{ReleaseVersion, VersionPolicy};
