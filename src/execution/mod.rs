//! Release execution engine

pub mod engine;
pub mod events;
pub mod executor;
pub mod propagator;
pub mod sequencer;

pub use engine::{stage_policy, ReleaseEngine, StageDefinition, RELEASE_STAGES};
pub use events::{ReleaseEvent, Reporter, SilentReporter};
pub use executor::{DryRunRunner, ProcessRunner, StepExecutor, StepRunner};
pub use propagator::{PropagationReport, VersionPropagator};
pub use sequencer::{PublishSequencer, SequenceFailure, SequenceOutcome, TagSequencer};
