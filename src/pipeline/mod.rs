// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod executor;
mod inspect;
mod marker;
mod patee;
mod progress;
mod spec;

pub use executor::{
    ENGINE_VERSION, IntelligentPersistenceStepsExecutor, NonPersistentStepsExecutor,
    PersistentStepsExecutor, StepInput, StepsExecutor, step_fingerprint,
};
pub use inspect::{OutputReport, Sentinel, StepStatus, inspect_output};
pub use marker::{MARKER_FILE, RunMarker, StepMarker};
pub use patee::{ExecutionMode, Patee, RunResult, RunStatus, StepRecord};
pub use progress::{PipelineStats, ProgressTracker};
pub use spec::{PipelineSpec, StepSpec};
