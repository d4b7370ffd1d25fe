// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod builder;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod steps;
pub mod utils;

pub use builder::{StepFactory, StepRegistry, StepsBuilder};
pub use config::{AppConfig, ExecutionConfig, LoggingConfig, PipelineFileConfig};
pub use error::{PateeError, Result};
pub use models::{
    DocumentContext, DocumentPairContext, DocumentSource, MonolingualSingleFile,
    MonolingualSingleFilePair, MultilingualSingleFile, PageInfo, PipelineContext, PipelineSource,
    RunContext, StepConfig, StepContext, StepMetadata, StepResult,
};
pub use pipeline::{
    ExecutionMode, OutputReport, Patee, PipelineSpec, PipelineStats, ProgressTracker, RunResult,
    RunStatus, StepSpec, inspect_output,
};
pub use steps::{ExtractStep, ProcessStep, Step};
pub use utils::Validator;
