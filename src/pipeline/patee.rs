// file: src/pipeline/patee.rs
// description: pipeline coordinator that builds, validates and drives the step chain
// reference: sequential fold of step results through a chosen executor

use crate::builder::StepsBuilder;
use crate::error::{PateeError, Result};
use crate::models::{PipelineContext, PipelineSource, RunContext, StepMetadata, StepResult};
use crate::pipeline::executor::{
    IntelligentPersistenceStepsExecutor, NonPersistentStepsExecutor, PersistentStepsExecutor,
    StepInput, StepsExecutor,
};
use crate::pipeline::marker::RunMarker;
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::pipeline::spec::PipelineSpec;
use crate::steps::Step;
use crate::utils::Validator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How step outputs are handled when an output directory is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Never touch the filesystem.
    Memory,
    /// Recompute and persist every step.
    Persistent,
    /// Reuse persisted steps whose fingerprint still matches.
    #[default]
    Cached,
}

impl FromStr for ExecutionMode {
    type Err = PateeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "persistent" => Ok(Self::Persistent),
            "cached" => Ok(Self::Cached),
            other => Err(PateeError::Config(format!(
                "unknown execution mode '{}', expected memory, persistent or cached",
                other
            ))),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Persistent => "persistent",
            Self::Cached => "cached",
        };
        f.write_str(name)
    }
}

/// A built step together with its identity in the pipeline.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Arc<Step>,
    pub metadata: StepMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Stopped { step: String },
}

#[derive(Debug)]
pub struct RunResult {
    pub status: RunStatus,
    pub result: StepResult,
    /// Steps that produced a result, cached ones included, in order.
    pub executed_steps: Vec<String>,
    pub stats: PipelineStats,
}

#[derive(Debug, Clone)]
pub struct Patee {
    steps: Arc<[StepRecord]>,
    pipeline: PipelineContext,
    mode: ExecutionMode,
    progress: Option<bool>,
}

impl Patee {
    /// Loads a YAML pipeline file. Relative paths in step configuration are
    /// resolved against the file's directory.
    pub fn load_from(path: &Path, builder: &dyn StepsBuilder) -> Result<Self> {
        Validator::validate_file_path(path)?;
        let spec = PipelineSpec::from_path(path)?;
        Self::from_spec(&spec, builder, PipelineContext::for_config_file(path))
    }

    /// Builds every step eagerly; fails before anything runs when a name is
    /// invalid or repeated, a type is unknown or the shape is wrong.
    pub fn from_spec(
        spec: &PipelineSpec,
        builder: &dyn StepsBuilder,
        pipeline: PipelineContext,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(spec.steps.len());

        for (idx, step_spec) in spec.steps.iter().enumerate() {
            let name = step_spec.resolved_name();
            Validator::validate_step_name(name)?;
            if !seen.insert(name.to_string()) {
                return Err(PateeError::DuplicateStepName(name.to_string()));
            }

            let step = builder.build(&step_spec.step_type, name, &step_spec.config)?;
            debug!("Built step {} '{}' ({})", idx, name, step_spec.step_type);
            records.push(StepRecord {
                step: Arc::new(step),
                metadata: StepMetadata::new(name, &step_spec.step_type, idx, &step_spec.config),
            });
        }

        check_shape(&records)?;

        Ok(Self {
            steps: records.into(),
            pipeline,
            mode: ExecutionMode::default(),
            progress: None,
        })
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Draws a progress bar during [`run`](Self::run).
    pub fn with_progress(mut self, colored: bool) -> Self {
        self.progress = Some(colored);
        self
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn pipeline_context(&self) -> &PipelineContext {
        &self.pipeline
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|r| r.metadata.name.as_str()).collect()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<()> {
        check_shape(&self.steps)
    }

    /// Drops the named step. Shape is checked again on the next run.
    pub fn remove_step(&mut self, step_name: &str) -> bool {
        let before = self.steps.len();
        let kept: Vec<StepRecord> = self
            .steps
            .iter()
            .filter(|r| r.metadata.name != step_name)
            .cloned()
            .collect();
        self.steps = kept.into();
        self.steps.len() != before
    }

    /// Runs every step in order, stopping at the first halt. Without an
    /// output directory nothing is written to disk.
    pub fn process(&self, source: &PipelineSource, out_dir: Option<&Path>) -> Result<StepResult> {
        let tracker = ProgressTracker::hidden(self.steps.len());
        let (result, _) = self.drive(source, out_dir, &tracker)?;
        Ok(result)
    }

    /// Like [`process`](Self::process), reporting which steps ran and why
    /// the run ended.
    pub fn run(&self, source: &PipelineSource, out_dir: Option<&Path>) -> Result<RunResult> {
        let tracker = match self.progress {
            Some(colored) => ProgressTracker::with_color(self.steps.len(), colored),
            None => ProgressTracker::hidden(self.steps.len()),
        };

        let (result, executed_steps) = self.drive(source, out_dir, &tracker)?;
        tracker.finish();

        let status = match executed_steps.last() {
            Some(step) if result.should_stop_pipeline() => RunStatus::Stopped {
                step: step.clone(),
            },
            _ => RunStatus::Succeeded,
        };

        Ok(RunResult {
            status,
            result,
            executed_steps,
            stats: tracker.get_stats(),
        })
    }

    fn executor_for(&self, out_dir: Option<&Path>) -> Box<dyn StepsExecutor> {
        match (out_dir, self.mode) {
            (None, _) | (Some(_), ExecutionMode::Memory) => {
                Box::new(NonPersistentStepsExecutor::new())
            }
            (Some(dir), ExecutionMode::Persistent) => Box::new(PersistentStepsExecutor::new(dir)),
            (Some(dir), ExecutionMode::Cached) => {
                Box::new(IntelligentPersistenceStepsExecutor::new(dir))
            }
        }
    }

    fn drive(
        &self,
        source: &PipelineSource,
        out_dir: Option<&Path>,
        tracker: &ProgressTracker,
    ) -> Result<(StepResult, Vec<String>)> {
        self.validate()?;
        source.validate()?;

        let persisted_dir = out_dir.filter(|_| self.mode != ExecutionMode::Memory);
        let run = RunContext::new(persisted_dir.map(Path::to_path_buf), source.fingerprint());
        if let Some(dir) = persisted_dir {
            fs::create_dir_all(dir).map_err(|e| PateeError::persistence(dir, e))?;
            RunMarker::new(&run.source_hash, run.run_id, self.names_owned()).write(dir)?;
        }

        info!(
            "Running {} steps over {} ({} mode, run {})",
            self.steps.len(),
            source,
            if persisted_dir.is_some() { self.mode } else { ExecutionMode::Memory },
            run.run_id
        );

        let mut executor = self.executor_for(persisted_dir);
        executor.start(&self.pipeline, &run);

        let mut executed = Vec::with_capacity(self.steps.len());
        let (first, rest) = self
            .steps
            .split_first()
            .ok_or_else(|| PateeError::InvalidPipelineShape("pipeline has no steps".to_string()))?;

        let mut result =
            execute_record(executor.as_mut(), first, StepInput::Source(source), tracker)?;
        executed.push(first.metadata.name.clone());

        for record in rest {
            let context = match result.into_context() {
                Some(context) => context,
                None => return Ok((StepResult::stop(), executed)),
            };
            let input = StepInput::Context(context);
            result = execute_record(executor.as_mut(), record, input, tracker)?;
            executed.push(record.metadata.name.clone());
        }

        Ok((result, executed))
    }

    fn names_owned(&self) -> Vec<String> {
        self.steps.iter().map(|r| r.metadata.name.clone()).collect()
    }
}

fn execute_record(
    executor: &mut dyn StepsExecutor,
    record: &StepRecord,
    input: StepInput<'_>,
    tracker: &ProgressTracker,
) -> Result<StepResult> {
    let name = &record.metadata.name;
    tracker.start_step(name);
    debug!("Step {} '{}' started", record.metadata.idx, name);

    let result = executor.execute(&record.step, &record.metadata, input)?;

    if result.is_skipped() {
        tracker.inc_steps_skipped();
    } else {
        tracker.inc_steps_executed();
    }
    if result.should_stop_pipeline() {
        warn!("Pipeline stopped at step '{}'", name);
    } else {
        debug!("Step '{}' finished (skipped: {})", name, result.is_skipped());
    }
    Ok(result)
}

fn check_shape(steps: &[StepRecord]) -> Result<()> {
    let (first, rest) = steps
        .split_first()
        .ok_or_else(|| PateeError::InvalidPipelineShape("pipeline has no steps".to_string()))?;

    if !first.step.is_extractor() {
        return Err(PateeError::InvalidPipelineShape(format!(
            "first step '{}' must be an extractor",
            first.metadata.name
        )));
    }

    if let Some(record) = rest.iter().find(|r| !r.step.is_processor()) {
        return Err(PateeError::InvalidPipelineShape(format!(
            "step '{}' must be a processor, only the first step extracts",
            record.metadata.name
        )));
    }

    Ok(())
}
