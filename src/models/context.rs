// file: src/models/context.rs
// description: pipeline, run and step scoped execution contexts
// reference: internal data structures

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Where a pipeline definition was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub config_path: Option<PathBuf>,
    pub execution_path: PathBuf,
}

impl PipelineContext {
    pub fn new(config_path: Option<PathBuf>, execution_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path,
            execution_path: execution_path.into(),
        }
    }

    pub fn for_config_file(config_path: &Path) -> Self {
        let execution_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(Some(config_path.to_path_buf()), execution_path)
    }

    /// Resolves a path from step configuration: relative paths are taken
    /// from the pipeline file's directory, or the execution path when the
    /// pipeline was not loaded from a file.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let base = self
            .config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(&self.execution_path);
        base.join(path)
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        let execution_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(None, execution_path)
    }
}

/// One invocation of the pipeline over one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: Uuid,
    pub output_dir: Option<PathBuf>,
    pub source_hash: String,
}

impl RunContext {
    pub fn new(output_dir: Option<PathBuf>, source_hash: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            output_dir,
            source_hash: source_hash.into(),
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(None, String::new())
    }
}

/// What a step sees while it runs.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub pipeline: &'a PipelineContext,
    pub run: &'a RunContext,
    /// Directory owned by the step; `None` in non-persistent runs.
    pub step_dir: Option<&'a Path>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        pipeline: &'a PipelineContext,
        run: &'a RunContext,
        step_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            pipeline,
            run,
            step_dir,
        }
    }
}
