// file: src/builder/mod.rs
// description: table-driven registry mapping step type names to constructors
// reference: internal module structure

use crate::error::{PateeError, Result};
use crate::models::StepConfig;
use crate::steps::{
    CsvExtractor, HumanInTheLoopProcessor, NoopProcessor, Step, TextReaderExtractor,
    TextWriterProcessor,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Builds a step from its instance name and configuration.
pub type StepFactory = Arc<dyn Fn(&str, &StepConfig) -> Result<Step> + Send + Sync>;

pub trait StepsBuilder: Send + Sync {
    fn get_supported_step_types(&self) -> BTreeSet<String>;

    /// Fails with [`PateeError::UnsupportedStepType`] for unknown types.
    fn build(&self, step_type: &str, step_name: &str, config: &StepConfig) -> Result<Step>;
}

/// Explicitly constructed once by the program and shared with every
/// pipeline it loads.
#[derive(Clone, Default)]
pub struct StepRegistry {
    factories: BTreeMap<String, StepFactory>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in step type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TextReaderExtractor::STEP_TYPE, |name, config| {
            Ok(Step::extractor(TextReaderExtractor::from_config(name, config)?))
        });
        registry.register(CsvExtractor::STEP_TYPE, |name, config| {
            Ok(Step::extractor(CsvExtractor::from_config(name, config)?))
        });
        registry.register(NoopProcessor::STEP_TYPE, |name, _| {
            Ok(Step::processor(NoopProcessor::new(name)))
        });
        registry.register(HumanInTheLoopProcessor::STEP_TYPE, |name, _| {
            Ok(Step::processor(HumanInTheLoopProcessor::new(name)))
        });
        registry.register(TextWriterProcessor::STEP_TYPE, |name, config| {
            Ok(Step::processor(TextWriterProcessor::from_config(name, config)?))
        });
        registry
    }

    /// Registers a factory, replacing any previous one for the same type.
    pub fn register<F>(&mut self, step_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &StepConfig) -> Result<Step> + Send + Sync + 'static,
    {
        self.factories.insert(step_type.into(), Arc::new(factory));
        self
    }
}

impl StepsBuilder for StepRegistry {
    fn get_supported_step_types(&self) -> BTreeSet<String> {
        self.factories.keys().cloned().collect()
    }

    fn build(&self, step_type: &str, step_name: &str, config: &StepConfig) -> Result<Step> {
        let factory = self
            .factories
            .get(step_type)
            .ok_or_else(|| PateeError::UnsupportedStepType(step_type.to_string()))?;
        factory(step_name, config)
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("step_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
