// file: src/steps/mod.rs
// description: step capabilities (extractor / processor) and the built-in steps
// reference: internal module structure

mod csv_extractor;
mod human_in_the_loop;
mod noop;
mod text_reader;
mod text_writer;

pub use csv_extractor::CsvExtractor;
pub use human_in_the_loop::{CONTINUE_SENTINEL, HumanInTheLoopProcessor, STOP_SENTINEL};
pub use noop::NoopProcessor;
pub use text_reader::TextReaderExtractor;
pub use text_writer::TextWriterProcessor;

use crate::error::Result;
use crate::models::{DocumentPairContext, PipelineSource, StepContext, StepResult};
use std::fmt;

/// Turns the raw pipeline source into the first document pair.
pub trait ExtractStep: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, context: &StepContext<'_>, source: &PipelineSource) -> Result<StepResult>;
}

/// Transforms a document pair, or halts the pipeline.
pub trait ProcessStep: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, context: &StepContext<'_>, source: DocumentPairContext) -> Result<StepResult>;
}

pub enum Step {
    Extractor(Box<dyn ExtractStep>),
    Processor(Box<dyn ProcessStep>),
}

impl Step {
    pub fn extractor(step: impl ExtractStep + 'static) -> Self {
        Self::Extractor(Box::new(step))
    }

    pub fn processor(step: impl ProcessStep + 'static) -> Self {
        Self::Processor(Box::new(step))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Extractor(step) => step.name(),
            Self::Processor(step) => step.name(),
        }
    }

    pub fn capability(&self) -> &'static str {
        match self {
            Self::Extractor(_) => "extractor",
            Self::Processor(_) => "processor",
        }
    }

    pub fn is_extractor(&self) -> bool {
        matches!(self, Self::Extractor(_))
    }

    pub fn is_processor(&self) -> bool {
        matches!(self, Self::Processor(_))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name())
            .field("capability", &self.capability())
            .finish()
    }
}
