// file: src/steps/text_writer.rs
// description: processor that exports each document as a plain text file
// reference: https://doc.rust-lang.org/std/fs/fn.write.html

use crate::error::{PateeError, Result};
use crate::models::{DocumentContext, DocumentPairContext, StepConfig, StepContext, StepResult};
use crate::steps::ProcessStep;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct TextWriterProcessor {
    name: String,
    output_dir: PathBuf,
    separator: String,
}

impl TextWriterProcessor {
    pub const STEP_TYPE: &'static str = "write_to_file";

    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_dir: output_dir.into(),
            separator: "\n".to_string(),
        }
    }

    pub fn from_config(name: &str, config: &StepConfig) -> Result<Self> {
        let output_dir = config.get_str("output_dir")?.ok_or_else(|| {
            PateeError::Config(format!("step '{}' requires an 'output_dir'", name))
        })?;

        let mut step = Self::new(name, output_dir);
        if let Some(separator) = config.get_str("separator")? {
            step.separator = separator.to_string();
        }
        Ok(step)
    }

    fn write_document(&self, dir: &Path, document: &DocumentContext) -> Result<PathBuf> {
        let path = dir.join(format!(
            "{}_{}.txt",
            document.source.stem(),
            document.source.iso2_language
        ));
        fs::write(&path, document.text_blocks.join(&self.separator))
            .map_err(|e| PateeError::persistence(&path, e))?;
        Ok(path)
    }
}

impl ProcessStep for TextWriterProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &self,
        context: &StepContext<'_>,
        source: DocumentPairContext,
    ) -> Result<StepResult> {
        let dir = context.pipeline.resolve(&self.output_dir);
        fs::create_dir_all(&dir).map_err(|e| PateeError::Processing {
            step: self.name.clone(),
            message: format!("cannot create {}: {}", dir.display(), e),
        })?;

        let path_1 = self.write_document(&dir, &source.document_1)?;
        let path_2 = self.write_document(&dir, &source.document_2)?;
        info!(
            "Exported {} and {}",
            path_1.display(),
            path_2.display()
        );

        Ok(StepResult::proceed(source))
    }
}
