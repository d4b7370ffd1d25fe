// file: src/steps/text_reader.rs
// description: extractor that reads a pair of plain UTF-8 text files
// reference: https://doc.rust-lang.org/std/fs/fn.read_to_string.html

use crate::error::{PateeError, Result};
use crate::models::{
    DocumentContext, DocumentPairContext, DocumentSource, MonolingualSingleFile,
    MonolingualSingleFilePair, PipelineSource, StepConfig, StepContext, StepResult,
};
use crate::steps::ExtractStep;
use std::fs;
use tracing::debug;

pub struct TextReaderExtractor {
    name: String,
    split_paragraphs: bool,
}

impl TextReaderExtractor {
    pub const STEP_TYPE: &'static str = "text_extractor";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            split_paragraphs: false,
        }
    }

    pub fn from_config(name: &str, config: &StepConfig) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            split_paragraphs: config.get_bool("split_paragraphs")?.unwrap_or(false),
        })
    }

    pub fn split_paragraphs(&self) -> bool {
        self.split_paragraphs
    }

    fn extract_file_pair(&self, source: &MonolingualSingleFilePair) -> Result<StepResult> {
        let document_1 = self.read_document(&source.document_1)?;
        let document_2 = self.read_document(&source.document_2)?;

        debug!(
            "Read {} + {} text blocks from file pair",
            document_1.text_blocks.len(),
            document_2.text_blocks.len()
        );

        Ok(StepResult::proceed(DocumentPairContext::new(
            document_1, document_2,
        )))
    }

    fn read_document(&self, file: &MonolingualSingleFile) -> Result<DocumentContext> {
        let text = fs::read_to_string(&file.document_path).map_err(|e| {
            PateeError::Config(format!(
                "Cannot read document {}: {}",
                file.document_path.display(),
                e
            ))
        })?;

        Ok(DocumentContext::new(
            DocumentSource::from_monolingual_file(file),
            self.to_blocks(&text),
        ))
    }

    fn to_blocks(&self, text: &str) -> Vec<String> {
        if !self.split_paragraphs {
            return vec![text.to_string()];
        }

        let normalized = text.replace("\r\n", "\n");
        normalized
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ExtractStep for TextReaderExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, _context: &StepContext<'_>, source: &PipelineSource) -> Result<StepResult> {
        match source {
            PipelineSource::FilePair(pair) => self.extract_file_pair(pair),
            other => Err(PateeError::UnsupportedSourceType {
                step: self.name.clone(),
                source_kind: other.kind().to_string(),
            }),
        }
    }
}
