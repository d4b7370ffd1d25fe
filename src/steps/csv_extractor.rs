// file: src/steps/csv_extractor.rs
// description: extractor for two-column parallel corpora stored as csv
// reference: https://docs.rs/csv

use crate::error::{PateeError, Result};
use crate::models::{
    DocumentContext, DocumentPairContext, DocumentSource, MultilingualSingleFile, PipelineSource,
    StepConfig, StepContext, StepResult,
};
use crate::steps::ExtractStep;
use tracing::{debug, warn};

pub struct CsvExtractor {
    name: String,
    delimiter: u8,
    has_headers: bool,
}

impl CsvExtractor {
    pub const STEP_TYPE: &'static str = "csv_extractor";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: b',',
            has_headers: true,
        }
    }

    pub fn from_config(name: &str, config: &StepConfig) -> Result<Self> {
        let delimiter = match config.get_str("delimiter")? {
            None => b',',
            Some(d) if d.len() == 1 && d.is_ascii() => d.as_bytes()[0],
            Some(d) if d == "\\t" => b'\t',
            Some(d) => {
                return Err(PateeError::Config(format!(
                    "csv delimiter must be a single ASCII character, got '{}'",
                    d
                )));
            }
        };

        Ok(Self {
            name: name.to_string(),
            delimiter,
            has_headers: config.get_bool("has_headers")?.unwrap_or(true),
        })
    }

    fn extract_single_file(&self, source: &MultilingualSingleFile) -> Result<StepResult> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .from_path(&source.document_path)
            .map_err(|e| {
                PateeError::Config(format!(
                    "Cannot open {}: {}",
                    source.document_path.display(),
                    e
                ))
            })?;

        let mut language_1_blocks = Vec::new();
        let mut language_2_blocks = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| PateeError::Extraction {
                step: self.name.clone(),
                message: format!("Failed to read CSV record: {}", e),
            })?;

            match (record.get(0), record.get(1)) {
                (Some(first), Some(second)) => {
                    language_1_blocks.push(first.to_string());
                    language_2_blocks.push(second.to_string());
                }
                _ => warn!(
                    "Skipping row {} of {}: expected at least two columns",
                    row,
                    source.document_path.display()
                ),
            }
        }

        debug!("Read {} aligned rows from csv", language_1_blocks.len());

        Ok(StepResult::proceed(DocumentPairContext::new(
            DocumentContext::new(
                DocumentSource::from_multilingual_file(source, 0),
                language_1_blocks,
            ),
            DocumentContext::new(
                DocumentSource::from_multilingual_file(source, 1),
                language_2_blocks,
            ),
        )))
    }
}

impl ExtractStep for CsvExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, _context: &StepContext<'_>, source: &PipelineSource) -> Result<StepResult> {
        match source {
            PipelineSource::Multilingual(file) => self.extract_single_file(file),
            other => Err(PateeError::UnsupportedSourceType {
                step: self.name.clone(),
                source_kind: other.kind().to_string(),
            }),
        }
    }
}
