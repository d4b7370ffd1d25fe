// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PateeError>;

#[derive(Error, Debug)]
pub enum PateeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Step names must be unique in the pipeline, '{0}' is repeated")]
    DuplicateStepName(String),

    #[error("Invalid pipeline: {0}")]
    InvalidPipelineShape(String),

    #[error("Unsupported step: {0}")]
    UnsupportedStepType(String),

    #[error("Step '{step}' does not support {source_kind} sources")]
    UnsupportedSourceType { step: String, source_kind: String },

    #[error("Extraction failed in step '{step}': {message}")]
    Extraction { step: String, message: String },

    #[error("Processing failed in step '{step}': {message}")]
    Processing { step: String, message: String },

    #[error("Persistence failed for {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("YAML error: {0}")]
    Yaml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PateeError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// True for errors detected while assembling a pipeline, before any
    /// step runs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::DuplicateStepName(_)
                | Self::InvalidPipelineShape(_)
                | Self::UnsupportedStepType(_)
                | Self::Yaml(_)
        )
    }
}

impl From<serde_json::Error> for PateeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(PateeError::DuplicateStepName("a".to_string()).is_structural());
        assert!(PateeError::InvalidPipelineShape("empty".to_string()).is_structural());
        assert!(
            !PateeError::Processing {
                step: "x".to_string(),
                message: "boom".to_string()
            }
            .is_structural()
        );
    }

    #[test]
    fn test_unsupported_step_message() {
        let err = PateeError::UnsupportedStepType("unknown_step".to_string());
        assert_eq!(err.to_string(), "Unsupported step: unknown_step");
    }
}
