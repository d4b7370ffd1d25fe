// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod context;
pub mod document;
pub mod metadata;
pub mod result;
pub mod source;

pub use context::{PipelineContext, RunContext, StepContext};
pub use document::{
    DocumentContext, DocumentPairContext, DocumentSource, Extra, TEXT_BLOCK_SEPARATOR,
    deserialize_text_blocks, serialize_text_blocks,
};
pub use metadata::{StepConfig, StepMetadata};
pub use result::StepResult;
pub use source::{
    MonolingualSingleFile, MonolingualSingleFilePair, MultilingualSingleFile, PageInfo,
    PipelineSource,
};
