// file: src/models/source.rs
// description: pipeline inputs (file pairs and multilingual files) and their fingerprint
// reference: internal data structures

use crate::error::Result;
use crate::models::document::DocumentSource;
use crate::utils::{Validator, hash_value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageInfo {
    pub start_page: u32,
    pub end_page: u32,
    #[serde(default)]
    pub pages_to_exclude: BTreeSet<u32>,
}

impl PageInfo {
    pub fn new(start_page: u32, end_page: u32) -> Self {
        Self {
            start_page,
            end_page,
            pages_to_exclude: BTreeSet::new(),
        }
    }

    pub fn excluding(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.pages_to_exclude.extend(pages);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonolingualSingleFile {
    pub document_path: PathBuf,
    pub iso2_language: String,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl MonolingualSingleFile {
    pub fn new(document_path: impl Into<PathBuf>, iso2_language: impl Into<String>) -> Self {
        Self {
            document_path: document_path.into(),
            iso2_language: iso2_language.into(),
            page_info: None,
        }
    }

    pub fn with_page_info(mut self, page_info: PageInfo) -> Self {
        self.page_info = Some(page_info);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonolingualSingleFilePair {
    pub document_1: MonolingualSingleFile,
    pub document_2: MonolingualSingleFile,
    #[serde(default)]
    pub shared_page_info: Option<PageInfo>,
}

impl MonolingualSingleFilePair {
    pub fn new(document_1: MonolingualSingleFile, document_2: MonolingualSingleFile) -> Self {
        Self {
            document_1,
            document_2,
            shared_page_info: None,
        }
    }

    pub fn with_shared_page_info(mut self, page_info: PageInfo) -> Self {
        self.shared_page_info = Some(page_info);
        self
    }

    /// Page selection for one side of the pair; the shared one wins.
    pub fn page_info_for<'a>(&'a self, file: &'a MonolingualSingleFile) -> Option<&'a PageInfo> {
        self.shared_page_info.as_ref().or(file.page_info.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilingualSingleFile {
    pub document_path: PathBuf,
    pub iso2_languages: [String; 2],
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl MultilingualSingleFile {
    pub fn new(
        document_path: impl Into<PathBuf>,
        language_1: impl Into<String>,
        language_2: impl Into<String>,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            iso2_languages: [language_1.into(), language_2.into()],
            page_info: None,
        }
    }
}

/// What the first step of a pipeline consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineSource {
    FilePair(MonolingualSingleFilePair),
    Multilingual(MultilingualSingleFile),
}

impl PipelineSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FilePair(_) => "file pair",
            Self::Multilingual(_) => "multilingual file",
        }
    }

    pub fn document_sources(&self) -> (DocumentSource, DocumentSource) {
        match self {
            Self::FilePair(pair) => (
                DocumentSource::from_monolingual_file(&pair.document_1),
                DocumentSource::from_monolingual_file(&pair.document_2),
            ),
            Self::Multilingual(file) => (
                DocumentSource::from_multilingual_file(file, 0),
                DocumentSource::from_multilingual_file(file, 1),
            ),
        }
    }

    pub fn document_paths(&self) -> Vec<&Path> {
        match self {
            Self::FilePair(pair) => vec![
                pair.document_1.document_path.as_path(),
                pair.document_2.document_path.as_path(),
            ],
            Self::Multilingual(file) => vec![file.document_path.as_path()],
        }
    }

    /// Fails when a referenced document cannot be resolved to a file.
    pub fn validate(&self) -> Result<()> {
        for path in self.document_paths() {
            Validator::validate_file_path(path)?;
        }
        let languages: Vec<&str> = match self {
            Self::FilePair(pair) => vec![
                pair.document_1.iso2_language.as_str(),
                pair.document_2.iso2_language.as_str(),
            ],
            Self::Multilingual(file) => file.iso2_languages.iter().map(String::as_str).collect(),
        };
        for language in languages {
            Validator::validate_language_code(language)?;
        }
        Ok(())
    }

    /// Deterministic identity of this source: absolute paths, languages and
    /// page selection. Stable across processes.
    pub fn fingerprint(&self) -> String {
        let canonical = match self {
            Self::FilePair(pair) => json!({
                "kind": "file_pair",
                "document_1": Self::file_identity(&pair.document_1),
                "document_2": Self::file_identity(&pair.document_2),
                "shared_page_info": pair.shared_page_info,
            }),
            Self::Multilingual(file) => json!({
                "kind": "multilingual",
                "document_path": Validator::resolve_path(&file.document_path).to_string_lossy(),
                "iso2_languages": file.iso2_languages,
                "page_info": file.page_info,
            }),
        };
        hash_value(&canonical)
    }

    fn file_identity(file: &MonolingualSingleFile) -> serde_json::Value {
        json!({
            "document_path": Validator::resolve_path(&file.document_path).to_string_lossy(),
            "iso2_language": file.iso2_language,
            "page_info": file.page_info,
        })
    }
}

impl From<MonolingualSingleFilePair> for PipelineSource {
    fn from(pair: MonolingualSingleFilePair) -> Self {
        Self::FilePair(pair)
    }
}

impl From<MultilingualSingleFile> for PipelineSource {
    fn from(file: MultilingualSingleFile) -> Self {
        Self::Multilingual(file)
    }
}

impl fmt::Display for PipelineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilePair(pair) => write!(
                f,
                "{} ({}) + {} ({})",
                pair.document_1.document_path.display(),
                pair.document_1.iso2_language,
                pair.document_2.document_path.display(),
                pair.document_2.iso2_language
            ),
            Self::Multilingual(file) => write!(
                f,
                "{} ({}, {})",
                file.document_path.display(),
                file.iso2_languages[0],
                file.iso2_languages[1]
            ),
        }
    }
}
