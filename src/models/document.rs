// file: src/models/document.rs
// description: per-document text blocks and their on-disk representation
// reference: internal data structures

use crate::error::{PateeError, Result};
use crate::models::source::{MonolingualSingleFile, MultilingualSingleFile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reserved token written after every text block. Blocks must not contain it.
pub const TEXT_BLOCK_SEPARATOR: &str =
    "\n\n---- patee_block_separator ------------------------------- \n\n";

pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentSource {
    pub document_path: PathBuf,
    pub iso2_language: String,
}

impl DocumentSource {
    pub fn new(document_path: impl Into<PathBuf>, iso2_language: impl Into<String>) -> Self {
        Self {
            document_path: document_path.into(),
            iso2_language: iso2_language.into(),
        }
    }

    pub fn from_monolingual_file(file: &MonolingualSingleFile) -> Self {
        Self::new(file.document_path.clone(), file.iso2_language.clone())
    }

    /// `language_idx` is 0 or 1.
    pub fn from_multilingual_file(file: &MultilingualSingleFile, language_idx: usize) -> Self {
        Self::new(
            file.document_path.clone(),
            file.iso2_languages[language_idx].clone(),
        )
    }

    pub fn stem(&self) -> String {
        self.document_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Encodes blocks as `block SEP block SEP ...`.
pub fn serialize_text_blocks(blocks: &[String]) -> Result<String> {
    let mut out = String::new();
    for (idx, block) in blocks.iter().enumerate() {
        let start = out.len();
        out.push_str(block);
        out.push_str(TEXT_BLOCK_SEPARATOR);
        // the first separator after `start` must be the one just appended
        if out[start..].find(TEXT_BLOCK_SEPARATOR) != Some(block.len()) {
            return Err(PateeError::Serialization(format!(
                "text block {} contains the reserved block separator",
                idx
            )));
        }
    }
    Ok(out)
}

/// Inverse of [`serialize_text_blocks`]. Also accepts text whose last block
/// has no trailing separator, which is how hand-edited files usually end.
pub fn deserialize_text_blocks(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut blocks: Vec<String> = text
        .split(TEXT_BLOCK_SEPARATOR)
        .map(str::to_string)
        .collect();
    if text.ends_with(TEXT_BLOCK_SEPARATOR) {
        blocks.pop();
    }
    blocks
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContext {
    pub source: DocumentSource,
    pub text_blocks: Vec<String>,
    #[serde(default)]
    pub extra: Extra,
}

impl DocumentContext {
    pub fn new(source: DocumentSource, text_blocks: Vec<String>) -> Self {
        Self {
            source,
            text_blocks,
            extra: Extra::new(),
        }
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }

    pub fn dump_to(&self, result_dir: &Path) -> Result<()> {
        self.dump_as(result_dir, &self.source.stem())
    }

    /// Reads the text blocks back; `extra` comes back empty.
    pub fn load_from(source: DocumentSource, current_dir: &Path) -> Result<Self> {
        let stem = source.stem();
        Self::load_as(source, current_dir, &stem, false)
    }

    pub(crate) fn dump_as(&self, result_dir: &Path, file_stem: &str) -> Result<()> {
        let text_path = text_file(result_dir, file_stem);
        let text = serialize_text_blocks(&self.text_blocks)?;
        fs::write(&text_path, text).map_err(|e| PateeError::persistence(&text_path, e))?;

        let extra_path = extra_file(result_dir, file_stem);
        if self.extra.is_empty() {
            if extra_path.exists() {
                fs::remove_file(&extra_path).map_err(|e| PateeError::persistence(&extra_path, e))?;
            }
        } else {
            let json = serde_json::to_string_pretty(&self.extra)?;
            fs::write(&extra_path, json).map_err(|e| PateeError::persistence(&extra_path, e))?;
        }

        debug!(
            "Wrote {} text blocks to {}",
            self.text_blocks.len(),
            text_path.display()
        );
        Ok(())
    }

    pub(crate) fn load_as(
        source: DocumentSource,
        current_dir: &Path,
        file_stem: &str,
        with_extra: bool,
    ) -> Result<Self> {
        ensure_dir(current_dir)?;

        let text_path = text_file(current_dir, file_stem);
        let text =
            fs::read_to_string(&text_path).map_err(|e| PateeError::persistence(&text_path, e))?;

        let mut extra = Extra::new();
        let extra_path = extra_file(current_dir, file_stem);
        if with_extra && extra_path.is_file() {
            let json = fs::read_to_string(&extra_path)
                .map_err(|e| PateeError::persistence(&extra_path, e))?;
            extra = serde_json::from_str(&json)?;
        }

        Ok(Self {
            source,
            text_blocks: deserialize_text_blocks(&text),
            extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPairContext {
    pub document_1: DocumentContext,
    pub document_2: DocumentContext,
}

impl DocumentPairContext {
    pub fn new(document_1: DocumentContext, document_2: DocumentContext) -> Self {
        Self {
            document_1,
            document_2,
        }
    }

    pub fn sources(&self) -> (DocumentSource, DocumentSource) {
        (
            self.document_1.source.clone(),
            self.document_2.source.clone(),
        )
    }

    pub fn dump_to(&self, out_dir: &Path) -> Result<()> {
        ensure_dir(out_dir)?;
        let (stem_1, stem_2) = artifact_stems(&self.document_1.source, &self.document_2.source);
        self.document_1.dump_as(out_dir, &stem_1)?;
        self.document_2.dump_as(out_dir, &stem_2)?;
        Ok(())
    }

    /// Rebuilds a pair from files written by [`dump_to`](Self::dump_to),
    /// keeping the given sources. `extra` is not read back.
    pub fn read_from(
        sources: (DocumentSource, DocumentSource),
        current_dir: &Path,
    ) -> Result<Self> {
        Self::read(sources, current_dir, false)
    }

    /// Like [`read_from`](Self::read_from) but also reloads the `extra`
    /// sidecars.
    pub fn read_with_extra_from(
        sources: (DocumentSource, DocumentSource),
        current_dir: &Path,
    ) -> Result<Self> {
        Self::read(sources, current_dir, true)
    }

    fn read(
        (source_1, source_2): (DocumentSource, DocumentSource),
        current_dir: &Path,
        with_extra: bool,
    ) -> Result<Self> {
        let (stem_1, stem_2) = artifact_stems(&source_1, &source_2);
        Ok(Self {
            document_1: DocumentContext::load_as(source_1, current_dir, &stem_1, with_extra)?,
            document_2: DocumentContext::load_as(source_2, current_dir, &stem_2, with_extra)?,
        })
    }
}

/// File stems used for the two documents of a pair. Both halves of a
/// multilingual file share a stem, so the language code disambiguates.
pub fn artifact_stems(source_1: &DocumentSource, source_2: &DocumentSource) -> (String, String) {
    let (stem_1, stem_2) = (source_1.stem(), source_2.stem());
    if stem_1 != stem_2 {
        (stem_1, stem_2)
    } else if source_1.iso2_language != source_2.iso2_language {
        (
            format!("{}_{}", stem_1, source_1.iso2_language),
            format!("{}_{}", stem_2, source_2.iso2_language),
        )
    } else {
        (format!("{}_1", stem_1), format!("{}_2", stem_2))
    }
}

fn text_file(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.txt", stem))
}

fn extra_file(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}_extra.json", stem))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(PateeError::Config(format!(
            "output path {} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn blocks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn pair() -> DocumentPairContext {
        DocumentPairContext::new(
            DocumentContext::new(
                DocumentSource::new("/data/GUIA-PDDD_ES.pdf", "es"),
                blocks(&["patata", "segundo bloque"]),
            ),
            DocumentContext::new(
                DocumentSource::new("/data/GUIA-PDDD.pdf", "ca"),
                blocks(&["petete"]),
            ),
        )
    }

    #[test]
    fn test_text_blocks_round_trip() {
        let cases = vec![
            blocks(&[]),
            blocks(&[""]),
            blocks(&["", ""]),
            blocks(&["one"]),
            blocks(&["one", "two", "three"]),
            blocks(&["trailing newline\n\n", "\n\n---- patee_block_separator"]),
            blocks(&["------------------------------- \n\n", "patee_block_separator"]),
        ];

        for case in cases {
            let text = serialize_text_blocks(&case).unwrap();
            assert_eq!(deserialize_text_blocks(&text), case);
        }
    }

    #[test]
    fn test_block_containing_separator_is_rejected() {
        let bad = vec![format!("a{}b", TEXT_BLOCK_SEPARATOR)];
        assert!(serialize_text_blocks(&bad).is_err());

        let head = &TEXT_BLOCK_SEPARATOR[..TEXT_BLOCK_SEPARATOR.len() - 2];
        let overlapping = vec![format!("a{}", head)];
        assert!(serialize_text_blocks(&overlapping).is_err());
    }

    #[test]
    fn test_hand_edited_text_without_trailing_separator() {
        let text = format!("uno{}dos", TEXT_BLOCK_SEPARATOR);
        assert_eq!(deserialize_text_blocks(&text), blocks(&["uno", "dos"]));
    }

    #[test]
    fn test_pair_dump_and_read() {
        let temp = TempDir::new().unwrap();
        let context = pair();
        context.dump_to(temp.path()).unwrap();

        assert!(temp.path().join("GUIA-PDDD_ES.txt").is_file());
        assert!(temp.path().join("GUIA-PDDD.txt").is_file());
        assert!(!temp.path().join("GUIA-PDDD_ES_extra.json").exists());

        let read = DocumentPairContext::read_from(context.sources(), temp.path()).unwrap();
        assert_eq!(read, context);
    }

    #[test]
    fn test_extra_is_written_but_only_reloaded_on_request() {
        let temp = TempDir::new().unwrap();
        let mut context = pair();
        let mut extra = Extra::new();
        extra.insert("seen_labels".to_string(), json!(["text", "title"]));
        context.document_1.extra = extra.clone();
        context.dump_to(temp.path()).unwrap();

        assert!(temp.path().join("GUIA-PDDD_ES_extra.json").is_file());

        let plain = DocumentPairContext::read_from(context.sources(), temp.path()).unwrap();
        assert!(plain.document_1.extra.is_empty());

        let full =
            DocumentPairContext::read_with_extra_from(context.sources(), temp.path()).unwrap();
        assert_eq!(full.document_1.extra, extra);
    }

    #[test]
    fn test_multilingual_sources_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let context = DocumentPairContext::new(
            DocumentContext::new(DocumentSource::new("/data/corpus.csv", "en"), blocks(&["hello"])),
            DocumentContext::new(DocumentSource::new("/data/corpus.csv", "es"), blocks(&["hola"])),
        );
        context.dump_to(temp.path()).unwrap();

        assert!(temp.path().join("corpus_en.txt").is_file());
        assert!(temp.path().join("corpus_es.txt").is_file());
        let read = DocumentPairContext::read_from(context.sources(), temp.path()).unwrap();
        assert_eq!(read, context);
    }

    #[test]
    fn test_dump_into_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        assert!(pair().dump_to(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_single_document_dump_uses_stem() {
        let temp = TempDir::new().unwrap();
        let context = pair().document_2;
        context.dump_to(temp.path()).unwrap();

        let read = DocumentContext::load_from(context.source.clone(), temp.path()).unwrap();
        assert_eq!(read, context);
    }

    /// Pieces that tend to form or straddle the separator when concatenated.
    fn fragment() -> impl Strategy<Value = String> {
        let sep = TEXT_BLOCK_SEPARATOR;
        let pieces: Vec<&'static str> = vec![
            "",
            "\n",
            "\n\n",
            " ",
            "----",
            "patee_block_separator",
            "-------------------------------",
            sep,
            &sep[..2],
            &sep[2..],
            &sep[..sep.len() - 2],
            &sep[sep.len() - 2..],
        ];
        prop_oneof![
            prop::sample::select(pieces).prop_map(String::from),
            "\\PC{0,6}",
        ]
    }

    fn text_blocks() -> impl Strategy<Value = Vec<String>> {
        let block = prop::collection::vec(fragment(), 0..6).prop_map(|parts| parts.concat());
        prop::collection::vec(block, 0..5)
    }

    #[test]
    fn proptest_serialize_fails_or_round_trips() {
        proptest!(|(case in text_blocks())| {
            match serialize_text_blocks(&case) {
                Ok(text) => prop_assert_eq!(deserialize_text_blocks(&text), case),
                Err(e) => prop_assert!(matches!(e, PateeError::Serialization(_))),
            }
        });
    }

    #[test]
    fn proptest_block_with_separator_never_serializes() {
        proptest!(|(head in text_blocks(), tail in text_blocks(), prefix in fragment())| {
            let mut case = head;
            case.push(format!("{}{}", prefix, TEXT_BLOCK_SEPARATOR));
            case.extend(tail);
            prop_assert!(serialize_text_blocks(&case).is_err());
        });
    }

    #[test]
    fn proptest_pair_dump_and_read_back() {
        let extra_entries = prop::collection::vec(("[a-z_]{1,8}", any::<i64>()), 0..3);
        proptest!(|(
            blocks_1 in text_blocks(),
            blocks_2 in text_blocks(),
            entries in extra_entries,
        )| {
            prop_assume!(serialize_text_blocks(&blocks_1).is_ok());
            prop_assume!(serialize_text_blocks(&blocks_2).is_ok());

            let extra: Extra = entries.into_iter().map(|(k, v)| (k, json!(v))).collect();
            let context = DocumentPairContext::new(
                DocumentContext::new(DocumentSource::new("/data/corpus.csv", "en"), blocks_1)
                    .with_extra(extra),
                DocumentContext::new(DocumentSource::new("/data/corpus.csv", "es"), blocks_2),
            );

            let temp = TempDir::new().unwrap();
            context.dump_to(temp.path()).unwrap();

            let full = DocumentPairContext::read_with_extra_from(context.sources(), temp.path())
                .unwrap();
            prop_assert_eq!(&full, &context);

            let plain = DocumentPairContext::read_from(context.sources(), temp.path()).unwrap();
            prop_assert_eq!(&plain.document_1.text_blocks, &context.document_1.text_blocks);
            prop_assert!(plain.document_1.extra.is_empty());
        });
    }
}
