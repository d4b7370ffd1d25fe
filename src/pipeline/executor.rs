// file: src/pipeline/executor.rs
// description: in-memory, persistent and resumable strategies for running one step
// reference: per-step directories under the run output dir

use crate::error::{PateeError, Result};
use crate::models::{
    DocumentContext, DocumentPairContext, DocumentSource, PipelineContext, PipelineSource,
    RunContext, StepContext, StepMetadata, StepResult,
};
use crate::pipeline::marker::StepMarker;
use crate::steps::Step;
use crate::utils::hash_value;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Part of every step fingerprint. Bump when the artifact layout changes.
pub const ENGINE_VERSION: &str = "patee-1";

/// What a step consumes: the raw source for the extractor, the previous
/// step's output for every processor.
#[derive(Debug)]
pub enum StepInput<'a> {
    Source(&'a PipelineSource),
    Context(DocumentPairContext),
}

impl StepInput<'_> {
    fn sources(&self) -> (DocumentSource, DocumentSource) {
        match self {
            Self::Source(source) => source.document_sources(),
            Self::Context(context) => context.sources(),
        }
    }
}

pub trait StepsExecutor {
    /// Called once per run before the first step.
    fn start(&mut self, pipeline: &PipelineContext, run: &RunContext);

    fn execute(
        &mut self,
        step: &Step,
        metadata: &StepMetadata,
        input: StepInput<'_>,
    ) -> Result<StepResult>;
}

/// Cache key of a step: engine version, source identity, the fingerprint
/// of the step before it and the step's own identity.
pub fn step_fingerprint(
    source_fingerprint: &str,
    upstream_fingerprint: Option<&str>,
    metadata: &StepMetadata,
) -> String {
    hash_value(&json!({
        "engine_version": ENGINE_VERSION,
        "source": source_fingerprint,
        "upstream": upstream_fingerprint,
        "name": metadata.name,
        "type": metadata.step_type,
        "idx": metadata.idx,
        "config_hash": metadata.config_hash,
    }))
}

/// What the next step chains on: the step's own fingerprint plus the content
/// it handed on. Editing the artifacts of a reused step changes every later
/// fingerprint.
fn downstream_fingerprint(fingerprint: &str, output: &DocumentPairContext) -> String {
    let document = |doc: &DocumentContext| {
        json!({
            "text_blocks": doc.text_blocks,
            "extra": doc.extra,
        })
    };
    hash_value(&json!({
        "step": fingerprint,
        "document_1": document(&output.document_1),
        "document_2": document(&output.document_2),
    }))
}

fn run_step(step: &Step, context: &StepContext<'_>, input: StepInput<'_>) -> Result<StepResult> {
    match (step, input) {
        (Step::Extractor(extractor), StepInput::Source(source)) => {
            extractor.extract(context, source)
        }
        (Step::Processor(processor), StepInput::Context(pair)) => processor.process(context, pair),
        (Step::Extractor(_), StepInput::Context(_)) => Err(PateeError::InvalidPipelineShape(
            format!("extractor '{}' can only be the first step", step.name()),
        )),
        (Step::Processor(_), StepInput::Source(_)) => Err(PateeError::InvalidPipelineShape(
            format!("processor '{}' cannot be the first step", step.name()),
        )),
    }
}

fn ensure_step_dir(base_dir: &Path, metadata: &StepMetadata) -> Result<PathBuf> {
    let step_dir = base_dir.join(&metadata.name);
    fs::create_dir_all(&step_dir).map_err(|e| PateeError::persistence(&step_dir, e))?;
    Ok(step_dir)
}

/// Runs steps without touching the filesystem.
#[derive(Debug, Default)]
pub struct NonPersistentStepsExecutor {
    pipeline: PipelineContext,
    run: RunContext,
}

impl NonPersistentStepsExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepsExecutor for NonPersistentStepsExecutor {
    fn start(&mut self, pipeline: &PipelineContext, run: &RunContext) {
        self.pipeline = pipeline.clone();
        self.run = run.clone();
    }

    fn execute(
        &mut self,
        step: &Step,
        metadata: &StepMetadata,
        input: StepInput<'_>,
    ) -> Result<StepResult> {
        debug!("Running step '{}' in memory", metadata.name);
        let context = StepContext::new(&self.pipeline, &self.run, None);
        run_step(step, &context, input)
    }
}

/// Always recomputes and writes every step's output to `<base_dir>/<step>`.
#[derive(Debug)]
pub struct PersistentStepsExecutor {
    base_dir: PathBuf,
    pipeline: PipelineContext,
    run: RunContext,
}

impl PersistentStepsExecutor {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pipeline: PipelineContext::default(),
            run: RunContext::default(),
        }
    }
}

impl StepsExecutor for PersistentStepsExecutor {
    fn start(&mut self, pipeline: &PipelineContext, run: &RunContext) {
        self.pipeline = pipeline.clone();
        self.run = run.clone();
    }

    fn execute(
        &mut self,
        step: &Step,
        metadata: &StepMetadata,
        input: StepInput<'_>,
    ) -> Result<StepResult> {
        let step_dir = ensure_step_dir(&self.base_dir, metadata)?;
        let context = StepContext::new(&self.pipeline, &self.run, Some(&step_dir));

        let result = run_step(step, &context, input)?;
        if let Some(output) = result.context() {
            output.dump_to(&step_dir)?;
            debug!("Persisted step '{}' to {}", metadata.name, step_dir.display());
        }
        Ok(result)
    }
}

/// Persistent execution that skips steps whose marker matches the current
/// fingerprint, reloading their artifacts instead.
#[derive(Debug)]
pub struct IntelligentPersistenceStepsExecutor {
    base_dir: PathBuf,
    pipeline: PipelineContext,
    run: RunContext,
    upstream_fingerprint: Option<String>,
}

impl IntelligentPersistenceStepsExecutor {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pipeline: PipelineContext::default(),
            run: RunContext::default(),
            upstream_fingerprint: None,
        }
    }

    fn load_cached(
        &self,
        step_dir: &Path,
        fingerprint: &str,
        input: &StepInput<'_>,
    ) -> Option<DocumentPairContext> {
        let marker = StepMarker::read(step_dir)?;
        if marker.fingerprint != fingerprint {
            debug!(
                "Stale marker in {} ({} != {})",
                step_dir.display(),
                marker.fingerprint,
                fingerprint
            );
            return None;
        }

        match DocumentPairContext::read_with_extra_from(input.sources(), step_dir) {
            Ok(context) => Some(context),
            Err(e) => {
                warn!(
                    "Marker in {} has unreadable artifacts, recomputing: {}",
                    step_dir.display(),
                    e
                );
                None
            }
        }
    }
}

impl StepsExecutor for IntelligentPersistenceStepsExecutor {
    fn start(&mut self, pipeline: &PipelineContext, run: &RunContext) {
        self.pipeline = pipeline.clone();
        self.run = run.clone();
        self.upstream_fingerprint = None;
    }

    fn execute(
        &mut self,
        step: &Step,
        metadata: &StepMetadata,
        input: StepInput<'_>,
    ) -> Result<StepResult> {
        let step_dir = ensure_step_dir(&self.base_dir, metadata)?;
        let fingerprint = step_fingerprint(
            &self.run.source_hash,
            self.upstream_fingerprint.as_deref(),
            metadata,
        );

        if let Some(cached) = self.load_cached(&step_dir, &fingerprint, &input) {
            info!(
                "Step '{}' is up to date, reusing {}",
                metadata.name,
                step_dir.display()
            );
            self.upstream_fingerprint = Some(downstream_fingerprint(&fingerprint, &cached));
            return Ok(StepResult::skipped(cached));
        }

        StepMarker::remove(&step_dir)?;

        let context = StepContext::new(&self.pipeline, &self.run, Some(&step_dir));
        let result = run_step(step, &context, input)?;

        if let Some(output) = result.context() {
            output.dump_to(&step_dir)?;
            StepMarker::new(fingerprint.clone(), metadata.clone()).write(&step_dir)?;
            debug!("Cached step '{}' with fingerprint {}", metadata.name, fingerprint);
            self.upstream_fingerprint = Some(downstream_fingerprint(&fingerprint, output));
        } else {
            self.upstream_fingerprint = Some(fingerprint);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MonolingualSingleFile, MonolingualSingleFilePair, StepConfig};
    use crate::steps::{ExtractStep, NoopProcessor, ProcessStep};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
    }

    impl ExtractStep for CountingExtractor {
        fn name(&self) -> &str {
            "counting"
        }

        fn extract(
            &self,
            _context: &StepContext<'_>,
            source: &PipelineSource,
        ) -> Result<StepResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (source_1, source_2) = source.document_sources();
            Ok(StepResult::proceed(DocumentPairContext::new(
                DocumentContext::new(source_1, vec!["patata".to_string()]),
                DocumentContext::new(source_2, vec!["petete".to_string()]),
            )))
        }
    }

    struct CountingProcessor {
        calls: Arc<AtomicUsize>,
    }

    impl ProcessStep for CountingProcessor {
        fn name(&self) -> &str {
            "upper"
        }

        fn process(
            &self,
            _context: &StepContext<'_>,
            mut source: DocumentPairContext,
        ) -> Result<StepResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for block in source.document_1.text_blocks.iter_mut() {
                *block = block.to_uppercase();
            }
            source
                .document_1
                .extra
                .insert("uppercased".to_string(), json!(true));
            Ok(StepResult::proceed(source))
        }
    }

    struct Halt;

    impl ProcessStep for Halt {
        fn name(&self) -> &str {
            "halt"
        }

        fn process(
            &self,
            _context: &StepContext<'_>,
            _source: DocumentPairContext,
        ) -> Result<StepResult> {
            Ok(StepResult::stop())
        }
    }

    fn source() -> PipelineSource {
        PipelineSource::FilePair(MonolingualSingleFilePair::new(
            MonolingualSingleFile::new("/data/GUIA-PDDD_ES.pdf", "es"),
            MonolingualSingleFile::new("/data/GUIA-PDDD.pdf", "ca"),
        ))
    }

    fn run_context(source: &PipelineSource, out: &Path) -> RunContext {
        RunContext::new(Some(out.to_path_buf()), source.fingerprint())
    }

    fn extract_once(
        executor: &mut IntelligentPersistenceStepsExecutor,
        out: &Path,
        step: &Step,
        config: &StepConfig,
        source: &PipelineSource,
    ) -> StepResult {
        executor.start(&PipelineContext::default(), &run_context(source, out));
        let metadata = StepMetadata::new("counting", "counting", 0, config);
        executor.execute(step, &metadata, StepInput::Source(source)).unwrap()
    }

    #[test]
    fn test_fingerprint_depends_on_every_input() {
        let config = StepConfig::new();
        let metadata = StepMetadata::new("reader", "text_extractor", 0, &config);
        let base = step_fingerprint("source", None, &metadata);

        assert_eq!(base, step_fingerprint("source", None, &metadata));
        assert_ne!(base, step_fingerprint("other", None, &metadata));
        assert_ne!(base, step_fingerprint("source", Some("up"), &metadata));

        let reconfigured =
            StepMetadata::new("reader", "text_extractor", 0, &config.clone().with("x", 1));
        assert_ne!(base, step_fingerprint("source", None, &reconfigured));
    }

    #[test]
    fn test_non_persistent_is_pass_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Step::extractor(CountingExtractor { calls: calls.clone() });
        let source = source();
        let metadata = StepMetadata::new("counting", "counting", 0, &StepConfig::new());

        let mut executor = NonPersistentStepsExecutor::new();
        let result = executor
            .execute(&step, &metadata, StepInput::Source(&source))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.context().unwrap().document_1.text_blocks, vec!["patata"]);
        assert!(!result.is_skipped());
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let step = Step::processor(NoopProcessor::new("no-op"));
        let source = source();
        let metadata = StepMetadata::new("no-op", "noop", 0, &StepConfig::new());

        let err = NonPersistentStepsExecutor::new()
            .execute(&step, &metadata, StepInput::Source(&source))
            .unwrap_err();
        assert!(matches!(err, PateeError::InvalidPipelineShape(_)));
    }

    #[test]
    fn test_persistent_always_recomputes_and_writes() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Step::extractor(CountingExtractor { calls: calls.clone() });
        let source = source();
        let metadata = StepMetadata::new("counting", "counting", 0, &StepConfig::new());

        let mut executor = PersistentStepsExecutor::new(temp.path());
        for _ in 0..2 {
            executor.start(&PipelineContext::default(), &run_context(&source, temp.path()));
            executor
                .execute(&step, &metadata, StepInput::Source(&source))
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let step_dir = temp.path().join("counting");
        assert!(step_dir.join("GUIA-PDDD_ES.txt").is_file());
        assert!(step_dir.join("GUIA-PDDD.txt").is_file());
        assert!(!step_dir.join(".patee").exists());
    }

    #[test]
    fn test_halting_step_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let step = Step::processor(Halt);
        let metadata = StepMetadata::new("halt", "halt", 1, &StepConfig::new());
        let input = DocumentPairContext::new(
            DocumentContext::new(DocumentSource::new("/data/a.txt", "es"), vec!["a".to_string()]),
            DocumentContext::new(DocumentSource::new("/data/b.txt", "ca"), vec!["b".to_string()]),
        );

        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());
        let result = executor
            .execute(&step, &metadata, StepInput::Context(input))
            .unwrap();

        assert!(result.should_stop_pipeline());
        let step_dir = temp.path().join("halt");
        assert!(step_dir.is_dir());
        assert_eq!(fs::read_dir(&step_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_cached_step_runs_once() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Step::extractor(CountingExtractor { calls: calls.clone() });
        let source = source();
        let config = StepConfig::new();
        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());

        let first = extract_once(&mut executor, temp.path(), &step, &config, &source);
        let second = extract_once(&mut executor, temp.path(), &step, &config, &source);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!first.is_skipped());
        assert!(second.is_skipped());
        assert_eq!(first.context(), second.context());
        assert!(StepMarker::read(&temp.path().join("counting")).is_some());
    }

    #[test]
    fn test_config_change_invalidates_cache() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Step::extractor(CountingExtractor { calls: calls.clone() });
        let source = source();
        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());

        extract_once(&mut executor, temp.path(), &step, &StepConfig::new(), &source);
        let changed = StepConfig::new().with("split_paragraphs", true);
        let result = extract_once(&mut executor, temp.path(), &step, &changed, &source);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!result.is_skipped());
    }

    #[test]
    fn test_artifacts_without_marker_are_recomputed() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Step::extractor(CountingExtractor { calls: calls.clone() });
        let source = source();
        let config = StepConfig::new();
        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());

        extract_once(&mut executor, temp.path(), &step, &config, &source);
        StepMarker::remove(&temp.path().join("counting")).unwrap();
        extract_once(&mut executor, temp.path(), &step, &config, &source);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_marker_with_missing_artifacts_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Step::extractor(CountingExtractor { calls: calls.clone() });
        let source = source();
        let config = StepConfig::new();
        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());

        extract_once(&mut executor, temp.path(), &step, &config, &source);
        fs::remove_file(temp.path().join("counting").join("GUIA-PDDD.txt")).unwrap();
        let result = extract_once(&mut executor, temp.path(), &step, &config, &source);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!result.is_skipped());
        assert!(temp.path().join("counting").join("GUIA-PDDD.txt").is_file());
    }

    #[test]
    fn test_upstream_change_invalidates_downstream_and_extra_is_reloaded() {
        let temp = TempDir::new().unwrap();
        let extract_calls = Arc::new(AtomicUsize::new(0));
        let process_calls = Arc::new(AtomicUsize::new(0));
        let extractor = Step::extractor(CountingExtractor { calls: extract_calls.clone() });
        let processor = Step::processor(CountingProcessor { calls: process_calls.clone() });
        let source = source();
        let processor_metadata = StepMetadata::new("upper", "upper", 1, &StepConfig::new());
        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());

        let mut run = |extractor_config: &StepConfig| {
            let first =
                extract_once(&mut executor, temp.path(), &extractor, extractor_config, &source);
            executor
                .execute(
                    &processor,
                    &processor_metadata,
                    StepInput::Context(first.into_context().unwrap()),
                )
                .unwrap()
        };

        run(&StepConfig::new());
        let cached = run(&StepConfig::new());
        assert_eq!(process_calls.load(Ordering::SeqCst), 1);
        assert!(cached.is_skipped());
        let cached = cached.into_context().unwrap();
        assert_eq!(cached.document_1.text_blocks, vec!["PATATA"]);
        assert_eq!(cached.document_1.extra.get("uppercased"), Some(&json!(true)));

        run(&StepConfig::new().with("split_paragraphs", true));
        assert_eq!(extract_calls.load(Ordering::SeqCst), 2);
        assert_eq!(process_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_edited_artifacts_of_reused_step_invalidate_downstream() {
        let temp = TempDir::new().unwrap();
        let extract_calls = Arc::new(AtomicUsize::new(0));
        let process_calls = Arc::new(AtomicUsize::new(0));
        let extractor = Step::extractor(CountingExtractor { calls: extract_calls.clone() });
        let processor = Step::processor(CountingProcessor { calls: process_calls.clone() });
        let source = source();
        let config = StepConfig::new();
        let processor_metadata = StepMetadata::new("upper", "upper", 1, &config);
        let mut executor = IntelligentPersistenceStepsExecutor::new(temp.path());

        let mut run = || {
            let first = extract_once(&mut executor, temp.path(), &extractor, &config, &source);
            executor
                .execute(
                    &processor,
                    &processor_metadata,
                    StepInput::Context(first.into_context().unwrap()),
                )
                .unwrap()
        };

        run();
        let edited = vec!["patata editada".to_string()];
        fs::write(
            temp.path().join("counting").join("GUIA-PDDD_ES.txt"),
            crate::models::serialize_text_blocks(&edited).unwrap(),
        )
        .unwrap();

        let rerun = run();
        assert!(!rerun.is_skipped());
        assert_eq!(process_calls.load(Ordering::SeqCst), 2);
        assert_eq!(rerun.context().unwrap().document_1.text_blocks, vec!["PATATA EDITADA"]);

        let cached = run();
        assert!(cached.is_skipped());
        assert_eq!(extract_calls.load(Ordering::SeqCst), 1);
        assert_eq!(process_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_downstream_fingerprint_tracks_content() {
        let context = |text: &str| {
            DocumentPairContext::new(
                DocumentContext::new(DocumentSource::new("/data/a.txt", "es"), vec![text.into()]),
                DocumentContext::new(DocumentSource::new("/data/b.txt", "ca"), Vec::new()),
            )
        };

        let base = downstream_fingerprint("step", &context("hola"));
        assert_eq!(base, downstream_fingerprint("step", &context("hola")));
        assert_ne!(base, downstream_fingerprint("step", &context("adeu")));
        assert_ne!(base, downstream_fingerprint("other", &context("hola")));

        let mut with_extra = context("hola");
        with_extra.document_2.extra.insert("seen".to_string(), json!(1));
        assert_ne!(base, downstream_fingerprint("step", &with_extra));
    }
}
