// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use patee::utils::logging::{format_info, format_step, format_success, format_warning};
use patee::{
    AppConfig, ExecutionMode, MonolingualSingleFile, MonolingualSingleFilePair,
    MultilingualSingleFile, PageInfo, Patee, PipelineSource, RunStatus, StepRegistry,
    StepsBuilder, inspect_output,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "patee")]
#[command(version)]
#[command(about = "Resumable pipelines for bilingual document pairs", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline over a file pair or a multilingual file
    Run {
        #[arg(short, long, value_name = "YAML")]
        pipeline: Option<PathBuf>,

        /// Output directory, defaults to execution.output_dir
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        #[arg(long, value_name = "MODE")]
        mode: Option<ExecutionMode>,

        /// Ignore any configured output directory
        #[arg(long, conflicts_with = "out")]
        in_memory: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Check that a pipeline file builds into a valid pipeline
    Validate {
        #[arg(short, long, value_name = "YAML")]
        pipeline: Option<PathBuf>,
    },

    /// List the registered step types
    Steps,

    /// Show what a previous run left in an output directory
    Status {
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    #[arg(long, requires_all = ["lang1", "doc2", "lang2"], conflicts_with = "file")]
    doc1: Option<PathBuf>,

    #[arg(long)]
    lang1: Option<String>,

    #[arg(long)]
    doc2: Option<PathBuf>,

    #[arg(long)]
    lang2: Option<String>,

    /// A single file holding both languages (csv)
    #[arg(long, requires = "languages")]
    file: Option<PathBuf>,

    #[arg(long, value_delimiter = ',')]
    languages: Vec<String>,

    #[arg(long, requires = "end_page")]
    start_page: Option<u32>,

    #[arg(long, requires = "start_page")]
    end_page: Option<u32>,

    #[arg(long = "exclude-page", value_name = "PAGE")]
    exclude_pages: Vec<u32>,
}

impl SourceArgs {
    fn page_info(&self) -> Option<PageInfo> {
        match (self.start_page, self.end_page) {
            (Some(start), Some(end)) => {
                Some(PageInfo::new(start, end).excluding(self.exclude_pages.iter().copied()))
            }
            _ => None,
        }
    }

    fn into_source(self) -> Result<PipelineSource> {
        let page_info = self.page_info();

        if let Some(file) = self.file {
            let [language_1, language_2] = <[String; 2]>::try_from(self.languages)
                .map_err(|_| anyhow::anyhow!("--languages expects exactly two codes"))?;
            let mut source = MultilingualSingleFile::new(file, language_1, language_2);
            source.page_info = page_info;
            return Ok(source.into());
        }

        match (self.doc1, self.lang1, self.doc2, self.lang2) {
            (Some(doc1), Some(lang1), Some(doc2), Some(lang2)) => {
                let mut pair = MonolingualSingleFilePair::new(
                    MonolingualSingleFile::new(doc1, lang1),
                    MonolingualSingleFile::new(doc2, lang2),
                );
                if let Some(page_info) = page_info {
                    pair = pair.with_shared_page_info(page_info);
                }
                Ok(pair.into())
            }
            _ => bail!("Provide either --doc1/--lang1/--doc2/--lang2 or --file/--languages"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        AppConfig::default_config()
    };

    colored::control::set_override(cli.color && config.logging.colored);
    patee::utils::logging::init_logger(
        cli.color && config.logging.colored,
        cli.verbose || config.logging.verbose,
    );

    if !cli.config.exists() {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
    }

    let registry = StepRegistry::with_defaults();

    match cli.command {
        Commands::Run {
            pipeline,
            out,
            mode,
            in_memory,
            source,
        } => {
            let out = if in_memory {
                None
            } else {
                out.or_else(|| config.execution.output_dir.clone())
            };
            let mode = mode.unwrap_or(config.execution.mode);
            cmd_run(&config, &registry, pipeline, out, mode, source, cli.color)?;
        }
        Commands::Validate { pipeline } => {
            cmd_validate(&config, &registry, pipeline)?;
        }
        Commands::Steps => {
            cmd_steps(&registry);
        }
        Commands::Status { out } => {
            let out = out
                .or_else(|| config.execution.output_dir.clone())
                .context("No output directory given or configured")?;
            cmd_status(&out)?;
        }
    }

    Ok(())
}

fn pipeline_path(config: &AppConfig, pipeline: Option<PathBuf>) -> Result<PathBuf> {
    pipeline
        .or_else(|| config.pipeline.path.clone())
        .context("No pipeline given (use --pipeline or set pipeline.path)")
}

fn cmd_run(
    config: &AppConfig,
    registry: &StepRegistry,
    pipeline: Option<PathBuf>,
    out: Option<PathBuf>,
    mode: ExecutionMode,
    source: SourceArgs,
    colored: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let path = pipeline_path(config, pipeline)?;
    info!("Loading pipeline from: {}", path.display());

    let patee = Patee::load_from(&path, registry)
        .with_context(|| format!("Failed to load pipeline {}", path.display()))?
        .with_execution_mode(mode)
        .with_progress(colored);
    let source = source.into_source()?;

    let outcome = patee
        .run(&source, out.as_deref())
        .context("Pipeline run failed")?;

    let total = patee.steps().len();
    for (idx, name) in outcome.executed_steps.iter().enumerate() {
        println!("{}", format_step(idx + 1, total, name));
    }

    match &outcome.status {
        RunStatus::Succeeded => {
            println!("{}", format_success("Pipeline finished"));
        }
        RunStatus::Stopped { step } => {
            let hint = match &out {
                Some(dir) => format!(
                    "Pipeline stopped at '{}'; review {} and add CONTINUE or STOP",
                    step,
                    dir.join(step).display()
                ),
                None => format!("Pipeline stopped at '{}'", step),
            };
            println!("{}", format_warning(&hint));
        }
    }

    let stats = &outcome.stats;
    info!(
        "{} executed, {} reused ({:.0}%), {} pending in {:.2}s",
        stats.steps_executed,
        stats.steps_skipped,
        stats.skip_rate(),
        stats.steps_pending(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

fn cmd_validate(
    config: &AppConfig,
    registry: &StepRegistry,
    pipeline: Option<PathBuf>,
) -> Result<()> {
    let path = pipeline_path(config, pipeline)?;
    let patee = Patee::load_from(&path, registry)
        .with_context(|| format!("Invalid pipeline {}", path.display()))?;

    println!(
        "{}",
        format_success(&format!(
            "{} is valid: {}",
            path.display(),
            patee.step_names().join(" -> ")
        ))
    );
    Ok(())
}

fn cmd_steps(registry: &StepRegistry) {
    for step_type in registry.get_supported_step_types() {
        println!("{}", step_type);
    }
}

fn cmd_status(out: &Path) -> Result<()> {
    let report = inspect_output(out)
        .with_context(|| format!("Cannot inspect {}", out.display()))?;

    match &report.run {
        Some(run) => println!(
            "{}",
            format_info(&format!(
                "Last run {} started at {}",
                run.run_id,
                run.started_at.to_rfc3339()
            ))
        ),
        None => println!("{}", format_info("No run marker found")),
    }

    let total = report.steps.len();
    for (idx, status) in report.steps.iter().enumerate() {
        let state = match (status.fingerprint(), status.sentinel) {
            (_, Some(sentinel)) => format!("sentinel {:?}", sentinel),
            (Some(fingerprint), None) => format!("cached {}", short_fingerprint(fingerprint)),
            (None, None) => "not cached".to_string(),
        };
        println!(
            "{} ({}, {} artifacts)",
            format_step(idx + 1, total, &status.name),
            state,
            status.artifacts.len()
        );
    }

    Ok(())
}

/// First 12 characters; markers are hand-editable, so this must not slice
/// through a multi-byte character.
fn short_fingerprint(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}
