// file: src/pipeline/inspect.rs
// description: read-only report of what a previous run left in its output directory
// reference: https://docs.rs/walkdir

use crate::error::Result;
use crate::pipeline::marker::{MARKER_FILE, RunMarker, StepMarker};
use crate::steps::{CONTINUE_SENTINEL, STOP_SENTINEL};
use crate::utils::Validator;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Stop,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepStatus {
    pub name: String,
    pub marker: Option<StepMarker>,
    pub artifacts: Vec<PathBuf>,
    pub sentinel: Option<Sentinel>,
}

impl StepStatus {
    fn new(name: String, dir: &Path) -> Self {
        let sentinel = if dir.join(STOP_SENTINEL).exists() {
            Some(Sentinel::Stop)
        } else if dir.join(CONTINUE_SENTINEL).exists() {
            Some(Sentinel::Continue)
        } else {
            None
        };

        Self {
            name,
            marker: StepMarker::read(dir),
            artifacts: Vec::new(),
            sentinel,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.marker.is_some()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.marker.as_ref().map(|m| m.fingerprint.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputReport {
    pub run: Option<RunMarker>,
    pub steps: Vec<StepStatus>,
}

/// Lists every step directory under `out_dir`, ordered by the last run's
/// step order when known, by name otherwise.
pub fn inspect_output(out_dir: &Path) -> Result<OutputReport> {
    Validator::validate_directory(out_dir)?;

    let mut steps: BTreeMap<String, StepStatus> = BTreeMap::new();
    for entry in WalkDir::new(out_dir)
        .min_depth(1)
        .max_depth(2)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();

        if entry.depth() == 1 {
            if entry.file_type().is_dir() {
                steps.insert(file_name.clone(), StepStatus::new(file_name, path));
            }
            continue;
        }

        if !entry.file_type().is_file()
            || [MARKER_FILE, STOP_SENTINEL, CONTINUE_SENTINEL].contains(&file_name.as_str())
        {
            continue;
        }

        let parent = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        if let Some(status) = parent.and_then(|p| steps.get_mut(&p)) {
            status.artifacts.push(path.to_path_buf());
        }
    }

    let run = RunMarker::read(out_dir);
    let mut ordered = Vec::with_capacity(steps.len());
    if let Some(marker) = &run {
        for name in &marker.steps {
            if let Some(status) = steps.remove(name) {
                ordered.push(status);
            }
        }
    }
    ordered.extend(steps.into_values());

    Ok(OutputReport {
        run,
        steps: ordered,
    })
}
