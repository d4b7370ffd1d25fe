// file: src/pipeline/marker.rs
// description: on-disk completion markers for cached steps and runs
// reference: https://docs.rs/chrono

use crate::error::{PateeError, Result};
use crate::models::StepMetadata;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Hidden file name shared by step and run markers.
pub const MARKER_FILE: &str = ".patee";

/// Written into a step directory once its artifacts are complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMarker {
    pub fingerprint: String,
    pub step: StepMetadata,
    pub created_at: DateTime<Utc>,
}

impl StepMarker {
    pub fn new(fingerprint: impl Into<String>, step: StepMetadata) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            step,
            created_at: Utc::now(),
        }
    }

    pub fn path_in(step_dir: &Path) -> PathBuf {
        step_dir.join(MARKER_FILE)
    }

    /// `None` when the marker is missing or unreadable.
    pub fn read(step_dir: &Path) -> Option<Self> {
        read_json(&Self::path_in(step_dir))
    }

    pub fn write(&self, step_dir: &Path) -> Result<()> {
        write_json_atomic(&Self::path_in(step_dir), self)
    }

    pub fn remove(step_dir: &Path) -> Result<()> {
        let path = Self::path_in(step_dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PateeError::persistence(path, e)),
        }
    }
}

/// Written at the root of the output directory on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMarker {
    pub source_fingerprint: String,
    pub run_id: Uuid,
    pub steps: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl RunMarker {
    pub fn new(source_fingerprint: impl Into<String>, run_id: Uuid, steps: Vec<String>) -> Self {
        Self {
            source_fingerprint: source_fingerprint.into(),
            run_id,
            steps,
            started_at: Utc::now(),
        }
    }

    pub fn read(out_dir: &Path) -> Option<Self> {
        read_json(&out_dir.join(MARKER_FILE))
    }

    pub fn write(&self, out_dir: &Path) -> Result<()> {
        write_json_atomic(&out_dir.join(MARKER_FILE), self)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring corrupt marker {}: {}", path.display(), e);
            None
        }
    }
}

/// Readers either see the previous file or the complete new one.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json).map_err(|e| PateeError::persistence(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| PateeError::persistence(path, e))?;
    Ok(())
}
