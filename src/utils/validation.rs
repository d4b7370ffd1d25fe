// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{PateeError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref STEP_NAME: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
    static ref LANGUAGE_CODE: Regex = Regex::new(r"^[a-z]{2,3}$").unwrap();
}

pub struct Validator;

impl Validator {
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            PateeError::Config(format!(
                "Cannot resolve document {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(PateeError::Config(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(PateeError::Config(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(PateeError::Config(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Step names become directory names under the output dir, next to the
    /// run marker, so hidden names are reserved.
    pub fn validate_step_name(name: &str) -> Result<()> {
        if !STEP_NAME.is_match(name) {
            return Err(PateeError::Config(format!(
                "Invalid step name '{}': only letters, digits, '_', '-' and '.' are allowed",
                name
            )));
        }
        if name.starts_with('.') {
            return Err(PateeError::Config(format!(
                "Invalid step name '{}': names starting with '.' are reserved",
                name
            )));
        }
        Ok(())
    }

    pub fn validate_language_code(code: &str) -> Result<()> {
        if !LANGUAGE_CODE.is_match(code) {
            return Err(PateeError::Config(format!(
                "Invalid language code '{}': expected a lowercase ISO 639 code",
                code
            )));
        }
        Ok(())
    }

    /// Absolute form of `path`, resolving symlinks when the file exists.
    pub fn resolve_path(path: &Path) -> PathBuf {
        fs::canonicalize(path)
            .or_else(|_| std::path::absolute(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
