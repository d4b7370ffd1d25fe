// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PateeError, Result};
use crate::pipeline::ExecutionMode;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub pipeline: PipelineFileConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub colored: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineFileConfig {
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PATEE")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PateeError::Config(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| PateeError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            logging: LoggingConfig {
                verbose: false,
                colored: true,
            },
            execution: ExecutionConfig {
                mode: ExecutionMode::Cached,
                output_dir: Some(PathBuf::from("./out")),
            },
            pipeline: PipelineFileConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.execution.output_dir {
            if dir.as_os_str().is_empty() {
                return Err(PateeError::Config(
                    "execution.output_dir must not be empty".to_string(),
                ));
            }
        }

        if let Some(path) = &self.pipeline.path {
            if path.as_os_str().is_empty() {
                return Err(PateeError::Config(
                    "pipeline.path must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
