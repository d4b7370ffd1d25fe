// file: src/models/metadata.rs
// description: step configuration maps and the identity record of a configured step
// reference: internal data structures

use crate::error::{PateeError, Result};
use crate::utils::hash_value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form configuration of one step, as written in the pipeline file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepConfig(Map<String, Value>);

impl StepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(PateeError::Config(format!(
                "step config must be a mapping, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Self::type_error(key, "a string", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Self::type_error(key, "a boolean", other)),
        }
    }

    /// Deterministic hash of the whole configuration, independent of key
    /// order.
    pub fn config_hash(&self) -> String {
        hash_value(&Value::Object(self.0.clone()))
    }

    fn type_error(key: &str, expected: &str, got: &Value) -> PateeError {
        PateeError::Config(format!("config key '{}' must be {}, got {}", key, expected, got))
    }
}

/// Identity of a configured step inside one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepMetadata {
    pub name: String,
    pub step_type: String,
    pub idx: usize,
    pub config_hash: String,
}

impl StepMetadata {
    pub fn new(
        name: impl Into<String>,
        step_type: impl Into<String>,
        idx: usize,
        config: &StepConfig,
    ) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            idx,
            config_hash: config.config_hash(),
        }
    }
}
