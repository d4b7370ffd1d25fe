// file: src/pipeline/spec.rs
// description: ordered step specification parsed from a YAML pipeline file
// reference: https://docs.rs/yaml-rust

use crate::error::{PateeError, Result};
use crate::models::StepConfig;
use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

#[derive(Debug, Clone, PartialEq)]
pub struct StepSpec {
    pub step_type: String,
    pub name: Option<String>,
    pub config: StepConfig,
}

impl StepSpec {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            name: None,
            config: StepConfig::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = config;
        self
    }

    /// The explicit name, or the step type when none was given.
    pub fn resolved_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.step_type)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineSpec {
    pub steps: Vec<StepSpec>,
}

impl PipelineSpec {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        Self { steps }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PateeError::Config(format!(
                "Cannot read pipeline file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let docs = YamlLoader::load_from_str(content)
            .map_err(|e| PateeError::Yaml(format!("pipeline parse error: {}", e)))?;

        let root = docs
            .first()
            .ok_or_else(|| PateeError::Config("pipeline file is empty".to_string()))?;

        let steps = match &root["steps"] {
            Yaml::Array(items) => items,
            Yaml::BadValue => {
                return Err(PateeError::Config(
                    "pipeline file must define a 'steps' list".to_string(),
                ));
            }
            other => {
                return Err(PateeError::Config(format!(
                    "'steps' must be a list, got {:?}",
                    other
                )));
            }
        };

        let steps = steps
            .iter()
            .enumerate()
            .map(|(idx, item)| Self::parse_step(idx, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { steps })
    }

    fn parse_step(idx: usize, item: &Yaml) -> Result<StepSpec> {
        if !matches!(item, Yaml::Hash(_)) {
            return Err(PateeError::Config(format!(
                "step {} must be a mapping with a 'type'",
                idx
            )));
        }

        let step_type = match item["type"].as_str() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                return Err(PateeError::Config(format!(
                    "Step type is required (step {})",
                    idx
                )));
            }
        };

        let name = match &item["name"] {
            Yaml::String(s) if !s.is_empty() => Some(s.clone()),
            Yaml::BadValue | Yaml::Null => None,
            Yaml::String(_) => None,
            other => {
                return Err(PateeError::Config(format!(
                    "step {} name must be a string, got {:?}",
                    idx, other
                )));
            }
        };

        let config = match &item["config"] {
            Yaml::BadValue | Yaml::Null => StepConfig::new(),
            other => StepConfig::from_value(yaml_to_json(other)?)?,
        };

        Ok(StepSpec {
            step_type,
            name,
            config,
        })
    }
}

fn yaml_to_json(yaml: &Yaml) -> Result<Value> {
    Ok(match yaml {
        Yaml::Null | Yaml::BadValue => Value::Null,
        Yaml::Boolean(b) => Value::Bool(*b),
        Yaml::Integer(i) => Value::Number((*i).into()),
        Yaml::Real(raw) => {
            let parsed = raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .ok_or_else(|| PateeError::Yaml(format!("invalid number '{}'", raw)))?;
            Value::Number(parsed)
        }
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Array(items) => Value::Array(items.iter().map(yaml_to_json).collect::<Result<_>>()?),
        Yaml::Hash(hash) => {
            let mut map = Map::new();
            for (key, value) in hash {
                let key = match key {
                    Yaml::String(s) => s.clone(),
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Boolean(b) => b.to_string(),
                    Yaml::Real(r) => r.clone(),
                    other => {
                        return Err(PateeError::Yaml(format!(
                            "unsupported mapping key {:?}",
                            other
                        )));
                    }
                };
                map.insert(key, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        Yaml::Alias(_) => {
            return Err(PateeError::Yaml("YAML aliases are not supported".to_string()));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_pipeline() {
        let yaml = r#"
steps:
  - type: text_extractor
    config:
      split_paragraphs: true
  - type: human_in_the_loop
    name: review
  - type: write_to_file
    name: export
    config:
      output_dir: out
      ratio: 0.5
      labels: [text, title]
"#;

        let spec = PipelineSpec::from_yaml_str(yaml).unwrap();
        assert_eq!(spec.steps.len(), 3);
        assert_eq!(spec.steps[0].resolved_name(), "text_extractor");
        assert_eq!(spec.steps[0].config.get_bool("split_paragraphs").unwrap(), Some(true));
        assert_eq!(spec.steps[1].resolved_name(), "review");
        assert!(spec.steps[1].config.is_empty());
        assert_eq!(spec.steps[2].config.get("ratio"), Some(&json!(0.5)));
        assert_eq!(spec.steps[2].config.get("labels"), Some(&json!(["text", "title"])));
    }

    #[test]
    fn test_missing_type_is_config_error() {
        let err = PipelineSpec::from_yaml_str("steps:\n  - name: nameless\n").unwrap_err();
        assert!(matches!(err, PateeError::Config(_)));
    }

    #[test]
    fn test_missing_steps_is_config_error() {
        let err = PipelineSpec::from_yaml_str("stages: []\n").unwrap_err();
        assert!(matches!(err, PateeError::Config(_)));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = PipelineSpec::from_yaml_str("steps: [\n").unwrap_err();
        assert!(matches!(err, PateeError::Yaml(_)));
    }

    #[test]
    fn test_non_mapping_config_is_rejected() {
        let yaml = "steps:\n  - type: noop\n    config: [1, 2]\n";
        let err = PipelineSpec::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, PateeError::Config(_)));
    }
}
