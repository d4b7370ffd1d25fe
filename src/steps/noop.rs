// file: src/steps/noop.rs
// description: processor that forwards text unchanged and drops metadata

use crate::error::Result;
use crate::models::{DocumentPairContext, Extra, StepContext, StepResult};
use crate::steps::ProcessStep;

pub struct NoopProcessor {
    name: String,
}

impl NoopProcessor {
    pub const STEP_TYPE: &'static str = "noop";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ProcessStep for NoopProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &self,
        _context: &StepContext<'_>,
        mut source: DocumentPairContext,
    ) -> Result<StepResult> {
        source.document_1.extra = Extra::new();
        source.document_2.extra = Extra::new();
        Ok(StepResult::proceed(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::test_support::{contexts, pair_context};
    use serde_json::json;

    #[test]
    fn test_noop_default_instance() {
        assert_eq!(NoopProcessor::new("no-op").name(), "no-op");
    }

    #[test]
    fn test_noop_can_process() {
        let (pipeline, run) = contexts();
        let mut input = pair_context("patata", "petete");
        input
            .document_1
            .extra
            .insert("seen_labels".to_string(), json!(["text"]));

        let result = NoopProcessor::new("no-op")
            .process(&StepContext::new(&pipeline, &run, None), input)
            .unwrap();
        let context = result.into_context().unwrap();

        assert_eq!(context.document_1.text_blocks, vec!["patata"]);
        assert_eq!(context.document_2.text_blocks, vec!["petete"]);
        assert!(context.document_1.extra.is_empty());
    }
}
