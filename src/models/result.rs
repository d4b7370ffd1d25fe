// file: src/models/result.rs
// description: control envelope returned by every step execution
// reference: internal data structures

use crate::models::document::DocumentPairContext;

/// Either carries a context for the next step or tells the coordinator to
/// stop. A result never carries a context and a stop request at once.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    context: Option<DocumentPairContext>,
    skipped: bool,
}

impl StepResult {
    pub fn proceed(context: DocumentPairContext) -> Self {
        Self {
            context: Some(context),
            skipped: false,
        }
    }

    /// The stage did not run; `context` is passed through or was reloaded.
    pub fn skipped(context: DocumentPairContext) -> Self {
        Self {
            context: Some(context),
            skipped: true,
        }
    }

    pub fn stop() -> Self {
        Self {
            context: None,
            skipped: false,
        }
    }

    pub fn should_stop_pipeline(&self) -> bool {
        self.context.is_none()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn context(&self) -> Option<&DocumentPairContext> {
        self.context.as_ref()
    }

    pub fn into_context(self) -> Option<DocumentPairContext> {
        self.context
    }
}
