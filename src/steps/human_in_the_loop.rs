// file: src/steps/human_in_the_loop.rs
// description: gating processor that pauses a run for manual edits and resumes from disk
// reference: filesystem sentinels inside the step directory

use crate::error::{PateeError, Result};
use crate::models::{DocumentPairContext, StepContext, StepResult};
use crate::steps::ProcessStep;
use std::fs;
use std::path::Path;
use tracing::info;

/// Create this file in the step directory to end the run here for good.
pub const STOP_SENTINEL: &str = "STOP";
/// Create this file in the step directory to resume with the edited text.
pub const CONTINUE_SENTINEL: &str = "CONTINUE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    NoDirectory,
    AwaitingDecision,
    Stopped,
    Continuing,
}

pub struct HumanInTheLoopProcessor {
    name: String,
}

impl HumanInTheLoopProcessor {
    pub const STEP_TYPE: &'static str = "human_in_the_loop";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn observe(step_dir: Option<&Path>) -> Decision {
        match step_dir {
            None => Decision::NoDirectory,
            Some(dir) if dir.join(STOP_SENTINEL).exists() => Decision::Stopped,
            Some(dir) if dir.join(CONTINUE_SENTINEL).exists() => Decision::Continuing,
            Some(_) => Decision::AwaitingDecision,
        }
    }
}

impl ProcessStep for HumanInTheLoopProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &self,
        context: &StepContext<'_>,
        source: DocumentPairContext,
    ) -> Result<StepResult> {
        let decision = Self::observe(context.step_dir);

        match (decision, context.step_dir) {
            (Decision::NoDirectory, _) | (_, None) => Ok(StepResult::skipped(source)),
            (Decision::AwaitingDecision, Some(dir)) => {
                fs::create_dir_all(dir).map_err(|e| PateeError::persistence(dir, e))?;
                source.dump_to(dir)?;
                info!(
                    "Step '{}' is waiting for review in {}; create {} or {} there and run again",
                    self.name,
                    dir.display(),
                    CONTINUE_SENTINEL,
                    STOP_SENTINEL
                );
                Ok(StepResult::stop())
            }
            (Decision::Stopped, Some(dir)) => {
                info!("Step '{}' stopped by {} in {}", self.name, STOP_SENTINEL, dir.display());
                Ok(StepResult::stop())
            }
            (Decision::Continuing, Some(dir)) => {
                let reloaded = DocumentPairContext::read_from(source.sources(), dir)?;
                info!("Step '{}' resumed with reviewed text from {}", self.name, dir.display());
                Ok(StepResult::proceed(reloaded))
            }
        }
    }
}
