use std::time::Duration;

use opsdeck_core::StepRecord;

/// Accumulates the ordered step records for one run.
///
/// Append-only: records are immutable once pushed, and their order is the
/// execution order of the pipeline.
#[derive(Debug, Default)]
pub struct StepRecorder {
    steps: Vec<StepRecord>,
}

impl StepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record for a step that returned normally.
    pub fn record_completed(
        &mut self,
        name: &str,
        duration: Duration,
        input_preview: Option<&str>,
        output_preview: Option<&str>,
    ) {
        self.steps.push(StepRecord::completed(
            name,
            duration.as_millis() as u64,
            input_preview,
            output_preview,
        ));
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}
