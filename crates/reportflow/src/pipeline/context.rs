//! Per-run state for a pipeline execution.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::summary::{aggregate, UploadOutcome, UploadSummary};

/// Everything one pipeline run accumulates.
///
/// Each run gets its own context; nothing here outlives the run or is
/// shared between concurrent runs.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    outcomes: Vec<UploadOutcome>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: UploadOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[UploadOutcome] {
        &self.outcomes
    }

    /// Closes the run and folds its outcomes into a summary.
    pub fn finish(self) -> UploadSummary {
        let summary = aggregate(self.outcomes);
        let elapsed = Utc::now() - self.started_at;
        info!(
            run_id = %self.run_id,
            total = summary.total,
            succeeded = summary.succeeded,
            cancelled = summary.cancelled,
            failed = summary.failed,
            elapsed_ms = elapsed.num_milliseconds(),
            "Upload run finished"
        );
        summary
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Category;

    #[test]
    fn test_finish_aggregates_recorded_outcomes() {
        let mut ctx = RunContext::new();
        ctx.record(UploadOutcome::cancelled("a.docx", Category::Dev));
        ctx.record(UploadOutcome::cancelled("b.docx", Category::Epc));
        let summary = ctx.finish();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.cancelled, 2);
    }

    #[test]
    fn test_contexts_are_distinct() {
        assert_ne!(RunContext::new().run_id, RunContext::new().run_id);
    }
}
