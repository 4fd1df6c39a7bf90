//! Per-run outcomes and their aggregation into a summary.
//!
//! The pipeline records a `success` outcome the moment a persist call is
//! accepted; the backend parse task keeps running after that. Hosts that
//! want the result view to follow the parse use [`reconcile`] to fold a
//! task's live [`TaskProgress`] into the persist-time outcome.

use serde::Serialize;

use crate::api::types::{PersistedUpload, TaskStatus};
use crate::candidate::Category;
use crate::monitor::TaskProgress;

/// Stable error taxonomy exposed to the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TransportError,
    DuplicateDetected,
    ParseFailed,
    UserCancelled,
}

/// A classified failure attached to an outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeError {
    pub code: ErrorCode,
    pub detail: String,
}

impl OutcomeError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Where a single candidate ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum OutcomeStatus {
    /// Persisted, but the parse task has not reached a terminal state.
    /// Produced by [`reconcile`], never by the pipeline itself.
    Pending {
        upload: PersistedUpload,
    },
    Success {
        upload: PersistedUpload,
    },
    Cancelled,
    Error {
        error: OutcomeError,
    },
}

/// Final record for one candidate in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub file_name: String,
    pub category: Category,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl UploadOutcome {
    pub fn success(file_name: impl Into<String>, category: Category, upload: PersistedUpload) -> Self {
        Self {
            file_name: file_name.into(),
            category,
            status: OutcomeStatus::Success { upload },
        }
    }

    pub fn pending(file_name: impl Into<String>, category: Category, upload: PersistedUpload) -> Self {
        Self {
            file_name: file_name.into(),
            category,
            status: OutcomeStatus::Pending { upload },
        }
    }

    pub fn cancelled(file_name: impl Into<String>, category: Category) -> Self {
        Self {
            file_name: file_name.into(),
            category,
            status: OutcomeStatus::Cancelled,
        }
    }

    pub fn error(
        file_name: impl Into<String>,
        category: Category,
        code: ErrorCode,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            category,
            status: OutcomeStatus::Error {
                error: OutcomeError::new(code, detail),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }
}

/// One failed outcome, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryError {
    pub file_name: String,
    pub code: ErrorCode,
    pub detail: String,
}

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub pending: usize,
    pub cancelled: usize,
    pub failed: usize,
    /// Total rows the backend created across successful uploads.
    pub rows_created: u64,
    pub errors: Vec<SummaryError>,
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.cancelled == 0 && self.pending == 0
    }
}

/// Folds outcomes into a summary. Pure; order of `outcomes` is preserved.
pub fn aggregate(outcomes: Vec<UploadOutcome>) -> UploadSummary {
    let mut summary = UploadSummary {
        total: outcomes.len(),
        succeeded: 0,
        pending: 0,
        cancelled: 0,
        failed: 0,
        rows_created: 0,
        errors: Vec::new(),
        outcomes: Vec::new(),
    };
    for outcome in &outcomes {
        match &outcome.status {
            OutcomeStatus::Success { upload } => {
                summary.succeeded += 1;
                summary.rows_created += upload.rows_created.unwrap_or(0);
            }
            OutcomeStatus::Pending { .. } => summary.pending += 1,
            OutcomeStatus::Cancelled => summary.cancelled += 1,
            OutcomeStatus::Error { error } => {
                summary.failed += 1;
                summary.errors.push(SummaryError {
                    file_name: outcome.file_name.clone(),
                    code: error.code,
                    detail: error.detail.clone(),
                });
            }
        }
    }
    summary.outcomes = outcomes;
    summary
}

/// Folds a task's live progress into its persist-time outcome.
///
/// A `success` outcome whose task is still running becomes `pending`;
/// a failed task becomes a `PARSE_FAILED` error; a completed task stays
/// `success`, with `rows_created` filled from the stream's result count
/// when the persist response carried none. Outcomes for other tasks, or
/// without an upload, come back unchanged. Pure, like [`aggregate`].
pub fn reconcile(outcome: &UploadOutcome, progress: &TaskProgress) -> UploadOutcome {
    let upload = match &outcome.status {
        OutcomeStatus::Success { upload } | OutcomeStatus::Pending { upload } => upload,
        _ => return outcome.clone(),
    };
    if progress.task_id != upload.task_id {
        return outcome.clone();
    }
    match progress.status {
        TaskStatus::Completed => {
            let mut upload = upload.clone();
            if upload.rows_created.is_none() {
                upload.rows_created = progress.result_count;
            }
            UploadOutcome::success(&outcome.file_name, outcome.category, upload)
        }
        TaskStatus::Failed => UploadOutcome::error(
            &outcome.file_name,
            outcome.category,
            ErrorCode::ParseFailed,
            progress
                .error_message
                .clone()
                .unwrap_or_else(|| "backend parse task failed".to_string()),
        ),
        TaskStatus::Pending | TaskStatus::Processing => {
            UploadOutcome::pending(&outcome.file_name, outcome.category, upload.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(rows: Option<u64>) -> PersistedUpload {
        PersistedUpload {
            task_id: "t-1".to_string(),
            upload_id: "u-1".to_string(),
            file_name: "2025_CW01_DEV.docx".to_string(),
            year: 2025,
            cw_label: "CW01".to_string(),
            category: Category::Dev,
            rows_created: rows,
            parsed_with: None,
        }
    }

    #[test]
    fn test_aggregate_counts_and_rows() {
        let summary = aggregate(vec![
            UploadOutcome::success("a.docx", Category::Dev, persisted(Some(10))),
            UploadOutcome::success("b.docx", Category::Epc, persisted(Some(5))),
            UploadOutcome::cancelled("c.docx", Category::Finance),
            UploadOutcome::error(
                "d.docx",
                Category::Investment,
                ErrorCode::ParseFailed,
                "backend parse task failed",
            ),
        ]);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.rows_created, 15);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].file_name, "d.docx");
        assert_eq!(summary.errors[0].code, ErrorCode::ParseFailed);
    }

    #[test]
    fn test_aggregate_empty_run() {
        let summary = aggregate(Vec::new());
        assert_eq!(summary.total, 0);
        assert!(summary.all_succeeded());
    }

    #[test]
    fn test_aggregate_preserves_order() {
        let summary = aggregate(vec![
            UploadOutcome::cancelled("z.docx", Category::Finance),
            UploadOutcome::success("a.docx", Category::Dev, persisted(None)),
        ]);
        assert_eq!(summary.outcomes[0].file_name, "z.docx");
        assert_eq!(summary.outcomes[1].file_name, "a.docx");
    }

    fn progress(task_id: &str, status: TaskStatus) -> TaskProgress {
        TaskProgress {
            task_id: task_id.to_string(),
            file_name: "a.docx".to_string(),
            status,
            current_step: None,
            progress: 100,
            message: None,
            error_message: None,
            result_count: Some(9),
        }
    }

    #[test]
    fn test_aggregate_counts_pending() {
        let summary = aggregate(vec![
            UploadOutcome::pending("a.docx", Category::Dev, persisted(None)),
            UploadOutcome::success("b.docx", Category::Epc, persisted(Some(4))),
        ]);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.succeeded, 1);
        // Pending uploads contribute no rows yet.
        assert_eq!(summary.rows_created, 4);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_reconcile_running_task_stays_pending() {
        let outcome = UploadOutcome::success("a.docx", Category::Dev, persisted(None));
        let updated = reconcile(&outcome, &progress("t-1", TaskStatus::Processing));
        assert!(matches!(updated.status, OutcomeStatus::Pending { .. }));
    }

    #[test]
    fn test_reconcile_failed_task_becomes_parse_error() {
        let outcome = UploadOutcome::success("a.docx", Category::Dev, persisted(None));
        let mut failed = progress("t-1", TaskStatus::Failed);
        failed.error_message = Some("document is corrupt".to_string());
        let updated = reconcile(&outcome, &failed);
        match updated.status {
            OutcomeStatus::Error { error } => {
                assert_eq!(error.code, ErrorCode::ParseFailed);
                assert_eq!(error.detail, "document is corrupt");
            }
            other => panic!("expected error outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_reconcile_completed_task_fills_rows() {
        let outcome = UploadOutcome::pending("a.docx", Category::Dev, persisted(None));
        let updated = reconcile(&outcome, &progress("t-1", TaskStatus::Completed));
        match updated.status {
            OutcomeStatus::Success { upload } => assert_eq!(upload.rows_created, Some(9)),
            other => panic!("expected success outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_reconcile_ignores_unrelated_tasks() {
        let outcome = UploadOutcome::success("a.docx", Category::Dev, persisted(Some(3)));
        let updated = reconcile(&outcome, &progress("t-other", TaskStatus::Failed));
        assert_eq!(updated, outcome);

        let cancelled = UploadOutcome::cancelled("b.docx", Category::Epc);
        assert_eq!(
            reconcile(&cancelled, &progress("t-1", TaskStatus::Completed)),
            cancelled
        );
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let outcomes = vec![
            UploadOutcome::success("a.docx", Category::Dev, persisted(Some(3))),
            UploadOutcome::error("b.docx", Category::Epc, ErrorCode::TransportError, "timeout"),
        ];
        assert_eq!(aggregate(outcomes.clone()), aggregate(outcomes));
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::TransportError).unwrap(),
            r#""TRANSPORT_ERROR""#
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::UserCancelled).unwrap(),
            r#""USER_CANCELLED""#
        );
    }

    #[test]
    fn test_outcome_serializes_flat_status() {
        let outcome = UploadOutcome::cancelled("a.docx", Category::Dev);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "cancelled");
        assert_eq!(json["fileName"], "a.docx");
    }
}
