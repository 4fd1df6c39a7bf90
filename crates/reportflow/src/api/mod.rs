//! Backend access layer.
//!
//! [`BackendClient`] is the seam between the orchestration logic and the
//! report backend. The production implementation is [`HttpBackend`];
//! tests substitute their own.

pub mod http;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::candidate::UploadCandidate;
use crate::error::ApiError;
use types::{DuplicateCheckResult, PersistResponse, TaskEvent, UploadHistoryEntry};

pub use http::HttpBackend;

/// Live stream of decoded frames for one backend task.
pub type TaskEventStream = BoxStream<'static, Result<TaskEvent, ApiError>>;

/// Overrides and knobs for one persist call.
#[derive(Debug, Clone, Default)]
pub struct PersistOptions {
    /// Persist even if the backend sees the file as a duplicate.
    pub force_import: bool,
    pub override_year: Option<i32>,
    pub override_week: Option<String>,
    pub override_category: Option<String>,
    pub created_by: Option<String>,
}

/// Operations the orchestrator needs from the report backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Asks the backend whether this file was already imported.
    async fn check_duplicate(
        &self,
        candidate: &UploadCandidate,
    ) -> Result<DuplicateCheckResult, ApiError>;

    /// Uploads the file and starts a parse task for it.
    async fn persist(
        &self,
        candidate: &UploadCandidate,
        options: &PersistOptions,
    ) -> Result<PersistResponse, ApiError>;

    /// Opens the server-sent-event stream for a running task.
    async fn task_events(&self, task_id: &str) -> Result<TaskEventStream, ApiError>;

    /// Lists previously persisted uploads, most recent first.
    async fn upload_history(&self) -> Result<Vec<UploadHistoryEntry>, ApiError>;
}
