//! Wire types for the report backend.
//!
//! Duplicate-check and persist responses use camelCase field names; task
//! stream frames use snake_case. The serde attributes below pin each shape
//! to what the backend actually emits.

use serde::{Deserialize, Serialize};

use crate::candidate::Category;

/// Summary of an already-persisted report the backend matched against.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingFileInfo {
    pub upload_id: String,
    pub file_name: String,
    pub year: i32,
    pub cw_label: String,
    pub category: Category,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub rows_created: Option<u64>,
}

/// What the backend derived from the file being checked.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentFileInfo {
    pub file_name: String,
    #[serde(alias = "hash")]
    pub content_hash: String,
    pub year: i32,
    pub cw_label: String,
    pub category: Category,
}

/// Response of the pre-upload duplicate check.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    #[serde(default)]
    pub existing: Option<ExistingFileInfo>,
    #[serde(default)]
    pub current: Option<CurrentFileInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A successfully accepted upload, before parsing completes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedUpload {
    pub task_id: String,
    pub upload_id: String,
    pub file_name: String,
    pub year: i32,
    #[serde(rename = "cw_label")]
    pub cw_label: String,
    pub category: Category,
    #[serde(default)]
    pub rows_created: Option<u64>,
    #[serde(default)]
    pub parsed_with: Option<String>,
}

/// Response of the persist call, tagged by the backend's `status` field.
///
/// The backend can still report a duplicate here even after a clear check,
/// the gate and persist are not atomic on the server side.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistResponse {
    #[serde(rename_all = "camelCase")]
    DuplicateDetected {
        #[serde(default)]
        existing: Option<ExistingFileInfo>,
        #[serde(default)]
        message: Option<String>,
    },
    Persisted(PersistedUpload),
}

/// Lifecycle state of a backend parse task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Pipeline step the backend reports while parsing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStep {
    UploadReceived,
    DocumentLoading,
    TextExtraction,
    LlmProcessing,
    DataValidation,
    SavingResults,
    Completed,
}

/// One update frame from a task stream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaskUpdate {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub current_step: Option<TaskStep>,
    /// Percent complete, 0..=100.
    pub progress: u8,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result_count: Option<u64>,
}

/// A decoded frame from a task's server-sent event stream.
///
/// Heartbeats keep idle connections alive and carry no task state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskEvent {
    Update(TaskUpdate),
    Heartbeat {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl TaskEvent {
    pub fn is_heartbeat(&self) -> bool {
        match self {
            TaskEvent::Heartbeat { kind } => kind == "heartbeat",
            TaskEvent::Update(_) => false,
        }
    }
}

/// One row of the backend's upload history listing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadHistoryEntry {
    pub upload_id: String,
    pub file_name: String,
    pub year: i32,
    pub cw_label: String,
    pub category: Category,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub rows_created: Option<u64>,
}
