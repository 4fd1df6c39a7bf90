//! Shared builders for integration tests.

use reportflow::api::types::{
    DuplicateCheckResult, ExistingFileInfo, PersistResponse, PersistedUpload, TaskStatus,
    TaskUpdate,
};
use reportflow::{Category, CwLabel, FilePayload, ParseMode, UploadCandidate};

pub fn candidate(name: &str, category: Category) -> UploadCandidate {
    UploadCandidate::new(
        category,
        FilePayload::new(name, b"PK\x03\x04 fake docx".to_vec()),
        2025,
        CwLabel::parse("CW10").unwrap(),
        ParseMode::Simple,
    )
}

pub fn clear_check() -> DuplicateCheckResult {
    DuplicateCheckResult {
        is_duplicate: false,
        existing: None,
        current: None,
        message: None,
    }
}

pub fn duplicate_check(file_name: &str) -> DuplicateCheckResult {
    DuplicateCheckResult {
        is_duplicate: true,
        existing: Some(ExistingFileInfo {
            upload_id: "existing-1".to_string(),
            file_name: file_name.to_string(),
            year: 2025,
            cw_label: "CW10".to_string(),
            category: Category::Dev,
            uploaded_at: None,
            rows_created: Some(20),
        }),
        current: None,
        message: Some("File already imported".to_string()),
    }
}

pub fn persisted(task_id: &str, file_name: &str) -> PersistResponse {
    PersistResponse::Persisted(PersistedUpload {
        task_id: task_id.to_string(),
        upload_id: format!("upload-{task_id}"),
        file_name: file_name.to_string(),
        year: 2025,
        cw_label: "CW10".to_string(),
        category: Category::Dev,
        rows_created: Some(3),
        parsed_with: Some("simple".to_string()),
    })
}

pub fn duplicate_refusal() -> PersistResponse {
    PersistResponse::DuplicateDetected {
        existing: None,
        message: Some("File already imported".to_string()),
    }
}

pub fn task_update(task_id: &str, status: TaskStatus, progress: u8) -> TaskUpdate {
    TaskUpdate {
        task_id: task_id.to_string(),
        status,
        current_step: None,
        progress,
        message: None,
        error_message: None,
        result_count: match status {
            TaskStatus::Completed => Some(42),
            _ => None,
        },
    }
}
