//! Scripted in-memory backend for pipeline tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};

use reportflow::api::types::{
    DuplicateCheckResult, PersistResponse, TaskEvent, TaskStatus, UploadHistoryEntry,
};
use reportflow::api::{BackendClient, PersistOptions, TaskEventStream};
use reportflow::{ApiError, UploadCandidate};

use super::builders::task_update;

/// Backend whose responses are queued up front and whose calls are
/// recorded for later assertions.
#[derive(Default)]
pub struct MockBackend {
    check_results: Mutex<VecDeque<Result<DuplicateCheckResult, ApiError>>>,
    persist_results: Mutex<VecDeque<Result<PersistResponse, ApiError>>>,
    task_scripts: Mutex<HashMap<String, Vec<TaskEvent>>>,
    silent_tasks: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_check(&self, result: Result<DuplicateCheckResult, ApiError>) {
        self.check_results.lock().unwrap().push_back(result);
    }

    pub fn queue_persist(&self, result: Result<PersistResponse, ApiError>) {
        self.persist_results.lock().unwrap().push_back(result);
    }

    /// Overrides the default stream script for one task.
    pub fn script_task(&self, task_id: &str, events: Vec<TaskEvent>) {
        self.task_scripts
            .lock()
            .unwrap()
            .insert(task_id.to_string(), events);
    }

    /// Makes a task's stream stay open without ever emitting a frame.
    pub fn script_task_silent(&self, task_id: &str) {
        self.silent_tasks.lock().unwrap().insert(task_id.to_string());
    }

    /// Chronological list of calls, e.g. `check:a.docx`,
    /// `persist:a.docx:force=true`, `stream:task-1`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn default_script(task_id: &str) -> Vec<TaskEvent> {
        vec![
            TaskEvent::Update(task_update(task_id, TaskStatus::Processing, 50)),
            TaskEvent::Heartbeat {
                kind: "heartbeat".to_string(),
            },
            TaskEvent::Update(task_update(task_id, TaskStatus::Completed, 100)),
        ]
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn check_duplicate(
        &self,
        candidate: &UploadCandidate,
    ) -> Result<DuplicateCheckResult, ApiError> {
        self.record(format!("check:{}", candidate.file.name));
        self.check_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted check result for {}", candidate.file.name))
    }

    async fn persist(
        &self,
        candidate: &UploadCandidate,
        options: &PersistOptions,
    ) -> Result<PersistResponse, ApiError> {
        self.record(format!(
            "persist:{}:force={}",
            candidate.file.name, options.force_import
        ));
        self.persist_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted persist result for {}", candidate.file.name))
    }

    async fn task_events(&self, task_id: &str) -> Result<TaskEventStream, ApiError> {
        self.record(format!("stream:{task_id}"));
        if self.silent_tasks.lock().unwrap().contains(task_id) {
            return Ok(stream::pending().boxed());
        }
        let events = self
            .task_scripts
            .lock()
            .unwrap()
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| Self::default_script(task_id));
        let items: Vec<Result<TaskEvent, ApiError>> = events.into_iter().map(Ok).collect();
        Ok(stream::iter(items).boxed())
    }

    async fn upload_history(&self) -> Result<Vec<UploadHistoryEntry>, ApiError> {
        self.record("history".to_string());
        Ok(Vec::new())
    }
}
