//! Task progress monitoring over server-sent-event streams.
//!
//! Each watched task gets its own stream consumer; the stream lives
//! exactly as long as the watch. Updates land in a snapshot map, on the
//! shared broadcast feed and on the watch's private channel. Heartbeat
//! frames are discarded before any of that.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::types::{TaskEvent, TaskStatus, TaskStep, TaskUpdate};
use crate::api::BackendClient;

/// Client-side view of a backend parse task.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TaskProgress {
    pub task_id: String,
    /// Name of the file whose parse this task tracks, so the host can
    /// label progress bars.
    pub file_name: String,
    pub status: TaskStatus,
    pub current_step: Option<TaskStep>,
    pub progress: u8,
    pub message: Option<String>,
    pub error_message: Option<String>,
    pub result_count: Option<u64>,
}

impl TaskProgress {
    /// Initial state shown before the first stream frame arrives.
    pub fn pending(task_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            file_name: file_name.into(),
            status: TaskStatus::Pending,
            current_step: None,
            progress: 0,
            message: None,
            error_message: None,
            result_count: None,
        }
    }

    fn failed(task_id: impl Into<String>, file_name: impl Into<String>, error: String) -> Self {
        Self {
            task_id: task_id.into(),
            file_name: file_name.into(),
            status: TaskStatus::Failed,
            current_step: None,
            progress: 0,
            message: None,
            error_message: Some(error),
            result_count: None,
        }
    }

    fn from_update(update: TaskUpdate, file_name: String) -> Self {
        Self {
            task_id: update.task_id,
            file_name,
            status: update.status,
            current_step: update.current_step,
            progress: update.progress,
            message: update.message,
            error_message: update.error_message,
            result_count: update.result_count,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Live handle on one watched task.
///
/// Dropping the watch does not stop the consumer; call
/// [`TaskMonitor::unsubscribe`] for that.
pub struct TaskWatch {
    task_id: String,
    updates: mpsc::UnboundedReceiver<TaskProgress>,
}

impl TaskWatch {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Next progress update, `None` once the stream consumer is gone.
    pub async fn next(&mut self) -> Option<TaskProgress> {
        self.updates.recv().await
    }

    /// Consumes updates until the task reaches a terminal status.
    ///
    /// Returns `None` if the stream ended before the task finished.
    pub async fn wait_terminal(&mut self) -> Option<TaskProgress> {
        while let Some(progress) = self.updates.recv().await {
            if progress.is_terminal() {
                return Some(progress);
            }
        }
        None
    }
}

/// Tracks backend parse tasks and fans their progress out to the host.
pub struct TaskMonitor {
    backend: Arc<dyn BackendClient>,
    entries: Arc<RwLock<HashMap<String, TaskProgress>>>,
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
    feed: broadcast::Sender<TaskProgress>,
}

impl TaskMonitor {
    pub fn new(backend: Arc<dyn BackendClient>, event_capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(event_capacity.max(1));
        Self {
            backend,
            entries: Arc::new(RwLock::new(HashMap::new())),
            handles: Mutex::new(HashMap::new()),
            feed,
        }
    }

    /// Receives every update of every watched task.
    pub fn updates(&self) -> broadcast::Receiver<TaskProgress> {
        self.feed.subscribe()
    }

    /// Latest known progress for a task.
    pub fn progress(&self, task_id: &str) -> Option<TaskProgress> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(task_id).cloned()
    }

    /// All tracked tasks, terminal ones included until unsubscribed.
    pub fn snapshot(&self) -> Vec<TaskProgress> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.values().cloned().collect()
    }

    /// Starts watching a task. The entry appears immediately as pending;
    /// stream frames overwrite it as they arrive. Subscribing to an
    /// already-watched task restarts its consumer.
    pub fn subscribe(&self, task_id: &str, file_name: &str) -> TaskWatch {
        let (tx, rx) = mpsc::unbounded_channel();
        self.store(TaskProgress::pending(task_id, file_name));

        let backend = Arc::clone(&self.backend);
        let entries = Arc::clone(&self.entries);
        let feed = self.feed.clone();
        let id = task_id.to_string();
        let name = file_name.to_string();
        let handle = tokio::spawn(async move {
            consume_stream(backend, entries, feed, id, name, tx).await;
        });

        let mut handles = self.lock_handles();
        if let Some(previous) = handles.insert(task_id.to_string(), handle) {
            previous.abort();
        }

        TaskWatch {
            task_id: task_id.to_string(),
            updates: rx,
        }
    }

    /// Stops watching a task and forgets its progress. A second call for
    /// the same task is a no-op.
    pub fn unsubscribe(&self, task_id: &str) {
        if let Some(handle) = self.lock_handles().remove(task_id) {
            handle.abort();
        }
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(task_id);
    }

    /// Aborts every stream consumer and clears all progress.
    pub fn shutdown(&self) {
        let mut handles = self.lock_handles();
        for (_, handle) in handles.drain() {
            handle.abort();
        }
        drop(handles);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
    }

    fn store(&self, progress: TaskProgress) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(progress.task_id.clone(), progress);
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn consume_stream(
    backend: Arc<dyn BackendClient>,
    entries: Arc<RwLock<HashMap<String, TaskProgress>>>,
    feed: broadcast::Sender<TaskProgress>,
    task_id: String,
    file_name: String,
    watch_tx: mpsc::UnboundedSender<TaskProgress>,
) {
    let publish = |progress: TaskProgress| {
        let mut map = entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Entries removed by unsubscribe stay removed.
        if map.contains_key(&task_id) {
            map.insert(task_id.clone(), progress.clone());
        }
        drop(map);
        let _ = feed.send(progress.clone());
        let _ = watch_tx.send(progress);
    };

    let mut stream = match backend.task_events(&task_id).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "Failed to open task stream");
            publish(TaskProgress::failed(&task_id, &file_name, e.to_string()));
            return;
        }
    };

    while let Some(event) = stream.next().await {
        match event {
            Ok(TaskEvent::Heartbeat { .. }) => {}
            Ok(TaskEvent::Update(update)) => {
                let progress = TaskProgress::from_update(update, file_name.clone());
                let terminal = progress.is_terminal();
                publish(progress);
                if terminal {
                    break;
                }
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task stream broke");
                publish(TaskProgress::failed(&task_id, &file_name, e.to_string()));
                return;
            }
        }
    }
    debug!(task_id = %task_id, "Task stream closed");
}
