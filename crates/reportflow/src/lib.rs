//! Client-side orchestrator for weekly report ingestion.
//!
//! Files selected in a host UI run through a sequential pipeline:
//! duplicate check against the backend, an optional user decision when a
//! duplicate is found, multipart upload. The backend parse task that a
//! persist starts is watched in the background over server-sent events;
//! the run itself never waits for it. Results are folded into a per-run
//! summary.
//!
//! The [`Orchestrator`] is the usual entry point; the pieces underneath
//! (backend client, decision queue, task monitor, pipeline) are public
//! for hosts that need finer control.

pub mod api;
pub mod candidate;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod orchestrator;
pub mod pipeline;
pub mod summary;

pub use api::types::{
    DuplicateCheckResult, PersistResponse, PersistedUpload, TaskStatus, TaskStep, TaskUpdate,
    UploadHistoryEntry,
};
pub use api::{BackendClient, HttpBackend, PersistOptions, TaskEventStream};
pub use candidate::{
    parse_report_filename, Category, CwLabel, FilePayload, ParseMode, UploadCandidate,
};
pub use config::{CheckFailurePolicy, ClientConfig};
pub use duplicate::{DecisionPrompt, DecisionQueue, DuplicateDecision};
pub use error::{ApiError, ConfigError, IngestError, Result};
pub use monitor::{TaskMonitor, TaskProgress, TaskWatch};
pub use orchestrator::Orchestrator;
pub use pipeline::{
    BulkImportCoordinator, BulkImportReport, ImportOverrides, RunContext, SkippedFile,
    SlotSelection, UploadPipeline,
};
pub use summary::{
    aggregate, reconcile, ErrorCode, OutcomeError, OutcomeStatus, SummaryError, UploadOutcome,
    UploadSummary,
};
