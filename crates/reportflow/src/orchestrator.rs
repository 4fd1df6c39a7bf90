//! Top-level entry point wiring backend, decision queue, monitor and
//! pipeline together for a host application.

use std::sync::Arc;

use crate::api::types::UploadHistoryEntry;
use crate::api::{BackendClient, HttpBackend};
use crate::candidate::{CwLabel, FilePayload, ParseMode};
use crate::config::ClientConfig;
use crate::duplicate::DecisionQueue;
use crate::error::{ApiError, Result};
use crate::monitor::TaskMonitor;
use crate::pipeline::{
    BulkImportCoordinator, BulkImportReport, ImportOverrides, SlotSelection, UploadPipeline,
};
use crate::summary::UploadSummary;

/// Owns the long-lived pieces of the ingestion client.
///
/// The host keeps one of these around, subscribes to the decision queue
/// and the monitor feed, and kicks off runs from its UI events.
pub struct Orchestrator {
    backend: Arc<dyn BackendClient>,
    decisions: Arc<DecisionQueue>,
    monitor: Arc<TaskMonitor>,
    config: ClientConfig,
}

impl Orchestrator {
    /// Builds an orchestrator talking to a real backend over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let backend: Arc<dyn BackendClient> = Arc::new(HttpBackend::new(&config)?);
        Ok(Self::with_backend(backend, config))
    }

    /// Builds an orchestrator on an arbitrary backend implementation.
    pub fn with_backend(backend: Arc<dyn BackendClient>, config: ClientConfig) -> Self {
        let decisions = Arc::new(DecisionQueue::new(config.event_capacity));
        let monitor = Arc::new(TaskMonitor::new(Arc::clone(&backend), config.event_capacity));
        Self {
            backend,
            decisions,
            monitor,
            config,
        }
    }

    pub fn decisions(&self) -> &Arc<DecisionQueue> {
        &self.decisions
    }

    pub fn monitor(&self) -> &Arc<TaskMonitor> {
        &self.monitor
    }

    fn pipeline(&self) -> UploadPipeline {
        UploadPipeline::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.decisions),
            Arc::clone(&self.monitor),
            self.config.clone(),
        )
    }

    /// Runs the fixed-slot upload form: one optional file per category,
    /// all sharing the same reporting period.
    pub async fn upload_slots(
        &self,
        selection: SlotSelection,
        year: i32,
        week: CwLabel,
        parse_mode: ParseMode,
    ) -> UploadSummary {
        let candidates = selection.into_candidates(year, week, parse_mode);
        self.pipeline().run(candidates).await
    }

    /// Runs a free-form bulk import.
    pub async fn import_bulk(
        &self,
        files: Vec<FilePayload>,
        overrides: &ImportOverrides,
    ) -> BulkImportReport {
        BulkImportCoordinator::new(self.pipeline())
            .run(files, overrides)
            .await
    }

    /// Lists previously persisted uploads.
    pub async fn upload_history(&self) -> std::result::Result<Vec<UploadHistoryEntry>, ApiError> {
        self.backend.upload_history().await
    }

    /// Cancels pending duplicate prompts and stops all task watches.
    pub fn shutdown(&self) {
        self.decisions.cancel_all();
        self.monitor.shutdown();
    }
}
