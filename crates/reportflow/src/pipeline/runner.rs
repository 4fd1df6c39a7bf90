//! Sequential upload pipeline.
//!
//! Candidates run strictly one after another: duplicate check, optional
//! user decision, persist. A successful persist registers the returned
//! parse task with the monitor and immediately records a success
//! outcome; the task's stream is consumed in the background and never
//! blocks the loop. Because the run only advances once the current
//! candidate's decision is resolved, at most one duplicate dialog is
//! ever pending presentation.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::api::types::{DuplicateCheckResult, PersistResponse, PersistedUpload};
use crate::api::{BackendClient, PersistOptions};
use crate::candidate::{Category, FilePayload, ParseMode, UploadCandidate, CwLabel, SLOT_ORDER};
use crate::config::ClientConfig;
use crate::duplicate::{DecisionPrompt, DecisionQueue, DuplicateDecision, DuplicateGate, GateVerdict};
use crate::monitor::TaskMonitor;
use crate::summary::{ErrorCode, UploadOutcome, UploadSummary};

use super::context::RunContext;

/// One file per category slot, processed in [`SLOT_ORDER`].
#[derive(Debug, Default)]
pub struct SlotSelection {
    pub dev: Option<FilePayload>,
    pub epc: Option<FilePayload>,
    pub finance: Option<FilePayload>,
    pub investment: Option<FilePayload>,
}

impl SlotSelection {
    fn take(&mut self, category: Category) -> Option<FilePayload> {
        match category {
            Category::Dev => self.dev.take(),
            Category::Epc => self.epc.take(),
            Category::Finance => self.finance.take(),
            Category::Investment => self.investment.take(),
        }
    }

    /// Turns the filled slots into candidates, empty slots skipped.
    pub fn into_candidates(
        mut self,
        year: i32,
        week: CwLabel,
        parse_mode: ParseMode,
    ) -> Vec<UploadCandidate> {
        let mut candidates = Vec::new();
        for category in SLOT_ORDER {
            if let Some(file) = self.take(category) {
                candidates.push(UploadCandidate::new(
                    category,
                    file,
                    year,
                    week.clone(),
                    parse_mode,
                ));
            }
        }
        candidates
    }
}

/// Drives candidates through check, persist and monitoring.
pub struct UploadPipeline {
    backend: Arc<dyn BackendClient>,
    decisions: Arc<DecisionQueue>,
    monitor: Arc<TaskMonitor>,
    config: ClientConfig,
}

impl UploadPipeline {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        decisions: Arc<DecisionQueue>,
        monitor: Arc<TaskMonitor>,
        config: ClientConfig,
    ) -> Self {
        Self {
            backend,
            decisions,
            monitor,
            config,
        }
    }

    /// Runs all candidates sequentially and returns the run summary.
    pub async fn run(&self, candidates: Vec<UploadCandidate>) -> UploadSummary {
        let mut ctx = RunContext::new();
        let span = info_span!("upload_run", run_id = %ctx.run_id, count = candidates.len());

        async {
            for candidate in candidates {
                let candidate_span = info_span!(
                    "candidate",
                    file = %candidate.file.name,
                    category = candidate.category.as_override()
                );
                let outcome = self.process(&candidate).instrument(candidate_span).await;
                ctx.record(outcome);
            }
        }
        .instrument(span)
        .await;
        ctx.finish()
    }

    async fn process(&self, candidate: &UploadCandidate) -> UploadOutcome {
        // Step 1: duplicate gate.
        let gate = DuplicateGate::new(self.backend.as_ref(), self.config.on_check_failure);
        let mut force = false;
        match gate.check(candidate).await {
            Ok(GateVerdict::Clear) => {}
            Ok(GateVerdict::Duplicate(check)) => {
                match self.ask(candidate, check).await {
                    DuplicateDecision::ForceOverwrite => force = true,
                    DuplicateDecision::Cancel => {
                        info!("Duplicate skipped by user");
                        return UploadOutcome::cancelled(&candidate.file.name, candidate.category);
                    }
                }
            }
            Err(e) => {
                return UploadOutcome::error(
                    &candidate.file.name,
                    candidate.category,
                    ErrorCode::TransportError,
                    format!("duplicate check failed: {e}"),
                );
            }
        }

        // Step 2: persist. The backend can still flag a duplicate the gate
        // missed; that earns exactly one prompt before giving up.
        let upload = match self.persist(candidate, force).await {
            Ok(Some(upload)) => upload,
            Ok(None) => {
                return UploadOutcome::cancelled(&candidate.file.name, candidate.category)
            }
            Err(outcome) => return *outcome,
        };

        // Step 3: hand the parse task to the monitor and move on. The
        // stream runs in the background; parse failures surface on the
        // TaskProgress entry, not on this outcome.
        let _ = self.monitor.subscribe(&upload.task_id, &candidate.file.name);
        UploadOutcome::success(&candidate.file.name, candidate.category, upload)
    }

    /// Persists the candidate, handling a late duplicate verdict.
    ///
    /// `Ok(None)` means the user cancelled at the late prompt.
    async fn persist(
        &self,
        candidate: &UploadCandidate,
        mut force: bool,
    ) -> Result<Option<PersistedUpload>, Box<UploadOutcome>> {
        loop {
            let options = self.persist_options(candidate, force);
            match self.backend.persist(candidate, &options).await {
                Ok(PersistResponse::Persisted(upload)) => {
                    info!(task_id = %upload.task_id, upload_id = %upload.upload_id, "Upload persisted");
                    return Ok(Some(upload));
                }
                Ok(PersistResponse::DuplicateDetected { existing, message }) if !force => {
                    warn!("Backend reported a duplicate the pre-check missed");
                    let check = DuplicateCheckResult {
                        is_duplicate: true,
                        existing,
                        current: None,
                        message,
                    };
                    match self.ask(candidate, check).await {
                        DuplicateDecision::ForceOverwrite => force = true,
                        DuplicateDecision::Cancel => return Ok(None),
                    }
                }
                Ok(PersistResponse::DuplicateDetected { message, .. }) => {
                    // Forced import still refused: nothing left to try.
                    return Err(Box::new(UploadOutcome::error(
                        &candidate.file.name,
                        candidate.category,
                        ErrorCode::DuplicateDetected,
                        message.unwrap_or_else(|| "backend refused forced import".to_string()),
                    )));
                }
                Err(e) => {
                    return Err(Box::new(UploadOutcome::error(
                        &candidate.file.name,
                        candidate.category,
                        ErrorCode::TransportError,
                        format!("persist failed: {e}"),
                    )));
                }
            }
        }
    }

    fn persist_options(&self, candidate: &UploadCandidate, force: bool) -> PersistOptions {
        PersistOptions {
            force_import: force,
            override_year: Some(candidate.target_year),
            override_week: Some(candidate.week.as_str().to_string()),
            override_category: Some(candidate.category.as_override().to_string()),
            created_by: self.config.created_by.clone(),
        }
    }

    /// Queues a duplicate prompt and waits for the user's answer.
    ///
    /// This await is what serializes dialogs: the run cannot move on
    /// until the host resolves the current prompt.
    async fn ask(
        &self,
        candidate: &UploadCandidate,
        check: DuplicateCheckResult,
    ) -> DuplicateDecision {
        let prompt = DecisionPrompt::new(&candidate.file.name, check);
        let receiver = self.decisions.push(prompt);
        // A dropped queue counts as a cancel.
        receiver.await.unwrap_or(DuplicateDecision::Cancel)
    }
}
