//! Duplicate gating and user decision handling.
//!
//! Before a file is persisted it runs through the [`DuplicateGate`]. A
//! duplicate verdict produces a [`DecisionPrompt`] that is queued in the
//! [`DecisionQueue`]; the pipeline then waits for the host UI to resolve
//! the prompt before touching the next candidate. Only the front of the
//! queue is ever presented, so at most one dialog is active at a time.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::types::DuplicateCheckResult;
use crate::api::BackendClient;
use crate::candidate::UploadCandidate;
use crate::config::CheckFailurePolicy;
use crate::error::ApiError;

/// User's answer to a duplicate prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// Re-import the file, replacing the stored version.
    ForceOverwrite,
    /// Skip this file.
    Cancel,
}

/// Outcome of the pre-persist duplicate check.
#[derive(Debug)]
pub enum GateVerdict {
    Clear,
    Duplicate(DuplicateCheckResult),
}

/// Runs the backend duplicate check and applies the failure policy.
pub struct DuplicateGate<'a> {
    backend: &'a dyn BackendClient,
    policy: CheckFailurePolicy,
}

impl<'a> DuplicateGate<'a> {
    pub fn new(backend: &'a dyn BackendClient, policy: CheckFailurePolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn check(&self, candidate: &UploadCandidate) -> Result<GateVerdict, ApiError> {
        match self.backend.check_duplicate(candidate).await {
            Ok(result) if result.is_duplicate => Ok(GateVerdict::Duplicate(result)),
            Ok(_) => Ok(GateVerdict::Clear),
            Err(e) if self.policy == CheckFailurePolicy::Proceed => {
                warn!(
                    file = %candidate.file.name,
                    error = %e,
                    "Duplicate check failed, proceeding without duplicate protection"
                );
                Ok(GateVerdict::Clear)
            }
            Err(e) => Err(e),
        }
    }
}

/// A duplicate question awaiting a user decision.
#[derive(Debug, Clone)]
pub struct DecisionPrompt {
    pub prompt_id: String,
    pub file_name: String,
    pub check: DuplicateCheckResult,
}

impl DecisionPrompt {
    pub fn new(file_name: impl Into<String>, check: DuplicateCheckResult) -> Self {
        Self {
            prompt_id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            check,
        }
    }
}

struct PendingDecision {
    prompt: DecisionPrompt,
    responder: oneshot::Sender<DuplicateDecision>,
}

/// FIFO queue of duplicate prompts.
///
/// Prompts become visible to subscribers one at a time, in arrival order.
/// Resolving the current prompt promotes and announces the next one.
pub struct DecisionQueue {
    pending: Mutex<VecDeque<PendingDecision>>,
    prompts: broadcast::Sender<DecisionPrompt>,
}

impl DecisionQueue {
    pub fn new(capacity: usize) -> Self {
        let (prompts, _) = broadcast::channel(capacity.max(1));
        Self {
            pending: Mutex::new(VecDeque::new()),
            prompts,
        }
    }

    /// Receives each prompt as it becomes the current one.
    pub fn subscribe(&self) -> broadcast::Receiver<DecisionPrompt> {
        self.prompts.subscribe()
    }

    /// The prompt currently awaiting a decision, if any.
    pub fn current(&self) -> Option<DecisionPrompt> {
        let pending = self.lock();
        pending.front().map(|p| p.prompt.clone())
    }

    /// Enqueues a prompt and returns the channel its decision arrives on.
    ///
    /// If the queue was empty the prompt is announced immediately,
    /// otherwise it stays hidden until everything ahead of it resolves.
    pub fn push(&self, prompt: DecisionPrompt) -> oneshot::Receiver<DuplicateDecision> {
        let (responder, receiver) = oneshot::channel();
        let mut pending = self.lock();
        let becomes_current = pending.is_empty();
        debug!(prompt_id = %prompt.prompt_id, file = %prompt.file_name, "Duplicate prompt queued");
        pending.push_back(PendingDecision {
            prompt: prompt.clone(),
            responder,
        });
        drop(pending);
        if becomes_current {
            let _ = self.prompts.send(prompt);
        }
        receiver
    }

    /// Resolves the current prompt. Returns false if `prompt_id` is not
    /// the current prompt; queued-but-hidden prompts cannot be resolved.
    pub fn resolve(&self, prompt_id: &str, decision: DuplicateDecision) -> bool {
        let mut pending = self.lock();
        let is_current = matches!(pending.front(), Some(front) if front.prompt.prompt_id == prompt_id);
        if !is_current {
            return false;
        }
        let Some(entry) = pending.pop_front() else {
            return false;
        };
        let next = pending.front().map(|p| p.prompt.clone());
        drop(pending);

        // The waiter may be gone if its run was aborted.
        let _ = entry.responder.send(decision);
        if let Some(prompt) = next {
            let _ = self.prompts.send(prompt);
        }
        true
    }

    /// Cancels every queued prompt, current one included.
    pub fn cancel_all(&self) {
        let mut pending = self.lock();
        let drained: Vec<PendingDecision> = pending.drain(..).collect();
        drop(pending);
        for entry in drained {
            let _ = entry.responder.send(DuplicateDecision::Cancel);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingDecision>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dup_check_result() -> DuplicateCheckResult {
        DuplicateCheckResult {
            is_duplicate: true,
            existing: None,
            current: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_prompts_resolve_in_fifo_order() {
        let queue = DecisionQueue::new(8);
        let first = DecisionPrompt::new("a.docx", dup_check_result());
        let second = DecisionPrompt::new("b.docx", dup_check_result());
        let first_id = first.prompt_id.clone();
        let second_id = second.prompt_id.clone();

        let rx_first = queue.push(first);
        let rx_second = queue.push(second);

        assert_eq!(queue.current().unwrap().prompt_id, first_id);
        // The second prompt is hidden while the first is unresolved.
        assert!(!queue.resolve(&second_id, DuplicateDecision::Cancel));

        assert!(queue.resolve(&first_id, DuplicateDecision::ForceOverwrite));
        assert_eq!(rx_first.await.unwrap(), DuplicateDecision::ForceOverwrite);

        assert_eq!(queue.current().unwrap().prompt_id, second_id);
        assert!(queue.resolve(&second_id, DuplicateDecision::Cancel));
        assert_eq!(rx_second.await.unwrap(), DuplicateDecision::Cancel);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_next_prompt_announced_after_resolve() {
        let queue = DecisionQueue::new(8);
        let mut announcements = queue.subscribe();

        let first = DecisionPrompt::new("a.docx", dup_check_result());
        let second = DecisionPrompt::new("b.docx", dup_check_result());
        let first_id = first.prompt_id.clone();
        let second_id = second.prompt_id.clone();

        let _rx1 = queue.push(first);
        let _rx2 = queue.push(second);

        assert_eq!(announcements.recv().await.unwrap().prompt_id, first_id);
        assert!(queue.resolve(&first_id, DuplicateDecision::Cancel));
        assert_eq!(announcements.recv().await.unwrap().prompt_id, second_id);
    }

    #[tokio::test]
    async fn test_cancel_all_answers_every_waiter() {
        let queue = DecisionQueue::new(8);
        let rx1 = queue.push(DecisionPrompt::new("a.docx", dup_check_result()));
        let rx2 = queue.push(DecisionPrompt::new("b.docx", dup_check_result()));

        queue.cancel_all();
        assert_eq!(rx1.await.unwrap(), DuplicateDecision::Cancel);
        assert_eq!(rx2.await.unwrap(), DuplicateDecision::Cancel);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_prompt_is_rejected() {
        let queue = DecisionQueue::new(8);
        assert!(!queue.resolve("nope", DuplicateDecision::Cancel));
    }
}
