//! Approval gate (C7): a single-slot blocking queue, mirroring the teacher's
//! `AgentEvent::ApprovalRequest` / `Arc<Mutex<Option<oneshot::Sender<_>>>>` pattern
//! (`crates/core/src/agent/mod.rs`), narrowed to one question at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use crate::model::APPROVAL_TIMEOUT_SECS;

#[derive(Debug, Clone)]
pub struct ApprovalPayload {
    pub file: String,
    pub search: String,
    pub replace: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Rejected,
}

/// A producer (the CLI's terminal prompt, possibly on another thread) posts exactly one
/// decision per request by calling `respond` on the sender returned from `next_request`.
#[derive(Clone)]
pub struct ApprovalGate {
    inbox: Arc<Mutex<Option<oneshot::Sender<Decision>>>>,
    auto_approve: bool,
}

impl ApprovalGate {
    pub fn new(auto_approve: bool) -> Self {
        ApprovalGate {
            inbox: Arc::new(Mutex::new(None)),
            auto_approve,
        }
    }

    /// Registers a pending decision slot and returns the sender a producer must use to
    /// answer it. Overwrites any prior unanswered slot (there is only ever one in flight).
    pub async fn register(&self) -> oneshot::Receiver<Decision> {
        let (tx, rx) = oneshot::channel();
        *self.inbox.lock().await = Some(tx);
        rx
    }

    pub async fn respond(&self, decision: Decision) -> bool {
        if let Some(tx) = self.inbox.lock().await.take() {
            tx.send(decision).is_ok()
        } else {
            false
        }
    }

    /// Blocks until a decision arrives, the 300-second timer expires (-> rejected), or
    /// headless auto-approve is configured (still logs the decision).
    pub async fn ask_user_approval(&self, action: &str, payload: &ApprovalPayload) -> Decision {
        if payload.search.is_empty() && payload.replace.is_empty() {
            warn!(action, file = %payload.file, "approval rejected: no content");
            return Decision::Rejected;
        }

        if self.auto_approve {
            info!(action, file = %payload.file, outcome = "accepted (headless)", "approval gate decision");
            return Decision::Accepted;
        }

        let rx = self.register().await;
        let decision = match tokio::time::timeout(Duration::from_secs(APPROVAL_TIMEOUT_SECS), rx).await
        {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) | Err(_) => Decision::Rejected,
        };

        info!(
            action,
            file = %payload.file,
            outcome = ?decision,
            "approval gate decision"
        );
        decision
    }
}
