use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{ApprovalDecision, ApprovalOutcome, ApprovalStatus, PendingApproval};
use crate::error::ApprovalError;
use crate::tools::ToolInvocation;

#[derive(Default)]
struct GateInner {
    /// Pending approvals in creation order
    queue: Vec<PendingApproval>,
    /// oneshot senders keyed by approval ID; resolvers notify waiters
    waiters: HashMap<Uuid, oneshot::Sender<ApprovalOutcome>>,
    /// Every resolved approval with its outcome, kept for the gate's lifetime
    /// so a duplicate resolution always reports the first outcome
    resolved: HashMap<Uuid, (PendingApproval, ApprovalOutcome)>,
}

impl GateInner {
    fn remember(&mut self, approval: PendingApproval, outcome: ApprovalOutcome) {
        self.resolved.insert(approval.id, (approval, outcome));
    }
}

/// FIFO queue of invocations awaiting a human decision
#[derive(Default)]
pub struct ApprovalGate {
    inner: Mutex<GateInner>,
}

impl ApprovalGate {
    /// Create an empty gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an invocation for approval.
    ///
    /// Returns the new approval and a receiver that yields its outcome once
    /// [`resolve`](Self::resolve) or [`discard_all`](Self::discard_all) is called.
    pub fn enqueue(
        &self,
        turn_id: Uuid,
        invocation: ToolInvocation,
    ) -> (PendingApproval, oneshot::Receiver<ApprovalOutcome>) {
        let approval = PendingApproval::new(turn_id, invocation);
        let (tx, rx) = oneshot::channel();

        let mut inner = self.lock();
        inner.queue.push(approval.clone());
        inner.waiters.insert(approval.id, tx);
        let depth = inner.queue.len();
        drop(inner);

        info!(
            approval_id = %approval.id,
            turn_id = %turn_id,
            tool = %approval.tool(),
            queue_depth = depth,
            "Approval requested"
        );
        (approval, rx)
    }

    /// Resolve an approval.
    ///
    /// Resolving an id a second time changes nothing and returns the first
    /// outcome. When approving with `edited` parameters, their keys replace the
    /// planned ones; an edit that does not fit the tool leaves the approval
    /// pending and returns an error.
    pub fn resolve(
        &self,
        id: Uuid,
        decision: ApprovalDecision,
        edited: Option<serde_json::Value>,
    ) -> std::result::Result<ApprovalOutcome, ApprovalError> {
        let mut inner = self.lock();

        if let Some((_, outcome)) = inner.resolved.get(&id) {
            debug!(approval_id = %id, status = ?outcome.status(), "Approval already resolved");
            return Ok(outcome.clone());
        }

        let Some(position) = inner.queue.iter().position(|a| a.id == id) else {
            return Err(ApprovalError::NotFound(id));
        };

        let outcome = match decision {
            ApprovalDecision::Approve => {
                let planned = &inner.queue[position].invocation;
                match edited {
                    Some(edit) => ApprovalOutcome::Approved {
                        invocation: apply_edit(planned, edit)?,
                        edited: true,
                    },
                    None => ApprovalOutcome::Approved {
                        invocation: planned.clone(),
                        edited: false,
                    },
                }
            }
            ApprovalDecision::Reject { reason } => ApprovalOutcome::Rejected { reason },
        };

        let mut approval = inner.queue.remove(position);
        if let ApprovalOutcome::Approved { invocation, .. } = &outcome {
            approval.invocation = invocation.clone();
        }
        approval.finalize(outcome.status());

        let waiter = inner.waiters.remove(&id);
        inner.remember(approval, outcome.clone());
        drop(inner);

        info!(approval_id = %id, status = ?outcome.status(), "Approval resolved");
        if let Some(tx) = waiter {
            if tx.send(outcome.clone()).is_err() {
                warn!(approval_id = %id, "Approval waiter is gone");
            }
        }

        Ok(outcome)
    }

    /// Discard every pending approval, waking waiters with
    /// [`ApprovalOutcome::Discarded`]. Returns the discarded approvals.
    pub fn discard_all(&self) -> Vec<PendingApproval> {
        let mut inner = self.lock();
        let queue = std::mem::take(&mut inner.queue);
        let mut discarded = Vec::with_capacity(queue.len());

        for mut approval in queue {
            approval.finalize(ApprovalStatus::Discarded);
            if let Some(tx) = inner.waiters.remove(&approval.id) {
                let _ = tx.send(ApprovalOutcome::Discarded);
            }
            inner.remember(approval.clone(), ApprovalOutcome::Discarded);
            discarded.push(approval);
        }
        drop(inner);

        if !discarded.is_empty() {
            info!(count = discarded.len(), "Discarded pending approvals");
        }
        discarded
    }

    /// Pending approvals, oldest first
    #[must_use]
    pub fn pending(&self) -> Vec<PendingApproval> {
        self.lock().queue.clone()
    }

    /// Number of pending approvals
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether `id` is still awaiting a decision
    #[must_use]
    pub fn is_pending(&self, id: Uuid) -> bool {
        self.lock().queue.iter().any(|a| a.id == id)
    }

    /// Look up an approval, pending or resolved
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<PendingApproval> {
        let inner = self.lock();
        inner
            .queue
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .or_else(|| inner.resolved.get(&id).map(|(a, _)| a.clone()))
    }
}

/// Overlay edited keys on the planned parameters and re-type the result
fn apply_edit(
    planned: &ToolInvocation,
    edit: serde_json::Value,
) -> std::result::Result<ToolInvocation, ApprovalError> {
    let invalid = |reason: String| ApprovalError::InvalidEdit {
        tool: planned.tool_name().to_string(),
        reason,
    };

    let Some(kind) = planned.kind() else {
        return Err(invalid("unknown tools cannot be edited".to_string()));
    };
    let serde_json::Value::Object(changes) = edit else {
        return Err(invalid("edited parameters must be a JSON object".to_string()));
    };

    let mut parameters = match planned.parameters() {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    for (key, value) in changes {
        parameters.insert(key, value);
    }

    ToolInvocation::from_kind(kind, serde_json::Value::Object(parameters))
        .map_err(|e| invalid(e.reason))
}
