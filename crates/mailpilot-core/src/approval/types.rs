use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tools::ToolInvocation;

/// Approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting for a decision
    Pending,
    /// Approved, possibly with edits
    Approved,
    /// Rejected
    Rejected,
    /// Dropped because the conversation was cleared
    Discarded,
}

impl ApprovalStatus {
    /// Whether a decision has been made
    #[must_use]
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A sensitive invocation awaiting sign-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Unique ID
    pub id: Uuid,
    /// Turn that produced it
    pub turn_id: Uuid,
    /// One-line description for the approver
    pub description: String,
    /// Tool and parameters
    #[serde(flatten)]
    pub invocation: ToolInvocation,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Status
    pub status: ApprovalStatus,
    /// Resolution time
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PendingApproval {
    /// Create a pending approval for `invocation`
    #[must_use]
    pub fn new(turn_id: Uuid, invocation: ToolInvocation) -> Self {
        Self {
            id: Uuid::new_v4(),
            turn_id,
            description: invocation.describe(),
            invocation,
            created_at: Utc::now(),
            status: ApprovalStatus::Pending,
            resolved_at: None,
        }
    }

    /// Tool name
    #[must_use]
    pub fn tool(&self) -> &str {
        self.invocation.tool_name()
    }

    /// Parameters as JSON
    #[must_use]
    pub fn parameters(&self) -> serde_json::Value {
        self.invocation.parameters()
    }

    /// Check if still pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    pub(crate) fn finalize(&mut self, status: ApprovalStatus) {
        self.status = status;
        self.resolved_at = Some(Utc::now());
    }
}

/// What the approver decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Run the invocation
    Approve,
    /// Do not run it
    Reject {
        /// Optional explanation passed back to the model
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ApprovalDecision {
    /// Rejection with a reason
    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: Some(reason.into()),
        }
    }
}

/// Final result of an approval, delivered to the waiting turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// Approved; carries the invocation to execute, edits applied
    Approved {
        /// Invocation to run
        invocation: ToolInvocation,
        /// Whether parameters were edited
        edited: bool,
    },
    /// Rejected
    Rejected {
        /// Approver's reason
        reason: Option<String>,
    },
    /// Discarded on conversation reset
    Discarded,
}

impl ApprovalOutcome {
    /// Matching status
    #[must_use]
    pub fn status(&self) -> ApprovalStatus {
        match self {
            Self::Approved { .. } => ApprovalStatus::Approved,
            Self::Rejected { .. } => ApprovalStatus::Rejected,
            Self::Discarded => ApprovalStatus::Discarded,
        }
    }
}
