use serde::Serialize;
use uuid::Uuid;

use crate::approval::{ApprovalStatus, PendingApproval};
use crate::state::AgentState;

/// Message events emitted by a session.
///
/// Tool outputs and credentials are never included.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A user message was accepted
    UserMessage {
        /// Turn identifier
        turn_id: Uuid,
        /// Message text
        content: String,
    },
    /// The provider is being asked for the next step
    PlanningStarted {
        /// Turn identifier
        turn_id: Uuid,
        /// Round number, starting at 1
        iteration: usize,
    },
    /// A sensitive action is waiting for a decision
    ApprovalRequired {
        /// Turn identifier
        turn_id: Uuid,
        /// The approval
        approval: PendingApproval,
    },
    /// An approval was approved or rejected
    ApprovalResolved {
        /// Approval identifier
        approval_id: Uuid,
        /// New status
        status: ApprovalStatus,
    },
    /// An approval was dropped by a conversation reset
    ApprovalDiscarded {
        /// Approval identifier
        approval_id: Uuid,
    },
    /// A tool started running
    ToolStarted {
        /// Turn identifier
        turn_id: Uuid,
        /// Tool name
        tool: String,
    },
    /// A tool finished
    ToolCompleted {
        /// Turn identifier
        turn_id: Uuid,
        /// Tool name
        tool: String,
        /// Whether it succeeded
        success: bool,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// The final answer of a turn
    AssistantMessage {
        /// Turn identifier
        turn_id: Uuid,
        /// Answer text
        content: String,
    },
    /// A turn ended with an error; `message` is already user-facing
    TurnFailed {
        /// Turn identifier
        turn_id: Uuid,
        /// User-facing message
        message: String,
    },
    /// History and pending approvals were discarded
    ConversationCleared {
        /// Number of approvals discarded
        discarded_approvals: usize,
    },
}

impl SessionEvent {
    /// Turn this event belongs to, if any
    #[must_use]
    pub fn turn_id(&self) -> Option<Uuid> {
        match self {
            Self::UserMessage { turn_id, .. }
            | Self::PlanningStarted { turn_id, .. }
            | Self::ApprovalRequired { turn_id, .. }
            | Self::ToolStarted { turn_id, .. }
            | Self::ToolCompleted { turn_id, .. }
            | Self::AssistantMessage { turn_id, .. }
            | Self::TurnFailed { turn_id, .. } => Some(*turn_id),
            Self::ApprovalResolved { .. }
            | Self::ApprovalDiscarded { .. }
            | Self::ConversationCleared { .. } => None,
        }
    }

    /// Whether this event ends a turn
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AssistantMessage { .. } | Self::TurnFailed { .. } | Self::ConversationCleared { .. }
        )
    }
}

/// Item carried on the async channel
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Notification {
    /// New state snapshot
    State(AgentState),
    /// Message event
    Message(SessionEvent),
}
