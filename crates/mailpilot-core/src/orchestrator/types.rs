//! Orchestrator result types
//!
//! - `FinalAnswer` returned by a completed turn
//! - `ToolCallRecord` for every executed, failed or refused invocation
//! - `TurnHandle` for turns started with `submit`

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// What happened to a planned invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    /// The host ran it successfully
    Executed,
    /// The host reported a failure
    Failed,
    /// The user rejected it; it never ran
    Rejected,
}

/// Record of a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name
    pub tool_name: String,
    /// Parameters the host received (after edits), or the refused ones
    pub input: serde_json::Value,
    /// Host output, failure message or rejection reason
    pub output: serde_json::Value,
    /// Outcome
    pub status: ToolCallStatus,
    /// Approval that gated the call, if it was sensitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<Uuid>,
    /// Whether the approver edited the parameters
    #[serde(default)]
    pub edited: bool,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

/// Result of a completed turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalAnswer {
    /// Turn ID
    pub turn_id: Uuid,
    /// Answer text shown to the user
    pub text: String,
    /// Tool calls made during the turn
    pub tool_calls: Vec<ToolCallRecord>,
    /// Provider calls made
    pub iterations: usize,
    /// Model that produced the answer
    pub model: Option<String>,
}

/// A turn running in the background.
///
/// Dropping the handle does not stop the turn; use
/// `ConversationOrchestrator::clear_conversation` for that.
pub struct TurnHandle {
    pub(crate) turn_id: Uuid,
    pub(crate) join: JoinHandle<Result<FinalAnswer>>,
}

impl TurnHandle {
    /// Turn ID
    #[must_use]
    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    /// Whether the turn has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the turn to end
    pub async fn wait(self) -> Result<FinalAnswer> {
        self.join
            .await
            .map_err(|e| Error::Internal(format!("turn task failed: {}", e)))?
    }
}
