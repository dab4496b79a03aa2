//! Orchestrator tool execution
//!
//! - `run_tool`: runs an invocation through the host and records the result
//! - `await_approval`: parks a sensitive invocation in the approval gate

use crate::approval::{ApprovalOutcome, PendingApproval};
use crate::broadcaster::SessionEvent;
use crate::error::{Error, Result};
use crate::tools::ToolInvocation;
use mailpilot_llm::Message;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::core::ConversationOrchestrator;
use super::prompt::{failure_message, result_message};
use super::types::{ToolCallRecord, ToolCallStatus};

/// Approval identity carried into the execution record
pub(crate) struct Approved {
    pub(crate) approval_id: Uuid,
    pub(crate) edited: bool,
}

impl ConversationOrchestrator {
    /// Run one invocation and return the message that reports it to the model.
    ///
    /// Host failures are recorded and reported, never propagated.
    pub(crate) async fn run_tool(
        &self,
        turn_id: Uuid,
        invocation: &ToolInvocation,
        approved: Option<Approved>,
        records: &mut Vec<ToolCallRecord>,
    ) -> Message {
        let tool = invocation.tool_name().to_string();
        let input = invocation.parameters();
        info!(turn_id = %turn_id, tool = %tool, "Executing tool");

        self.publish(SessionEvent::ToolStarted {
            turn_id,
            tool: tool.clone(),
        });

        let start = Instant::now();
        let result = self.executor.execute_tool(invocation).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.publish(SessionEvent::ToolCompleted {
            turn_id,
            tool: tool.clone(),
            success: result.is_ok(),
            duration_ms,
        });

        let (approval_id, edited) = match approved {
            Some(a) => (Some(a.approval_id), a.edited),
            None => (None, false),
        };

        match result {
            Ok(output) => {
                let message = result_message(&tool, &output);
                records.push(ToolCallRecord {
                    tool_name: tool,
                    input,
                    output,
                    status: ToolCallStatus::Executed,
                    approval_id,
                    edited,
                    duration_ms,
                });
                message
            }
            Err(failure) => {
                let error = Error::ToolExecution {
                    tool: tool.clone(),
                    message: failure.message.clone(),
                };
                warn!(turn_id = %turn_id, error = %error, "Tool failed, reporting to model");
                let message = failure_message(&tool, &failure.message);
                records.push(ToolCallRecord {
                    tool_name: tool,
                    input,
                    output: serde_json::json!({ "error": failure.message }),
                    status: ToolCallStatus::Failed,
                    approval_id,
                    edited,
                    duration_ms,
                });
                message
            }
        }
    }

    /// Queue `invocation` for approval and wait for the decision.
    ///
    /// There is no timeout; the wait ends on a decision or a conversation reset.
    pub(crate) async fn await_approval(
        &self,
        turn_id: Uuid,
        invocation: ToolInvocation,
    ) -> Result<(PendingApproval, ApprovalOutcome)> {
        let (approval, rx) = self.gate.enqueue(turn_id, invocation);
        self.publish(SessionEvent::ApprovalRequired {
            turn_id,
            approval: approval.clone(),
        });
        self.publish_state();

        match rx.await {
            Ok(ApprovalOutcome::Discarded) | Err(_) => Err(Error::Cancelled),
            Ok(outcome) => Ok((approval, outcome)),
        }
    }
}
