//! Orchestrator main execution loop
//!
//! Contains turn admission (`process_user_message`, `submit`), the
//! planner-to-tool loop, approval resolution and conversation reset.

use crate::approval::{ApprovalDecision, ApprovalOutcome};
use crate::broadcaster::SessionEvent;
use crate::error::{format_error_for_chat, ApprovalError, Error, Result, UserFriendlyError};
use crate::state::ConversationTurn;
use crate::tools::ToolInvocation;
use futures::FutureExt;
use mailpilot_llm::{Message, ModelReply, Prompt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::core::{ActiveTurn, ConversationOrchestrator};
use super::prompt::{rejection_message, request_message};
use super::tool_execution::Approved;
use super::types::{FinalAnswer, ToolCallRecord, ToolCallStatus, TurnHandle};

/// Ends the turn if its future is dropped before finishing
struct TurnGuard<'a> {
    orchestrator: &'a ConversationOrchestrator,
    turn_id: Uuid,
    armed: bool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(turn_id = %self.turn_id, "Turn dropped before completion");
            self.orchestrator
                .finish_turn(self.turn_id, &Err(Error::Cancelled));
        }
    }
}

impl ConversationOrchestrator {
    /// Process a user message and return the final answer.
    ///
    /// Fails with [`Error::Busy`] while another turn, or its approval wait, is
    /// outstanding. Every accepted call ends with exactly one
    /// `AssistantMessage` or `TurnFailed` event, or a `ConversationCleared`
    /// event if the conversation is reset first.
    pub async fn process_user_message(&self, text: impl Into<String>) -> Result<FinalAnswer> {
        let text = text.into();
        let (turn_id, cancel) = self.begin_turn(&text)?;
        self.drive_turn(turn_id, cancel).await
    }

    /// Accept a user message and run its turn on a background task.
    ///
    /// The `Busy` check happens before this returns, so the caller can keep
    /// resolving approvals while the turn is suspended.
    pub fn submit(self: &Arc<Self>, text: impl Into<String>) -> Result<TurnHandle> {
        let text = text.into();
        let (turn_id, cancel) = self.begin_turn(&text)?;
        let this = Arc::clone(self);
        let join = tokio::spawn(async move { this.drive_turn(turn_id, cancel).await });
        Ok(TurnHandle { turn_id, join })
    }

    fn begin_turn(&self, text: &str) -> Result<(Uuid, CancellationToken)> {
        let turn_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        {
            let mut session = self.session();
            if session.is_processing || self.gate.pending_count() > 0 {
                warn!(
                    pending_approvals = self.gate.pending_count(),
                    "Rejecting message while a turn is outstanding"
                );
                return Err(Error::Busy);
            }
            session.is_processing = true;
            session.current_task = Some(text.to_string());
            session.history.push(ConversationTurn::user(text));
            session.active_turn = Some(ActiveTurn {
                id: turn_id,
                cancel: cancel.clone(),
            });
        }

        info!(turn_id = %turn_id, "Turn accepted");
        self.publish(SessionEvent::UserMessage {
            turn_id,
            content: text.to_string(),
        });
        self.publish_state();
        Ok((turn_id, cancel))
    }

    #[instrument(skip_all, fields(turn_id = %turn_id))]
    async fn drive_turn(&self, turn_id: Uuid, cancel: CancellationToken) -> Result<FinalAnswer> {
        let mut guard = TurnGuard {
            orchestrator: self,
            turn_id,
            armed: true,
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Turn cancelled");
                Err(Error::Cancelled)
            }
            outcome = AssertUnwindSafe(self.run_turn(turn_id)).catch_unwind() => {
                outcome.unwrap_or_else(|_| {
                    error!("Turn panicked");
                    Err(Error::Internal("turn panicked".to_string()))
                })
            }
        };

        guard.armed = false;
        self.finish_turn(turn_id, &result);
        result
    }

    /// Close the turn if it still owns the session.
    ///
    /// A reset may already have closed it; then nothing is appended or sent.
    pub(crate) fn finish_turn(&self, turn_id: Uuid, result: &Result<FinalAnswer>) {
        let event = {
            let mut session = self.session();
            match &session.active_turn {
                Some(active) if active.id == turn_id => {}
                _ => {
                    debug!(turn_id = %turn_id, "Turn already closed");
                    return;
                }
            }
            session.active_turn = None;
            session.is_processing = false;
            session.current_task = None;

            match result {
                Ok(answer) => {
                    session.history.push(ConversationTurn::assistant(&answer.text));
                    SessionEvent::AssistantMessage {
                        turn_id,
                        content: answer.text.clone(),
                    }
                }
                Err(e) => {
                    let message = format_error_for_chat(e);
                    session.history.push(ConversationTurn::system(&message));
                    SessionEvent::TurnFailed { turn_id, message }
                }
            }
        };

        // Approvals only outlive their turn when it was dropped mid-wait.
        for approval in self.gate.discard_all() {
            self.publish(SessionEvent::ApprovalDiscarded {
                approval_id: approval.id,
            });
        }

        match result {
            Ok(answer) => info!(
                turn_id = %turn_id,
                iterations = answer.iterations,
                tool_calls = answer.tool_calls.len(),
                "Turn completed"
            ),
            Err(e) => warn!(turn_id = %turn_id, error = %e, "Turn failed"),
        }
        self.publish(event);
        self.publish_state();
    }

    async fn run_turn(&self, turn_id: Uuid) -> Result<FinalAnswer> {
        let context = self.context.current_context().await;
        let system = self.system_message(context.render().as_deref());
        let history = {
            let session = self.session();
            session.history.recent_messages(self.config.history_window)
        };

        let limit = self.config.max_tool_iterations;
        let mut transcript: Vec<Message> = Vec::new();
        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut rejected: Vec<ToolInvocation> = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;
            self.publish(SessionEvent::PlanningStarted { turn_id, iteration });

            let prompt = self.build_prompt(&system, &history, &transcript);
            let reply = self.complete_with_fallback(&prompt).await?;
            let model = Some(reply.model.clone()).filter(|m| !m.is_empty());

            let invocation = match self.planner.try_plan(&reply) {
                Ok(Some(invocation)) => invocation,
                Ok(None) => {
                    return Ok(self.answer(turn_id, reply_text(&reply), records, iteration, model))
                }
                Err(anomaly) => {
                    warn!(turn_id = %turn_id, anomaly = %anomaly, "Planning anomaly, answering with reply text");
                    let text = if reply.content.trim().is_empty() {
                        Error::PlanningAnomaly(anomaly.to_string()).user_message()
                    } else {
                        reply.content.trim().to_string()
                    };
                    return Ok(self.answer(turn_id, text, records, iteration, model));
                }
            };

            if iteration > limit {
                warn!(turn_id = %turn_id, limit, tool = %invocation.tool_name(), "Tool loop exceeded");
                return Err(Error::TooManyIterations { limit });
            }

            transcript.push(request_message(&reply.content, &invocation));

            if !invocation.requires_approval() {
                let message = self.run_tool(turn_id, &invocation, None, &mut records).await;
                transcript.push(message);
                continue;
            }

            if rejected.contains(&invocation) {
                info!(turn_id = %turn_id, tool = %invocation.tool_name(), "Model repeated a rejected action");
                let text = format!(
                    "You declined \"{}\", so I haven't done it. Let me know if you'd like something different.",
                    invocation.describe()
                );
                return Ok(self.answer(turn_id, text, records, iteration, model));
            }

            let (approval, outcome) = self.await_approval(turn_id, invocation.clone()).await?;
            match outcome {
                ApprovalOutcome::Approved { invocation: approved, edited } => {
                    let message = self
                        .run_tool(
                            turn_id,
                            &approved,
                            Some(Approved {
                                approval_id: approval.id,
                                edited,
                            }),
                            &mut records,
                        )
                        .await;
                    transcript.push(message);
                }
                ApprovalOutcome::Rejected { reason } => {
                    info!(turn_id = %turn_id, approval_id = %approval.id, "Action rejected, informing model");
                    transcript.push(rejection_message(invocation.tool_name(), reason.as_deref()));
                    records.push(ToolCallRecord {
                        tool_name: invocation.tool_name().to_string(),
                        input: invocation.parameters(),
                        output: serde_json::json!({ "rejected": reason }),
                        status: ToolCallStatus::Rejected,
                        approval_id: Some(approval.id),
                        edited: false,
                        duration_ms: 0,
                    });
                    rejected.push(invocation);
                }
                ApprovalOutcome::Discarded => return Err(Error::Cancelled),
            }
        }
    }

    fn answer(
        &self,
        turn_id: Uuid,
        text: String,
        tool_calls: Vec<ToolCallRecord>,
        iterations: usize,
        model: Option<String>,
    ) -> FinalAnswer {
        FinalAnswer {
            turn_id,
            text,
            tool_calls,
            iterations,
            model,
        }
    }

    /// Call the primary provider, then the fallback once if it fails
    async fn complete_with_fallback(&self, prompt: &Prompt) -> Result<ModelReply> {
        let primary = &self.selection.primary;
        match self.router.complete(prompt, primary).await {
            Ok(reply) => Ok(reply),
            Err(e) => match &self.selection.fallback {
                Some(fallback) => {
                    warn!(
                        provider = %primary.label(),
                        fallback = %fallback.label(),
                        kind = %e.kind(),
                        "Primary provider failed, trying fallback"
                    );
                    Ok(self.router.complete(prompt, fallback).await?)
                }
                None => Err(e.into()),
            },
        }
    }

    /// Resolve a pending approval and tell observers.
    ///
    /// Resolving an id twice returns the first outcome and sends nothing new.
    pub fn resolve_approval(
        &self,
        approval_id: Uuid,
        decision: ApprovalDecision,
        edited: Option<serde_json::Value>,
    ) -> Result<ApprovalOutcome> {
        let was_pending = self.gate.is_pending(approval_id);
        let outcome = self
            .gate
            .resolve(approval_id, decision, edited)
            .map_err(|e| {
                if let ApprovalError::InvalidEdit { .. } = &e {
                    warn!(approval_id = %approval_id, error = %e, "Rejected approval edit");
                }
                Error::from(e)
            })?;

        if was_pending {
            self.publish(SessionEvent::ApprovalResolved {
                approval_id,
                status: outcome.status(),
            });
            self.publish_state();
        }
        Ok(outcome)
    }

    /// Reset the session.
    ///
    /// Cancels the in-flight turn without surfacing its result, discards every
    /// pending approval with an explicit event, drops the history and leaves
    /// the session idle. Returns the number of discarded approvals.
    pub fn clear_conversation(&self) -> usize {
        let (active, discarded) = {
            let mut session = self.session();
            let active = session.active_turn.take();
            session.is_processing = false;
            session.current_task = None;
            session.history.clear();
            (active, self.gate.discard_all())
        };

        if let Some(active) = active {
            info!(turn_id = %active.id, "Cancelling in-flight turn");
            active.cancel.cancel();
        }

        for approval in &discarded {
            self.publish(SessionEvent::ApprovalDiscarded {
                approval_id: approval.id,
            });
        }
        info!(discarded_approvals = discarded.len(), "Conversation cleared");
        self.publish(SessionEvent::ConversationCleared {
            discarded_approvals: discarded.len(),
        });
        self.publish_state();
        discarded.len()
    }
}

fn reply_text(reply: &ModelReply) -> String {
    let text = reply.content.trim();
    if text.is_empty() {
        "I don't have anything to add.".to_string()
    } else {
        text.to_string()
    }
}
