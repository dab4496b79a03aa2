//! Session state
//!
//! Conversation history and the observable [`AgentState`] of one session.

use crate::approval::PendingApproval;
use chrono::{DateTime, Utc};
use mailpilot_llm::{Message, MessageRole};
use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The person using the client
    User,
    /// The assistant
    Assistant,
    /// Notices produced by the session itself (errors, cancellations)
    System,
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Author
    pub role: TurnRole,
    /// Text
    pub content: String,
    /// When the turn was appended
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped now
    #[must_use]
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// A user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// An assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// A session notice
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    /// Provider message for this turn; session notices are not sent
    #[must_use]
    pub fn to_message(&self) -> Option<Message> {
        match self.role {
            TurnRole::User => Some(Message::new(MessageRole::User, &self.content)),
            TurnRole::Assistant => Some(Message::new(MessageRole::Assistant, &self.content)),
            TurnRole::System => None,
        }
    }
}

/// Append-only conversation history
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Provider messages for the last `limit` forwardable turns, oldest first.
    ///
    /// System notices are skipped. The newest turn is always included, so a
    /// zero window still carries the message being answered.
    #[must_use]
    pub fn recent_messages(&self, limit: usize) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .turns
            .iter()
            .rev()
            .filter_map(ConversationTurn::to_message)
            .take(limit.max(1))
            .collect();
        messages.reverse();
        messages
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Observable state of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// True from message acceptance until the final answer, approval waits included
    pub is_processing: bool,
    /// The request being worked on
    pub current_task: Option<String>,
    /// Approvals awaiting a decision, oldest first
    pub pending_approvals: Vec<PendingApproval>,
}

impl AgentState {
    /// Whether a human decision is outstanding
    #[must_use]
    pub fn awaiting_approval(&self) -> bool {
        !self.pending_approvals.is_empty()
    }
}
