//! Host collaborators
//!
//! The orchestrator reaches the mail client only through these two traits:
//! [`ToolExecutor`] performs actions, [`ContextProvider`] snapshots what the
//! user is looking at.

use crate::tools::ToolInvocation;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

/// Failure reported by the host while running a tool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolFailure {
    /// Host-reported reason, shown to the model
    pub message: String,
}

impl ToolFailure {
    /// Create a failure
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs tool invocations against the mail client
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run `invocation` and return its output.
    ///
    /// Sensitive invocations only reach this after approval.
    async fn execute_tool(
        &self,
        invocation: &ToolInvocation,
    ) -> std::result::Result<serde_json::Value, ToolFailure>;
}

/// The email currently open in the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSnapshot {
    /// Message identifier
    pub id: String,
    /// Sender address
    pub from: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// A calendar event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Event identifier
    pub id: String,
    /// Title
    pub subject: String,
    /// Start time (RFC 3339)
    pub start: String,
    /// End time (RFC 3339)
    pub end: String,
}

/// A task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Due date, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

/// Point-in-time view of the user's mailbox
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxContext {
    /// Open email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailSnapshot>,
    /// Upcoming events
    #[serde(default)]
    pub events: Vec<EventSnapshot>,
    /// Open tasks
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
}

/// Bodies longer than this are cut when rendered into a prompt
const MAX_BODY_CHARS: usize = 4000;

impl MailboxContext {
    /// Whether there is nothing to show the model
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.events.is_empty() && self.tasks.is_empty()
    }

    /// Render as prompt text. Returns `None` when empty.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut out = String::new();
        if let Some(email) = &self.email {
            let body: String = email.body.chars().take(MAX_BODY_CHARS).collect();
            let _ = writeln!(out, "## Open email (id: {})", email.id);
            let _ = writeln!(out, "From: {}", email.from);
            let _ = writeln!(out, "Subject: {}", email.subject);
            let _ = writeln!(out, "\n{}", body);
        }
        if !self.events.is_empty() {
            out.push_str("## Upcoming events\n");
            for event in &self.events {
                let _ = writeln!(
                    out,
                    "- {} ({} to {}, id: {})",
                    event.subject, event.start, event.end, event.id
                );
            }
        }
        if !self.tasks.is_empty() {
            out.push_str("## Open tasks\n");
            for task in &self.tasks {
                match &task.due {
                    Some(due) => {
                        let _ = writeln!(out, "- {} (due {}, id: {})", task.title, due, task.id);
                    }
                    None => {
                        let _ = writeln!(out, "- {} (id: {})", task.title, task.id);
                    }
                }
            }
        }
        Some(out.trim_end().to_string())
    }
}

/// Supplies the current mailbox snapshot when a prompt is built
#[async_trait::async_trait]
pub trait ContextProvider: Send + Sync {
    /// Snapshot of what the user is looking at; may be stale
    async fn current_context(&self) -> MailboxContext;
}

/// A [`ContextProvider`] with nothing to show
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait::async_trait]
impl ContextProvider for NoContext {
    async fn current_context(&self) -> MailboxContext {
        MailboxContext::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_renders_nothing() {
        assert!(MailboxContext::default().render().is_none());
    }

    #[test]
    fn test_render_sections() {
        let context = MailboxContext {
            email: Some(EmailSnapshot {
                id: "msg-1".to_string(),
                from: "dana@example.com".to_string(),
                subject: "Offsite planning".to_string(),
                body: "Can you make Thursday?".to_string(),
            }),
            events: vec![EventSnapshot {
                id: "evt-1".to_string(),
                subject: "Standup".to_string(),
                start: "2026-10-19T09:00:00Z".to_string(),
                end: "2026-10-19T09:15:00Z".to_string(),
            }],
            tasks: vec![TaskSnapshot {
                id: "task-1".to_string(),
                title: "File expenses".to_string(),
                due: None,
            }],
        };

        let text = context.render().unwrap();
        assert!(text.starts_with("## Open email (id: msg-1)"));
        assert!(text.contains("Subject: Offsite planning"));
        assert!(text.contains("- Standup (2026-10-19T09:00:00Z to 2026-10-19T09:15:00Z, id: evt-1)"));
        assert!(text.ends_with("- File expenses (id: task-1)"));
    }

    #[test]
    fn test_long_body_is_cut() {
        let context = MailboxContext {
            email: Some(EmailSnapshot {
                body: "x".repeat(MAX_BODY_CHARS + 500),
                ..Default::default()
            }),
            ..Default::default()
        };
        let text = context.render().unwrap();
        assert_eq!(text.matches('x').count(), MAX_BODY_CHARS);
    }
}
