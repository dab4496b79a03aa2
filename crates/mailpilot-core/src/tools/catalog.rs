//! Static tool table
//!
//! Sensitivity is fixed per tool here and never inferred from a call.

use mailpilot_llm::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Whether a tool needs a human decision before it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Read-only lookup, runs immediately
    Safe,
    /// Mutates mailbox, calendar or task state, requires approval
    Sensitive,
}

/// Every tool the assistant knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Compose and send a new email
    SendEmail,
    /// Reply to an existing email
    ReplyEmail,
    /// Create a calendar event
    CreateCalendarEvent,
    /// Create a task
    CreateTask,
    /// Delete an email, event or task
    DeleteItem,
    /// Search the mailbox
    SearchEmail,
    /// Look up calendar events
    SearchCalendar,
    /// Summarize an email
    SummarizeEmail,
}

struct ToolSpec {
    kind: ToolKind,
    name: &'static str,
    sensitivity: Sensitivity,
    description: &'static str,
}

const TOOL_TABLE: &[ToolSpec] = &[
    ToolSpec {
        kind: ToolKind::SendEmail,
        name: "send_email",
        sensitivity: Sensitivity::Sensitive,
        description: "Send a new email on the user's behalf.",
    },
    ToolSpec {
        kind: ToolKind::ReplyEmail,
        name: "reply_email",
        sensitivity: Sensitivity::Sensitive,
        description: "Reply to an email. Omit message_id to reply to the email the user has open.",
    },
    ToolSpec {
        kind: ToolKind::CreateCalendarEvent,
        name: "create_calendar_event",
        sensitivity: Sensitivity::Sensitive,
        description: "Create a calendar event or meeting, inviting attendees if given.",
    },
    ToolSpec {
        kind: ToolKind::CreateTask,
        name: "create_task",
        sensitivity: Sensitivity::Sensitive,
        description: "Create a task in the user's task list.",
    },
    ToolSpec {
        kind: ToolKind::DeleteItem,
        name: "delete_item",
        sensitivity: Sensitivity::Sensitive,
        description: "Delete an email, calendar event or task by id.",
    },
    ToolSpec {
        kind: ToolKind::SearchEmail,
        name: "search_email",
        sensitivity: Sensitivity::Safe,
        description: "Search the user's mailbox.",
    },
    ToolSpec {
        kind: ToolKind::SearchCalendar,
        name: "search_calendar",
        sensitivity: Sensitivity::Safe,
        description: "List calendar events, optionally within a date range or matching a query.",
    },
    ToolSpec {
        kind: ToolKind::SummarizeEmail,
        name: "summarize_email",
        sensitivity: Sensitivity::Safe,
        description: "Fetch an email's content for summarizing. Omit message_id for the open email.",
    },
];

impl ToolKind {
    /// All tools, in catalogue order
    pub const ALL: [ToolKind; 8] = [
        ToolKind::SendEmail,
        ToolKind::ReplyEmail,
        ToolKind::CreateCalendarEvent,
        ToolKind::CreateTask,
        ToolKind::DeleteItem,
        ToolKind::SearchEmail,
        ToolKind::SearchCalendar,
        ToolKind::SummarizeEmail,
    ];

    fn spec(&self) -> &'static ToolSpec {
        // Rows are in declaration order.
        &TOOL_TABLE[*self as usize]
    }

    /// Wire name used with the model
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Static sensitivity classification
    #[must_use]
    pub fn sensitivity(&self) -> Sensitivity {
        self.spec().sensitivity
    }

    /// Whether the tool must pass through the approval gate
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.sensitivity() == Sensitivity::Sensitive
    }

    /// Look a tool up by wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        TOOL_TABLE
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.kind)
    }

    /// Tool definition offered to the model
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.spec().description, self.schema())
    }

    fn schema(&self) -> serde_json::Value {
        match self {
            ToolKind::SendEmail => json!({
                "type": "object",
                "properties": {
                    "to": {"type": "array", "items": {"type": "string"}, "description": "Recipient addresses"},
                    "cc": {"type": "array", "items": {"type": "string"}},
                    "subject": {"type": "string"},
                    "body": {"type": "string"}
                },
                "required": ["to", "subject", "body"]
            }),
            ToolKind::ReplyEmail => json!({
                "type": "object",
                "properties": {
                    "message_id": {"type": "string"},
                    "body": {"type": "string", "description": "Full reply text"},
                    "reply_all": {"type": "boolean"}
                },
                "required": ["body"]
            }),
            ToolKind::CreateCalendarEvent => json!({
                "type": "object",
                "properties": {
                    "subject": {"type": "string"},
                    "start": {"type": "string", "description": "ISO 8601 start time"},
                    "end": {"type": "string", "description": "ISO 8601 end time"},
                    "attendees": {"type": "array", "items": {"type": "string"}},
                    "location": {"type": "string"},
                    "body": {"type": "string"}
                },
                "required": ["subject", "start", "end"]
            }),
            ToolKind::CreateTask => json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "due": {"type": "string", "description": "ISO 8601 date"},
                    "notes": {"type": "string"}
                },
                "required": ["title"]
            }),
            ToolKind::DeleteItem => json!({
                "type": "object",
                "properties": {
                    "item_id": {"type": "string"},
                    "kind": {"type": "string", "enum": ["email", "event", "task"]}
                },
                "required": ["item_id"]
            }),
            ToolKind::SearchEmail => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 50}
                },
                "required": ["query"]
            }),
            ToolKind::SearchCalendar => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "start": {"type": "string", "description": "ISO 8601 date or date-time"},
                    "end": {"type": "string", "description": "ISO 8601 date or date-time"}
                }
            }),
            ToolKind::SummarizeEmail => json!({
                "type": "object",
                "properties": {
                    "message_id": {"type": "string"}
                }
            }),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Definitions for every tool, in catalogue order
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(ToolKind::definition).collect()
}
