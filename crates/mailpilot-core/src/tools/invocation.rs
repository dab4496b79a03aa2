//! Typed tool invocations
//!
//! One variant per known tool, each with its own parameter record. Tool names
//! the catalogue does not know become [`ToolInvocation::Unknown`].

use super::catalog::ToolKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of search results
const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Largest search page a model may request
const MAX_SEARCH_LIMIT: u32 = 50;

/// Parameters for `send_email`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailParams {
    /// Recipients
    pub to: Vec<String>,
    /// Carbon-copy recipients
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Body text
    pub body: String,
}

/// Parameters for `reply_email`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEmailParams {
    /// Message to reply to; the open email when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Reply text
    pub body: String,
    /// Reply to all recipients
    #[serde(default)]
    pub reply_all: bool,
}

/// Parameters for `create_calendar_event`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEventParams {
    /// Event title
    pub subject: String,
    /// Start, ISO 8601
    pub start: String,
    /// End, ISO 8601
    pub end: String,
    /// Invitees
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    /// Location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Parameters for `create_task`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskParams {
    /// Task title
    pub title: String,
    /// Due date, ISO 8601
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    /// Notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// What kind of item `delete_item` targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// An email
    #[default]
    Email,
    /// A calendar event
    Event,
    /// A task
    Task,
}

impl ItemKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Event => "event",
            Self::Task => "task",
        }
    }
}

/// Parameters for `delete_item`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItemParams {
    /// Item id
    pub item_id: String,
    /// Item kind
    #[serde(default)]
    pub kind: ItemKind,
}

/// Parameters for `search_email`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEmailParams {
    /// Free-text query
    pub query: String,
    /// Maximum results
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

fn default_search_limit() -> u32 {
    DEFAULT_SEARCH_LIMIT
}

/// Parameters for `search_calendar`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCalendarParams {
    /// Free-text query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Range start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Range end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Parameters for `summarize_email`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeEmailParams {
    /// Message to summarize; the open email when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Why a tool call could not be turned into a typed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidParameters {
    /// Tool that was called
    pub tool: ToolKind,
    /// What was wrong
    pub reason: String,
}

impl fmt::Display for InvalidParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameters for {}: {}", self.tool, self.reason)
    }
}

impl std::error::Error for InvalidParameters {}

/// A concrete action the model asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "parameters", rename_all = "snake_case")]
pub enum ToolInvocation {
    /// Send a new email
    SendEmail(SendEmailParams),
    /// Reply to an email
    ReplyEmail(ReplyEmailParams),
    /// Create a calendar event
    CreateCalendarEvent(CreateEventParams),
    /// Create a task
    CreateTask(CreateTaskParams),
    /// Delete an item
    DeleteItem(DeleteItemParams),
    /// Search mail
    SearchEmail(SearchEmailParams),
    /// Search the calendar
    SearchCalendar(SearchCalendarParams),
    /// Summarize an email
    SummarizeEmail(SummarizeEmailParams),
    /// A tool name outside the catalogue
    Unknown {
        /// Name as written by the model
        name: String,
        /// Raw arguments
        arguments: serde_json::Value,
    },
}

fn decode<T: DeserializeOwned>(
    tool: ToolKind,
    arguments: serde_json::Value,
) -> std::result::Result<T, InvalidParameters> {
    serde_json::from_value(arguments).map_err(|e| InvalidParameters {
        tool,
        reason: e.to_string(),
    })
}

fn require(
    tool: ToolKind,
    ok: bool,
    reason: &str,
) -> std::result::Result<(), InvalidParameters> {
    if ok {
        Ok(())
    } else {
        Err(InvalidParameters {
            tool,
            reason: reason.to_string(),
        })
    }
}

fn looks_like_address(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

impl ToolInvocation {
    /// Build a typed invocation from a tool name and JSON arguments.
    ///
    /// Unknown names yield [`ToolInvocation::Unknown`]; known names with
    /// missing or ill-typed fields yield an error.
    pub fn from_parts(
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<Self, InvalidParameters> {
        let Some(kind) = ToolKind::from_name(name) else {
            return Ok(Self::Unknown {
                name: name.to_string(),
                arguments,
            });
        };
        Self::from_kind(kind, arguments)
    }

    /// Build a typed invocation for a known tool
    pub fn from_kind(
        kind: ToolKind,
        arguments: serde_json::Value,
    ) -> std::result::Result<Self, InvalidParameters> {
        let arguments = match arguments {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let invocation = match kind {
            ToolKind::SendEmail => Self::SendEmail(decode(kind, arguments)?),
            ToolKind::ReplyEmail => Self::ReplyEmail(decode(kind, arguments)?),
            ToolKind::CreateCalendarEvent => Self::CreateCalendarEvent(decode(kind, arguments)?),
            ToolKind::CreateTask => Self::CreateTask(decode(kind, arguments)?),
            ToolKind::DeleteItem => Self::DeleteItem(decode(kind, arguments)?),
            ToolKind::SearchEmail => Self::SearchEmail(decode(kind, arguments)?),
            ToolKind::SearchCalendar => Self::SearchCalendar(decode(kind, arguments)?),
            ToolKind::SummarizeEmail => Self::SummarizeEmail(decode(kind, arguments)?),
        };
        invocation.validate()?;
        Ok(invocation)
    }

    fn validate(&self) -> std::result::Result<(), InvalidParameters> {
        match self {
            Self::SendEmail(p) => {
                require(ToolKind::SendEmail, !p.to.is_empty(), "no recipients")?;
                require(
                    ToolKind::SendEmail,
                    p.to.iter().chain(&p.cc).all(|a| looks_like_address(a)),
                    "recipient is not an email address",
                )
            }
            Self::ReplyEmail(p) => {
                require(ToolKind::ReplyEmail, !p.body.trim().is_empty(), "empty body")
            }
            Self::CreateCalendarEvent(p) => {
                require(
                    ToolKind::CreateCalendarEvent,
                    !p.subject.trim().is_empty(),
                    "empty subject",
                )?;
                require(
                    ToolKind::CreateCalendarEvent,
                    p.attendees.iter().all(|a| looks_like_address(a)),
                    "attendee is not an email address",
                )
            }
            Self::CreateTask(p) => {
                require(ToolKind::CreateTask, !p.title.trim().is_empty(), "empty title")
            }
            Self::DeleteItem(p) => {
                require(ToolKind::DeleteItem, !p.item_id.trim().is_empty(), "empty item id")
            }
            Self::SearchEmail(p) => require(
                ToolKind::SearchEmail,
                (1..=MAX_SEARCH_LIMIT).contains(&p.limit),
                "limit out of range",
            ),
            Self::SearchCalendar(_) | Self::SummarizeEmail(_) | Self::Unknown { .. } => Ok(()),
        }
    }

    /// Catalogue entry, `None` for unknown tools
    #[must_use]
    pub fn kind(&self) -> Option<ToolKind> {
        match self {
            Self::SendEmail(_) => Some(ToolKind::SendEmail),
            Self::ReplyEmail(_) => Some(ToolKind::ReplyEmail),
            Self::CreateCalendarEvent(_) => Some(ToolKind::CreateCalendarEvent),
            Self::CreateTask(_) => Some(ToolKind::CreateTask),
            Self::DeleteItem(_) => Some(ToolKind::DeleteItem),
            Self::SearchEmail(_) => Some(ToolKind::SearchEmail),
            Self::SearchCalendar(_) => Some(ToolKind::SearchCalendar),
            Self::SummarizeEmail(_) => Some(ToolKind::SummarizeEmail),
            Self::Unknown { .. } => None,
        }
    }

    /// Tool name as sent to the host
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::Unknown { name, .. } => name,
            other => other.kind().map(|k| k.name()).unwrap_or_default(),
        }
    }

    /// Whether the invocation must be approved first.
    ///
    /// Unknown tools are never executed, so they count as sensitive.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.kind().map_or(true, |k| k.requires_approval())
    }

    /// Parameters as a JSON object
    #[must_use]
    pub fn parameters(&self) -> serde_json::Value {
        let value = match self {
            Self::SendEmail(p) => serde_json::to_value(p),
            Self::ReplyEmail(p) => serde_json::to_value(p),
            Self::CreateCalendarEvent(p) => serde_json::to_value(p),
            Self::CreateTask(p) => serde_json::to_value(p),
            Self::DeleteItem(p) => serde_json::to_value(p),
            Self::SearchEmail(p) => serde_json::to_value(p),
            Self::SearchCalendar(p) => serde_json::to_value(p),
            Self::SummarizeEmail(p) => serde_json::to_value(p),
            Self::Unknown { arguments, .. } => Ok(arguments.clone()),
        };
        value.unwrap_or_default()
    }

    /// One-line description for the person approving it
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::SendEmail(p) => format!(
                "Send an email to {} with subject \"{}\"",
                p.to.join(", "),
                p.subject
            ),
            Self::ReplyEmail(p) => {
                let target = match &p.message_id {
                    Some(id) => format!("email {}", id),
                    None => "the open email".to_string(),
                };
                if p.reply_all {
                    format!("Reply to all on {}", target)
                } else {
                    format!("Reply to {}", target)
                }
            }
            Self::CreateCalendarEvent(p) => {
                let mut text = format!("Create event \"{}\" from {} to {}", p.subject, p.start, p.end);
                if !p.attendees.is_empty() {
                    text.push_str(&format!(" with {}", p.attendees.join(", ")));
                }
                text
            }
            Self::CreateTask(p) => match &p.due {
                Some(due) => format!("Create task \"{}\" due {}", p.title, due),
                None => format!("Create task \"{}\"", p.title),
            },
            Self::DeleteItem(p) => format!("Delete {} {}", p.kind.as_str(), p.item_id),
            Self::SearchEmail(p) => format!("Search mail for \"{}\"", p.query),
            Self::SearchCalendar(p) => match (&p.start, &p.end) {
                (Some(start), Some(end)) => format!("Look up calendar events from {} to {}", start, end),
                (Some(start), None) => format!("Look up calendar events on {}", start),
                _ => "Look up calendar events".to_string(),
            },
            Self::SummarizeEmail(p) => match &p.message_id {
                Some(id) => format!("Summarize email {}", id),
                None => "Summarize the open email".to_string(),
            },
            Self::Unknown { name, .. } => format!("Run unknown tool \"{}\"", name),
        }
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}
