//! In-memory demo mailbox
//!
//! Plays the host client for the console: a handful of emails, events and
//! tasks that tools read and mutate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use mailpilot_core::tools::{ItemKind, ToolInvocation};
use mailpilot_core::{
    ContextProvider, EmailSnapshot, EventSnapshot, MailboxContext, TaskSnapshot, ToolExecutor,
    ToolFailure,
};
use serde_json::json;
use std::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Email {
    id: String,
    from: String,
    to: Vec<String>,
    subject: String,
    body: String,
}

#[derive(Default)]
struct Store {
    inbox: Vec<Email>,
    sent: Vec<Email>,
    events: Vec<EventSnapshot>,
    tasks: Vec<TaskSnapshot>,
}

/// Mailbox seeded with sample data
pub struct DemoMailbox {
    store: Mutex<Store>,
}

impl Default for DemoMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoMailbox {
    pub fn new() -> Self {
        let today = Utc::now().date_naive();
        let at = |days: i64, hour: u32| {
            (today + Duration::days(days))
                .and_hms_opt(hour, 0, 0)
                .map(|t| t.and_utc().to_rfc3339())
                .unwrap_or_default()
        };

        let store = Store {
            inbox: vec![
                Email {
                    id: "msg-1".to_string(),
                    from: "dana@example.com".to_string(),
                    to: vec!["me@example.com".to_string()],
                    subject: "Roadmap review on Thursday".to_string(),
                    body: "Hi! Can you join the roadmap review on Thursday at 3pm? \
                           We'll go over the Q3 priorities."
                        .to_string(),
                },
                Email {
                    id: "msg-2".to_string(),
                    from: "billing@vendor.example".to_string(),
                    to: vec!["me@example.com".to_string()],
                    subject: "Invoice #4471".to_string(),
                    body: "Your invoice #4471 for September is attached. Amount due: $1,240."
                        .to_string(),
                },
            ],
            sent: Vec::new(),
            events: vec![
                EventSnapshot {
                    id: "evt-1".to_string(),
                    subject: "Standup".to_string(),
                    start: at(0, 9),
                    end: at(0, 10),
                },
                EventSnapshot {
                    id: "evt-2".to_string(),
                    subject: "1:1 with Sam".to_string(),
                    start: at(1, 14),
                    end: at(1, 15),
                },
            ],
            tasks: vec![TaskSnapshot {
                id: "task-1".to_string(),
                title: "Submit expense report".to_string(),
                due: Some(today.to_string()),
            }],
        };

        Self {
            store: Mutex::new(store),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Subjects of sent mail, oldest first
    pub fn sent_subjects(&self) -> Vec<String> {
        self.store().sent.iter().map(|e| e.subject.clone()).collect()
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

fn contains_query(query: &str, fields: &[&str]) -> bool {
    let query = query.to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&query))
}

#[async_trait]
impl ToolExecutor for DemoMailbox {
    async fn execute_tool(
        &self,
        invocation: &ToolInvocation,
    ) -> std::result::Result<serde_json::Value, ToolFailure> {
        let mut store = self.store();
        info!(tool = %invocation.tool_name(), "Demo mailbox handling tool");

        match invocation {
            ToolInvocation::SendEmail(p) => {
                let id = new_id("sent");
                store.sent.push(Email {
                    id: id.clone(),
                    from: "me@example.com".to_string(),
                    to: p.to.clone(),
                    subject: p.subject.clone(),
                    body: p.body.clone(),
                });
                Ok(json!({ "sent": true, "id": id }))
            }
            ToolInvocation::ReplyEmail(p) => {
                let original = match &p.message_id {
                    Some(id) => store.inbox.iter().find(|e| &e.id == id).cloned(),
                    None => store.inbox.first().cloned(),
                }
                .ok_or_else(|| ToolFailure::new("no such email to reply to"))?;

                let id = new_id("sent");
                store.sent.push(Email {
                    id: id.clone(),
                    from: "me@example.com".to_string(),
                    to: vec![original.from.clone()],
                    subject: format!("Re: {}", original.subject),
                    body: p.body.clone(),
                });
                Ok(json!({ "sent": true, "id": id, "in_reply_to": original.id }))
            }
            ToolInvocation::CreateCalendarEvent(p) => {
                let id = new_id("evt");
                store.events.push(EventSnapshot {
                    id: id.clone(),
                    subject: p.subject.clone(),
                    start: p.start.clone(),
                    end: p.end.clone(),
                });
                Ok(json!({ "created": true, "id": id }))
            }
            ToolInvocation::CreateTask(p) => {
                let id = new_id("task");
                store.tasks.push(TaskSnapshot {
                    id: id.clone(),
                    title: p.title.clone(),
                    due: p.due.clone(),
                });
                Ok(json!({ "created": true, "id": id }))
            }
            ToolInvocation::DeleteItem(p) => {
                let removed = match p.kind {
                    ItemKind::Email => remove(&mut store.inbox, |e| e.id == p.item_id),
                    ItemKind::Event => remove(&mut store.events, |e| e.id == p.item_id),
                    ItemKind::Task => remove(&mut store.tasks, |t| t.id == p.item_id),
                };
                if removed {
                    Ok(json!({ "deleted": true, "id": p.item_id }))
                } else {
                    Err(ToolFailure::new(format!(
                        "no {} with id {}",
                        p.kind.as_str(),
                        p.item_id
                    )))
                }
            }
            ToolInvocation::SearchEmail(p) => {
                let hits: Vec<_> = store
                    .inbox
                    .iter()
                    .filter(|e| {
                        contains_query(&p.query, &[e.subject.as_str(), e.body.as_str(), e.from.as_str()])
                    })
                    .take(p.limit as usize)
                    .map(|e| json!({ "id": e.id, "from": e.from, "subject": e.subject }))
                    .collect();
                Ok(json!({ "results": hits }))
            }
            ToolInvocation::SearchCalendar(p) => {
                let start = p
                    .start
                    .as_deref()
                    .map(|raw| parse_bound(raw, false).ok_or_else(|| invalid_date(raw)))
                    .transpose()?;
                let end = p
                    .end
                    .as_deref()
                    .map(|raw| parse_bound(raw, true).ok_or_else(|| invalid_date(raw)))
                    .transpose()?;

                let hits: Vec<_> = store
                    .events
                    .iter()
                    .filter(|e| {
                        p.query
                            .as_deref()
                            .is_none_or(|q| contains_query(q, &[e.subject.as_str()]))
                    })
                    .filter(|e| overlaps(e, start, end))
                    .cloned()
                    .collect();
                Ok(json!({ "events": hits }))
            }
            ToolInvocation::SummarizeEmail(p) => {
                let email = match &p.message_id {
                    Some(id) => store.inbox.iter().find(|e| &e.id == id),
                    None => store.inbox.first(),
                }
                .ok_or_else(|| ToolFailure::new("no such email"))?;
                Ok(json!({
                    "id": email.id,
                    "from": email.from,
                    "to": email.to,
                    "subject": email.subject,
                    "body": email.body,
                }))
            }
            ToolInvocation::Unknown { name, .. } => {
                Err(ToolFailure::new(format!("unsupported tool {}", name)))
            }
        }
    }
}

/// Parse an ISO 8601 date or date-time. A bare date stands for the start of
/// that day, or its last second when `end_of_day` is set.
fn parse_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

fn invalid_date(raw: &str) -> ToolFailure {
    ToolFailure::new(format!("not an ISO 8601 date: {}", raw))
}

/// Whether the event intersects the optional `[start, end]` range
fn overlaps(
    event: &EventSnapshot,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    let (Some(event_start), Some(event_end)) =
        (parse_bound(&event.start, false), parse_bound(&event.end, false))
    else {
        return false;
    };
    start.is_none_or(|s| event_end >= s) && end.is_none_or(|e| event_start <= e)
}

fn remove<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !pred(item));
    items.len() != before
}

#[async_trait]
impl ContextProvider for DemoMailbox {
    async fn current_context(&self) -> MailboxContext {
        let store = self.store();
        MailboxContext {
            email: store.inbox.first().map(|e| EmailSnapshot {
                id: e.id.clone(),
                from: e.from.clone(),
                subject: e.subject.clone(),
                body: e.body.clone(),
            }),
            events: store.events.clone(),
            tasks: store.tasks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_core::tools::{
        DeleteItemParams, ReplyEmailParams, SearchCalendarParams, SearchEmailParams,
    };

    #[tokio::test]
    async fn test_reply_goes_to_sender() {
        let mailbox = DemoMailbox::new();
        let output = mailbox
            .execute_tool(&ToolInvocation::ReplyEmail(ReplyEmailParams {
                message_id: Some("msg-1".to_string()),
                body: "Count me in.".to_string(),
                reply_all: false,
            }))
            .await
            .unwrap();

        assert_eq!(output["in_reply_to"], "msg-1");
        assert_eq!(mailbox.sent_subjects(), vec!["Re: Roadmap review on Thursday"]);
    }

    #[tokio::test]
    async fn test_search_and_delete() {
        let mailbox = DemoMailbox::new();
        let output = mailbox
            .execute_tool(&ToolInvocation::SearchEmail(SearchEmailParams {
                query: "invoice".to_string(),
                limit: 10,
            }))
            .await
            .unwrap();
        assert_eq!(output["results"][0]["id"], "msg-2");

        let delete = ToolInvocation::DeleteItem(DeleteItemParams {
            item_id: "msg-2".to_string(),
            kind: ItemKind::Email,
        });
        assert!(mailbox.execute_tool(&delete).await.is_ok());
        let err = mailbox.execute_tool(&delete).await.unwrap_err();
        assert_eq!(err.message, "no email with id msg-2");
    }

    #[tokio::test]
    async fn test_calendar_search_for_today() {
        let mailbox = DemoMailbox::new();
        let today = Utc::now().date_naive().to_string();
        let output = mailbox
            .execute_tool(&ToolInvocation::SearchCalendar(SearchCalendarParams {
                query: None,
                start: Some(today.clone()),
                end: Some(today),
            }))
            .await
            .unwrap();

        let events = output["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["id"], "evt-1");
    }

    #[tokio::test]
    async fn test_calendar_search_with_times() {
        let mailbox = DemoMailbox::new();
        let tomorrow = Utc::now().date_naive() + Duration::days(1);
        let output = mailbox
            .execute_tool(&ToolInvocation::SearchCalendar(SearchCalendarParams {
                query: Some("sam".to_string()),
                start: Some(format!("{}T13:30:00Z", tomorrow)),
                end: Some(format!("{}T14:30", tomorrow)),
            }))
            .await
            .unwrap();
        assert_eq!(output["events"][0]["id"], "evt-2");

        let err = mailbox
            .execute_tool(&ToolInvocation::SearchCalendar(SearchCalendarParams {
                query: None,
                start: Some("next tuesday".to_string()),
                end: None,
            }))
            .await
            .unwrap_err();
        assert!(err.message.contains("next tuesday"));
    }

    #[tokio::test]
    async fn test_context_shows_first_email() {
        let context = DemoMailbox::new().current_context().await;
        assert_eq!(context.email.unwrap().id, "msg-1");
        assert_eq!(context.events.len(), 2);
        assert_eq!(context.tasks.len(), 1);
    }
}
