//! Integration tests for Mailpilot
//!
//! These tests drive whole conversations through the public crate APIs:
//! - mailpilot-llm: router and scripted transport
//! - mailpilot-core: orchestrator, approval gate and broadcaster

use mailpilot_core::{
    ApprovalDecision, ApprovalStatus, ConversationOrchestrator, Error, Notification, PendingApproval,
    ProviderSelection, SessionEvent, ToolExecutor, ToolFailure, ToolInvocation,
};
use mailpilot_llm::{
    ModelReply, ProviderCredential, ProviderKind, ProviderRouter, RouterConfig, ScriptedTransport,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

#[derive(Default)]
struct Calendar {
    executed: Mutex<Vec<ToolInvocation>>,
}

#[async_trait::async_trait]
impl ToolExecutor for Calendar {
    async fn execute_tool(
        &self,
        invocation: &ToolInvocation,
    ) -> Result<serde_json::Value, ToolFailure> {
        self.executed.lock().unwrap().push(invocation.clone());
        match invocation {
            ToolInvocation::SearchEmail(_) => Ok(json!({
                "results": [{ "id": "msg-7", "subject": "Offsite planning" }]
            })),
            _ => Ok(json!({ "created": true, "id": "evt-42" })),
        }
    }
}

fn session(transport: Arc<ScriptedTransport>, calendar: Arc<Calendar>) -> Arc<ConversationOrchestrator> {
    let router = ProviderRouter::empty(RouterConfig::default())
        .with_transport(ProviderKind::Mock, transport);
    Arc::new(ConversationOrchestrator::new(
        Arc::new(router),
        ProviderSelection::new(ProviderCredential::new(ProviderKind::Mock)),
        calendar,
    ))
}

async fn next_approval(rx: &mut broadcast::Receiver<Notification>) -> PendingApproval {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(Notification::Message(SessionEvent::ApprovalRequired { approval, .. })) =
                rx.recv().await
            {
                return approval;
            }
        }
    })
    .await
    .expect("no approval requested")
}

fn event_type(event: &SessionEvent) -> String {
    serde_json::to_value(event).unwrap()["type"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_search_then_schedule_with_edit() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_reply(ModelReply::tool_call("search_email", json!({ "query": "offsite" })));
    transport.push_reply(ModelReply::tool_call(
        "create_calendar_event",
        json!({
            "subject": "Offsite planning",
            "start": "2026-11-02T10:00:00Z",
            "end": "2026-11-02T11:00:00Z",
        }),
    ));
    transport.push_reply(ModelReply::text("Booked the offsite planning session."));

    let calendar = Arc::new(Calendar::default());
    let orchestrator = session(transport.clone(), calendar.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = orchestrator.subscribe(
        |_| Ok(()),
        move |event: &SessionEvent| {
            sink.lock().unwrap().push(event_type(event));
            Ok(())
        },
    );
    let mut rx = orchestrator.broadcaster().subscribe_channel();

    let handle = assert_ok!(orchestrator.submit("Set up a meeting about the offsite"));
    let approval = next_approval(&mut rx).await;
    assert_eq!(approval.tool(), "create_calendar_event");
    assert_eq!(orchestrator.state().pending_approvals.len(), 1);

    // A second request while the approval is open is refused
    assert!(matches!(
        orchestrator.process_user_message("And email Sam").await,
        Err(Error::Busy)
    ));

    assert_ok!(orchestrator.resolve_approval(
        approval.id,
        ApprovalDecision::Approve,
        Some(json!({ "start": "2026-11-02T14:00:00Z", "end": "2026-11-02T15:00:00Z" })),
    ));

    let answer = assert_ok!(handle.wait().await);
    assert_eq!(answer.text, "Booked the offsite planning session.");
    assert_eq!(answer.tool_calls.len(), 2);
    assert_eq!(transport.call_count(), 3);

    let executed = calendar.executed.lock().unwrap().clone();
    match &executed[1] {
        ToolInvocation::CreateCalendarEvent(p) => {
            assert_eq!(p.start, "2026-11-02T14:00:00Z");
            assert_eq!(p.subject, "Offsite planning");
        }
        other => panic!("unexpected invocation {:?}", other),
    }

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.first().map(String::as_str), Some("user_message"));
    assert_eq!(seen.last().map(String::as_str), Some("assistant_message"));
    let required = seen.iter().position(|t| t == "approval_required").unwrap();
    let resolved = seen.iter().position(|t| t == "approval_resolved").unwrap();
    assert!(required < resolved);
    assert_eq!(seen.iter().filter(|t| *t == "tool_started").count(), 2);

    let state = orchestrator.state();
    assert!(!state.is_processing);
    assert!(state.pending_approvals.is_empty());
}

#[tokio::test]
async fn test_sessions_do_not_share_approvals() {
    let first_transport = Arc::new(ScriptedTransport::new());
    first_transport.push_reply(ModelReply::tool_call(
        "create_task",
        json!({ "title": "Renew passport" }),
    ));
    let first = session(first_transport, Arc::new(Calendar::default()));
    let second = session(Arc::new(ScriptedTransport::new()), Arc::new(Calendar::default()));

    let mut rx = first.broadcaster().subscribe_channel();
    let _handle = first.submit("Remind me to renew my passport").unwrap();
    let approval = next_approval(&mut rx).await;

    assert!(second.pending_approvals().is_empty());
    assert_err!(second.resolve_approval(approval.id, ApprovalDecision::Approve, None));
    let answer = assert_ok!(second.process_user_message("hello").await);
    assert_eq!(answer.text, "mock response");

    assert_eq!(first.clear_conversation(), 1);
}

#[tokio::test]
async fn test_clear_then_start_over() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_reply(ModelReply::tool_call(
        "delete_item",
        json!({ "item_id": "evt-1", "kind": "event" }),
    ));
    transport.push_reply(ModelReply::text("Your day is clear."));
    let calendar = Arc::new(Calendar::default());
    let orchestrator = session(transport, calendar.clone());

    let mut rx = orchestrator.broadcaster().subscribe_channel();
    let handle = orchestrator.submit("Cancel standup").unwrap();
    let approval = next_approval(&mut rx).await;

    assert_eq!(orchestrator.clear_conversation(), 1);
    assert!(!orchestrator.is_processing());
    assert!(orchestrator.history().is_empty());
    assert!(orchestrator.pending_approvals().is_empty());
    assert_err!(handle.wait().await);

    // A late approval of the discarded action changes nothing
    let outcome =
        assert_ok!(orchestrator.resolve_approval(approval.id, ApprovalDecision::Approve, None));
    assert_eq!(outcome.status(), ApprovalStatus::Discarded);
    assert!(calendar.executed.lock().unwrap().is_empty());

    let answer = assert_ok!(orchestrator.process_user_message("What's on today?").await);
    assert_eq!(answer.text, "Your day is clear.");
}
