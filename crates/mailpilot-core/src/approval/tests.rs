use super::*;
use crate::error::ApprovalError;
use crate::tools::{ReplyEmailParams, SendEmailParams, ToolInvocation};
use serde_json::json;
use uuid::Uuid;

fn send_email(to: &str) -> ToolInvocation {
    ToolInvocation::SendEmail(SendEmailParams {
        to: vec![to.to_string()],
        cc: Vec::new(),
        subject: "Quarterly numbers".to_string(),
        body: "Attached.".to_string(),
    })
}

fn reply(body: &str) -> ToolInvocation {
    ToolInvocation::ReplyEmail(ReplyEmailParams {
        message_id: None,
        body: body.to_string(),
        reply_all: false,
    })
}

#[test]
fn test_enqueue_is_fifo() {
    let gate = ApprovalGate::new();
    let turn = Uuid::new_v4();
    let (first, _rx1) = gate.enqueue(turn, send_email("a@example.com"));
    let (second, _rx2) = gate.enqueue(turn, reply("Sure"));

    let pending = gate.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(pending[1].id, second.id);
    assert!(pending.iter().all(PendingApproval::is_pending));
    assert_eq!(first.description, "Send an email to a@example.com with subject \"Quarterly numbers\"");
}

#[test]
fn test_resolution_out_of_order() {
    let gate = ApprovalGate::new();
    let turn = Uuid::new_v4();
    let (first, _rx1) = gate.enqueue(turn, send_email("a@example.com"));
    let (second, _rx2) = gate.enqueue(turn, reply("Sure"));

    gate.resolve(second.id, ApprovalDecision::Approve, None).unwrap();

    let pending = gate.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, first.id);
    assert_eq!(gate.get(second.id).unwrap().status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_approve_wakes_waiter() {
    let gate = ApprovalGate::new();
    let (approval, rx) = gate.enqueue(Uuid::new_v4(), send_email("a@example.com"));

    gate.resolve(approval.id, ApprovalDecision::Approve, None).unwrap();

    let outcome = rx.await.unwrap();
    assert_eq!(
        outcome,
        ApprovalOutcome::Approved {
            invocation: send_email("a@example.com"),
            edited: false,
        }
    );
    assert_eq!(gate.pending_count(), 0);
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let gate = ApprovalGate::new();
    let (approval, rx) = gate.enqueue(Uuid::new_v4(), reply("No thanks"));

    let first = gate
        .resolve(approval.id, ApprovalDecision::reject("not now"), None)
        .unwrap();
    let second = gate
        .resolve(approval.id, ApprovalDecision::Approve, Some(json!({"body": "Yes!"})))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        ApprovalOutcome::Rejected {
            reason: Some("not now".to_string())
        }
    );
    assert_eq!(rx.await.unwrap(), first);

    let record = gate.get(approval.id).unwrap();
    assert_eq!(record.status, ApprovalStatus::Rejected);
    assert_eq!(record.invocation, reply("No thanks"));
}

#[test]
fn test_old_resolution_still_reported_after_many_more() {
    let gate = ApprovalGate::new();
    let turn = Uuid::new_v4();
    let (first, _rx) = gate.enqueue(turn, reply("No thanks"));
    gate.resolve(first.id, ApprovalDecision::reject("no"), None).unwrap();

    for i in 0..300 {
        let (approval, _rx) = gate.enqueue(turn, reply(&format!("Reply {}", i)));
        gate.resolve(approval.id, ApprovalDecision::Approve, None).unwrap();
    }

    assert_eq!(
        gate.resolve(first.id, ApprovalDecision::Approve, None),
        Ok(ApprovalOutcome::Rejected {
            reason: Some("no".to_string())
        })
    );
    assert_eq!(gate.get(first.id).unwrap().status, ApprovalStatus::Rejected);
}

#[test]
fn test_unknown_id_is_not_found() {
    let gate = ApprovalGate::new();
    let id = Uuid::new_v4();
    assert_eq!(
        gate.resolve(id, ApprovalDecision::Approve, None),
        Err(ApprovalError::NotFound(id))
    );
}

#[tokio::test]
async fn test_edit_replaces_parameters() {
    let gate = ApprovalGate::new();
    let (approval, rx) = gate.enqueue(Uuid::new_v4(), send_email("wrong@example.com"));

    let outcome = gate
        .resolve(
            approval.id,
            ApprovalDecision::Approve,
            Some(json!({"to": ["right@example.com"]})),
        )
        .unwrap();

    let ApprovalOutcome::Approved { invocation, edited } = rx.await.unwrap() else {
        panic!("expected approval");
    };
    assert!(edited);
    assert_eq!(invocation, send_email("right@example.com"));
    assert_eq!(outcome.status(), ApprovalStatus::Approved);
    assert_eq!(gate.get(approval.id).unwrap().invocation, send_email("right@example.com"));
}

#[test]
fn test_invalid_edit_keeps_approval_pending() {
    let gate = ApprovalGate::new();
    let (approval, _rx) = gate.enqueue(Uuid::new_v4(), send_email("a@example.com"));

    let err = gate
        .resolve(approval.id, ApprovalDecision::Approve, Some(json!({"to": []})))
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidEdit { .. }));
    assert!(gate.is_pending(approval.id));

    let err = gate
        .resolve(approval.id, ApprovalDecision::Approve, Some(json!("just send it")))
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidEdit { .. }));
    assert_eq!(gate.pending()[0].invocation, send_email("a@example.com"));
}

#[tokio::test]
async fn test_discard_all_is_explicit() {
    let gate = ApprovalGate::new();
    let turn = Uuid::new_v4();
    let (first, rx1) = gate.enqueue(turn, send_email("a@example.com"));
    let (_second, rx2) = gate.enqueue(turn, reply("Sure"));

    let discarded = gate.discard_all();
    assert_eq!(discarded.len(), 2);
    assert!(discarded.iter().all(|a| a.status == ApprovalStatus::Discarded));
    assert_eq!(gate.pending_count(), 0);

    assert_eq!(rx1.await.unwrap(), ApprovalOutcome::Discarded);
    assert_eq!(rx2.await.unwrap(), ApprovalOutcome::Discarded);

    // A late click on a discarded approval reports the discard.
    assert_eq!(
        gate.resolve(first.id, ApprovalDecision::Approve, None),
        Ok(ApprovalOutcome::Discarded)
    );
}

#[test]
fn test_resolve_after_waiter_dropped() {
    let gate = ApprovalGate::new();
    let (approval, rx) = gate.enqueue(Uuid::new_v4(), reply("ok"));
    drop(rx);

    let outcome = gate.resolve(approval.id, ApprovalDecision::Approve, None).unwrap();
    assert_eq!(outcome.status(), ApprovalStatus::Approved);
}

#[test]
fn test_decision_serialization() {
    let json = serde_json::to_value(ApprovalDecision::reject("wrong recipient")).unwrap();
    assert_eq!(json, json!({"decision": "reject", "reason": "wrong recipient"}));

    let decision: ApprovalDecision = serde_json::from_value(json!({"decision": "approve"})).unwrap();
    assert_eq!(decision, ApprovalDecision::Approve);
}
