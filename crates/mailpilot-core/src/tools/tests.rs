use super::*;
use serde_json::json;

#[test]
fn test_table_rows_match_kinds() {
    for kind in ToolKind::ALL {
        assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        assert_eq!(kind.definition().name, kind.name());
    }
    assert_eq!(tool_definitions().len(), ToolKind::ALL.len());
}

#[test]
fn test_sensitivity_table() {
    let sensitive = [
        ToolKind::SendEmail,
        ToolKind::ReplyEmail,
        ToolKind::CreateCalendarEvent,
        ToolKind::CreateTask,
        ToolKind::DeleteItem,
    ];
    let safe = [
        ToolKind::SearchEmail,
        ToolKind::SearchCalendar,
        ToolKind::SummarizeEmail,
    ];

    for kind in sensitive {
        assert!(kind.requires_approval(), "{} should need approval", kind);
    }
    for kind in safe {
        assert_eq!(kind.sensitivity(), Sensitivity::Safe, "{} should be safe", kind);
    }
}

#[test]
fn test_reply_email_from_parts() {
    let invocation = ToolInvocation::from_parts(
        "reply_email",
        json!({"body": "Thanks, but I can't make it."}),
    )
    .unwrap();

    assert_eq!(invocation.kind(), Some(ToolKind::ReplyEmail));
    assert!(invocation.requires_approval());
    assert_eq!(invocation.parameters()["body"], "Thanks, but I can't make it.");
    assert_eq!(invocation.describe(), "Reply to the open email");
}

#[test]
fn test_unknown_tool_name() {
    let invocation = ToolInvocation::from_parts("launch_rocket", json!({"target": "moon"})).unwrap();
    assert_eq!(invocation.kind(), None);
    assert_eq!(invocation.tool_name(), "launch_rocket");
    assert!(invocation.requires_approval());
}

#[test]
fn test_missing_required_field_is_invalid() {
    let err = ToolInvocation::from_parts("send_email", json!({"subject": "Hi"})).unwrap_err();
    assert_eq!(err.tool, ToolKind::SendEmail);
    assert!(err.reason.contains("to"));
}

#[test]
fn test_bad_recipient_is_invalid() {
    let err = ToolInvocation::from_parts(
        "send_email",
        json!({"to": ["bob"], "subject": "Hi", "body": "Hello"}),
    )
    .unwrap_err();
    assert!(err.reason.contains("email address"));
}

#[test]
fn test_search_defaults_and_null_arguments() {
    let invocation = ToolInvocation::from_parts("search_email", json!({"query": "invoice"})).unwrap();
    assert_eq!(
        invocation,
        ToolInvocation::SearchEmail(SearchEmailParams {
            query: "invoice".to_string(),
            limit: 10,
        })
    );

    let invocation = ToolInvocation::from_parts("search_calendar", serde_json::Value::Null).unwrap();
    assert!(!invocation.requires_approval());
    assert_eq!(invocation.describe(), "Look up calendar events");
}

#[test]
fn test_search_limit_out_of_range() {
    assert!(ToolInvocation::from_parts("search_email", json!({"query": "x", "limit": 0})).is_err());
    assert!(ToolInvocation::from_parts("search_email", json!({"query": "x", "limit": 500})).is_err());
}

#[test]
fn test_serialized_shape() {
    let invocation = ToolInvocation::DeleteItem(DeleteItemParams {
        item_id: "evt-9".to_string(),
        kind: ItemKind::Event,
    });
    let value = serde_json::to_value(&invocation).unwrap();
    assert_eq!(
        value,
        json!({"tool": "delete_item", "parameters": {"item_id": "evt-9", "kind": "event"}})
    );
    assert_eq!(invocation.describe(), "Delete event evt-9");
}
