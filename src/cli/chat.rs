//! Console chat session
//!
//! Reads lines from stdin and hands them to the orchestrator while session
//! events are printed as they arrive. Slash commands answer approvals.

use crate::app::{build_router, resolve_selection, AppConfig, DemoMailbox};
use anyhow::Result;
use mailpilot_core::{
    format_error_for_cli, ApprovalDecision, ConversationOrchestrator, Notification, SessionEvent,
    UserFriendlyError,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  /approve <n>           Approve pending action n
  /edit <n> <json>       Approve action n with edited parameters
  /reject <n> [reason]   Reject pending action n
  /pending               List pending actions
  /clear                 Start over
  /help                  Show this help
  /quit                  Exit";

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Text for the assistant
    Message(String),
    /// Approve the n-th pending action, optionally with edits
    Approve {
        /// 1-based position in the pending list
        index: usize,
        /// Replacement parameters from `/edit`
        edited: Option<serde_json::Value>,
    },
    /// Reject the n-th pending action
    Reject {
        /// 1-based position in the pending list
        index: usize,
        /// Explanation passed back to the model
        reason: Option<String>,
    },
    /// List pending actions
    Pending,
    /// Start a fresh conversation
    Clear,
    /// Show the command list
    Help,
    /// End the session
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> std::result::Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(ConsoleCommand::Message(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let (first, remainder) = match args.split_once(char::is_whitespace) {
        Some((first, remainder)) => (first, remainder.trim()),
        None => (args, ""),
    };

    let command = match name {
        "approve" => ConsoleCommand::Approve {
            index: parse_index(first)?,
            edited: None,
        },
        "edit" => {
            let edited = serde_json::from_str(remainder)
                .map_err(|e| format!("Edited parameters must be a JSON object: {}", e))?;
            ConsoleCommand::Approve {
                index: parse_index(first)?,
                edited: Some(edited),
            }
        }
        "reject" => ConsoleCommand::Reject {
            index: parse_index(first)?,
            reason: (!remainder.is_empty()).then(|| remainder.to_string()),
        },
        "pending" => ConsoleCommand::Pending,
        "clear" => ConsoleCommand::Clear,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("Unknown command: /{}", other)),
    };
    Ok(Some(command))
}

fn parse_index(raw: &str) -> std::result::Result<usize, String> {
    raw.parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("Expected an action number, got '{}'", raw))
}

/// Run the console until EOF or `/quit`
pub async fn run(config: AppConfig) -> Result<()> {
    let router = build_router(&config.llm)?;
    let selection = resolve_selection(&config.llm)?;
    let mailbox = Arc::new(DemoMailbox::new());

    let orchestrator = Arc::new(
        ConversationOrchestrator::new(router, selection, mailbox.clone())
            .with_context(mailbox.clone())
            .with_config(config.orchestrator.to_orchestrator_config()),
    );
    let mut events = orchestrator.broadcaster().subscribe_channel();

    println!(
        "📬 Mailpilot ({}). Type a request, or /help for commands.",
        orchestrator.selection().primary.label()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&orchestrator, &line) {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read error");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(Notification::Message(event)) => print_event(&orchestrator, &event),
                    Ok(Notification::State(_)) => {}
                    Err(RecvError::Lagged(n)) => {
                        debug!(lagged = n, "Console event subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    orchestrator.clear_conversation();
    let sent = mailbox.sent_subjects();
    if !sent.is_empty() {
        println!("📤 Sent this session: {}", sent.join(", "));
    }
    Ok(())
}

/// Returns false when the session should end
fn handle_line(orchestrator: &Arc<ConversationOrchestrator>, line: &str) -> bool {
    let command = match parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(message) => {
            println!("{}", message);
            return true;
        }
    };

    match command {
        ConsoleCommand::Message(text) => {
            if let Err(e) = orchestrator.submit(text) {
                println!("{}", e.user_message());
            }
        }
        ConsoleCommand::Approve { index, edited } => {
            decide(orchestrator, index, ApprovalDecision::Approve, edited);
        }
        ConsoleCommand::Reject { index, reason } => {
            decide(orchestrator, index, ApprovalDecision::Reject { reason }, None);
        }
        ConsoleCommand::Pending => {
            let pending = orchestrator.pending_approvals();
            if pending.is_empty() {
                println!("Nothing is waiting for approval.");
            }
            for (i, approval) in pending.iter().enumerate() {
                println!("  {}. {}", i + 1, approval.description);
            }
        }
        ConsoleCommand::Clear => {
            orchestrator.clear_conversation();
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return false,
    }
    true
}

fn decide(
    orchestrator: &ConversationOrchestrator,
    index: usize,
    decision: ApprovalDecision,
    edited: Option<serde_json::Value>,
) {
    let pending = orchestrator.pending_approvals();
    let Some(approval) = pending.get(index - 1) else {
        println!("There is no pending action {}.", index);
        return;
    };
    if let Err(e) = orchestrator.resolve_approval(approval.id, decision, edited) {
        println!("{}", format_error_for_cli(&e));
    }
}

fn print_event(orchestrator: &ConversationOrchestrator, event: &SessionEvent) {
    match event {
        SessionEvent::ApprovalRequired { approval, .. } => {
            let number = orchestrator
                .pending_approvals()
                .iter()
                .position(|a| a.id == approval.id)
                .map_or(1, |i| i + 1);
            println!("✋ Needs your approval [{}]: {}", number, approval.description);
            println!("   /approve {0}, /edit {0} <json> or /reject {0} [reason]", number);
        }
        SessionEvent::ApprovalResolved { status, .. } => {
            debug!(status = ?status, "Approval resolved");
        }
        SessionEvent::ToolStarted { tool, .. } => println!("🔧 {}...", tool),
        SessionEvent::ToolCompleted { tool, success, .. } if !success => {
            println!("⚠️  {} failed", tool);
        }
        SessionEvent::AssistantMessage { content, .. } => println!("🤖 {}", content),
        SessionEvent::TurnFailed { message, .. } => println!("{}", message),
        SessionEvent::ConversationCleared {
            discarded_approvals,
        } => {
            if *discarded_approvals > 0 {
                println!(
                    "🧹 Conversation cleared ({} pending action(s) discarded).",
                    discarded_approvals
                );
            } else {
                println!("🧹 Conversation cleared.");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse("  reply to Dana  ").unwrap(),
            Some(ConsoleCommand::Message("reply to Dana".to_string()))
        );
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_approval_commands() {
        assert_eq!(
            parse("/approve 2").unwrap(),
            Some(ConsoleCommand::Approve {
                index: 2,
                edited: None
            })
        );
        assert_eq!(
            parse("/reject 1 wrong recipient").unwrap(),
            Some(ConsoleCommand::Reject {
                index: 1,
                reason: Some("wrong recipient".to_string())
            })
        );
        assert_eq!(
            parse("/reject 1").unwrap(),
            Some(ConsoleCommand::Reject {
                index: 1,
                reason: None
            })
        );
    }

    #[test]
    fn test_edit_carries_json() {
        assert_eq!(
            parse(r#"/edit 1 {"subject": "Updated"}"#).unwrap(),
            Some(ConsoleCommand::Approve {
                index: 1,
                edited: Some(json!({ "subject": "Updated" }))
            })
        );
        assert!(parse("/edit 1 not-json").is_err());
    }

    #[test]
    fn test_bad_input() {
        assert!(parse("/approve 0").is_err());
        assert!(parse("/approve").is_err());
        assert!(parse("/frobnicate").unwrap_err().contains("/frobnicate"));
        assert_eq!(parse("/exit").unwrap(), Some(ConsoleCommand::Quit));
    }
}
