//! Prompt construction
//!
//! A prompt is the system prompt (with the mailbox snapshot), the most recent
//! history turns, then the messages produced so far in the current turn.

use crate::tools::{tool_definitions, ToolInvocation};
use mailpilot_llm::{Message, Prompt};

use super::core::ConversationOrchestrator;

pub(crate) const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Mailpilot, an assistant working inside the user's email and calendar client.
Answer questions about the user's mail, calendar and tasks, and use the provided tools when an action is needed.
Actions that send, create or delete anything are shown to the user for approval before they run. If the user rejects one, do not ask for the same action again; explain what you can do instead.
If you cannot call tools natively, reply with a single fenced block:
```tool
{\"tool\": \"<name>\", \"parameters\": { ... }}
```";

/// How a planned call is recorded in the turn transcript
pub(crate) fn request_message(reply_text: &str, invocation: &ToolInvocation) -> Message {
    let request = format!(
        "[Tool request: {}] {}",
        invocation.tool_name(),
        invocation.parameters()
    );
    if reply_text.trim().is_empty() {
        Message::assistant(request)
    } else {
        Message::assistant(format!("{}\n{}", reply_text.trim(), request))
    }
}

pub(crate) fn result_message(tool: &str, output: &serde_json::Value) -> Message {
    Message::user(format!("[Tool result: {}]\n{}", tool, output))
}

pub(crate) fn failure_message(tool: &str, message: &str) -> Message {
    Message::user(format!(
        "[Tool error: {}] {}\nThe action did not complete. Tell the user, or try another approach.",
        tool, message
    ))
}

pub(crate) fn rejection_message(tool: &str, reason: Option<&str>) -> Message {
    let reason = reason
        .map(|r| format!(" Reason: {}", r))
        .unwrap_or_default();
    Message::user(format!(
        "[Approval] The user rejected the {} action; it was not performed.{}",
        tool, reason
    ))
}

impl ConversationOrchestrator {
    pub(crate) fn system_message(&self, context: Option<&str>) -> Message {
        let base = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        match context {
            Some(context) => Message::system(format!(
                "{}\n\n# Current mailbox\n{}",
                base, context
            )),
            None => Message::system(base),
        }
    }

    pub(crate) fn build_prompt(
        &self,
        system: &Message,
        history: &[Message],
        transcript: &[Message],
    ) -> Prompt {
        let mut prompt = Prompt::new()
            .with_message(system.clone())
            .with_messages(history.iter().cloned())
            .with_messages(transcript.iter().cloned())
            .with_tools(tool_definitions());
        if let Some(max_tokens) = self.config.max_tokens {
            prompt = prompt.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.config.temperature {
            prompt = prompt.with_temperature(temperature);
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_llm::MessageRole;

    #[test]
    fn test_rejection_message_carries_reason() {
        let message = rejection_message("reply_email", Some("too blunt"));
        assert_eq!(message.role, MessageRole::User);
        assert!(message.content.contains("rejected the reply_email action"));
        assert!(message.content.ends_with("Reason: too blunt"));

        let bare = rejection_message("delete_item", None);
        assert!(bare.content.ends_with("it was not performed."));
    }
}
