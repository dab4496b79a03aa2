//! Anthropic Messages API transport

use super::{send_request, with_override_headers, ProviderTransport, DEFAULT_MAX_TOKENS};
use crate::completion::{ModelReply, Prompt, ToolCall, ToolDefinition};
use crate::credential::ProviderCredential;
use crate::error::ProviderError;
use crate::message::{Message, MessageRole};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Anthropic API version
pub const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude transport
pub struct AnthropicTransport {
    client: Client,
}

impl AnthropicTransport {
    /// Create a transport on a shared client
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

/// Split system messages out; Anthropic takes them as a top-level field
fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage<'_>>) {
    let mut system_parts = Vec::new();
    let mut converted = Vec::new();

    for msg in messages {
        match msg.role {
            MessageRole::System => {
                if !msg.content.is_empty() {
                    system_parts.push(msg.content.as_str());
                }
            }
            MessageRole::User => converted.push(AnthropicMessage {
                role: "user",
                content: &msg.content,
            }),
            MessageRole::Assistant => converted.push(AnthropicMessage {
                role: "assistant",
                content: &msg.content,
            }),
        }
    }

    let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));
    (system, converted)
}

fn convert_tool(tool: &ToolDefinition) -> AnthropicTool<'_> {
    AnthropicTool {
        name: &tool.name,
        description: &tool.description,
        input_schema: &tool.parameters,
    }
}

fn convert_response(response: AnthropicResponse) -> ModelReply {
    let mut text = Vec::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ResponseContentBlock::Text { text: t } => text.push(t),
            ResponseContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id,
                name,
                arguments: input,
            }),
            ResponseContentBlock::Other => {}
        }
    }

    ModelReply {
        content: text.join(""),
        tool_calls,
        model: response.model,
        finish_reason: response.stop_reason,
    }
}

#[async_trait::async_trait]
impl ProviderTransport for AnthropicTransport {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, prompt, credential), fields(model = %credential.model, tools = prompt.tools.len()))]
    async fn send(
        &self,
        prompt: &Prompt,
        credential: &ProviderCredential,
    ) -> std::result::Result<ModelReply, ProviderError> {
        let provider = credential.provider.as_str();
        let url = format!("{}/v1/messages", credential.base_url());
        let (system, messages) = convert_messages(&prompt.messages);

        let body = AnthropicRequest {
            model: &credential.model,
            max_tokens: prompt.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: prompt.temperature,
            tools: prompt.tools.iter().map(convert_tool).collect(),
        };

        debug!("Sending request to Anthropic: {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = credential.api_key() {
            request = request.header("x-api-key", key);
        }
        let request = with_override_headers(request, credential);

        let text = send_request(request, provider).await?;
        let response: AnthropicResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::transient(provider, format!("invalid response: {}", e))
        })?;

        Ok(convert_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_messages_are_hoisted() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("hi"),
            Message::system("Today is Monday"),
            Message::assistant("hello"),
        ];
        let (system, converted) = convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("You are helpful\n\nToday is Monday"));
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
    }

    #[test]
    fn test_tool_use_blocks_become_tool_calls() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "model": "claude-sonnet-4-5-20250929",
            "stop_reason": "tool_use",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "search_calendar", "input": {"date": "today"}},
                {"type": "thinking", "thinking": "..."}
            ]
        }))
        .unwrap();

        let reply = convert_response(response);
        assert_eq!(reply.content, "Let me check.");
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "search_calendar");
        assert_eq!(reply.tool_calls[0].arguments["date"], "today");
        assert_eq!(reply.finish_reason.as_deref(), Some("tool_use"));
    }
}
