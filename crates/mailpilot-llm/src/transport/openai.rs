//! OpenAI-compatible chat completions transport
//!
//! Used for OpenAI itself and for gateways speaking the same dialect
//! (OpenRouter, Groq, Ollama).

use super::{send_request, with_override_headers, ProviderTransport, DEFAULT_MAX_TOKENS};
use crate::completion::{ModelReply, Prompt, ToolCall, ToolDefinition};
use crate::credential::ProviderCredential;
use crate::error::ProviderError;
use crate::message::Message;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// OpenAI-compatible transport
pub struct OpenAiCompatibleTransport {
    client: Client,
}

impl OpenAiCompatibleTransport {
    /// Create a transport on a shared client
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatTool<'a> {
    r#type: &'static str,
    function: ChatFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ChatFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChoiceToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChoiceToolCall {
    #[serde(default)]
    id: String,
    function: ChoiceFunction,
}

#[derive(Debug, Deserialize)]
struct ChoiceFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn convert_message(message: &Message) -> ChatMessage<'_> {
    ChatMessage {
        role: message.role.as_str(),
        content: &message.content,
    }
}

fn convert_tool(tool: &ToolDefinition) -> ChatTool<'_> {
    ChatTool {
        r#type: "function",
        function: ChatFunction {
            name: &tool.name,
            description: &tool.description,
            parameters: &tool.parameters,
        },
    }
}

fn convert_response(
    response: ChatResponse,
    provider: &str,
) -> std::result::Result<ModelReply, ProviderError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(ProviderError::transient(provider, "response had no choices"));
    };

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            // Arguments arrive as a JSON string; keep unparseable text as a
            // string so the planner can report it.
            let arguments = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                warn!(tool = %call.function.name, error = %e, "Tool arguments are not valid JSON");
                serde_json::Value::String(call.function.arguments.clone())
            });
            ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            }
        })
        .collect();

    Ok(ModelReply {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        model: response.model,
        finish_reason: choice.finish_reason,
    })
}

#[async_trait::async_trait]
impl ProviderTransport for OpenAiCompatibleTransport {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    #[instrument(skip(self, prompt, credential), fields(provider = %credential.provider, model = %credential.model))]
    async fn send(
        &self,
        prompt: &Prompt,
        credential: &ProviderCredential,
    ) -> std::result::Result<ModelReply, ProviderError> {
        let provider = credential.provider.as_str();
        let url = format!("{}/chat/completions", credential.base_url());

        let body = ChatRequest {
            model: &credential.model,
            messages: prompt.messages.iter().map(convert_message).collect(),
            max_tokens: prompt.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: prompt.temperature,
            tools: prompt.tools.iter().map(convert_tool).collect(),
        };

        debug!("Sending chat completion request: {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = credential.api_key() {
            request = request.bearer_auth(key);
        }
        let request = with_override_headers(request, credential);

        let text = send_request(request, provider).await?;
        let response: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            ProviderError::transient(provider, format!("invalid response: {}", e))
        })?;

        convert_response(response, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_calls_are_parsed() {
        let response: ChatResponse = serde_json::from_value(json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "send_email", "arguments": "{\"to\":[\"a@b.c\"]}"}
                    }]
                }
            }]
        }))
        .unwrap();

        let reply = convert_response(response, "openai").unwrap();
        assert!(reply.content.is_empty());
        assert_eq!(reply.tool_calls[0].id, "call_1");
        assert_eq!(reply.tool_calls[0].arguments["to"][0], "a@b.c");
    }

    #[test]
    fn test_malformed_arguments_kept_as_string() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{"function": {"name": "send_email", "arguments": "{to:"}}]
                }
            }]
        }))
        .unwrap();

        let reply = convert_response(response, "groq").unwrap();
        assert_eq!(reply.tool_calls[0].arguments, json!("{to:"));
    }

    #[test]
    fn test_empty_choices_is_transient() {
        let response = ChatResponse {
            model: String::new(),
            choices: Vec::new(),
        };
        let err = convert_response(response, "openrouter").unwrap_err();
        assert_eq!(err.kind(), crate::error::ProviderErrorKind::Transient);
    }
}
