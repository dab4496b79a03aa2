//! Provider transports
//!
//! A transport turns a [`Prompt`] into one HTTP exchange with a specific
//! backend and normalizes the answer into a [`ModelReply`]. Transports hold no
//! credentials; the key travels with each call.

mod anthropic;
mod mock;
mod openai;

pub use anthropic::AnthropicTransport;
pub use mock::ScriptedTransport;
pub use openai::OpenAiCompatibleTransport;

use crate::completion::{ModelReply, Prompt};
use crate::credential::ProviderCredential;
use crate::error::ProviderError;
use crate::util::{parse_retry_after, sanitize_error_for_user};
use reqwest::RequestBuilder;
use tracing::{debug, warn};

/// Default completion length when the prompt does not set one
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// One way of reaching a model
#[async_trait::async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Send a prompt using `credential` and return the normalized reply
    async fn send(
        &self,
        prompt: &Prompt,
        credential: &ProviderCredential,
    ) -> std::result::Result<ModelReply, ProviderError>;
}

/// Send a prepared request and return the body of a successful response.
///
/// Non-2xx statuses are classified by status code alone; the body only
/// contributes a sanitized detail string.
pub(crate) async fn send_request(
    request: RequestBuilder,
    provider: &str,
) -> std::result::Result<String, ProviderError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::transient(provider, "request timed out")
        } else {
            ProviderError::transient(provider, sanitize_error_for_user(&e.to_string()))
        }
    })?;

    let status = response.status();
    let retry_after = parse_retry_after(response.headers());
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::transient(provider, sanitize_error_for_user(&e.to_string())))?;

    if !status.is_success() {
        // SECURITY: Don't expose raw HTTP response body
        let detail = sanitize_error_for_user(&extract_error_message(&body));
        warn!(
            provider = %provider,
            status = status.as_u16(),
            detail = %detail,
            "Provider request failed"
        );
        return Err(ProviderError::from_status(
            status.as_u16(),
            provider,
            detail,
            retry_after,
        ));
    }

    debug!(provider = %provider, bytes = body.len(), "Provider response received");
    Ok(body)
}

/// Pull the human part out of `{"error": {"message": ...}}` style bodies
fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("error") {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        None => value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string()),
    }
}

/// Attach endpoint override headers
pub(crate) fn with_override_headers(
    mut request: RequestBuilder,
    credential: &ProviderCredential,
) -> RequestBuilder {
    for (name, value) in &credential.endpoint.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}
