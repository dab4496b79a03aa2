//! Provider router
//!
//! Picks the transport for a [`ProviderCredential`] and bounds every call with
//! a timeout. The router never stores credentials; each call borrows one.

use crate::completion::{ModelReply, Prompt};
use crate::credential::{ProviderCredential, ProviderKind};
use crate::error::{Error, ProviderError, Result};
use crate::transport::{AnthropicTransport, OpenAiCompatibleTransport, ProviderTransport};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Router settings
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Upper bound for a single provider call
    pub request_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RouterConfig {
    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Routes prompts to provider transports
pub struct ProviderRouter {
    transports: HashMap<ProviderKind, Arc<dyn ProviderTransport>>,
    config: RouterConfig,
}

impl ProviderRouter {
    /// Create a router with HTTP transports for every networked provider
    pub fn new(config: RouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Client(e.to_string()))?;

        let openai: Arc<dyn ProviderTransport> =
            Arc::new(OpenAiCompatibleTransport::new(client.clone()));
        let mut router = Self::empty(config).with_transport(
            ProviderKind::Anthropic,
            Arc::new(AnthropicTransport::new(client)),
        );
        for kind in [
            ProviderKind::OpenAi,
            ProviderKind::OpenRouter,
            ProviderKind::Groq,
            ProviderKind::Ollama,
        ] {
            router.register(kind, Arc::clone(&openai));
        }

        Ok(router)
    }

    /// Create a router with no transports
    #[must_use]
    pub fn empty(config: RouterConfig) -> Self {
        Self {
            transports: HashMap::new(),
            config,
        }
    }

    /// Register a transport for a provider, replacing any existing one
    pub fn register(&mut self, kind: ProviderKind, transport: Arc<dyn ProviderTransport>) {
        info!(provider = %kind, transport = transport.name(), "Registered provider transport");
        self.transports.insert(kind, transport);
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with_transport(
        mut self,
        kind: ProviderKind,
        transport: Arc<dyn ProviderTransport>,
    ) -> Self {
        self.register(kind, transport);
        self
    }

    /// Whether a transport is registered for `kind`
    #[must_use]
    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.transports.contains_key(&kind)
    }

    /// Configured request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.config.request_timeout
    }

    /// Complete a prompt with the provider named by `credential`
    #[instrument(skip(self, prompt, credential), fields(provider = %credential.provider, model = %credential.model))]
    pub async fn complete(
        &self,
        prompt: &Prompt,
        credential: &ProviderCredential,
    ) -> std::result::Result<ModelReply, ProviderError> {
        let provider = credential.provider.as_str();

        if credential.provider.requires_api_key() && credential.api_key().is_none() {
            warn!(provider = %provider, "No API key configured");
            return Err(ProviderError::Unauthorized {
                provider: provider.to_string(),
                detail: "no API key configured".to_string(),
            });
        }

        let Some(transport) = self.transports.get(&credential.provider) else {
            return Err(ProviderError::NotFound {
                provider: provider.to_string(),
                detail: "no transport registered".to_string(),
            });
        };

        let start = Instant::now();
        let timeout = self.config.request_timeout;
        let result = match tokio::time::timeout(timeout, transport.send(prompt, credential)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::transient(
                provider,
                format!("timeout after {}ms", timeout.as_millis()),
            )),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(reply) => debug!(
                duration_ms,
                tool_calls = reply.tool_calls.len(),
                "Provider call completed"
            ),
            Err(e) => warn!(duration_ms, kind = %e.kind(), "Provider call failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests;
