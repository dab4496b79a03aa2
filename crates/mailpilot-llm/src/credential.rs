//! Provider credentials
//!
//! A [`ProviderCredential`] says which backend to call, with which key and
//! model. It is owned by configuration and only ever borrowed by the router for
//! the duration of one call.

use crate::util::mask_api_key;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported provider backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI chat completions
    OpenAi,
    /// OpenRouter gateway (OpenAI-compatible)
    OpenRouter,
    /// Groq (OpenAI-compatible)
    Groq,
    /// Local Ollama server (OpenAI-compatible, no key)
    Ollama,
    /// In-process scripted transport
    Mock,
}

impl ProviderKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }

    /// Default API base URL
    #[must_use]
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Ollama => "http://localhost:11434/v1",
            Self::Mock => "mock://local",
        }
    }

    /// Default model when configuration names none
    #[must_use]
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-5-20250929",
            Self::OpenAi => "gpt-4o-mini",
            Self::OpenRouter => "openai/gpt-4o-mini",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::Ollama => "llama3.2",
            Self::Mock => "mock-model",
        }
    }

    /// Whether calls without an API key are pointless
    #[must_use]
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama | Self::Mock)
    }

    /// Whether the backend speaks the OpenAI chat completions dialect
    #[must_use]
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            Self::OpenAi | Self::OpenRouter | Self::Groq | Self::Ollama
        )
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Per-credential endpoint tweaks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOverrides {
    /// Replaces the provider's default base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Extra headers sent with every request (e.g. OpenRouter attribution)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// Which backend, key and model to use for a request
#[derive(Clone)]
pub struct ProviderCredential {
    /// Backend
    pub provider: ProviderKind,
    /// API key, absent for local providers
    pub api_key: Option<SecretString>,
    /// Model identifier
    pub model: String,
    /// Endpoint overrides
    pub endpoint: EndpointOverrides,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("provider", &self.provider)
            .field(
                "api_key",
                &self
                    .api_key
                    .as_ref()
                    .map(|k| mask_api_key(k.expose_secret())),
            )
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ProviderCredential {
    /// Credential for `provider` using its default model and no key
    #[must_use]
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            api_key: None,
            model: provider.default_model().to_string(),
            endpoint: EndpointOverrides::default(),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint.base_url = Some(base_url.into());
        self
    }

    /// Add an extra header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.endpoint.headers.insert(name.into(), value.into());
        self
    }

    /// Base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.endpoint
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// The key, if one is set and non-blank
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .filter(|k| !k.trim().is_empty())
    }

    /// Short label for logs, e.g. `anthropic/claude-sonnet-4-5`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_key() {
        let credential =
            ProviderCredential::new(ProviderKind::OpenAi).with_api_key("sk-1234567890abcdefghij");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("sk-1...ghij"));
        assert!(!debug.contains("567890"));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let credential = ProviderCredential::new(ProviderKind::Anthropic).with_api_key("   ");
        assert!(credential.api_key().is_none());
    }

    #[test]
    fn test_base_url_override() {
        let credential = ProviderCredential::new(ProviderKind::Ollama);
        assert_eq!(credential.base_url(), "http://localhost:11434/v1");

        let credential = credential.with_base_url("http://gpu-box:11434/v1/");
        assert_eq!(credential.base_url(), "http://gpu-box:11434/v1");
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Claude".parse::<ProviderKind>(), Ok(ProviderKind::Anthropic));
        assert_eq!("openrouter".parse::<ProviderKind>(), Ok(ProviderKind::OpenRouter));
        assert!("bard".parse::<ProviderKind>().is_err());
        assert!(!ProviderKind::Ollama.requires_api_key());
        assert!(ProviderKind::Groq.is_openai_compatible());
    }
}
