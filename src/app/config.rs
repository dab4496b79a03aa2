//! Application configuration types
//!
//! Contains the configuration structures for the Mailpilot binary.

use mailpilot_core::OrchestratorConfig;
use mailpilot_llm::util::mask_api_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorAppConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Copy safe to print: every key masked
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.llm.api_key = copy.llm.api_key.as_deref().map(mask_api_key);
        if let Some(fallback) = copy.llm.fallback.as_mut() {
            fallback.api_key = fallback.api_key.as_deref().map(mask_api_key);
        }
        copy
    }
}

/// Where the provider key comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// Shared key from the environment
    #[default]
    Hosted,
    /// The operator's own key from `llm.api_key`
    Byok,
}

/// LLM configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub mode: CredentialMode,
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_hosted_key_env")]
    pub hosted_api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub fallback: Option<FallbackConfig>,
}

fn default_hosted_key_env() -> String {
    "MAILPILOT_HOSTED_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("mode", &self.mode)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("hosted_api_key_env", &self.hosted_api_key_env)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Second provider tried once when the primary fails
#[derive(Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key, used when `api_key` is unset
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl fmt::Debug for FallbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("api_key_env", &self.api_key_env)
            .finish()
    }
}

/// Orchestrator configuration (exposed to TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorAppConfig {
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_max_tool_iterations() -> usize {
    5
}

fn default_history_window() -> usize {
    20
}

impl Default for OrchestratorAppConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            history_window: default_history_window(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl OrchestratorAppConfig {
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::new()
            .with_max_tool_iterations(self.max_tool_iterations)
            .with_history_window(self.history_window);
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        config
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "mailpilot=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
