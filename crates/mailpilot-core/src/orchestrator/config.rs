//! Orchestrator configuration
//!
//! - `OrchestratorConfig` for loop limits and prompt settings
//! - `ProviderSelection` for the primary and fallback credentials

use mailpilot_llm::ProviderCredential;

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum planner-to-tool round trips per turn
    pub max_tool_iterations: usize,
    /// Most recent conversation turns forwarded to the provider
    pub history_window: usize,
    /// Token cap per provider call
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Replaces the built-in system prompt
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 5,
            history_window: 20,
            max_tokens: None,
            temperature: None,
            system_prompt: None,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tool round-trip cap
    #[must_use]
    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    /// Set the history window. The message being answered is always sent,
    /// even with a window of zero.
    #[must_use]
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Set the token cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Replace the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Which credentials a session talks to
#[derive(Debug, Clone)]
pub struct ProviderSelection {
    /// Tried first on every provider call
    pub primary: ProviderCredential,
    /// Tried once when the primary fails
    pub fallback: Option<ProviderCredential>,
}

impl ProviderSelection {
    /// Use a single provider
    #[must_use]
    pub fn new(primary: ProviderCredential) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Add a fallback provider
    #[must_use]
    pub fn with_fallback(mut self, fallback: ProviderCredential) -> Self {
        self.fallback = Some(fallback);
        self
    }
}
