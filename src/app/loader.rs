//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration relative to the working directory
pub fn load_config() -> Result<AppConfig> {
    load_config_from(Path::new("config"))
}

/// Load configuration with override files looked up in `dir`
pub fn load_config_from(dir: &Path) -> Result<AppConfig> {
    let env_name = std::env::var("MAILPILOT_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name(&path_str(&dir.join("default"))).required(false))
        .add_source(File::with_name(&path_str(&dir.join(&env_name))).required(false))
        .add_source(File::with_name(&path_str(&dir.join("local"))).required(false));

    // 3. Per-user settings
    if let Some(user_dir) = dirs::config_dir() {
        builder = builder
            .add_source(File::with_name(&path_str(&user_dir.join("mailpilot").join("config"))).required(false));
    }

    // 4. Environment variables (highest priority)
    // prefix_separator("_") makes MAILPILOT_LLM__PROVIDER work.
    let config = builder
        .add_source(
            Environment::with_prefix("MAILPILOT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::CredentialMode;

    #[test]
    fn test_embedded_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(dir.path()).unwrap();

        assert_eq!(config.llm.mode, CredentialMode::Hosted);
        assert_eq!(config.llm.hosted_api_key_env, "MAILPILOT_HOSTED_API_KEY");
        assert_eq!(config.orchestrator.max_tool_iterations, 5);
        assert_eq!(config.orchestrator.history_window, 20);
        assert!(config.llm.fallback.is_none());
    }

    #[test]
    fn test_local_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("local.toml"),
            r#"
[llm]
mode = "byok"
provider = "openrouter"
model = "anthropic/claude-sonnet-4.5"
api_key = "sk-or-test-0123456789"

[llm.fallback]
provider = "ollama"
model = "llama3.2"

[orchestrator]
history_window = 8
"#,
        )
        .unwrap();

        let config = load_config_from(dir.path()).unwrap();
        assert_eq!(config.llm.mode, CredentialMode::Byok);
        assert_eq!(config.llm.provider, "openrouter");
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert_eq!(config.orchestrator.history_window, 8);
        assert_eq!(config.orchestrator.max_tool_iterations, 5);
        assert_eq!(config.llm.fallback.as_ref().unwrap().provider, "ollama");

        let masked = config.masked();
        assert_eq!(masked.llm.api_key.as_deref(), Some("sk-o...6789"));
        assert!(!format!("{:?}", config.llm).contains("0123456789"));
    }
}
