//! LLM provider resolution
//!
//! Turns the `[llm]` section into provider credentials and a router.

use super::config::{CredentialMode, FallbackConfig, LlmConfig};
use anyhow::{anyhow, Context, Result};
use mailpilot_core::ProviderSelection;
use mailpilot_llm::{ProviderCredential, ProviderKind, ProviderRouter, RouterConfig, ScriptedTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the router with every networked transport plus the offline mock
pub fn build_router(llm: &LlmConfig) -> Result<Arc<ProviderRouter>> {
    let config = RouterConfig::default().with_timeout(Duration::from_secs(llm.request_timeout_secs));
    let router = ProviderRouter::new(config)
        .context("Failed to create HTTP client")?
        .with_transport(ProviderKind::Mock, Arc::new(ScriptedTransport::new()));
    Ok(Arc::new(router))
}

/// Resolve primary and fallback credentials from the process environment
pub fn resolve_selection(llm: &LlmConfig) -> Result<ProviderSelection> {
    resolve_selection_with(llm, |name| std::env::var(name).ok())
}

/// Resolve credentials, reading environment variables through `env`
pub fn resolve_selection_with<F>(llm: &LlmConfig, env: F) -> Result<ProviderSelection>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = parse_kind(&llm.provider)?;
    let key = match llm.mode {
        CredentialMode::Hosted => env(&llm.hosted_api_key_env),
        CredentialMode::Byok => llm.api_key.clone(),
    };
    let primary = credential(kind, llm.model.as_deref(), llm.base_url.as_deref(), key);
    info!(provider = %primary.label(), mode = ?llm.mode, "Resolved primary provider");

    let mut selection = ProviderSelection::new(primary);
    if let Some(fallback) = &llm.fallback {
        let credential = resolve_fallback(fallback, &env)?;
        info!(provider = %credential.label(), "Resolved fallback provider");
        selection = selection.with_fallback(credential);
    }
    Ok(selection)
}

fn resolve_fallback<F>(fallback: &FallbackConfig, env: &F) -> Result<ProviderCredential>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = parse_kind(&fallback.provider)?;
    let key = fallback
        .api_key
        .clone()
        .or_else(|| fallback.api_key_env.as_deref().and_then(env));
    Ok(credential(
        kind,
        fallback.model.as_deref(),
        fallback.base_url.as_deref(),
        key,
    ))
}

fn parse_kind(name: &str) -> Result<ProviderKind> {
    name.parse::<ProviderKind>()
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("Invalid llm provider '{}'", name))
}

fn credential(
    kind: ProviderKind,
    model: Option<&str>,
    base_url: Option<&str>,
    key: Option<String>,
) -> ProviderCredential {
    let mut credential = ProviderCredential::new(kind);
    if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
        credential = credential.with_model(model);
    }
    if let Some(base_url) = base_url.filter(|u| !u.trim().is_empty()) {
        credential = credential.with_base_url(base_url);
    }
    match key.filter(|k| !k.trim().is_empty()) {
        Some(key) => credential = credential.with_api_key(key),
        None if kind.requires_api_key() => {
            warn!(provider = %kind, "No API key available; requests will be refused")
        }
        None => {}
    }
    credential
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(mode: CredentialMode, provider: &str) -> LlmConfig {
        LlmConfig {
            mode,
            provider: provider.to_string(),
            model: None,
            base_url: None,
            api_key: Some("byok-key-0123456789".to_string()),
            hosted_api_key_env: "HOSTED_KEY".to_string(),
            request_timeout_secs: 60,
            fallback: None,
        }
    }

    #[test]
    fn test_hosted_mode_reads_environment() {
        let selection = resolve_selection_with(&llm(CredentialMode::Hosted, "anthropic"), |name| {
            (name == "HOSTED_KEY").then(|| "hosted-key-0123456789".to_string())
        })
        .unwrap();
        assert_eq!(selection.primary.api_key(), Some("hosted-key-0123456789"));
        assert_eq!(selection.primary.model, ProviderKind::Anthropic.default_model());
    }

    #[test]
    fn test_byok_mode_uses_configured_key() {
        let mut config = llm(CredentialMode::Byok, "openai");
        config.model = Some("gpt-4o-mini".to_string());
        let selection = resolve_selection_with(&config, |_| None).unwrap();
        assert_eq!(selection.primary.api_key(), Some("byok-key-0123456789"));
        assert_eq!(selection.primary.model, "gpt-4o-mini");
    }

    #[test]
    fn test_missing_hosted_key_leaves_credential_empty() {
        let selection =
            resolve_selection_with(&llm(CredentialMode::Hosted, "groq"), |_| None).unwrap();
        assert!(selection.primary.api_key().is_none());
    }

    #[test]
    fn test_fallback_key_from_named_variable() {
        let mut config = llm(CredentialMode::Byok, "anthropic");
        config.fallback = Some(FallbackConfig {
            provider: "openrouter".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            api_key_env: Some("OPENROUTER_API_KEY".to_string()),
        });
        let selection = resolve_selection_with(&config, |name| {
            (name == "OPENROUTER_API_KEY").then(|| "or-key-0123456789".to_string())
        })
        .unwrap();

        let fallback = selection.fallback.unwrap();
        assert_eq!(fallback.provider, ProviderKind::OpenRouter);
        assert_eq!(fallback.api_key(), Some("or-key-0123456789"));
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let err = resolve_selection_with(&llm(CredentialMode::Byok, "skynet"), |_| None).unwrap_err();
        assert!(err.to_string().contains("skynet"));
    }
}
