//! Error types for mailpilot-llm
//!
//! Every transport failure is folded into [`ProviderError`], whose variants form
//! a provider-agnostic taxonomy keyed on HTTP status rather than on whatever
//! text a vendor chose to put in its error body.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Credential missing or rejected (401)
    Unauthorized,
    /// Credential valid but not allowed to use the resource (403)
    Forbidden,
    /// Too many requests (429)
    RateLimited,
    /// Model or endpoint does not exist (404)
    NotFound,
    /// Anything else: 5xx, network failures, timeouts, malformed bodies
    Transient,
}

impl ProviderErrorKind {
    /// Classify an HTTP status code.
    ///
    /// Only the status is consulted, never the response text.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            _ => Self::Transient,
        }
    }

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Transient => "transient",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified provider failure
///
/// `detail` is always sanitized before construction, so it is safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Credential missing or rejected
    #[error("{provider}: unauthorized: {detail}")]
    Unauthorized {
        /// Provider name
        provider: String,
        /// Sanitized detail
        detail: String,
    },

    /// Credential not permitted for this resource
    #[error("{provider}: forbidden: {detail}")]
    Forbidden {
        /// Provider name
        provider: String,
        /// Sanitized detail
        detail: String,
    },

    /// Provider is throttling requests
    #[error("{provider}: rate limited")]
    RateLimited {
        /// Provider name
        provider: String,
        /// Seconds until retry is allowed, when the provider said so
        retry_after: Option<u64>,
    },

    /// Model or endpoint not found
    #[error("{provider}: not found: {detail}")]
    NotFound {
        /// Provider name
        provider: String,
        /// Sanitized detail
        detail: String,
    },

    /// Server-side, network, timeout or decoding failure
    #[error("{provider}: transient failure: {detail}")]
    Transient {
        /// Provider name
        provider: String,
        /// Sanitized detail
        detail: String,
    },
}

impl ProviderError {
    /// Build an error from an HTTP status.
    #[must_use]
    pub fn from_status(
        status: u16,
        provider: impl Into<String>,
        detail: impl Into<String>,
        retry_after: Option<u64>,
    ) -> Self {
        let provider = provider.into();
        let detail = detail.into();
        match ProviderErrorKind::from_status(status) {
            ProviderErrorKind::Unauthorized => Self::Unauthorized { provider, detail },
            ProviderErrorKind::Forbidden => Self::Forbidden { provider, detail },
            ProviderErrorKind::RateLimited => Self::RateLimited {
                provider,
                retry_after,
            },
            ProviderErrorKind::NotFound => Self::NotFound { provider, detail },
            ProviderErrorKind::Transient => Self::Transient {
                provider,
                detail: format!("HTTP {}: {}", status, detail),
            },
        }
    }

    /// Shorthand for a transient failure
    #[must_use]
    pub fn transient(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Transient {
            provider: provider.into(),
            detail: detail.into(),
        }
    }

    /// The taxonomy bucket this error falls in
    #[must_use]
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Unauthorized { .. } => ProviderErrorKind::Unauthorized,
            Self::Forbidden { .. } => ProviderErrorKind::Forbidden,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimited,
            Self::NotFound { .. } => ProviderErrorKind::NotFound,
            Self::Transient { .. } => ProviderErrorKind::Transient,
        }
    }

    /// Provider that produced the error
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Unauthorized { provider, .. }
            | Self::Forbidden { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::NotFound { provider, .. }
            | Self::Transient { provider, .. } => provider,
        }
    }

    /// Human-readable guidance, never the raw status or vendor text
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { provider, .. } => format!(
                "🔑 The {} API key is missing or was rejected.",
                provider
            ),
            Self::Forbidden { provider, .. } => format!(
                "🚫 Your {} key is not allowed to use this model.",
                provider
            ),
            Self::RateLimited {
                provider,
                retry_after: Some(secs),
            } => format!(
                "⏳ {} is rate limiting requests right now. Please wait {} seconds and try again.",
                provider, secs
            ),
            Self::RateLimited { provider, .. } => format!(
                "⏳ {} is rate limiting requests right now. Please wait a moment and try again.",
                provider
            ),
            Self::NotFound { provider, .. } => format!(
                "🔍 The selected {} model or endpoint could not be found.",
                provider
            ),
            Self::Transient { provider, .. } => format!(
                "🌐 Could not reach {} just now. This is usually temporary.",
                provider
            ),
        }
    }

    /// What the user can do about it
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Unauthorized { .. } => {
                Some("💡 Check the API key in your settings or switch to the hosted key.".to_string())
            }
            Self::Forbidden { .. } => {
                Some("💡 Pick a model your plan includes, or use a different key.".to_string())
            }
            Self::RateLimited { .. } => {
                Some("💡 Try using a different model or wait before retrying.".to_string())
            }
            Self::NotFound { .. } => {
                Some("💡 Check the model name and base URL in your settings.".to_string())
            }
            Self::Transient { .. } => Some("💡 Try again in a few seconds.".to_string()),
        }
    }
}

/// Setup and configuration errors for the LLM layer
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client could not be constructed
    #[error("http client error: {0}")]
    Client(String),

    /// A provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ProviderErrorKind::from_status(401), ProviderErrorKind::Unauthorized);
        assert_eq!(ProviderErrorKind::from_status(403), ProviderErrorKind::Forbidden);
        assert_eq!(ProviderErrorKind::from_status(404), ProviderErrorKind::NotFound);
        assert_eq!(ProviderErrorKind::from_status(429), ProviderErrorKind::RateLimited);
        assert_eq!(ProviderErrorKind::from_status(500), ProviderErrorKind::Transient);
        assert_eq!(ProviderErrorKind::from_status(503), ProviderErrorKind::Transient);
        assert_eq!(ProviderErrorKind::from_status(400), ProviderErrorKind::Transient);
    }

    #[test]
    fn test_rate_limited_message_mentions_rate_limiting() {
        let error = ProviderError::from_status(429, "openai", "Too Many Requests", None);
        assert_eq!(error.kind(), ProviderErrorKind::RateLimited);

        let msg = error.user_message();
        assert!(msg.contains("rate limiting"));
        assert!(!msg.contains("429"));
    }

    #[test]
    fn test_rate_limited_message_includes_wait() {
        let error = ProviderError::RateLimited {
            provider: "anthropic".to_string(),
            retry_after: Some(30),
        };
        assert!(error.user_message().contains("30 seconds"));
    }

    #[test]
    fn test_unauthorized_message() {
        let error = ProviderError::from_status(401, "anthropic", "invalid x-api-key", None);
        assert_eq!(error.kind(), ProviderErrorKind::Unauthorized);
        assert!(error.user_message().contains("API key"));
        assert!(error.suggestion().unwrap().contains("settings"));
    }

    #[test]
    fn test_transient_keeps_status_in_detail_only() {
        let error = ProviderError::from_status(502, "groq", "Bad Gateway", None);
        assert_eq!(error.provider(), "groq");
        assert!(error.to_string().contains("502"));
        assert!(!error.user_message().contains("502"));
    }
}
