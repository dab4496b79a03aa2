//! Error types for mailpilot-core
//!
//! This module provides the turn-level error taxonomy and user-friendly
//! formatting. Every variant can be rendered for the chat UI without leaking
//! transport text.

use mailpilot_llm::ProviderError;
use thiserror::Error;
use uuid::Uuid;

/// Core error type
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A turn is already in flight for this session
    #[error("a conversation turn is already in progress")]
    Busy,

    /// The provider (and its fallback, if any) failed
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model named a tool that could not be understood
    #[error("planning anomaly: {0}")]
    PlanningAnomaly(String),

    /// The host failed to run a tool
    #[error("tool {tool} failed: {message}")]
    ToolExecution {
        /// Tool name
        tool: String,
        /// Host-reported reason
        message: String,
    },

    /// The model kept asking for tools past the configured cap
    #[error("too many tool iterations (limit {limit})")]
    TooManyIterations {
        /// Configured cap
        limit: usize,
    },

    /// The conversation was cleared while the turn was running
    #[error("turn cancelled")]
    Cancelled,

    /// Approval lookup or edit failed
    #[error("approval error: {0}")]
    Approval(#[from] ApprovalError),

    /// Internal error (panicked collaborator, dropped channel)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Approval gate errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// No approval with this id was ever created
    #[error("approval not found: {0}")]
    NotFound(Uuid),

    /// Edited parameters do not fit the tool
    #[error("invalid edit for {tool}: {reason}")]
    InvalidEdit {
        /// Tool name
        tool: String,
        /// What was wrong
        reason: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for fixing.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Busy => "⏳ I'm still working on your previous request.".to_string(),
            Error::Provider(e) => e.user_message(),
            Error::PlanningAnomaly(_) => {
                "📋 I couldn't understand the action the model proposed.".to_string()
            }
            Error::ToolExecution { tool, message } => {
                format!("🔧 The {} action failed: {}", tool, message)
            }
            Error::TooManyIterations { limit } => format!(
                "🔁 I stopped after {} tool steps without reaching an answer.",
                limit
            ),
            Error::Cancelled => "🧹 The conversation was cleared.".to_string(),
            Error::Approval(e) => format!("✋ {}", e),
            Error::Internal(_) => "❌ Something went wrong on my side.".to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Busy => Some(
                "💡 Wait for the current answer, or respond to the pending approval.".to_string(),
            ),
            Error::Provider(e) => e.suggestion(),
            Error::TooManyIterations { .. } => {
                Some("💡 Try breaking down your request into smaller steps.".to_string())
            }
            Error::Approval(ApprovalError::InvalidEdit { .. }) => {
                Some("💡 Check the edited fields and approve again.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = String::new();

    output.push_str(&error.user_message());
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

/// Format an error for display in a chat message
pub fn format_error_for_chat(error: &Error) -> String {
    let mut output = error.user_message();

    if let Some(suggestion) = error.suggestion() {
        output.push_str("\n\n");
        output.push_str(&suggestion);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_chat_message() {
        let error = Error::from(ProviderError::from_status(429, "openai", "Too Many Requests", None));

        let msg = format_error_for_chat(&error);
        assert!(msg.contains("rate limiting"));
        assert!(!msg.contains("429"));
        assert!(msg.contains("different model"));
    }

    #[test]
    fn test_invalid_key_differs_from_rate_limit() {
        let unauthorized = Error::from(ProviderError::from_status(401, "anthropic", "", None));
        let limited = Error::from(ProviderError::from_status(429, "anthropic", "", None));
        assert_ne!(unauthorized.user_message(), limited.user_message());
        assert!(unauthorized.user_message().contains("API key"));
    }

    #[test]
    fn test_too_many_iterations_message() {
        let error = Error::TooManyIterations { limit: 5 };
        assert!(error.user_message().contains("5 tool steps"));
        assert!(error.suggestion().unwrap().contains("smaller steps"));
    }

    #[test]
    fn test_cli_format_includes_suggestion() {
        let output = format_error_for_cli(&Error::Busy);
        assert!(output.contains("previous request"));
        assert!(output.contains("pending approval"));
    }

    #[test]
    fn test_internal_detail_not_shown() {
        let error = Error::Internal("oneshot dropped".to_string());
        assert!(!error.user_message().contains("oneshot"));
    }
}
