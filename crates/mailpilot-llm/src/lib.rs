//! Mailpilot LLM - Provider routing
//!
//! This crate reaches language models for the Mailpilot assistant:
//! - Router: picks a transport from a `ProviderCredential` and bounds each call
//! - Transports: Anthropic Messages API and OpenAI-compatible chat completions
//!   (OpenAI, OpenRouter, Groq, Ollama), plus a scripted transport for tests
//! - Errors: a provider-agnostic taxonomy classified by HTTP status

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod credential;
pub mod error;
pub mod message;
pub mod router;
pub mod transport;
pub mod util;

pub use completion::{ModelReply, Prompt, ToolCall, ToolDefinition};
pub use credential::{EndpointOverrides, ProviderCredential, ProviderKind};
pub use error::{Error, ProviderError, ProviderErrorKind, Result};
pub use message::{Message, MessageRole};
pub use router::{ProviderRouter, RouterConfig};
pub use transport::{
    AnthropicTransport, OpenAiCompatibleTransport, ProviderTransport, ScriptedTransport,
};
