//! Orchestrator - the conversation state machine
//!
//! Accepts one user message at a time, asks the provider for the next step,
//! runs safe tools directly and parks sensitive ones in the approval gate
//! until a human decides.
//!
//! # Module Structure
//!
//! - `types`: Result types (FinalAnswer, ToolCallRecord, TurnHandle)
//! - `config`: Configuration types (OrchestratorConfig, ProviderSelection)
//! - `core`: ConversationOrchestrator struct and builder methods
//! - `process`: Turn admission, the planning loop, approvals and reset
//! - `prompt`: Prompt construction
//! - `tool_execution`: Tool execution and approval waits

mod config;
mod core;
mod process;
mod prompt;
mod tool_execution;
mod types;


pub use config::{OrchestratorConfig, ProviderSelection};
pub use core::ConversationOrchestrator;
pub use types::{FinalAnswer, ToolCallRecord, ToolCallStatus, TurnHandle};
