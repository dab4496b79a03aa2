//! Mailpilot Core - Approval-gated orchestration
//!
//! This crate provides the conversation core of the Mailpilot assistant,
//! including:
//! - Orchestrator: one turn at a time, planner-to-tool loop, provider fallback
//! - Planner: detecting tool calls in model replies
//! - Tools: the typed tool catalogue and its sensitivity table
//! - Approval: the queue of sensitive actions awaiting sign-off
//! - Broadcaster: state and event fan-out to observers
//! - Host: the traits the mail client implements

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod approval;
pub mod broadcaster;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod planner;
pub mod state;
pub mod tools;

pub use approval::{
    ApprovalDecision, ApprovalGate, ApprovalOutcome, ApprovalStatus, PendingApproval,
    SharedApprovalGate,
};
pub use broadcaster::{Notification, ObserverResult, SessionEvent, StateBroadcaster, Subscription};
pub use error::{
    format_error_for_chat, format_error_for_cli, ApprovalError, Error, Result, UserFriendlyError,
};
pub use host::{
    ContextProvider, EmailSnapshot, EventSnapshot, MailboxContext, NoContext, TaskSnapshot,
    ToolExecutor, ToolFailure,
};
pub use orchestrator::{
    ConversationOrchestrator, FinalAnswer, OrchestratorConfig, ProviderSelection, ToolCallRecord,
    ToolCallStatus, TurnHandle,
};
pub use planner::{PlanningAnomaly, ToolCallPlanner};
pub use state::{AgentState, ConversationHistory, ConversationTurn, TurnRole};
pub use tools::{Sensitivity, ToolInvocation, ToolKind};
