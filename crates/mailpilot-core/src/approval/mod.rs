//! Approval - Human sign-off for sensitive tool invocations
//!
//! Sensitive invocations wait in a FIFO queue until a person approves,
//! edits-and-approves, or rejects them. Waiters are woken through a oneshot
//! channel; there is no timeout on the human side.

use std::sync::Arc;

pub mod gate;
pub mod types;

pub use gate::ApprovalGate;
pub use types::{ApprovalDecision, ApprovalOutcome, ApprovalStatus, PendingApproval};

/// Shared approval gate type
pub type SharedApprovalGate = Arc<ApprovalGate>;

#[cfg(test)]
mod tests;
