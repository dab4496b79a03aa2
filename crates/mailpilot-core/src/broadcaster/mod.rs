//! State broadcaster - pushes session state and message events to observers
//!
//! Two ways to listen:
//! - callback subscribers, called synchronously in registration order, each
//!   isolated from the others' failures
//! - an async `tokio::broadcast` channel for consumers that prefer to poll

pub mod fanout;
pub mod types;

pub use fanout::{ObserverResult, StateBroadcaster, Subscription};
pub use types::{Notification, SessionEvent};
