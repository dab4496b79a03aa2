//! Tools - the actions the assistant can ask the host to perform
//!
//! - `catalog`: the static table of tools and their sensitivity
//! - `invocation`: typed parameter records, one variant per tool

mod catalog;
mod invocation;

pub use catalog::{tool_definitions, Sensitivity, ToolKind};
pub use invocation::{
    CreateEventParams, CreateTaskParams, DeleteItemParams, InvalidParameters, ItemKind,
    ReplyEmailParams, SearchCalendarParams, SearchEmailParams, SendEmailParams,
    SummarizeEmailParams, ToolInvocation,
};

#[cfg(test)]
mod tests;
