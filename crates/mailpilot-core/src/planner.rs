//! Tool call planner
//!
//! Decides whether a model reply names a concrete action and turns it into a
//! typed [`ToolInvocation`]. Native tool calls are preferred; otherwise a
//! fenced ```` ```tool ```` block or a bare `{"tool": ..., "parameters": ...}`
//! object in the reply text is accepted.
//!
//! Planning never fails the turn. Anything that cannot be understood is logged
//! as an anomaly and the reply is treated as a plain answer.

use crate::tools::{InvalidParameters, ToolInvocation};
use mailpilot_llm::ModelReply;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

static TOOL_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(tool|json)[ \t]*\r?\n(.*?)```")
        .expect("TOOL_BLOCK_REGEX is a compile-time constant")
});

/// A tool reference the planner could not turn into an invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningAnomaly {
    /// The named tool is not in the catalogue
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// The tool is known but its parameters do not fit
    #[error("{0}")]
    InvalidParameters(String),

    /// A tool block whose JSON could not be read
    #[error("malformed tool block: {0}")]
    MalformedBlock(String),
}

impl From<InvalidParameters> for PlanningAnomaly {
    fn from(err: InvalidParameters) -> Self {
        Self::InvalidParameters(err.to_string())
    }
}

/// Stateless planner
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallPlanner;

impl ToolCallPlanner {
    /// Create a planner
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Plan a reply, logging and swallowing anomalies.
    ///
    /// Returns `None` when the reply is a plain answer or the tool reference
    /// could not be understood.
    #[must_use]
    pub fn plan(&self, reply: &ModelReply) -> Option<ToolInvocation> {
        match self.try_plan(reply) {
            Ok(invocation) => invocation,
            Err(anomaly) => {
                warn!(anomaly = %anomaly, "Planning anomaly, treating reply as plain text");
                None
            }
        }
    }

    /// Plan a reply, reporting anomalies to the caller
    pub fn try_plan(
        &self,
        reply: &ModelReply,
    ) -> std::result::Result<Option<ToolInvocation>, PlanningAnomaly> {
        let Some((name, arguments)) = Self::extract_call(reply)? else {
            return Ok(None);
        };

        let invocation = ToolInvocation::from_parts(&name, arguments)?;
        if let ToolInvocation::Unknown { name, .. } = &invocation {
            return Err(PlanningAnomaly::UnknownTool(name.clone()));
        }

        debug!(tool = %invocation.tool_name(), "Planned tool invocation");
        Ok(Some(invocation))
    }

    fn extract_call(
        reply: &ModelReply,
    ) -> std::result::Result<Option<(String, serde_json::Value)>, PlanningAnomaly> {
        if let Some(first) = reply.tool_calls.first() {
            if reply.tool_calls.len() > 1 {
                warn!(
                    planned = %first.name,
                    ignored = reply.tool_calls.len() - 1,
                    "Reply contained several tool calls, only the first is planned"
                );
            }
            let arguments = normalize_arguments(&first.name, first.arguments.clone())?;
            return Ok(Some((first.name.clone(), arguments)));
        }

        for captures in TOOL_BLOCK_REGEX.captures_iter(&reply.content) {
            let explicit = &captures[1] == "tool";
            let body = captures[2].trim();
            match serde_json::from_str::<serde_json::Value>(body) {
                Ok(value) => {
                    if let Some(call) = textual_call(&value)? {
                        return Ok(Some(call));
                    }
                    if explicit {
                        return Err(PlanningAnomaly::MalformedBlock(
                            "missing \"tool\" field".to_string(),
                        ));
                    }
                }
                Err(e) if explicit => return Err(PlanningAnomaly::MalformedBlock(e.to_string())),
                Err(_) => {}
            }
        }

        let trimmed = reply.content.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                return textual_call(&value);
            }
        }

        Ok(None)
    }
}

/// Read `{"tool": name, "parameters": {...}}`; `None` when there is no `tool` key
fn textual_call(
    value: &serde_json::Value,
) -> std::result::Result<Option<(String, serde_json::Value)>, PlanningAnomaly> {
    let Some(tool) = value.get("tool") else {
        return Ok(None);
    };
    let Some(name) = tool.as_str() else {
        return Err(PlanningAnomaly::MalformedBlock(
            "\"tool\" is not a string".to_string(),
        ));
    };
    let arguments = value
        .get("parameters")
        .or_else(|| value.get("arguments"))
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let arguments = normalize_arguments(name, arguments)?;
    Ok(Some((name.to_string(), arguments)))
}

/// Accept JSON objects, null, or strings holding a JSON object
fn normalize_arguments(
    name: &str,
    arguments: serde_json::Value,
) -> std::result::Result<serde_json::Value, PlanningAnomaly> {
    match arguments {
        serde_json::Value::Object(_) | serde_json::Value::Null => Ok(arguments),
        serde_json::Value::String(raw) if raw.trim().is_empty() => Ok(serde_json::Value::Null),
        serde_json::Value::String(raw) => match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value @ serde_json::Value::Object(_)) => Ok(value),
            _ => Err(PlanningAnomaly::InvalidParameters(format!(
                "arguments for {} are not a JSON object",
                name
            ))),
        },
        _ => Err(PlanningAnomaly::InvalidParameters(format!(
            "arguments for {} are not a JSON object",
            name
        ))),
    }
}
