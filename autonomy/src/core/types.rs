//! Shared deterministic types for the mission core.
//!
//! These types define stable contracts between the runner, the dispatcher, and
//! the agent black box. They carry no I/O and serialize to stable JSON so they
//! can be fed back to the agent as observation history.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Outcome of one dispatched tool call.
///
/// Tool failures are data, never errors: every path out of the dispatcher
/// produces one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn failure_with_data(error: impl Into<String>, data: Value) -> Self {
        Self {
            ok: false,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}

/// External human-in-the-loop decision for a gated tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalDecision {
    Approved,
    Denied,
    Expired,
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(label)
    }
}

/// Append-only record of one processed tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Observation {
    /// The contract does not allow this tool.
    ToolBlocked { name: String, reason: String },
    /// Approval was required and not granted. `decision` keeps `DENIED` and
    /// `EXPIRED` apart for audit even though the runner treats them alike.
    ToolDenied {
        name: String,
        decision: ApprovalDecision,
        reason: String,
    },
    /// The tool was dispatched; `result` may still be a failure.
    ToolResult { name: String, result: ToolResult },
}

impl Observation {
    pub fn tool_name(&self) -> &str {
        match self {
            Self::ToolBlocked { name, .. }
            | Self::ToolDenied { name, .. }
            | Self::ToolResult { name, .. } => name,
        }
    }
}

/// Agent black-box response for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(alias = "text")]
    pub message: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl AgentReply {
    /// A reply that declares the mission complete.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_calls(message: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            message: message.into(),
            tool_calls,
        }
    }
}

/// Why a mission ended before the agent declared it complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxSteps,
    MaxToolCalls,
    MaxTime,
    /// The agent adapter itself failed; carries the error chain.
    AgentFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxSteps => f.write_str("Max steps reached"),
            Self::MaxToolCalls => f.write_str("Max tool calls reached"),
            Self::MaxTime => f.write_str("Max time reached"),
            Self::AgentFailed(err) => write!(f, "Agent failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn observation_serializes_with_type_tag() {
        let obs = Observation::ToolDenied {
            name: "fs.write".to_string(),
            decision: ApprovalDecision::Expired,
            reason: "Approval EXPIRED".to_string(),
        };
        let value = serde_json::to_value(&obs).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "tool_denied",
                "name": "fs.write",
                "decision": "EXPIRED",
                "reason": "Approval EXPIRED",
            })
        );
    }

    #[test]
    fn agent_reply_accepts_text_alias_and_missing_calls() {
        let reply: AgentReply =
            serde_json::from_value(json!({ "text": "all done" })).expect("parse reply");
        assert_eq!(reply, AgentReply::done("all done"));
    }

    #[test]
    fn tool_result_omits_empty_fields() {
        let value = serde_json::to_value(ToolResult::failure("Tool timeout")).expect("serialize");
        assert_eq!(value, json!({ "ok": false, "error": "Tool timeout" }));
    }
}
