//! Test doubles for the mission core: clocks, approval gates, agents and tools.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::core::contract::AutonomyLevel;
use crate::core::types::{AgentReply, ApprovalDecision, ToolCall, ToolResult};
use crate::io::agent::{Agent, AgentInput};
use crate::io::approval::ApprovalGate;
use crate::io::clock::Clock;
use crate::io::tools::{ToolContext, ToolRegistry, ToolSpec};

pub use crate::io::agent::ScriptedAgent;

/// A fixed instant so contract ids and expiry are deterministic.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Tool context rooted at `root`, for a tier-3 actor named `actor`.
pub fn tool_ctx(root: &Path) -> ToolContext {
    ToolContext {
        actor_id: "actor".to_string(),
        mode: AutonomyLevel::Auto3,
        mission_id: None,
        fs_root: root.to_path_buf(),
    }
}

/// Hand-driven clock. Optionally moves forward by `tick` on every read.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    tick: chrono::Duration,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::ticking(now, chrono::Duration::zero())
    }

    pub fn ticking(now: DateTime<Utc>, tick: chrono::Duration) -> Self {
        Self {
            now: Mutex::new(now),
            tick,
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        let current = *now;
        *now += self.tick;
        current
    }
}

/// Answers approval requests from a queue, denying once it runs dry.
/// Records the tool name of every request.
#[derive(Debug, Default)]
pub struct ScriptedApproval {
    decisions: Mutex<VecDeque<ApprovalDecision>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedApproval {
    pub fn new(decisions: Vec<ApprovalDecision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ApprovalGate for ScriptedApproval {
    async fn request(&self, tool: &str, _call: &ToolCall) -> ApprovalDecision {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tool.to_string());
        self.decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(ApprovalDecision::Denied)
    }
}

/// An agent whose backend is always down.
#[derive(Debug)]
pub struct FailingAgent {
    message: String,
}

impl FailingAgent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Agent for FailingAgent {
    async fn call(&self, _input: AgentInput<'_>) -> Result<AgentReply> {
        Err(anyhow!("{}", self.message).context("call agent backend"))
    }
}

/// Shared, ordered record of which tools were dispatched.
#[derive(Debug, Clone, Default)]
pub struct DispatchLog(Arc<Mutex<Vec<String>>>);

impl DispatchLog {
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, name: &str) {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name.to_string());
    }
}

/// A tool that records its own name in `log` and succeeds with its args.
pub fn recording_tool(name: &str, log: &DispatchLog) -> ToolSpec {
    let log = log.clone();
    let tool = name.to_string();
    ToolSpec::new(name, Duration::from_secs(1), move |args, _| {
        log.push(&tool);
        async move { ToolResult::success(json!({ "args": args })) }
    })
}

/// Registry of recording tools, one per name, sharing one log.
pub fn recording_registry(names: &[&str]) -> (ToolRegistry, DispatchLog) {
    let log = DispatchLog::default();
    let registry = names
        .iter()
        .fold(ToolRegistry::new(), |registry, name| {
            registry.with(recording_tool(name, &log))
        });
    (registry, log)
}
