//! Agent abstraction: the black box that plans the next action.
//!
//! The [`Agent`] trait decouples the mission loop from whatever reasoning
//! backend is plugged in. The runner only relies on the contract
//! `(goal, history, contract) -> (message, tool_calls)`; everything the agent
//! knows must arrive through [`AgentInput`].

use std::collections::VecDeque;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::context::SelectedContext;
use crate::core::contract::MissionContract;
use crate::core::types::{AgentReply, Observation};

/// Everything the agent sees for one turn.
#[derive(Debug, Clone, Copy)]
pub struct AgentInput<'a> {
    pub goal: &'a str,
    pub observations: &'a [Observation],
    pub contract: &'a MissionContract,
    pub context: Option<&'a SelectedContext>,
}

pub trait Agent: Send + Sync {
    fn call(&self, input: AgentInput<'_>) -> impl Future<Output = Result<AgentReply>> + Send;
}

/// Replays a fixed sequence of replies, then declares the mission complete.
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<AgentReply>>,
    seen: Mutex<Vec<SeenTurn>>,
}

/// What the agent was shown on one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenTurn {
    pub history_len: usize,
    pub context: Option<SelectedContext>,
}

pub const SCRIPT_EXHAUSTED_MESSAGE: &str = "Mission completed.";

impl ScriptedAgent {
    pub fn new(replies: Vec<AgentReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Load replies from a JSON array of `{ "message", "tool_calls" }` objects.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read agent script {}", path.display()))?;
        let replies: Vec<AgentReply> = serde_json::from_str(&contents)
            .with_context(|| format!("parse agent script {}", path.display()))?;
        debug!(replies = replies.len(), "agent script loaded");
        Ok(Self::new(replies))
    }

    /// Number of turns taken so far.
    pub fn turns(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Observation-history length the agent was shown on each turn.
    pub fn history_lengths(&self) -> Vec<usize> {
        self.seen_turns().iter().map(|turn| turn.history_len).collect()
    }

    pub fn seen_turns(&self) -> Vec<SeenTurn> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Agent for ScriptedAgent {
    async fn call(&self, input: AgentInput<'_>) -> Result<AgentReply> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SeenTurn {
                history_len: input.observations.len(),
                context: input.context.cloned(),
            });
        let next = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        Ok(next.unwrap_or_else(|| AgentReply::done(SCRIPT_EXHAUSTED_MESSAGE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contract::{AutonomyLevel, build_contract};
    use crate::core::types::ToolCall;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn replays_then_completes() {
        let contract = build_contract("actor", "goal", AutonomyLevel::Auto1, Utc::now());
        let agent = ScriptedAgent::new(vec![AgentReply::with_calls(
            "searching",
            vec![ToolCall::new("research.search", json!({ "query": "goal" }))],
        )]);
        let input = AgentInput {
            goal: "goal",
            observations: &[],
            contract: &contract,
            context: None,
        };

        let first = agent.call(input).await.expect("first");
        assert_eq!(first.tool_calls.len(), 1);
        let second = agent.call(input).await.expect("second");
        assert_eq!(second, AgentReply::done(SCRIPT_EXHAUSTED_MESSAGE));
        assert_eq!(agent.turns(), 2);
    }

    #[test]
    fn loads_script_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("agent.json");
        fs::write(
            &path,
            r#"[{"message": "read it", "tool_calls": [{"name": "fs.read", "args": {"path": "README.md"}}]},
                {"text": "done"}]"#,
        )
        .expect("write");
        let agent = ScriptedAgent::from_file(&path).expect("load");
        assert_eq!(agent.remaining(), 2);
    }
}
