//! The mission runner: a bounded plan/act loop around the agent black box.
//!
//! Each turn checks the contract limits, asks the agent for the next action,
//! then processes the requested tool calls strictly in order, one at a time.
//! Every exit path yields a [`MissionOutcome`]; nothing here returns an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::context::SelectedContext;
use crate::core::contract::MissionContract;
use crate::core::limits::should_stop;
use crate::core::types::{ApprovalDecision, Observation, StopReason, ToolCall};
use crate::io::agent::{Agent, AgentInput};
use crate::io::approval::ApprovalGate;
use crate::io::clock::Clock;
use crate::io::tools::{ToolContext, ToolRegistry, dispatch};

pub const LIMITS_SUMMARY: &str = "Mission stopped by limits.";
pub const AGENT_FAILED_SUMMARY: &str = "Mission stopped: the agent failed.";
pub const BLOCKED_REASON: &str = "Not allowed by contract";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Completed,
    Stopped,
}

/// What a finished mission hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionOutcome {
    pub summary: String,
    pub observations: Vec<Observation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped: Option<StopReason>,
    pub steps: u32,
    pub tool_calls: u32,
}

impl MissionOutcome {
    pub fn status(&self) -> MissionStatus {
        if self.stopped.is_some() {
            MissionStatus::Stopped
        } else {
            MissionStatus::Completed
        }
    }
}

/// Mutable per-mission bookkeeping. Owned by a single `run` call.
#[derive(Debug)]
struct MissionState {
    started_at: DateTime<Utc>,
    steps: u32,
    tool_calls: u32,
    observations: Vec<Observation>,
}

impl MissionState {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            steps: 0,
            tool_calls: 0,
            observations: Vec::new(),
        }
    }

    fn finish(self, summary: String, stopped: Option<StopReason>) -> MissionOutcome {
        MissionOutcome {
            summary,
            observations: self.observations,
            stopped,
            steps: self.steps,
            tool_calls: self.tool_calls,
        }
    }
}

/// Borrowed collaborators for one or more missions.
pub struct MissionRunner<'a, A, G> {
    pub agent: &'a A,
    pub approvals: &'a G,
    pub tools: &'a ToolRegistry,
    pub clock: &'a dyn Clock,
}

impl<A: Agent, G: ApprovalGate> MissionRunner<'_, A, G> {
    /// Drive one mission to completion or to its first tripped limit.
    #[instrument(
        skip_all,
        fields(mission_id = %contract.mission_id, actor = %contract.actor_id, level = %contract.level)
    )]
    pub async fn run(
        &self,
        contract: &MissionContract,
        tool_ctx: &ToolContext,
        context: Option<&SelectedContext>,
    ) -> MissionOutcome {
        let mut state = MissionState::new(self.clock.now());
        info!(goal = %contract.goal, "mission started");

        loop {
            if let Some(reason) = self.limit_reached(contract, &state) {
                return stopped_by_limits(state, reason);
            }

            let input = AgentInput {
                goal: &contract.goal,
                observations: &state.observations,
                contract,
                context,
            };
            let reply = self.agent.call(input).await;
            state.steps += 1;
            let reply = match reply {
                Ok(reply) => reply,
                Err(err) => {
                    let err = format!("{err:#}");
                    warn!(%err, step = state.steps, "agent failed");
                    return state.finish(
                        AGENT_FAILED_SUMMARY.to_string(),
                        Some(StopReason::AgentFailed(err)),
                    );
                }
            };
            debug!(step = state.steps, calls = reply.tool_calls.len(), "agent replied");

            if reply.tool_calls.is_empty() {
                info!(steps = state.steps, tool_calls = state.tool_calls, "mission completed");
                return state.finish(reply.message, None);
            }

            for call in &reply.tool_calls {
                if !self.process_call(contract, tool_ctx, call, &mut state).await {
                    continue;
                }
                if let Some(reason) = self.limit_reached(contract, &state) {
                    return stopped_by_limits(state, reason);
                }
            }
        }
    }

    /// Handle one requested call. Returns whether it was dispatched.
    async fn process_call(
        &self,
        contract: &MissionContract,
        tool_ctx: &ToolContext,
        call: &ToolCall,
        state: &mut MissionState,
    ) -> bool {
        if !contract.allows(&call.name) {
            warn!(tool = %call.name, "tool blocked by contract");
            state.observations.push(Observation::ToolBlocked {
                name: call.name.clone(),
                reason: BLOCKED_REASON.to_string(),
            });
            return false;
        }

        if contract.requires_approval(&call.name) {
            let decision = self.approvals.request(&call.name, call).await;
            if decision != ApprovalDecision::Approved {
                warn!(tool = %call.name, %decision, "tool call not approved");
                state.observations.push(Observation::ToolDenied {
                    name: call.name.clone(),
                    decision,
                    reason: format!("Approval {decision}"),
                });
                return false;
            }
        }

        let result = dispatch(self.tools, call, tool_ctx).await;
        state.tool_calls += 1;
        state.observations.push(Observation::ToolResult {
            name: call.name.clone(),
            result,
        });
        true
    }

    fn limit_reached(&self, contract: &MissionContract, state: &MissionState) -> Option<StopReason> {
        should_stop(
            state.started_at,
            self.clock.now(),
            state.steps,
            state.tool_calls,
            contract,
        )
    }
}

fn stopped_by_limits(state: MissionState, reason: StopReason) -> MissionOutcome {
    info!(%reason, steps = state.steps, tool_calls = state.tool_calls, "mission stopped");
    state.finish(LIMITS_SUMMARY.to_string(), Some(reason))
}
