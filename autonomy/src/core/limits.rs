//! Stop decision for the mission loop.

use chrono::{DateTime, Utc};

use crate::core::contract::MissionContract;
use crate::core::types::StopReason;

/// Decide whether the mission must stop before taking another action.
///
/// Checked in fixed priority: steps, tool calls, then wall-clock minutes.
/// Thresholds are inclusive, so reaching a cap stops the mission.
pub fn should_stop(
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    steps_done: u32,
    tool_calls_done: u32,
    contract: &MissionContract,
) -> Option<StopReason> {
    if steps_done >= contract.max_steps {
        return Some(StopReason::MaxSteps);
    }
    if tool_calls_done >= contract.max_tool_calls {
        return Some(StopReason::MaxToolCalls);
    }
    let elapsed_ms = (now - started_at).num_milliseconds().max(0);
    if elapsed_ms >= i64::from(contract.max_minutes) * 60_000 {
        return Some(StopReason::MaxTime);
    }
    None
}
