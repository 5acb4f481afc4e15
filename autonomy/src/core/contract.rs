//! Mission contracts: immutable caps and per-tier tool policy.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const RESEARCH_SEARCH: &str = "research.search";
pub const RESEARCH_OPEN: &str = "research.open";
pub const RESEARCH_EXTRACT: &str = "research.extract";
pub const MEMORY_READ: &str = "memory.read";
pub const MEMORY_WRITE: &str = "memory.write";
pub const SAFE_EXEC: &str = "safe.exec";
pub const FS_READ: &str = "fs.read";
pub const FS_WRITE: &str = "fs.write";

pub const DEFAULT_EXPIRY_MINUTES: i64 = 60;
pub const DEFAULT_MAX_STEPS: u32 = 12;
pub const DEFAULT_MAX_MINUTES: u32 = 8;
pub const DEFAULT_MAX_TOOL_CALLS: u32 = 20;

const TIER_1_TOOLS: [&str; 5] = [
    RESEARCH_SEARCH,
    RESEARCH_OPEN,
    RESEARCH_EXTRACT,
    MEMORY_READ,
    MEMORY_WRITE,
];

/// Ordered autonomy tier. Higher tiers only ever add capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AutonomyLevel {
    #[serde(rename = "Auto-1")]
    Auto1,
    #[serde(rename = "Auto-2")]
    Auto2,
    #[serde(rename = "Auto-3")]
    Auto3,
}

impl AutonomyLevel {
    pub const ALL: [AutonomyLevel; 3] = [Self::Auto1, Self::Auto2, Self::Auto3];

    pub fn label(self) -> &'static str {
        match self {
            Self::Auto1 => "Auto-1",
            Self::Auto2 => "Auto-2",
            Self::Auto3 => "Auto-3",
        }
    }

    /// Tools the tier may call at all.
    pub fn allowed_tools(self) -> BTreeSet<String> {
        let mut tools: Vec<&str> = TIER_1_TOOLS.to_vec();
        if self >= Self::Auto2 {
            tools.extend([SAFE_EXEC, FS_READ]);
        }
        if self >= Self::Auto3 {
            tools.push(FS_WRITE);
        }
        tools.into_iter().map(str::to_string).collect()
    }

    /// Tools that additionally need a human decision before dispatch.
    ///
    /// Only tools the tier is allowed to call are listed, so `fs.write` at
    /// tier 2 stays blocked rather than gated.
    pub fn approval_required_tools(self) -> BTreeSet<String> {
        let gated: &[&str] = match self {
            Self::Auto1 => &[],
            Self::Auto2 => &[FS_WRITE],
            Self::Auto3 => &[SAFE_EXEC, FS_WRITE],
        };
        let allowed = self.allowed_tools();
        gated
            .iter()
            .filter(|tool| allowed.contains(**tool))
            .map(|tool| tool.to_string())
            .collect()
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AutonomyLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto1" | "auto-1" | "1" => Ok(Self::Auto1),
            "auto2" | "auto-2" | "2" => Ok(Self::Auto2),
            "auto3" | "auto-3" | "3" => Ok(Self::Auto3),
            other => Err(anyhow!(
                "unknown autonomy level '{other}' (expected auto1, auto2 or auto3)"
            )),
        }
    }
}

/// Immutable mission parameters. A new mission always gets a new contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionContract {
    pub mission_id: String,
    pub actor_id: String,
    pub level: AutonomyLevel,
    pub goal: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub max_steps: u32,
    pub max_minutes: u32,
    pub max_tool_calls: u32,
    pub allowed_tools: BTreeSet<String>,
    pub approval_required_tools: BTreeSet<String>,
}

impl MissionContract {
    pub fn allows(&self, tool: &str) -> bool {
        self.allowed_tools.contains(tool)
    }

    pub fn requires_approval(&self, tool: &str) -> bool {
        self.approval_required_tools.contains(tool)
    }
}

/// Build the default contract for `level`, anchored at `now`.
pub fn build_contract(
    actor_id: &str,
    goal: &str,
    level: AutonomyLevel,
    now: DateTime<Utc>,
) -> MissionContract {
    MissionContract {
        mission_id: format!("mission-{}", now.timestamp_millis()),
        actor_id: actor_id.to_string(),
        level,
        goal: goal.to_string(),
        created_at: now,
        expires_at: now + Duration::minutes(DEFAULT_EXPIRY_MINUTES),
        max_steps: DEFAULT_MAX_STEPS,
        max_minutes: DEFAULT_MAX_MINUTES,
        max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
        allowed_tools: level.allowed_tools(),
        approval_required_tools: level.approval_required_tools(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn approval_tools_are_subset_of_allowed_for_every_level() {
        for level in AutonomyLevel::ALL {
            let contract = build_contract("actor", "goal", level, now());
            assert!(
                contract
                    .approval_required_tools
                    .is_subset(&contract.allowed_tools),
                "{level}: {:?} not within {:?}",
                contract.approval_required_tools,
                contract.allowed_tools
            );
        }
    }

    #[test]
    fn higher_tiers_only_add_tools() {
        let t1 = AutonomyLevel::Auto1.allowed_tools();
        let t2 = AutonomyLevel::Auto2.allowed_tools();
        let t3 = AutonomyLevel::Auto3.allowed_tools();
        assert!(t1.is_subset(&t2) && t1.len() < t2.len());
        assert!(t2.is_subset(&t3) && t2.len() < t3.len());
    }

    #[test]
    fn tier_three_gates_exec_and_writes() {
        let contract = build_contract("actor", "goal", AutonomyLevel::Auto3, now());
        assert!(contract.allows(FS_WRITE));
        assert!(contract.requires_approval(SAFE_EXEC));
        assert!(contract.requires_approval(FS_WRITE));
        assert!(!contract.requires_approval(FS_READ));
    }

    #[test]
    fn tier_one_has_no_gated_tools() {
        let contract = build_contract("actor", "goal", AutonomyLevel::Auto1, now());
        assert!(contract.approval_required_tools.is_empty());
        assert!(!contract.allows(SAFE_EXEC));
    }

    #[test]
    fn defaults_are_anchored_at_now() {
        let contract = build_contract("actor", "find docs", AutonomyLevel::Auto2, now());
        assert_eq!(contract.expires_at - contract.created_at, Duration::minutes(60));
        assert_eq!(contract.max_steps, 12);
        assert_eq!(contract.max_minutes, 8);
        assert_eq!(contract.max_tool_calls, 20);
        assert_eq!(
            contract.mission_id,
            format!("mission-{}", now().timestamp_millis())
        );
    }

    #[test]
    fn level_parses_from_cli_spellings() {
        assert_eq!("auto2".parse::<AutonomyLevel>().unwrap(), AutonomyLevel::Auto2);
        assert_eq!("Auto-3".parse::<AutonomyLevel>().unwrap(), AutonomyLevel::Auto3);
        assert!("auto4".parse::<AutonomyLevel>().is_err());
    }
}
