//! Mission trigger parsing for inbound chat messages.

use crate::core::contract::AutonomyLevel;

const PREFIXES: [(&str, AutonomyLevel); 3] = [
    ("auto1: ", AutonomyLevel::Auto1),
    ("auto2: ", AutonomyLevel::Auto2),
    ("auto3: ", AutonomyLevel::Auto3),
];

/// A message that asks for a mission at a given tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionTrigger {
    pub level: AutonomyLevel,
    pub goal: String,
}

/// Parse `autoN: <goal>`. Anything else (including an empty goal) is a
/// passthrough and yields `None`.
pub fn parse_trigger(text: &str) -> Option<MissionTrigger> {
    let text = text.trim();
    PREFIXES.iter().find_map(|(prefix, level)| {
        let goal = text.strip_prefix(prefix)?.trim();
        if goal.is_empty() {
            return None;
        }
        Some(MissionTrigger {
            level: *level,
            goal: goal.to_string(),
        })
    })
}
