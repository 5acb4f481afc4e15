//! Context-on-demand: slice the distilled memory down to what a message needs.
//!
//! Constraints and open items are small and always included. Larger slices
//! (profile, current task, decision log) only ride along when a matching tag
//! was inferred from the message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::tags::{MemoryTag, infer_tags};

/// Hard cap on decisions handed to the agent.
pub const MAX_DECISIONS: usize = 10;

/// Read-only snapshot of the external memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistilledMemory {
    pub constraints: Vec<String>,
    pub open_items: Vec<String>,
    pub user_profile: BTreeMap<String, String>,
    pub current_task: Option<String>,
    /// Chronological, oldest first.
    pub decisions: Vec<String>,
}

/// Context object fed to the agent alongside the goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedContext {
    pub tags: Vec<MemoryTag>,
    pub constraints: Vec<String>,
    pub open_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions: Option<Vec<String>>,
}

/// Select the slices of `memory` relevant to `text`.
pub fn select_context(memory: &DistilledMemory, text: &str) -> SelectedContext {
    let tags = infer_tags(text);

    let user_profile = tags
        .contains(&MemoryTag::Profile)
        .then(|| memory.user_profile.clone());
    let current_task = if tags.contains(&MemoryTag::Channel) {
        memory.current_task.clone()
    } else {
        None
    };

    let keywords: Vec<&str> = tags
        .iter()
        .flat_map(|tag| tag.decision_keywords().iter().copied())
        .collect();
    let decisions = (!keywords.is_empty()).then(|| relevant_decisions(&memory.decisions, &keywords));

    SelectedContext {
        tags,
        constraints: memory.constraints.clone(),
        open_items: memory.open_items.clone(),
        user_profile,
        current_task,
        decisions,
    }
}

/// Keep decisions mentioning any keyword, in log order, then the newest
/// `MAX_DECISIONS`.
fn relevant_decisions(decisions: &[String], keywords: &[&str]) -> Vec<String> {
    let matching: Vec<&String> = decisions
        .iter()
        .filter(|decision| {
            let lowered = decision.to_lowercase();
            keywords.iter().any(|kw| lowered.contains(kw))
        })
        .collect();
    let skip = matching.len().saturating_sub(MAX_DECISIONS);
    matching.into_iter().skip(skip).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> DistilledMemory {
        DistilledMemory {
            constraints: vec!["no spend over $50 without asking".to_string()],
            open_items: vec!["renew TLS cert".to_string()],
            user_profile: BTreeMap::from([("tz".to_string(), "Pacific/Port_Moresby".to_string())]),
            current_task: Some("wire the chat bridge".to_string()),
            decisions: vec![
                "Deploy via blue/green".to_string(),
                "Security: rotate keys monthly".to_string(),
                "Budget capped at 200/month".to_string(),
                "Prefer Postgres".to_string(),
            ],
        }
    }

    #[test]
    fn small_fields_are_always_present() {
        let ctx = select_context(&memory(), "what's next?");
        assert_eq!(ctx.tags, vec![MemoryTag::Project]);
        assert_eq!(ctx.constraints.len(), 1);
        assert_eq!(ctx.open_items.len(), 1);
        assert_eq!(ctx.user_profile, None);
        assert_eq!(ctx.current_task, None);
        assert_eq!(ctx.decisions, None);
    }

    #[test]
    fn deploy_text_selects_only_deploy_decisions() {
        let ctx = select_context(&memory(), "please deploy the worker");
        let decisions = ctx.decisions.expect("decisions");
        assert_eq!(decisions, vec!["Deploy via blue/green".to_string()]);
        assert!(
            decisions
                .iter()
                .all(|d| d.to_lowercase().contains("deploy"))
        );
    }

    #[test]
    fn decision_log_is_capped_to_newest_entries() {
        let mut mem = memory();
        mem.decisions = (0..25).map(|i| format!("deploy decision {i}")).collect();
        mem.decisions
            .extend((0..25).map(|i| format!("security decision {i}")));

        let ctx = select_context(&mem, "security and deploy review");
        let decisions = ctx.decisions.expect("decisions");
        assert_eq!(decisions.len(), MAX_DECISIONS);
        assert_eq!(decisions.last().map(String::as_str), Some("security decision 24"));
        assert_eq!(decisions.first().map(String::as_str), Some("security decision 15"));
    }

    #[test]
    fn decisions_matching_several_tags_appear_once() {
        let mut mem = memory();
        mem.decisions = vec!["security sign-off before any deploy".to_string()];
        let ctx = select_context(&mem, "security deploy");
        assert_eq!(ctx.decisions.map(|d| d.len()), Some(1));
    }

    #[test]
    fn channel_tag_brings_current_task_and_profile_tag_brings_profile() {
        let ctx = select_context(&memory(), "update my WhatsApp profile");
        assert_eq!(ctx.current_task.as_deref(), Some("wire the chat bridge"));
        assert!(ctx.user_profile.is_some());
        assert_eq!(ctx.decisions, None);
    }

    #[test]
    fn selection_never_mutates_memory() {
        let mem = memory();
        let before = mem.clone();
        let _ = select_context(&mem, "security deploy budget whatsapp profile");
        assert_eq!(mem, before);
    }
}
