//! Keyword-driven topic tags for context selection.

use serde::{Deserialize, Serialize};

/// Topic vocabulary. `Project` is the fallback when nothing else matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTag {
    Channel,
    Policy,
    Security,
    Finance,
    Devops,
    Profile,
    Project,
}

impl MemoryTag {
    /// Substrings (lowercase) that imply the tag.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Channel => &["whatsapp", "openclaw"],
            Self::Policy => &["policy", "approval"],
            Self::Security => &["security", "jailbreak", "malware"],
            Self::Finance => &["budget", "cost", "token"],
            Self::Devops => &["deploy", "service", "windows"],
            Self::Profile => &["profile", "preference"],
            Self::Project => &[],
        }
    }

    /// Substrings a decision must mention to be relevant to this tag.
    pub fn decision_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Security => &["security"],
            Self::Devops => &["deploy"],
            Self::Finance => &["budget"],
            _ => &[],
        }
    }
}

const INFERRED: [MemoryTag; 6] = [
    MemoryTag::Channel,
    MemoryTag::Policy,
    MemoryTag::Security,
    MemoryTag::Finance,
    MemoryTag::Devops,
    MemoryTag::Profile,
];

/// Infer tags from free text (case-insensitive substring match).
///
/// Returns tags in vocabulary order without duplicates; never empty.
pub fn infer_tags(text: &str) -> Vec<MemoryTag> {
    let lowered = text.to_lowercase();
    let mut tags: Vec<MemoryTag> = INFERRED
        .into_iter()
        .filter(|tag| tag.keywords().iter().any(|kw| lowered.contains(kw)))
        .collect();
    if tags.is_empty() {
        tags.push(MemoryTag::Project);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_text_defaults_to_project() {
        assert_eq!(infer_tags("refactor the parser"), vec![MemoryTag::Project]);
        assert_eq!(infer_tags(""), vec![MemoryTag::Project]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(infer_tags("DEPLOY the API"), vec![MemoryTag::Devops]);
    }

    #[test]
    fn multiple_tags_keep_vocabulary_order() {
        let tags = infer_tags("Security review of the deploy budget via WhatsApp");
        assert_eq!(
            tags,
            vec![
                MemoryTag::Channel,
                MemoryTag::Security,
                MemoryTag::Finance,
                MemoryTag::Devops,
            ]
        );
    }

    #[test]
    fn repeated_keywords_do_not_duplicate_tags() {
        assert_eq!(
            infer_tags("cost cost token budget"),
            vec![MemoryTag::Finance]
        );
    }
}
