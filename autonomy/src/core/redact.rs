//! Outbound redaction stages.
//!
//! Redaction is lossy on purpose: the goal is that no secret or PII pattern
//! survives, not that the text changes minimally.

use std::sync::LazyLock;

use regex::Regex;

pub const SECRET_MARKER: &str = "[REDACTED_SECRET]";
pub const PII_MARKER: &str = "[REDACTED_PII]";

/// Result of one redaction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redacted {
    pub text: String,
    pub redacted: bool,
}

struct NamedPattern {
    name: &'static str,
    re: Regex,
}

fn compile(patterns: &[(&'static str, &str)]) -> Vec<NamedPattern> {
    patterns
        .iter()
        .map(|(name, pattern)| NamedPattern {
            name,
            re: Regex::new(pattern).unwrap(),
        })
        .collect()
}

static SECRET_PATTERNS: LazyLock<Vec<NamedPattern>> = LazyLock::new(|| {
    compile(&[
        (
            "private_key_block",
            r"-----BEGIN [A-Z ]*PRIVATE KEY-----[\s\S]*?-----END [A-Z ]*PRIVATE KEY-----",
        ),
        ("openai_style_key", r"\bsk-[A-Za-z0-9_-]{16,}"),
        ("github_token", r"\bgh[pousr]_[A-Za-z0-9]{20,}"),
        ("slack_token", r"\bxox[abprs]-[A-Za-z0-9-]{10,}"),
        ("aws_access_key_id", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b"),
        ("bearer_token", r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]{16,}"),
        (
            "credential_assignment",
            r#"(?i)\b(?:api[_-]?key|token|secret|password|passwd)\b\s*[:=]\s*["']?[^\s"']{6,}"#,
        ),
    ])
});

static PII_PATTERNS: LazyLock<Vec<NamedPattern>> = LazyLock::new(|| {
    compile(&[
        ("email", r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b"),
        ("iban_like", r"(?i)\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b"),
        ("credit_card_like", r"\b(?:\d[ -]*?){13,19}\b"),
    ])
});

fn apply(patterns: &[NamedPattern], text: &str, marker: &str) -> Redacted {
    let mut out = text.to_string();
    let mut redacted = false;
    for pattern in patterns {
        if pattern.re.is_match(&out) {
            tracing::debug!(pattern = pattern.name, "redacting match");
            out = pattern.re.replace_all(&out, marker).into_owned();
            redacted = true;
        }
    }
    Redacted { text: out, redacted }
}

/// Replace credential-looking material with [`SECRET_MARKER`].
pub fn redact_secrets(text: &str) -> Redacted {
    apply(&SECRET_PATTERNS, text, SECRET_MARKER)
}

/// Replace emails, card-like digit runs and IBAN-like strings with [`PII_MARKER`].
pub fn redact_pii(text: &str) -> Redacted {
    apply(&PII_PATTERNS, text, PII_MARKER)
}

/// Drop control characters (newlines and tabs survive) and trim.
///
/// `redacted` reports removed control characters only; trimming surrounding
/// whitespace removes no content and is not reported.
pub fn strip_control(text: &str) -> Redacted {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();
    let stripped = cleaned.chars().count() != text.chars().count();
    Redacted {
        text: cleaned.trim().to_string(),
        redacted: stripped,
    }
}
