//! Approval gates for privileged tool calls.
//!
//! The runner blocks on [`ApprovalGate::request`] before dispatching a gated
//! call. How long that takes is the gate's business; only `APPROVED` lets the
//! call through.

use std::future::Future;
use std::io::{BufRead, Write};
use std::time::Duration;

use tracing::{info, warn};

use crate::core::types::{ApprovalDecision, ToolCall};

/// External decision maker for gated tools.
pub trait ApprovalGate: Send + Sync {
    fn request(
        &self,
        tool: &str,
        call: &ToolCall,
    ) -> impl Future<Output = ApprovalDecision> + Send;
}

/// Answers every request with the same decision.
///
/// `StaticApproval(ApprovalDecision::Denied)` is the unsupervised default:
/// with nobody watching, privileged calls never run.
#[derive(Debug, Clone, Copy)]
pub struct StaticApproval(pub ApprovalDecision);

impl ApprovalGate for StaticApproval {
    async fn request(&self, tool: &str, _call: &ToolCall) -> ApprovalDecision {
        info!(tool, decision = %self.0, "static approval");
        self.0
    }
}

/// Asks a human on the terminal.
///
/// `y`/`yes` approves, anything else denies, and no answer before the
/// deadline (or a closed stdin) expires the request. An expired prompt leaves
/// the stdin reader blocked in the background until a line arrives.
#[derive(Debug, Clone, Copy)]
pub struct PromptApproval {
    pub deadline: Duration,
}

impl Default for PromptApproval {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(120),
        }
    }
}

impl ApprovalGate for PromptApproval {
    async fn request(&self, tool: &str, call: &ToolCall) -> ApprovalDecision {
        let args = serde_json::to_string(&call.args).unwrap_or_else(|_| "<unprintable>".into());
        let prompt = format!("Approve {tool} with {args}? [y/N] ");

        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all(prompt.as_bytes());
            let _ = stderr.flush();
            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            }
        });

        let decision = match tokio::time::timeout(self.deadline, answer).await {
            Ok(Ok(Some(line))) => parse_answer(&line),
            Ok(Ok(None)) | Ok(Err(_)) => ApprovalDecision::Expired,
            Err(_) => {
                warn!(tool, "approval prompt expired");
                ApprovalDecision::Expired
            }
        };
        info!(tool, %decision, "approval answered");
        decision
    }
}

fn parse_answer(line: &str) -> ApprovalDecision {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::Approved,
        _ => ApprovalDecision::Denied,
    }
}
