//! Research tools. No web backend is wired in; calls report that plainly so
//! the agent can fall back instead of waiting on a timeout.

use crate::core::types::ToolResult;

pub async fn not_wired(tool: &'static str) -> ToolResult {
    ToolResult::failure(format!("{tool} is not wired to a research backend"))
}
