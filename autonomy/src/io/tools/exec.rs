//! `safe.exec`: run a shell command as a killable child process.
//!
//! The child gets its own hard deadline, independent of the dispatcher's
//! timeout race, and is killed when it passes. Captured streams are bounded.

use std::process::Command;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ToolContext, blocking, parse_args};
use crate::core::contract::SAFE_EXEC;
use crate::core::types::ToolResult;
use crate::io::config::ExecConfig;
use crate::io::process::run_with_timeout;

#[derive(Debug, Deserialize)]
struct ExecArgs {
    cmd: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

pub async fn safe_exec(args: Value, ctx: ToolContext, cfg: ExecConfig) -> ToolResult {
    let args: ExecArgs = match parse_args(SAFE_EXEC, args) {
        Ok(args) => args,
        Err(err) => return ToolResult::failure(format!("{err:#}")),
    };
    let timeout = cfg.clamp_timeout(args.timeout_ms);
    info!(
        actor = %ctx.actor_id,
        mode = %ctx.mode,
        timeout_ms = timeout.as_millis() as u64,
        "running safe.exec"
    );

    blocking(move || {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&args.cmd).current_dir(&ctx.fs_root);

        let output = match run_with_timeout(cmd, timeout, cfg.output_limit_bytes) {
            Ok(output) => output,
            Err(err) => return ToolResult::failure(format!("{err:#}")),
        };
        if output.timed_out {
            warn!(timeout_ms = timeout.as_millis() as u64, "safe.exec killed after timeout");
            return ToolResult::failure_with_data(
                format!("Command timed out after {}ms", timeout.as_millis()),
                json!({ "timed_out": true }),
            );
        }

        let data = json!({
            "code": output.exit_code,
            "stdout": output.stdout_lossy(),
            "stderr": output.stderr_lossy(),
        });
        if output.success() {
            ToolResult::success(data)
        } else {
            ToolResult::failure_with_data("Command failed", data)
        }
    })
    .await
}
