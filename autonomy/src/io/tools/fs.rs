//! `fs.read` / `fs.write`, confined to the allowed root.

use std::fs;

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, blocking, into_result, parse_args};
use crate::core::contract::{FS_READ, FS_WRITE};
use crate::core::types::ToolResult;
use crate::io::sandbox::resolve_in_root;

#[derive(Debug, Deserialize)]
struct ReadArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    text: String,
}

/// Read a UTF-8 file, keeping at most `limit_bytes` of it.
pub async fn read(args: Value, ctx: ToolContext, limit_bytes: usize) -> ToolResult {
    blocking(move || {
        into_result((|| -> anyhow::Result<Value> {
            let args: ReadArgs = parse_args(FS_READ, args)?;
            let full = resolve_in_root(&ctx.fs_root, &args.path)?;
            let text =
                fs::read_to_string(&full).with_context(|| format!("read {}", args.path))?;
            let truncated = text.len() > limit_bytes;
            Ok(json!({
                "text": truncate_at_char_boundary(&text, limit_bytes),
                "truncated": truncated,
            }))
        })())
    })
    .await
}

/// Write a UTF-8 file, creating parent directories as needed.
pub async fn write(args: Value, ctx: ToolContext) -> ToolResult {
    blocking(move || {
        into_result((|| -> anyhow::Result<Value> {
            let args: WriteArgs = parse_args(FS_WRITE, args)?;
            let full = resolve_in_root(&ctx.fs_root, &args.path)?;
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create directory for {}", args.path))?;
            }
            fs::write(&full, &args.text).with_context(|| format!("write {}", args.path))?;
            Ok(json!({ "written": true, "path": args.path }))
        })())
    })
    .await
}

fn truncate_at_char_boundary(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
