//! `memory.read` / `memory.write` against the per-actor key/value store.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, into_result, parse_args};
use crate::core::contract::{MEMORY_READ, MEMORY_WRITE};
use crate::core::types::ToolResult;
use crate::io::memory::MemoryStore;

#[derive(Debug, Default, Deserialize)]
struct ReadArgs {
    #[serde(default)]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    key: String,
    value: Value,
}

/// Read one key, or every entry for the actor when no key is given.
pub async fn read(store: Arc<dyn MemoryStore>, args: Value, ctx: ToolContext) -> ToolResult {
    let args = if args.is_null() {
        Ok(ReadArgs::default())
    } else {
        parse_args::<ReadArgs>(MEMORY_READ, args)
    };
    into_result(args.map(|args| match args.key {
        Some(key) => json!({ "key": key, "value": store.get(&ctx.actor_id, &key) }),
        None => json!({ "entries": store.entries(&ctx.actor_id) }),
    }))
}

pub async fn write(store: Arc<dyn MemoryStore>, args: Value, ctx: ToolContext) -> ToolResult {
    into_result(parse_args::<WriteArgs>(MEMORY_WRITE, args).map(|args| {
        store.put(&ctx.actor_id, &args.key, args.value);
        json!({ "written": true, "key": args.key })
    }))
}
