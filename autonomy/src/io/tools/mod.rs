//! Tool registry and timeout-bounded dispatcher.
//!
//! The registry is an explicit value built once at startup and borrowed by the
//! runner; nothing registers tools while a mission is running.
//!
//! Dispatch races the tool against its per-tool timeout. The race does not
//! cancel: when the timer wins, the tool task is detached and may keep
//! running, and whatever it eventually returns is discarded. Only `safe.exec`
//! really stops its work, by killing the child process on its own deadline.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::contract::{
    AutonomyLevel, FS_READ, FS_WRITE, MEMORY_READ, MEMORY_WRITE, RESEARCH_EXTRACT, RESEARCH_OPEN,
    RESEARCH_SEARCH, SAFE_EXEC,
};
use crate::core::types::{ToolCall, ToolResult};
use crate::io::config::AutonomyConfig;
use crate::io::memory::MemoryStore;

pub mod exec;
pub mod fs;
pub mod memory;
pub mod research;

/// Who is calling and where filesystem access is confined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub actor_id: String,
    pub mode: AutonomyLevel,
    pub mission_id: Option<String>,
    pub fs_root: PathBuf,
}

/// Type-erased tool body.
pub type ToolFn = Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, ToolResult> + Send + Sync>;

/// A named tool with its dispatcher-level timeout.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub timeout: Duration,
    handler: ToolFn,
}

impl ToolSpec {
    pub fn new<F, Fut>(name: impl Into<String>, timeout: Duration, f: F) -> Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            timeout,
            handler: Arc::new(move |args, ctx| f(args, ctx).boxed()),
        }
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Name → tool map. Registering a name twice replaces the earlier spec.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ToolSpec) {
        debug!(tool = %spec.name, timeout_ms = spec.timeout.as_millis() as u64, "registering tool");
        self.tools.insert(spec.name.clone(), spec);
    }

    pub fn with(mut self, spec: ToolSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}

/// Run one call through the registry. Never fails: unknown tools, panics and
/// timeouts all come back as `ok: false` results.
#[instrument(skip_all, fields(tool = %call.name, actor = %ctx.actor_id))]
pub async fn dispatch(registry: &ToolRegistry, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
    let Some(spec) = registry.get(&call.name) else {
        warn!("unknown tool");
        return ToolResult::failure(format!("Unknown tool: {}", call.name));
    };

    let work = (spec.handler)(call.args.clone(), ctx.clone());
    let task = tokio::spawn(work);
    match tokio::time::timeout(spec.timeout, task).await {
        Ok(Ok(result)) => {
            debug!(ok = result.ok, "tool finished");
            result
        }
        Ok(Err(join_err)) => {
            warn!(err = %join_err, "tool task failed");
            ToolResult::failure(format!("Tool {} crashed: {join_err}", call.name))
        }
        Err(_) => {
            // Dropping the join handle detaches the task; its result is discarded.
            warn!(timeout_ms = spec.timeout.as_millis() as u64, "tool timed out");
            ToolResult::failure("Tool timeout")
        }
    }
}

/// Build the built-in tool set with timeouts from `cfg`.
pub fn default_registry(cfg: &AutonomyConfig, store: Arc<dyn MemoryStore>) -> ToolRegistry {
    let timeouts = &cfg.tool_timeouts;
    let research = Duration::from_millis(timeouts.research_ms);
    let fs_timeout = Duration::from_millis(timeouts.fs_ms);
    let memory_timeout = Duration::from_millis(timeouts.memory_ms);

    let read_limit = cfg.fs_read_limit_bytes;
    let exec_cfg = cfg.exec.clone();
    let read_store = store.clone();
    let write_store = store;

    ToolRegistry::new()
        .with(ToolSpec::new(RESEARCH_SEARCH, research, |_, _| {
            research::not_wired(RESEARCH_SEARCH)
        }))
        .with(ToolSpec::new(RESEARCH_OPEN, research, |_, _| {
            research::not_wired(RESEARCH_OPEN)
        }))
        .with(ToolSpec::new(RESEARCH_EXTRACT, research, |_, _| {
            research::not_wired(RESEARCH_EXTRACT)
        }))
        .with(ToolSpec::new(FS_READ, fs_timeout, move |args, ctx| {
            fs::read(args, ctx, read_limit)
        }))
        .with(ToolSpec::new(FS_WRITE, fs_timeout, fs::write))
        .with(ToolSpec::new(
            SAFE_EXEC,
            Duration::from_millis(timeouts.exec_ms),
            move |args, ctx| exec::safe_exec(args, ctx, exec_cfg.clone()),
        ))
        .with(ToolSpec::new(MEMORY_READ, memory_timeout, move |args, ctx| {
            memory::read(read_store.clone(), args, ctx)
        }))
        .with(ToolSpec::new(MEMORY_WRITE, memory_timeout, move |args, ctx| {
            memory::write(write_store.clone(), args, ctx)
        }))
}

/// Decode tool arguments into their typed shape.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).with_context(|| format!("invalid arguments for {tool}"))
}

/// Fold a fallible tool body into a result payload.
pub(crate) fn into_result(outcome: Result<Value>) -> ToolResult {
    match outcome {
        Ok(data) => ToolResult::success(data),
        Err(err) => ToolResult::failure(format!("{err:#}")),
    }
}

/// Run blocking tool work off the async workers.
pub(crate) async fn blocking<F>(f: F) -> ToolResult
where
    F: FnOnce() -> ToolResult + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(err) => ToolResult::failure(format!("tool worker failed: {err}")),
    }
}
