//! Memory collaborators: the distilled snapshot used for context selection and
//! the key/value store behind the memory tools.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::core::context::DistilledMemory;

/// Per-actor key/value memory. Implementations must be safe to share across
/// concurrently running missions.
pub trait MemoryStore: Send + Sync {
    fn get(&self, actor: &str, key: &str) -> Option<Value>;
    fn entries(&self, actor: &str) -> BTreeMap<String, Value>;
    fn put(&self, actor: &str, key: &str, value: Value);
}

/// Process-local store; contents are gone when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore for InMemoryStore {
    fn get(&self, actor: &str, key: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.get(actor).and_then(|entries| entries.get(key).cloned())
    }

    fn entries(&self, actor: &str) -> BTreeMap<String, Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.get(actor).cloned().unwrap_or_default()
    }

    fn put(&self, actor: &str, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry(actor.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

/// Load a distilled memory snapshot (JSON). A missing file is an empty snapshot.
pub fn load_snapshot(path: &Path) -> Result<DistilledMemory> {
    if !path.exists() {
        debug!(path = %path.display(), "memory snapshot missing, using empty memory");
        return Ok(DistilledMemory::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read memory {}", path.display()))?;
    let memory: DistilledMemory = serde_json::from_str(&contents)
        .with_context(|| format!("parse memory {}", path.display()))?;
    debug!(
        decisions = memory.decisions.len(),
        constraints = memory.constraints.len(),
        "memory snapshot loaded"
    );
    Ok(memory)
}
