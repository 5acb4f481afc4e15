//! Sidecar configuration stored in `autonomy.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable that overrides [`AutonomyConfig::allowed_root`].
pub const ALLOWED_ROOT_ENV: &str = "AUTONOMY_ALLOWED_ROOT";

/// Mission sidecar configuration (TOML).
///
/// Missing fields default to the values the sidecar ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutonomyConfig {
    /// Filesystem boundary for `fs.*` tools and the working directory of `safe.exec`.
    pub allowed_root: PathBuf,

    /// Missions an actor may start per one-minute window.
    pub rate_limit_per_minute: u32,

    /// Truncate `fs.read` payloads beyond this many bytes.
    pub fs_read_limit_bytes: usize,

    pub exec: ExecConfig,

    pub tool_timeouts: ToolTimeouts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecConfig {
    /// Child timeout when the call does not ask for one.
    pub default_timeout_ms: u64,
    pub min_timeout_ms: u64,
    pub max_timeout_ms: u64,
    /// Truncate captured stdout/stderr beyond this many bytes (each).
    pub output_limit_bytes: usize,
}

/// Dispatcher-level timeouts, per tool family.
///
/// `exec_ms` must outlast `exec.max_timeout_ms` so a shell call always ends
/// on its own kill deadline, never on the dispatcher's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolTimeouts {
    pub research_ms: u64,
    pub fs_ms: u64,
    pub exec_ms: u64,
    pub memory_ms: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            min_timeout_ms: 1_000,
            max_timeout_ms: 30_000,
            output_limit_bytes: 50_000,
        }
    }
}

impl ExecConfig {
    /// Clamp a requested child timeout into the configured window.
    pub fn clamp_timeout(&self, requested_ms: Option<u64>) -> Duration {
        let ms = requested_ms
            .unwrap_or(self.default_timeout_ms)
            .clamp(self.min_timeout_ms, self.max_timeout_ms);
        Duration::from_millis(ms)
    }
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            research_ms: 10_000,
            fs_ms: 2_000,
            exec_ms: 31_000,
            memory_ms: 1_000,
        }
    }
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            allowed_root: PathBuf::from("./workspace"),
            rate_limit_per_minute: 10,
            fs_read_limit_bytes: 200_000,
            exec: ExecConfig::default(),
            tool_timeouts: ToolTimeouts::default(),
        }
    }
}

impl AutonomyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.allowed_root.as_os_str().is_empty() {
            return Err(anyhow!("allowed_root must be non-empty"));
        }
        if self.rate_limit_per_minute == 0 {
            return Err(anyhow!("rate_limit_per_minute must be > 0"));
        }
        if self.fs_read_limit_bytes == 0 {
            return Err(anyhow!("fs_read_limit_bytes must be > 0"));
        }
        if self.exec.output_limit_bytes == 0 {
            return Err(anyhow!("exec.output_limit_bytes must be > 0"));
        }
        if self.exec.min_timeout_ms == 0 || self.exec.min_timeout_ms > self.exec.max_timeout_ms {
            return Err(anyhow!(
                "exec timeouts must satisfy 0 < min_timeout_ms <= max_timeout_ms"
            ));
        }
        let t = &self.tool_timeouts;
        if [t.research_ms, t.fs_ms, t.exec_ms, t.memory_ms].contains(&0) {
            return Err(anyhow!("tool_timeouts entries must be > 0"));
        }
        if self.exec.max_timeout_ms >= t.exec_ms {
            return Err(anyhow!(
                "tool_timeouts.exec_ms ({}) must exceed exec.max_timeout_ms ({})",
                t.exec_ms,
                self.exec.max_timeout_ms
            ));
        }
        Ok(())
    }

    /// Apply environment overrides on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(root) = std::env::var_os(ALLOWED_ROOT_ENV).filter(|v| !v.is_empty()) {
            debug!(root = ?root, "allowed_root overridden from environment");
            self.allowed_root = PathBuf::from(root);
        }
        self
    }
}

/// Load config from a TOML file, then apply environment overrides.
///
/// If the file is missing, starts from `AutonomyConfig::default()`.
pub fn load_config(path: &Path) -> Result<AutonomyConfig> {
    let cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str::<AutonomyConfig>(&contents)
            .with_context(|| format!("parse {}", path.display()))?
    } else {
        debug!(path = %path.display(), "config missing, using defaults");
        AutonomyConfig::default()
    };
    let cfg = cfg.with_env_overrides();
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AutonomyConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
