//! Path containment for filesystem tools.
//!
//! Every path argument is resolved against the allowed root before any read
//! or write happens. Resolution is lexical first (`..`, `.`, absolute
//! overrides), then the deepest existing ancestor is canonicalized so a
//! symlink inside the root cannot point the operation somewhere else.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// A requested path resolved outside the allowed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEscapeError {
    pub requested: String,
    pub root: PathBuf,
}

impl fmt::Display for PathEscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Path escapes allowed root: '{}' is outside {}",
            self.requested,
            self.root.display()
        )
    }
}

impl std::error::Error for PathEscapeError {}

/// Resolve `requested` under `root`, or fail with [`PathEscapeError`].
///
/// Relative paths are joined to the root; absolute paths are accepted only
/// when they already point inside it. The returned path is absolute and
/// rooted at the canonical root.
pub fn resolve_in_root(root: &Path, requested: &str) -> Result<PathBuf> {
    let root = fs::canonicalize(root)
        .with_context(|| format!("allowed root {} is unavailable", root.display()))?;
    let escape = || PathEscapeError {
        requested: requested.to_string(),
        root: root.clone(),
    };

    let candidate = normalize_lexically(&root.join(requested));
    if !candidate.starts_with(&root) {
        return Err(escape().into());
    }

    let Some(existing) = candidate
        .ancestors()
        .find(|p| fs::symlink_metadata(p).is_ok())
    else {
        return Err(escape().into());
    };
    // A dangling symlink cannot be canonicalized; following it on write could
    // create a file anywhere, so it counts as an escape.
    let resolved_existing = fs::canonicalize(existing).map_err(|_| escape())?;
    if !resolved_existing.starts_with(&root) {
        return Err(escape().into());
    }

    let rest = candidate
        .strip_prefix(existing)
        .map_err(|_| escape())?
        .to_path_buf();
    Ok(resolved_existing.join(rest))
}

/// Collapse `.` and `..` without touching the filesystem. `..` at the
/// filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
