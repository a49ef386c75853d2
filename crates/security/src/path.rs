//! Path validation: filesystem sandboxing to the project root.
//!
//! Resolution is lexical first (`.` and `..` folded without touching the
//! disk), then the deepest existing ancestor is canonicalized and dangling
//! symlinks are followed, so a link inside the root cannot point a write
//! somewhere else.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the project root")]
    OutsideRoot { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Project root '{root}' is unavailable: {reason}")]
    RootUnavailable { root: String, reason: String },
}

/// A fixed, canonical project root that all tool paths must stay inside.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Open a sandbox over an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathValidationError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| PathValidationError::RootUnavailable {
                root: root.display().to_string(),
                reason: e.to_string(),
            })?;
        if !canonical.is_dir() {
            return Err(PathValidationError::RootUnavailable {
                root: root.display().to_string(),
                reason: "not a directory".into(),
            });
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` (relative paths are joined to the root) and require
    /// the result to lie inside the root. The root itself is allowed.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        if path.contains('\0') {
            return Err(PathValidationError::InvalidPath {
                path: path.into(),
                reason: "contains a NUL byte".into(),
            });
        }

        let input = Path::new(path);
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        let resolved = canonicalize_existing_prefix(&normalize_lexically(&joined), MAX_SYMLINK_HOPS)
            .ok_or_else(|| PathValidationError::InvalidPath {
                path: path.into(),
                reason: "symlink chain does not resolve".into(),
            })?;
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            tracing::warn!(
                path = %path,
                resolved = %resolved.display(),
                "Path escapes project root"
            );
            Err(PathValidationError::OutsideRoot { path: path.into() })
        }
    }

    /// `path` relative to the root with `/` separators, if it is inside.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// Fold `.` and `..` without consulting the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Symlinks followed while resolving one path before giving up.
const MAX_SYMLINK_HOPS: usize = 40;

/// Canonicalize the deepest ancestor that exists and re-append the rest.
/// Dangling symlinks on the way are followed by hand, since the write
/// would follow them too. `None` when a link chain doesn't terminate.
fn canonicalize_existing_prefix(path: &Path, hops: usize) -> Option<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Some(tail.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        let is_link = existing
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink());
        if is_link {
            let hops = hops.checked_sub(1)?;
            let target = std::fs::read_link(existing).ok()?;
            let base = existing.parent()?.canonicalize().ok()?;
            let mut next = normalize_lexically(&base.join(target));
            next.extend(tail.iter().rev());
            return canonicalize_existing_prefix(&normalize_lexically(&next), hops);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return Some(path.to_path_buf()),
        }
    }
}
