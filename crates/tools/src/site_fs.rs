//! The sandboxed filesystem surface behind the file tools.
//!
//! Writes are anchored under the output directory (`site/` by default);
//! reads and listings resolve against the project root. Every path goes
//! through [`Sandbox::resolve`] before the disk is touched.

use std::path::{Component, Path, PathBuf};

use sitewright_security::{PathValidationError, Sandbox};

/// CDN references rewritten to local copies in generated HTML.
pub const ASSET_REWRITES: [(&str, &str); 2] = [
    (
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css",
        "static/bootstrap.min.css",
    ),
    (
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/js/bootstrap.bundle.min.js",
        "static/bootstrap.bundle.min.js",
    ),
];

/// Third-party assets copied from the static directory into the output tree.
pub const BUNDLED_ASSETS: [&str; 2] = ["bootstrap.min.css", "bootstrap.bundle.min.js"];

#[derive(Debug, thiserror::Error)]
pub enum SiteFsError {
    #[error(transparent)]
    Sandbox(#[from] PathValidationError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SiteFsError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Confirmation of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub path: PathBuf,
    pub bytes: usize,
}

impl std::fmt::Display for WriteReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wrote {} ({} bytes)", self.path.display(), self.bytes)
    }
}

/// Outcome of a read. A missing file is an answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Content(String),
    NotFound(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SiteFs {
    sandbox: Sandbox,
    output_dir: String,
}

impl SiteFs {
    pub fn new(sandbox: Sandbox, output_dir: impl Into<String>) -> Self {
        Self {
            sandbox,
            output_dir: output_dir.into(),
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    /// Prefix `path` with the output directory unless its first segment
    /// already is that directory. Absolute paths are left alone and are
    /// still subject to the sandbox.
    pub fn anchor(&self, path: &str) -> String {
        let p = Path::new(path);
        if p.is_absolute() {
            return path.to_string();
        }
        let first = p.components().find_map(|c| match c {
            Component::Normal(seg) => Some(seg),
            _ => None,
        });
        match first {
            Some(seg) if seg == self.output_dir.as_str() => path.to_string(),
            _ => format!("{}/{}", self.output_dir, path),
        }
    }

    /// Write `content` under the output directory, creating parents.
    /// HTML pages get their CDN asset links pointed at local copies.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<WriteReceipt, SiteFsError> {
        let target = self.sandbox.resolve(&self.anchor(path))?;

        let text = if is_html(&target) {
            rewrite_asset_links(content)
        } else {
            content.to_string()
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SiteFsError::io(parent, e))?;
        }
        tokio::fs::write(&target, text.as_bytes())
            .await
            .map_err(|e| SiteFsError::io(&target, e))?;

        tracing::debug!(path = %target.display(), bytes = text.len(), "Wrote file");
        Ok(WriteReceipt {
            path: target,
            bytes: text.len(),
        })
    }

    /// Read a file relative to the project root, decoding invalid UTF-8 lossily.
    pub async fn read_file(&self, path: &str) -> Result<ReadOutcome, SiteFsError> {
        let target = self.sandbox.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(ReadOutcome::Content(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ReadOutcome::NotFound(target)),
            Err(e) => Err(SiteFsError::io(&target, e)),
        }
    }

    /// Every regular file under `base` (the root when `None`), as sorted
    /// root-relative paths. Symlinks are not followed.
    pub async fn list_files(&self, base: Option<&str>) -> Result<Vec<String>, SiteFsError> {
        let start = self.sandbox.resolve(base.unwrap_or("."))?;
        let meta = match tokio::fs::symlink_metadata(&start).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SiteFsError::io(&start, e)),
        };

        let mut files = Vec::new();
        if meta.is_file() {
            files.extend(self.sandbox.relative(&start));
            return Ok(files);
        }

        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| SiteFsError::io(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SiteFsError::io(&dir, e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| SiteFsError::io(&entry.path(), e))?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.extend(self.sandbox.relative(&entry.path()));
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Copy the bundled assets from `static_dir` into `<output>/static` so
    /// rewritten pages resolve. Missing sources are skipped.
    pub async fn sync_static_assets(&self, static_dir: &str) -> Result<Vec<String>, SiteFsError> {
        let source_dir = self.sandbox.resolve(static_dir)?;
        let dest_dir = self.sandbox.resolve(&format!("{}/static", self.output_dir))?;

        let mut copied = Vec::new();
        for name in BUNDLED_ASSETS {
            let src = source_dir.join(name);
            if !tokio::fs::try_exists(&src).await.unwrap_or(false) {
                tracing::debug!(asset = name, "Static asset not present, skipping");
                continue;
            }
            tokio::fs::create_dir_all(&dest_dir)
                .await
                .map_err(|e| SiteFsError::io(&dest_dir, e))?;
            let dst = dest_dir.join(name);
            tokio::fs::copy(&src, &dst)
                .await
                .map_err(|e| SiteFsError::io(&dst, e))?;
            copied.extend(self.sandbox.relative(&dst));
        }
        Ok(copied)
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html"))
}

fn rewrite_asset_links(content: &str) -> String {
    ASSET_REWRITES
        .iter()
        .fold(content.to_string(), |acc, (from, to)| acc.replace(from, to))
}
