//! Base-directory-confined file access for the serving and rendering helpers.
//!
//! Every path handed to [`StaticFiles`] is percent-decoded, joined onto the base directory,
//! normalised, and then checked to still sit under that directory. The check compares the
//! path text against `base + separator`, so a sibling such as `public-evil/` is not mistaken
//! for `public/`. Existing files are additionally canonicalised and re-checked so a symlink
//! cannot lead outside the base.

use minijinja::Environment;
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    /// Relative base directories are anchored at the current working directory.
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        let base: PathBuf = base.into();
        let base_dir = if base.is_absolute() {
            base
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&base))
                .unwrap_or(base)
        };
        Self {
            base_dir: normalize(&base_dir),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `requested` under the base directory or fail with [`Error::PathTraversal`].
    ///
    /// The file does not need to exist.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf> {
        let traversal = || Error::PathTraversal {
            path: requested.to_string(),
        };

        let decoded = urlencoding::decode(requested).map_err(|_| traversal())?;
        if decoded.contains('\0') {
            return Err(traversal());
        }

        let relative = decoded.trim_start_matches(['/', '\\']);
        let candidate = normalize(&self.base_dir.join(relative));
        if !is_within(&self.base_dir, &candidate) {
            warn!(requested = %requested, "Rejected path outside base directory");
            return Err(traversal());
        }

        if let (Ok(real_base), Ok(real)) = (
            std::fs::canonicalize(&self.base_dir),
            std::fs::canonicalize(&candidate),
        ) {
            if !is_within(&real_base, &real) {
                warn!(requested = %requested, "Rejected symlink outside base directory");
                return Err(traversal());
            }
            return Ok(real);
        }

        Ok(candidate)
    }

    /// Open a file under the base directory for streaming.
    pub async fn open(&self, requested: &str) -> Result<(tokio::fs::File, &'static str)> {
        let path = self.resolve(requested)?;
        let meta = tokio::fs::metadata(&path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found").into());
        }
        let file = tokio::fs::File::open(&path).await?;
        Ok((file, content_type(&path)))
    }

    /// Render a minijinja template stored under the base directory.
    pub async fn render<S: Serialize>(&self, template: &str, data: &S) -> Result<String> {
        let path = self.resolve(template)?;
        let source = tokio::fs::read_to_string(&path).await?;
        let mut env = Environment::new();
        env.add_template(template, &source)?;
        let rendered = env.get_template(template)?.render(data)?;
        Ok(rendered)
    }
}

/// Content type by file extension.
#[must_use]
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
        .as_str()
    {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `candidate` equals `base` or starts with `base` followed by a separator.
fn is_within(base: &Path, candidate: &Path) -> bool {
    let base = base.to_string_lossy();
    let candidate = candidate.to_string_lossy();
    if candidate == base {
        return true;
    }
    let mut prefix = base.into_owned();
    if !prefix.ends_with(MAIN_SEPARATOR) {
        prefix.push(MAIN_SEPARATOR);
    }
    candidate.starts_with(&prefix)
}
