//! Per-reconcile scratch directories.
//!
//! Each clone lands in its own directory under the workspace root and is
//! removed when the [`ScratchDir`] is dropped, whether detection finished,
//! failed or was cancelled.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Root under which scratch directories are created.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A fresh, uniquely named directory labelled with `label`.
    pub fn acquire(&self, label: &str) -> std::io::Result<ScratchDir> {
        let prefix = format!("{}-", sanitize_label(label));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.root)?;
        debug!(path = %dir.path().display(), "acquired scratch directory");
        Ok(ScratchDir { dir: Some(dir) })
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .take(48)
        .collect();
    if cleaned.is_empty() {
        "cdq".to_string()
    } else {
        cleaned
    }
}

/// Scratch directory removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.as_ref().map_or(Path::new(""), TempDir::path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(path = %path.display(), "removed scratch directory"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove scratch directory"),
            }
        }
    }
}
