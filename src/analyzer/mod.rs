//! Language and framework detection over a checkout.
//!
//! A project is a directory holding a recognised build manifest. Projects
//! nested inside another project are folded into it. Results are ordered
//! so the first entry is the most likely component:
//!
//! 1. a project at the scanned directory itself
//! 2. shallower projects before deeper ones
//! 3. path order

pub mod languages;
pub mod ports;

pub use languages::Language;

use ignore::{DirEntry, WalkBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{DetectionError, Result};

/// Directories never descended into.
const SKIPPED_DIRS: [&str; 11] = [
    "node_modules",
    "target",
    "vendor",
    "build",
    "dist",
    "venv",
    "__pycache__",
    "bin",
    "obj",
    "out",
    "coverage",
];

pub(crate) fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedProject {
    pub path: PathBuf,
    pub language: Language,
    pub framework: Option<String>,
    pub ports: Vec<u16>,
}

impl DetectedProject {
    /// First path component below `root`, if the project is not `root`.
    pub fn top_level_dir(&self, root: &Path) -> Option<String> {
        self.path
            .strip_prefix(root)
            .ok()?
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
    }
}

/// Detects projects below a directory. Blocking; run it off the async
/// runtime.
pub trait LanguageAnalyzer: Send + Sync {
    fn detect_projects(&self, workdir: &Path, cancel: &CancellationToken) -> Result<Vec<DetectedProject>>;
}

/// Manifest-driven analyzer.
#[derive(Debug, Clone)]
pub struct ManifestAnalyzer {
    max_depth: usize,
}

impl Default for ManifestAnalyzer {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

impl ManifestAnalyzer {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Manifest file names per directory.
    fn collect_manifests(
        &self,
        workdir: &Path,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<PathBuf, Vec<(Language, String)>>> {
        let walker = WalkBuilder::new(workdir)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .max_depth(Some(self.max_depth))
            .filter_entry(|e| !is_skipped_dir(e))
            .build();

        let mut manifests: BTreeMap<PathBuf, Vec<(Language, String)>> = BTreeMap::new();
        for entry in walker {
            if cancel.is_cancelled() {
                return Err(DetectionError::cancelled("analysis"));
            }
            let Ok(entry) = entry else {
                continue;
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let (Some(language), Some(parent)) = (Language::from_manifest(&name), entry.path().parent())
            else {
                continue;
            };
            manifests
                .entry(parent.to_path_buf())
                .or_default()
                .push((language, name));
        }
        Ok(manifests)
    }
}

impl LanguageAnalyzer for ManifestAnalyzer {
    fn detect_projects(&self, workdir: &Path, cancel: &CancellationToken) -> Result<Vec<DetectedProject>> {
        if !workdir.is_dir() {
            return Ok(Vec::new());
        }
        let manifests = self.collect_manifests(workdir, cancel)?;

        // Shallow directories first so nested projects can be folded.
        let mut dirs: Vec<&PathBuf> = manifests.keys().collect();
        dirs.sort_by_key(|d| (d.components().count(), (*d).clone()));

        let mut kept: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if kept.iter().any(|k| dir.starts_with(k)) {
                continue;
            }
            kept.push(dir.clone());
        }

        let mut projects = Vec::with_capacity(kept.len());
        for dir in kept {
            if cancel.is_cancelled() {
                return Err(DetectionError::cancelled("analysis"));
            }
            let entries = &manifests[&dir];
            let Some(language) = entries.iter().map(|(l, _)| *l).min_by_key(|l| l.rank()) else {
                continue;
            };
            let language = languages::refine_language(language, &dir);
            let names: Vec<String> = entries.iter().map(|(_, n)| n.clone()).collect();
            let framework = languages::detect_framework(language, &dir, &names);
            let ports = ports::detect_ports(&dir, language);
            debug!(
                path = %dir.display(),
                %language,
                framework = framework.as_deref().unwrap_or(""),
                "detected project"
            );
            projects.push(DetectedProject {
                path: dir,
                language,
                framework,
                ports,
            });
        }

        projects.sort_by_key(|p| {
            (
                p.path != workdir,
                p.path.components().count(),
                p.path.clone(),
            )
        });
        Ok(projects)
    }
}

/// Run `analyzer` on a blocking thread.
pub async fn detect_projects_blocking(
    analyzer: std::sync::Arc<dyn LanguageAnalyzer>,
    workdir: PathBuf,
    cancel: CancellationToken,
) -> Result<Vec<DetectedProject>> {
    tokio::task::spawn_blocking(move || analyzer.detect_projects(&workdir, &cancel)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn analyze(root: &Path) -> Vec<DetectedProject> {
        ManifestAnalyzer::default()
            .detect_projects(root, &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn test_root_project_folds_nested_ones() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pom.xml", "<artifactId>quarkus-core</artifactId>");
        write(dir.path(), "frontend/package.json", "{}");

        let projects = analyze(dir.path());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].path, dir.path());
        assert_eq!(projects[0].language, Language::Java);
        assert_eq!(projects[0].framework.as_deref(), Some("Quarkus"));
    }

    #[test]
    fn test_multi_component_repository() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "python/requirements.txt", "flask==2.0\n");
        write(dir.path(), "nodejs/package.json", r#"{"dependencies":{"express":"4"}}"#);
        write(dir.path(), "README.md", "# demo");

        let projects = analyze(dir.path());
        let langs: Vec<_> = projects.iter().map(|p| p.language).collect();
        assert_eq!(langs, vec![Language::JavaScript, Language::Python]);
        assert_eq!(projects[0].framework.as_deref(), Some("Express"));
        assert_eq!(projects[1].top_level_dir(dir.path()).as_deref(), Some("python"));
    }

    #[test]
    fn test_java_wins_over_auxiliary_package_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "package.json", "{}");
        write(dir.path(), "build.gradle", "plugins { id 'org.springframework.boot' }");
        let projects = analyze(dir.path());
        assert_eq!(projects[0].language, Language::Java);
    }

    #[test]
    fn test_skipped_and_hidden_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "node_modules/lib/package.json", "{}");
        write(dir.path(), ".cache/go.mod", "module x");
        assert!(analyze(dir.path()).is_empty());
    }

    #[test]
    fn test_cancellation_stops_walk() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "go.mod", "module x");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ManifestAnalyzer::default()
            .detect_projects(dir.path(), &cancel)
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(analyze(&dir.path().join("absent")).is_empty());
    }
}
