//! Repository content access.
//!
//! A [`SourceReader`] reads files from a repository either over anonymous
//! raw-content URLs or from a local clone. Requests carrying a CDQ secret
//! always go through a clone; the rest read raw URLs and clone only when
//! a full scan is needed.

pub mod clone;
pub mod http;
pub mod workspace;

pub use clone::{CloneRequest, Git2Cloner, RepoCloner};
pub use http::HttpFetcher;
pub use workspace::{ScratchDir, Workspace};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::{DetectionError, Result};
use crate::forge::url::join_context;
use crate::forge::{Credential, GitForge, RepoRef};

/// A local checkout, deleted when dropped.
#[derive(Debug)]
pub struct Checkout {
    scratch: ScratchDir,
}

impl Checkout {
    pub fn root(&self) -> &Path {
        self.scratch.path()
    }

    /// Directory of a context inside the checkout.
    pub fn context_dir(&self, context: &str) -> PathBuf {
        let relative = join_context(context, "");
        let relative = relative.trim_end_matches('/');
        if relative.is_empty() {
            self.root().to_path_buf()
        } else {
            self.root().join(relative)
        }
    }
}

/// Reads repository files by path relative to the repository root.
#[derive(Clone)]
pub enum SourceReader {
    /// Anonymous raw-content reads through the forge.
    Remote {
        forge: Arc<dyn GitForge>,
        repo: RepoRef,
        credential: Credential,
    },
    /// Reads from a checkout.
    Local { checkout: Arc<Checkout> },
}

impl SourceReader {
    /// Content of `path`, `Ok(None)` if absent.
    pub async fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Remote {
                forge,
                repo,
                credential,
            } => forge.fetch_raw(repo, path, credential).await,
            Self::Local { checkout } => {
                let full = checkout.root().join(path);
                match tokio::fs::read(&full).await {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e)
                        if matches!(
                            e.kind(),
                            std::io::ErrorKind::NotFound | std::io::ErrorKind::IsADirectory
                        ) =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// First of `candidates` present under `context`, with its content.
    /// The returned path is relative to the context.
    pub async fn find_first(
        &self,
        context: &str,
        candidates: &[&str],
    ) -> Result<Option<(String, Vec<u8>)>> {
        for candidate in candidates {
            if let Some(bytes) = self.read(&join_context(context, candidate)).await? {
                return Ok(Some(((*candidate).to_string(), bytes)));
            }
        }
        Ok(None)
    }

    pub fn checkout(&self) -> Option<&Arc<Checkout>> {
        match self {
            Self::Local { checkout } => Some(checkout),
            Self::Remote { .. } => None,
        }
    }
}

/// Opens readers and checkouts for one repository.
#[derive(Clone)]
pub struct RepositoryFetcher {
    forge: Arc<dyn GitForge>,
    cloner: Arc<dyn RepoCloner>,
    workspace: Workspace,
}

impl RepositoryFetcher {
    pub fn new(forge: Arc<dyn GitForge>, cloner: Arc<dyn RepoCloner>, workspace: Workspace) -> Self {
        Self {
            forge,
            cloner,
            workspace,
        }
    }

    pub fn forge(&self) -> &Arc<dyn GitForge> {
        &self.forge
    }

    /// Reader for the repository: a checkout for secret-backed
    /// credentials, raw URLs otherwise.
    pub async fn open(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<SourceReader> {
        if credential.requires_checkout() {
            let checkout = self.checkout(repo, credential, label, cancel).await?;
            return Ok(SourceReader::Local {
                checkout: Arc::new(checkout),
            });
        }
        Ok(SourceReader::Remote {
            forge: Arc::clone(&self.forge),
            repo: repo.clone(),
            credential: credential.clone(),
        })
    }

    /// Clone into a fresh scratch directory.
    pub async fn checkout(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Checkout> {
        if cancel.is_cancelled() {
            return Err(DetectionError::cancelled("clone"));
        }
        let scratch = self.workspace.acquire(label)?;
        let request = CloneRequest {
            url: repo.url.clone(),
            revision: repo.revision.clone(),
            token: credential.repository_token().map(str::to_string),
        };
        RepoCloner::clone_into(
            self.cloner.as_ref(),
            &request,
            scratch.path(),
            cancel,
        )
        .await?;
        Ok(Checkout { scratch })
    }
}
