//! Shallow git clones.

use async_trait::async_trait;
use git2::{build::RepoBuilder, opts, Cred, FetchOptions, RemoteCallbacks};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{DetectionError, Result};

/// What to clone.
#[derive(Clone)]
pub struct CloneRequest {
    pub url: String,
    pub revision: String,
    pub token: Option<String>,
}

impl std::fmt::Debug for CloneRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloneRequest")
            .field("url", &self.url)
            .field("revision", &self.revision)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Populates a directory with a repository checkout.
#[async_trait]
pub trait RepoCloner: Send + Sync {
    /// Clone `request` into `destination`, which exists and is empty.
    async fn clone_into(
        &self,
        request: &CloneRequest,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// libgit2-backed cloner: depth 1, single branch, no tags.
#[derive(Debug, Clone)]
pub struct Git2Cloner {
    timeout: Duration,
}

static CONFIGURE_TIMEOUTS: Once = Once::new();

impl Git2Cloner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn configure_timeouts(&self) {
        let timeout_ms = self.timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        CONFIGURE_TIMEOUTS.call_once(|| {
            // SAFETY: called once, before any clone runs on this process.
            let result = unsafe {
                opts::set_server_connect_timeout_in_milliseconds(timeout_ms)
                    .and_then(|()| opts::set_server_timeout_in_milliseconds(timeout_ms))
            };
            if let Err(e) = result {
                warn!(error = %e, "could not configure libgit2 timeouts");
            }
        });
    }

    fn perform_clone(
        request: &CloneRequest,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), git2::Error> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(token) = request.token.clone() {
            callbacks.credentials(move |_url, username_from_url, allowed| {
                if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                    Cred::userpass_plaintext(username_from_url.unwrap_or("x-access-token"), &token)
                } else {
                    Cred::default()
                }
            });
        }
        // Returning false aborts the transfer.
        let cancel = cancel.clone();
        callbacks.transfer_progress(move |_| !cancel.is_cancelled());

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options.download_tags(git2::AutotagOption::None);
        fetch_options.depth(1);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if !request.revision.is_empty() {
            builder.branch(&request.revision);
        }
        builder.clone(&request.url, destination)?;
        Ok(())
    }
}

#[async_trait]
impl RepoCloner for Git2Cloner {
    async fn clone_into(
        &self,
        request: &CloneRequest,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.configure_timeouts();
        info!(url = %request.url, revision = %request.revision, "cloning repository");

        let task_request = request.clone();
        let task_destination: PathBuf = destination.to_path_buf();
        let task_cancel = cancel.clone();
        let result = tokio::task::spawn_blocking(move || {
            Self::perform_clone(&task_request, &task_destination, &task_cancel)
        })
        .await?;

        if cancel.is_cancelled() {
            return Err(DetectionError::cancelled("clone"));
        }
        result.map_err(|e| DetectionError::clone_failed(&request.url, e.message()))?;
        debug!(url = %request.url, path = %destination.display(), "clone completed");
        Ok(())
    }
}
