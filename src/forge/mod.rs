//! Git forge access: default-branch lookup, branch checks and raw file
//! reads.
//!
//! The [`GitForge`] trait is the seam between detection and the forge's
//! REST API. [`GitHubForge`] is the production implementation; tests
//! point it at a mock server.

pub mod github;
pub mod tokens;
pub mod url;

pub use github::GitHubForge;
pub use tokens::{Credential, CredentialSource, TokenPool};

use async_trait::async_trait;

use crate::errors::Result;

/// Repository coordinates at a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub url: String,
    pub revision: String,
}

impl RepoRef {
    pub fn new(url: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            revision: revision.into(),
        }
    }
}

/// Operations the detector needs from a git forge.
#[async_trait]
pub trait GitForge: Send + Sync {
    /// Default branch of a repository.
    async fn default_branch(&self, repo_url: &str, credential: &Credential) -> Result<String>;

    /// Whether `branch` exists.
    async fn branch_exists(
        &self,
        repo_url: &str,
        branch: &str,
        credential: &Credential,
    ) -> Result<bool>;

    /// Raw content of `path` at the repository's revision. `Ok(None)` when
    /// the file does not exist.
    async fn fetch_raw(
        &self,
        repo: &RepoRef,
        path: &str,
        credential: &Credential,
    ) -> Result<Option<Vec<u8>>>;
}

/// Revision to inspect: the requested one, else the forge default.
///
/// When the default-branch lookup fails for any reason other than rate
/// limiting, `main` is assumed. The branch is then checked for logging only.
pub async fn resolve_revision(
    forge: &dyn GitForge,
    repo_url: &str,
    requested: &str,
    credential: &Credential,
) -> Result<String> {
    let requested = requested.trim();
    if !requested.is_empty() {
        return Ok(requested.to_string());
    }

    match forge.default_branch(repo_url, credential).await {
        Ok(branch) => Ok(branch),
        Err(err @ crate::errors::DetectionError::RateLimited { .. }) => Err(err),
        Err(err) => {
            tracing::warn!(
                url = repo_url,
                error = %err,
                "default branch lookup failed, falling back to main"
            );
            // A missing main is only logged. The later read or clone fails
            // with its own error, which for a private repo without a secret
            // is "failed to clone the repo".
            match forge.branch_exists(repo_url, "main", credential).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(url = repo_url, "branch main does not exist"),
                Err(check) => tracing::debug!(url = repo_url, error = %check, "branch check failed"),
            }
            Ok("main".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DetectionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubForge {
        default: fn() -> Result<String>,
        branch_checks: AtomicUsize,
    }

    #[async_trait]
    impl GitForge for StubForge {
        async fn default_branch(&self, _: &str, _: &Credential) -> Result<String> {
            (self.default)()
        }

        async fn branch_exists(&self, _: &str, _: &str, _: &Credential) -> Result<bool> {
            self.branch_checks.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn fetch_raw(&self, _: &RepoRef, _: &str, _: &Credential) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    fn forge(default: fn() -> Result<String>) -> StubForge {
        StubForge {
            default,
            branch_checks: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_requested_revision_wins() {
        let forge = forge(|| Ok("develop".into()));
        let rev = resolve_revision(&forge, "u", " v1 ", &Credential::anonymous())
            .await
            .unwrap();
        assert_eq!(rev, "v1");
    }

    #[tokio::test]
    async fn test_default_branch_used_when_unset() {
        let forge = forge(|| Ok("develop".into()));
        let rev = resolve_revision(&forge, "u", "", &Credential::anonymous())
            .await
            .unwrap();
        assert_eq!(rev, "develop");
        assert_eq!(forge.branch_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_main() {
        let forge = forge(|| Err(DetectionError::RepoNotFound { url: "u".into() }));
        let rev = resolve_revision(&forge, "u", "", &Credential::anonymous())
            .await
            .unwrap();
        assert_eq!(rev, "main");
        assert_eq!(forge.branch_checks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_surfaced() {
        let forge = forge(|| {
            Err(DetectionError::RateLimited {
                url: "u".into(),
                token_name: "default".into(),
            })
        });
        let err = resolve_revision(&forge, "u", "", &Credential::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, DetectionError::RateLimited { .. }));
    }
}
