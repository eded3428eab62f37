//! GitHub REST client.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::tokens::{Credential, CredentialSource};
use super::url::{raw_file_url, repo_coordinates, same_origin};
use super::{GitForge, RepoRef};
use crate::errors::{DetectionError, Result};
use crate::fetch::http::{request_error, HttpFetcher};
use crate::observability::{CounterKey, ForgeMetrics};

const ACCEPT: &str = "application/vnd.github+json";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    default_branch: String,
}

enum ApiOutcome {
    Found(Response),
    Missing,
}

/// GitHub forge client. Every call is counted per `(controller, token,
/// operation)`.
pub struct GitHubForge {
    http: HttpFetcher,
    api_url: String,
    controller: String,
    metrics: Arc<ForgeMetrics>,
}

impl GitHubForge {
    pub fn new(http: HttpFetcher, api_url: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            controller: controller.into(),
            metrics: ForgeMetrics::global(),
        }
    }

    /// Use a private counter set instead of the process-wide one.
    pub fn with_metrics(mut self, metrics: Arc<ForgeMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn key(&self, credential: &Credential, operation: &str) -> CounterKey {
        CounterKey::new(self.controller.as_str(), credential.name(), operation)
    }

    /// Token to send with a GET of `url`. Pooled tokens only go to the
    /// configured API origin; a CDQ secret goes wherever the CDQ points.
    fn token_for<'a>(&self, url: &str, credential: &'a Credential) -> Option<&'a str> {
        match credential.source() {
            CredentialSource::Secret => credential.repository_token(),
            CredentialSource::Pool if same_origin(url, &self.api_url) => credential.token(),
            CredentialSource::Pool | CredentialSource::Anonymous => None,
        }
    }

    async fn api_get(
        &self,
        url: &str,
        repo_url: &str,
        credential: &Credential,
        operation: &str,
    ) -> Result<ApiOutcome> {
        let key = self.key(credential, operation);
        self.metrics.record_call(&key);

        let mut request = self.http.client().get(url).header("Accept", ACCEPT);
        if let Some(token) = self.token_for(url, credential) {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| request_error(url, &e))?;

        match classify(&response) {
            Classified::Ok => Ok(ApiOutcome::Found(response)),
            Classified::Missing => Ok(ApiOutcome::Missing),
            Classified::RateLimited => {
                self.metrics.record_rate_limited(&key);
                warn!(
                    url = repo_url,
                    token = credential.name(),
                    operation,
                    "forge rate limit exhausted"
                );
                Err(DetectionError::RateLimited {
                    url: repo_url.to_string(),
                    token_name: credential.name().to_string(),
                })
            }
            Classified::Unauthorized => Err(DetectionError::Unauthorized {
                url: repo_url.to_string(),
            }),
            Classified::Transient(status) => Err(DetectionError::transient(format!(
                "GET {url} returned {status}"
            ))),
            Classified::Other(status) => Err(DetectionError::fetch_failed(url, status)),
        }
    }
}

enum Classified {
    Ok,
    Missing,
    RateLimited,
    Unauthorized,
    Transient(StatusCode),
    Other(StatusCode),
}

fn classify(response: &Response) -> Classified {
    let status = response.status();
    if status.is_success() {
        return Classified::Ok;
    }
    match status {
        StatusCode::NOT_FOUND => Classified::Missing,
        StatusCode::TOO_MANY_REQUESTS => Classified::RateLimited,
        StatusCode::FORBIDDEN if remaining_is_zero(response) => Classified::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Classified::Unauthorized,
        s if s.is_server_error() => Classified::Transient(s),
        s => Classified::Other(s),
    }
}

fn remaining_is_zero(response: &Response) -> bool {
    response
        .headers()
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

#[async_trait]
impl GitForge for GitHubForge {
    async fn default_branch(&self, repo_url: &str, credential: &Credential) -> Result<String> {
        let (owner, repo) = repo_coordinates(repo_url)?;
        let url = format!("{}/repos/{owner}/{repo}", self.api_url);

        match self.api_get(&url, repo_url, credential, "default_branch").await? {
            ApiOutcome::Found(response) => {
                let info: RepositoryInfo = response
                    .json()
                    .await
                    .map_err(|e| DetectionError::fetch_failed(&url, e))?;
                debug!(url = repo_url, branch = %info.default_branch, "resolved default branch");
                Ok(info.default_branch)
            }
            ApiOutcome::Missing => Err(DetectionError::RepoNotFound {
                url: repo_url.to_string(),
            }),
        }
    }

    async fn branch_exists(
        &self,
        repo_url: &str,
        branch: &str,
        credential: &Credential,
    ) -> Result<bool> {
        let (owner, repo) = repo_coordinates(repo_url)?;
        let url = format!("{}/repos/{owner}/{repo}/branches/{branch}", self.api_url);

        match self.api_get(&url, repo_url, credential, "branch_exists").await? {
            ApiOutcome::Found(_) => Ok(true),
            ApiOutcome::Missing => Ok(false),
        }
    }

    async fn fetch_raw(
        &self,
        repo: &RepoRef,
        path: &str,
        credential: &Credential,
    ) -> Result<Option<Vec<u8>>> {
        let url = raw_file_url(&repo.url, &repo.revision, "./", path)?;

        match self.api_get(&url, &repo.url, credential, "fetch_raw").await? {
            ApiOutcome::Found(response) => {
                let body = response.bytes().await.map_err(|e| request_error(&url, &e))?;
                Ok(Some(body.to_vec()))
            }
            ApiOutcome::Missing => Ok(None),
        }
    }
}
