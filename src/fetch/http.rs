//! Plain HTTP GETs of remote documents (devfiles, registry index, raw
//! repository files).

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::errors::{DetectionError, Result};

const USER_AGENT: &str = concat!("component-detector/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DetectionError::internal(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url`; `Ok(None)` on 404.
    pub async fn get_optional(&self, url: &str, bearer: Option<&str>) -> Result<Option<Vec<u8>>> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| request_error(url, &e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url, "remote document not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DetectionError::fetch_failed(url, status));
        }

        let body = response.bytes().await.map_err(|e| request_error(url, &e))?;
        Ok(Some(body.to_vec()))
    }

    /// GET `url`; a 404 is a [`DetectionError::FetchFailed`].
    pub async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.get_optional(url, None)
            .await?
            .ok_or_else(|| DetectionError::fetch_failed(url, StatusCode::NOT_FOUND))
    }
}

/// Map a transport error. Timeouts may succeed on a later attempt.
pub(crate) fn request_error(url: &str, err: &reqwest::Error) -> DetectionError {
    if err.is_timeout() {
        DetectionError::transient(format!("GET {url} timed out"))
    } else {
        DetectionError::fetch_failed(url, err)
    }
}
