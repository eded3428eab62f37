//! Error types for component detection.
//!
//! Every failure the detection engine can produce is a [`DetectionError`]
//! variant. Each variant carries a stable [`ErrorCode`] so status messages and
//! logs can be matched programmatically.
//!
//! # Error Codes
//!
//! - E001-E009: request and credential errors
//! - E010-E019: forge API errors
//! - E020-E029: repository access errors
//! - E030-E039: devfile errors
//! - E040-E049: detection outcomes
//! - E050-E059: cluster API errors
//! - E099: internal errors
//!
//! # Example
//!
//! ```rust
//! use component_detector::errors::{DetectionError, ErrorCode};
//!
//! let err = DetectionError::clone_failed("https://github.com/org/private", "authentication required");
//! assert_eq!(err.code(), ErrorCode::CLONE_FAILED);
//! assert!(err.to_string().contains("failed to clone the repo"));
//! assert!(!err.is_retryable());
//! ```

use serde::Serialize;
use thiserror::Error;

/// Structured error code for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Invalid CDQ spec (bad URL, bad context)
    pub const INVALID_SPEC: ErrorCode = ErrorCode("E001");
    /// Referenced secret is missing or has no password
    pub const SECRET_NOT_FOUND: ErrorCode = ErrorCode("E002");

    /// Repository does not exist or is not visible to the token
    pub const REPO_NOT_FOUND: ErrorCode = ErrorCode("E010");
    /// Branch does not exist
    pub const BRANCH_NOT_FOUND: ErrorCode = ErrorCode("E011");
    /// Credentials rejected
    pub const UNAUTHORIZED: ErrorCode = ErrorCode("E012");
    /// Forge API rate limit hit
    pub const RATE_LIMITED: ErrorCode = ErrorCode("E013");
    /// Network failure, timeout or cancellation
    pub const TRANSIENT: ErrorCode = ErrorCode("E014");

    /// `git clone` failed
    pub const CLONE_FAILED: ErrorCode = ErrorCode("E020");
    /// HTTP GET of a remote document failed
    pub const FETCH_FAILED: ErrorCode = ErrorCode("E021");

    /// Devfile could not be decoded or has no outer-loop definition
    pub const INVALID_DEVFILE: ErrorCode = ErrorCode("E030");

    /// Detection finished without finding anything
    pub const NO_COMPONENTS: ErrorCode = ErrorCode("E040");

    /// Kubernetes API failure
    pub const CLUSTER: ErrorCode = ErrorCode("E050");

    /// Unexpected failure
    pub const INTERNAL: ErrorCode = ErrorCode("E099");

    /// Get the error code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors produced while detecting components for a ComponentDetectionQuery.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The CDQ spec cannot be processed as given.
    #[error("{message}")]
    InvalidSpec { message: String },

    /// The referenced credential could not be resolved.
    #[error("{message}")]
    SecretNotFound { message: String },

    #[error("repository {url} not found")]
    RepoNotFound { url: String },

    #[error("branch {branch} not found in {url}")]
    BranchNotFound { url: String, branch: String },

    #[error("unauthorized to access {url}")]
    Unauthorized { url: String },

    /// Rate limit exhausted for the token used against the forge.
    #[error("rate limited by {url} while using token {token_name}")]
    RateLimited { url: String, token_name: String },

    /// Network failures, deadlines and cancellation.
    #[error("{message}")]
    Transient { message: String },

    #[error("failed to clone the repo {url}: {reason}")]
    CloneFailed { url: String, reason: String },

    #[error("unable to GET {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("{message}")]
    InvalidDevfile { message: String },

    /// Detection succeeded but nothing buildable was found.
    #[error("no components detected in {url}")]
    NoComponentsDetected { url: String },

    #[error("kubernetes API error: {0}")]
    Cluster(#[from] kube::Error),

    #[error("{0}")]
    Internal(String),
}

impl DetectionError {
    // ==========================================================================
    // Constructor Methods
    // ==========================================================================

    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    pub fn secret_not_found(message: impl Into<String>) -> Self {
        Self::SecretNotFound {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn clone_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::CloneFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_devfile(message: impl Into<String>) -> Self {
        Self::InvalidDevfile {
            message: message.into(),
        }
    }

    /// Devfile body that could not be decoded.
    pub fn devfile_decode(reason: impl std::fmt::Display) -> Self {
        Self::InvalidDevfile {
            message: format!("failed to decode devfile json: {reason}"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Cancellation of the reconcile that owns the operation.
    pub fn cancelled(operation: &str) -> Self {
        Self::transient(format!("{operation} cancelled"))
    }

    // ==========================================================================
    // Accessor Methods
    // ==========================================================================

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSpec { .. } => ErrorCode::INVALID_SPEC,
            Self::SecretNotFound { .. } => ErrorCode::SECRET_NOT_FOUND,
            Self::RepoNotFound { .. } => ErrorCode::REPO_NOT_FOUND,
            Self::BranchNotFound { .. } => ErrorCode::BRANCH_NOT_FOUND,
            Self::Unauthorized { .. } => ErrorCode::UNAUTHORIZED,
            Self::RateLimited { .. } => ErrorCode::RATE_LIMITED,
            Self::Transient { .. } => ErrorCode::TRANSIENT,
            Self::CloneFailed { .. } => ErrorCode::CLONE_FAILED,
            Self::FetchFailed { .. } => ErrorCode::FETCH_FAILED,
            Self::InvalidDevfile { .. } => ErrorCode::INVALID_DEVFILE,
            Self::NoComponentsDetected { .. } => ErrorCode::NO_COMPONENTS,
            Self::Cluster(_) => ErrorCode::CLUSTER,
            Self::Internal(_) => ErrorCode::INTERNAL,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self.code().as_str().as_bytes().get(2) {
            Some(b'0') => "Request",
            Some(b'1') => "Forge",
            Some(b'2') => "Repository",
            Some(b'3') => "Devfile",
            Some(b'4') => "Detection",
            Some(b'5') => "Cluster",
            _ => "Internal",
        }
    }

    // ==========================================================================
    // Classification Methods
    // ==========================================================================

    /// Whether a later attempt could succeed without changing the request.
    ///
    /// The engine never retries on its own; this only drives logging and the
    /// controller's error policy.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Transient { .. } | Self::Cluster(_)
        )
    }

    /// "No components" is a successful terminal outcome, not a failure.
    #[must_use]
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::NoComponentsDetected { .. })
    }
}

impl From<std::io::Error> for DetectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DetectionError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {err}"))
    }
}

/// Result type alias using [`DetectionError`].
pub type Result<T> = std::result::Result<T, DetectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_categories() {
        assert_eq!(
            DetectionError::invalid_spec("bad").category(),
            "Request"
        );
        assert_eq!(
            DetectionError::RateLimited {
                url: "u".into(),
                token_name: "default".into()
            }
            .category(),
            "Forge"
        );
        assert_eq!(DetectionError::clone_failed("u", "x").category(), "Repository");
        assert_eq!(DetectionError::devfile_decode("x").category(), "Devfile");
        assert_eq!(
            DetectionError::NoComponentsDetected { url: "u".into() }.category(),
            "Detection"
        );
        assert_eq!(DetectionError::internal("boom").category(), "Internal");
    }

    #[test]
    fn test_messages_keep_contract_phrases() {
        let clone = DetectionError::clone_failed("https://github.com/a/b", "auth required");
        assert!(clone.to_string().starts_with("failed to clone the repo"));

        let fetch = DetectionError::fetch_failed("https://example.com/devfile.yaml", "404");
        assert!(fetch.to_string().starts_with("unable to GET"));

        let decode = DetectionError::devfile_decode("missing field");
        assert_eq!(
            decode.to_string(),
            "failed to decode devfile json: missing field"
        );
    }

    #[test]
    fn test_retry_classification() {
        assert!(DetectionError::transient("timeout").is_retryable());
        assert!(DetectionError::RateLimited {
            url: "u".into(),
            token_name: "t".into()
        }
        .is_retryable());
        assert!(!DetectionError::clone_failed("u", "x").is_retryable());
        assert!(!DetectionError::invalid_devfile("x").is_retryable());
    }

    #[test]
    fn test_no_components_is_terminal_success() {
        assert!(DetectionError::NoComponentsDetected { url: "u".into() }.is_terminal_success());
        assert!(!DetectionError::internal("x").is_terminal_success());
    }
}
