//! Forge credentials.
//!
//! A [`Credential`] is what a single detection uses against the forge. It
//! comes either from the CDQ's secret or from the controller's
//! [`TokenPool`].

use std::collections::BTreeMap;
use std::fmt;

/// Name reported for the pool's default token.
pub const DEFAULT_TOKEN_NAME: &str = "default";
/// Name reported for requests made without a token.
pub const ANONYMOUS_TOKEN_NAME: &str = "anonymous";

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// The CDQ's own secret; repository content is read through a clone.
    Secret,
    /// The controller's token pool.
    Pool,
    Anonymous,
}

/// A named forge token. The token value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    name: String,
    token: Option<String>,
    source: CredentialSource,
}

impl Credential {
    pub fn anonymous() -> Self {
        Self {
            name: ANONYMOUS_TOKEN_NAME.to_string(),
            token: None,
            source: CredentialSource::Anonymous,
        }
    }

    /// Credential read from the secret `name`.
    pub fn from_secret(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: Some(token.into()),
            source: CredentialSource::Secret,
        }
    }

    pub fn pooled(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: Some(token.into()),
            source: CredentialSource::Pool,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Whether repository content must be read through an authenticated
    /// clone rather than anonymous raw URLs.
    pub fn requires_checkout(&self) -> bool {
        self.source == CredentialSource::Secret
    }

    /// Token allowed on the repository host itself (raw reads, clones).
    /// Only a CDQ secret qualifies; pooled tokens stay on the forge API.
    pub fn repository_token(&self) -> Option<&str> {
        match self.source {
            CredentialSource::Secret => self.token(),
            CredentialSource::Pool | CredentialSource::Anonymous => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .finish()
    }
}

/// Tokens available to the controller for forge API calls.
#[derive(Clone, Default)]
pub struct TokenPool {
    default: Option<String>,
    named: BTreeMap<String, String>,
}

impl TokenPool {
    pub fn new(default: Option<String>, named: BTreeMap<String, String>) -> Self {
        Self { default, named }
    }

    /// Credential for requests without a CDQ secret: the default token,
    /// else the first named token, else anonymous.
    pub fn credential(&self) -> Credential {
        if let Some(token) = &self.default {
            return Credential::pooled(DEFAULT_TOKEN_NAME, token.clone());
        }
        self.named
            .iter()
            .next()
            .map(|(name, token)| Credential::pooled(name.clone(), token.clone()))
            .unwrap_or_else(Credential::anonymous)
    }

    pub fn len(&self) -> usize {
        self.named.len() + usize::from(self.default.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TokenPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPool")
            .field("default", &self.default.is_some())
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish()
    }
}
