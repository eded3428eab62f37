//! Scan outcomes.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::registry::SampleMatch;

/// What was found for one context.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    Devfile {
        bytes: Vec<u8>,
        url: String,
        dockerfile_url: Option<String>,
    },
    Dockerfile {
        url: String,
    },
}

/// A finding plus analyzer hints for its context.
#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    pub finding: Finding,
    /// `None` when the context was not analyzed.
    pub ports: Option<Vec<u16>>,
    pub language: Option<String>,
}

impl Detected {
    pub fn devfile(bytes: Vec<u8>, url: impl Into<String>, dockerfile_url: Option<String>) -> Self {
        Self {
            finding: Finding::Devfile {
                bytes,
                url: url.into(),
                dockerfile_url,
            },
            ports: None,
            language: None,
        }
    }

    pub fn dockerfile(url: impl Into<String>) -> Self {
        Self {
            finding: Finding::Dockerfile { url: url.into() },
            ports: None,
            language: None,
        }
    }

    pub fn from_sample(sample: SampleMatch) -> Self {
        Self::devfile(
            sample.devfile.as_ref().clone(),
            sample.devfile_url,
            sample.dockerfile_url,
        )
    }
}

/// How a repository was resolved, in order of precedence.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The CDQ named a devfile or Dockerfile URL.
    Explicit(Detected),
    DevfileInTree(Detected),
    DockerfileInTree(Detected),
    /// Found by analyzing a checkout; keyed by context.
    Scanned(BTreeMap<String, Detected>),
}

impl Resolution {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "explicit",
            Self::DevfileInTree(_) => "devfile-in-tree",
            Self::DockerfileInTree(_) => "dockerfile-in-tree",
            Self::Scanned(_) => "scanned",
        }
    }

    /// Flatten into per-context maps.
    pub fn lower(self, context: &str) -> ScanResult {
        let entries = match self {
            Self::Explicit(d) | Self::DevfileInTree(d) | Self::DockerfileInTree(d) => {
                BTreeMap::from([(context.to_string(), d)])
            }
            Self::Scanned(map) => map,
        };

        let mut result = ScanResult::default();
        for (ctx, detected) in entries {
            match detected.finding {
                Finding::Devfile {
                    bytes,
                    url,
                    dockerfile_url,
                } => {
                    result.devfiles.insert(ctx.clone(), bytes);
                    result.devfile_urls.insert(ctx.clone(), url);
                    if let Some(dockerfile) = dockerfile_url {
                        result.dockerfile_urls.insert(ctx.clone(), dockerfile);
                    }
                }
                Finding::Dockerfile { url } => {
                    result.dockerfile_urls.insert(ctx.clone(), url);
                }
            }
            if let Some(ports) = detected.ports {
                result.ports.insert(ctx.clone(), ports);
            }
            if let Some(language) = detected.language {
                result.languages.insert(ctx, language);
            }
        }
        result
    }
}

/// Per-context detection maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanResult {
    #[serde(skip)]
    pub devfiles: BTreeMap<String, Vec<u8>>,
    pub devfile_urls: BTreeMap<String, String>,
    pub dockerfile_urls: BTreeMap<String, String>,
    pub ports: BTreeMap<String, Vec<u16>>,
    pub languages: BTreeMap<String, String>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.devfiles.is_empty() && self.dockerfile_urls.is_empty()
    }

    /// Contexts holding a devfile or a Dockerfile.
    pub fn contexts(&self) -> BTreeSet<&str> {
        self.devfiles
            .keys()
            .chain(self.dockerfile_urls.keys())
            .map(String::as_str)
            .collect()
    }
}
