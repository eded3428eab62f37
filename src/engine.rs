//! End-to-end detection for one request.
//!
//! The engine normalizes the git source, resolves the revision, scans the
//! repository and builds component stubs. The whole run is bounded by a
//! deadline and by the caller's cancellation token; either one drops the
//! in-flight work, which releases any scratch checkout.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::analyzer::ManifestAnalyzer;
use crate::api::{ComponentDetectionDescription, GitSource};
use crate::config::ControllerConfig;
use crate::devfile::{DevfileParser, YamlDevfileParser};
use crate::errors::{DetectionError, Result};
use crate::fetch::{Git2Cloner, HttpFetcher, RepositoryFetcher, Workspace};
use crate::forge::url::{normalize_context, normalize_repo_url, validate_escapes};
use crate::forge::{resolve_revision, Credential, GitForge, GitHubForge, RepoRef};
use crate::observability::metrics::ForgeMetrics;
use crate::registry::RegistryMatcher;
use crate::scanner::{RepositoryScanner, ScanRequest, ScanResult};
use crate::stub::{ComponentLookup, StubBuilder, StubSource};

/// One detection to run.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub git_source: GitSource,
    pub credential: Credential,
    pub namespace: String,
    /// Scratch directory label, usually `<namespace>-<name>`.
    pub label: String,
    pub generate_component_name: bool,
}

/// What a detection produced.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub url: String,
    pub revision: String,
    pub scan: ScanResult,
    pub components: BTreeMap<String, ComponentDetectionDescription>,
}

pub struct DetectionEngine {
    forge: Arc<dyn GitForge>,
    scanner: RepositoryScanner,
    stubs: StubBuilder,
    deadline: Duration,
}

impl DetectionEngine {
    pub fn new(forge: Arc<dyn GitForge>, scanner: RepositoryScanner, deadline: Duration) -> Self {
        let stubs = StubBuilder::new(Arc::clone(scanner.parser()));
        Self {
            forge,
            scanner,
            stubs,
            deadline,
        }
    }

    /// Production wiring: GitHub forge, libgit2 clones, the configured
    /// registry and workspace.
    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        let http = HttpFetcher::new(config.timeouts.http())?;
        let forge: Arc<dyn GitForge> = Arc::new(
            GitHubForge::new(http.clone(), &config.github_api_url, &config.controller_name)
                .with_metrics(ForgeMetrics::global()),
        );
        let parser: Arc<dyn DevfileParser> = Arc::new(YamlDevfileParser::new(http.clone()));
        let registry = Arc::new(RegistryMatcher::new(
            &config.registry_url,
            http.clone(),
            Arc::clone(&parser),
            config.detection.sample_cache_capacity,
        ));
        let fetcher = RepositoryFetcher::new(
            Arc::clone(&forge),
            Arc::new(Git2Cloner::new(config.timeouts.git_clone())),
            Workspace::new(&config.workspace_root)?,
        );
        let scanner = RepositoryScanner::new(
            fetcher,
            http,
            parser,
            Arc::new(ManifestAnalyzer::new(config.detection.max_scan_depth)),
            registry,
        )
        .with_port_detection(config.detection.detect_ports);

        Ok(Self::new(forge, scanner, config.timeouts.reconcile()))
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run a detection under the engine deadline and `cancel`.
    pub async fn detect(
        &self,
        request: &DetectionRequest,
        lookup: &dyn ComponentLookup,
        cancel: &CancellationToken,
    ) -> Result<DetectionOutcome> {
        let scoped = cancel.child_token();
        tokio::select! {
            outcome = self.run(request, lookup, &scoped) => outcome,
            _ = cancel.cancelled() => Err(DetectionError::cancelled("detection")),
            _ = tokio::time::sleep(self.deadline) => {
                scoped.cancel();
                Err(DetectionError::transient(format!(
                    "detection timed out after {}s",
                    self.deadline.as_secs()
                )))
            }
        }
    }

    async fn run(
        &self,
        request: &DetectionRequest,
        lookup: &dyn ComponentLookup,
        cancel: &CancellationToken,
    ) -> Result<DetectionOutcome> {
        let source = &request.git_source;
        validate_escapes(&source.url).map_err(DetectionError::invalid_spec)?;
        let url = normalize_repo_url(&source.url)?;
        let context = normalize_context(&source.context)?;

        let revision = resolve_revision(
            self.forge.as_ref(),
            &url,
            &source.revision,
            &request.credential,
        )
        .await?;
        debug!(url = %url, revision = %revision, context = %context, "resolved revision");

        let scan_request = ScanRequest {
            repo: RepoRef::new(&url, &revision),
            context,
            devfile_url: non_empty(&source.devfile_url),
            dockerfile_url: non_empty(&source.dockerfile_url),
            credential: request.credential.clone(),
            label: request.label.clone(),
        };
        let scan = self.scanner.scan(&scan_request, cancel).await?;

        let stub_source = StubSource {
            url: url.clone(),
            revision: revision.clone(),
            namespace: request.namespace.clone(),
            generate_component_name: request.generate_component_name,
        };
        let components = self.stubs.build(&scan, &stub_source, lookup).await?;
        info!(url = %url, revision = %revision, components = components.len(), "detection finished");

        Ok(DetectionOutcome {
            url,
            revision,
            scan,
            components,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
