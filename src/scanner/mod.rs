//! Repository scanning.
//!
//! Resolution short-circuits in this order:
//!
//! 1. an explicit devfile or Dockerfile URL from the request
//! 2. a devfile at the context
//! 3. a Dockerfile at the context
//! 4. analysis of a checkout, matched against the devfile registry
//!
//! Checkouts live in scratch directories that are released when the scan
//! returns, on every path.

pub mod resolution;

pub use resolution::{Detected, Finding, Resolution, ScanResult};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyzer::{self, DetectedProject, LanguageAnalyzer};
use crate::devfile::{self, DevfileParser, Validation, DEVFILE_CANDIDATES, DOCKERFILE_CANDIDATES};
use crate::errors::{DetectionError, Result};
use crate::fetch::{Checkout, HttpFetcher, RepositoryFetcher, SourceReader};
use crate::forge::url::{join_context, raw_file_url};
use crate::forge::{Credential, RepoRef};
use crate::registry::RegistryMatcher;

/// Message for an explicit devfile URL without an outer-loop definition.
pub const INVALID_EXPLICIT_DEVFILE: &str =
    "provided devfileURL does not contain a valid outerloop definition";

/// One repository to scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub repo: RepoRef,
    /// Normalized context; `./` for the repository root.
    pub context: String,
    pub devfile_url: Option<String>,
    pub dockerfile_url: Option<String>,
    pub credential: Credential,
    /// Scratch directory label.
    pub label: String,
}

pub struct RepositoryScanner {
    fetcher: RepositoryFetcher,
    http: HttpFetcher,
    parser: Arc<dyn DevfileParser>,
    analyzer: Arc<dyn LanguageAnalyzer>,
    registry: Arc<RegistryMatcher>,
    detect_ports: bool,
}

impl RepositoryScanner {
    pub fn new(
        fetcher: RepositoryFetcher,
        http: HttpFetcher,
        parser: Arc<dyn DevfileParser>,
        analyzer: Arc<dyn LanguageAnalyzer>,
        registry: Arc<RegistryMatcher>,
    ) -> Self {
        Self {
            fetcher,
            http,
            parser,
            analyzer,
            registry,
            detect_ports: true,
        }
    }

    /// Whether in-tree findings get a port scan from a checkout.
    pub fn with_port_detection(mut self, enabled: bool) -> Self {
        self.detect_ports = enabled;
        self
    }

    pub fn parser(&self) -> &Arc<dyn DevfileParser> {
        &self.parser
    }

    pub async fn scan(&self, request: &ScanRequest, cancel: &CancellationToken) -> Result<ScanResult> {
        let resolution = self.resolve(request, cancel).await?;
        info!(
            url = %request.repo.url,
            revision = %request.repo.revision,
            resolution = resolution.kind(),
            "repository resolved"
        );
        Ok(resolution.lower(&request.context))
    }

    pub async fn resolve(&self, request: &ScanRequest, cancel: &CancellationToken) -> Result<Resolution> {
        if let Some(explicit) = self.explicit(request).await? {
            return Ok(explicit);
        }

        let reader = self
            .fetcher
            .open(&request.repo, &request.credential, &request.label, cancel)
            .await?;
        let mut checkout = reader.checkout().cloned();

        if let Some(mut detected) = self.inspect_context(&reader, &request.repo, &request.context).await? {
            if self.detect_ports {
                detected.ports = self.scan_ports(request, &mut checkout, cancel).await;
            }
            return Ok(match detected.finding {
                Finding::Devfile { .. } => Resolution::DevfileInTree(detected),
                Finding::Dockerfile { .. } => Resolution::DockerfileInTree(detected),
            });
        }

        let checkout = match checkout {
            Some(checkout) => checkout,
            None => Arc::new(
                self.fetcher
                    .checkout(&request.repo, &request.credential, &request.label, cancel)
                    .await?,
            ),
        };
        self.scan_checkout(request, &checkout, cancel).await
    }

    async fn explicit(&self, request: &ScanRequest) -> Result<Option<Resolution>> {
        let Some(url) = request.devfile_url.as_deref() else {
            return Ok(request
                .dockerfile_url
                .as_ref()
                .map(|d| Resolution::Explicit(Detected::dockerfile(d.clone()))));
        };

        let bearer = request
            .credential
            .requires_checkout()
            .then(|| request.credential.token())
            .flatten();
        let bytes = self
            .http
            .get_optional(url, bearer)
            .await?
            .ok_or_else(|| DetectionError::fetch_failed(url, "404 Not Found"))?;

        let mut parsed = self.parser.parse(&bytes).await?;
        if let Validation::Ignore(reason) = devfile::validate(&parsed) {
            debug!(url, reason = %reason, "explicit devfile rejected");
            return Err(DetectionError::invalid_devfile(INVALID_EXPLICIT_DEVFILE));
        }
        devfile::rewrite_local_dockerfile_uris(self.parser.as_ref(), &mut parsed, url)?;
        let dockerfile = request
            .dockerfile_url
            .clone()
            .or_else(|| devfile::dockerfile_reference(&parsed));

        Ok(Some(Resolution::Explicit(Detected::devfile(bytes, url, dockerfile))))
    }

    /// Devfile, else Dockerfile, at `context`.
    async fn inspect_context(
        &self,
        reader: &SourceReader,
        repo: &RepoRef,
        context: &str,
    ) -> Result<Option<Detected>> {
        if let Some((path, bytes)) = reader.find_first(context, &DEVFILE_CANDIDATES).await? {
            let mut parsed = self.parser.parse(&bytes).await?;
            match devfile::validate(&parsed) {
                Validation::Ok => {
                    let url = raw_file_url(&repo.url, &repo.revision, context, &path)?;
                    devfile::rewrite_local_dockerfile_uris(self.parser.as_ref(), &mut parsed, &url)?;
                    let dockerfile = match devfile::dockerfile_reference(&parsed) {
                        Some(reference) => Some(reference),
                        None => in_tree_dockerfile(reader, context).await?,
                    };
                    debug!(context, path = %path, "found devfile");
                    return Ok(Some(Detected::devfile(bytes, url, dockerfile)));
                }
                Validation::Ignore(reason) => {
                    debug!(context, path = %path, reason = %reason, "ignoring devfile");
                }
            }
        }

        Ok(in_tree_dockerfile(reader, context)
            .await?
            .map(Detected::dockerfile))
    }

    /// Best-effort port detection for an in-tree finding.
    async fn scan_ports(
        &self,
        request: &ScanRequest,
        checkout: &mut Option<Arc<Checkout>>,
        cancel: &CancellationToken,
    ) -> Option<Vec<u16>> {
        if checkout.is_none() {
            let fresh = self
                .fetcher
                .checkout(&request.repo, &request.credential, &request.label, cancel)
                .await;
            match fresh {
                Ok(fresh) => *checkout = Some(Arc::new(fresh)),
                Err(e) => {
                    warn!(url = %request.repo.url, error = %e, "port scan skipped");
                    return None;
                }
            }
        }
        let checkout = Arc::clone(checkout.as_ref()?);

        let dir = checkout.context_dir(&request.context);
        match analyzer::detect_projects_blocking(Arc::clone(&self.analyzer), dir.clone(), cancel.clone()).await {
            Ok(projects) => Some(
                projects
                    .into_iter()
                    .find(|p| p.path == dir)
                    .map(|p| p.ports)
                    .unwrap_or_else(|| analyzer::ports::detect_common_ports(&dir)),
            ),
            Err(e) => {
                warn!(url = %request.repo.url, error = %e, "port scan failed");
                None
            }
        }
    }

    async fn scan_checkout(
        &self,
        request: &ScanRequest,
        checkout: &Arc<Checkout>,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let workdir = checkout.context_dir(&request.context);
        let projects =
            analyzer::detect_projects_blocking(Arc::clone(&self.analyzer), workdir.clone(), cancel.clone())
                .await?;

        match projects.first() {
            Some(first) if first.path == workdir => self.single_component(request, first).await,
            _ => self.multi_component(request, checkout, &workdir, &projects).await,
        }
    }

    async fn single_component(&self, request: &ScanRequest, project: &DetectedProject) -> Result<Resolution> {
        let language = project.language.to_string();
        let Some(sample) = self
            .registry
            .resolve(&language, project.framework.as_deref())
            .await?
        else {
            return Err(DetectionError::NoComponentsDetected {
                url: request.repo.url.clone(),
            });
        };

        let mut detected = Detected::from_sample(sample);
        detected.ports = Some(project.ports.clone());
        detected.language = Some(language);
        Ok(Resolution::Scanned(BTreeMap::from([(
            request.context.clone(),
            detected,
        )])))
    }

    async fn multi_component(
        &self,
        request: &ScanRequest,
        checkout: &Arc<Checkout>,
        workdir: &Path,
        projects: &[DetectedProject],
    ) -> Result<Resolution> {
        let reader = SourceReader::Local {
            checkout: Arc::clone(checkout),
        };

        let mut dirs: BTreeSet<String> = projects
            .iter()
            .filter_map(|p| p.top_level_dir(workdir))
            .collect();
        dirs.extend(dirs_with_build_files(workdir).await?);

        let mut found = BTreeMap::new();
        for dir in dirs {
            let context = join_context(&request.context, &dir);
            let project = projects
                .iter()
                .find(|p| p.top_level_dir(workdir).as_deref() == Some(dir.as_str()));

            let detected = match self.inspect_context(&reader, &request.repo, &context).await? {
                Some(detected) => Some(detected),
                None => match project {
                    Some(p) => self
                        .registry
                        .resolve(&p.language.to_string(), p.framework.as_deref())
                        .await?
                        .map(Detected::from_sample),
                    None => None,
                },
            };

            let Some(mut detected) = detected else {
                debug!(context = %context, "nothing detected in directory");
                continue;
            };
            if let Some(p) = project {
                detected.ports = Some(p.ports.clone());
                detected.language = Some(p.language.to_string());
            }
            found.insert(context, detected);
        }

        if found.is_empty() {
            return Err(DetectionError::NoComponentsDetected {
                url: request.repo.url.clone(),
            });
        }
        Ok(Resolution::Scanned(found))
    }
}

/// `./<path>` of the first Dockerfile at `context`.
async fn in_tree_dockerfile(reader: &SourceReader, context: &str) -> Result<Option<String>> {
    Ok(reader
        .find_first(context, &DOCKERFILE_CANDIDATES)
        .await?
        .map(|(path, _)| format!("./{path}")))
}

/// First-level, non-hidden directories holding a devfile or Dockerfile.
async fn dirs_with_build_files(workdir: &Path) -> Result<Vec<String>> {
    let mut dirs = Vec::new();
    let mut entries = match tokio::fs::read_dir(workdir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dirs),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.file_type().await?.is_dir() {
            continue;
        }
        let dir = entry.path();
        let has_build_file = DEVFILE_CANDIDATES
            .iter()
            .chain(DOCKERFILE_CANDIDATES.iter())
            .any(|candidate| dir.join(candidate).is_file());
        if has_build_file {
            dirs.push(name);
        }
    }
    dirs.sort();
    Ok(dirs)
}
