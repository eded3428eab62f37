// Shared fixtures for component-detector integration tests
#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use component_detector::analyzer::ManifestAnalyzer;
use component_detector::api::ComponentDetectionQueryStatus;
use component_detector::controller::ClusterClient;
use component_detector::devfile::{DevfileParser, YamlDevfileParser};
use component_detector::engine::DetectionEngine;
use component_detector::errors::{DetectionError, Result};
use component_detector::fetch::{CloneRequest, HttpFetcher, RepoCloner, RepositoryFetcher, Workspace};
use component_detector::forge::{GitForge, GitHubForge};
use component_detector::observability::ForgeMetrics;
use component_detector::registry::RegistryMatcher;
use component_detector::scanner::RepositoryScanner;
use component_detector::stub::ComponentLookup;

pub const OWNER: &str = "o";
pub const REPO: &str = "r";

// Cloner that writes a fixed file tree instead of talking to git
#[derive(Default)]
pub struct FixtureCloner {
    files: Vec<(String, String)>,
    failure: Option<String>,
    clones: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl FixtureCloner {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn last_token(&self) -> Option<String> {
        self.last_token.lock().clone()
    }
}

#[async_trait]
impl RepoCloner for FixtureCloner {
    async fn clone_into(&self, request: &CloneRequest, dest: &Path, _: &CancellationToken) -> Result<()> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock() = request.token.clone();
        if let Some(reason) = &self.failure {
            return Err(DetectionError::clone_failed(&request.url, reason));
        }
        for (relative, content) in &self.files {
            let full = dest.join(relative);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }
        Ok(())
    }
}

// In-memory cluster that records every status write and delete
#[derive(Default)]
pub struct FakeCluster {
    pub secrets: BTreeMap<String, String>,
    pub components: Vec<String>,
    pub statuses: Mutex<Vec<ComponentDetectionQueryStatus>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn with_secret(name: &str, password: &str) -> Self {
        Self {
            secrets: BTreeMap::from([(name.to_string(), password.to_string())]),
            ..Default::default()
        }
    }

    pub fn last_status(&self) -> Option<ComponentDetectionQueryStatus> {
        self.statuses.lock().last().cloned()
    }
}

#[async_trait]
impl ComponentLookup for FakeCluster {
    async fn component_exists(&self, _: &str, name: &str) -> Result<bool> {
        Ok(self.components.iter().any(|c| c == name))
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn secret_password(&self, _: &str, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| DetectionError::secret_not_found(format!("secret {name} not found")))
    }

    async fn patch_cdq_status(&self, _: &str, _: &str, status: &ComponentDetectionQueryStatus) -> Result<()> {
        self.statuses.lock().push(status.clone());
        Ok(())
    }

    async fn delete_cdq(&self, namespace: &str, name: &str) -> Result<()> {
        self.deleted.lock().push(format!("{namespace}/{name}"));
        Ok(())
    }
}

// One mock server standing in for the forge API, raw content and the registry
pub struct Harness {
    pub server: MockServer,
    pub cloner: Arc<FixtureCloner>,
    pub metrics: Arc<ForgeMetrics>,
    workspace: TempDir,
}

impl Harness {
    pub async fn start(cloner: FixtureCloner) -> Self {
        Self {
            server: MockServer::start().await,
            cloner: Arc::new(cloner),
            metrics: Arc::new(ForgeMetrics::new()),
            workspace: tempfile::tempdir().unwrap(),
        }
    }

    pub fn repo_url(&self) -> String {
        format!("{}/{OWNER}/{REPO}", self.server.uri())
    }

    pub fn raw_url(&self, file: &str) -> String {
        format!("{}/{OWNER}/{REPO}/main/{file}", self.server.uri())
    }

    pub fn workspace_entries(&self) -> usize {
        std::fs::read_dir(self.workspace.path()).unwrap().count()
    }

    pub fn engine(&self, detect_ports: bool) -> DetectionEngine {
        let http = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let forge: Arc<dyn GitForge> = Arc::new(
            GitHubForge::new(http.clone(), self.server.uri(), "test-controller")
                .with_metrics(Arc::clone(&self.metrics)),
        );
        let parser: Arc<dyn DevfileParser> = Arc::new(YamlDevfileParser::new(http.clone()));
        let registry = Arc::new(RegistryMatcher::new(
            format!("{}/registry", self.server.uri()),
            http.clone(),
            Arc::clone(&parser),
            8,
        ));
        let cloner: Arc<dyn RepoCloner> = self.cloner.clone();
        let fetcher = RepositoryFetcher::new(
            Arc::clone(&forge),
            cloner,
            Workspace::new(self.workspace.path()).unwrap(),
        );
        let scanner = RepositoryScanner::new(
            fetcher,
            http,
            parser,
            Arc::new(ManifestAnalyzer::default()),
            registry,
        )
        .with_port_detection(detect_ports);
        DetectionEngine::new(forge, scanner, Duration::from_secs(30))
    }

    pub async fn mount_default_branch(&self, branch: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/{OWNER}/{REPO}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "default_branch": branch })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_raw(&self, file: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{OWNER}/{REPO}/main/{file}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_registry(&self) {
        Mock::given(method("GET"))
            .and(path("/registry/index"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::registry_index()))
            .mount(&self.server)
            .await;
        for (name, body) in [
            ("java-springboot-basic", fixtures::SPRING_SAMPLE),
            ("python-basic", fixtures::PYTHON_SAMPLE),
            ("nodejs-basic", fixtures::NODE_SAMPLE),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("/registry/devfiles/{name}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&self.server)
                .await;
        }
    }
}
