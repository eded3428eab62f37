use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the component detector.
///
/// Every field has a serde default so a partial TOML file (or none at all)
/// yields a usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Name used to label forge API counters and the kube field manager.
    #[serde(default = "default_controller_name")]
    pub controller_name: String,

    /// Devfile registry base URL (serves `/index` and `/devfiles/<name>`).
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// GitHub organization for GitOps repositories. Only consumed by the
    /// Application flow; carried so one config file serves every controller.
    #[serde(default = "default_github_org")]
    pub github_org: String,

    /// Directory under which every reconcile gets its own scratch directory.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Token used when a CDQ names no secret.
    #[serde(default, skip_serializing)]
    pub default_token: Option<String>,

    /// Additional named tokens, keyed by token name.
    #[serde(default, skip_serializing)]
    pub tokens: BTreeMap<String, String>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub detection: DetectionSettings,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_name: default_controller_name(),
            registry_url: default_registry_url(),
            github_api_url: default_github_api_url(),
            github_org: default_github_org(),
            workspace_root: default_workspace_root(),
            default_token: None,
            tokens: BTreeMap::new(),
            timeouts: TimeoutConfig::default(),
            detection: DetectionSettings::default(),
        }
    }
}

/// Deadlines applied to network work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Deadline for one whole reconcile, in seconds (default: 300)
    #[serde(default = "default_reconcile_seconds")]
    pub reconcile_seconds: u64,

    /// Per-request HTTP timeout, in seconds (default: 30)
    #[serde(default = "default_http_seconds")]
    pub http_seconds: u64,

    /// libgit2 server connect/read timeout, in seconds (default: 60)
    #[serde(default = "default_clone_seconds")]
    pub clone_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reconcile_seconds: default_reconcile_seconds(),
            http_seconds: default_http_seconds(),
            clone_seconds: default_clone_seconds(),
        }
    }
}

impl TimeoutConfig {
    pub fn reconcile(&self) -> Duration {
        Duration::from_secs(self.reconcile_seconds)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_seconds)
    }

    pub fn git_clone(&self) -> Duration {
        Duration::from_secs(self.clone_seconds)
    }
}

/// Knobs for the repository scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Clone and scan for ports even when a devfile or Dockerfile was found
    /// over the public path (default: true)
    #[serde(default = "default_detect_ports")]
    pub detect_ports: bool,

    /// Maximum directory depth walked by the language analyzer (default: 5)
    #[serde(default = "default_max_scan_depth")]
    pub max_scan_depth: usize,

    /// Number of registry sample devfiles kept in memory (default: 64)
    #[serde(default = "default_sample_cache_capacity")]
    pub sample_cache_capacity: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            detect_ports: default_detect_ports(),
            max_scan_depth: default_max_scan_depth(),
            sample_cache_capacity: default_sample_cache_capacity(),
        }
    }
}

pub fn default_controller_name() -> String {
    "cdq-controller".to_string()
}

pub fn default_registry_url() -> String {
    "https://registry.devfile.io".to_string()
}

pub fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

pub fn default_github_org() -> String {
    "redhat-appstudio-appdata".to_string()
}

pub fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("component-detector")
}

fn default_reconcile_seconds() -> u64 {
    300
}

fn default_http_seconds() -> u64 {
    30
}

fn default_clone_seconds() -> u64 {
    60
}

fn default_detect_ports() -> bool {
    true
}

fn default_max_scan_depth() -> usize {
    5
}

fn default_sample_cache_capacity() -> usize {
    64
}
