use std::fs;
use std::path::{Path, PathBuf};

use super::core::ControllerConfig;

/// File name searched for when no `--config` path is given.
pub const CONFIG_FILE_NAME: &str = ".component-detector.toml";

/// How many directories, starting at the working directory, are searched.
const DISCOVERY_DEPTH: usize = 10;

/// Parse TOML text read from `origin`.
pub fn parse_config(contents: &str, origin: &Path) -> Result<ControllerConfig, String> {
    toml::from_str(contents).map_err(|e| format!("invalid config {}: {e}", origin.display()))
}

/// Nearest [`CONFIG_FILE_NAME`] at or above `start`.
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(DISCOVERY_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Load the explicit file, else the discovered one, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<ControllerConfig, String> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let discovered = std::env::current_dir()
                .ok()
                .and_then(|cwd| discover_config(&cwd));
            match discovered {
                Some(path) => path,
                None => {
                    tracing::debug!("no {CONFIG_FILE_NAME} found, using defaults");
                    return Ok(ControllerConfig::default());
                }
            }
        }
    };

    let contents = fs::read_to_string(&path)
        .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
    let config = parse_config(&contents, &path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Overlay values from an environment lookup onto `config`.
///
/// Takes the lookup as a function so tests never touch the process
/// environment.
pub fn apply_env_overrides<F>(mut config: ControllerConfig, lookup: F) -> ControllerConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(raw) = non_empty("GITHUB_AUTH_TOKEN") {
        // Either a single token or a comma separated "name:token" list.
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once(':') {
                Some((name, token)) if !name.is_empty() && !token.is_empty() => {
                    config.tokens.insert(name.to_string(), token.to_string());
                }
                _ => config.default_token = Some(entry.to_string()),
            }
        }
    }
    if let Some(url) = non_empty("DEVFILE_REGISTRY_URL") {
        config.registry_url = url;
    }
    if let Some(root) = non_empty("CDQ_WORKSPACE_ROOT") {
        config.workspace_root = PathBuf::from(root);
    }
    if let Some(org) = non_empty("GITHUB_ORG") {
        config.github_org = org;
    }
    if let Some(api) = non_empty("GITHUB_API_URL") {
        config.github_api_url = api;
    }
    config
}
