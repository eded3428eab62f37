//! Controller configuration.
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! environment variables, then command-line flags.
//!
//! ```toml
//! registry_url = "https://registry.devfile.io"
//! workspace_root = "/var/tmp/component-detector"
//!
//! [timeouts]
//! reconcile_seconds = 300
//! http_seconds = 30
//!
//! [detection]
//! detect_ports = true
//! max_scan_depth = 5
//! ```

mod core;
mod loader;

pub use self::core::{ControllerConfig, DetectionSettings, TimeoutConfig};
pub use loader::{
    apply_env_overrides, discover_config, load_config, parse_config, CONFIG_FILE_NAME,
};

impl ControllerConfig {
    /// Check the configuration, collecting every problem instead of
    /// stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.registry_url.trim().is_empty() {
            errors.push("registry_url: must not be empty".to_string());
        } else if url::Url::parse(&self.registry_url).is_err() {
            errors.push(format!(
                "registry_url: not a valid URL (got: {})",
                self.registry_url
            ));
        }
        if url::Url::parse(&self.github_api_url).is_err() {
            errors.push(format!(
                "github_api_url: not a valid URL (got: {})",
                self.github_api_url
            ));
        }
        if self.controller_name.trim().is_empty() {
            errors.push("controller_name: must not be empty".to_string());
        }
        if self.timeouts.reconcile_seconds == 0 {
            errors.push("timeouts.reconcile_seconds: must be greater than 0".to_string());
        }
        if self.timeouts.http_seconds == 0 {
            errors.push("timeouts.http_seconds: must be greater than 0".to_string());
        }
        if self.timeouts.clone_seconds == 0 {
            errors.push("timeouts.clone_seconds: must be greater than 0".to_string());
        }
        if self.detection.sample_cache_capacity == 0 {
            errors.push("detection.sample_cache_capacity: must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_accumulates_all_errors() {
        let mut config = ControllerConfig {
            registry_url: String::new(),
            ..Default::default()
        };
        config.timeouts.http_seconds = 0;
        config.detection.sample_cache_capacity = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("registry_url"));
    }
}
