use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ControllerConfig;
use crate::observability::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "component-detector")]
#[command(about = "Detects buildable components in Git repositories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: discover .component-detector.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Devfile registry base URL
    #[arg(long, global = true)]
    pub registry_url: Option<String>,

    /// Directory for scratch checkouts
    #[arg(long, global = true)]
    pub workspace_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ComponentDetectionQuery controller
    Run,

    /// Detect components in a repository once and print the result
    Detect {
        /// Repository URL
        url: String,

        /// Branch, tag or commit (default: the repository default branch)
        #[arg(long, default_value = "")]
        revision: String,

        /// Subdirectory to inspect
        #[arg(long, default_value = "")]
        context: String,

        /// Use this devfile instead of scanning
        #[arg(long)]
        devfile_url: Option<String>,

        /// Use this Dockerfile instead of scanning
        #[arg(long)]
        dockerfile_url: Option<String>,

        /// Token for private repositories; the checkout path is used
        #[arg(long, env = "CDQ_DETECT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Always append a random suffix to component names
        #[arg(long)]
        generate_name: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Print the custom resource definitions
    Crd,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl Cli {
    /// Apply flag overrides, the last configuration layer.
    pub fn apply_overrides(&self, mut config: ControllerConfig) -> ControllerConfig {
        if let Some(url) = &self.registry_url {
            config.registry_url = url.clone();
        }
        if let Some(root) = &self.workspace_root {
            config.workspace_root = root.clone();
        }
        config
    }
}
