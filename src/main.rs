use anyhow::Result;
use clap::Parser;
use component_detector::api::GitSource;
use component_detector::cli::{Cli, Commands};
use component_detector::commands::{self, detect::DetectArgs};
use component_detector::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, cli.verbosity);

    match &cli.command {
        Commands::Crd => commands::crd::print_crds(&mut std::io::stdout().lock()),
        Commands::Run => {
            let config = commands::resolve_config(&cli)?;
            commands::run::run_controller(config).await
        }
        Commands::Detect {
            url,
            revision,
            context,
            devfile_url,
            dockerfile_url,
            token,
            generate_name,
            format,
        } => {
            let config = commands::resolve_config(&cli)?;
            let args = DetectArgs {
                git_source: GitSource {
                    url: url.clone(),
                    revision: revision.clone(),
                    context: context.clone(),
                    devfile_url: devfile_url.clone().unwrap_or_default(),
                    dockerfile_url: dockerfile_url.clone().unwrap_or_default(),
                },
                token: token.clone(),
                generate_name: *generate_name,
                format: *format,
            };
            commands::detect::detect(&config, args, &mut std::io::stdout().lock()).await
        }
    }
}
