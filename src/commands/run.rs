use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ControllerConfig;
use crate::controller;

/// Run the controller until SIGINT.
pub async fn run_controller(config: ControllerConfig) -> Result<()> {
    let client = kube::Client::try_default()
        .await
        .context("failed to create a Kubernetes client")?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            trigger.cancel();
        }
    });

    controller::run(config, client, shutdown).await?;
    Ok(())
}
