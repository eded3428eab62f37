//! CDQ controller.
//!
//! [`run`] watches every `ComponentDetectionQuery` in the cluster and hands
//! each event to the [`Reconciler`]. Events are filtered on
//! `metadata.generation`, so the controller's own status writes do not
//! trigger another reconcile. Detection errors are recorded in status and
//! never requeued; only cluster write failures are retried through
//! [`error_policy`].

pub mod cluster;
pub mod reconciler;
pub mod status;

pub use cluster::{ClusterClient, KubeClusterClient};
pub use reconciler::{ReconcileOutcome, Reconciler};

use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::{predicates, reflector, watcher, Controller, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::ComponentDetectionQuery;
use crate::config::ControllerConfig;
use crate::engine::DetectionEngine;
use crate::errors::{DetectionError, Result};
use crate::forge::TokenPool;

/// Delay before retrying a failed status write or delete.
pub const CLUSTER_RETRY_DELAY: Duration = Duration::from_secs(10);

/// State shared by every reconcile.
pub struct ControllerContext {
    pub reconciler: Reconciler,
    /// Cancelled on shutdown; in-flight detections stop at their next
    /// suspension point.
    pub shutdown: CancellationToken,
}

/// Reconcile entry point for `kube::runtime`.
pub async fn reconcile(cdq: Arc<ComponentDetectionQuery>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let name = cdq.name_any();
    let Some(namespace) = cdq.namespace() else {
        warn!(cdq = %name, "ignoring cluster-scoped query");
        return Ok(Action::await_change());
    };

    let span = info_span!("reconcile", cdq = %name, ns = %namespace);
    let outcome = ctx
        .reconciler
        .reconcile(&cdq, &namespace, &name, &ctx.shutdown.child_token())
        .instrument(span)
        .await?;
    debug!(cdq = %name, ns = %namespace, ?outcome, "reconciled");
    Ok(Action::await_change())
}

/// Requeue cluster API failures; everything else waits for the next change.
pub fn error_policy(
    cdq: Arc<ComponentDetectionQuery>,
    error: &DetectionError,
    _ctx: Arc<ControllerContext>,
) -> Action {
    warn!(cdq = %cdq.name_any(), code = %error.code(), error = %error, "reconcile failed");
    match error {
        DetectionError::Cluster(_) => Action::requeue(CLUSTER_RETRY_DELAY),
        _ => Action::await_change(),
    }
}

/// Run the controller until `shutdown` is cancelled.
pub async fn run(config: ControllerConfig, client: Client, shutdown: CancellationToken) -> Result<()> {
    let engine = Arc::new(DetectionEngine::from_config(&config)?);
    let cluster = Arc::new(KubeClusterClient::new(client.clone(), &config.controller_name));
    let tokens = TokenPool::new(config.default_token.clone(), config.tokens.clone());
    info!(
        controller = %config.controller_name,
        registry = %config.registry_url,
        tokens = tokens.len(),
        "starting component detection controller"
    );

    let context = Arc::new(ControllerContext {
        reconciler: Reconciler::new(engine, cluster, tokens),
        shutdown: shutdown.clone(),
    });

    let queries: Api<ComponentDetectionQuery> = Api::all(client);
    let (reader, writer) = reflector::store();
    let changes = watcher(queries, watcher::Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicates::generation);

    Controller::for_stream(changes, reader)
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(cdq = %object.name, "reconcile finished"),
                Err(e) => debug!(error = %e, "controller event failed"),
            }
        })
        .await;

    info!("controller stopped");
    Ok(())
}
