//! The CDQ state machine.
//!
//! ```text
//! [New] --first observation--> [Processing] --detect + build--> [Completed True|False]
//! [Completed] --spec change (new generation)--> deleted
//! ```
//!
//! Conditions record the generation they were computed for. A completed
//! query whose generation is unchanged is left alone, so the controller's
//! own status writes and restarts never delete it. Each generation is
//! detected at most once per process.
//!
//! Detection errors are terminal and land in the `Completed` condition.
//! Only failures to write status or delete the CDQ surface as errors.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cluster::ClusterClient;
use super::status::{mark_completed, mark_failed, mark_processing};
use crate::api::{ComponentDetectionDescription, ComponentDetectionQuery};
use crate::engine::{DetectionEngine, DetectionRequest};
use crate::errors::{DetectionError, Result};
use crate::forge::{Credential, TokenPool};

/// What one reconcile did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Detection ran; `components` were recorded.
    Completed { components: usize },
    /// Detection ran and failed; the failure was recorded.
    Failed { code: String },
    /// The spec changed after completion; the CDQ was deleted.
    Deleted,
    /// Nothing to do for this generation.
    Unchanged,
}

pub struct Reconciler {
    engine: Arc<DetectionEngine>,
    cluster: Arc<dyn ClusterClient>,
    tokens: TokenPool,
    /// `<namespace>/<name>` to the generation this process has taken on.
    claimed: Mutex<HashMap<String, Option<i64>>>,
}

impl Reconciler {
    pub fn new(engine: Arc<DetectionEngine>, cluster: Arc<dyn ClusterClient>, tokens: TokenPool) -> Self {
        Self {
            engine,
            cluster,
            tokens,
            claimed: Mutex::new(HashMap::new()),
        }
    }

    pub async fn reconcile(
        &self,
        cdq: &ComponentDetectionQuery,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let key = format!("{namespace}/{name}");
        let generation = cdq.metadata.generation;

        if cdq.is_completed() {
            if !cdq.changed_since_completion() {
                debug!(?generation, "query already completed");
                return Ok(ReconcileOutcome::Unchanged);
            }
            self.cluster.delete_cdq(namespace, name).await?;
            self.claimed.lock().remove(&key);
            info!(?generation, "spec changed after completion, deleted query");
            return Ok(ReconcileOutcome::Deleted);
        }

        if !self.claim(&key, generation) {
            debug!(?generation, "generation already taken on");
            return Ok(ReconcileOutcome::Unchanged);
        }
        let result = self.process(cdq, namespace, name, generation, cancel).await;
        if result.is_err() {
            // a failed status write is requeued and must be able to run again
            self.claimed.lock().remove(&key);
        }
        result
    }

    /// Record `generation` for `key`; false when it was already recorded.
    fn claim(&self, key: &str, generation: Option<i64>) -> bool {
        let mut claimed = self.claimed.lock();
        if claimed.get(key) == Some(&generation) {
            return false;
        }
        claimed.insert(key.to_string(), generation);
        true
    }

    async fn process(
        &self,
        cdq: &ComponentDetectionQuery,
        namespace: &str,
        name: &str,
        generation: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome> {
        let mut status = cdq.status.clone().unwrap_or_default();
        mark_processing(&mut status, generation);
        self.cluster.patch_cdq_status(namespace, name, &status).await?;

        let outcome = match self.detect(cdq, namespace, name, cancel).await {
            Ok(detected) => {
                let components = detected.len();
                mark_completed(&mut status, detected, generation);
                ReconcileOutcome::Completed { components }
            }
            Err(e) if e.is_terminal_success() => {
                info!(reason = %e, "no components detected");
                mark_completed(&mut status, Default::default(), generation);
                ReconcileOutcome::Completed { components: 0 }
            }
            Err(e) => {
                warn!(code = %e.code(), category = e.category(), error = %e, "detection failed");
                mark_failed(&mut status, &e, generation);
                ReconcileOutcome::Failed {
                    code: e.code().to_string(),
                }
            }
        };

        self.cluster.patch_cdq_status(namespace, name, &status).await?;
        Ok(outcome)
    }

    async fn detect(
        &self,
        cdq: &ComponentDetectionQuery,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentDetectionDescription>> {
        let credential = self.credential(cdq, namespace).await?;
        let request = DetectionRequest {
            git_source: cdq.spec.git_source.clone(),
            credential,
            namespace: namespace.to_string(),
            label: format!("{namespace}-{name}"),
            generate_component_name: cdq.spec.generate_component_name,
        };
        let outcome = self
            .engine
            .detect(&request, self.cluster.as_ref(), cancel)
            .await?;
        Ok(outcome.components)
    }

    async fn credential(&self, cdq: &ComponentDetectionQuery, namespace: &str) -> Result<Credential> {
        match cdq.spec.secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => {
                let password = self
                    .cluster
                    .secret_password(namespace, secret)
                    .await
                    .map_err(|e| match e {
                        DetectionError::Cluster(inner) => {
                            DetectionError::secret_not_found(format!("secret {secret} not readable: {inner}"))
                        }
                        other => other,
                    })?;
                Ok(Credential::from_secret(secret, password))
            }
            _ => Ok(self.tokens.credential()),
        }
    }
}
