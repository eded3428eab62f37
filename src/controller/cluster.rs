//! Cluster access used by the reconciler.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

use crate::api::{Component, ComponentDetectionQuery, ComponentDetectionQueryStatus};
use crate::errors::{DetectionError, Result};
use crate::stub::ComponentLookup;

/// Key of the token inside a CDQ secret.
pub const SECRET_PASSWORD_KEY: &str = "password";

#[async_trait]
pub trait ClusterClient: ComponentLookup {
    /// The `password` value of a Secret.
    async fn secret_password(&self, namespace: &str, name: &str) -> Result<String>;

    /// Replace the status of a CDQ.
    async fn patch_cdq_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ComponentDetectionQueryStatus,
    ) -> Result<()>;

    /// Delete a CDQ; an already-deleted CDQ is not an error.
    async fn delete_cdq(&self, namespace: &str, name: &str) -> Result<()>;
}

/// [`ClusterClient`] over the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    field_manager: String,
}

impl KubeClusterClient {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn cdqs(&self, namespace: &str) -> Api<ComponentDetectionQuery> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// Password from a Secret's `data`, falling back to `stringData`.
pub fn password_from_secret(secret: &Secret, name: &str) -> Result<String> {
    let from_data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(SECRET_PASSWORD_KEY))
        .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned());
    let from_string_data = || {
        secret
            .string_data
            .as_ref()
            .and_then(|data| data.get(SECRET_PASSWORD_KEY))
            .cloned()
    };
    from_data
        .or_else(from_string_data)
        .map(|password| password.trim().to_string())
        .filter(|password| !password.is_empty())
        .ok_or_else(|| {
            DetectionError::secret_not_found(format!(
                "secret {name} has no {SECRET_PASSWORD_KEY} key"
            ))
        })
}

#[async_trait]
impl ComponentLookup for KubeClusterClient {
    async fn component_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<Component> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.is_some())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn secret_password(&self, namespace: &str, name: &str) -> Result<String> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await?
            .ok_or_else(|| DetectionError::secret_not_found(format!("secret {name} not found")))?;
        password_from_secret(&secret, name)
    }

    async fn patch_cdq_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ComponentDetectionQueryStatus,
    ) -> Result<()> {
        let patch = json!({ "status": status });
        self.cdqs(namespace)
            .patch_status(name, &PatchParams::apply(&self.field_manager), &Patch::Merge(&patch))
            .await?;
        debug!(namespace, name, "patched status");
        Ok(())
    }

    async fn delete_cdq(&self, namespace: &str, name: &str) -> Result<()> {
        match self.cdqs(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(namespace, name, "already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    #[test]
    fn test_password_from_data() {
        let secret = Secret {
            data: Some(BTreeMap::from([(
                "password".to_string(),
                ByteString(b"ghp_token\n".to_vec()),
            )])),
            ..Default::default()
        };
        assert_eq!(password_from_secret(&secret, "s").unwrap(), "ghp_token");
    }

    #[test]
    fn test_password_from_string_data() {
        let secret = Secret {
            string_data: Some(BTreeMap::from([("password".to_string(), "t".to_string())])),
            ..Default::default()
        };
        assert_eq!(password_from_secret(&secret, "s").unwrap(), "t");
    }

    #[test]
    fn test_missing_password_key() {
        let secret = Secret {
            data: Some(BTreeMap::from([("token".to_string(), ByteString(b"x".to_vec()))])),
            ..Default::default()
        };
        let err = password_from_secret(&secret, "creds").unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::SECRET_NOT_FOUND);
        assert!(err.to_string().contains("creds"));
    }
}
