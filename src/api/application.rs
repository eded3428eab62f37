//! `Application` custom resource.
//!
//! Only the types live here so the CRD can be generated alongside the
//! others; the Application reconciler is a separate controller.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::condition::Condition;

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    plural = "applications"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Repository holding the application model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_model_repository: Option<RepositoryRef>,
    /// Repository holding GitOps resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ops_repository: Option<RepositoryRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct RepositoryRef {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Serialized application model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devfile: Option<String>,
}
