//! `ComponentDetectionQuery` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::component::{ComponentSpec, GitSource};
use super::condition::{find_condition, Condition, ConditionStatus};

/// Condition type set on entry to processing.
pub const CONDITION_PROCESSING: &str = "Processing";
/// Terminal condition type.
pub const CONDITION_COMPLETED: &str = "Completed";

/// A one-shot request to inspect a repository and describe its components.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "ComponentDetectionQuery",
    namespaced,
    status = "ComponentDetectionQueryStatus",
    shortname = "cdq",
    plural = "componentdetectionqueries"
)]
#[kube(printcolumn = r#"{"name":"URL","type":"string","jsonPath":".spec.gitSource.url"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionQuerySpec {
    pub git_source: GitSource,
    /// Name of a Secret in the same namespace holding a `password` key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Always append a random suffix to generated names
    #[serde(default)]
    pub generate_component_name: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionQueryStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generated component name to detection result
    #[serde(default)]
    pub component_detected: BTreeMap<String, ComponentDetectionDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetectionDescription {
    pub devfile_found: bool,
    pub language: String,
    pub project_type: String,
    pub component_stub: ComponentSpec,
}

impl ComponentDetectionQueryStatus {
    /// The terminal condition, once set.
    pub fn completed(&self) -> Option<&Condition> {
        find_condition(&self.conditions, CONDITION_COMPLETED)
    }
}

impl ComponentDetectionQuery {
    /// Whether a terminal condition has been recorded.
    pub fn is_completed(&self) -> bool {
        self.status
            .as_ref()
            .and_then(ComponentDetectionQueryStatus::completed)
            .is_some_and(|c| c.status != ConditionStatus::Unknown)
    }

    /// Whether the spec changed after the terminal condition was written.
    /// Status-only updates keep the generation and never count.
    pub fn changed_since_completion(&self) -> bool {
        self.status
            .as_ref()
            .and_then(ComponentDetectionQueryStatus::completed)
            .is_some_and(|c| c.observed_generation != self.metadata.generation)
    }
}
