//! `Component` custom resource.
//!
//! The CDQ engine produces `ComponentSpec` stubs and reads the namespace's
//! Component set to avoid name collisions. Reconciling Components happens
//! elsewhere.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::condition::Condition;

/// Application name placed in every generated stub; clients replace it.
pub const PLACEHOLDER_APPLICATION: &str = "insert-application-name";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "appstudio.redhat.com",
    version = "v1alpha1",
    kind = "Component",
    namespaced,
    status = "ComponentStatus",
    plural = "components"
)]
#[kube(printcolumn = r#"{"name":"Application","type":"string","jsonPath":".spec.application"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub component_name: String,
    pub application: String,
    #[serde(default)]
    pub source: ComponentSource,
    /// Prebuilt image, for components not built from source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_source: Option<GitSource>,
}

/// Location of a component's source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(rename = "devfileURL", default, skip_serializing_if = "String::is_empty")]
    pub devfile_url: String,
    #[serde(rename = "dockerfileURL", default, skip_serializing_if = "String::is_empty")]
    pub dockerfile_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Resource quantities keyed by `cpu`, `memory` or `storage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_git_source_uses_upper_case_url_suffixes() {
        let source = GitSource {
            url: "https://github.com/a/b".into(),
            devfile_url: "https://example.com/devfile.yaml".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["devfileURL"], "https://example.com/devfile.yaml");
        assert!(json.get("dockerfileURL").is_none());
        assert!(json.get("revision").is_none());
    }

    #[test]
    fn test_empty_resources_are_omitted() {
        let spec = ComponentSpec {
            component_name: "demo".into(),
            application: PLACEHOLDER_APPLICATION.into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json.get("resources").is_none());
        assert!(json.get("env").is_none());
        assert_eq!(json["application"], "insert-application-name");
    }

    #[test]
    fn test_crd_metadata() {
        let crd = Component::crd();
        assert_eq!(crd.spec.group, "appstudio.redhat.com");
        assert_eq!(crd.spec.names.kind, "Component");
    }
}
