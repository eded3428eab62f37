//! Devfile document model.
//!
//! Only the parts detection reads are typed. Everything else (commands,
//! projects, events, unknown component types) is carried as raw YAML so a
//! parsed devfile can be re-serialized without loss.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Devfile {
    pub schema_version: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    /// Fill empty fields from `base`.
    pub fn inherit(&mut self, base: &Metadata) {
        fn fill(field: &mut String, from: &str) {
            if field.is_empty() {
                *field = from.to_string();
            }
        }
        fill(&mut self.name, &base.name);
        fill(&mut self.display_name, &base.display_name);
        fill(&mut self.language, &base.language);
        fill(&mut self.project_type, &base.project_type);
        if self.tags.is_empty() {
            self.tags = base.tags.clone();
        }
        for (key, value) in &base.extra {
            self.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// Reference to a parent devfile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    /// Overrides applied to the parent's components, matched by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Container,
    Kubernetes,
    Openshift,
    Image,
    Volume,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Container => "container",
            Self::Kubernetes => "kubernetes",
            Self::Openshift => "openshift",
            Self::Image => "image",
            Self::Volume => "volume",
        };
        write!(f, "{name}")
    }
}

/// A devfile component. Exactly one of the type fields is set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openshift: Option<KubernetesComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
}

impl Component {
    /// The component's type, if exactly one is set.
    pub fn kind(&self) -> Option<ComponentKind> {
        let kinds = self.kinds();
        match kinds.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    pub(crate) fn kinds(&self) -> Vec<ComponentKind> {
        let mut kinds = Vec::with_capacity(1);
        if self.container.is_some() {
            kinds.push(ComponentKind::Container);
        }
        if self.kubernetes.is_some() {
            kinds.push(ComponentKind::Kubernetes);
        }
        if self.openshift.is_some() {
            kinds.push(ComponentKind::Openshift);
        }
        if self.image.is_some() {
            kinds.push(ComponentKind::Image);
        }
        if self.volume.is_some() {
            kinds.push(ComponentKind::Volume);
        }
        kinds
    }
}

/// `kubernetes` / `openshift` component body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesComponent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inlined: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_by_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
}

impl KubernetesComponent {
    /// Whether the component actually defines outer-loop resources.
    pub fn has_definition(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.uri) || present(&self.inlined)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,
    pub target_port: u16,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageComponent {
    #[serde(default)]
    pub image_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_build: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<DockerfileImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerfileImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_required: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_component_kind_is_exclusive() {
        let yaml = indoc! {r#"
            name: outerloop
            kubernetes:
              uri: deploy.yaml
        "#};
        let component: Component = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(component.kind(), Some(ComponentKind::Kubernetes));

        let both = Component {
            name: "x".into(),
            container: Some(Value::Null),
            volume: Some(Value::Null),
            ..Default::default()
        };
        assert_eq!(both.kind(), None);
        assert_eq!(both.kinds().len(), 2);
    }

    #[test]
    fn test_unknown_sections_survive_round_trip() {
        let yaml = indoc! {r#"
            schemaVersion: 2.2.0
            metadata:
              name: app
              icon: https://example.com/icon.svg
            commands:
              - id: build
                exec:
                  commandLine: mvn package
                  component: tools
        "#};
        let devfile: Devfile = serde_yaml::from_str(yaml).unwrap();
        assert!(devfile.extra.contains_key("commands"));
        assert!(devfile.metadata.extra.contains_key("icon"));

        let rendered = serde_yaml::to_string(&devfile).unwrap();
        assert!(rendered.contains("commandLine: mvn package"));
    }

    #[test]
    fn test_metadata_inherits_only_missing_fields() {
        let mut child = Metadata {
            name: "child".into(),
            ..Default::default()
        };
        let parent = Metadata {
            name: "parent".into(),
            language: "Java".into(),
            project_type: "springboot".into(),
            ..Default::default()
        };
        child.inherit(&parent);
        assert_eq!(child.name, "child");
        assert_eq!(child.language, "Java");
        assert_eq!(child.project_type, "springboot");
    }

    #[test]
    fn test_kubernetes_definition_requires_content() {
        let empty = KubernetesComponent {
            uri: Some("  ".into()),
            ..Default::default()
        };
        assert!(!empty.has_definition());
        let inlined = KubernetesComponent {
            inlined: Some("kind: Deployment".into()),
            ..Default::default()
        };
        assert!(inlined.has_definition());
    }
}
