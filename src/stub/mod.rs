//! Lowering scan results into component stubs.

pub mod naming;

pub use naming::{base_name, sanitize_name, with_random_suffix};

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use crate::api::{ComponentDetectionDescription, ComponentSource, ComponentSpec, GitSource, PLACEHOLDER_APPLICATION};
use crate::devfile::attributes::{read_deploy_attributes, DeployAttributes};
use crate::devfile::{ComponentKind, DevfileParser};
use crate::errors::Result;
use crate::scanner::ScanResult;

/// `language` and `projectType` reported for Dockerfile-only components.
pub const DOCKERFILE_LANGUAGE: &str = "Dockerfile";

/// Names already taken in a namespace.
#[async_trait]
pub trait ComponentLookup: Send + Sync {
    async fn component_exists(&self, namespace: &str, name: &str) -> Result<bool>;
}

/// A namespace without Components.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExistingComponents;

#[async_trait]
impl ComponentLookup for NoExistingComponents {
    async fn component_exists(&self, _: &str, _: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Where the detected components come from.
#[derive(Debug, Clone)]
pub struct StubSource {
    pub url: String,
    pub revision: String,
    pub namespace: String,
    pub generate_component_name: bool,
}

pub struct StubBuilder {
    parser: Arc<dyn DevfileParser>,
}

impl StubBuilder {
    pub fn new(parser: Arc<dyn DevfileParser>) -> Self {
        Self { parser }
    }

    /// One description per detected context, keyed by component name.
    pub async fn build(
        &self,
        scan: &ScanResult,
        source: &StubSource,
        lookup: &dyn ComponentLookup,
    ) -> Result<BTreeMap<String, ComponentDetectionDescription>> {
        let mut detected = BTreeMap::new();
        let mut allocated = BTreeSet::new();

        for context in scan.contexts() {
            let description = match scan.devfiles.get(context) {
                Some(bytes) => self.from_devfile(scan, source, context, bytes).await?,
                None => from_dockerfile(scan, source, context),
            };
            let name = allocate_name(source, context, &allocated, lookup).await?;
            let mut description = description;
            description.component_stub.component_name = name.clone();
            debug!(context, component = %name, devfile_found = description.devfile_found, "built component stub");
            allocated.insert(name.clone());
            detected.insert(name, description);
        }
        Ok(detected)
    }

    async fn from_devfile(
        &self,
        scan: &ScanResult,
        source: &StubSource,
        context: &str,
        bytes: &[u8],
    ) -> Result<ComponentDetectionDescription> {
        let devfile = self.parser.parse(bytes).await?;
        let attributes = match self.parser.components(&devfile, ComponentKind::Kubernetes).first() {
            Some(component) => read_deploy_attributes(component)?,
            None => DeployAttributes::default(),
        };

        let metadata = self.parser.metadata(&devfile);
        let hint = scan.languages.get(context).cloned().unwrap_or_default();
        let language = non_empty_or(&metadata.language, &hint);
        let project_type = non_empty_or(&metadata.project_type, &hint);

        let git_source = GitSource {
            url: source.url.clone(),
            revision: source.revision.clone(),
            context: context.to_string(),
            devfile_url: scan.devfile_urls.get(context).cloned().unwrap_or_default(),
            dockerfile_url: scan.dockerfile_urls.get(context).cloned().unwrap_or_default(),
        };
        let mut stub = stub(git_source, attributes);
        if let Some(port) = detected_port(scan, context) {
            stub.target_port = Some(port);
        }

        Ok(ComponentDetectionDescription {
            devfile_found: !stub_devfile_url(&stub).is_empty(),
            language,
            project_type,
            component_stub: stub,
        })
    }
}

fn from_dockerfile(scan: &ScanResult, source: &StubSource, context: &str) -> ComponentDetectionDescription {
    let git_source = GitSource {
        url: source.url.clone(),
        revision: source.revision.clone(),
        context: context.to_string(),
        devfile_url: String::new(),
        dockerfile_url: scan.dockerfile_urls.get(context).cloned().unwrap_or_default(),
    };
    let mut stub = stub(git_source, DeployAttributes::default());
    stub.target_port = detected_port(scan, context);

    ComponentDetectionDescription {
        devfile_found: false,
        language: DOCKERFILE_LANGUAGE.to_string(),
        project_type: DOCKERFILE_LANGUAGE.to_string(),
        component_stub: stub,
    }
}

fn stub(git_source: GitSource, attributes: DeployAttributes) -> ComponentSpec {
    ComponentSpec {
        component_name: String::new(),
        application: PLACEHOLDER_APPLICATION.to_string(),
        source: ComponentSource {
            git_source: Some(git_source),
        },
        container_image: None,
        replicas: attributes.replicas,
        target_port: attributes.port,
        route: attributes.route,
        env: attributes.env,
        resources: attributes.resources,
    }
}

fn stub_devfile_url(stub: &ComponentSpec) -> &str {
    stub.source
        .git_source
        .as_ref()
        .map(|g| g.devfile_url.as_str())
        .unwrap_or_default()
}

fn detected_port(scan: &ScanResult, context: &str) -> Option<i32> {
    scan.ports
        .get(context)
        .and_then(|ports| ports.first())
        .map(|port| i32::from(*port))
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

async fn allocate_name(
    source: &StubSource,
    context: &str,
    allocated: &BTreeSet<String>,
    lookup: &dyn ComponentLookup,
) -> Result<String> {
    let name = sanitize_name(&base_name(&source.url, context));
    let taken = allocated.contains(&name) || lookup.component_exists(&source.namespace, &name).await?;
    if !source.generate_component_name && !taken {
        return Ok(name);
    }

    let mut candidate = with_random_suffix(&name);
    while allocated.contains(&candidate) {
        candidate = with_random_suffix(&name);
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devfile::YamlDevfileParser;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const DEVFILE: &str = indoc! {r#"
        schemaVersion: 2.2.0
        metadata:
          name: go
          language: Go
          projectType: Go
        components:
          - name: build
            image:
              imageName: go-image:latest
              dockerfile:
                uri: https://raw.githubusercontent.com/o/r/main/docker/Dockerfile
          - name: deploy
            attributes:
              deployment/replicas: 2
              deployment/container-port: 8081
              deployment/route: go-route
              deployment/cpuLimit: "1"
              deployment/memoryRequest: 256Mi
            kubernetes:
              uri: deploy.yaml
    "#};

    struct TakenNames(Vec<&'static str>);

    #[async_trait]
    impl ComponentLookup for TakenNames {
        async fn component_exists(&self, _: &str, name: &str) -> Result<bool> {
            Ok(self.0.contains(&name))
        }
    }

    fn builder() -> StubBuilder {
        StubBuilder::new(Arc::new(YamlDevfileParser::offline()))
    }

    fn source(generate: bool) -> StubSource {
        StubSource {
            url: "https://github.com/o/r".into(),
            revision: "main".into(),
            namespace: "ns".into(),
            generate_component_name: generate,
        }
    }

    fn devfile_scan(context: &str) -> ScanResult {
        let mut scan = ScanResult::default();
        scan.devfiles.insert(context.into(), DEVFILE.as_bytes().to_vec());
        scan.devfile_urls
            .insert(context.into(), "https://raw.githubusercontent.com/o/r/main/devfile.yaml".into());
        scan.dockerfile_urls.insert(
            context.into(),
            "https://raw.githubusercontent.com/o/r/main/docker/Dockerfile".into(),
        );
        scan
    }

    #[tokio::test]
    async fn test_devfile_attributes_lower_into_stub() {
        let detected = builder()
            .build(&devfile_scan("./"), &source(false), &NoExistingComponents)
            .await
            .unwrap();

        let description = &detected["r"];
        assert!(description.devfile_found);
        assert_eq!(description.language, "Go");
        let stub = &description.component_stub;
        assert_eq!(stub.component_name, "r");
        assert_eq!(stub.application, PLACEHOLDER_APPLICATION);
        assert_eq!(stub.replicas, Some(2));
        assert_eq!(stub.target_port, Some(8081));
        assert_eq!(stub.route.as_deref(), Some("go-route"));
        assert_eq!(stub.resources.limits["cpu"], "1");
        assert_eq!(stub.resources.requests["memory"], "256Mi");
        let git = stub.source.git_source.as_ref().unwrap();
        assert_eq!(git.context, "./");
        assert!(!git.devfile_url.is_empty());
        assert!(!git.dockerfile_url.is_empty());
    }

    #[tokio::test]
    async fn test_detected_port_overrides_devfile_port() {
        let mut scan = devfile_scan("./");
        scan.ports.insert("./".into(), vec![3000, 9000]);
        let detected = builder()
            .build(&scan, &source(false), &NoExistingComponents)
            .await
            .unwrap();
        assert_eq!(detected["r"].component_stub.target_port, Some(3000));
    }

    #[tokio::test]
    async fn test_dockerfile_only_component() {
        let mut scan = ScanResult::default();
        scan.dockerfile_urls.insert("api".into(), "./Dockerfile".into());
        let detected = builder()
            .build(&scan, &source(false), &NoExistingComponents)
            .await
            .unwrap();

        let description = &detected["api-r"];
        assert!(!description.devfile_found);
        assert_eq!(description.language, DOCKERFILE_LANGUAGE);
        assert_eq!(description.project_type, DOCKERFILE_LANGUAGE);
        assert_eq!(
            description.component_stub.source.git_source.as_ref().unwrap().dockerfile_url,
            "./Dockerfile"
        );
    }

    #[tokio::test]
    async fn test_existing_component_forces_suffix() {
        let detected = builder()
            .build(&devfile_scan("./"), &source(false), &TakenNames(vec!["r"]))
            .await
            .unwrap();
        let name = detected.keys().next().unwrap();
        assert!(name.starts_with("r-"));
        assert_eq!(name.len(), 6);
    }

    #[tokio::test]
    async fn test_generate_component_name_always_suffixes() {
        let detected = builder()
            .build(&devfile_scan("./"), &source(true), &NoExistingComponents)
            .await
            .unwrap();
        let (name, description) = detected.iter().next().unwrap();
        assert_ne!(name, "r");
        assert_eq!(&description.component_stub.component_name, name);
    }

    #[tokio::test]
    async fn test_language_hint_fills_missing_metadata() {
        let mut scan = ScanResult::default();
        scan.devfiles
            .insert("web".into(), b"schemaVersion: 2.2.0\ncomponents: []\n".to_vec());
        scan.devfile_urls.insert("web".into(), "https://reg/devfiles/nodejs".into());
        scan.languages.insert("web".into(), "JavaScript".into());

        let detected = builder()
            .build(&scan, &source(false), &NoExistingComponents)
            .await
            .unwrap();
        let description = &detected["web-r"];
        assert_eq!(description.language, "JavaScript");
        assert_eq!(description.project_type, "JavaScript");
        assert_eq!(description.component_stub.target_port, None);
    }
}
