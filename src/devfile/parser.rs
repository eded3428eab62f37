//! Devfile parsing.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use super::model::{Component, ComponentKind, Devfile, Metadata};
use crate::errors::{DetectionError, Result};
use crate::fetch::HttpFetcher;

/// Parent devfiles are followed at most this many levels.
pub const MAX_PARENT_DEPTH: usize = 3;

/// Devfile operations used by detection.
#[async_trait]
pub trait DevfileParser: Send + Sync {
    /// Decode a devfile, flattening any parent it references.
    async fn parse(&self, bytes: &[u8]) -> Result<Devfile>;

    /// Components of `kind`, in document order.
    fn components<'a>(&self, devfile: &'a Devfile, kind: ComponentKind) -> Vec<&'a Component> {
        devfile
            .components
            .iter()
            .filter(|c| c.kind() == Some(kind))
            .collect()
    }

    fn metadata<'a>(&self, devfile: &'a Devfile) -> &'a Metadata {
        &devfile.metadata
    }

    /// Replace the component with the same name.
    fn update_component(&self, devfile: &mut Devfile, component: Component) -> Result<()> {
        match devfile.components.iter_mut().find(|c| c.name == component.name) {
            Some(slot) => {
                *slot = component;
                Ok(())
            }
            None => Err(DetectionError::invalid_devfile(format!(
                "component {} not found in devfile",
                component.name
            ))),
        }
    }
}

/// `serde_yaml` parser. Without an HTTP client, parents are left as-is.
#[derive(Debug, Clone, Default)]
pub struct YamlDevfileParser {
    http: Option<HttpFetcher>,
}

impl YamlDevfileParser {
    pub fn new(http: HttpFetcher) -> Self {
        Self { http: Some(http) }
    }

    /// A parser that never fetches parents.
    pub fn offline() -> Self {
        Self { http: None }
    }

    fn parse_with_depth<'a>(&'a self, bytes: &'a [u8], depth: usize) -> BoxFuture<'a, Result<Devfile>> {
        Box::pin(async move {
            let mut devfile = decode(bytes)?;

            let parent_uri = devfile
                .parent
                .as_ref()
                .and_then(|p| p.uri.as_deref())
                .filter(|uri| uri.starts_with("http://") || uri.starts_with("https://"))
                .map(str::to_string);

            let (Some(uri), Some(http)) = (parent_uri, self.http.as_ref()) else {
                return Ok(devfile);
            };
            if depth >= MAX_PARENT_DEPTH {
                debug!(uri = %uri, "parent depth limit reached, not flattening");
                return Ok(devfile);
            }

            let parent_bytes = http.get(&uri).await?;
            let parent = self.parse_with_depth(&parent_bytes, depth + 1).await?;
            flatten(&mut devfile, parent);
            Ok(devfile)
        })
    }
}

#[async_trait]
impl DevfileParser for YamlDevfileParser {
    async fn parse(&self, bytes: &[u8]) -> Result<Devfile> {
        self.parse_with_depth(bytes, 0).await
    }
}

/// Decode one document and check component shapes.
pub fn decode(bytes: &[u8]) -> Result<Devfile> {
    let devfile: Devfile = serde_yaml::from_slice(bytes).map_err(DetectionError::devfile_decode)?;
    if devfile.schema_version.trim().is_empty() {
        return Err(DetectionError::devfile_decode("schemaVersion must not be empty"));
    }
    for component in &devfile.components {
        if component.kinds().len() > 1 {
            return Err(DetectionError::devfile_decode(format!(
                "component {} specifies more than one component type",
                component.name
            )));
        }
    }
    Ok(devfile)
}

/// Merge `parent` into `child`: parent components first, with the child's
/// parent overrides applied; child components replace same-named ones.
fn flatten(child: &mut Devfile, parent: Devfile) {
    let overrides = child
        .parent
        .take()
        .map(|p| p.components)
        .unwrap_or_default();

    let mut merged: Vec<Component> = parent
        .components
        .into_iter()
        .map(|c| {
            overrides
                .iter()
                .find(|o| o.name == c.name)
                .cloned()
                .unwrap_or(c)
        })
        .collect();

    for component in std::mem::take(&mut child.components) {
        match merged.iter_mut().find(|c| c.name == component.name) {
            Some(slot) => *slot = component,
            None => merged.push(component),
        }
    }
    child.components = merged;
    child.metadata.inherit(&parent.metadata);
    for (key, value) in parent.extra {
        child.extra.entry(key).or_insert(value);
    }
}
