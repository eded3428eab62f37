//! Devfile handling: parsing, outer-loop validation, Dockerfile
//! references and reserved deployment attributes.

pub mod attributes;
pub mod model;
pub mod parser;

pub use attributes::{read_deploy_attributes, DeployAttributes};
pub use model::{Component, ComponentKind, Devfile, Metadata};
pub use parser::{DevfileParser, YamlDevfileParser};

use url::Url;

use crate::errors::Result;

/// Devfile locations tried at a context, in order.
pub const DEVFILE_CANDIDATES: [&str; 6] = [
    "devfile.yaml",
    ".devfile.yaml",
    "devfile.yml",
    ".devfile.yml",
    ".devfile/devfile.yaml",
    ".devfile/.devfile.yaml",
];

/// Dockerfile locations tried at a context, in order.
pub const DOCKERFILE_CANDIDATES: [&str; 4] = [
    "Dockerfile",
    "Containerfile",
    "docker/Dockerfile",
    ".docker/Dockerfile",
];

/// Outcome of outer-loop validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ok,
    /// Not an outer-loop devfile; treat as absent.
    Ignore(String),
}

/// A devfile is usable when a Kubernetes component defines deploy
/// resources.
pub fn validate(devfile: &Devfile) -> Validation {
    let has_outer_loop = devfile
        .components
        .iter()
        .filter_map(|c| c.kubernetes.as_ref())
        .any(|k| k.has_definition());
    if has_outer_loop {
        Validation::Ok
    } else {
        Validation::Ignore("devfile has no kubernetes component".to_string())
    }
}

/// Make every relative image Dockerfile URI absolute against `base_url`.
pub fn rewrite_local_dockerfile_uris(
    parser: &dyn DevfileParser,
    devfile: &mut Devfile,
    base_url: &str,
) -> Result<()> {
    let Ok(base) = Url::parse(base_url) else {
        tracing::debug!(base_url, "devfile URL is not absolute, leaving Dockerfile URIs");
        return Ok(());
    };

    let rewrites: Vec<Component> = parser
        .components(devfile, ComponentKind::Image)
        .into_iter()
        .filter_map(|component| {
            let uri = component.image.as_ref()?.dockerfile.as_ref()?.uri.as_deref()?;
            if Url::parse(uri).is_ok() {
                return None;
            }
            let absolute = base.join(uri.trim_start_matches('/')).ok()?;
            let mut updated = component.clone();
            if let Some(dockerfile) = updated.image.as_mut().and_then(|i| i.dockerfile.as_mut()) {
                dockerfile.uri = Some(absolute.to_string());
            }
            Some(updated)
        })
        .collect();

    for component in rewrites {
        parser.update_component(devfile, component)?;
    }
    Ok(())
}

/// First image component's Dockerfile URI.
pub fn dockerfile_reference(devfile: &Devfile) -> Option<String> {
    devfile
        .components
        .iter()
        .filter_map(|c| c.image.as_ref())
        .filter_map(|i| i.dockerfile.as_ref())
        .find_map(|d| d.uri.clone())
        .filter(|uri| !uri.trim().is_empty())
}
